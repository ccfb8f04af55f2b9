use std::path::Path;

use rusqlite::Connection;

use crate::error::{CashupError, Result};
use crate::models::Account;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    owner TEXT NOT NULL,
    currency TEXT NOT NULL DEFAULT 'USD',
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS import_batches (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    file_name TEXT NOT NULL,
    file_hash TEXT NOT NULL,
    mode TEXT NOT NULL,
    declared_rows INTEGER NOT NULL DEFAULT 0,
    inserted_rows INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'pending',
    metadata TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    withdrawal REAL NOT NULL DEFAULT 0 CHECK (withdrawal >= 0),
    deposit REAL NOT NULL DEFAULT 0 CHECK (deposit >= 0),
    balance REAL,
    channel TEXT,
    reference TEXT,
    content_hash TEXT NOT NULL,
    import_batch_id INTEGER,
    raw_row TEXT,
    created_by TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (account_id, content_hash),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (import_batch_id) REFERENCES import_batches(id)
);

CREATE TABLE IF NOT EXISTS opening_balances (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    owner TEXT NOT NULL,
    amount REAL NOT NULL,
    effective_date TEXT NOT NULL,
    updated_at TEXT DEFAULT (datetime('now')),
    UNIQUE (account_id, owner),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS reported_balances (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    owner TEXT NOT NULL,
    amount REAL NOT NULL,
    reported_date TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_account_date
    ON transactions(account_id, date);
CREATE INDEX IF NOT EXISTS idx_transactions_batch
    ON transactions(import_batch_id);

-- One live batch per uploaded file: rolled-back batches do not block a
-- deliberate re-import of the same bytes.
CREATE UNIQUE INDEX IF NOT EXISTS uq_batches_account_file
    ON import_batches(account_id, file_hash)
    WHERE status != 'rolled_back';
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub fn get_account(conn: &Connection, name: &str) -> Result<Account> {
    let mut stmt = conn.prepare(
        "SELECT id, name, owner, currency, is_active FROM accounts WHERE name = ?1",
    )?;
    stmt.query_row([name], |row| {
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            currency: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
        })
    })
    .map_err(|_| CashupError::UnknownAccount(name.to_string()))
}

/// Resolve an account and verify the caller owns it. Every mutating or
/// balance-reading operation goes through this before touching any rows.
pub fn get_owned_account(conn: &Connection, name: &str, user: &str) -> Result<Account> {
    if user.is_empty() {
        return Err(CashupError::NoIdentity);
    }
    let account = get_account(conn, name)?;
    if account.owner != user {
        return Err(CashupError::NotAuthorized {
            account: name.to_string(),
            user: user.to_string(),
        });
    }
    Ok(account)
}

pub fn active_accounts_for(conn: &Connection, user: &str) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, owner, currency, is_active FROM accounts \
         WHERE owner = ?1 AND is_active = 1 ORDER BY name",
    )?;
    let rows = stmt.query_map([user], |row| {
        Ok(Account {
            id: row.get(0)?,
            name: row.get(1)?,
            owner: row.get(2)?,
            currency: row.get(3)?,
            is_active: row.get::<_, i64>(4)? != 0,
        })
    })?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "accounts",
            "transactions",
            "import_batches",
            "opening_balances",
            "reported_balances",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_content_hash_unique_per_account() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO accounts (name, owner) VALUES ('A', 'alice'), ('B', 'alice')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, content_hash) VALUES (1, '2026-01-01', 'h1')",
            [],
        )
        .unwrap();
        // Same hash on a different account is fine.
        conn.execute(
            "INSERT INTO transactions (account_id, date, content_hash) VALUES (2, '2026-01-01', 'h1')",
            [],
        )
        .unwrap();
        let dup = conn.execute(
            "INSERT INTO transactions (account_id, date, content_hash) VALUES (1, '2026-01-01', 'h1')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_file_hash_unique_ignores_rolled_back() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO accounts (name, owner) VALUES ('A', 'alice')", [])
            .unwrap();
        conn.execute(
            "INSERT INTO import_batches (account_id, file_name, file_hash, mode, status) \
             VALUES (1, 'jan.csv', 'fh', 'append', 'rolled_back')",
            [],
        )
        .unwrap();
        // A live batch for the same file is allowed after rollback...
        conn.execute(
            "INSERT INTO import_batches (account_id, file_name, file_hash, mode, status) \
             VALUES (1, 'jan.csv', 'fh', 'append', 'completed')",
            [],
        )
        .unwrap();
        // ...but a second live batch is not.
        let dup = conn.execute(
            "INSERT INTO import_batches (account_id, file_name, file_hash, mode, status) \
             VALUES (1, 'jan.csv', 'fh', 'append', 'pending')",
            [],
        );
        assert!(dup.is_err());
    }

    #[test]
    fn test_get_owned_account_checks_owner() {
        let (_dir, conn) = test_db();
        conn.execute("INSERT INTO accounts (name, owner) VALUES ('A', 'alice')", [])
            .unwrap();
        assert!(get_owned_account(&conn, "A", "alice").is_ok());
        assert!(matches!(
            get_owned_account(&conn, "A", "bob"),
            Err(CashupError::NotAuthorized { .. })
        ));
        assert!(matches!(
            get_owned_account(&conn, "A", ""),
            Err(CashupError::NoIdentity)
        ));
        assert!(matches!(
            get_owned_account(&conn, "missing", "alice"),
            Err(CashupError::UnknownAccount(_))
        ));
    }

    #[test]
    fn test_active_accounts_excludes_deactivated_and_foreign() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO accounts (name, owner, is_active) VALUES \
             ('A', 'alice', 1), ('B', 'alice', 0), ('C', 'bob', 1)",
            [],
        )
        .unwrap();
        let accounts = active_accounts_for(&conn, "alice").unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "A");
    }
}
