use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::round_cents;
use crate::models::Account;
use crate::position::cash_position;

/// Outcome of comparing the computed expected closing balance against the
/// most recent bank-reported balance.
#[derive(Debug, Clone)]
pub struct BalanceSummary {
    pub opening_balance: f64,
    pub opening_date: Option<String>,
    pub net_movement: f64,
    pub expected_closing: f64,
    pub reported_balance: Option<f64>,
    pub reported_date: Option<String>,
    /// reported minus expected; absent when nothing has been reported.
    pub delta: Option<f64>,
    pub mismatch: bool,
}

/// Deltas below a cent are float noise, not discrepancies.
pub const MISMATCH_TOLERANCE: f64 = 0.01;

fn latest_reported(
    conn: &Connection,
    account_id: i64,
    owner: &str,
) -> Result<Option<(f64, String)>> {
    conn.query_row(
        "SELECT amount, reported_date FROM reported_balances \
         WHERE account_id = ?1 AND owner = ?2 \
         ORDER BY reported_date DESC, id DESC LIMIT 1",
        rusqlite::params![account_id, owner],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )
    .map(Some)
    .or_else(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other.into()),
    })
}

/// Expected closing = opening balance + net movement over the range. The
/// reported side is always the most recent observation on record, whatever
/// its date, because that is the freshest truth the user has entered.
pub fn balance_summary(
    conn: &Connection,
    account: &Account,
    owner: &str,
    from: &str,
    to: &str,
) -> Result<BalanceSummary> {
    let position = cash_position(conn, account, owner, from, to)?;
    let expected = position.closing_balance;
    let reported = latest_reported(conn, account.id, owner)?;

    let (reported_balance, reported_date, delta) = match reported {
        Some((amount, date)) => {
            let delta = round_cents(amount - expected);
            (Some(amount), Some(date), Some(delta))
        }
        None => (None, None, None),
    };
    let mismatch = delta.map(|d| d.abs() >= MISMATCH_TOLERANCE).unwrap_or(false);

    Ok(BalanceSummary {
        opening_balance: position.opening_balance,
        opening_date: position.opening_date,
        net_movement: position.net_movement,
        expected_closing: expected,
        reported_balance,
        reported_date,
        delta,
        mismatch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn seed_account(conn: &Connection) -> Account {
        conn.execute("INSERT INTO accounts (name, owner) VALUES ('Checking', 'alice')", [])
            .unwrap();
        let account = crate::db::get_account(conn, "Checking").unwrap();
        conn.execute(
            "INSERT INTO opening_balances (account_id, owner, amount, effective_date) \
             VALUES (?1, 'alice', 1000.0, '2026-01-01')",
            [account.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, deposit, content_hash) \
             VALUES (?1, '2026-01-02', 500.0, 'h1')",
            [account.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO transactions (account_id, date, withdrawal, content_hash) \
             VALUES (?1, '2026-01-03', 200.0, 'h2')",
            [account.id],
        )
        .unwrap();
        account
    }

    fn report(conn: &Connection, account_id: i64, amount: f64, date: &str) {
        conn.execute(
            "INSERT INTO reported_balances (account_id, owner, amount, reported_date) \
             VALUES (?1, 'alice', ?2, ?3)",
            rusqlite::params![account_id, amount, date],
        )
        .unwrap();
    }

    #[test]
    fn test_delta_null_without_report() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        let summary =
            balance_summary(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert_eq!(summary.expected_closing, 1300.0);
        assert_eq!(summary.net_movement, 300.0);
        assert!(summary.reported_balance.is_none());
        assert!(summary.delta.is_none());
        assert!(!summary.mismatch);
    }

    #[test]
    fn test_matching_report_within_tolerance() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        report(&conn, account.id, 1300.004, "2026-01-31");
        let summary =
            balance_summary(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert_eq!(summary.delta, Some(0.0));
        assert!(!summary.mismatch);
    }

    #[test]
    fn test_mismatch_at_one_cent() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        report(&conn, account.id, 1300.01, "2026-01-31");
        let summary =
            balance_summary(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert_eq!(summary.delta, Some(0.01));
        assert!(summary.mismatch);
    }

    #[test]
    fn test_uses_most_recent_report_regardless_of_range() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        report(&conn, account.id, 900.0, "2026-01-15");
        report(&conn, account.id, 1250.0, "2026-03-01");
        let summary =
            balance_summary(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert_eq!(summary.reported_balance, Some(1250.0));
        assert_eq!(summary.reported_date.as_deref(), Some("2026-03-01"));
        assert_eq!(summary.delta, Some(-50.0));
        assert!(summary.mismatch);
    }

    #[test]
    fn test_reports_scoped_to_owner() {
        let (_dir, conn) = test_db();
        let account = seed_account(&conn);
        conn.execute(
            "INSERT INTO reported_balances (account_id, owner, amount, reported_date) \
             VALUES (?1, 'bob', 5.0, '2026-06-01')",
            [account.id],
        )
        .unwrap();
        let summary =
            balance_summary(&conn, &account, "alice", "2026-01-01", "2026-01-31").unwrap();
        assert!(summary.reported_balance.is_none());
    }
}
