use rusqlite::Connection;

use crate::error::{CashupError, Result};
use crate::models::{BatchStatus, ImportBatch, ImportMode};

fn read_batch(row: &rusqlite::Row) -> rusqlite::Result<(ImportBatch, Option<String>)> {
    let mode: String = row.get(4)?;
    let status: String = row.get(7)?;
    let metadata: Option<String> = row.get(8)?;
    Ok((
        ImportBatch {
            id: row.get(0)?,
            account_id: row.get(1)?,
            file_name: row.get(2)?,
            file_hash: row.get(3)?,
            mode: ImportMode::parse(&mode).unwrap_or(ImportMode::Append),
            declared_rows: row.get(5)?,
            inserted_rows: row.get(6)?,
            status: BatchStatus::parse(&status).unwrap_or(BatchStatus::Failed),
            metadata: None,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        },
        metadata,
    ))
}

const BATCH_COLUMNS: &str = "id, account_id, file_name, file_hash, mode, declared_rows, \
                             inserted_rows, status, metadata, created_at, updated_at";

pub fn get_batch(conn: &Connection, batch_id: i64) -> Result<ImportBatch> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches WHERE id = ?1"
    ))?;
    let (mut batch, metadata) = stmt
        .query_row([batch_id], read_batch)
        .map_err(|_| CashupError::UnknownBatch(batch_id))?;
    if let Some(json) = metadata {
        batch.metadata = serde_json::from_str(&json).ok();
    }
    Ok(batch)
}

/// Batches for one account, newest first.
pub fn list_batches(conn: &Connection, account_id: i64) -> Result<Vec<ImportBatch>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BATCH_COLUMNS} FROM import_batches \
         WHERE account_id = ?1 ORDER BY created_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map([account_id], read_batch)?;
    let mut batches = Vec::new();
    for row in rows {
        let (mut batch, metadata) = row?;
        if let Some(json) = metadata {
            batch.metadata = serde_json::from_str(&json).ok();
        }
        batches.push(batch);
    }
    Ok(batches)
}

/// Undo a completed import: delete every transaction the batch inserted
/// and mark the batch rolled back. Rolling back frees the file hash, so
/// the same file can be imported again later.
///
/// Only `completed` batches have anything to undo. Anything else is a
/// no-op that reports zero deletions, so retrying a rollback is harmless.
pub fn rollback(conn: &Connection, batch_id: i64) -> Result<usize> {
    let batch = get_batch(conn, batch_id)?;
    match batch.status {
        BatchStatus::Completed => {}
        BatchStatus::RolledBack => return Ok(0),
        BatchStatus::Pending | BatchStatus::Failed => return Ok(0),
    }

    let tx = conn.unchecked_transaction()?;
    let deleted = tx.execute(
        "DELETE FROM transactions WHERE import_batch_id = ?1",
        [batch_id],
    )?;
    tx.execute(
        "UPDATE import_batches SET status = 'rolled_back', updated_at = datetime('now') \
         WHERE id = ?1",
        [batch_id],
    )?;
    tx.commit()?;
    Ok(deleted)
}

pub struct RepairedBatch {
    pub batch_id: i64,
    pub file_name: String,
    pub status: BatchStatus,
    pub linked_rows: i64,
}

/// Heal batches stranded in `pending` by a crash between insert and
/// finalization. The linked transactions are the ground truth: any row
/// present means the insert phase ran, so the batch settles as completed
/// with the observed count; none means it settles as failed.
pub fn repair_pending_batches(conn: &Connection, account_id: i64) -> Result<Vec<RepairedBatch>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.file_name, count(t.id) FROM import_batches b \
         LEFT JOIN transactions t ON t.import_batch_id = b.id \
         WHERE b.account_id = ?1 AND b.status = 'pending' \
         GROUP BY b.id ORDER BY b.id",
    )?;
    let stuck: Vec<(i64, String, i64)> = stmt
        .query_map([account_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut repaired = Vec::new();
    for (batch_id, file_name, linked_rows) in stuck {
        let status = if linked_rows > 0 {
            BatchStatus::Completed
        } else {
            BatchStatus::Failed
        };
        conn.execute(
            "UPDATE import_batches SET status = ?1, inserted_rows = ?2, \
             updated_at = datetime('now') WHERE id = ?3",
            rusqlite::params![status.as_str(), linked_rows, batch_id],
        )?;
        repaired.push(RepairedBatch {
            batch_id,
            file_name,
            status,
            linked_rows,
        });
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::importer::import;
    use crate::models::Account;
    use std::path::{Path, PathBuf};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn add_account(conn: &Connection, name: &str, owner: &str) -> Account {
        conn.execute(
            "INSERT INTO accounts (name, owner) VALUES (?1, ?2)",
            rusqlite::params![name, owner],
        )
        .unwrap();
        crate::db::get_account(conn, name).unwrap()
    }

    fn write_statement(dir: &Path, name: &str, rows: &[(&str, &str, &str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let mut content = String::from("Date,Description,Withdrawal,Deposit\n");
        for (date, desc, w, d) in rows {
            content.push_str(&format!("{date},{desc},{w},{d}\n"));
        }
        std::fs::write(&path, &content).unwrap();
        path
    }

    fn txn_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0)).unwrap()
    }

    #[test]
    fn test_rollback_deletes_batch_rows_only() {
        let (dir, conn) = test_db();
        let account = add_account(&conn, "Checking", "alice");
        let jan = write_statement(dir.path(), "jan.csv", &[
            ("2026-01-02", "A", "", "1.00"),
            ("2026-01-03", "B", "2.00", ""),
        ]);
        let feb = write_statement(dir.path(), "feb.csv", &[
            ("2026-02-02", "C", "", "3.00"),
        ]);
        let s1 = import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        import(&conn, &account, &feb, None, ImportMode::Append, "alice").unwrap();

        let deleted = rollback(&conn, s1.batch_id).unwrap();
        assert_eq!(deleted, 2);
        assert_eq!(txn_count(&conn), 1);
        let batch = get_batch(&conn, s1.batch_id).unwrap();
        assert_eq!(batch.status, BatchStatus::RolledBack);
    }

    #[test]
    fn test_rollback_then_reimport_restores_rows() {
        let (dir, conn) = test_db();
        let account = add_account(&conn, "Checking", "alice");
        let jan = write_statement(dir.path(), "jan.csv", &[
            ("2026-01-02", "A", "", "1.00"),
            ("2026-01-03", "B", "2.00", ""),
        ]);
        let s1 = import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        rollback(&conn, s1.batch_id).unwrap();
        assert_eq!(txn_count(&conn), 0);

        // Rolled-back batches no longer block the file hash.
        let s2 = import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        assert_eq!(s2.inserted, 2);
        assert_ne!(s2.batch_id, s1.batch_id);
        assert_eq!(txn_count(&conn), 2);
    }

    #[test]
    fn test_rollback_noop_for_non_completed() {
        let (dir, conn) = test_db();
        let account = add_account(&conn, "Checking", "alice");
        let jan = write_statement(dir.path(), "jan.csv", &[("2026-01-02", "A", "", "1.00")]);
        let s1 = import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        conn.execute(
            "UPDATE import_batches SET status = 'pending' WHERE id = ?1",
            [s1.batch_id],
        )
        .unwrap();
        assert_eq!(rollback(&conn, s1.batch_id).unwrap(), 0);
        assert_eq!(txn_count(&conn), 1);
        // Repeated rollback of an already rolled-back batch is harmless.
        conn.execute(
            "UPDATE import_batches SET status = 'completed' WHERE id = ?1",
            [s1.batch_id],
        )
        .unwrap();
        assert_eq!(rollback(&conn, s1.batch_id).unwrap(), 1);
        assert_eq!(rollback(&conn, s1.batch_id).unwrap(), 0);
    }

    #[test]
    fn test_rollback_unknown_batch() {
        let (_dir, conn) = test_db();
        assert!(matches!(rollback(&conn, 999), Err(CashupError::UnknownBatch(999))));
    }

    #[test]
    fn test_repair_settles_stuck_batches() {
        let (dir, conn) = test_db();
        let account = add_account(&conn, "Checking", "alice");
        let jan = write_statement(dir.path(), "jan.csv", &[
            ("2026-01-02", "A", "", "1.00"),
            ("2026-01-03", "B", "2.00", ""),
        ]);
        let s1 = import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        // Simulate a crash window: batch left pending, rows present.
        conn.execute(
            "UPDATE import_batches SET status = 'pending', inserted_rows = 0 WHERE id = ?1",
            [s1.batch_id],
        )
        .unwrap();
        // And one stuck batch that never inserted anything.
        conn.execute(
            "INSERT INTO import_batches (account_id, file_name, file_hash, mode) \
             VALUES (?1, 'ghost.csv', 'gh', 'append')",
            [account.id],
        )
        .unwrap();

        let repaired = repair_pending_batches(&conn, account.id).unwrap();
        assert_eq!(repaired.len(), 2);
        assert_eq!(repaired[0].status, BatchStatus::Completed);
        assert_eq!(repaired[0].linked_rows, 2);
        assert_eq!(repaired[1].status, BatchStatus::Failed);
        assert_eq!(repaired[1].linked_rows, 0);
        let batch = get_batch(&conn, s1.batch_id).unwrap();
        assert_eq!(batch.inserted_rows, 2);
        assert!(repair_pending_batches(&conn, account.id).unwrap().is_empty());
    }

    #[test]
    fn test_list_batches_newest_first_with_metadata() {
        let (dir, conn) = test_db();
        let account = add_account(&conn, "Checking", "alice");
        let jan = write_statement(dir.path(), "jan.csv", &[("2026-01-02", "A", "", "1.00")]);
        let feb = write_statement(dir.path(), "feb.csv", &[("2026-02-02", "B", "", "2.00")]);
        import(&conn, &account, &jan, None, ImportMode::Append, "alice").unwrap();
        import(&conn, &account, &feb, None, ImportMode::Append, "alice").unwrap();

        let batches = list_batches(&conn, account.id).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].file_name, "feb.csv");
        assert_eq!(batches[1].file_name, "jan.csv");
        let meta = batches[0].metadata.as_ref().unwrap();
        assert_eq!(meta.total_rows, 1);
    }
}
