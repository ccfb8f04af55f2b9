use std::path::Path;

use rusqlite::Connection;

use crate::error::{CashupError, Result};
use crate::hash::{content_hash, file_hash_of};
use crate::models::{
    Account, BatchMetadata, BatchStatus, DateRange, ImportMode, ParsedTransaction, RowWarning,
};
use crate::parser::{parse_statement, read_grid, ColumnMapping};

// ---------------------------------------------------------------------------
// Summary types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ImportSummary {
    pub batch_id: i64,
    pub inserted: usize,
    pub duplicates: usize,
    pub deleted: usize,
    pub warnings: Vec<RowWarning>,
    pub message: String,
}

pub struct PreviewReport {
    pub format_type: String,
    pub mapping: ColumnMapping,
    pub rows: Vec<ParsedTransaction>,
    pub warnings: Vec<RowWarning>,
    /// Rows whose content hash already exists for this account.
    pub already_stored: usize,
    pub date_range: Option<DateRange>,
}

struct PhaseOutcome {
    deleted: usize,
    inserted: usize,
    duplicates: usize,
    failures: usize,
}

// ---------------------------------------------------------------------------
// import
// ---------------------------------------------------------------------------

/// Ingest one statement file for an account.
///
/// Retry-safe by construction: the content hash makes row inserts
/// idempotent, the file hash makes batch creation idempotent (retried
/// uploads reuse the existing batch row instead of multiplying records),
/// and finalization runs on every exit path once a batch exists, so a
/// partially applied import is always visible to `repair`.
pub fn import(
    conn: &Connection,
    account: &Account,
    file_path: &Path,
    mapping: Option<&ColumnMapping>,
    mode: ImportMode,
    user: &str,
) -> Result<ImportSummary> {
    // Step 1: parse. A mapping failure carries the detected headers and
    // creates no batch.
    let grid = read_grid(file_path)?;
    let parsed = parse_statement(&grid, mapping)?;
    if parsed.rows.is_empty() {
        return Err(CashupError::ImportFailed(
            "statement contains no importable rows".to_string(),
        ));
    }

    let date_range = parsed_date_range(&parsed.rows);
    let mut metadata = BatchMetadata {
        format_type: parsed.format_type.clone(),
        column_mapping: parsed.mapping.to_spec(),
        date_range: date_range.clone(),
        deleted_before_import: 0,
        duplicate_count: 0,
        total_rows: parsed.rows.len() as i64,
        import_error: None,
    };

    // Step 2: file-level dedup and batch reuse.
    let file_name = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_string();
    let hash = file_hash_of(file_path)?;
    let batch_id = resolve_batch(conn, account.id, &file_name, &hash, mode, &parsed.rows, &metadata)?;

    // Steps 3 and 4 run as one fallible phase; step 5 (finalization) runs
    // no matter how the phase came out.
    let phase = run_insert_phase(conn, account, batch_id, &parsed.rows, mode, user, date_range.as_ref());
    finalize_batch(conn, batch_id, &phase, &mut metadata)?;

    let outcome = phase?;
    if outcome.inserted == 0 {
        return Err(CashupError::ImportFailed(format!(
            "no rows inserted ({} duplicates, {} failures)",
            outcome.duplicates, outcome.failures
        )));
    }

    let message = format!(
        "{} inserted, {} duplicates skipped, {} deleted ({} mode)",
        outcome.inserted,
        outcome.duplicates,
        outcome.deleted,
        mode.as_str()
    );
    Ok(ImportSummary {
        batch_id,
        inserted: outcome.inserted,
        duplicates: outcome.duplicates,
        deleted: outcome.deleted,
        warnings: parsed.warnings,
        message,
    })
}

fn parsed_date_range(rows: &[ParsedTransaction]) -> Option<DateRange> {
    let min = rows.iter().map(|r| r.date.as_str()).min()?;
    let max = rows.iter().map(|r| r.date.as_str()).max()?;
    Some(DateRange {
        start: min.to_string(),
        end: max.to_string(),
    })
}

/// Find or create the pending batch row for this (account, file) pair.
fn resolve_batch(
    conn: &Connection,
    account_id: i64,
    file_name: &str,
    file_hash: &str,
    mode: ImportMode,
    rows: &[ParsedTransaction],
    metadata: &BatchMetadata,
) -> Result<i64> {
    let existing: Option<(i64, String, String)> = conn
        .query_row(
            "SELECT id, status, updated_at FROM import_batches \
             WHERE account_id = ?1 AND file_hash = ?2 AND status != 'rolled_back'",
            rusqlite::params![account_id, file_hash],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;

    let metadata_json =
        serde_json::to_string(metadata).map_err(|e| CashupError::Other(e.to_string()))?;

    if let Some((id, status, updated_at)) = existing {
        let status = BatchStatus::parse(&status)?;
        if status == BatchStatus::Completed && mode == ImportMode::Append {
            return Err(CashupError::DuplicateFile {
                batch_id: id,
                imported_on: updated_at,
            });
        }
        // Retried upload of the same bytes, or a deliberate replace:
        // reuse the batch row rather than multiplying records.
        conn.execute(
            "UPDATE import_batches SET status = 'pending', mode = ?1, declared_rows = ?2, \
             inserted_rows = 0, file_name = ?3, metadata = ?4, updated_at = datetime('now') \
             WHERE id = ?5",
            rusqlite::params![mode.as_str(), rows.len() as i64, file_name, metadata_json, id],
        )?;
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO import_batches (account_id, file_name, file_hash, mode, declared_rows, metadata) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![account_id, file_name, file_hash, mode.as_str(), rows.len() as i64, metadata_json],
    )?;
    Ok(conn.last_insert_rowid())
}

// ---------------------------------------------------------------------------
// Deletion policy + insert (steps 3 and 4)
// ---------------------------------------------------------------------------

fn run_insert_phase(
    conn: &Connection,
    account: &Account,
    batch_id: i64,
    rows: &[ParsedTransaction],
    mode: ImportMode,
    user: &str,
    date_range: Option<&DateRange>,
) -> Result<PhaseOutcome> {
    // Deletion is scoped to rows this user created, plus legacy rows with
    // no recorded owner.
    let deleted = match (mode, date_range) {
        (ImportMode::Append, _) => 0,
        (ImportMode::ReplaceRange, Some(range)) => conn.execute(
            "DELETE FROM transactions WHERE account_id = ?1 AND date BETWEEN ?2 AND ?3 \
             AND (created_by = ?4 OR created_by IS NULL)",
            rusqlite::params![account.id, range.start, range.end, user],
        )?,
        (ImportMode::ReplaceRange, None) => 0,
        (ImportMode::ReplaceAll, _) => conn.execute(
            "DELETE FROM transactions WHERE account_id = ?1 \
             AND (created_by = ?2 OR created_by IS NULL)",
            rusqlite::params![account.id, user],
        )?,
    };

    // Fast path: everything in one transaction. A uniqueness collision
    // anywhere abandons the attempt and degrades to per-row inserts so a
    // single duplicate never fails the whole file.
    if let Some(inserted) = bulk_insert(conn, account, batch_id, rows, user)? {
        return Ok(PhaseOutcome {
            deleted,
            inserted,
            duplicates: 0,
            failures: 0,
        });
    }

    let mut inserted = 0usize;
    let mut duplicates = 0usize;
    let mut failures = 0usize;
    for row in rows {
        match insert_row(conn, account, batch_id, row, user) {
            Ok(()) => inserted += 1,
            Err(e) if is_unique_violation(&e) => duplicates += 1,
            Err(e) => {
                failures += 1;
                eprintln!("row insert failed ({} {}): {e}", row.date, row.description);
            }
        }
    }
    Ok(PhaseOutcome {
        deleted,
        inserted,
        duplicates,
        failures,
    })
}

fn bulk_insert(
    conn: &Connection,
    account: &Account,
    batch_id: i64,
    rows: &[ParsedTransaction],
    user: &str,
) -> Result<Option<usize>> {
    let tx = conn.unchecked_transaction()?;
    for row in rows {
        match insert_row(&tx, account, batch_id, row, user) {
            Ok(()) => {}
            Err(e) if is_unique_violation(&e) => {
                tx.rollback()?;
                return Ok(None);
            }
            Err(e) => {
                let _ = tx.rollback();
                return Err(e);
            }
        }
    }
    tx.commit()?;
    Ok(Some(rows.len()))
}

fn insert_row(
    conn: &Connection,
    account: &Account,
    batch_id: i64,
    row: &ParsedTransaction,
    user: &str,
) -> Result<()> {
    let hash = content_hash(account.id, &row.date, row.withdrawal, row.deposit, &row.description);
    let raw = serde_json::to_string(&row.raw).map_err(|e| CashupError::Other(e.to_string()))?;
    conn.execute(
        "INSERT INTO transactions (account_id, date, description, withdrawal, deposit, balance, \
         channel, reference, content_hash, import_batch_id, raw_row, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        rusqlite::params![
            account.id,
            row.date,
            row.description,
            row.withdrawal,
            row.deposit,
            row.balance,
            row.channel,
            row.reference,
            hash,
            batch_id,
            raw,
            user,
        ],
    )?;
    Ok(())
}

fn is_unique_violation(err: &CashupError) -> bool {
    matches!(
        err,
        CashupError::Db(rusqlite::Error::SqliteFailure(e, _))
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ---------------------------------------------------------------------------
// Finalization (step 5)
// ---------------------------------------------------------------------------

/// Runs whether the insert phase succeeded or not: a batch is `completed`
/// iff at least one row landed, `failed` otherwise, and the final counts
/// and error text are always persisted. The only way to skip this is a
/// hard crash, which `repair_pending_batches` heals.
fn finalize_batch(
    conn: &Connection,
    batch_id: i64,
    phase: &Result<PhaseOutcome>,
    metadata: &mut BatchMetadata,
) -> Result<()> {
    let (inserted, status) = match phase {
        Ok(outcome) => {
            metadata.deleted_before_import = outcome.deleted as i64;
            metadata.duplicate_count = outcome.duplicates as i64;
            if outcome.inserted == 0 {
                metadata.import_error = Some(format!(
                    "no rows inserted ({} duplicates, {} failures)",
                    outcome.duplicates, outcome.failures
                ));
                (0, BatchStatus::Failed)
            } else {
                (outcome.inserted, BatchStatus::Completed)
            }
        }
        Err(e) => {
            metadata.import_error = Some(e.to_string());
            (0, BatchStatus::Failed)
        }
    };

    let metadata_json =
        serde_json::to_string(metadata).map_err(|e| CashupError::Other(e.to_string()))?;
    conn.execute(
        "UPDATE import_batches SET status = ?1, inserted_rows = ?2, metadata = ?3, \
         updated_at = datetime('now') WHERE id = ?4",
        rusqlite::params![status.as_str(), inserted as i64, metadata_json, batch_id],
    )?;
    Ok(())
}

// ---------------------------------------------------------------------------
// preview
// ---------------------------------------------------------------------------

/// Parse a file and report what an import would do, without writing.
pub fn preview(
    conn: &Connection,
    account: &Account,
    file_path: &Path,
    mapping: Option<&ColumnMapping>,
) -> Result<PreviewReport> {
    let grid = read_grid(file_path)?;
    let parsed = parse_statement(&grid, mapping)?;

    let mut already_stored = 0usize;
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE account_id = ?1 AND content_hash = ?2",
    )?;
    for row in &parsed.rows {
        let hash =
            content_hash(account.id, &row.date, row.withdrawal, row.deposit, &row.description);
        if stmt.exists(rusqlite::params![account.id, hash])? {
            already_stored += 1;
        }
    }

    let date_range = parsed_date_range(&parsed.rows);
    Ok(PreviewReport {
        format_type: parsed.format_type,
        mapping: parsed.mapping,
        rows: parsed.rows,
        warnings: parsed.warnings,
        already_stored,
        date_range,
    })
}
