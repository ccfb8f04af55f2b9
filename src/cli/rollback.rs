use crate::batches::{get_batch, rollback};
use crate::db::get_connection;
use crate::error::{CashupError, Result};
use crate::settings::{current_user, get_data_dir};

pub fn run(batch_id: i64) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;

    let batch = get_batch(&conn, batch_id)?;
    let (name, owner): (String, String) = conn.query_row(
        "SELECT name, owner FROM accounts WHERE id = ?1",
        [batch.account_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if owner != user {
        return Err(CashupError::NotAuthorized {
            account: name,
            user,
        });
    }

    let deleted = rollback(&conn, batch_id)?;
    if deleted == 0 {
        println!(
            "Batch {batch_id} ({}) is {}; nothing to roll back",
            batch.file_name,
            batch.status.as_str()
        );
    } else {
        println!(
            "Rolled back batch {batch_id} ({}): {deleted} transactions deleted",
            batch.file_name
        );
    }
    Ok(())
}
