use crate::batches::repair_pending_batches;
use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::settings::{current_user, get_data_dir};

pub fn run(account: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    let repaired = repair_pending_batches(&conn, account.id)?;
    if repaired.is_empty() {
        println!("No pending batches for {}", account.name);
        return Ok(());
    }
    for batch in repaired {
        println!(
            "Batch {} ({}): {} with {} rows",
            batch.batch_id,
            batch.file_name,
            batch.status.as_str(),
            batch.linked_rows
        );
    }
    Ok(())
}
