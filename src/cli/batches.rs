use comfy_table::{Cell, Table};

use crate::batches::list_batches;
use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::settings::{current_user, get_data_dir};

pub fn run(account: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    let batches = list_batches(&conn, account.id)?;
    if batches.is_empty() {
        println!("No imports yet for {}", account.name);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec![
        "ID", "File", "Mode", "Status", "Rows", "Inserted", "Dups", "Deleted", "Imported",
    ]);
    for batch in batches {
        let (dups, deleted) = batch
            .metadata
            .as_ref()
            .map(|m| (m.duplicate_count, m.deleted_before_import))
            .unwrap_or((0, 0));
        table.add_row(vec![
            Cell::new(batch.id),
            Cell::new(&batch.file_name),
            Cell::new(batch.mode.as_str()),
            Cell::new(batch.status.as_str()),
            Cell::new(batch.declared_rows),
            Cell::new(batch.inserted_rows),
            Cell::new(dups),
            Cell::new(deleted),
            Cell::new(&batch.updated_at),
        ]);
    }
    println!("Import batches for {}\n{table}", account.name);
    Ok(())
}
