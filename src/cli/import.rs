use std::path::PathBuf;

use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::importer::import;
use crate::models::ImportMode;
use crate::parser::ColumnMapping;
use crate::settings::{current_user, get_data_dir};

pub fn run(file: &str, account: &str, mode: ImportMode, map: Option<&str>) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;
    let mapping = map.map(ColumnMapping::parse_spec).transpose()?;

    let summary = import(
        &conn,
        &account,
        &PathBuf::from(file),
        mapping.as_ref(),
        mode,
        &user,
    )?;

    println!("{} (batch {})", summary.message, summary.batch_id);
    for warning in &summary.warnings {
        println!("  row {}: {}", warning.row_index + 1, warning.message);
    }
    Ok(())
}
