use std::path::PathBuf;

use comfy_table::{Cell, Table};

use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::fmt::money;
use crate::importer::preview;
use crate::parser::ColumnMapping;
use crate::settings::{current_user, get_data_dir};

const PREVIEW_ROWS: usize = 15;

pub fn run(file: &str, account: &str, map: Option<&str>) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;
    let mapping = map.map(ColumnMapping::parse_spec).transpose()?;

    let report = preview(&conn, &account, &PathBuf::from(file), mapping.as_ref())?;

    println!("Format:   {}", report.format_type);
    println!("Mapping:  {}", report.mapping.to_spec());
    if let Some(range) = &report.date_range {
        println!("Range:    {} to {}", range.start, range.end);
    }
    println!(
        "Rows:     {} total, {} already stored, {} new",
        report.rows.len(),
        report.already_stored,
        report.rows.len() - report.already_stored
    );

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Withdrawal", "Deposit"]);
    for row in report.rows.iter().take(PREVIEW_ROWS) {
        table.add_row(vec![
            Cell::new(&row.date),
            Cell::new(&row.description),
            Cell::new(money(row.withdrawal)),
            Cell::new(money(row.deposit)),
        ]);
    }
    println!("{table}");
    if report.rows.len() > PREVIEW_ROWS {
        println!("... and {} more rows", report.rows.len() - PREVIEW_ROWS);
    }
    for warning in &report.warnings {
        println!("  row {}: {}", warning.row_index + 1, warning.message);
    }
    Ok(())
}
