use comfy_table::{Cell, Table};

use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::settings::{current_user, get_data_dir};

pub fn add(name: &str, currency: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    conn.execute(
        "INSERT INTO accounts (name, owner, currency) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, user, currency],
    )?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let mut stmt = conn.prepare(
        "SELECT id, name, currency, is_active FROM accounts WHERE owner = ?1 ORDER BY name",
    )?;
    let rows: Vec<(i64, String, String, i64)> = stmt
        .query_map([&user], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Currency", "Status"]);
    for (id, name, currency, is_active) in rows {
        table.add_row(vec![
            Cell::new(id),
            Cell::new(name),
            Cell::new(currency),
            Cell::new(if is_active != 0 { "active" } else { "inactive" }),
        ]);
    }
    println!("Accounts\n{table}");
    Ok(())
}

pub fn deactivate(name: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, name, &user)?;
    conn.execute("UPDATE accounts SET is_active = 0 WHERE id = ?1", [account.id])?;
    println!("Deactivated account: {name}");
    Ok(())
}
