use comfy_table::{Cell, Table};

use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::fmt::money;
use crate::settings::{current_user, get_data_dir};

pub fn opening_set(account: &str, amount: f64, date: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    conn.execute(
        "INSERT INTO opening_balances (account_id, owner, amount, effective_date) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT(account_id, owner) DO UPDATE SET \
         amount = excluded.amount, effective_date = excluded.effective_date, \
         updated_at = datetime('now')",
        rusqlite::params![account.id, user, amount, date],
    )?;
    println!(
        "Opening balance for {}: {} as of {date}",
        account.name,
        money(amount)
    );
    Ok(())
}

pub fn reported_add(account: &str, amount: f64, date: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    conn.execute(
        "INSERT INTO reported_balances (account_id, owner, amount, reported_date) \
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![account.id, user, amount, date],
    )?;
    println!(
        "Recorded reported balance for {}: {} as of {date}",
        account.name,
        money(amount)
    );
    Ok(())
}

pub fn reported_list(account: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    let mut stmt = conn.prepare(
        "SELECT reported_date, amount, created_at FROM reported_balances \
         WHERE account_id = ?1 AND owner = ?2 ORDER BY reported_date DESC, id DESC",
    )?;
    let rows: Vec<(String, f64, String)> = stmt
        .query_map(rusqlite::params![account.id, user], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        println!("No reported balances for {}", account.name);
        return Ok(());
    }
    let mut table = Table::new();
    table.set_header(vec!["As Of", "Amount", "Recorded"]);
    for (date, amount, created_at) in rows {
        table.add_row(vec![Cell::new(date), Cell::new(money(amount)), Cell::new(created_at)]);
    }
    println!("Reported balances for {}\n{table}", account.name);
    Ok(())
}
