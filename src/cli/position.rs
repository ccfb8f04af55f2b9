use comfy_table::{Cell, Table};

use crate::db::{get_connection, get_owned_account};
use crate::error::{CashupError, Result};
use crate::fmt::money;
use crate::position::{cash_position, company_position, CashPosition};
use crate::settings::{current_user, get_data_dir};

pub fn run(account: Option<&str>, from: &str, to: &str, all: bool) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;

    if all {
        let company = company_position(&conn, &user, from, to)?;
        if company.accounts.is_empty() {
            println!("No active accounts.");
        }
        for (account, position) in &company.accounts {
            println!("{} ({})", account.name, account.currency);
            print_position(position);
            println!();
        }
        println!(
            "All accounts: in {} / out {} / net {} / closing {}",
            money(company.total_in),
            money(company.total_out),
            money(company.net_movement),
            money(company.closing_balance)
        );
        return Ok(());
    }

    let name = account.ok_or_else(|| {
        CashupError::Other("an account name is required unless --all is given".to_string())
    })?;
    let account = get_owned_account(&conn, name, &user)?;
    let position = cash_position(&conn, &account, &user, from, to)?;
    println!("{} ({}), {from} to {to}", account.name, account.currency);
    print_position(&position);
    Ok(())
}

fn print_position(position: &CashPosition) {
    match &position.opening_date {
        Some(date) => println!("Opening: {} (as of {date})", money(position.opening_balance)),
        None => println!("Opening: {} (default)", money(position.opening_balance)),
    }

    let mut table = Table::new();
    table.set_header(vec!["Date", "Cash In", "Cash Out", "Net", "Running", "Txns"]);
    for day in &position.days {
        table.add_row(vec![
            Cell::new(&day.date),
            Cell::new(money(day.cash_in)),
            Cell::new(money(day.cash_out)),
            Cell::new(money(day.net)),
            Cell::new(money(day.running_balance)),
            Cell::new(day.txn_count),
        ]);
    }
    println!("{table}");
    println!(
        "Totals: in {} / out {} / net {} / closing {}",
        money(position.total_in),
        money(position.total_out),
        money(position.net_movement),
        money(position.closing_balance)
    );
}
