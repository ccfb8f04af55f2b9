use colored::Colorize;

use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::fmt::money;
use crate::reconciler::balance_summary;
use crate::settings::{current_user, get_data_dir};

pub fn run(account: &str, from: &str, to: &str) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    let summary = balance_summary(&conn, &account, &user, from, to)?;

    println!("{} ({}), {from} to {to}", account.name, account.currency);
    match &summary.opening_date {
        Some(date) => println!("Opening:   {} (as of {date})", money(summary.opening_balance)),
        None => println!("Opening:   {} (default)", money(summary.opening_balance)),
    }
    println!("Movement:  {}", money(summary.net_movement));
    println!("Expected:  {}", money(summary.expected_closing));

    match (summary.reported_balance, &summary.reported_date, summary.delta) {
        (Some(reported), Some(date), Some(delta)) => {
            println!("Reported:  {} (as of {date})", money(reported));
            if summary.mismatch {
                println!("{} delta {}", "MISMATCH:".red().bold(), money(delta));
            } else {
                println!("{}", "Balances agree.".green());
            }
        }
        _ => {
            println!("Reported:  none on record; add one with `cashup reported add`");
        }
    }
    Ok(())
}
