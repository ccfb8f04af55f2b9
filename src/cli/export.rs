use crate::db::{get_connection, get_owned_account};
use crate::error::Result;
use crate::export::export_csv;
use crate::settings::{current_user, get_data_dir};

pub fn run(account: &str, from: &str, to: &str, output: Option<&str>) -> Result<()> {
    let user = current_user()?;
    let conn = get_connection(&get_data_dir().join("cashup.db"))?;
    let account = get_owned_account(&conn, account, &user)?;

    let csv = export_csv(&conn, &account, &user, from, to)?;
    match output {
        Some(path) => {
            std::fs::write(path, &csv)?;
            println!("Wrote {path}");
        }
        None => print!("{csv}"),
    }
    Ok(())
}
