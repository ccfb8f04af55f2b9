use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join("cashup.db");

    println!(
        "User:       {}",
        if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name }
    );
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let conn = get_connection(&db_path)?;
        let accounts: i64 = conn.query_row("SELECT count(*) FROM accounts", [], |r| r.get(0))?;
        let transactions: i64 =
            conn.query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))?;
        let batches: i64 =
            conn.query_row("SELECT count(*) FROM import_batches", [], |r| r.get(0))?;
        let pending: i64 = conn.query_row(
            "SELECT count(*) FROM import_batches WHERE status = 'pending'",
            [],
            |r| r.get(0),
        )?;

        println!();
        println!("Accounts:      {accounts}");
        println!("Transactions:  {transactions}");
        println!("Batches:       {batches}");
        if pending > 0 {
            println!("Pending:       {pending} (run `cashup repair <account>`)");
        }
    } else {
        println!();
        println!("Database not found. Run `cashup init` to set up.");
    }

    Ok(())
}
