pub mod accounts;
pub mod balances;
pub mod batches;
pub mod export;
pub mod import;
pub mod init;
pub mod position;
pub mod preview;
pub mod reconcile;
pub mod repair;
pub mod rollback;
pub mod status;

use clap::{Parser, Subcommand};

use crate::models::ImportMode;

#[derive(Parser)]
#[command(name = "cashup", about = "Bank statement import and reconciliation CLI.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up cashup: choose a data directory, set your identity, initialize the database.
    Init {
        /// Path for cashup data (default: ~/Documents/cashup)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Your user name; every account and import is owned by it
        #[arg(long)]
        user: Option<String>,
    },
    /// Manage bank accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Import a CSV/XLSX bank statement into an account.
    Import {
        /// Path to CSV or XLSX statement file
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
        /// What existing data is deleted before inserting
        #[arg(long, value_enum, default_value = "append")]
        mode: ImportMode,
        /// Explicit column mapping, e.g. date=0,description=1,withdrawal=2,deposit=3
        #[arg(long)]
        map: Option<String>,
    },
    /// Parse a statement and show what an import would do, without writing.
    Preview {
        /// Path to CSV or XLSX statement file
        file: String,
        /// Account name to preview against
        #[arg(long)]
        account: String,
        /// Explicit column mapping, e.g. date=0,description=1,withdrawal=2,deposit=3
        #[arg(long)]
        map: Option<String>,
    },
    /// List import batches for an account.
    Batches {
        /// Account name
        account: String,
    },
    /// Undo a completed import batch.
    Rollback {
        /// Batch id (see `cashup batches`)
        batch_id: i64,
    },
    /// Settle batches left pending by an interrupted import.
    Repair {
        /// Account name
        account: String,
    },
    /// Daily cash movement and running balance.
    Position {
        /// Account name; omit with --all for every active account
        account: Option<String>,
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Aggregate all active accounts
        #[arg(long)]
        all: bool,
    },
    /// Compare the computed closing balance against the latest reported balance.
    Reconcile {
        /// Account name
        account: String,
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },
    /// Export transactions with running balances as CSV.
    Export {
        /// Account name
        account: String,
        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        to: String,
        /// Output file (default: stdout)
        #[arg(long)]
        output: Option<String>,
    },
    /// Set or update the opening balance for an account.
    Opening {
        #[command(subcommand)]
        command: OpeningCommands,
    },
    /// Record balances observed in the bank's own app or site.
    Reported {
        #[command(subcommand)]
        command: ReportedCommands,
    },
    /// Show current database and summary statistics.
    Status,
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new bank account.
    Add {
        /// Account name, e.g. 'BofA Checking'
        name: String,
        /// ISO currency code
        #[arg(long, default_value = "USD")]
        currency: String,
    },
    /// List your accounts.
    List,
    /// Deactivate an account; its transactions are kept.
    Deactivate {
        /// Account name
        name: String,
    },
}

#[derive(Subcommand)]
pub enum OpeningCommands {
    /// Upsert the balance known to be correct as of a date.
    Set {
        /// Account name
        account: String,
        /// Balance amount
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,
        /// Effective date (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
}

#[derive(Subcommand)]
pub enum ReportedCommands {
    /// Append a balance observation.
    Add {
        /// Account name
        account: String,
        /// Observed balance
        #[arg(long, allow_hyphen_values = true)]
        amount: f64,
        /// Date the balance was observed (YYYY-MM-DD)
        #[arg(long)]
        date: String,
    },
    /// List balance observations, newest first.
    List {
        /// Account name
        account: String,
    },
}
