mod batches;
mod cli;
mod db;
mod error;
mod export;
mod fmt;
mod hash;
mod importer;
mod models;
mod parser;
mod position;
mod reconciler;
mod settings;

use clap::Parser;

use cli::{AccountsCommands, Cli, Commands, OpeningCommands, ReportedCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir, user } => cli::init::run(data_dir, user),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name, currency } => cli::accounts::add(&name, &currency),
            AccountsCommands::List => cli::accounts::list(),
            AccountsCommands::Deactivate { name } => cli::accounts::deactivate(&name),
        },
        Commands::Import {
            file,
            account,
            mode,
            map,
        } => cli::import::run(&file, &account, mode, map.as_deref()),
        Commands::Preview { file, account, map } => {
            cli::preview::run(&file, &account, map.as_deref())
        }
        Commands::Batches { account } => cli::batches::run(&account),
        Commands::Rollback { batch_id } => cli::rollback::run(batch_id),
        Commands::Repair { account } => cli::repair::run(&account),
        Commands::Position {
            account,
            from,
            to,
            all,
        } => cli::position::run(account.as_deref(), &from, &to, all),
        Commands::Reconcile { account, from, to } => cli::reconcile::run(&account, &from, &to),
        Commands::Export {
            account,
            from,
            to,
            output,
        } => cli::export::run(&account, &from, &to, output.as_deref()),
        Commands::Opening { command } => match command {
            OpeningCommands::Set {
                account,
                amount,
                date,
            } => cli::balances::opening_set(&account, amount, &date),
        },
        Commands::Reported { command } => match command {
            ReportedCommands::Add {
                account,
                amount,
                date,
            } => cli::balances::reported_add(&account, amount, &date),
            ReportedCommands::List { account } => cli::balances::reported_list(&account),
        },
        Commands::Status => cli::status::run(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
