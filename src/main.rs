mod cards;
mod checksum;
mod cli;
mod csv_export;
mod db;
mod duplicates;
mod error;
mod fmt;
mod importer;
mod mapping;
mod models;
mod parser;
mod reversal;
mod settings;
mod similarity;

use clap::Parser;

use cli::{AccountsCommands, CardsCommands, Cli, Commands, MappingsCommands, TxCommands};

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Accounts { command } => match command {
            AccountsCommands::Add { name } => cli::accounts::add(&name),
            AccountsCommands::List => cli::accounts::list(),
        },
        Commands::Cards { command } => match command {
            CardsCommands::Add { nickname, account, last_four, holder } => {
                cli::accounts::add_card(&nickname, &account, &last_four, &holder)
            }
            CardsCommands::List => cli::accounts::list_cards(),
        },
        Commands::Categories => cli::accounts::list_categories(),
        Commands::Import { file, account } => cli::import::run(&file, &account),
        Commands::Tx { command } => match command {
            TxCommands::Add {
                account,
                date,
                description,
                value,
                category,
                card,
                users,
                installments,
            } => cli::transactions::add(
                &account,
                &date,
                &description,
                &value,
                category.as_deref(),
                card.as_deref(),
                users,
                installments,
            ),
            TxCommands::List { account, month } => {
                cli::transactions::list(&account, month.as_deref())
            }
            TxCommands::Edit { id, description, category } => {
                cli::transactions::edit(id, description.as_deref(), category.as_deref())
            }
        },
        Commands::Mappings { command } => match command {
            MappingsCommands::List { account } => cli::mappings::list(&account),
            MappingsCommands::Set { description, account, simplified, category } => {
                cli::mappings::set(&description, &account, &simplified, category.as_deref())
            }
        },
        Commands::Duplicates { account } => cli::duplicates::run(&account),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
