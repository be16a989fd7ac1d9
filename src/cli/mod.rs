pub mod accounts;
pub mod duplicates;
pub mod import;
pub mod init;
pub mod mappings;
pub mod transactions;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use crate::error::{FaturaError, Result};

/// Dates are accepted in ISO (2025-07-31) or statement (31/07/2025) form.
pub(crate) fn parse_date_arg(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| FaturaError::InvalidDate(raw.to_string()))
}

#[derive(Parser)]
#[command(name = "fatura", about = "Credit-card statement reconciliation CLI.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up Fatura: choose a data directory and initialize the database.
    Init {
        /// Path for Fatura data (default: ~/Documents/fatura)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Manage stored credit cards.
    Cards {
        #[command(subcommand)]
        command: CardsCommands,
    },
    /// List categories.
    Categories,
    /// Import a statement export (.txt from PDF extraction, or .csv).
    Import {
        /// Path to the statement file
        file: String,
        /// Account name to import into
        #[arg(long)]
        account: String,
    },
    /// Manage transactions.
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Manage description mappings.
    Mappings {
        #[command(subcommand)]
        command: MappingsCommands,
    },
    /// Scan an account for cross-source duplicate candidates.
    Duplicates {
        /// Account name
        #[arg(long)]
        account: String,
    },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// Add a new account.
    Add {
        /// Account name, e.g. 'Principal'
        name: String,
    },
    /// List all accounts.
    List,
}

#[derive(Subcommand)]
pub enum CardsCommands {
    /// Register a credit card for an account.
    Add {
        /// Card nickname, e.g. 'Black'
        nickname: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Last 4 visible digits
        #[arg(long = "last-four")]
        last_four: String,
        /// Holder name as printed on the statement
        #[arg(long)]
        holder: String,
    },
    /// List all cards.
    List,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Add a manual transaction (warns about likely imported duplicates).
    Add {
        /// Account name
        #[arg(long)]
        account: String,
        /// Date: YYYY-MM-DD or DD/MM/YYYY
        #[arg(long)]
        date: String,
        /// Description
        #[arg(long)]
        description: String,
        /// Value in statement format, e.g. -196,50
        #[arg(long)]
        value: String,
        /// Category name
        #[arg(long)]
        category: Option<String>,
        /// Card nickname
        #[arg(long)]
        card: Option<String>,
        /// Responsible user (repeatable)
        #[arg(long = "user")]
        users: Vec<String>,
        /// Create a monthly installment series of this many transactions
        #[arg(long)]
        installments: Option<u32>,
    },
    /// List transactions for an account.
    List {
        /// Account name
        #[arg(long)]
        account: String,
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Edit a transaction's description or category.
    Edit {
        /// Transaction ID (shown in `fatura tx list`)
        id: i64,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New category name
        #[arg(long)]
        category: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum MappingsCommands {
    /// List description mappings for an account.
    List {
        /// Account name
        #[arg(long)]
        account: String,
    },
    /// Create or update a mapping; reapplies to existing transactions.
    Set {
        /// Description to map (any rendition; it gets normalized)
        description: String,
        /// Account name
        #[arg(long)]
        account: String,
        /// Simplified description to show
        #[arg(long)]
        simplified: String,
        /// Category name to assign
        #[arg(long)]
        category: Option<String>,
    },
}
