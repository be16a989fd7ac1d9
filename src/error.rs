use thiserror::Error;

#[derive(Error, Debug)]
pub enum FaturaError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown credit card: {0}")]
    UnknownCard(String),

    #[error("Invalid file: {0}")]
    InvalidFile(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, FaturaError>;
