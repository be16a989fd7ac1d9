use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Where a transaction came from. Closed set — persisted as TEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionSource {
    Manual,
    StatementImport,
    GenericCsvImport,
}

impl TransactionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "MANUAL",
            Self::StatementImport => "STATEMENT_IMPORT",
            Self::GenericCsvImport => "GENERIC_CSV_IMPORT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MANUAL" => Some(Self::Manual),
            "STATEMENT_IMPORT" => Some(Self::StatementImport),
            "GENERIC_CSV_IMPORT" => Some(Self::GenericCsvImport),
            _ => None,
        }
    }
}

/// Canonical DB text for a money value: fixed two decimal places, so that
/// SQL equality on the column is exact ("196.5" and "196.50" never coexist).
pub fn value_to_db(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

/// Parse a money value read back from the DB inside a rusqlite row closure.
pub fn value_from_db(idx: usize, raw: String) -> rusqlite::Result<Decimal> {
    Decimal::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct CreditCard {
    pub id: i64,
    pub account_id: i64,
    pub nickname: String,
    pub last_four: String,
    pub holder_name: String,
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Option<i64>,
    pub account_id: i64,
    /// ISO date, YYYY-MM-DD.
    pub date: String,
    pub description: String,
    pub simplified_description: Option<String>,
    pub value: Decimal,
    pub category_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub responsible_users: Vec<String>,
    pub source: TransactionSource,
    pub was_edited_after_import: bool,
    pub is_reversal: bool,
    pub related_transaction_id: Option<i64>,
    pub checksum: Option<String>,
    pub installment_group_id: Option<String>,
    pub current_installment: Option<u32>,
    pub total_installments: Option<u32>,
}

/// Column list matching `Transaction::from_row`. Keep the two in sync.
pub const TRANSACTION_COLUMNS: &str = "id, account_id, date, description, \
    simplified_description, value, category_id, credit_card_id, responsible_users, \
    source, was_edited_after_import, is_reversal, related_transaction_id, checksum, \
    installment_group_id, current_installment, total_installments";

impl Transaction {
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let value_raw: String = row.get(5)?;
        let users_raw: String = row.get(8)?;
        let source_raw: String = row.get(9)?;
        let source = TransactionSource::parse(&source_raw).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                rusqlite::types::Type::Text,
                format!("unknown transaction source: {source_raw}").into(),
            )
        })?;
        Ok(Self {
            id: row.get(0)?,
            account_id: row.get(1)?,
            date: row.get(2)?,
            description: row.get(3)?,
            simplified_description: row.get(4)?,
            value: value_from_db(5, value_raw)?,
            category_id: row.get(6)?,
            credit_card_id: row.get(7)?,
            responsible_users: serde_json::from_str(&users_raw).unwrap_or_default(),
            source,
            was_edited_after_import: row.get(10)?,
            is_reversal: row.get(11)?,
            related_transaction_id: row.get(12)?,
            checksum: row.get(13)?,
            installment_group_id: row.get(14)?,
            current_installment: row.get(15)?,
            total_installments: row.get(16)?,
        })
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct DescriptionMapping {
    pub id: Option<i64>,
    pub account_id: i64,
    pub normalized_description: String,
    pub simplified_description: String,
    pub category_id: Option<i64>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub id: Option<i64>,
    pub filename: String,
    pub account_id: i64,
    pub imported_count: i64,
    pub skipped_count: i64,
    pub error_count: i64,
}

/// One statement line after grammar parsing, before persistence.
///
/// `description` has any trailing installment token (`NN/NN`) stripped;
/// `raw_description` is the text exactly as it appeared between the date and
/// the amounts, and is what gets persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTransactionLine {
    pub date: NaiveDate,
    pub description: String,
    pub raw_description: String,
    pub value_local: Decimal,
    pub value_foreign: Option<Decimal>,
    pub current_installment: Option<u32>,
    pub total_installments: Option<u32>,
    pub card_last_four: String,
    pub card_holder_name: String,
}

/// The run of transaction lines between one card-header line and the next.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCardSection {
    pub last_four: String,
    pub holder_name: String,
    pub lines: Vec<ParsedTransactionLine>,
}
