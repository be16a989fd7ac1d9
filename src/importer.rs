use std::path::Path;

use chrono::{Months, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::cards::resolve_card;
use crate::checksum::{checksum, checksum_exists};
use crate::error::{FaturaError, Result};
use crate::mapping::MappingResolver;
use crate::models::{value_to_db, Transaction, TransactionSource, TRANSACTION_COLUMNS};
use crate::parser::{normalize_description, parse_statement, LineError, ParsedStatement};
use crate::reversal::detect_and_link_reversal;
use crate::settings::Settings;
use crate::{csv_export, duplicates};

// ---------------------------------------------------------------------------
// Import kinds — enum dispatch instead of trait objects
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ImportKind {
    /// Plain text extracted from the issuer's PDF statement.
    StatementText,
    /// The issuer's legacy semicolon-delimited CSV export.
    GenericCsv,
}

impl ImportKind {
    pub fn source(&self) -> TransactionSource {
        match self {
            Self::StatementText => TransactionSource::StatementImport,
            Self::GenericCsv => TransactionSource::GenericCsvImport,
        }
    }

    pub fn for_file(file_path: &Path) -> Result<Self> {
        let ext = file_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "txt" => Ok(Self::StatementText),
            "csv" => Ok(Self::GenericCsv),
            _ => Err(FaturaError::InvalidFile(format!(
                "unsupported extension: {}",
                file_path.display()
            ))),
        }
    }

    fn parse(&self, bytes: &[u8]) -> Result<ParsedStatement> {
        match self {
            Self::StatementText => {
                let text = String::from_utf8(bytes.to_vec())
                    .map_err(|_| FaturaError::InvalidFile("statement text is not UTF-8".into()))?;
                Ok(parse_statement(&text))
            }
            Self::GenericCsv => {
                let lines = csv_export::statement_lines_from_csv(bytes)?;
                Ok(parse_statement(&lines.join("\n")))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// import_file
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
    pub new_mappings: usize,
    pub errors: Vec<LineError>,
}

pub fn import_file(
    conn: &Connection,
    file_path: &Path,
    account_name: &str,
    settings: &Settings,
) -> Result<ImportSummary> {
    let kind = ImportKind::for_file(file_path)?;
    let bytes = std::fs::read(file_path)?;
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(FaturaError::InvalidFile(format!("empty file: {}", file_path.display())));
    }
    let account_id = account_id_by_name(conn, account_name)?;
    let parsed = kind.parse(&bytes)?;

    // Every persistence step of one import shares one unit of work: a
    // mid-import failure must not leave a transaction without its checksum
    // or a reversal link set on only one side.
    let unit = conn.unchecked_transaction()?;
    let mut summary = import_sections(conn, account_id, kind, parsed, settings)?;

    conn.execute(
        "INSERT INTO imports (filename, account_id, imported_count, skipped_count, error_count) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            file_path.file_name().and_then(|n| n.to_str()).unwrap_or(""),
            account_id,
            summary.imported as i64,
            summary.skipped as i64,
            summary.errors.len() as i64,
        ],
    )?;
    unit.commit()?;
    summary.errors.sort_by_key(|e| e.line_number);
    Ok(summary)
}

fn import_sections(
    conn: &Connection,
    account_id: i64,
    kind: ImportKind,
    parsed: ParsedStatement,
    settings: &Settings,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary { errors: parsed.errors, ..Default::default() };
    let mut resolver = MappingResolver::new(account_id);

    for section in parsed.sections {
        let card = resolve_card(
            conn,
            account_id,
            &section.last_four,
            &section.holder_name,
            settings.holder_similarity_threshold,
        )?;
        let card_id = card.map(|c| c.id);

        for line in section.lines {
            // Every statement line is stored as a non-positive value: a
            // purchase becomes an expense, an already-negative payment line
            // keeps its sign.
            let value = -line.value_local.abs();
            let date = line.date.format("%Y-%m-%d").to_string();
            let fingerprint = checksum(account_id, &date, &line.raw_description, value);
            if checksum_exists(conn, account_id, &fingerprint)? {
                summary.skipped += 1;
                continue;
            }

            let mapping = resolver.resolve(conn, &line.description)?;
            let inserted = conn.execute(
                "INSERT INTO transactions (account_id, date, description, \
                 normalized_description, simplified_description, value, category_id, \
                 credit_card_id, source, checksum, current_installment, total_installments) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    account_id,
                    date,
                    line.raw_description,
                    normalize_description(&line.description),
                    mapping.simplified_description,
                    value_to_db(value),
                    mapping.category_id,
                    card_id,
                    kind.source().as_str(),
                    fingerprint,
                    line.current_installment,
                    line.total_installments,
                ],
            );
            match inserted {
                Ok(_) => {}
                // A concurrent import won the race on (account, checksum);
                // that is "already exists", not a failure.
                Err(e) if is_unique_violation(&e) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            }

            let transaction = load_transaction(conn, conn.last_insert_rowid())?;
            detect_and_link_reversal(conn, &transaction, settings.reversal_similarity_threshold)?;
            summary.imported += 1;
        }
    }

    summary.new_mappings = resolver.flush(conn)?;
    Ok(summary)
}

// Only a UNIQUE failure means "row already exists". Other constraint
// failures (foreign key, NOT NULL) are genuine storage errors and must
// propagate.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

// ---------------------------------------------------------------------------
// Manual entry
// ---------------------------------------------------------------------------

pub struct ManualEntry<'a> {
    pub account_id: i64,
    pub date: NaiveDate,
    pub description: &'a str,
    pub value: Decimal,
    pub category_id: Option<i64>,
    pub credit_card_id: Option<i64>,
    pub responsible_users: Vec<String>,
    /// Some(n) creates an installment series of n monthly transactions.
    pub installments: Option<u32>,
}

/// Persist a MANUAL transaction, or an installment series when requested:
/// n rows sharing a fresh group id, numbered 1..n, each dated one calendar
/// month after the previous. Returns the inserted row ids.
pub fn create_manual_transaction(conn: &Connection, entry: &ManualEntry) -> Result<Vec<i64>> {
    let total = entry.installments.unwrap_or(1);
    if total == 0 {
        return Err(FaturaError::InvalidValue("installments must be at least 1".into()));
    }
    let group_id = (total > 1).then(|| Uuid::new_v4().to_string());
    let users = serde_json::to_string(&entry.responsible_users)
        .map_err(|e| FaturaError::Other(e.to_string()))?;

    let unit = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(total as usize);
    for n in 0..total {
        let date = entry
            .date
            .checked_add_months(Months::new(n))
            .ok_or_else(|| FaturaError::InvalidDate(entry.date.to_string()))?;
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, \
             normalized_description, value, category_id, credit_card_id, \
             responsible_users, source, installment_group_id, current_installment, \
             total_installments) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'MANUAL', ?9, ?10, ?11)",
            rusqlite::params![
                entry.account_id,
                date.format("%Y-%m-%d").to_string(),
                entry.description,
                normalize_description(entry.description),
                value_to_db(entry.value),
                entry.category_id,
                entry.credit_card_id,
                users,
                group_id,
                group_id.as_ref().map(|_| n + 1),
                group_id.as_ref().map(|_| total),
            ],
        )?;
        ids.push(conn.last_insert_rowid());
    }
    unit.commit()?;
    Ok(ids)
}

/// Collisions a manual entry should warn about before being saved.
pub fn manual_entry_warnings(
    conn: &Connection,
    account_id: i64,
    date: NaiveDate,
    value: Decimal,
) -> Result<Vec<duplicates::DuplicateSummary>> {
    duplicates::find_potential_duplicates_for_manual_entry(conn, account_id, date, value)
}

// ---------------------------------------------------------------------------
// Lookups shared with the CLI
// ---------------------------------------------------------------------------

pub fn account_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM accounts WHERE name = ?1", [name], |row| row.get(0))
        .map_err(|_| FaturaError::UnknownAccount(name.to_string()))
}

pub fn category_id_by_name(conn: &Connection, name: &str) -> Result<i64> {
    conn.query_row("SELECT id FROM categories WHERE name = ?1", [name], |row| row.get(0))
        .map_err(|_| FaturaError::UnknownCategory(name.to_string()))
}

pub fn load_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    let sql = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1");
    Ok(conn.query_row(&sql, [id], Transaction::from_row)?)
}
