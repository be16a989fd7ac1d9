use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{value_from_db, value_to_db, TransactionSource};

/// Days searched on each side when pairing near-date transactions.
pub const DUPLICATE_WINDOW_DAYS: i64 = 3;

/// Lightweight transaction view for duplicate review output. Read-only;
/// nothing here links or merges.
#[derive(Debug, Clone)]
pub struct DuplicateSummary {
    pub id: i64,
    pub date: String,
    pub description: String,
    pub simplified_description: Option<String>,
    pub value: Decimal,
    pub category_name: Option<String>,
    pub card_nickname: Option<String>,
    pub source: TransactionSource,
}

fn summary_from_row(row: &rusqlite::Row) -> rusqlite::Result<DuplicateSummary> {
    let value_raw: String = row.get(4)?;
    let source_raw: String = row.get(7)?;
    let source = TransactionSource::parse(&source_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("unknown transaction source: {source_raw}").into(),
        )
    })?;
    Ok(DuplicateSummary {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        simplified_description: row.get(3)?,
        value: value_from_db(4, value_raw)?,
        category_name: row.get(5)?,
        card_nickname: row.get(6)?,
        source,
    })
}

const SUMMARY_SELECT: &str = "SELECT t.id, t.date, t.description, t.simplified_description, \
    t.value, c.name, cc.nickname, t.source \
    FROM transactions t \
    LEFT JOIN categories c ON t.category_id = c.id \
    LEFT JOIN credit_cards cc ON t.credit_card_id = cc.id";

/// Warn a manual entry about collisions with previously-imported data:
/// same value (not sign-inverted), within ±3 days, non-MANUAL source only.
/// Other manual entries never trigger the warning.
pub fn find_potential_duplicates_for_manual_entry(
    conn: &Connection,
    account_id: i64,
    date: NaiveDate,
    value: Decimal,
) -> Result<Vec<DuplicateSummary>> {
    let from = (date - Duration::days(DUPLICATE_WINDOW_DAYS)).format("%Y-%m-%d").to_string();
    let to = (date + Duration::days(DUPLICATE_WINDOW_DAYS)).format("%Y-%m-%d").to_string();
    let sql = format!(
        "{SUMMARY_SELECT} \
         WHERE t.account_id = ?1 AND t.value = ?2 AND t.date BETWEEN ?3 AND ?4 \
           AND t.source != 'MANUAL' \
         ORDER BY t.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![account_id, value_to_db(value), from, to],
            summary_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Scan the whole account for duplicate candidate clusters: equal value,
/// every pair within ±3 days, and at least two distinct entry sources.
/// N identical rows from one source are legitimate repeats, never a cluster.
pub fn find_all_potential_duplicates(
    conn: &Connection,
    account_id: i64,
) -> Result<Vec<Vec<DuplicateSummary>>> {
    let sql = format!(
        "{SUMMARY_SELECT} WHERE t.account_id = ?1 ORDER BY t.value, t.date, t.id"
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let all = stmt
        .query_map([account_id], summary_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    // Slide the anchor over every row: each candidate group is the maximal
    // run of equal-value rows dated within 3 days after its anchor (rows are
    // date-ordered, so that bounds every pairwise gap too). A same-source run
    // must not swallow a later cross-source pair, hence per-row anchoring;
    // a group already fully inside the last reported cluster is a subset and
    // is not reported again.
    let mut clusters: Vec<Vec<DuplicateSummary>> = Vec::new();
    let mut reported_end = 0usize;
    for start in 0..all.len() {
        let anchor = &all[start];
        let mut end = start + 1;
        while end < all.len()
            && all[end].value == anchor.value
            && within_window(&anchor.date, &all[end].date)
        {
            end += 1;
        }
        if end - start < 2 || end <= reported_end {
            continue;
        }
        let group = &all[start..end];
        if distinct_source_count(group) >= 2 {
            clusters.push(group.to_vec());
            reported_end = end;
        }
    }
    Ok(clusters)
}

fn within_window(a: &str, b: &str) -> bool {
    let (Ok(da), Ok(db)) = (
        NaiveDate::parse_from_str(a, "%Y-%m-%d"),
        NaiveDate::parse_from_str(b, "%Y-%m-%d"),
    ) else {
        return false;
    };
    (db - da).num_days().abs() <= DUPLICATE_WINDOW_DAYS
}

fn distinct_source_count(group: &[DuplicateSummary]) -> usize {
    let mut sources: Vec<&str> = group.iter().map(|s| s.source.as_str()).collect();
    sources.sort_unstable();
    sources.dedup();
    sources.len()
}
