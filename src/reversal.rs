use chrono::{Duration, NaiveDate};
use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::error::{FaturaError, Result};
use crate::models::{value_to_db, Transaction, TRANSACTION_COLUMNS};
use crate::similarity::token_overlap;

/// Days searched on each side of the transaction date, inclusive.
pub const REVERSAL_WINDOW_DAYS: i64 = 90;

/// Find an opposite-sign, equal-magnitude, similar-description transaction
/// within ±90 days and link the pair symmetrically. Detection only runs from
/// the expense side; a transaction with a card only matches candidates on
/// that same card. No match is a normal empty result.
///
/// Both updates must land together; the caller provides the enclosing unit
/// of work.
pub fn detect_and_link_reversal(
    conn: &Connection,
    transaction: &Transaction,
    threshold: f64,
) -> Result<Option<Transaction>> {
    let Some(tx_id) = transaction.id else {
        return Ok(None);
    };
    if transaction.is_reversal || transaction.value.is_zero() || transaction.value > Decimal::ZERO {
        return Ok(None);
    }

    let date = NaiveDate::parse_from_str(&transaction.date, "%Y-%m-%d")
        .map_err(|_| FaturaError::InvalidDate(transaction.date.clone()))?;
    let from = (date - Duration::days(REVERSAL_WINDOW_DAYS)).format("%Y-%m-%d").to_string();
    let to = (date + Duration::days(REVERSAL_WINDOW_DAYS)).format("%Y-%m-%d").to_string();
    let opposite = value_to_db(-transaction.value);

    let sql = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE account_id = ?1 AND value = ?2 AND date BETWEEN ?3 AND ?4 \
           AND id != ?5 AND is_reversal = 0 AND related_transaction_id IS NULL \
           AND (?6 IS NULL OR credit_card_id = ?6) \
         ORDER BY id",
    );
    let mut stmt = conn.prepare_cached(&sql)?;
    let candidates = stmt
        .query_map(
            rusqlite::params![
                transaction.account_id,
                opposite,
                from,
                to,
                tx_id,
                transaction.credit_card_id,
            ],
            Transaction::from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for mut candidate in candidates {
        let score = token_overlap(&transaction.description, &candidate.description);
        if score < threshold {
            continue;
        }
        let Some(candidate_id) = candidate.id else { continue };
        conn.execute(
            "UPDATE transactions SET is_reversal = 1, related_transaction_id = ?2 WHERE id = ?1",
            rusqlite::params![tx_id, candidate_id],
        )?;
        conn.execute(
            "UPDATE transactions SET is_reversal = 1, related_transaction_id = ?2 WHERE id = ?1",
            rusqlite::params![candidate_id, tx_id],
        )?;
        candidate.is_reversal = true;
        candidate.related_transaction_id = Some(tx_id);
        return Ok(Some(candidate));
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::models::TransactionSource;
    use crate::parser::normalize_description;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute("INSERT INTO accounts (name) VALUES ('A')", []).unwrap();
        (dir, conn)
    }

    fn insert(
        conn: &Connection,
        date: &str,
        description: &str,
        value: Decimal,
        card_id: Option<i64>,
    ) -> Transaction {
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, normalized_description, \
             value, credit_card_id, source) VALUES (1, ?1, ?2, ?3, ?4, ?5, 'STATEMENT_IMPORT')",
            rusqlite::params![
                date,
                description,
                normalize_description(description),
                value_to_db(value),
                card_id,
            ],
        )
        .unwrap();
        load(conn, conn.last_insert_rowid())
    }

    fn load(conn: &Connection, id: i64) -> Transaction {
        conn.query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
            [id],
            Transaction::from_row,
        )
        .unwrap()
    }

    #[test]
    fn test_links_both_sides() {
        let (_dir, conn) = test_db();
        let expense = insert(&conn, "2025-07-01", "AMAZON PURCHASE 12345", Decimal::new(-9900, 2), None);
        let refund = insert(&conn, "2025-07-20", "AMAZON REFUND 12345", Decimal::new(9900, 2), None);

        let linked = detect_and_link_reversal(&conn, &expense, 0.5).unwrap().unwrap();
        assert_eq!(linked.id, refund.id);

        let a = load(&conn, expense.id.unwrap());
        let b = load(&conn, refund.id.unwrap());
        assert!(a.is_reversal && b.is_reversal);
        assert_eq!(a.related_transaction_id, b.id);
        assert_eq!(b.related_transaction_id, a.id);
    }

    #[test]
    fn test_window_boundaries_inclusive() {
        let (_dir, conn) = test_db();
        let expense = insert(&conn, "2025-07-01", "LOJA X", Decimal::new(-5000, 2), None);
        insert(&conn, "2025-09-29", "LOJA X", Decimal::new(5000, 2), None); // +90 days
        let linked = detect_and_link_reversal(&conn, &expense, 0.5).unwrap();
        assert!(linked.is_some());

        let expense2 = insert(&conn, "2025-07-01", "LOJA Y", Decimal::new(-6000, 2), None);
        insert(&conn, "2025-09-30", "LOJA Y", Decimal::new(6000, 2), None); // +91 days
        assert!(detect_and_link_reversal(&conn, &expense2, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_only_triggered_from_expense_side() {
        let (_dir, conn) = test_db();
        let credit = insert(&conn, "2025-07-01", "LOJA X", Decimal::new(5000, 2), None);
        insert(&conn, "2025-07-02", "LOJA X", Decimal::new(-5000, 2), None);
        assert!(detect_and_link_reversal(&conn, &credit, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_already_reversed_never_reexamined() {
        let (_dir, conn) = test_db();
        let expense = insert(&conn, "2025-07-01", "LOJA X", Decimal::new(-5000, 2), None);
        insert(&conn, "2025-07-05", "LOJA X", Decimal::new(5000, 2), None);
        detect_and_link_reversal(&conn, &expense, 0.5).unwrap().unwrap();

        let reloaded = load(&conn, expense.id.unwrap());
        assert!(detect_and_link_reversal(&conn, &reloaded, 0.5).unwrap().is_none());

        // A second identical expense cannot steal the already-linked refund.
        let expense2 = insert(&conn, "2025-07-02", "LOJA X", Decimal::new(-5000, 2), None);
        assert!(detect_and_link_reversal(&conn, &expense2, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_dissimilar_descriptions_rejected() {
        let (_dir, conn) = test_db();
        let expense = insert(&conn, "2025-07-01", "Grocery Store ABC", Decimal::new(-4200, 2), None);
        insert(&conn, "2025-07-03", "Restaurant XYZ Dinner", Decimal::new(4200, 2), None);
        assert!(detect_and_link_reversal(&conn, &expense, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_card_filter() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO credit_cards (account_id, nickname, last_four, holder_name) \
             VALUES (1, 'Um', '7152', 'A'), (1, 'Dois', '9001', 'B')",
            [],
        )
        .unwrap();
        let expense = insert(&conn, "2025-07-01", "LOJA X", Decimal::new(-5000, 2), Some(1));
        insert(&conn, "2025-07-02", "LOJA X", Decimal::new(5000, 2), Some(2));
        assert!(detect_and_link_reversal(&conn, &expense, 0.5).unwrap().is_none());

        let on_card = insert(&conn, "2025-07-03", "LOJA X", Decimal::new(5000, 2), Some(1));
        let linked = detect_and_link_reversal(&conn, &expense, 0.5).unwrap().unwrap();
        assert_eq!(linked.id, on_card.id);
    }

    #[test]
    fn test_null_card_imposes_no_filter() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO credit_cards (account_id, nickname, last_four, holder_name) \
             VALUES (1, 'Um', '7152', 'A')",
            [],
        )
        .unwrap();
        let expense = insert(&conn, "2025-07-01", "LOJA X", Decimal::new(-5000, 2), None);
        let refund = insert(&conn, "2025-07-02", "LOJA X", Decimal::new(5000, 2), Some(1));
        let linked = detect_and_link_reversal(&conn, &expense, 0.5).unwrap().unwrap();
        assert_eq!(linked.id, refund.id);
    }

    #[test]
    fn test_first_candidate_by_id_wins() {
        let (_dir, conn) = test_db();
        let expense = insert(&conn, "2025-07-10", "LOJA X", Decimal::new(-5000, 2), None);
        let first = insert(&conn, "2025-07-20", "LOJA X", Decimal::new(5000, 2), None);
        insert(&conn, "2025-07-11", "LOJA X", Decimal::new(5000, 2), None);
        let linked = detect_and_link_reversal(&conn, &expense, 0.5).unwrap().unwrap();
        assert_eq!(linked.id, first.id);
        assert_eq!(linked.source, TransactionSource::StatementImport);
    }
}
