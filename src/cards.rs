use rusqlite::Connection;

use crate::error::Result;
use crate::models::CreditCard;
use crate::similarity::token_overlap;

fn cards_by_last_four(conn: &Connection, account_id: i64, last_four: &str) -> Result<Vec<CreditCard>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, account_id, nickname, last_four, holder_name FROM credit_cards \
         WHERE account_id = ?1 AND last_four = ?2 ORDER BY id",
    )?;
    let cards = stmt
        .query_map(rusqlite::params![account_id, last_four], |row| {
            Ok(CreditCard {
                id: row.get(0)?,
                account_id: row.get(1)?,
                nickname: row.get(2)?,
                last_four: row.get(3)?,
                holder_name: row.get(4)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cards)
}

/// Match a parsed card section to a stored card. Zero candidates means the
/// transaction persists without a card reference; several cards sharing the
/// same visible digits are disambiguated by holder-name overlap, falling
/// back to the lowest id when nothing clears the threshold.
pub fn resolve_card(
    conn: &Connection,
    account_id: i64,
    last_four: &str,
    holder_name: &str,
    threshold: f64,
) -> Result<Option<CreditCard>> {
    let candidates = cards_by_last_four(conn, account_id, last_four)?;
    if candidates.len() <= 1 {
        return Ok(candidates.into_iter().next());
    }

    let mut best: Option<(f64, CreditCard)> = None;
    for card in &candidates {
        let score = token_overlap(&card.holder_name, holder_name);
        if score < threshold {
            continue;
        }
        match &best {
            Some((top, _)) if score <= *top => {}
            _ => best = Some((score, card.clone())),
        }
    }
    // Scoring ambiguity (no candidate clears the threshold) resolves to the
    // first candidate in id order; equal scores keep the earlier id too.
    Ok(best.map(|(_, card)| card).or_else(|| candidates.into_iter().next()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute("INSERT INTO accounts (name) VALUES ('A')", []).unwrap();
        (dir, conn)
    }

    fn add_card(conn: &Connection, nickname: &str, last_four: &str, holder: &str) -> i64 {
        conn.execute(
            "INSERT INTO credit_cards (account_id, nickname, last_four, holder_name) \
             VALUES (1, ?1, ?2, ?3)",
            rusqlite::params![nickname, last_four, holder],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    #[test]
    fn test_zero_matches_is_none() {
        let (_dir, conn) = test_db();
        assert!(resolve_card(&conn, 1, "7152", "ALEXANDRE C VIEIRA", 0.5).unwrap().is_none());
    }

    #[test]
    fn test_single_match_assigned_without_scoring() {
        let (_dir, conn) = test_db();
        let id = add_card(&conn, "Black", "7152", "COMPLETELY DIFFERENT NAME");
        let card = resolve_card(&conn, 1, "7152", "ALEXANDRE C VIEIRA", 0.5).unwrap().unwrap();
        assert_eq!(card.id, id);
    }

    #[test]
    fn test_multiple_matches_pick_best_holder() {
        let (_dir, conn) = test_db();
        add_card(&conn, "Dele", "7152", "MARIA SILVA");
        let alexandre = add_card(&conn, "Dela", "7152", "ALEXANDRE VIEIRA");
        let card = resolve_card(&conn, 1, "7152", "ALEXANDRE C VIEIRA", 0.5).unwrap().unwrap();
        assert_eq!(card.id, alexandre);
    }

    #[test]
    fn test_tie_resolves_to_first_by_id() {
        let (_dir, conn) = test_db();
        let first = add_card(&conn, "Um", "7152", "FULANO UM");
        add_card(&conn, "Dois", "7152", "FULANO DOIS");
        // Holder matches neither; equal (sub-threshold) scores fall back to
        // the lowest id.
        let card = resolve_card(&conn, 1, "7152", "ZZZ QQQ", 0.5).unwrap().unwrap();
        assert_eq!(card.id, first);
    }
}
