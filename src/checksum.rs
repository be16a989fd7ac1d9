use rusqlite::Connection;
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::models::value_to_db;
use crate::parser::normalize_description;

/// Stable fingerprint for one transaction within an account. The description
/// goes through `normalize_description`, so PDF-extracted and CSV-extracted
/// renditions of the same line (casing, stray spaces) collide on purpose.
pub fn checksum(account_id: i64, date: &str, description: &str, value: Decimal) -> String {
    let mut hasher = Sha256::new();
    hasher.update(account_id.to_le_bytes());
    hasher.update(b"|");
    hasher.update(date.as_bytes());
    hasher.update(b"|");
    hasher.update(normalize_description(description).as_bytes());
    hasher.update(b"|");
    hasher.update(value_to_db(value).as_bytes());
    hex::encode(hasher.finalize())
}

pub fn checksum_exists(conn: &Connection, account_id: i64, fingerprint: &str) -> Result<bool> {
    let mut stmt = conn
        .prepare_cached("SELECT 1 FROM transactions WHERE account_id = ?1 AND checksum = ?2")?;
    Ok(stmt.exists(rusqlite::params![account_id, fingerprint])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    #[test]
    fn test_whitespace_and_case_insensitive() {
        let v = Decimal::new(19650, 2);
        let a = checksum(1, "2025-07-31", "FeFloresCostura 02/02", v);
        let b = checksum(1, "2025-07-31", "FeFloresCostura     02/02               ", v);
        let c = checksum(1, "2025-07-31", "FEFLORESCOSTURA 02/02", v);
        assert_eq!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_distinct_inputs_differ() {
        let v = Decimal::new(19650, 2);
        let base = checksum(1, "2025-07-31", "FeFloresCostura", v);
        assert_ne!(base, checksum(2, "2025-07-31", "FeFloresCostura", v));
        assert_ne!(base, checksum(1, "2025-08-31", "FeFloresCostura", v));
        assert_ne!(base, checksum(1, "2025-07-31", "Outra Loja", v));
        assert_ne!(base, checksum(1, "2025-07-31", "FeFloresCostura", Decimal::new(19651, 2)));
    }

    #[test]
    fn test_checksum_exists() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        conn.execute("INSERT INTO accounts (name) VALUES ('A')", []).unwrap();
        let fp = checksum(1, "2025-07-31", "LOJA", Decimal::new(-1000, 2));
        assert!(!checksum_exists(&conn, 1, &fp).unwrap());
        conn.execute(
            "INSERT INTO transactions (account_id, date, description, normalized_description, value, source, checksum) \
             VALUES (1, '2025-07-31', 'LOJA', 'loja', '-10.00', 'STATEMENT_IMPORT', ?1)",
            [&fp],
        )
        .unwrap();
        assert!(checksum_exists(&conn, 1, &fp).unwrap());
        assert!(!checksum_exists(&conn, 2, &fp).unwrap());
    }
}
