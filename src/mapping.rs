use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::Result;
use crate::parser::normalize_description;

/// What an import line gets from the mapping layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMapping {
    pub simplified_description: String,
    pub category_id: Option<i64>,
}

/// Account-scoped description→(simplified, category) resolver.
///
/// First sight of a description records a pending mapping (simplified
/// defaults to the description itself, category unset); pending mappings are
/// batch-persisted once by `flush` at the end of an import pass.
pub struct MappingResolver {
    account_id: i64,
    pending: HashMap<String, ResolvedMapping>,
}

impl MappingResolver {
    pub fn new(account_id: i64) -> Self {
        Self { account_id, pending: HashMap::new() }
    }

    pub fn resolve(&mut self, conn: &Connection, description: &str) -> Result<ResolvedMapping> {
        let normalized = normalize_description(description);
        if let Some(found) = lookup(conn, self.account_id, &normalized)? {
            return Ok(found);
        }
        if let Some(pending) = self.pending.get(&normalized) {
            return Ok(pending.clone());
        }
        let fresh = ResolvedMapping {
            simplified_description: description.to_string(),
            category_id: None,
        };
        self.pending.insert(normalized, fresh.clone());
        Ok(fresh)
    }

    /// Persist pending mappings in one batch and reapply each to existing
    /// transactions. A concurrent import may have created the same key
    /// first; INSERT OR IGNORE turns that race into "reuse it".
    pub fn flush(&mut self, conn: &Connection) -> Result<usize> {
        let mut created = 0usize;
        let mut stmt = conn.prepare_cached(
            "INSERT OR IGNORE INTO description_mappings \
             (account_id, normalized_description, simplified_description, category_id) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for (normalized, mapping) in self.pending.drain() {
            created += stmt.execute(rusqlite::params![
                self.account_id,
                normalized,
                mapping.simplified_description,
                mapping.category_id,
            ])?;
            reapply(conn, self.account_id, &normalized)?;
        }
        Ok(created)
    }
}

fn lookup(conn: &Connection, account_id: i64, normalized: &str) -> Result<Option<ResolvedMapping>> {
    let mut stmt = conn.prepare_cached(
        "SELECT simplified_description, category_id FROM description_mappings \
         WHERE account_id = ?1 AND normalized_description = ?2",
    )?;
    let found = stmt
        .query_row(rusqlite::params![account_id, normalized], |row| {
            Ok(ResolvedMapping {
                simplified_description: row.get(0)?,
                category_id: row.get(1)?,
            })
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    Ok(found)
}

/// Rewrite simplified description and category of every existing transaction
/// in the account whose normalized description matches the mapping. Runs on
/// every mapping create/update, import or direct edit alike.
pub fn reapply(conn: &Connection, account_id: i64, normalized: &str) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE transactions SET \
             simplified_description = (SELECT m.simplified_description \
                 FROM description_mappings m \
                 WHERE m.account_id = ?1 AND m.normalized_description = ?2), \
             category_id = (SELECT m.category_id \
                 FROM description_mappings m \
                 WHERE m.account_id = ?1 AND m.normalized_description = ?2) \
         WHERE account_id = ?1 AND normalized_description = ?2 \
           AND EXISTS (SELECT 1 FROM description_mappings m \
                 WHERE m.account_id = ?1 AND m.normalized_description = ?2)",
        rusqlite::params![account_id, normalized],
    )?;
    Ok(updated)
}

/// Create or update a mapping directly (the `mappings set` command), then
/// reapply it. `description` may be given in any form; it goes through the
/// same normalization as import lookups.
pub fn upsert(
    conn: &Connection,
    account_id: i64,
    description: &str,
    simplified: &str,
    category_id: Option<i64>,
) -> Result<()> {
    let normalized = normalize_description(description);
    conn.execute(
        "INSERT INTO description_mappings \
             (account_id, normalized_description, simplified_description, category_id) \
         VALUES (?1, ?2, ?3, ?4) \
         ON CONFLICT (account_id, normalized_description) DO UPDATE SET \
             simplified_description = excluded.simplified_description, \
             category_id = excluded.category_id",
        rusqlite::params![account_id, normalized, simplified, category_id],
    )?;
    reapply(conn, account_id, &normalized)?;
    Ok(())
}
