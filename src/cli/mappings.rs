use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::importer::{account_id_by_name, category_id_by_name};
use crate::mapping;
use crate::settings::get_data_dir;

pub fn list(account: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;
    let mut stmt = conn.prepare(
        "SELECT m.normalized_description, m.simplified_description, c.name \
         FROM description_mappings m \
         LEFT JOIN categories c ON m.category_id = c.id \
         WHERE m.account_id = ?1 ORDER BY m.normalized_description",
    )?;
    let rows: Vec<(String, String, Option<String>)> = stmt
        .query_map([account_id], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["Normalized", "Simplified", "Category"]);
    for (normalized, simplified, category) in rows {
        table.add_row(vec![normalized, simplified, category.unwrap_or_default()]);
    }
    println!("{table}");
    Ok(())
}

pub fn set(
    description: &str,
    account: &str,
    simplified: &str,
    category: Option<&str>,
) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;
    let category_id = category.map(|c| category_id_by_name(&conn, c)).transpose()?;
    mapping::upsert(&conn, account_id, description, simplified, category_id)?;
    println!("Mapping saved and reapplied to existing transactions");
    Ok(())
}
