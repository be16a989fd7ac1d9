use colored::Colorize;
use comfy_table::Table;

use crate::cli::parse_date_arg;
use crate::db::get_connection;
use crate::error::{FaturaError, Result};
use crate::fmt::money;
use crate::importer::{
    account_id_by_name, category_id_by_name, create_manual_transaction, load_transaction,
    manual_entry_warnings, ManualEntry,
};
use crate::parser::{normalize_description, parse_decimal};
use crate::settings::get_data_dir;

#[allow(clippy::too_many_arguments)]
pub fn add(
    account: &str,
    date: &str,
    description: &str,
    value: &str,
    category: Option<&str>,
    card: Option<&str>,
    users: Vec<String>,
    installments: Option<u32>,
) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;
    let date = parse_date_arg(date)?;
    let value = parse_decimal(value)?;
    let category_id = category.map(|c| category_id_by_name(&conn, c)).transpose()?;
    let credit_card_id = card.map(|c| card_id_by_nickname(&conn, account_id, c)).transpose()?;

    let warnings = manual_entry_warnings(&conn, account_id, date, value)?;
    if !warnings.is_empty() {
        println!("{}", "Possible duplicates of imported data:".yellow());
        for w in &warnings {
            println!(
                "  #{} {} {} {} [{}]",
                w.id,
                w.date,
                w.description,
                money(w.value),
                w.source.as_str(),
            );
        }
    }

    let ids = create_manual_transaction(
        &conn,
        &ManualEntry {
            account_id,
            date,
            description,
            value,
            category_id,
            credit_card_id,
            responsible_users: users,
            installments,
        },
    )?;
    match ids.len() {
        1 => println!("Added transaction #{}", ids[0]),
        n => println!("Added {n} installment transactions"),
    }
    Ok(())
}

pub fn list(account: &str, month: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;

    let month_prefix = month.map(|m| format!("{m}-"));
    let mut stmt = conn.prepare(
        "SELECT t.id, t.date, t.description, t.simplified_description, t.value, c.name, \
                cc.nickname, t.source, t.is_reversal, t.current_installment, t.total_installments \
         FROM transactions t \
         LEFT JOIN categories c ON t.category_id = c.id \
         LEFT JOIN credit_cards cc ON t.credit_card_id = cc.id \
         WHERE t.account_id = ?1 AND (?2 IS NULL OR t.date LIKE ?2 || '%') \
         ORDER BY t.date, t.id",
    )?;
    #[allow(clippy::type_complexity)]
    let rows: Vec<(i64, String, String, Option<String>, String, Option<String>, Option<String>, String, bool, Option<u32>, Option<u32>)> = stmt
        .query_map(rusqlite::params![account_id, month_prefix], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
            ))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Value", "Category", "Card", "Source", "Flags"]);
    for (id, date, description, simplified, value_raw, category, card, source, is_reversal, cur, total) in rows {
        let value = crate::models::value_from_db(4, value_raw)
            .map(money)
            .unwrap_or_else(|_| "?".to_string());
        let mut flags = Vec::new();
        if is_reversal {
            flags.push("reversed".to_string());
        }
        if let (Some(cur), Some(total)) = (cur, total) {
            flags.push(format!("{cur}/{total}"));
        }
        table.add_row(vec![
            id.to_string(),
            date,
            simplified.unwrap_or(description),
            value,
            category.unwrap_or_default(),
            card.unwrap_or_default(),
            source,
            flags.join(" "),
        ]);
    }
    println!("{table}");
    Ok(())
}

pub fn edit(id: i64, description: Option<&str>, category: Option<&str>) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let transaction = load_transaction(&conn, id)
        .map_err(|_| FaturaError::Other(format!("no transaction with id {id}")))?;

    if let Some(desc) = description {
        conn.execute(
            "UPDATE transactions SET description = ?2, normalized_description = ?3 WHERE id = ?1",
            rusqlite::params![id, desc, normalize_description(desc)],
        )?;
    }
    if let Some(cat) = category {
        let category_id = category_id_by_name(&conn, cat)?;
        conn.execute(
            "UPDATE transactions SET category_id = ?2 WHERE id = ?1",
            rusqlite::params![id, category_id],
        )?;
    }
    if transaction.source != crate::models::TransactionSource::Manual {
        conn.execute("UPDATE transactions SET was_edited_after_import = 1 WHERE id = ?1", [id])?;
    }
    println!("Updated transaction #{id}");
    Ok(())
}

fn card_id_by_nickname(conn: &rusqlite::Connection, account_id: i64, nickname: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM credit_cards WHERE account_id = ?1 AND nickname = ?2",
        rusqlite::params![account_id, nickname],
        |row| row.get(0),
    )
    .map_err(|_| FaturaError::UnknownCard(nickname.to_string()))
}
