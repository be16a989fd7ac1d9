use comfy_table::Table;

use crate::db::get_connection;
use crate::error::Result;
use crate::importer::account_id_by_name;
use crate::settings::get_data_dir;

pub fn add(name: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    conn.execute("INSERT INTO accounts (name) VALUES (?1)", [name])?;
    println!("Added account: {name}");
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let mut stmt = conn.prepare("SELECT id, name FROM accounts ORDER BY id")?;
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for (id, name) in rows {
        table.add_row(vec![id.to_string(), name]);
    }
    println!("{table}");
    Ok(())
}

pub fn add_card(nickname: &str, account: &str, last_four: &str, holder: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;
    conn.execute(
        "INSERT INTO credit_cards (account_id, nickname, last_four, holder_name) \
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![account_id, nickname, last_four, holder],
    )?;
    println!("Added card: {nickname} (•••• {last_four})");
    Ok(())
}

pub fn list_cards() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let mut stmt = conn.prepare(
        "SELECT cc.id, cc.nickname, cc.last_four, cc.holder_name, a.name \
         FROM credit_cards cc JOIN accounts a ON cc.account_id = a.id ORDER BY cc.id",
    )?;
    let rows: Vec<(i64, String, String, String, String)> = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Nickname", "Last four", "Holder", "Account"]);
    for (id, nickname, last_four, holder, account) in rows {
        table.add_row(vec![id.to_string(), nickname, last_four, holder, account]);
    }
    println!("{table}");
    Ok(())
}

pub fn list_categories() -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let mut stmt = conn.prepare("SELECT id, name FROM categories WHERE is_active = 1 ORDER BY name")?;
    let rows: Vec<(i64, String)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for (id, name) in rows {
        table.add_row(vec![id.to_string(), name]);
    }
    println!("{table}");
    Ok(())
}
