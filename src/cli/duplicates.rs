use colored::Colorize;
use comfy_table::Table;

use crate::db::get_connection;
use crate::duplicates::find_all_potential_duplicates;
use crate::error::Result;
use crate::fmt::money;
use crate::importer::account_id_by_name;
use crate::settings::get_data_dir;

pub fn run(account: &str) -> Result<()> {
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;
    let account_id = account_id_by_name(&conn, account)?;
    let clusters = find_all_potential_duplicates(&conn, account_id)?;

    if clusters.is_empty() {
        println!("No duplicate candidates found.");
        return Ok(());
    }

    for (i, cluster) in clusters.iter().enumerate() {
        println!("{}", format!("Cluster {} ({} transactions):", i + 1, cluster.len()).yellow());
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Description", "Value", "Category", "Card", "Source"]);
        for t in cluster {
            table.add_row(vec![
                t.id.to_string(),
                t.date.clone(),
                t.simplified_description.clone().unwrap_or_else(|| t.description.clone()),
                money(t.value),
                t.category_name.clone().unwrap_or_default(),
                t.card_nickname.clone().unwrap_or_default(),
                t.source.as_str().to_string(),
            ]);
        }
        println!("{table}");
    }
    Ok(())
}
