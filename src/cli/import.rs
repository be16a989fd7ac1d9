use std::path::PathBuf;

use colored::Colorize;

use crate::db::get_connection;
use crate::error::Result;
use crate::importer::import_file;
use crate::settings::{get_data_dir, load_settings};

pub fn run(file: &str, account: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    let settings = load_settings();
    let conn = get_connection(&get_data_dir().join("fatura.db"))?;

    let summary = import_file(&conn, &file_path, account, &settings)?;

    println!(
        "{} imported, {} skipped (already present), {} new mappings",
        summary.imported.to_string().green(),
        summary.skipped,
        summary.new_mappings,
    );
    if !summary.errors.is_empty() {
        println!("{}", format!("{} line(s) failed to parse:", summary.errors.len()).yellow());
        for err in &summary.errors {
            println!("  line {}: {} ({})", err.line_number, err.line, err.message);
        }
    }
    Ok(())
}
