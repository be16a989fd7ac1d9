use std::path::PathBuf;

use colored::Colorize;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = dir;
    }
    let dir = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&dir)?;

    let conn = get_connection(&dir.join("fatura.db"))?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("{} {}", "Initialized".green(), dir.join("fatura.db").display());
    Ok(())
}
