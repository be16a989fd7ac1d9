use std::path::Path;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    is_active INTEGER DEFAULT 1
);

CREATE TABLE IF NOT EXISTS credit_cards (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    nickname TEXT NOT NULL,
    last_four TEXT NOT NULL,
    holder_name TEXT NOT NULL,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS description_mappings (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    normalized_description TEXT NOT NULL,
    simplified_description TEXT NOT NULL,
    category_id INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (account_id, normalized_description),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id)
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL,
    date TEXT NOT NULL,
    description TEXT NOT NULL,
    normalized_description TEXT NOT NULL,
    simplified_description TEXT,
    value TEXT NOT NULL,
    category_id INTEGER,
    credit_card_id INTEGER,
    responsible_users TEXT NOT NULL DEFAULT '[]',
    source TEXT NOT NULL,
    was_edited_after_import INTEGER DEFAULT 0,
    is_reversal INTEGER DEFAULT 0,
    related_transaction_id INTEGER,
    checksum TEXT,
    installment_group_id TEXT,
    current_installment INTEGER,
    total_installments INTEGER,
    created_at TEXT DEFAULT (datetime('now')),
    UNIQUE (account_id, checksum),
    FOREIGN KEY (account_id) REFERENCES accounts(id),
    FOREIGN KEY (category_id) REFERENCES categories(id),
    FOREIGN KEY (credit_card_id) REFERENCES credit_cards(id),
    FOREIGN KEY (related_transaction_id) REFERENCES transactions(id)
);

CREATE INDEX IF NOT EXISTS idx_transactions_account_date
    ON transactions(account_id, date);
CREATE INDEX IF NOT EXISTS idx_transactions_account_value
    ON transactions(account_id, value);
CREATE INDEX IF NOT EXISTS idx_transactions_account_normdesc
    ON transactions(account_id, normalized_description);

CREATE TABLE IF NOT EXISTS imports (
    id INTEGER PRIMARY KEY,
    filename TEXT NOT NULL,
    account_id INTEGER NOT NULL,
    import_date TEXT DEFAULT (datetime('now')),
    imported_count INTEGER,
    skipped_count INTEGER,
    error_count INTEGER,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);
";

const DEFAULT_CATEGORIES: &[&str] = &[
    "Groceries",
    "Restaurants",
    "Transport",
    "Travel",
    "Health",
    "Shopping",
    "Services",
    "Subscriptions",
    "Education",
    "Home",
    "Fees & Interest",
    "Uncategorized",
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for name in DEFAULT_CATEGORIES {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
        }
    }
    Ok(())
}
