use std::path::Path;

use rusqlite::{Connection, OptionalExtension};

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS account_types (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    normal_balance TEXT NOT NULL CHECK (normal_balance IN ('debit', 'credit')),
    is_system INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    account_type_id INTEGER NOT NULL,
    parent_account_id INTEGER,
    is_header INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    cash_flow_activity TEXT CHECK (cash_flow_activity IN ('operating', 'investing', 'financing')),
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_type_id) REFERENCES account_types(id),
    FOREIGN KEY (parent_account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id INTEGER PRIMARY KEY,
    entry_number TEXT NOT NULL UNIQUE,
    entry_date TEXT NOT NULL,
    description TEXT NOT NULL,
    reference TEXT,
    total_debit REAL NOT NULL,
    total_credit REAL NOT NULL,
    is_balanced INTEGER NOT NULL DEFAULT 1,
    reverses_entry_id INTEGER,
    reversed_by_id INTEGER,
    created_by TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (reverses_entry_id) REFERENCES journal_entries(id),
    FOREIGN KEY (reversed_by_id) REFERENCES journal_entries(id)
);

CREATE TABLE IF NOT EXISTS journal_entry_lines (
    id INTEGER PRIMARY KEY,
    journal_entry_id INTEGER NOT NULL,
    account_id INTEGER NOT NULL,
    description TEXT,
    debit_amount REAL NOT NULL DEFAULT 0,
    credit_amount REAL NOT NULL DEFAULT 0,
    line_number INTEGER NOT NULL,
    image_data TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (journal_entry_id) REFERENCES journal_entries(id) ON DELETE CASCADE,
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE INDEX IF NOT EXISTS idx_lines_account ON journal_entry_lines(account_id);
CREATE INDEX IF NOT EXISTS idx_lines_entry ON journal_entry_lines(journal_entry_id);
CREATE INDEX IF NOT EXISTS idx_entries_date ON journal_entries(entry_date);

CREATE TABLE IF NOT EXISTS opening_balances (
    id INTEGER PRIMARY KEY,
    account_id INTEGER NOT NULL UNIQUE,
    balance REAL NOT NULL,
    as_of_date TEXT,
    updated_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (account_id) REFERENCES accounts(id)
);

CREATE TABLE IF NOT EXISTS user_profiles (
    id INTEGER PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('admin', 'accountant', 'user')),
    avatar_url TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

// (name, normal_balance, description)
const SYSTEM_ACCOUNT_TYPES: &[(&str, &str, &str)] = &[
    ("Asset", "debit", "Resources owned by the company"),
    ("Liability", "credit", "Debts and obligations owed by the company"),
    ("Equity", "credit", "Owner's interest in the company"),
    ("Revenue", "credit", "Income earned from business operations"),
    ("Expense", "debit", "Costs incurred in business operations"),
];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM account_types", [], |row| row.get(0))?;
    if count == 0 {
        for (name, normal_balance, description) in SYSTEM_ACCOUNT_TYPES {
            conn.execute(
                "INSERT INTO account_types (name, normal_balance, description, is_system) VALUES (?1, ?2, ?3, 1)",
                rusqlite::params![name, normal_balance, description],
            )?;
        }
    }
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let value = conn
        .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| row.get(0))
        .optional()?;
    Ok(value)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        [key, value],
    )?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "account_types",
            "accounts",
            "journal_entries",
            "journal_entry_lines",
            "opening_balances",
            "user_profiles",
            "metadata",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM account_types", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_system_types_seeded_with_normal_balance() {
        let (_dir, conn) = test_db();
        let side: String = conn
            .query_row(
                "SELECT normal_balance FROM account_types WHERE name = 'Liability' AND is_system = 1",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(side, "credit");
    }

    #[test]
    fn test_metadata_upsert() {
        let (_dir, conn) = test_db();
        assert_eq!(get_metadata(&conn, "company_name").unwrap(), None);
        set_metadata(&conn, "company_name", "Acme").unwrap();
        set_metadata(&conn, "company_name", "Acme Ltd").unwrap();
        assert_eq!(get_metadata(&conn, "company_name").unwrap().as_deref(), Some("Acme Ltd"));
    }
}
