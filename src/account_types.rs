use rusqlite::{Connection, OptionalExtension, Row};

use crate::error::{LedgerError, Result};
use crate::models::{AccountType, NormalBalance};

const TYPE_COLUMNS: &str = "id, name, description, normal_balance, is_system";

fn type_from_row(row: &Row) -> rusqlite::Result<AccountType> {
    let side: String = row.get(3)?;
    Ok(AccountType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        normal_balance: if side == "credit" { NormalBalance::Credit } else { NormalBalance::Debit },
        is_system: row.get(4)?,
    })
}

pub fn list_account_types(conn: &Connection) -> Result<Vec<AccountType>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {TYPE_COLUMNS} FROM account_types ORDER BY name"
    ))?;
    let types = stmt
        .query_map([], type_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(types)
}

pub fn get_account_type(conn: &Connection, id: i64) -> Result<AccountType> {
    conn.query_row(
        &format!("SELECT {TYPE_COLUMNS} FROM account_types WHERE id = ?1"),
        [id],
        type_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("account type id {id}")))
}

pub fn find_account_type(conn: &Connection, name: &str) -> Result<AccountType> {
    conn.query_row(
        &format!("SELECT {TYPE_COLUMNS} FROM account_types WHERE lower(name) = lower(?1)"),
        [name.trim()],
        type_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("account type '{name}'")))
}

fn ensure_name_free(conn: &Connection, name: &str, except_id: Option<i64>) -> Result<()> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("Name is required".into()));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM account_types WHERE lower(name) = lower(?1) AND id != ?2)",
        rusqlite::params![name.trim(), except_id.unwrap_or(-1)],
        |row| row.get(0),
    )?;
    if exists {
        return Err(LedgerError::Validation(format!(
            "Account type name already exists: {}",
            name.trim()
        )));
    }
    Ok(())
}

pub fn create_account_type(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    normal_balance: NormalBalance,
) -> Result<AccountType> {
    ensure_name_free(conn, name, None)?;
    conn.execute(
        "INSERT INTO account_types (name, description, normal_balance, is_system) \
         VALUES (?1, ?2, ?3, 0)",
        rusqlite::params![name.trim(), description, normal_balance.as_str()],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name = name.trim(), "created account type");
    get_account_type(conn, id)
}

/// System types keep their name; their description and normal balance may change.
pub fn update_account_type(
    conn: &Connection,
    id: i64,
    name: &str,
    description: Option<&str>,
    normal_balance: NormalBalance,
) -> Result<AccountType> {
    let existing = get_account_type(conn, id)?;
    if existing.is_system && !existing.name.eq_ignore_ascii_case(name.trim()) {
        return Err(LedgerError::Validation(format!(
            "Cannot rename system account type: {}",
            existing.name
        )));
    }
    ensure_name_free(conn, name, Some(id))?;
    conn.execute(
        "UPDATE account_types SET name = ?1, description = ?2, normal_balance = ?3, \
         updated_at = datetime('now') WHERE id = ?4",
        rusqlite::params![name.trim(), description, normal_balance.as_str(), id],
    )?;
    tracing::info!(id, "updated account type");
    get_account_type(conn, id)
}

pub fn delete_account_type(conn: &Connection, id: i64) -> Result<()> {
    let account_type = get_account_type(conn, id)?;
    if account_type.is_system {
        return Err(LedgerError::DeletionBlocked(format!(
            "Cannot delete system account type: {}",
            account_type.name
        )));
    }
    let in_use: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE account_type_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    if in_use > 0 {
        return Err(LedgerError::DeletionBlocked(
            "Cannot delete account type that is being used by accounts".into(),
        ));
    }
    conn.execute("DELETE FROM account_types WHERE id = ?1", [id])?;
    tracing::info!(id, name = %account_type.name, "deleted account type");
    Ok(())
}
