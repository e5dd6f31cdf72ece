use rusqlite::{Connection, OptionalExtension, Row};

use crate::account_types::get_account_type;
use crate::error::{map_code_conflict, LedgerError, Result};
use crate::models::{parse_date, Account, CashFlowActivity, NormalBalance, OpeningBalance, ReportClass};

pub(crate) const ACCOUNT_SELECT: &str = "SELECT a.id, a.code, a.name, a.description, a.account_type_id, \
     t.name, t.normal_balance, a.parent_account_id, a.is_header, a.is_active, a.cash_flow_activity \
     FROM accounts a JOIN account_types t ON a.account_type_id = t.id";

pub(crate) fn account_from_row(row: &Row) -> rusqlite::Result<Account> {
    let side: String = row.get(6)?;
    let activity: Option<String> = row.get(10)?;
    Ok(Account {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        account_type_id: row.get(4)?,
        account_type: row.get(5)?,
        normal_balance: if side == "credit" { NormalBalance::Credit } else { NormalBalance::Debit },
        parent_account_id: row.get(7)?,
        is_header: row.get(8)?,
        is_active: row.get(9)?,
        cash_flow_activity: activity.and_then(|a| a.parse().ok()),
    })
}

#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    /// Left empty to have a code generated from the type and parent.
    pub code: Option<String>,
    pub name: String,
    pub account_type_id: i64,
    pub parent_account_id: Option<i64>,
    pub description: Option<String>,
    pub is_header: bool,
    pub cash_flow_activity: Option<CashFlowActivity>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_account_id: Option<Option<i64>>,
    pub is_header: Option<bool>,
    pub cash_flow_activity: Option<Option<CashFlowActivity>>,
}

/// Active accounts ordered by code, each joined with its type.
pub fn list_chart(conn: &Connection) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("{ACCOUNT_SELECT} WHERE a.is_active = 1 ORDER BY a.code"))?;
    let accounts = stmt
        .query_map([], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub fn get_account(conn: &Connection, id: i64) -> Result<Account> {
    conn.query_row(&format!("{ACCOUNT_SELECT} WHERE a.id = ?1"), [id], account_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("account id {id}")))
}

pub fn find_account_by_code(conn: &Connection, code: &str) -> Result<Account> {
    conn.query_row(
        &format!("{ACCOUNT_SELECT} WHERE a.code = ?1 AND a.is_active = 1"),
        [code.trim()],
        account_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("account code {}", code.trim())))
}

pub fn child_accounts(conn: &Connection, parent_id: i64) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "{ACCOUNT_SELECT} WHERE a.parent_account_id = ?1 AND a.is_active = 1 ORDER BY a.code"
    ))?;
    let accounts = stmt
        .query_map([parent_id], account_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(accounts)
}

fn active_parent(conn: &Connection, parent_id: i64) -> Result<Account> {
    let parent = get_account(conn, parent_id)?;
    if !parent.is_active {
        return Err(LedgerError::Validation(format!(
            "Parent account {} is inactive",
            parent.code
        )));
    }
    Ok(parent)
}

pub fn create_account(conn: &Connection, new: &NewAccount) -> Result<Account> {
    if new.name.trim().is_empty() {
        return Err(LedgerError::Validation("Name is required".into()));
    }
    get_account_type(conn, new.account_type_id)?;
    if let Some(parent_id) = new.parent_account_id {
        active_parent(conn, parent_id)?;
    }

    let code = match new.code.as_deref().map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => generate_account_code(conn, new.account_type_id, new.parent_account_id)?,
    };

    conn.execute(
        "INSERT INTO accounts (code, name, description, account_type_id, parent_account_id, is_header, cash_flow_activity) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            code,
            new.name.trim(),
            new.description,
            new.account_type_id,
            new.parent_account_id,
            new.is_header,
            new.cash_flow_activity.map(CashFlowActivity::as_str),
        ],
    )
    .map_err(|e| map_code_conflict(e, &code))?;

    let id = conn.last_insert_rowid();
    tracing::info!(id, code = %code, name = new.name.trim(), "created account");
    get_account(conn, id)
}

pub fn update_account(conn: &Connection, id: i64, changes: &AccountUpdate) -> Result<Account> {
    let current = get_account(conn, id)?;
    if !current.is_active {
        return Err(LedgerError::Validation(format!("Account {} is inactive", current.code)));
    }

    let name = changes.name.clone().unwrap_or_else(|| current.name.clone());
    if name.trim().is_empty() {
        return Err(LedgerError::Validation("Name is required".into()));
    }
    let description = changes.description.clone().unwrap_or(current.description.clone());
    let parent = changes.parent_account_id.unwrap_or(current.parent_account_id);
    let is_header = changes.is_header.unwrap_or(current.is_header);
    let activity = changes.cash_flow_activity.unwrap_or(current.cash_flow_activity);

    if let Some(parent_id) = parent {
        active_parent(conn, parent_id)?;
        if creates_cycle(conn, id, parent_id)? {
            return Err(LedgerError::Validation(format!(
                "Account {} cannot be placed under its own sub-account",
                current.code
            )));
        }
    }
    if is_header && !current.is_header && posting_count(conn, id)? > 0 {
        return Err(LedgerError::Validation(format!(
            "Account {} has postings and cannot become a header account",
            current.code
        )));
    }

    conn.execute(
        "UPDATE accounts SET name = ?1, description = ?2, parent_account_id = ?3, is_header = ?4, \
         cash_flow_activity = ?5, updated_at = datetime('now') WHERE id = ?6",
        rusqlite::params![
            name.trim(),
            description,
            parent,
            is_header,
            activity.map(CashFlowActivity::as_str),
            id
        ],
    )?;
    tracing::info!(id, code = %current.code, "updated account");
    get_account(conn, id)
}

fn creates_cycle(conn: &Connection, id: i64, new_parent: i64) -> Result<bool> {
    let mut cursor = Some(new_parent);
    let mut hops = 0;
    while let Some(current) = cursor {
        if current == id {
            return Ok(true);
        }
        hops += 1;
        if hops > 1000 {
            return Ok(true);
        }
        cursor = conn
            .query_row("SELECT parent_account_id FROM accounts WHERE id = ?1", [current], |row| row.get::<_, Option<i64>>(0))
            .optional()?
            .flatten();
    }
    Ok(false)
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

fn type_prefix(type_name: &str) -> &'static str {
    match ReportClass::from_type_name(type_name) {
        Some(ReportClass::Asset) => "1",
        Some(ReportClass::Liability) => "2",
        Some(ReportClass::Equity) => "3",
        Some(ReportClass::Revenue) => "4",
        Some(ReportClass::Expense) => "5",
        None => "9",
    }
}

/// Next free `prefix + NN` code, where the prefix is the parent's code or the type's digit.
///
/// This only reads; callers that generate twice before inserting get the same code back and
/// the second insert fails on the UNIQUE constraint.
pub fn generate_account_code(
    conn: &Connection,
    account_type_id: i64,
    parent_account_id: Option<i64>,
) -> Result<String> {
    let prefix = match parent_account_id {
        Some(parent_id) => get_account(conn, parent_id)?.code,
        None => type_prefix(&get_account_type(conn, account_type_id)?.name).to_string(),
    };

    let prefix_chars = prefix.chars().count() as i64;
    let mut stmt = conn.prepare(
        "SELECT code FROM accounts WHERE substr(code, 1, ?2) = ?1 AND length(code) = ?2 + 2",
    )?;
    let codes: Vec<String> = stmt
        .query_map(rusqlite::params![prefix, prefix_chars], |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let highest = codes
        .iter()
        .filter_map(|code| code.get(prefix.len()..)?.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    let next = highest + 1;
    if next > 99 {
        return Err(LedgerError::CodeSpaceExhausted(prefix));
    }
    Ok(format!("{prefix}{next:02}"))
}

// ---------------------------------------------------------------------------
// Deletion
// ---------------------------------------------------------------------------

pub fn posting_count(conn: &Connection, id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM journal_entry_lines WHERE account_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Human-readable reason why an account cannot be deleted, or None when deletion is safe.
pub fn deletion_blocker(conn: &Connection, id: i64) -> Result<Option<String>> {
    let account = get_account(conn, id)?;
    if account.is_header {
        return Ok(Some(format!(
            "Cannot delete: {} is a header account",
            account.code
        )));
    }
    let children: i64 = conn.query_row(
        "SELECT COUNT(*) FROM accounts WHERE parent_account_id = ?1 AND is_active = 1",
        [id],
        |row| row.get(0),
    )?;
    if children > 0 {
        let noun = if children == 1 { "sub-account" } else { "sub-accounts" };
        return Ok(Some(format!("Cannot delete: account has {children} active {noun}")));
    }
    let postings = posting_count(conn, id)?;
    if postings > 0 {
        let noun = if postings == 1 { "transaction" } else { "transactions" };
        return Ok(Some(format!("Cannot delete: account has {postings} {noun}")));
    }
    Ok(None)
}

/// Soft delete: the row stays so historical codes remain reserved.
pub fn delete_account(conn: &Connection, id: i64) -> Result<()> {
    if let Some(reason) = deletion_blocker(conn, id)? {
        return Err(LedgerError::DeletionBlocked(reason));
    }
    let updated = conn.execute(
        "UPDATE accounts SET is_active = 0, updated_at = datetime('now') WHERE id = ?1 AND is_active = 1",
        [id],
    )?;
    if updated == 0 {
        return Err(LedgerError::NotFound(format!("active account id {id}")));
    }
    tracing::info!(id, "deactivated account");
    Ok(())
}

// ---------------------------------------------------------------------------
// Opening balances
// ---------------------------------------------------------------------------

/// Record the balance an account carried before its first journal entry, on its normal side.
pub fn set_opening_balance(
    conn: &Connection,
    account_id: i64,
    balance: f64,
    as_of: Option<&str>,
) -> Result<OpeningBalance> {
    if !balance.is_finite() {
        return Err(LedgerError::Validation("Opening balance must be a number".into()));
    }
    let account = get_account(conn, account_id)?;
    if account.is_header {
        return Err(LedgerError::Validation(format!(
            "Header account {} cannot carry a balance",
            account.code
        )));
    }
    let as_of = as_of.map(parse_date).transpose()?;
    conn.execute(
        "INSERT INTO opening_balances (account_id, balance, as_of_date) VALUES (?1, ?2, ?3) \
         ON CONFLICT(account_id) DO UPDATE SET balance = excluded.balance, \
         as_of_date = excluded.as_of_date, updated_at = datetime('now')",
        rusqlite::params![account_id, balance, as_of],
    )?;
    tracing::info!(account_id, balance, "set opening balance");
    Ok(OpeningBalance {
        account_id,
        balance,
        as_of_date: as_of,
    })
}

pub fn clear_opening_balance(conn: &Connection, account_id: i64) -> Result<()> {
    conn.execute("DELETE FROM opening_balances WHERE account_id = ?1", [account_id])?;
    Ok(())
}

pub fn opening_balance(conn: &Connection, account_id: i64) -> Result<Option<OpeningBalance>> {
    let row = conn
        .query_row(
            "SELECT account_id, balance, as_of_date FROM opening_balances WHERE account_id = ?1",
            [account_id],
            |row| {
                Ok(OpeningBalance {
                    account_id: row.get(0)?,
                    balance: row.get(1)?,
                    as_of_date: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}
