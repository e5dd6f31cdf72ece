use rusqlite::Connection;
use serde::Serialize;

use crate::accounts::opening_balance;
use crate::error::{LedgerError, Result};
use crate::models::{parse_date, Account};

/// Inclusive entry-date window; an open bound means "from the beginning" / "to the end".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl DateRange {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn until(end: &str) -> Result<Self> {
        Ok(Self {
            start: None,
            end: Some(parse_date(end)?),
        })
    }

    pub fn between(start: &str, end: &str) -> Result<Self> {
        let range = Self {
            start: Some(parse_date(start)?),
            end: Some(parse_date(end)?),
        };
        if range.start > range.end {
            return Err(LedgerError::Validation(format!(
                "Start date {start} is after end date {end}"
            )));
        }
        Ok(range)
    }

    /// Both bounds or neither.
    pub fn from_options(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        match (start, end) {
            (Some(s), Some(e)) => Self::between(s, e),
            (Some(_), None) => Err(LedgerError::Validation(
                "--from requires --to (both date boundaries must be specified)".into(),
            )),
            (None, Some(_)) => Err(LedgerError::Validation(
                "--to requires --from (both date boundaries must be specified)".into(),
            )),
            (None, None) => Ok(Self::all()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AccountActivity {
    pub debits: f64,
    pub credits: f64,
    pub count: i64,
}

/// Debit/credit totals posted to one account within the range.
pub fn activity(conn: &Connection, account_id: i64, range: &DateRange) -> Result<AccountActivity> {
    let totals = conn.query_row(
        "SELECT COALESCE(SUM(l.debit_amount), 0), COALESCE(SUM(l.credit_amount), 0), COUNT(*) \
         FROM journal_entry_lines l JOIN journal_entries e ON l.journal_entry_id = e.id \
         WHERE l.account_id = ?1 \
         AND (?2 IS NULL OR e.entry_date >= ?2) \
         AND (?3 IS NULL OR e.entry_date <= ?3)",
        rusqlite::params![account_id, range.start, range.end],
        |row| {
            Ok(AccountActivity {
                debits: row.get(0)?,
                credits: row.get(1)?,
                count: row.get(2)?,
            })
        },
    )?;
    tracing::debug!(account_id, debits = totals.debits, credits = totals.credits, "aggregated activity");
    Ok(totals)
}

fn activity_before(conn: &Connection, account_id: i64, date: &str) -> Result<AccountActivity> {
    let totals = conn.query_row(
        "SELECT COALESCE(SUM(l.debit_amount), 0), COALESCE(SUM(l.credit_amount), 0), COUNT(*) \
         FROM journal_entry_lines l JOIN journal_entries e ON l.journal_entry_id = e.id \
         WHERE l.account_id = ?1 AND e.entry_date < ?2",
        rusqlite::params![account_id, date],
        |row| {
            Ok(AccountActivity {
                debits: row.get(0)?,
                credits: row.get(1)?,
                count: row.get(2)?,
            })
        },
    )?;
    Ok(totals)
}

fn stored_opening(conn: &Connection, account_id: i64) -> Result<f64> {
    Ok(opening_balance(conn, account_id)?.map(|ob| ob.balance).unwrap_or(0.0))
}

/// Balance carried into a period: the recorded opening balance plus everything posted before
/// `start`. Zero when nothing is recorded and the period is unbounded.
pub fn opening_balance_for(conn: &Connection, account: &Account, start: Option<&str>) -> Result<f64> {
    let stored = stored_opening(conn, account.id)?;
    match start {
        Some(date) => {
            let prior = activity_before(conn, account.id, date)?;
            Ok(account.normal_balance.apply(stored, prior.debits, prior.credits))
        }
        None => Ok(stored),
    }
}

/// Balance after every posting dated on or before `date`.
pub fn balance_as_of(conn: &Connection, account: &Account, date: &str) -> Result<f64> {
    let stored = stored_opening(conn, account.id)?;
    let totals = activity(conn, account.id, &DateRange::until(date)?)?;
    Ok(account.normal_balance.apply(stored, totals.debits, totals.credits))
}

/// Balance after every posting dated strictly before `date`.
pub fn balance_before(conn: &Connection, account: &Account, date: &str) -> Result<f64> {
    opening_balance_for(conn, account, Some(date))
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerLine {
    pub line_id: i64,
    pub entry_id: i64,
    pub entry_number: String,
    pub entry_date: String,
    pub description: String,
    pub reference: Option<String>,
    pub debit_amount: f64,
    pub credit_amount: f64,
}

/// Postings to one account in journal order.
pub fn general_ledger(conn: &Connection, account_id: i64, range: &DateRange) -> Result<Vec<LedgerLine>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, e.id, e.entry_number, e.entry_date, COALESCE(l.description, e.description), \
         e.reference, l.debit_amount, l.credit_amount \
         FROM journal_entry_lines l JOIN journal_entries e ON l.journal_entry_id = e.id \
         WHERE l.account_id = ?1 \
         AND (?2 IS NULL OR e.entry_date >= ?2) \
         AND (?3 IS NULL OR e.entry_date <= ?3) \
         ORDER BY e.entry_date, length(e.entry_number), e.entry_number, l.line_number",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![account_id, range.start, range.end], |row| {
            Ok(LedgerLine {
                line_id: row.get(0)?,
                entry_id: row.get(1)?,
                entry_number: row.get(2)?,
                entry_date: row.get(3)?,
                description: row.get(4)?,
                reference: row.get(5)?,
                debit_amount: row.get(6)?,
                credit_amount: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
