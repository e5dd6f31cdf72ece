use base64::{engine::general_purpose::STANDARD, Engine};
use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::accounts::find_account_by_code;
use crate::cli::{currency, print_json, session};
use crate::error::{LedgerError, Result};
use crate::fmt::{money_in, side};
use crate::journal::{
    create_journal_entry, find_journal_entry, list_journal_entries, reverse_journal_entry, update_journal_entry,
    EntryFilter, NewEntry, NewLine,
};
use crate::ledger::DateRange;
use crate::models::{JournalEntry, JournalEntryLine, Role};

/// A `--line` argument before its account code is resolved.
#[derive(Debug, PartialEq)]
pub(crate) struct LineSpec {
    pub code: String,
    pub debit: f64,
    pub credit: f64,
    pub description: Option<String>,
}

fn parse_amount(raw: &str, n: usize) -> Result<f64> {
    let raw = raw.trim().replace(',', "");
    if raw.is_empty() {
        return Ok(0.0);
    }
    raw.parse::<f64>()
        .map_err(|_| LedgerError::Validation(format!("Line {n}: invalid amount '{raw}'")))
}

/// Parse `CODE:DEBIT:CREDIT[:description]`; an empty amount means zero.
pub(crate) fn parse_line(raw: &str, n: usize) -> Result<LineSpec> {
    let mut parts = raw.splitn(4, ':');
    let code = parts.next().unwrap_or("").trim();
    let (Some(debit), Some(credit)) = (parts.next(), parts.next()) else {
        return Err(LedgerError::Validation(format!(
            "Line {n}: expected CODE:DEBIT:CREDIT[:description], got '{raw}'"
        )));
    };
    if code.is_empty() {
        return Err(LedgerError::Validation(format!("Line {n}: account code is required")));
    }
    Ok(LineSpec {
        code: code.to_string(),
        debit: parse_amount(debit, n)?,
        credit: parse_amount(credit, n)?,
        description: parts.next().map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
    })
}

/// Parse `N=PATH` into a 1-based line number and a file path.
pub(crate) fn parse_attachment(raw: &str) -> Result<(usize, String)> {
    let invalid = || LedgerError::Validation(format!("Invalid attachment '{raw}' (expected N=PATH)"));
    let (n, path) = raw.split_once('=').ok_or_else(invalid)?;
    let n: usize = n.trim().parse().map_err(|_| invalid())?;
    if n == 0 || path.trim().is_empty() {
        return Err(invalid());
    }
    Ok((n, path.trim().to_string()))
}

fn build_lines(conn: &Connection, raw_lines: &[String], attachments: &[String]) -> Result<Vec<NewLine>> {
    let mut lines = Vec::with_capacity(raw_lines.len());
    for (i, raw) in raw_lines.iter().enumerate() {
        let spec = parse_line(raw, i + 1)?;
        let account = find_account_by_code(conn, &spec.code)?;
        lines.push(NewLine {
            account_id: account.id,
            description: spec.description,
            debit_amount: spec.debit,
            credit_amount: spec.credit,
            image_data: None,
        });
    }
    for raw in attachments {
        let (n, path) = parse_attachment(raw)?;
        let line = lines.get_mut(n - 1).ok_or_else(|| {
            LedgerError::Validation(format!("Attachment for line {n}, but the entry has {} lines", raw_lines.len()))
        })?;
        let bytes = std::fs::read(&path)?;
        tracing::debug!(line = n, path = %path, bytes = bytes.len(), "attached document");
        line.image_data = Some(STANDARD.encode(bytes));
    }
    Ok(lines)
}

/// Lines without a new attachment keep the document previously on the same line number,
/// unless listed in `detach`.
pub(crate) fn keep_attachments(lines: &mut [NewLine], previous: &[JournalEntryLine], detach: &[usize]) -> Result<()> {
    if let Some(&n) = detach.iter().find(|&&n| n == 0 || n > lines.len()) {
        return Err(LedgerError::Validation(format!(
            "Cannot detach line {n}, the entry has {} lines",
            lines.len()
        )));
    }
    for (i, line) in lines.iter_mut().enumerate() {
        let n = i + 1;
        if detach.contains(&n) {
            line.image_data = None;
        } else if line.image_data.is_none() {
            line.image_data = previous
                .iter()
                .find(|p| p.line_number == n as i64)
                .and_then(|p| p.image_data.clone());
        }
    }
    Ok(())
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

pub fn add(
    date: Option<String>,
    description: String,
    reference: Option<String>,
    raw_lines: &[String],
    attachments: &[String],
) -> Result<()> {
    let (conn, profile) = session(Role::Accountant)?;
    let entry = NewEntry {
        entry_date: date.unwrap_or_else(today),
        description,
        reference,
        lines: build_lines(&conn, raw_lines, attachments)?,
        created_by: Some(profile.email),
    };
    let posted = create_journal_entry(&conn, &entry)?;
    println!(
        "Posted {} on {}: {}",
        posted.entry_number.bold(),
        posted.entry_date,
        money_in(posted.total_debit, &currency())
    );
    Ok(())
}

pub fn edit(
    number: &str,
    date: Option<String>,
    description: Option<String>,
    reference: Option<String>,
    raw_lines: &[String],
    attachments: &[String],
    detach: &[usize],
) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let current = find_journal_entry(&conn, number)?;
    let mut lines = build_lines(&conn, raw_lines, attachments)?;
    keep_attachments(&mut lines, &current.lines, detach)?;
    let entry = NewEntry {
        entry_date: date.unwrap_or(current.entry_date),
        description: description.unwrap_or(current.description),
        reference: reference.or(current.reference),
        lines,
        created_by: current.created_by,
    };
    let updated = update_journal_entry(&conn, current.id, &entry)?;
    println!("Updated {}", updated.entry_number);
    Ok(())
}

fn print_entry(entry: &JournalEntry, symbol: &str) {
    println!("{} {}  {}", entry.entry_number.bold(), entry.entry_date, entry.description);
    if let Some(reference) = &entry.reference {
        println!("Reference: {reference}");
    }
    if let Some(by) = &entry.created_by {
        println!("Posted by: {by}");
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Account", "Description", "Debit", "Credit", "Doc"]);
    for line in &entry.lines {
        table.add_row(vec![
            Cell::new(line.line_number),
            Cell::new(format!("{} {}", line.account_code, line.account_name)),
            Cell::new(line.description.as_deref().unwrap_or("")),
            Cell::new(side(line.debit_amount, symbol)),
            Cell::new(side(line.credit_amount, symbol)),
            Cell::new(if line.image_data.is_some() { "yes" } else { "" }),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("Total".bold()),
        Cell::new(""),
        Cell::new(money_in(entry.total_debit, symbol)),
        Cell::new(money_in(entry.total_credit, symbol)),
        Cell::new(""),
    ]);
    println!("{table}");
}

pub fn show(number: &str, json: bool) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let entry = find_journal_entry(&conn, number)?;
    if json {
        return print_json(&entry);
    }
    print_entry(&entry, &currency());
    if let Some(id) = entry.reversed_by_id {
        let reversal = crate::journal::get_journal_entry(&conn, id)?;
        println!("{}", format!("Reversed by {}", reversal.entry_number).yellow());
    }
    if let Some(id) = entry.reverses_entry_id {
        let original = crate::journal::get_journal_entry(&conn, id)?;
        println!("{}", format!("Reverses {}", original.entry_number).yellow());
    }
    Ok(())
}

pub fn list(
    from_date: Option<String>,
    to_date: Option<String>,
    account_type: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let range = DateRange::from_options(from_date.as_deref(), to_date.as_deref())?;
    let filter = EntryFilter {
        start: range.start,
        end: range.end,
        account_type,
        search,
    };
    let entries = list_journal_entries(&conn, &filter)?;
    if json {
        return print_json(&entries);
    }

    let symbol = currency();
    let mut table = Table::new();
    table.set_header(vec!["Number", "Date", "Description", "Reference", "Amount", "Status"]);
    for entry in &entries {
        let status = if entry.reversed_by_id.is_some() {
            "reversed".yellow().to_string()
        } else if entry.reverses_entry_id.is_some() {
            "reversal".yellow().to_string()
        } else {
            String::new()
        };
        table.add_row(vec![
            Cell::new(&entry.entry_number),
            Cell::new(&entry.entry_date),
            Cell::new(&entry.description),
            Cell::new(entry.reference.as_deref().unwrap_or("")),
            Cell::new(money_in(entry.total_debit, &symbol)),
            Cell::new(status),
        ]);
    }
    println!("Journal Entries ({})\n{table}", entries.len());
    Ok(())
}

pub fn reverse(number: &str, date: Option<&str>) -> Result<()> {
    let (conn, profile) = session(Role::Accountant)?;
    let original = find_journal_entry(&conn, number)?;
    let date = date.map(str::to_string).unwrap_or_else(today);
    let reversal = reverse_journal_entry(&conn, original.id, &date, Some(profile.email.as_str()))?;
    println!("Reversed {} with {}", original.entry_number, reversal.entry_number.bold());
    Ok(())
}
