use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, TransactionBehavior};

use crate::accounts::get_account;
use crate::error::{LedgerError, Result};
use crate::models::{parse_date, JournalEntry, JournalEntryLine, BALANCE_TOLERANCE};

const ENTRY_COLUMNS: &str = "id, entry_number, entry_date, description, reference, total_debit, \
     total_credit, is_balanced, reverses_entry_id, reversed_by_id, created_by";

#[derive(Debug, Clone, Default)]
pub struct NewLine {
    pub account_id: i64,
    pub description: Option<String>,
    pub debit_amount: f64,
    pub credit_amount: f64,
    /// Base64 payload of a supporting document (receipt scan, invoice image).
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewEntry {
    pub entry_date: String,
    pub description: String,
    pub reference: Option<String>,
    pub lines: Vec<NewLine>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub start: Option<String>,
    pub end: Option<String>,
    pub account_type: Option<String>,
    pub search: Option<String>,
}

fn entry_from_row(row: &Row) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: row.get(0)?,
        entry_number: row.get(1)?,
        entry_date: row.get(2)?,
        description: row.get(3)?,
        reference: row.get(4)?,
        total_debit: row.get(5)?,
        total_credit: row.get(6)?,
        is_balanced: row.get(7)?,
        reverses_entry_id: row.get(8)?,
        reversed_by_id: row.get(9)?,
        created_by: row.get(10)?,
        lines: Vec::new(),
    })
}

fn load_lines(conn: &Connection, entry_id: i64) -> Result<Vec<JournalEntryLine>> {
    let mut stmt = conn.prepare(
        "SELECT l.id, l.journal_entry_id, l.account_id, a.code, a.name, t.name, l.description, \
         l.debit_amount, l.credit_amount, l.line_number, l.image_data \
         FROM journal_entry_lines l \
         JOIN accounts a ON l.account_id = a.id \
         JOIN account_types t ON a.account_type_id = t.id \
         WHERE l.journal_entry_id = ?1 ORDER BY l.line_number",
    )?;
    let lines = stmt
        .query_map([entry_id], |row| {
            Ok(JournalEntryLine {
                id: row.get(0)?,
                journal_entry_id: row.get(1)?,
                account_id: row.get(2)?,
                account_code: row.get(3)?,
                account_name: row.get(4)?,
                account_type: row.get(5)?,
                description: row.get(6)?,
                debit_amount: row.get(7)?,
                credit_amount: row.get(8)?,
                line_number: row.get(9)?,
                image_data: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(lines)
}

pub fn get_journal_entry(conn: &Connection, id: i64) -> Result<JournalEntry> {
    let mut entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = ?1"),
            [id],
            entry_from_row,
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("journal entry id {id}")))?;
    entry.lines = load_lines(conn, id)?;
    Ok(entry)
}

pub fn find_journal_entry(conn: &Connection, entry_number: &str) -> Result<JournalEntry> {
    let id: i64 = conn
        .query_row(
            "SELECT id FROM journal_entries WHERE entry_number = ?1",
            [entry_number.trim()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("journal entry {}", entry_number.trim())))?;
    get_journal_entry(conn, id)
}

pub fn has_journal_entries(conn: &Connection) -> Result<bool> {
    let exists = conn.query_row("SELECT EXISTS(SELECT 1 FROM journal_entries)", [], |row| row.get(0))?;
    Ok(exists)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

struct Validated {
    entry_date: String,
    total_debit: f64,
    total_credit: f64,
}

/// Every rule an entry must satisfy, checked before anything is written.
fn validate(conn: &Connection, entry: &NewEntry) -> Result<Validated> {
    if entry.description.trim().is_empty() {
        return Err(LedgerError::Validation("Description is required".into()));
    }
    let entry_date = parse_date(&entry.entry_date)?;
    if entry.lines.len() < 2 {
        return Err(LedgerError::Validation(
            "A journal entry needs at least two lines".into(),
        ));
    }

    for (i, line) in entry.lines.iter().enumerate() {
        let n = i + 1;
        if !line.debit_amount.is_finite() || !line.credit_amount.is_finite() {
            return Err(LedgerError::Validation(format!("Line {n}: amounts must be numbers")));
        }
        if line.debit_amount < 0.0 || line.credit_amount < 0.0 {
            return Err(LedgerError::Validation(format!("Line {n}: amounts cannot be negative")));
        }
        let has_debit = line.debit_amount > 0.0;
        let has_credit = line.credit_amount > 0.0;
        if has_debit == has_credit {
            return Err(LedgerError::Validation(format!(
                "Line {n}: enter either a debit or a credit amount, not both or neither"
            )));
        }
        let account = get_account(conn, line.account_id)?;
        if !account.is_active {
            return Err(LedgerError::Validation(format!(
                "Line {n}: account {} is inactive",
                account.code
            )));
        }
        if account.is_header {
            return Err(LedgerError::Validation(format!(
                "Line {n}: {} is a header account and cannot carry transactions",
                account.code
            )));
        }
    }

    let total_debit: f64 = entry.lines.iter().map(|l| l.debit_amount).sum();
    let total_credit: f64 = entry.lines.iter().map(|l| l.credit_amount).sum();
    if (total_debit - total_credit).abs() > BALANCE_TOLERANCE {
        return Err(LedgerError::Unbalanced {
            debits: total_debit,
            credits: total_credit,
        });
    }

    Ok(Validated {
        entry_date,
        total_debit,
        total_credit,
    })
}

// ---------------------------------------------------------------------------
// Entry numbers
// ---------------------------------------------------------------------------

fn format_entry_number(n: u64) -> String {
    format!("JE-{n:03}")
}

/// `JE-NNN` following the most recently created entry, skipping any number already taken.
pub fn next_entry_number(conn: &Connection) -> Result<String> {
    let pattern = Regex::new(r"^JE-(\d+)$")?;
    let last: Option<String> = conn
        .query_row(
            "SELECT entry_number FROM journal_entries ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;

    let mut next = match last.as_deref() {
        None => 1,
        Some(number) => match pattern
            .captures(number)
            .and_then(|c| c[1].parse::<u64>().ok())
        {
            Some(n) => n + 1,
            None => {
                tracing::warn!(entry_number = number, "last entry number does not parse, restarting at JE-001");
                1
            }
        },
    };

    loop {
        let candidate = format_entry_number(next);
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM journal_entries WHERE entry_number = ?1)",
            [&candidate],
            |row| row.get(0),
        )?;
        if !taken {
            return Ok(candidate);
        }
        next += 1;
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

fn insert_lines(conn: &Connection, entry_id: i64, entry: &NewEntry) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO journal_entry_lines \
         (journal_entry_id, account_id, description, debit_amount, credit_amount, line_number, image_data) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for (i, line) in entry.lines.iter().enumerate() {
        let description = line
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| entry.description.trim());
        stmt.execute(rusqlite::params![
            entry_id,
            line.account_id,
            description,
            line.debit_amount,
            line.credit_amount,
            i as i64 + 1,
            line.image_data,
        ])?;
    }
    Ok(())
}

fn insert_entry(
    conn: &Connection,
    entry: &NewEntry,
    checked: &Validated,
    reverses: Option<i64>,
) -> Result<i64> {
    let entry_number = next_entry_number(conn)?;
    conn.execute(
        "INSERT INTO journal_entries \
         (entry_number, entry_date, description, reference, total_debit, total_credit, is_balanced, \
          reverses_entry_id, created_by) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
        rusqlite::params![
            entry_number,
            checked.entry_date,
            entry.description.trim(),
            entry.reference.as_deref().map(str::trim).filter(|r| !r.is_empty()),
            checked.total_debit,
            checked.total_credit,
            reverses,
            entry.created_by,
        ],
    )?;
    let id = conn.last_insert_rowid();
    insert_lines(conn, id, entry)?;
    tracing::info!(id, entry_number = %entry_number, lines = entry.lines.len(), "posted journal entry");
    Ok(id)
}

/// Validate and post an entry; the header and its lines commit together or not at all.
pub fn create_journal_entry(conn: &Connection, entry: &NewEntry) -> Result<JournalEntry> {
    let checked = validate(conn, entry)?;
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let id = insert_entry(&tx, entry, &checked, None)?;
    tx.commit()?;
    get_journal_entry(conn, id)
}

/// Replace an entry's header fields and lines, keeping its number.
pub fn update_journal_entry(conn: &Connection, id: i64, entry: &NewEntry) -> Result<JournalEntry> {
    let existing = get_journal_entry(conn, id)?;
    if existing.reversed_by_id.is_some() || existing.reverses_entry_id.is_some() {
        return Err(LedgerError::Validation(format!(
            "{} is part of a reversal pair and can no longer be edited",
            existing.entry_number
        )));
    }
    let checked = validate(conn, entry)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    tx.execute(
        "UPDATE journal_entries SET entry_date = ?1, description = ?2, reference = ?3, \
         total_debit = ?4, total_credit = ?5, is_balanced = 1, updated_at = datetime('now') WHERE id = ?6",
        rusqlite::params![
            checked.entry_date,
            entry.description.trim(),
            entry.reference.as_deref().map(str::trim).filter(|r| !r.is_empty()),
            checked.total_debit,
            checked.total_credit,
            id,
        ],
    )?;
    tx.execute("DELETE FROM journal_entry_lines WHERE journal_entry_id = ?1", [id])?;
    insert_lines(&tx, id, entry)?;
    tx.commit()?;

    tracing::info!(id, entry_number = %existing.entry_number, "updated journal entry");
    get_journal_entry(conn, id)
}

/// Post an offsetting entry that swaps every debit and credit of the original.
///
/// The original stays as it was apart from a pointer to its reversal, so the audit trail shows
/// both postings.
pub fn reverse_journal_entry(
    conn: &Connection,
    id: i64,
    entry_date: &str,
    created_by: Option<&str>,
) -> Result<JournalEntry> {
    let original = get_journal_entry(conn, id)?;
    if original.reversed_by_id.is_some() {
        return Err(LedgerError::Validation(format!(
            "{} has already been reversed",
            original.entry_number
        )));
    }
    if original.reverses_entry_id.is_some() {
        return Err(LedgerError::Validation(format!(
            "{} is itself a reversal and cannot be reversed",
            original.entry_number
        )));
    }
    if original.lines.is_empty() {
        return Err(LedgerError::Validation(format!(
            "{} has no lines to reverse",
            original.entry_number
        )));
    }

    let reversal = NewEntry {
        entry_date: entry_date.to_string(),
        description: format!("Reversal of {}: {}", original.entry_number, original.description),
        reference: Some(original.entry_number.clone()),
        lines: original
            .lines
            .iter()
            .map(|line| NewLine {
                account_id: line.account_id,
                description: line.description.clone(),
                debit_amount: line.credit_amount,
                credit_amount: line.debit_amount,
                image_data: None,
            })
            .collect(),
        created_by: created_by.map(str::to_string),
    };
    let checked = validate(conn, &reversal)?;

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let reversal_id = insert_entry(&tx, &reversal, &checked, Some(id))?;
    tx.execute(
        "UPDATE journal_entries SET reversed_by_id = ?1, updated_at = datetime('now') WHERE id = ?2",
        [reversal_id, id],
    )?;
    tx.commit()?;

    tracing::info!(original = id, reversal = reversal_id, "reversed journal entry");
    get_journal_entry(conn, reversal_id)
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

fn matches_search(entry: &JournalEntry, needle: &str) -> bool {
    let contains = |s: &str| s.to_lowercase().contains(needle);
    contains(&entry.description)
        || contains(&entry.entry_number)
        || entry.reference.as_deref().is_some_and(contains)
        || entry
            .lines
            .iter()
            .any(|l| contains(&l.account_name) || contains(&l.account_code))
}

/// Entries newest first, narrowed by date range, account type and a free-text search.
pub fn list_journal_entries(conn: &Connection, filter: &EntryFilter) -> Result<Vec<JournalEntry>> {
    let start = filter.start.as_deref().map(parse_date).transpose()?;
    let end = filter.end.as_deref().map(parse_date).transpose()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries \
         WHERE (?1 IS NULL OR entry_date >= ?1) AND (?2 IS NULL OR entry_date <= ?2) \
         ORDER BY entry_date DESC, id DESC"
    ))?;
    let mut entries = stmt
        .query_map(rusqlite::params![start, end], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    for entry in &mut entries {
        entry.lines = load_lines(conn, entry.id)?;
    }

    if let Some(kind) = filter
        .account_type
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty() && !k.eq_ignore_ascii_case("all types"))
    {
        entries.retain(|e| e.lines.iter().any(|l| l.account_type.eq_ignore_ascii_case(kind)));
    }
    if let Some(needle) = filter
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
    {
        entries.retain(|e| matches_search(e, &needle));
    }
    Ok(entries)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::accounts::tests::add;
    use crate::accounts::{create_account, NewAccount};
    use crate::account_types::find_account_type;
    use crate::db::tests::test_db;

    pub(crate) fn line(account_id: i64, debit: f64, credit: f64) -> NewLine {
        NewLine {
            account_id,
            debit_amount: debit,
            credit_amount: credit,
            ..Default::default()
        }
    }

    pub(crate) fn entry(date: &str, description: &str, lines: Vec<NewLine>) -> NewEntry {
        NewEntry {
            entry_date: date.to_string(),
            description: description.to_string(),
            lines,
            ..Default::default()
        }
    }

    #[test]
    fn test_create_balanced_entry() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let posted = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Cash sale", vec![line(cash.id, 100.0, 0.0), line(sales.id, 0.0, 100.0)]),
        )
        .unwrap();
        assert_eq!(posted.entry_number, "JE-001");
        assert_eq!(posted.total_debit, 100.0);
        assert_eq!(posted.total_credit, 100.0);
        assert!(posted.is_balanced);
        assert_eq!(posted.lines.len(), 2);
        assert_eq!(posted.lines[0].line_number, 1);
        assert_eq!(posted.lines[1].description.as_deref(), Some("Cash sale"));
    }

    #[test]
    fn test_unbalanced_entry_rejected_before_write() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let err = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Typo", vec![line(cash.id, 100.0, 0.0), line(sales.id, 0.0, 99.0)]),
        )
        .unwrap_err();
        assert!(matches!(err, LedgerError::Unbalanced { .. }));
        assert!(!has_journal_entries(&conn).unwrap());
    }

    #[test]
    fn test_rounding_within_tolerance_accepted() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let tax = add(&conn, "Liability", "Sales Tax", None);
        let posted = create_journal_entry(
            &conn,
            &entry(
                "2025-01-15",
                "Sale with tax",
                vec![line(cash.id, 10.0, 0.0), line(sales.id, 0.0, 9.09), line(tax.id, 0.0, 0.90)],
            ),
        );
        assert!(posted.is_ok());
    }

    #[test]
    fn test_line_with_both_sides_rejected() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let err = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Odd", vec![line(cash.id, 5.0, 5.0), line(sales.id, 0.0, 0.0)]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Line 1"));
    }

    #[test]
    fn test_header_account_cannot_carry_transactions() {
        let (_dir, conn) = test_db();
        let asset = find_account_type(&conn, "Asset").unwrap();
        let header = create_account(
            &conn,
            &NewAccount { name: "Assets".into(), account_type_id: asset.id, is_header: true, ..Default::default() },
        )
        .unwrap();
        let sales = add(&conn, "Revenue", "Sales", None);
        let err = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Bad", vec![line(header.id, 5.0, 0.0), line(sales.id, 0.0, 5.0)]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("header account"));
    }

    #[test]
    fn test_missing_description_and_single_line_rejected() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let err = create_journal_entry(&conn, &entry("2025-01-15", " ", vec![])).unwrap_err();
        assert!(err.to_string().contains("Description is required"));
        let err = create_journal_entry(&conn, &entry("2025-01-15", "One", vec![line(cash.id, 1.0, 0.0)]))
            .unwrap_err();
        assert!(err.to_string().contains("at least two lines"));
    }

    #[test]
    fn test_entry_numbers_increment_and_skip_taken() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let make = || entry("2025-01-15", "Sale", vec![line(cash.id, 1.0, 0.0), line(sales.id, 0.0, 1.0)]);
        create_journal_entry(&conn, &make()).unwrap();
        let second = create_journal_entry(&conn, &make()).unwrap();
        assert_eq!(second.entry_number, "JE-002");

        conn.execute(
            "INSERT INTO journal_entries (entry_number, entry_date, description, total_debit, total_credit) \
             VALUES ('JE-004', '2025-01-01', 'imported', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO journal_entries (entry_number, entry_date, description, total_debit, total_credit) \
             VALUES ('JE-003', '2025-01-01', 'imported', 0, 0)",
            [],
        )
        .unwrap();
        assert_eq!(next_entry_number(&conn).unwrap(), "JE-005");
    }

    #[test]
    fn test_unparsable_last_number_restarts_at_first_free() {
        let (_dir, conn) = test_db();
        conn.execute(
            "INSERT INTO journal_entries (entry_number, entry_date, description, total_debit, total_credit) \
             VALUES ('JE-001', '2025-01-01', 'a', 0, 0)",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO journal_entries (entry_number, entry_date, description, total_debit, total_credit) \
             VALUES ('OPENING', '2025-01-01', 'b', 0, 0)",
            [],
        )
        .unwrap();
        assert_eq!(next_entry_number(&conn).unwrap(), "JE-002");
    }

    #[test]
    fn test_failed_line_insert_rolls_back_header() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let checked = Validated { entry_date: "2025-01-15".into(), total_debit: 1.0, total_credit: 1.0 };
        let broken = entry("2025-01-15", "Broken", vec![line(cash.id, 1.0, 0.0), line(sales.id + 999, 0.0, 1.0)]);

        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate).unwrap();
        assert!(insert_entry(&tx, &broken, &checked, None).is_err());
        drop(tx);
        assert!(!has_journal_entries(&conn).unwrap());
    }

    #[test]
    fn test_reversal_posts_offsetting_entry() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let original = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Sale", vec![line(cash.id, 80.0, 0.0), line(sales.id, 0.0, 80.0)]),
        )
        .unwrap();

        let reversal = reverse_journal_entry(&conn, original.id, "2025-01-20", None).unwrap();
        assert_eq!(reversal.entry_number, "JE-002");
        assert_eq!(reversal.reverses_entry_id, Some(original.id));
        assert_eq!(reversal.reference.as_deref(), Some("JE-001"));
        assert_eq!(reversal.lines[0].credit_amount, 80.0);
        assert_eq!(reversal.lines[1].debit_amount, 80.0);

        let original = get_journal_entry(&conn, original.id).unwrap();
        assert_eq!(original.reversed_by_id, Some(reversal.id));
        assert_eq!(original.lines[0].debit_amount, 80.0, "original lines are untouched");

        let cash_net = crate::ledger::activity(&conn, cash.id, &crate::ledger::DateRange::all()).unwrap();
        assert_eq!(cash_net.debits - cash_net.credits, 0.0);
    }

    #[test]
    fn test_reversal_cannot_repeat() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let original = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Sale", vec![line(cash.id, 1.0, 0.0), line(sales.id, 0.0, 1.0)]),
        )
        .unwrap();
        let reversal = reverse_journal_entry(&conn, original.id, "2025-01-16", None).unwrap();
        assert!(reverse_journal_entry(&conn, original.id, "2025-01-17", None).is_err());
        assert!(reverse_journal_entry(&conn, reversal.id, "2025-01-17", None).is_err());
        assert!(update_journal_entry(&conn, original.id, &entry(
            "2025-01-15",
            "Edited",
            vec![line(cash.id, 2.0, 0.0), line(sales.id, 0.0, 2.0)],
        ))
        .is_err());
    }

    #[test]
    fn test_update_replaces_lines_and_keeps_number() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        let bank = add(&conn, "Asset", "Bank", None);
        let original = create_journal_entry(
            &conn,
            &entry("2025-01-15", "Sale", vec![line(cash.id, 1.0, 0.0), line(sales.id, 0.0, 1.0)]),
        )
        .unwrap();
        let updated = update_journal_entry(
            &conn,
            original.id,
            &entry("2025-01-16", "Sale to bank", vec![line(bank.id, 3.0, 0.0), line(sales.id, 0.0, 3.0)]),
        )
        .unwrap();
        assert_eq!(updated.entry_number, "JE-001");
        assert_eq!(updated.entry_date, "2025-01-16");
        assert_eq!(updated.total_debit, 3.0);
        assert_eq!(updated.lines[0].account_code, bank.code);
        let cash_lines: i64 = conn
            .query_row("SELECT COUNT(*) FROM journal_entry_lines WHERE account_id = ?1", [cash.id], |r| r.get(0))
            .unwrap();
        assert_eq!(cash_lines, 0);
    }

    #[test]
    fn test_list_filters() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Consulting Revenue", None);
        let loan = add(&conn, "Liability", "Bank Loan", None);
        create_journal_entry(
            &conn,
            &entry("2025-01-10", "Invoice 7", vec![line(cash.id, 5.0, 0.0), line(sales.id, 0.0, 5.0)]),
        )
        .unwrap();
        let mut borrowed = entry("2025-02-10", "Drawdown", vec![line(cash.id, 50.0, 0.0), line(loan.id, 0.0, 50.0)]);
        borrowed.reference = Some("LOAN-42".into());
        create_journal_entry(&conn, &borrowed).unwrap();

        let all = list_journal_entries(&conn, &EntryFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].entry_date, "2025-02-10", "newest first");

        let jan = list_journal_entries(
            &conn,
            &EntryFilter { start: Some("2025-01-01".into()), end: Some("2025-01-31".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(jan.len(), 1);

        let liabilities = list_journal_entries(
            &conn,
            &EntryFilter { account_type: Some("liability".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(liabilities.len(), 1);
        assert_eq!(liabilities[0].description, "Drawdown");

        let by_ref = list_journal_entries(&conn, &EntryFilter { search: Some("loan-4".into()), ..Default::default() }).unwrap();
        assert_eq!(by_ref.len(), 1);
        let by_account =
            list_journal_entries(&conn, &EntryFilter { search: Some("consulting".into()), ..Default::default() }).unwrap();
        assert_eq!(by_account.len(), 1);
        let by_code = list_journal_entries(
            &conn,
            &EntryFilter { search: Some(cash.code.clone()), account_type: Some("All Types".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(by_code.len(), 2);
    }

    #[test]
    fn test_image_data_stored_on_line() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let rent = add(&conn, "Expense", "Rent", None);
        let mut receipt = line(rent.id, 900.0, 0.0);
        receipt.image_data = Some("aGVsbG8=".into());
        let posted = create_journal_entry(&conn, &entry("2025-03-01", "Rent", vec![receipt, line(cash.id, 0.0, 900.0)]))
            .unwrap();
        assert_eq!(posted.lines[0].image_data.as_deref(), Some("aGVsbG8="));
        assert!(posted.lines[1].image_data.is_none());
    }
}
