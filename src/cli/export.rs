use std::path::Path;

use serde::Serialize;

use crate::cli::session;
use crate::error::Result;
use crate::journal::{list_journal_entries, EntryFilter};
use crate::ledger::DateRange;
use crate::models::{JournalEntry, Role};
use crate::reports::trial_balance as build_trial_balance;

#[derive(Debug, Serialize)]
struct JournalCsvRow<'a> {
    entry_number: &'a str,
    entry_date: &'a str,
    entry_description: &'a str,
    reference: Option<&'a str>,
    line_number: i64,
    account_code: &'a str,
    account_name: &'a str,
    line_description: Option<&'a str>,
    debit: f64,
    credit: f64,
}

fn journal_rows(entries: &[JournalEntry]) -> Vec<JournalCsvRow<'_>> {
    entries
        .iter()
        .flat_map(|entry| {
            entry.lines.iter().map(move |line| JournalCsvRow {
                entry_number: &entry.entry_number,
                entry_date: &entry.entry_date,
                entry_description: &entry.description,
                reference: entry.reference.as_deref(),
                line_number: line.line_number,
                account_code: &line.account_code,
                account_name: &line.account_name,
                line_description: line.description.as_deref(),
                debit: line.debit_amount,
                credit: line.credit_amount,
            })
        })
        .collect()
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    tracing::info!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

pub fn trial_balance(from_date: Option<&str>, to_date: Option<&str>, output: &str) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let range = DateRange::from_options(from_date, to_date)?;
    let tb = build_trial_balance(&conn, &range)?;
    write_csv(Path::new(output), &tb.rows)?;
    println!("Wrote {} accounts to {output}", tb.rows.len());
    Ok(())
}

pub fn journal(from_date: Option<&str>, to_date: Option<&str>, output: &str) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let range = DateRange::from_options(from_date, to_date)?;
    let mut entries = list_journal_entries(
        &conn,
        &EntryFilter {
            start: range.start,
            end: range.end,
            ..Default::default()
        },
    )?;
    entries.reverse();
    let rows = journal_rows(&entries);
    write_csv(Path::new(output), &rows)?;
    println!("Wrote {} lines from {} entries to {output}", rows.len(), entries.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::add;
    use crate::db::tests::test_db;
    use crate::journal::create_journal_entry;
    use crate::journal::tests::{entry, line};

    #[test]
    fn test_journal_csv_has_one_row_per_line() {
        let (dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        create_journal_entry(&conn, &entry("2025-01-02", "Sale", vec![line(cash.id, 75.0, 0.0), line(sales.id, 0.0, 75.0)]))
            .unwrap();
        let entries = list_journal_entries(&conn, &EntryFilter::default()).unwrap();

        let path = dir.path().join("out").join("journal.csv");
        write_csv(&path, &journal_rows(&entries)).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("entry_number,entry_date,entry_description"));
        assert!(lines[1].starts_with("JE-001,2025-01-02,Sale,,1,"));
    }
}
