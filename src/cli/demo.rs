use std::collections::HashMap;

use chrono::{Datelike, Local, NaiveDate};
use rusqlite::Connection;

use crate::account_types::find_account_type;
use crate::accounts::{create_account, NewAccount};
use crate::cli::session;
use crate::error::{LedgerError, Result};
use crate::journal::{create_journal_entry, NewEntry, NewLine};
use crate::models::{CashFlowActivity, Role};

const MARKER_ACCOUNT: &str = "Current Assets";
const MONTHS: u32 = 6;

struct DemoAccount {
    key: &'static str,
    name: &'static str,
    account_type: &'static str,
    parent: Option<&'static str>,
    header: bool,
    cash_flow: Option<CashFlowActivity>,
}

const ACCOUNTS: &[DemoAccount] = &[
    DemoAccount { key: "current", name: MARKER_ACCOUNT, account_type: "Asset", parent: None, header: true, cash_flow: None },
    DemoAccount { key: "petty", name: "Petty Cash", account_type: "Asset", parent: Some("current"), header: false, cash_flow: None },
    DemoAccount { key: "bank", name: "Operating Bank Account", account_type: "Asset", parent: Some("current"), header: false, cash_flow: None },
    DemoAccount { key: "ar", name: "Accounts Receivable", account_type: "Asset", parent: Some("current"), header: false, cash_flow: None },
    DemoAccount { key: "fixed", name: "Fixed Assets", account_type: "Asset", parent: None, header: true, cash_flow: None },
    DemoAccount { key: "laptops", name: "Computer Equipment", account_type: "Asset", parent: Some("fixed"), header: false, cash_flow: None },
    DemoAccount { key: "ap", name: "Accounts Payable", account_type: "Liability", parent: None, header: false, cash_flow: None },
    DemoAccount { key: "loan", name: "Equipment Loan", account_type: "Liability", parent: None, header: false, cash_flow: None },
    DemoAccount { key: "capital", name: "Owner Capital", account_type: "Equity", parent: None, header: false, cash_flow: None },
    DemoAccount { key: "consulting", name: "Consulting Revenue", account_type: "Revenue", parent: None, header: false, cash_flow: None },
    DemoAccount { key: "opex", name: "Operating Expenses", account_type: "Expense", parent: None, header: true, cash_flow: None },
    DemoAccount { key: "rent", name: "Office Rent", account_type: "Expense", parent: Some("opex"), header: false, cash_flow: None },
    DemoAccount { key: "software", name: "Software Subscriptions", account_type: "Expense", parent: Some("opex"), header: false, cash_flow: None },
    DemoAccount { key: "meals", name: "Client Meals", account_type: "Expense", parent: Some("opex"), header: false, cash_flow: None },
    DemoAccount { key: "deposit", name: "Security Deposit", account_type: "Asset", parent: None, header: false, cash_flow: Some(CashFlowActivity::Investing) },
];

/// Base monthly invoice amounts, cycled.
const INVOICES: &[f64] = &[9500.0, 12000.0, 8700.0, 11200.0, 10400.0, 13100.0];

const MEALS: &[(&str, f64)] = &[
    ("Lunch with client", 64.20),
    ("Team dinner", 148.75),
    ("Coffee meeting", 18.40),
];

/// A journal entry keyed by demo account keys instead of ids.
struct DemoEntry {
    date: String,
    description: String,
    reference: Option<String>,
    lines: Vec<(&'static str, f64, f64)>,
}

impl DemoEntry {
    fn new(date: String, description: impl Into<String>, lines: Vec<(&'static str, f64, f64)>) -> Self {
        Self {
            date,
            description: description.into(),
            reference: None,
            lines,
        }
    }

    fn with_reference(mut self, reference: String) -> Self {
        self.reference = Some(reference);
        self
    }
}

/// Clamp a day to the last valid day of the given year/month.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next_month
        .and_then(|d| d.pred_opt())
        .map(|d| d.day())
        .unwrap_or(28)
        .min(day)
}

fn make_date(year: i32, month: u32, day: u32) -> String {
    let d = clamp_day(year, month, day);
    format!("{year:04}-{month:02}-{d:02}")
}

fn cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Build the demo journal: start-up entries in the first month, then a repeating monthly cycle
/// ending in the month of `today`.
fn generate_entries(today: NaiveDate) -> Vec<DemoEntry> {
    let mut entries = Vec::new();

    for i in 0..MONTHS {
        let target = today - chrono::Months::new(MONTHS - 1 - i);
        let (year, month) = (target.year(), target.month());
        let idx = i as usize;

        if i == 0 {
            entries.push(DemoEntry::new(
                make_date(year, month, 1),
                "Owner investment",
                vec![("bank", 25000.0, 0.0), ("capital", 0.0, 25000.0)],
            ));
            entries.push(DemoEntry::new(
                make_date(year, month, 2),
                "Fund petty cash",
                vec![("petty", 400.0, 0.0), ("bank", 0.0, 400.0)],
            ));
            entries.push(DemoEntry::new(
                make_date(year, month, 2),
                "Office lease deposit",
                vec![("deposit", 3600.0, 0.0), ("bank", 0.0, 3600.0)],
            ));
            entries.push(DemoEntry::new(
                make_date(year, month, 6),
                "Laptops for the team",
                vec![("laptops", 4800.0, 0.0), ("loan", 0.0, 4000.0), ("bank", 0.0, 800.0)],
            ));
        }

        let invoice = cents(INVOICES[idx % INVOICES.len()] * (1.0 + ((idx % 5) as f64 - 2.0) * 0.01));
        let invoice_ref = format!("INV-{year}{month:02}");
        entries.push(
            DemoEntry::new(
                make_date(year, month, 3),
                "Consulting invoice",
                vec![("ar", invoice, 0.0), ("consulting", 0.0, invoice)],
            )
            .with_reference(invoice_ref.clone()),
        );
        entries.push(
            DemoEntry::new(
                make_date(year, month, 24),
                "Client payment received",
                vec![("bank", invoice, 0.0), ("ar", 0.0, invoice)],
            )
            .with_reference(invoice_ref),
        );
        entries.push(DemoEntry::new(
            make_date(year, month, 1),
            "Monthly office rent",
            vec![("rent", 1800.0, 0.0), ("bank", 0.0, 1800.0)],
        ));

        let software = cents(189.0 + ((idx % 3) as f64) * 12.5);
        entries.push(DemoEntry::new(
            make_date(year, month, 8),
            "Software subscriptions",
            vec![("software", software, 0.0), ("ap", 0.0, software)],
        ));
        entries.push(DemoEntry::new(
            make_date(year, month, 28),
            "Pay software vendors",
            vec![("ap", software, 0.0), ("bank", 0.0, software)],
        ));

        let (meal, amount) = MEALS[idx % MEALS.len()];
        entries.push(DemoEntry::new(
            make_date(year, month, 15),
            meal,
            vec![("meals", amount, 0.0), ("petty", 0.0, amount)],
        ));

        if i > 0 {
            entries.push(DemoEntry::new(
                make_date(year, month, 30),
                "Equipment loan payment",
                vec![("loan", 400.0, 0.0), ("bank", 0.0, 400.0)],
            ));
        }
    }

    entries.sort_by(|a, b| a.date.cmp(&b.date));
    entries
}

/// Create the demo chart and post its journal; returns (accounts, entries).
fn insert_demo_data(conn: &Connection, created_by: Option<&str>) -> Result<(usize, usize)> {
    let mut ids: HashMap<&str, i64> = HashMap::new();
    for demo in ACCOUNTS {
        let account_type = find_account_type(conn, demo.account_type)?;
        let parent_account_id = demo
            .parent
            .map(|key| {
                ids.get(key)
                    .copied()
                    .ok_or_else(|| LedgerError::NotFound(format!("demo parent {key}")))
            })
            .transpose()?;
        let account = create_account(
            conn,
            &NewAccount {
                name: demo.name.to_string(),
                account_type_id: account_type.id,
                parent_account_id,
                is_header: demo.header,
                cash_flow_activity: demo.cash_flow,
                ..Default::default()
            },
        )?;
        ids.insert(demo.key, account.id);
    }

    let entries = generate_entries(Local::now().date_naive());
    for demo in &entries {
        let mut lines = Vec::with_capacity(demo.lines.len());
        for &(key, debit, credit) in &demo.lines {
            let account_id = *ids
                .get(key)
                .ok_or_else(|| LedgerError::NotFound(format!("demo account {key}")))?;
            lines.push(NewLine {
                account_id,
                debit_amount: debit,
                credit_amount: credit,
                ..Default::default()
            });
        }
        create_journal_entry(
            conn,
            &NewEntry {
                entry_date: demo.date.clone(),
                description: demo.description.clone(),
                reference: demo.reference.clone(),
                lines,
                created_by: created_by.map(str::to_string),
            },
        )?;
    }

    Ok((ACCOUNTS.len(), entries.len()))
}

pub fn run() -> Result<()> {
    let (conn, profile) = session(Role::Accountant)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM accounts WHERE name = ?1)",
        [MARKER_ACCOUNT],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (account '{MARKER_ACCOUNT}' exists).");
        return Ok(());
    }

    let (accounts, entries) = insert_demo_data(&conn, Some(profile.email.as_str()))?;

    println!("Demo data loaded!");
    println!("  Accounts:  {accounts}");
    println!("  Entries:   {entries}");
    println!();
    println!("Try these next:");
    println!("  ledgerly accounts tree");
    println!("  ledgerly journal list");
    println!("  ledgerly report trial-balance");
    println!("  ledgerly report balance-sheet");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;
    use crate::ledger::DateRange;
    use crate::reports::trial_balance;

    #[test]
    fn test_generated_entries_balance() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let entries = generate_entries(today);
        // 4 start-up entries, 6 per month, plus a loan payment in every month after the first
        assert_eq!(entries.len(), 4 + 6 * MONTHS as usize + (MONTHS as usize - 1));
        for e in &entries {
            let debits: f64 = e.lines.iter().map(|l| l.1).sum();
            let credits: f64 = e.lines.iter().map(|l| l.2).sum();
            assert!((debits - credits).abs() < 0.005, "{} does not balance", e.description);
        }
        assert_eq!(entries.first().map(|e| e.date.as_str()), Some("2024-10-01"));
        assert!(entries.iter().all(|e| e.date.as_str() <= "2025-03-31"));
    }

    #[test]
    fn test_clamp_day() {
        assert_eq!(make_date(2025, 2, 30), "2025-02-28");
        assert_eq!(make_date(2024, 12, 31), "2024-12-31");
    }

    #[test]
    fn test_demo_posts_a_balanced_ledger() {
        let (_dir, conn) = test_db();
        let (accounts, entries) = insert_demo_data(&conn, Some("demo@example.com")).unwrap();
        assert_eq!(accounts, ACCOUNTS.len());

        let posted: i64 = conn.query_row("SELECT count(*) FROM journal_entries", [], |r| r.get(0)).unwrap();
        assert_eq!(posted, entries as i64);

        let tb = trial_balance(&conn, &DateRange::all()).unwrap();
        assert!(tb.is_balanced());
        assert!(tb.total_debits > 0.0);
    }
}
