use rusqlite::Connection;
use serde::Serialize;

use crate::accounts::list_chart;
use crate::error::Result;
use crate::journal::{list_journal_entries, EntryFilter};
use crate::ledger::{balance_as_of, balance_before, DateRange};
use crate::models::{parse_date, Account, CashFlowActivity, ReportClass};

const CASH_KEYWORDS: &[&str] = &["cash", "bank"];
const CASH_CODE_PREFIXES: &[&str] = &["111", "112"];
const WORKING_CAPITAL_KEYWORDS: &[&str] = &["receivable", "payable", "inventory"];
const INVESTING_KEYWORDS: &[&str] = &["equipment", "vehicle", "building", "investment"];
const FINANCING_KEYWORDS: &[&str] = &["loan", "debt"];

fn name_has(account: &Account, keywords: &[&str]) -> bool {
    let name = account.name.to_lowercase();
    keywords.iter().any(|k| name.contains(k))
}

pub fn is_cash_account(account: &Account) -> bool {
    account.report_class() == Some(ReportClass::Asset)
        && (name_has(account, CASH_KEYWORDS) || CASH_CODE_PREFIXES.iter().any(|p| account.code.starts_with(p)))
}

/// Which section of the statement a movement on this account belongs to.
///
/// A per-account override wins; otherwise the account name is matched against keyword lists,
/// so an account named without the expected word lands in operating activities.
pub fn classify(account: &Account) -> CashFlowActivity {
    if let Some(activity) = account.cash_flow_activity {
        return activity;
    }
    let class = account.report_class();
    match class {
        Some(ReportClass::Revenue) | Some(ReportClass::Expense) => return CashFlowActivity::Operating,
        _ => {}
    }
    let cash_named = class == Some(ReportClass::Asset) && name_has(account, CASH_KEYWORDS);
    if cash_named || name_has(account, WORKING_CAPITAL_KEYWORDS) {
        return CashFlowActivity::Operating;
    }
    match class {
        Some(ReportClass::Asset) if name_has(account, INVESTING_KEYWORDS) => CashFlowActivity::Investing,
        Some(ReportClass::Liability) if name_has(account, FINANCING_KEYWORDS) => CashFlowActivity::Financing,
        Some(ReportClass::Equity) => CashFlowActivity::Financing,
        _ => CashFlowActivity::Operating,
    }
}

pub fn category_label(account: &Account) -> &'static str {
    match account.report_class() {
        Some(ReportClass::Revenue) => "Revenue",
        Some(ReportClass::Expense) => "Expenses",
        Some(ReportClass::Asset) => {
            if name_has(account, CASH_KEYWORDS) {
                "Cash & Cash Equivalents"
            } else if name_has(account, &["receivable"]) {
                "Accounts Receivable"
            } else if name_has(account, &["inventory"]) {
                "Inventory"
            } else {
                "Other Assets"
            }
        }
        Some(ReportClass::Liability) => {
            if name_has(account, &["payable"]) {
                "Accounts Payable"
            } else if name_has(account, &["loan"]) {
                "Loans & Debt"
            } else {
                "Other Liabilities"
            }
        }
        Some(ReportClass::Equity) => "Equity",
        None => "Other",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowItem {
    pub entry_number: String,
    pub entry_date: String,
    pub account_code: String,
    pub category: String,
    pub description: String,
    /// Positive for cash coming in, negative for cash going out.
    pub amount: f64,
    pub activity: CashFlowActivity,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetCashFlow {
    pub operating: f64,
    pub investing: f64,
    pub financing: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CashFlowStatement {
    pub range: DateRange,
    pub operating_activities: Vec<CashFlowItem>,
    pub investing_activities: Vec<CashFlowItem>,
    pub financing_activities: Vec<CashFlowItem>,
    pub net_cash_flow: NetCashFlow,
    pub cash_at_beginning: f64,
    pub cash_at_end: f64,
}

/// Direct-method statement: every entry that moves a cash account is explained by its
/// non-cash lines, each classified by account.
pub fn cash_flow_statement(conn: &Connection, start: &str, end: &str) -> Result<CashFlowStatement> {
    let range = DateRange::between(start, end)?;
    let start = parse_date(start)?;
    let end = parse_date(end)?;

    let chart: Vec<Account> = list_chart(conn)?;
    let cash_accounts: Vec<&Account> = chart.iter().filter(|a| is_cash_account(a)).collect();

    let mut cash_at_beginning = 0.0;
    let mut cash_at_end = 0.0;
    for account in &cash_accounts {
        cash_at_beginning += balance_before(conn, account, &start)?;
        cash_at_end += balance_as_of(conn, account, &end)?;
    }

    let mut entries = list_journal_entries(
        conn,
        &EntryFilter {
            start: Some(start.clone()),
            end: Some(end.clone()),
            ..Default::default()
        },
    )?;
    entries.reverse();

    let is_cash_id = |id: i64| cash_accounts.iter().any(|a| a.id == id);
    let mut operating = Vec::new();
    let mut investing = Vec::new();
    let mut financing = Vec::new();

    for entry in &entries {
        if !entry.lines.iter().any(|l| is_cash_id(l.account_id)) {
            continue;
        }
        for line in entry.lines.iter().filter(|l| !is_cash_id(l.account_id)) {
            let amount = line.credit_amount - line.debit_amount;
            if amount.abs() < 0.005 {
                continue;
            }
            let Some(account) = chart.iter().find(|a| a.id == line.account_id) else {
                tracing::warn!(account_id = line.account_id, entry = %entry.entry_number, "line on inactive account left out of cash flow");
                continue;
            };
            let activity = classify(account);
            let item = CashFlowItem {
                entry_number: entry.entry_number.clone(),
                entry_date: entry.entry_date.clone(),
                account_code: account.code.clone(),
                category: category_label(account).to_string(),
                description: line.description.clone().unwrap_or_else(|| entry.description.clone()),
                amount,
                activity,
            };
            match activity {
                CashFlowActivity::Operating => operating.push(item),
                CashFlowActivity::Investing => investing.push(item),
                CashFlowActivity::Financing => financing.push(item),
            }
        }
    }

    let sum = |items: &[CashFlowItem]| items.iter().map(|i| i.amount).sum::<f64>();
    let net = NetCashFlow {
        operating: sum(&operating),
        investing: sum(&investing),
        financing: sum(&financing),
        total: sum(&operating) + sum(&investing) + sum(&financing),
    };

    Ok(CashFlowStatement {
        range,
        operating_activities: operating,
        investing_activities: investing,
        financing_activities: financing,
        net_cash_flow: net,
        cash_at_beginning,
        cash_at_end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::add;
    use crate::accounts::{set_opening_balance, update_account, AccountUpdate};
    use crate::db::tests::test_db;
    use crate::journal::create_journal_entry;
    use crate::journal::tests::{entry, line};

    #[test]
    fn test_keyword_classification() {
        let (_dir, conn) = test_db();
        assert_eq!(classify(&add(&conn, "Revenue", "Consulting", None)), CashFlowActivity::Operating);
        assert_eq!(classify(&add(&conn, "Asset", "Office Equipment", None)), CashFlowActivity::Investing);
        assert_eq!(classify(&add(&conn, "Liability", "Bank Loan", None)), CashFlowActivity::Financing);
        assert_eq!(classify(&add(&conn, "Asset", "Bank Deposit Account", None)), CashFlowActivity::Operating);
        assert_eq!(classify(&add(&conn, "Liability", "Term Debt", None)), CashFlowActivity::Financing);
        assert_eq!(classify(&add(&conn, "Equity", "Owner Capital", None)), CashFlowActivity::Financing);
        assert_eq!(classify(&add(&conn, "Liability", "Accounts Payable", None)), CashFlowActivity::Operating);
    }

    #[test]
    fn test_unmatched_name_defaults_to_operating_unless_overridden() {
        let (_dir, conn) = test_db();
        let van = add(&conn, "Asset", "Delivery Van", None);
        assert_eq!(classify(&van), CashFlowActivity::Operating);
        let van = update_account(
            &conn,
            van.id,
            &AccountUpdate { cash_flow_activity: Some(Some(CashFlowActivity::Investing)), ..Default::default() },
        )
        .unwrap();
        assert_eq!(classify(&van), CashFlowActivity::Investing);
    }

    #[test]
    fn test_category_labels() {
        let (_dir, conn) = test_db();
        assert_eq!(category_label(&add(&conn, "Asset", "Main Bank", None)), "Cash & Cash Equivalents");
        assert_eq!(category_label(&add(&conn, "Liability", "Car Loan", None)), "Loans & Debt");
        assert_eq!(category_label(&add(&conn, "Expense", "Rent", None)), "Expenses");
    }

    #[test]
    fn test_statement_reconciles_cash_movement() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let receivable = add(&conn, "Asset", "Accounts Receivable", None);
        let equipment = add(&conn, "Asset", "Equipment", None);
        let capital = add(&conn, "Equity", "Owner Capital", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        set_opening_balance(&conn, cash.id, 1000.0, None).unwrap();

        let post = |date: &str, lines: Vec<crate::journal::NewLine>| {
            create_journal_entry(&conn, &entry(date, "t", lines)).unwrap();
        };
        post("2024-12-30", vec![line(cash.id, 500.0, 0.0), line(capital.id, 0.0, 500.0)]);
        post("2025-01-03", vec![line(cash.id, 300.0, 0.0), line(sales.id, 0.0, 300.0)]);
        post("2025-01-04", vec![line(receivable.id, 700.0, 0.0), line(sales.id, 0.0, 700.0)]);
        post("2025-01-10", vec![line(equipment.id, 400.0, 0.0), line(cash.id, 0.0, 400.0)]);
        post("2025-01-15", vec![line(cash.id, 2000.0, 0.0), line(capital.id, 0.0, 2000.0)]);

        let cf = cash_flow_statement(&conn, "2025-01-01", "2025-01-31").unwrap();
        assert_eq!(cf.cash_at_beginning, 1500.0);
        assert_eq!(cf.cash_at_end, 3400.0);
        assert_eq!(cf.net_cash_flow.operating, 300.0, "credit sale moves no cash");
        assert_eq!(cf.net_cash_flow.investing, -400.0);
        assert_eq!(cf.net_cash_flow.financing, 2000.0);
        assert_eq!(cf.cash_at_beginning + cf.net_cash_flow.total, cf.cash_at_end);
        assert_eq!(cf.operating_activities[0].category, "Revenue");
    }

    #[test]
    fn test_transfer_between_cash_accounts_is_not_a_flow() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let bank = add(&conn, "Asset", "Bank", None);
        create_journal_entry(&conn, &entry("2025-01-05", "Deposit", vec![line(bank.id, 50.0, 0.0), line(cash.id, 0.0, 50.0)]))
            .unwrap();
        let loan = add(&conn, "Liability", "Bank Loan", None);
        assert!(!is_cash_account(&loan));
        let cf = cash_flow_statement(&conn, "2025-01-01", "2025-01-31").unwrap();
        assert!(cf.operating_activities.is_empty());
        assert_eq!(cf.net_cash_flow.total, 0.0);
    }

    #[test]
    fn test_bank_loan_drawdown_is_financing() {
        let (_dir, conn) = test_db();
        let bank = add(&conn, "Asset", "Operating Bank", None);
        let loan = add(&conn, "Liability", "Bank Loan", None);
        create_journal_entry(&conn, &entry("2025-01-05", "Drawdown", vec![line(bank.id, 5000.0, 0.0), line(loan.id, 0.0, 5000.0)]))
            .unwrap();
        let cf = cash_flow_statement(&conn, "2025-01-01", "2025-01-31").unwrap();
        assert!(cf.operating_activities.is_empty());
        assert_eq!(cf.net_cash_flow.financing, 5000.0);
        assert_eq!(cf.financing_activities[0].category, "Loans & Debt");
    }
}
