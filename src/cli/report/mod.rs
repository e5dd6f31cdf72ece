pub mod text;

use rusqlite::Connection;
use serde::Serialize;

use crate::accounts::find_account_by_code;
use crate::cashflow::cash_flow_statement;
use crate::cli::{currency, print_json, session};
use crate::db::get_metadata;
use crate::error::Result;
use crate::ledger::{general_ledger, opening_balance_for, DateRange};
use crate::models::{Account, Role};
use crate::reports::{
    account_detail, account_hierarchy, account_summary, balance_sheet, income_statement, trial_balance,
};

use super::ReportCommands;

#[derive(Debug, Clone, Serialize)]
pub struct GeneralLedgerLine {
    pub entry_date: String,
    pub entry_number: String,
    pub description: String,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub running_balance: f64,
}

/// One account's postings in journal order with a running balance.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralLedger {
    pub account: Account,
    pub range: DateRange,
    pub opening_balance: f64,
    pub lines: Vec<GeneralLedgerLine>,
    pub closing_balance: f64,
}

fn build_general_ledger(conn: &Connection, account: Account, range: DateRange) -> Result<GeneralLedger> {
    let opening = opening_balance_for(conn, &account, range.start.as_deref())?;
    let mut running = opening;
    let lines = general_ledger(conn, account.id, &range)?
        .into_iter()
        .map(|line| {
            running = account.normal_balance.apply(running, line.debit_amount, line.credit_amount);
            GeneralLedgerLine {
                entry_date: line.entry_date,
                entry_number: line.entry_number,
                description: line.description,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                running_balance: running,
            }
        })
        .collect();
    Ok(GeneralLedger {
        account,
        range,
        opening_balance: opening,
        lines,
        closing_balance: running,
    })
}

fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

/// Run a report command: JSON to stdout with `--json`, otherwise a text table under the company name.
pub fn dispatch(cmd: ReportCommands) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let company = get_metadata(&conn, "company_name")?.unwrap_or_default();
    let symbol = currency();

    let body = match cmd {
        ReportCommands::TrialBalance { from_date, to_date, json } => {
            let range = DateRange::from_options(from_date.as_deref(), to_date.as_deref())?;
            let tb = trial_balance(&conn, &range)?;
            if json {
                return print_json(&tb);
            }
            text::format_trial_balance(&tb, &symbol)
        }
        ReportCommands::BalanceSheet { as_of, json } => {
            let bs = balance_sheet(&conn, &as_of.unwrap_or_else(today))?;
            if json {
                return print_json(&bs);
            }
            text::format_balance_sheet(&bs, &symbol)
        }
        ReportCommands::Income { from_date, to_date, json } => {
            let is = income_statement(&conn, &from_date, &to_date)?;
            if json {
                return print_json(&is);
            }
            text::format_income_statement(&is, &symbol)
        }
        ReportCommands::CashFlow { from_date, to_date, json } => {
            let cf = cash_flow_statement(&conn, &from_date, &to_date)?;
            if json {
                return print_json(&cf);
            }
            text::format_cash_flow(&cf, &symbol)
        }
        ReportCommands::Ledger {
            code,
            from_date,
            to_date,
            json,
        } => {
            let range = DateRange::from_options(from_date.as_deref(), to_date.as_deref())?;
            let account = find_account_by_code(&conn, &code)?;
            let gl = build_general_ledger(&conn, account, range)?;
            if json {
                return print_json(&gl);
            }
            text::format_general_ledger(&gl, &symbol)
        }
        ReportCommands::Account {
            code,
            from_date,
            to_date,
            json,
        } => {
            let range = DateRange::from_options(from_date.as_deref(), to_date.as_deref())?;
            let account = find_account_by_code(&conn, &code)?;
            let detail = account_detail(&conn, account.id, &range)?;
            if json {
                return print_json(&detail);
            }
            text::format_account_detail(&detail, &range, &symbol)
        }
        ReportCommands::Summary {
            from_date,
            to_date,
            tree,
            json,
        } => {
            let range = DateRange::from_options(from_date.as_deref(), to_date.as_deref())?;
            let rows = if tree {
                account_hierarchy(&conn, &range)?
            } else {
                account_summary(&conn, &range)?
            };
            if json {
                return print_json(&rows);
            }
            text::format_summary(&rows, &range, &symbol)
        }
    };

    println!("{}", text::with_header(&company, body));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::set_opening_balance;
    use crate::accounts::tests::add;
    use crate::db::tests::test_db;
    use crate::journal::create_journal_entry;
    use crate::journal::tests::{entry, line};

    #[test]
    fn test_general_ledger_running_balance() {
        let (_dir, conn) = test_db();
        let cash = add(&conn, "Asset", "Cash", None);
        let sales = add(&conn, "Revenue", "Sales", None);
        set_opening_balance(&conn, cash.id, 100.0, None).unwrap();
        create_journal_entry(&conn, &entry("2025-01-02", "Sale", vec![line(cash.id, 50.0, 0.0), line(sales.id, 0.0, 50.0)]))
            .unwrap();
        create_journal_entry(&conn, &entry("2025-01-03", "Refund", vec![line(sales.id, 20.0, 0.0), line(cash.id, 0.0, 20.0)]))
            .unwrap();

        let gl = build_general_ledger(&conn, cash, DateRange::all()).unwrap();
        assert_eq!(gl.opening_balance, 100.0);
        let running: Vec<f64> = gl.lines.iter().map(|l| l.running_balance).collect();
        assert_eq!(running, vec![150.0, 130.0]);
        assert_eq!(gl.closing_balance, 130.0);
    }
}
