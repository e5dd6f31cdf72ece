use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::cashflow::{CashFlowItem, CashFlowStatement};
use crate::fmt::{money_in, side};
use crate::ledger::DateRange;
use crate::models::BALANCE_TOLERANCE;
use crate::reports::{AccountDetail, AccountSummary, BalanceSheet, BalanceSheetLine, IncomeStatement, TrialBalance};

use super::GeneralLedger;

/// Prepend company name as a header line if non-empty.
pub fn with_header(company_name: &str, body: String) -> String {
    if company_name.is_empty() {
        body
    } else {
        format!("{company_name}\n{body}")
    }
}

pub fn period_label(range: &DateRange) -> String {
    match (&range.start, &range.end) {
        (Some(s), Some(e)) => format!("{s} to {e}"),
        (None, Some(e)) => format!("through {e}"),
        (Some(s), None) => format!("from {s}"),
        (None, None) => "all dates".to_string(),
    }
}

fn amount_cell(text: String) -> Cell {
    Cell::new(text).set_alignment(CellAlignment::Right)
}

pub fn format_trial_balance(tb: &TrialBalance, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Code", "Account", "Type", "Opening", "Debits", "Credits", "Closing"]);
    for row in &tb.rows {
        table.add_row(vec![
            Cell::new(&row.account_code),
            Cell::new(&row.account_name),
            Cell::new(&row.account_type),
            amount_cell(money_in(row.opening_balance, symbol)),
            amount_cell(side(row.debit_total, symbol)),
            amount_cell(side(row.credit_total, symbol)),
            amount_cell(money_in(row.closing_balance, symbol)),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("TOTAL".bold()),
        Cell::new(""),
        Cell::new(""),
        amount_cell(money_in(tb.total_debits, symbol)),
        amount_cell(money_in(tb.total_credits, symbol)),
        Cell::new(""),
    ]);

    let status = if tb.is_balanced() {
        "Balanced".green().bold().to_string()
    } else {
        format!(
            "Out of balance by {}",
            money_in((tb.total_debits - tb.total_credits).abs(), symbol)
        )
        .red()
        .bold()
        .to_string()
    };
    format!("Trial Balance ({})\n{table}\n{status}", period_label(&tb.range))
}

fn balance_sheet_section(table: &mut Table, title: &str, lines: &[BalanceSheetLine], total: f64, symbol: &str) {
    table.add_row(vec![Cell::new(title.bold()), Cell::new("")]);
    for line in lines {
        table.add_row(vec![
            Cell::new(format!("  {} {}", line.code, line.name)),
            amount_cell(money_in(line.amount, symbol)),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("Total {}", title.to_lowercase()).bold()),
        amount_cell(money_in(total, symbol)),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);
}

pub fn format_balance_sheet(bs: &BalanceSheet, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Account", "Amount"]);
    balance_sheet_section(&mut table, "ASSETS", &bs.assets, bs.total_assets, symbol);
    balance_sheet_section(&mut table, "LIABILITIES", &bs.liabilities, bs.total_liabilities, symbol);
    balance_sheet_section(&mut table, "EQUITY", &bs.equity, bs.total_equity, symbol);
    table.add_row(vec![
        Cell::new("Liabilities + equity".bold()),
        amount_cell(money_in(bs.total_liabilities + bs.total_equity, symbol)),
    ]);

    let diff = bs.difference();
    let footer = if diff.abs() <= BALANCE_TOLERANCE {
        "Assets equal liabilities plus equity".green().to_string()
    } else {
        format!("Difference: {} (unclosed earnings or an unbalanced ledger)", money_in(diff, symbol))
            .yellow()
            .to_string()
    };
    format!("Balance Sheet as of {}\n{table}\n{footer}", bs.as_of)
}

pub fn format_income_statement(is: &IncomeStatement, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Account", "Amount"]);

    table.add_row(vec![Cell::new("REVENUE".green().bold()), Cell::new("")]);
    for line in &is.revenue {
        table.add_row(vec![
            Cell::new(format!("  {} {}", line.code, line.name)),
            amount_cell(money_in(line.amount, symbol)),
        ]);
    }
    table.add_row(vec![Cell::new("Total revenue".bold()), amount_cell(money_in(is.total_revenue, symbol))]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);

    table.add_row(vec![Cell::new("EXPENSES".red().bold()), Cell::new("")]);
    for line in &is.expenses {
        table.add_row(vec![
            Cell::new(format!("  {} {}", line.code, line.name)),
            amount_cell(money_in(line.amount, symbol)),
        ]);
    }
    table.add_row(vec![Cell::new("Total expenses".bold()), amount_cell(money_in(is.total_expenses, symbol))]);
    table.add_row(vec![Cell::new(""), Cell::new("")]);

    let net_label = if is.net_income >= 0.0 {
        "NET INCOME".green().bold()
    } else {
        "NET LOSS".red().bold()
    };
    table.add_row(vec![Cell::new(net_label), amount_cell(money_in(is.net_income, symbol))]);

    format!("Income Statement ({})\n{table}", period_label(&is.range))
}

fn cash_flow_section(table: &mut Table, title: &str, items: &[CashFlowItem], net: f64, symbol: &str) {
    table.add_row(vec![Cell::new(title.bold()), Cell::new(""), Cell::new("")]);
    for item in items {
        table.add_row(vec![
            Cell::new(format!("  {} {}", item.entry_number, item.description)),
            Cell::new(&item.category),
            amount_cell(money_in(item.amount, symbol)),
        ]);
    }
    table.add_row(vec![
        Cell::new(format!("Net cash from {}", title.to_lowercase()).bold()),
        Cell::new(""),
        amount_cell(money_in(net, symbol)),
    ]);
    table.add_row(vec![Cell::new(""), Cell::new(""), Cell::new("")]);
}

pub fn format_cash_flow(cf: &CashFlowStatement, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Item", "Category", "Amount"]);
    cash_flow_section(&mut table, "OPERATING ACTIVITIES", &cf.operating_activities, cf.net_cash_flow.operating, symbol);
    cash_flow_section(&mut table, "INVESTING ACTIVITIES", &cf.investing_activities, cf.net_cash_flow.investing, symbol);
    cash_flow_section(&mut table, "FINANCING ACTIVITIES", &cf.financing_activities, cf.net_cash_flow.financing, symbol);

    table.add_row(vec![
        Cell::new("Net change in cash".bold()),
        Cell::new(""),
        amount_cell(money_in(cf.net_cash_flow.total, symbol)),
    ]);
    table.add_row(vec![
        Cell::new("Cash at beginning"),
        Cell::new(""),
        amount_cell(money_in(cf.cash_at_beginning, symbol)),
    ]);
    table.add_row(vec![
        Cell::new("Cash at end".bold()),
        Cell::new(""),
        amount_cell(money_in(cf.cash_at_end, symbol)),
    ]);
    format!("Cash Flow Statement ({})\n{table}", period_label(&cf.range))
}

pub fn format_general_ledger(gl: &GeneralLedger, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Date", "Entry", "Description", "Debit", "Credit", "Balance"]);
    table.add_row(vec![
        Cell::new(""),
        Cell::new(""),
        Cell::new("Opening balance".italic()),
        Cell::new(""),
        Cell::new(""),
        amount_cell(money_in(gl.opening_balance, symbol)),
    ]);
    for line in &gl.lines {
        table.add_row(vec![
            Cell::new(&line.entry_date),
            Cell::new(&line.entry_number),
            Cell::new(&line.description),
            amount_cell(side(line.debit_amount, symbol)),
            amount_cell(side(line.credit_amount, symbol)),
            amount_cell(money_in(line.running_balance, symbol)),
        ]);
    }
    format!(
        "General Ledger: {} {} ({})\n{table}\nClosing balance: {}",
        gl.account.code,
        gl.account.name,
        period_label(&gl.range),
        money_in(gl.closing_balance, symbol)
    )
}

fn push_detail(out: &mut Vec<String>, detail: &AccountDetail, depth: usize, symbol: &str) {
    let indent = "  ".repeat(depth);
    out.push(format!(
        "{indent}{} {} ({}, {} normal)",
        detail.account.code.bold(),
        detail.account.name.bold(),
        detail.account.account_type,
        detail.account.normal_balance
    ));

    if !detail.transactions.is_empty() {
        let mut table = Table::new();
        table.set_header(vec!["Date", "Entry", "Description", "Debit", "Credit", "Balance"]);
        for t in &detail.transactions {
            table.add_row(vec![
                Cell::new(&t.entry_date),
                Cell::new(&t.entry_number),
                Cell::new(&t.description),
                amount_cell(side(t.debit_amount, symbol)),
                amount_cell(side(t.credit_amount, symbol)),
                amount_cell(money_in(t.running_balance, symbol)),
            ]);
        }
        out.push(table.to_string());
    }
    out.push(format!(
        "{indent}Opening {}  Debits {}  Credits {}  Net {}  Balance {}  ({} transactions)",
        money_in(detail.opening_balance, symbol),
        money_in(detail.summary.total_debits, symbol),
        money_in(detail.summary.total_credits, symbol),
        money_in(detail.summary.net_change, symbol),
        money_in(detail.current_balance, symbol),
        detail.summary.transaction_count
    ));
    for sub in &detail.sub_accounts {
        out.push(String::new());
        push_detail(out, sub, depth + 1, symbol);
    }
}

pub fn format_account_detail(detail: &AccountDetail, range: &DateRange, symbol: &str) -> String {
    let mut out = vec![format!("Account Detail ({})", period_label(range))];
    push_detail(&mut out, detail, 0, symbol);
    out.join("\n")
}

fn add_summary_rows(table: &mut Table, rows: &[AccountSummary], depth: usize, symbol: &str) {
    for row in rows {
        table.add_row(vec![
            Cell::new(format!("{}{}", "  ".repeat(depth), row.account_code)),
            Cell::new(&row.account_name),
            Cell::new(&row.account_type),
            amount_cell(money_in(row.opening_balance, symbol)),
            amount_cell(side(row.total_debits, symbol)),
            amount_cell(side(row.total_credits, symbol)),
            amount_cell(money_in(row.current_balance, symbol)),
            amount_cell(if row.has_sub_accounts {
                money_in(row.rollup_balance, symbol)
            } else {
                String::new()
            }),
            Cell::new(row.transaction_count),
        ]);
        add_summary_rows(table, &row.sub_accounts, depth + 1, symbol);
    }
}

pub fn format_summary(rows: &[AccountSummary], range: &DateRange, symbol: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Code", "Account", "Type", "Opening", "Debits", "Credits", "Balance", "Rollup", "Txns"]);
    add_summary_rows(&mut table, rows, 0, symbol);
    format!("Account Summary ({})\n{table}", period_label(range))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reports::{StatementLine, TrialBalanceRow};

    #[test]
    fn test_period_label() {
        assert_eq!(period_label(&DateRange::all()), "all dates");
        let range = DateRange::between("2025-01-01", "2025-03-31").unwrap();
        assert_eq!(period_label(&range), "2025-01-01 to 2025-03-31");
    }

    #[test]
    fn test_with_header() {
        assert_eq!(with_header("", "body".into()), "body");
        assert_eq!(with_header("Acme LLC", "body".into()), "Acme LLC\nbody");
    }

    #[test]
    fn test_trial_balance_text() {
        let tb = TrialBalance {
            range: DateRange::all(),
            rows: vec![TrialBalanceRow {
                account_id: 1,
                account_code: "101".into(),
                account_name: "Cash".into(),
                account_type: "Asset".into(),
                opening_balance: 0.0,
                debit_total: 1500.0,
                credit_total: 0.0,
                closing_balance: 1500.0,
            }],
            total_debits: 1500.0,
            total_credits: 1500.0,
        };
        let out = format_trial_balance(&tb, "$");
        assert!(out.contains("Trial Balance (all dates)"));
        assert!(out.contains("$1,500.00"));
        assert!(out.contains("Balanced"));
    }

    #[test]
    fn test_income_statement_shows_loss() {
        let is = IncomeStatement {
            range: DateRange::between("2025-01-01", "2025-01-31").unwrap(),
            revenue: vec![],
            expenses: vec![StatementLine {
                code: "501".into(),
                name: "Rent".into(),
                amount: 900.0,
            }],
            total_revenue: 0.0,
            total_expenses: 900.0,
            net_income: -900.0,
        };
        let out = format_income_statement(&is, "€");
        assert!(out.contains("NET LOSS"));
        assert!(out.contains("-€900.00"));
        assert!(out.contains("501 Rent"));
    }
}
