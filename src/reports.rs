use std::collections::{HashMap, HashSet};

use rusqlite::Connection;
use serde::Serialize;

use crate::accounts::{child_accounts, get_account, list_chart};
use crate::error::Result;
use crate::ledger::{activity, balance_as_of, general_ledger, opening_balance_for, DateRange};
use crate::models::{parse_date, Account, NormalBalance, ReportClass, BALANCE_TOLERANCE};

/// Amounts below half a cent are treated as no activity.
const CENT: f64 = 0.005;

// ---------------------------------------------------------------------------
// Trial balance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalanceRow {
    pub account_id: i64,
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub opening_balance: f64,
    pub debit_total: f64,
    pub credit_total: f64,
    pub closing_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrialBalance {
    pub range: DateRange,
    pub rows: Vec<TrialBalanceRow>,
    pub total_debits: f64,
    pub total_credits: f64,
}

impl TrialBalance {
    pub fn is_balanced(&self) -> bool {
        (self.total_debits - self.total_credits).abs() <= BALANCE_TOLERANCE
    }
}

pub fn trial_balance(conn: &Connection, range: &DateRange) -> Result<TrialBalance> {
    let mut rows = Vec::new();
    for account in list_chart(conn)? {
        let opening = opening_balance_for(conn, &account, range.start.as_deref())?;
        let totals = activity(conn, account.id, range)?;
        rows.push(TrialBalanceRow {
            account_id: account.id,
            closing_balance: account.normal_balance.apply(opening, totals.debits, totals.credits),
            account_code: account.code,
            account_name: account.name,
            account_type: account.account_type,
            opening_balance: opening,
            debit_total: totals.debits,
            credit_total: totals.credits,
        });
    }
    rows.sort_by(|a, b| a.account_code.cmp(&b.account_code));

    let total_debits = rows.iter().map(|r| r.debit_total).sum();
    let total_credits = rows.iter().map(|r| r.credit_total).sum();
    Ok(TrialBalance {
        range: range.clone(),
        rows,
        total_debits,
        total_credits,
    })
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct StatementLine {
    pub code: String,
    pub name: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheetLine {
    pub code: String,
    pub name: String,
    /// Presentation amount: liabilities and equity are shown as absolute values.
    pub amount: f64,
    pub actual_balance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheet {
    pub as_of: String,
    pub assets: Vec<BalanceSheetLine>,
    pub liabilities: Vec<BalanceSheetLine>,
    pub equity: Vec<BalanceSheetLine>,
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
}

impl BalanceSheet {
    /// Assets minus liabilities and equity. Only zero when the ledger itself is in balance and
    /// period earnings have been closed to equity.
    pub fn difference(&self) -> f64 {
        self.total_assets - (self.total_liabilities + self.total_equity)
    }
}

pub fn balance_sheet(conn: &Connection, as_of: &str) -> Result<BalanceSheet> {
    let as_of = parse_date(as_of)?;
    let mut assets = Vec::new();
    let mut liabilities = Vec::new();
    let mut equity = Vec::new();

    for account in list_chart(conn)? {
        let section = match account.report_class() {
            Some(ReportClass::Asset) => &mut assets,
            Some(ReportClass::Liability) => &mut liabilities,
            Some(ReportClass::Equity) => &mut equity,
            _ => continue,
        };
        let balance = balance_as_of(conn, &account, &as_of)?;
        let amount = match account.report_class() {
            Some(ReportClass::Asset) => balance,
            _ => balance.abs(),
        };
        tracing::debug!(code = %account.code, balance, "balance sheet line");
        section.push(BalanceSheetLine {
            code: account.code,
            name: account.name,
            amount,
            actual_balance: balance,
        });
    }

    let total = |lines: &[BalanceSheetLine]| lines.iter().map(|l| l.amount).sum::<f64>();
    Ok(BalanceSheet {
        total_assets: total(&assets),
        total_liabilities: total(&liabilities),
        total_equity: total(&equity),
        as_of,
        assets,
        liabilities,
        equity,
    })
}

// ---------------------------------------------------------------------------
// Income statement
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IncomeStatement {
    pub range: DateRange,
    pub revenue: Vec<StatementLine>,
    pub expenses: Vec<StatementLine>,
    pub total_revenue: f64,
    pub total_expenses: f64,
    pub net_income: f64,
}

pub fn income_statement(conn: &Connection, start: &str, end: &str) -> Result<IncomeStatement> {
    let range = DateRange::between(start, end)?;
    let mut revenue = Vec::new();
    let mut expenses = Vec::new();

    for account in list_chart(conn)? {
        let class = account.report_class();
        if !matches!(class, Some(ReportClass::Revenue) | Some(ReportClass::Expense)) {
            continue;
        }
        let totals = activity(conn, account.id, &range)?;
        let (amount, section) = match class {
            Some(ReportClass::Revenue) => (totals.credits - totals.debits, &mut revenue),
            _ => (totals.debits - totals.credits, &mut expenses),
        };
        if amount.abs() < CENT {
            continue;
        }
        section.push(StatementLine {
            code: account.code,
            name: account.name,
            amount: amount.abs(),
        });
    }

    let total_revenue: f64 = revenue.iter().map(|l| l.amount).sum();
    let total_expenses: f64 = expenses.iter().map(|l| l.amount).sum();
    Ok(IncomeStatement {
        range,
        revenue,
        expenses,
        total_revenue,
        total_expenses,
        net_income: total_revenue - total_expenses,
    })
}

// ---------------------------------------------------------------------------
// Account detail
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DetailTransaction {
    pub line_id: i64,
    pub entry_date: String,
    pub entry_number: String,
    pub description: String,
    pub reference: Option<String>,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub running_balance: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DetailSummary {
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_change: f64,
    pub transaction_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountDetail {
    pub account: Account,
    pub opening_balance: f64,
    pub current_balance: f64,
    pub transactions: Vec<DetailTransaction>,
    pub summary: DetailSummary,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_accounts: Vec<AccountDetail>,
}

/// Transactions of one account with a running balance, recursing into active sub-accounts.
pub fn account_detail(conn: &Connection, account_id: i64, range: &DateRange) -> Result<AccountDetail> {
    let mut visited = HashSet::new();
    account_detail_inner(conn, account_id, range, &mut visited)
}

fn account_detail_inner(
    conn: &Connection,
    account_id: i64,
    range: &DateRange,
    visited: &mut HashSet<i64>,
) -> Result<AccountDetail> {
    visited.insert(account_id);
    let account = get_account(conn, account_id)?;
    let opening = opening_balance_for(conn, &account, range.start.as_deref())?;

    let mut running = opening;
    let transactions: Vec<DetailTransaction> = general_ledger(conn, account_id, range)?
        .into_iter()
        .map(|line| {
            running = account.normal_balance.apply(running, line.debit_amount, line.credit_amount);
            DetailTransaction {
                line_id: line.line_id,
                entry_date: line.entry_date,
                entry_number: line.entry_number,
                description: line.description,
                reference: line.reference,
                debit_amount: line.debit_amount,
                credit_amount: line.credit_amount,
                running_balance: running,
            }
        })
        .collect();

    let total_debits: f64 = transactions.iter().map(|t| t.debit_amount).sum();
    let total_credits: f64 = transactions.iter().map(|t| t.credit_amount).sum();
    let summary = DetailSummary {
        total_debits,
        total_credits,
        net_change: account.normal_balance.apply(0.0, total_debits, total_credits),
        transaction_count: transactions.len(),
    };

    let mut sub_accounts = Vec::new();
    for child in child_accounts(conn, account_id)? {
        if visited.contains(&child.id) {
            tracing::warn!(account_id = child.id, "account hierarchy loop, skipping");
            continue;
        }
        sub_accounts.push(account_detail_inner(conn, child.id, range, visited)?);
    }

    Ok(AccountDetail {
        account,
        opening_balance: opening,
        current_balance: running,
        transactions,
        summary,
        sub_accounts,
    })
}

// ---------------------------------------------------------------------------
// Account summary and hierarchy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AccountSummary {
    pub account_id: i64,
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub normal_balance: NormalBalance,
    pub parent_account_id: Option<i64>,
    pub is_header: bool,
    pub opening_balance: f64,
    pub current_balance: f64,
    pub total_debits: f64,
    pub total_credits: f64,
    pub net_change: f64,
    pub transaction_count: i64,
    pub has_sub_accounts: bool,
    /// Own balance plus the rolled-up balances of every descendant.
    pub rollup_balance: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sub_accounts: Vec<AccountSummary>,
}

/// One flat row per active account, in code order.
pub fn account_summary(conn: &Connection, range: &DateRange) -> Result<Vec<AccountSummary>> {
    let chart = list_chart(conn)?;
    let parents: HashSet<i64> = chart.iter().filter_map(|a| a.parent_account_id).collect();

    let mut rows = Vec::with_capacity(chart.len());
    for account in chart {
        let opening = opening_balance_for(conn, &account, range.start.as_deref())?;
        let totals = activity(conn, account.id, range)?;
        let current = account.normal_balance.apply(opening, totals.debits, totals.credits);
        rows.push(AccountSummary {
            account_id: account.id,
            has_sub_accounts: parents.contains(&account.id),
            account_code: account.code,
            account_name: account.name,
            account_type: account.account_type,
            normal_balance: account.normal_balance,
            parent_account_id: account.parent_account_id,
            is_header: account.is_header,
            opening_balance: opening,
            current_balance: current,
            total_debits: totals.debits,
            total_credits: totals.credits,
            net_change: account.normal_balance.apply(0.0, totals.debits, totals.credits),
            transaction_count: totals.count,
            rollup_balance: current,
            sub_accounts: Vec::new(),
        });
    }
    Ok(rows)
}

/// Nest flat summary rows under their parents. Rows whose parent is not among them become roots.
pub fn build_hierarchy(rows: Vec<AccountSummary>) -> Vec<AccountSummary> {
    let present: HashSet<i64> = rows.iter().map(|r| r.account_id).collect();
    let mut by_parent: HashMap<Option<i64>, Vec<AccountSummary>> = HashMap::new();
    for row in rows {
        let parent = row.parent_account_id.filter(|p| present.contains(p));
        by_parent.entry(parent).or_default().push(row);
    }

    fn attach(
        parent: Option<i64>,
        by_parent: &mut HashMap<Option<i64>, Vec<AccountSummary>>,
    ) -> Vec<AccountSummary> {
        let mut nodes = by_parent.remove(&parent).unwrap_or_default();
        for node in &mut nodes {
            node.sub_accounts = attach(Some(node.account_id), by_parent);
            node.has_sub_accounts = !node.sub_accounts.is_empty();
            node.rollup_balance =
                node.current_balance + node.sub_accounts.iter().map(|c| c.rollup_balance).sum::<f64>();
        }
        nodes.sort_by(|a, b| a.account_code.cmp(&b.account_code));
        nodes
    }

    attach(None, &mut by_parent)
}

pub fn account_hierarchy(conn: &Connection, range: &DateRange) -> Result<Vec<AccountSummary>> {
    Ok(build_hierarchy(account_summary(conn, range)?))
}
