use colored::Colorize;
use comfy_table::{Cell, Table};
use rusqlite::Connection;

use crate::account_types::find_account_type;
use crate::accounts::{
    clear_opening_balance, create_account, delete_account, find_account_by_code, generate_account_code,
    list_chart, opening_balance as stored_opening_balance, set_opening_balance, update_account, AccountUpdate,
    NewAccount,
};
use crate::cli::{currency, session};
use crate::error::Result;
use crate::fmt::money_in;
use crate::ledger::DateRange;
use crate::models::{Account, CashFlowActivity, Role};
use crate::reports::{account_hierarchy, AccountSummary};

pub struct AddArgs {
    pub name: String,
    pub account_type: String,
    pub code: Option<String>,
    pub parent: Option<String>,
    pub description: Option<String>,
    pub header: bool,
    pub cash_flow: Option<String>,
}

pub struct EditArgs {
    pub code: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub parent: Option<String>,
    pub no_parent: bool,
    pub header: Option<bool>,
    pub cash_flow: Option<String>,
    pub clear_cash_flow: bool,
}

fn parent_id(conn: &Connection, parent: Option<&str>) -> Result<Option<i64>> {
    parent.map(|code| find_account_by_code(conn, code).map(|a| a.id)).transpose()
}

fn parent_code(chart: &[Account], account: &Account) -> String {
    account
        .parent_account_id
        .and_then(|id| chart.iter().find(|a| a.id == id))
        .map(|p| p.code.clone())
        .unwrap_or_default()
}

pub fn list() -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let chart = list_chart(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["Code", "Name", "Type", "Parent", "Header", "Cash Flow"]);
    for account in &chart {
        table.add_row(vec![
            Cell::new(&account.code),
            Cell::new(&account.name),
            Cell::new(&account.account_type),
            Cell::new(parent_code(&chart, account)),
            Cell::new(if account.is_header { "yes" } else { "" }),
            Cell::new(account.cash_flow_activity.map(CashFlowActivity::as_str).unwrap_or("")),
        ]);
    }
    println!("Chart of Accounts\n{table}");
    Ok(())
}

fn add_tree_rows(table: &mut Table, nodes: &[AccountSummary], depth: usize, symbol: &str) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let label = format!("{indent}{} {}", node.account_code, node.account_name);
        let label = if node.is_header { label.bold().to_string() } else { label };
        table.add_row(vec![
            Cell::new(label),
            Cell::new(&node.account_type),
            Cell::new(money_in(node.current_balance, symbol)),
            Cell::new(if node.has_sub_accounts {
                money_in(node.rollup_balance, symbol)
            } else {
                String::new()
            }),
        ]);
        add_tree_rows(table, &node.sub_accounts, depth + 1, symbol);
    }
}

pub fn tree(from_date: Option<&str>, to_date: Option<&str>) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let range = DateRange::from_options(from_date, to_date)?;
    let roots = account_hierarchy(&conn, &range)?;

    let mut table = Table::new();
    table.set_header(vec!["Account", "Type", "Balance", "Rollup"]);
    add_tree_rows(&mut table, &roots, 0, &currency());
    println!("Account Hierarchy\n{table}");
    Ok(())
}

pub fn add(args: AddArgs) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let account_type = find_account_type(&conn, &args.account_type)?;
    let new = NewAccount {
        code: args.code,
        name: args.name,
        account_type_id: account_type.id,
        parent_account_id: parent_id(&conn, args.parent.as_deref())?,
        description: args.description,
        is_header: args.header,
        cash_flow_activity: args.cash_flow.as_deref().map(str::parse::<CashFlowActivity>).transpose()?,
    };
    let account = create_account(&conn, &new)?;
    println!("Added account: {} {} ({})", account.code, account.name, account.account_type);
    Ok(())
}

pub fn edit(args: EditArgs) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let account = find_account_by_code(&conn, &args.code)?;

    let parent_account_id = if args.no_parent {
        Some(None)
    } else {
        parent_id(&conn, args.parent.as_deref())?.map(Some)
    };
    let cash_flow_activity = if args.clear_cash_flow {
        Some(None)
    } else {
        args.cash_flow
            .as_deref()
            .map(str::parse::<CashFlowActivity>)
            .transpose()?
            .map(Some)
    };
    let changes = AccountUpdate {
        name: args.name,
        description: args.description.map(|d| Some(d).filter(|d| !d.trim().is_empty())),
        parent_account_id,
        is_header: args.header,
        cash_flow_activity,
    };
    let updated = update_account(&conn, account.id, &changes)?;
    println!("Updated account: {} {}", updated.code, updated.name);
    Ok(())
}

pub fn delete(code: &str) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let account = find_account_by_code(&conn, code)?;
    delete_account(&conn, account.id)?;
    println!("Deleted account: {} {}", account.code, account.name);
    Ok(())
}

pub fn next_code(account_type: &str, parent: Option<&str>) -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let account_type = find_account_type(&conn, account_type)?;
    let parent = parent_id(&conn, parent)?;
    println!("{}", generate_account_code(&conn, account_type.id, parent)?);
    Ok(())
}

pub fn opening_balance(code: &str, amount: Option<f64>, as_of: Option<&str>, clear: bool) -> Result<()> {
    let symbol = currency();
    if clear {
        let (conn, _) = session(Role::Accountant)?;
        let account = find_account_by_code(&conn, code)?;
        clear_opening_balance(&conn, account.id)?;
        println!("Cleared opening balance of {} {}", account.code, account.name);
        return Ok(());
    }
    match amount {
        Some(amount) => {
            let (conn, _) = session(Role::Accountant)?;
            let account = find_account_by_code(&conn, code)?;
            set_opening_balance(&conn, account.id, amount, as_of)?;
            println!("Opening balance of {} {}: {}", account.code, account.name, money_in(amount, &symbol));
        }
        None => {
            let (conn, _) = session(Role::User)?;
            let account = find_account_by_code(&conn, code)?;
            match stored_opening_balance(&conn, account.id)? {
                Some(ob) => println!(
                    "Opening balance of {} {}: {}{}",
                    account.code,
                    account.name,
                    money_in(ob.balance, &symbol),
                    ob.as_of_date.map(|d| format!(" (as of {d})")).unwrap_or_default()
                ),
                None => println!("{} {} has no opening balance", account.code, account.name),
            }
        }
    }
    Ok(())
}
