use comfy_table::{Cell, Table};

use crate::account_types::{
    create_account_type, delete_account_type, get_account_type, list_account_types, update_account_type,
};
use crate::cli::session;
use crate::error::Result;
use crate::models::{NormalBalance, Role};

pub fn list() -> Result<()> {
    let (conn, _) = session(Role::User)?;
    let types = list_account_types(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Normal Balance", "System", "Description"]);
    for t in &types {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.name),
            Cell::new(t.normal_balance),
            Cell::new(if t.is_system { "yes" } else { "" }),
            Cell::new(t.description.as_deref().unwrap_or("")),
        ]);
    }
    println!("Account Types\n{table}");
    Ok(())
}

pub fn add(name: &str, normal_balance: &str, description: Option<&str>) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let side: NormalBalance = normal_balance.parse()?;
    let created = create_account_type(&conn, name, description, side)?;
    println!("Added account type: {} ({} normal)", created.name, created.normal_balance);
    Ok(())
}

pub fn edit(id: i64, name: Option<&str>, description: Option<&str>, normal_balance: Option<&str>) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let current = get_account_type(&conn, id)?;
    let side = match normal_balance {
        Some(s) => s.parse()?,
        None => current.normal_balance,
    };
    let updated = update_account_type(
        &conn,
        id,
        name.unwrap_or(&current.name),
        description.or(current.description.as_deref()),
        side,
    )?;
    println!("Updated account type: {}", updated.name);
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;
    let account_type = get_account_type(&conn, id)?;
    delete_account_type(&conn, id)?;
    println!("Deleted account type: {}", account_type.name);
    Ok(())
}
