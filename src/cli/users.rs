use comfy_table::{Cell, Table};

use crate::access::{create_profile, get_profile, is_admin, list_profiles, set_role as change_role, update_profile};
use crate::cli::session;
use crate::error::{LedgerError, Result};
use crate::models::{Role, UserProfile};

fn ensure_admin(profile: &UserProfile) -> Result<()> {
    if is_admin(profile) {
        Ok(())
    } else {
        Err(LedgerError::PermissionDenied {
            required: Role::Admin.to_string(),
        })
    }
}

fn print_profile(profile: &UserProfile) {
    println!("Email:      {}", profile.email);
    println!("Name:       {}", profile.name);
    println!("Role:       {}", profile.role);
    println!("Avatar:     {}", profile.avatar_url.as_deref().unwrap_or("(none)"));
    println!("Created:    {}", profile.created_at);
    println!("Updated:    {}", profile.updated_at);
}

pub fn list() -> Result<()> {
    let (conn, _) = session(Role::Admin)?;
    let mut table = Table::new();
    table.set_header(vec!["Email", "Name", "Role", "Created"]);
    for p in list_profiles(&conn)? {
        table.add_row(vec![
            Cell::new(&p.email),
            Cell::new(&p.name),
            Cell::new(p.role),
            Cell::new(&p.created_at),
        ]);
    }
    println!("Users\n{table}");
    Ok(())
}

pub fn add(email: &str, name: &str, role: &str) -> Result<()> {
    let (conn, _) = session(Role::Admin)?;
    let role: Role = role.parse()?;
    let profile = create_profile(&conn, email, name, role)?;
    println!("Added {} ({})", profile.email, profile.role);
    Ok(())
}

pub fn set_role(email: &str, role: &str) -> Result<()> {
    let (conn, _) = session(Role::Admin)?;
    let role: Role = role.parse()?;
    let profile = change_role(&conn, email, role)?;
    println!("{} is now {}", profile.email, profile.role);
    Ok(())
}

/// Anyone may look at their own profile; other profiles need the admin role.
pub fn show(email: Option<&str>) -> Result<()> {
    let (conn, me) = session(Role::User)?;
    let profile = match email {
        Some(email) if !email.trim().eq_ignore_ascii_case(&me.email) => {
            ensure_admin(&me)?;
            get_profile(&conn, email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))?
        }
        _ => me,
    };
    print_profile(&profile);
    Ok(())
}

pub fn update(email: Option<&str>, name: Option<&str>, avatar_url: Option<&str>, clear_avatar: bool) -> Result<()> {
    let (conn, me) = session(Role::User)?;
    let target = match email {
        Some(email) if !email.trim().eq_ignore_ascii_case(&me.email) => {
            ensure_admin(&me)?;
            email.to_string()
        }
        _ => me.email,
    };
    let avatar = if clear_avatar { Some(None) } else { avatar_url.map(Some) };
    let profile = update_profile(&conn, &target, name, avatar)?;
    print_profile(&profile);
    Ok(())
}
