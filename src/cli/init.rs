use std::path::PathBuf;

use crate::access::{create_profile, get_profile};
use crate::db::{get_connection, init_db, set_metadata};
use crate::error::Result;
use crate::models::Role;
use crate::settings::{load_settings, save_settings, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>, email: &str, name: &str, company: Option<&str>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("exports"))?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    if let Some(company) = company.map(str::trim).filter(|c| !c.is_empty()) {
        set_metadata(&conn, "company_name", company)?;
    }

    let profile = match get_profile(&conn, email)? {
        Some(existing) => {
            println!("Profile {} already exists ({})", existing.email, existing.role);
            existing
        }
        None => {
            let has_admin: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM user_profiles WHERE role = 'admin')",
                [],
                |row| row.get(0),
            )?;
            let role = if has_admin { Role::User } else { Role::Admin };
            create_profile(&conn, email, name, role)?
        }
    };

    settings.user_email = profile.email.clone();
    save_settings(&settings)?;

    println!("Initialized ledgerly at {}", resolved.display());
    println!("Signed in as {} ({})", profile.email, profile.role);
    Ok(())
}
