use rusqlite::{Connection, OptionalExtension};

use crate::error::{LedgerError, Result};
use crate::models::{Role, UserProfile};

const PROFILE_SELECT: &str = "SELECT id, email, name, role, avatar_url, created_at, updated_at FROM user_profiles";

fn profile_from_row(row: &rusqlite::Row) -> rusqlite::Result<UserProfile> {
    let role: String = row.get(3)?;
    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        name: row.get(2)?,
        role: role.parse().unwrap_or(Role::User),
        avatar_url: row.get(4)?,
        created_at: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
        updated_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

pub fn has_role(profile: &UserProfile, required: Role) -> bool {
    profile.role.rank() >= required.rank()
}

pub fn is_admin(profile: &UserProfile) -> bool {
    profile.role == Role::Admin
}

pub fn is_accountant_or_admin(profile: &UserProfile) -> bool {
    has_role(profile, Role::Accountant)
}

fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(LedgerError::Validation(format!("Invalid email address: {email}")));
    }
    Ok(email)
}

pub fn create_profile(conn: &Connection, email: &str, name: &str, role: Role) -> Result<UserProfile> {
    let email = normalize_email(email)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("Name is required".into()));
    }
    conn.execute(
        "INSERT INTO user_profiles (email, name, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![email, name, role.as_str()],
    )
    .map_err(|e| match e {
        rusqlite::Error::SqliteFailure(ref f, _) if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE => {
            LedgerError::Validation(format!("A profile for {email} already exists"))
        }
        other => LedgerError::Db(other),
    })?;
    tracing::info!(%email, role = %role, "created profile");
    get_profile(conn, &email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))
}

pub fn get_profile(conn: &Connection, email: &str) -> Result<Option<UserProfile>> {
    let email = email.trim().to_lowercase();
    let profile = conn
        .query_row(&format!("{PROFILE_SELECT} WHERE email = ?1"), [&email], profile_from_row)
        .optional()?;
    Ok(profile)
}

pub fn update_profile(
    conn: &Connection,
    email: &str,
    name: Option<&str>,
    avatar_url: Option<Option<&str>>,
) -> Result<UserProfile> {
    let current = get_profile(conn, email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))?;
    let name = match name.map(str::trim) {
        Some("") => return Err(LedgerError::Validation("Name is required".into())),
        Some(n) => n.to_string(),
        None => current.name,
    };
    let avatar_url = match avatar_url {
        Some(url) => url.map(str::to_string),
        None => current.avatar_url,
    };
    conn.execute(
        "UPDATE user_profiles SET name = ?1, avatar_url = ?2, updated_at = datetime('now') WHERE id = ?3",
        rusqlite::params![name, avatar_url, current.id],
    )?;
    get_profile(conn, email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))
}

pub fn list_profiles(conn: &Connection) -> Result<Vec<UserProfile>> {
    let mut stmt = conn.prepare(&format!("{PROFILE_SELECT} ORDER BY email"))?;
    let rows = stmt
        .query_map([], profile_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Changes a profile's role. The last admin cannot be demoted.
pub fn set_role(conn: &Connection, email: &str, role: Role) -> Result<UserProfile> {
    let current = get_profile(conn, email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))?;
    if current.role == Role::Admin && role != Role::Admin {
        let admins: i64 =
            conn.query_row("SELECT COUNT(*) FROM user_profiles WHERE role = 'admin'", [], |r| r.get(0))?;
        if admins <= 1 {
            return Err(LedgerError::Validation(format!(
                "{} is the only admin; promote another user first",
                current.email
            )));
        }
    }
    conn.execute(
        "UPDATE user_profiles SET role = ?1, updated_at = datetime('now') WHERE id = ?2",
        rusqlite::params![role.as_str(), current.id],
    )?;
    tracing::info!(email = %current.email, from = %current.role, to = %role, "changed role");
    get_profile(conn, email)?.ok_or_else(|| LedgerError::NotFound(format!("profile {email}")))
}

/// Resolves the signed-in user and checks they hold at least `required`.
pub fn require(conn: &Connection, email: Option<&str>, required: Role) -> Result<UserProfile> {
    let email = email.ok_or(LedgerError::NotSignedIn)?;
    let profile = get_profile(conn, email)?.ok_or(LedgerError::NotSignedIn)?;
    if !has_role(&profile, required) {
        tracing::warn!(email = %profile.email, role = %profile.role, required = %required, "permission denied");
        return Err(LedgerError::PermissionDenied {
            required: required.to_string(),
        });
    }
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::test_db;

    #[test]
    fn test_role_ranks() {
        let (_dir, conn) = test_db();
        let admin = create_profile(&conn, "a@example.com", "Ada", Role::Admin).unwrap();
        let acct = create_profile(&conn, "b@example.com", "Bo", Role::Accountant).unwrap();
        let user = create_profile(&conn, "c@example.com", "Cy", Role::User).unwrap();
        assert!(is_admin(&admin) && is_accountant_or_admin(&admin));
        assert!(!is_admin(&acct) && is_accountant_or_admin(&acct));
        assert!(!is_accountant_or_admin(&user));
        assert!(has_role(&user, Role::User));
    }

    #[test]
    fn test_require() {
        let (_dir, conn) = test_db();
        create_profile(&conn, "viewer@example.com", "Viewer", Role::User).unwrap();
        assert!(require(&conn, Some("viewer@example.com"), Role::User).is_ok());
        let err = require(&conn, Some("viewer@example.com"), Role::Accountant).unwrap_err();
        assert!(matches!(err, LedgerError::PermissionDenied { ref required } if required == "accountant"));
        assert!(matches!(require(&conn, None, Role::User), Err(LedgerError::NotSignedIn)));
        assert!(matches!(require(&conn, Some("ghost@example.com"), Role::User), Err(LedgerError::NotSignedIn)));
    }

    #[test]
    fn test_email_is_case_insensitive_and_unique() {
        let (_dir, conn) = test_db();
        create_profile(&conn, "Pat@Example.com", "Pat", Role::User).unwrap();
        assert!(get_profile(&conn, "pat@example.com").unwrap().is_some());
        let err = create_profile(&conn, "pat@example.com", "Pat 2", Role::User).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert!(create_profile(&conn, "not-an-email", "X", Role::User).is_err());
    }

    #[test]
    fn test_update_profile() {
        let (_dir, conn) = test_db();
        create_profile(&conn, "u@example.com", "Old", Role::User).unwrap();
        let p = update_profile(&conn, "u@example.com", Some("New"), Some(Some("https://img/x.png"))).unwrap();
        assert_eq!(p.name, "New");
        assert_eq!(p.avatar_url.as_deref(), Some("https://img/x.png"));
        let p = update_profile(&conn, "u@example.com", None, Some(None)).unwrap();
        assert_eq!(p.name, "New");
        assert!(p.avatar_url.is_none());
        assert!(update_profile(&conn, "u@example.com", Some("  "), None).is_err());
    }

    #[test]
    fn test_last_admin_cannot_be_demoted() {
        let (_dir, conn) = test_db();
        create_profile(&conn, "root@example.com", "Root", Role::Admin).unwrap();
        assert!(set_role(&conn, "root@example.com", Role::User).is_err());
        create_profile(&conn, "two@example.com", "Two", Role::Accountant).unwrap();
        set_role(&conn, "two@example.com", Role::Admin).unwrap();
        let p = set_role(&conn, "root@example.com", Role::User).unwrap();
        assert_eq!(p.role, Role::User);
        assert_eq!(list_profiles(&conn).unwrap().len(), 2);
    }
}
