use crate::access::{get_profile, is_accountant_or_admin};
use crate::db::{get_connection, get_metadata};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::journal::has_journal_entries;
use crate::settings::{load_settings, DB_FILE};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!(
        "User:       {}",
        if settings.user_email.is_empty() { "(not set)" } else { &settings.user_email }
    );
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());
    println!("Currency:   {}", settings.currency_symbol);

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `ledgerly init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:    {}", format_bytes(size));

    let conn = get_connection(&db_path)?;
    let company = get_metadata(&conn, "company_name")?;
    println!("Company:    {}", company.as_deref().unwrap_or("(not set)"));
    if !settings.user_email.is_empty() {
        match get_profile(&conn, &settings.user_email)? {
            Some(p) => {
                let access = if is_accountant_or_admin(&p) { "read/write" } else { "read only" };
                println!("Role:       {} ({access})", p.role);
            }
            None => println!("Role:       (no profile)"),
        }
    }

    let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |r| r.get(0)) };
    let accounts = count("SELECT count(*) FROM accounts WHERE is_active = 1")?;
    let types = count("SELECT count(*) FROM account_types")?;
    let entries = count("SELECT count(*) FROM journal_entries")?;
    let lines = count("SELECT count(*) FROM journal_entry_lines")?;
    let users = count("SELECT count(*) FROM user_profiles")?;

    println!();
    println!("Accounts:       {accounts}");
    println!("Account types:  {types}");
    println!("Entries:        {entries}");
    println!("Entry lines:    {lines}");
    println!("Users:          {users}");
    if !has_journal_entries(&conn)? {
        println!();
        println!("No journal entries yet. Try `ledgerly demo` or `ledgerly journal add`.");
    }
    Ok(())
}
