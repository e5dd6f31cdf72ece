use std::path::PathBuf;

use rusqlite::backup::Backup;

use crate::cli::session;
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::models::Role;
use crate::settings::get_data_dir;

pub fn run(output: Option<String>) -> Result<()> {
    let (conn, _) = session(Role::Accountant)?;

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let backups_dir = get_data_dir().join("backups");
            std::fs::create_dir_all(&backups_dir)?;
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            backups_dir.join(format!("ledgerly-{stamp}.db"))
        }
    };

    let mut dest_conn = rusqlite::Connection::open(&dest_path)?;
    let backup = Backup::new(&conn, &mut dest_conn)?;
    backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
    drop(backup);

    let size = std::fs::metadata(&dest_path)?.len();
    tracing::info!(path = %dest_path.display(), size, "backup written");
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}
