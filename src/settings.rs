use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, Result};

pub const DB_FILE: &str = "ledgerly.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,
}

fn default_currency_symbol() -> String {
    "$".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            user_email: String::new(),
            currency_symbol: default_currency_symbol(),
        }
    }
}

fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LEDGERLY_CONFIG_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("ledgerly")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("ledgerly")
}

/// Settings from `settings.json` with `LEDGERLY_DATA_DIR` / `LEDGERLY_USER` applied on top.
pub fn load_settings() -> Settings {
    let path = settings_path();
    let mut settings = if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "unreadable settings file, using defaults");
            Settings::default()
        })
    } else {
        Settings::default()
    };
    apply_env_overrides(&mut settings);
    settings
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(dir) = std::env::var("LEDGERLY_DATA_DIR") {
        if !dir.is_empty() {
            settings.data_dir = dir;
        }
    }
    if let Ok(user) = std::env::var("LEDGERLY_USER") {
        if !user.is_empty() {
            settings.user_email = user;
        }
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| LedgerError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

/// Path of the ledger database, failing with setup instructions when it has not been created.
pub fn existing_db_path() -> Result<PathBuf> {
    let path = get_data_dir().join(DB_FILE);
    if !path.exists() {
        return Err(LedgerError::Config(format!(
            "database not found at {}. Run `ledgerly init` first, or point LEDGERLY_DATA_DIR at an existing data directory.",
            path.display()
        )));
    }
    Ok(path)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}
