use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Journal entry is not balanced: debits {debits:.2} vs credits {credits:.2}. Total debits must equal total credits.")]
    Unbalanced { debits: f64, credits: f64 },

    #[error("{0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Account code already in use: {0}")]
    DuplicateCode(String),

    #[error("No free account codes left under prefix {0} (suffixes 01-99 are taken)")]
    CodeSpaceExhausted(String),

    #[error("{0}")]
    DeletionBlocked(String),

    #[error("Permission denied: requires the {required} role")]
    PermissionDenied { required: String },

    #[error("No signed-in user. Set user_email via `ledgerly init` or the LEDGERLY_USER variable.")]
    NotSignedIn,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Maps a UNIQUE violation on `accounts.code` to `DuplicateCode`, passing other errors through.
pub fn map_code_conflict(err: rusqlite::Error, code: &str) -> LedgerError {
    match err {
        rusqlite::Error::SqliteFailure(ref e, _)
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            LedgerError::DuplicateCode(code.to_string())
        }
        other => LedgerError::Db(other),
    }
}
