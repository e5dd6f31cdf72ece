pub mod account_types;
pub mod accounts;
pub mod backup;
pub mod demo;
pub mod export;
pub mod init;
pub mod journal;
pub mod report;
pub mod status;
pub mod users;

use clap::{Parser, Subcommand};
use rusqlite::Connection;

use crate::access::require;
use crate::db::get_connection;
use crate::error::Result;
use crate::models::{Role, UserProfile};
use crate::settings::{existing_db_path, load_settings};

/// Open the ledger database of the configured data directory.
pub(crate) fn open_db() -> Result<Connection> {
    get_connection(&existing_db_path()?)
}

/// Open the database and check the signed-in user holds `role`.
pub(crate) fn session(role: Role) -> Result<(Connection, UserProfile)> {
    let conn = open_db()?;
    let settings = load_settings();
    let email = Some(settings.user_email.as_str()).filter(|e| !e.is_empty());
    let profile = require(&conn, email, role)?;
    Ok((conn, profile))
}

pub(crate) fn currency() -> String {
    load_settings().currency_symbol
}

pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Parser)]
#[command(name = "ledgerly", version, about = "Double-entry bookkeeping from the command line.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the data directory and database, and register the first admin.
    Init {
        /// Path for ledger data (default: ~/Documents/ledgerly)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
        /// Email of the first (admin) user; becomes the signed-in user
        #[arg(long)]
        email: String,
        /// Display name of the first user
        #[arg(long)]
        name: String,
        /// Company name printed above reports
        #[arg(long)]
        company: Option<String>,
    },
    /// Show settings and summary statistics.
    Status,
    /// Manage account types.
    Types {
        #[command(subcommand)]
        command: TypesCommands,
    },
    /// Manage the chart of accounts.
    Accounts {
        #[command(subcommand)]
        command: AccountsCommands,
    },
    /// Record and review journal entries.
    Journal {
        #[command(subcommand)]
        command: JournalCommands,
    },
    /// Financial statements and account reports.
    Report {
        #[command(subcommand)]
        command: ReportCommands,
    },
    /// Export ledger data to CSV.
    Export {
        #[command(subcommand)]
        command: ExportCommands,
    },
    /// Manage user profiles and roles.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Load a sample chart of accounts and journal to explore ledgerly.
    Demo,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/ledgerly-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Print shell completions.
    Completions {
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum TypesCommands {
    /// List account types.
    List,
    /// Add a custom account type.
    Add {
        name: String,
        /// Side on which balances increase: debit or credit
        #[arg(long = "normal")]
        normal_balance: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Edit an account type (system types included).
    Edit {
        /// Type ID (shown in `ledgerly types list`)
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long = "normal")]
        normal_balance: Option<String>,
    },
    /// Delete an unused custom account type.
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum AccountsCommands {
    /// List active accounts by code.
    List,
    /// Show the chart as a tree with balances.
    Tree {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
    },
    /// Add an account.
    Add {
        name: String,
        /// Account type name, e.g. Asset
        #[arg(long = "type")]
        account_type: String,
        /// Account code (generated from the type or parent when omitted)
        #[arg(long)]
        code: Option<String>,
        /// Parent account code
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Grouping account that cannot receive postings
        #[arg(long)]
        header: bool,
        /// Cash flow section override: operating, investing, financing
        #[arg(long = "cash-flow")]
        cash_flow: Option<String>,
    },
    /// Edit an account.
    Edit {
        code: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New parent account code
        #[arg(long, conflicts_with = "no_parent")]
        parent: Option<String>,
        /// Move the account to the top level
        #[arg(long = "no-parent")]
        no_parent: bool,
        /// Header flag: true or false
        #[arg(long)]
        header: Option<bool>,
        #[arg(long = "cash-flow", conflicts_with = "clear_cash_flow")]
        cash_flow: Option<String>,
        /// Drop the cash flow override and fall back to name matching
        #[arg(long = "clear-cash-flow")]
        clear_cash_flow: bool,
    },
    /// Deactivate an account.
    Delete { code: String },
    /// Preview the code the next account would get.
    NextCode {
        #[arg(long = "type")]
        account_type: String,
        #[arg(long)]
        parent: Option<String>,
    },
    /// Set, show, or clear an account's opening balance.
    OpeningBalance {
        code: String,
        /// Amount on the account's normal-balance side
        #[arg(allow_hyphen_values = true)]
        amount: Option<f64>,
        #[arg(long = "as-of")]
        as_of: Option<String>,
        #[arg(long, conflicts_with = "amount")]
        clear: bool,
    },
}

#[derive(Subcommand)]
pub enum JournalCommands {
    /// Record a balanced journal entry.
    Add {
        /// Entry date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: String,
        #[arg(long)]
        reference: Option<String>,
        /// CODE:DEBIT:CREDIT[:description], repeated once per line
        #[arg(long = "line", required = true)]
        lines: Vec<String>,
        /// N=PATH attaches a supporting document to line N
        #[arg(long = "attach")]
        attachments: Vec<String>,
    },
    /// Replace the header and lines of an entry.
    Edit {
        /// Entry number, e.g. JE-004
        number: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// New reference; an empty value clears it
        #[arg(long)]
        reference: Option<String>,
        #[arg(long = "line", required = true)]
        lines: Vec<String>,
        /// N=PATH replaces line N's document; other lines keep theirs
        #[arg(long = "attach")]
        attachments: Vec<String>,
        /// Remove the document from line N
        #[arg(long = "detach")]
        detach: Vec<usize>,
    },
    /// Show one entry with its lines.
    Show {
        number: String,
        #[arg(long)]
        json: bool,
    },
    /// List entries, newest first.
    List {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Only entries touching an account of this type
        #[arg(long = "type")]
        account_type: Option<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Post an offsetting entry that cancels an existing one.
    Reverse {
        number: String,
        /// Date of the reversing entry (default: today)
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Trial balance by account code.
    TrialBalance {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Assets, liabilities and equity as of a date.
    BalanceSheet {
        /// YYYY-MM-DD (default: today)
        #[arg(long = "as-of")]
        as_of: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Revenue and expenses for a period.
    Income {
        #[arg(long = "from")]
        from_date: String,
        #[arg(long = "to")]
        to_date: String,
        #[arg(long)]
        json: bool,
    },
    /// Cash movements by activity for a period.
    CashFlow {
        #[arg(long = "from")]
        from_date: String,
        #[arg(long = "to")]
        to_date: String,
        #[arg(long)]
        json: bool,
    },
    /// Postings to one account with a running balance.
    Ledger {
        code: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Account detail including sub-accounts.
    Account {
        code: String,
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Per-account activity summary.
    Summary {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Nest accounts under their parents
        #[arg(long)]
        tree: bool,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ExportCommands {
    /// Trial balance rows as CSV.
    TrialBalance {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Output file path
        #[arg(long)]
        output: String,
    },
    /// One CSV row per journal line.
    Journal {
        #[arg(long = "from")]
        from_date: Option<String>,
        #[arg(long = "to")]
        to_date: Option<String>,
        #[arg(long)]
        output: String,
    },
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// List user profiles.
    List,
    /// Add a user profile.
    Add {
        email: String,
        #[arg(long)]
        name: String,
        /// admin, accountant or user
        #[arg(long, default_value = "user")]
        role: String,
    },
    /// Change a user's role.
    Role { email: String, role: String },
    /// Show a profile (default: the signed-in user).
    Show { email: Option<String> },
    /// Update a profile's name or avatar (default: the signed-in user).
    Update {
        email: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "avatar-url", conflicts_with = "clear_avatar")]
        avatar_url: Option<String>,
        #[arg(long = "clear-avatar")]
        clear_avatar: bool,
    },
}
