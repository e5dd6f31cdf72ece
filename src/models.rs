use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::LedgerError;

/// Debits and credits are considered equal when they differ by no more than this.
pub const BALANCE_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl NormalBalance {
    /// Closing balance on this side: debit-normal grows with debits, credit-normal with credits.
    pub fn apply(self, opening: f64, debits: f64, credits: f64) -> f64 {
        match self {
            NormalBalance::Debit => opening + debits - credits,
            NormalBalance::Credit => opening + credits - debits,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NormalBalance::Debit => "debit",
            NormalBalance::Credit => "credit",
        }
    }
}

impl FromStr for NormalBalance {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debit" => Ok(NormalBalance::Debit),
            "credit" => Ok(NormalBalance::Credit),
            other => Err(LedgerError::Validation(format!(
                "Invalid normal balance: {other} (must be 'debit' or 'credit')"
            ))),
        }
    }
}

impl fmt::Display for NormalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statement section an account type feeds, decided by the type's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportClass {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl ReportClass {
    pub fn from_type_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "asset" => Some(ReportClass::Asset),
            "liability" => Some(ReportClass::Liability),
            "equity" => Some(ReportClass::Equity),
            "revenue" => Some(ReportClass::Revenue),
            "expense" => Some(ReportClass::Expense),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CashFlowActivity {
    Operating,
    Investing,
    Financing,
}

impl CashFlowActivity {
    pub fn as_str(self) -> &'static str {
        match self {
            CashFlowActivity::Operating => "operating",
            CashFlowActivity::Investing => "investing",
            CashFlowActivity::Financing => "financing",
        }
    }
}

impl FromStr for CashFlowActivity {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "operating" => Ok(CashFlowActivity::Operating),
            "investing" => Ok(CashFlowActivity::Investing),
            "financing" => Ok(CashFlowActivity::Financing),
            other => Err(LedgerError::Validation(format!(
                "Invalid cash flow activity: {other} (must be operating, investing or financing)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Accountant,
    Admin,
}

impl Role {
    pub fn rank(self) -> u8 {
        match self {
            Role::User => 1,
            Role::Accountant => 2,
            Role::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Accountant => "accountant",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "accountant" => Ok(Role::Accountant),
            "admin" => Ok(Role::Admin),
            other => Err(LedgerError::Validation(format!(
                "Invalid role: {other} (must be admin, accountant or user)"
            ))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AccountType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub normal_balance: NormalBalance,
    pub is_system: bool,
}

impl AccountType {
    pub fn report_class(&self) -> Option<ReportClass> {
        ReportClass::from_type_name(&self.name)
    }
}

/// An account row joined with the fields of its type that reports need.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub account_type_id: i64,
    pub account_type: String,
    pub normal_balance: NormalBalance,
    pub parent_account_id: Option<i64>,
    pub is_header: bool,
    pub is_active: bool,
    pub cash_flow_activity: Option<CashFlowActivity>,
}

impl Account {
    pub fn report_class(&self) -> Option<ReportClass> {
        ReportClass::from_type_name(&self.account_type)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntry {
    pub id: i64,
    pub entry_number: String,
    pub entry_date: String,
    pub description: String,
    pub reference: Option<String>,
    pub total_debit: f64,
    pub total_credit: f64,
    pub is_balanced: bool,
    pub reverses_entry_id: Option<i64>,
    pub reversed_by_id: Option<i64>,
    pub created_by: Option<String>,
    pub lines: Vec<JournalEntryLine>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryLine {
    pub id: i64,
    pub journal_entry_id: i64,
    pub account_id: i64,
    pub account_code: String,
    pub account_name: String,
    pub account_type: String,
    pub description: Option<String>,
    pub debit_amount: f64,
    pub credit_amount: f64,
    pub line_number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_data: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpeningBalance {
    pub account_id: i64,
    pub balance: f64,
    pub as_of_date: Option<String>,
}

/// Parse a strict `YYYY-MM-DD` date and return it in canonical form.
pub fn parse_date(value: &str) -> crate::error::Result<String> {
    chrono::NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| LedgerError::Validation(format!("Invalid date: {value} (expected YYYY-MM-DD)")))
}
