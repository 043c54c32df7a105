use crate::account::AccountId;
use crate::money::Money;
use crate::period::DateRange;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Processing,
    Imported,
    Failed,
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadStatus::Processing => write!(f, "processing"),
            UploadStatus::Imported => write!(f, "imported"),
            UploadStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for UploadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(UploadStatus::Processing),
            "imported" => Ok(UploadStatus::Imported),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(format!("Unknown upload status: '{other}'")),
        }
    }
}

/// Record of one statement file run through the importer. The parsed
/// header metadata is kept verbatim; nothing cross-checks it against
/// the inserted lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementUpload {
    pub id: i64,
    pub account_id: AccountId,
    pub source_name: String,
    pub source_url: Option<String>,
    pub status: UploadStatus,
    pub period: Option<DateRange>,
    pub opening_balance: Option<Money>,
    pub closing_balance: Option<Money>,
    pub total_debit: Option<Money>,
    pub total_credit: Option<Money>,
    pub line_count: i64,
    pub error: Option<String>,
    pub created_at: String,
}
