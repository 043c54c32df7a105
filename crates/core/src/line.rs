use crate::account::AccountId;
use crate::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The four record kinds a statement line can settle against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Expense,
    Receipt,
    FundTransfer,
    JournalEntry,
}

impl CandidateKind {
    pub const ALL: [CandidateKind; 4] = [
        CandidateKind::Expense,
        CandidateKind::Receipt,
        CandidateKind::FundTransfer,
        CandidateKind::JournalEntry,
    ];
}

impl fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateKind::Expense => write!(f, "expense"),
            CandidateKind::Receipt => write!(f, "receipt"),
            CandidateKind::FundTransfer => write!(f, "fund_transfer"),
            CandidateKind::JournalEntry => write!(f, "journal_entry"),
        }
    }
}

impl FromStr for CandidateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "expense" => Ok(CandidateKind::Expense),
            "receipt" => Ok(CandidateKind::Receipt),
            "fund_transfer" => Ok(CandidateKind::FundTransfer),
            "journal_entry" => Ok(CandidateKind::JournalEntry),
            other => Err(format!("Unknown candidate kind: '{other}'")),
        }
    }
}

/// Reference from a settled statement line to the record it cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRef {
    pub kind: CandidateKind,
    pub id: i64,
}

impl fmt::Display for MatchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationStatus {
    Unmatched,
    Suggested,
    Matched,
    Recorded,
}

impl ReconciliationStatus {
    pub fn can_delete(self) -> bool {
        self == ReconciliationStatus::Unmatched
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconciliationStatus::Unmatched => write!(f, "unmatched"),
            ReconciliationStatus::Suggested => write!(f, "suggested"),
            ReconciliationStatus::Matched => write!(f, "matched"),
            ReconciliationStatus::Recorded => write!(f, "recorded"),
        }
    }
}

impl FromStr for ReconciliationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unmatched" => Ok(ReconciliationStatus::Unmatched),
            "suggested" => Ok(ReconciliationStatus::Suggested),
            "matched" => Ok(ReconciliationStatus::Matched),
            "recorded" => Ok(ReconciliationStatus::Recorded),
            other => Err(format!("Unknown reconciliation status: '{other}'")),
        }
    }
}

/// Operator or matcher action applied to a statement line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconEvent {
    /// Auto-matcher proposes a candidate below the confirm threshold.
    Suggest,
    /// Confirm a suggestion, or link a candidate by hand.
    Match,
    /// Create a brand-new record from the line itself.
    Record,
    /// Decline a suggestion.
    Reject,
    /// Detach a settled line from its record.
    Unlink,
}

impl fmt::Display for ReconEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconEvent::Suggest => write!(f, "suggest"),
            ReconEvent::Match => write!(f, "match"),
            ReconEvent::Record => write!(f, "record"),
            ReconEvent::Reject => write!(f, "reject"),
            ReconEvent::Unlink => write!(f, "unlink"),
        }
    }
}

/// The reconciliation state machine. Every status change in the system
/// goes through here; anything not listed is rejected.
pub fn transition(
    status: ReconciliationStatus,
    event: ReconEvent,
) -> Result<ReconciliationStatus, ReconError> {
    use ReconEvent::*;
    use ReconciliationStatus::*;
    match (status, event) {
        (Unmatched, Suggest) => Ok(Suggested),
        (Unmatched | Suggested, Match) => Ok(Matched),
        (Unmatched, Record) => Ok(Recorded),
        (Suggested, Reject) => Ok(Unmatched),
        (Matched | Recorded, Unlink) => Ok(Unmatched),
        _ => Err(ReconError::InvalidTransition { status, event }),
    }
}

/// One normalized row of a bank statement, as persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLine {
    pub id: i64,
    pub account_id: AccountId,
    pub upload_id: Option<i64>,
    pub date: NaiveDate,
    pub description: String,
    pub reference: String,
    pub debit: Money,
    pub credit: Money,
    pub balance: Money,
    pub currency: String,
    pub status: ReconciliationStatus,
    pub matched: Option<MatchRef>,
    pub note: Option<String>,
}

impl StatementLine {
    /// The movement on this line. At most one side is non-zero for
    /// parsed rows; a line with both sides zero has no movement.
    pub fn amount(&self) -> Money {
        if !self.debit.is_zero() {
            self.debit
        } else {
            self.credit
        }
    }

    pub fn is_debit(&self) -> bool {
        !self.debit.is_zero()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconError {
    #[error("cannot {event} statement line in state {status}")]
    InvalidTransition {
        status: ReconciliationStatus,
        event: ReconEvent,
    },
    #[error("{kind} #{id} is already linked to statement line {line_id}")]
    CandidateConflict {
        kind: CandidateKind,
        id: i64,
        line_id: i64,
    },
    #[error("cannot delete statement line {id} while {status}; unlink it first")]
    DeleteBlocked {
        id: i64,
        status: ReconciliationStatus,
    },
    #[error("cannot change date or amounts of statement line {id} while {status}; unlink it first")]
    EditBlocked {
        id: i64,
        status: ReconciliationStatus,
    },
    #[error("statement line {0} has no pending suggestion")]
    NoSuggestion(i64),
    #[error("statement line {0} not found")]
    LineNotFound(i64),
    #[error("bank account {0} not found")]
    AccountNotFound(AccountId),
    #[error("{kind} #{id} not found")]
    CandidateNotFound { kind: CandidateKind, id: i64 },
}
