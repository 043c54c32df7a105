use crate::normalize::ParsedLine;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Exact-match identity of a statement line. Two rows are duplicates
/// only when every one of these fields agrees; cents avoid any scale
/// ambiguity in the comparison.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub date: NaiveDate,
    pub description: String,
    pub debit_cents: i64,
    pub credit_cents: i64,
    pub balance_cents: i64,
}

impl LineKey {
    pub fn of(line: &ParsedLine) -> Self {
        LineKey {
            date: line.date,
            description: line.description.clone(),
            debit_cents: line.debit.to_cents(),
            credit_cents: line.credit.to_cents(),
            balance_cents: line.balance.to_cents(),
        }
    }
}

/// What to do with rows already present in the account history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Drop duplicates, keep only fresh rows. The default.
    #[default]
    Skip,
    /// Insert everything; the operator has decided the repeats are
    /// genuine distinct transactions.
    InsertAnyway,
}

#[derive(Debug, Default)]
pub struct DedupOutcome {
    pub fresh: Vec<ParsedLine>,
    pub duplicates: Vec<ParsedLine>,
}

/// Split a parsed batch against the account's full line history.
///
/// Rows repeated within the batch itself are all fresh; banks do emit
/// identical same-day transactions, and only the stored history is
/// evidence of a re-upload.
pub fn partition_duplicates(batch: Vec<ParsedLine>, history: &HashSet<LineKey>) -> DedupOutcome {
    let mut outcome = DedupOutcome::default();
    for line in batch {
        if history.contains(&LineKey::of(&line)) {
            outcome.duplicates.push(line);
        } else {
            outcome.fresh.push(line);
        }
    }
    outcome
}
