use crate::money::Money;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which side increases the account balance.
///
/// A bank statement is held from the depositor's point of view, so
/// statement views run credit-normal even though the bank account is an
/// asset on the books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl NormalBalance {
    /// Signed movement of one entry under this polarity.
    pub fn signed(self, debit: Money, credit: Money) -> Money {
        match self {
            NormalBalance::Debit => debit - credit,
            NormalBalance::Credit => credit - debit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: Option<AccountId>,
    pub name: String,
    pub currency: String,
    pub opening_balance: Money,
    /// Date the opening balance was taken. Statement lines dated before
    /// this anchor never contribute to a ledger view.
    pub opening_balance_date: NaiveDate,
}

impl BankAccount {
    pub fn new(name: &str, currency: &str, opening_balance: Money, anchor: NaiveDate) -> Self {
        BankAccount {
            id: None,
            name: name.to_string(),
            currency: currency.to_string(),
            opening_balance,
            opening_balance_date: anchor,
        }
    }
}
