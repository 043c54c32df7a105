pub mod account;
pub mod ledger;
pub mod line;
pub mod money;
pub mod period;
pub mod upload;

pub use account::{AccountId, BankAccount, NormalBalance};
pub use ledger::{running_balance, LedgerEntry, LedgerRow, LedgerView};
pub use line::{
    transition, CandidateKind, MatchRef, ReconError, ReconEvent, ReconciliationStatus,
    StatementLine,
};
pub use money::Money;
pub use period::DateRange;
pub use upload::{StatementUpload, UploadStatus};
