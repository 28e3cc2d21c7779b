use thiserror::Error;

use fleet_domain::{AccountId, BankTransactionId, EntryId, MoneyError, PeriodKey};

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Entries span more than one period: expected {expected}, found {found} on entry {entry}")]
    CrossPeriodEntries {
        expected: PeriodKey,
        found: PeriodKey,
        entry: EntryId,
    },
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Period {0} is already closed")]
    PeriodAlreadyClosed(PeriodKey),
    #[error("Period {0} is already open")]
    PeriodAlreadyOpen(PeriodKey),
    #[error("Period {0} must be closed first")]
    EarlierPeriodOpen(PeriodKey),
    #[error("Period not found: {0}")]
    PeriodNotFound(PeriodKey),
    #[error("Entry not found: {0}")]
    EntryNotFound(EntryId),
    #[error("Entry {0} already exists")]
    DuplicateEntry(EntryId),
    #[error("Bank line {bank} is already reconciled with entry {entry}")]
    DuplicateReconciliation { bank: BankTransactionId, entry: EntryId },
    #[error("Reconciliation conflict: {0}")]
    ReconciliationConflict(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Errors that callers may treat as a no-op rather than a failure.
    pub fn is_benign(&self) -> bool {
        matches!(self, CoreError::DuplicateReconciliation { .. })
    }
}

impl From<MoneyError> for CoreError {
    fn from(err: MoneyError) -> Self {
        CoreError::InvalidAmount(err.to_string())
    }
}
