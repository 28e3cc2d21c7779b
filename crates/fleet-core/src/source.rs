use chrono::NaiveDate;

use fleet_domain::{AccountId, BankAccount, BankTransaction, LedgerEntry};

use crate::CoreError;

/// Read-only access to the daybook, account list and bank statements held
/// by an external system.
pub trait LedgerSource: Send + Sync {
    /// Entries dated within `[from, to]`. `None` returns entries of every account.
    fn fetch_entries(
        &self,
        account: Option<AccountId>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, CoreError>;

    fn fetch_accounts(&self) -> Result<Vec<BankAccount>, CoreError>;

    /// Statement lines of one account dated within `[from, to]`.
    fn fetch_statement(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BankTransaction>, CoreError>;
}
