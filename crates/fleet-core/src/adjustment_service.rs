//! Bank-account balance movements: postings, reversals, edits of posted
//! entries and explicit adjustments.

use std::collections::BTreeMap;

use fleet_domain::{
    AccountId, BankAccount, EntryId, Identifiable, Money, TransactionType,
};
use tracing::debug;

use crate::CoreError;

/// Before/after view of an edited entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingChange {
    pub entry_id: EntryId,
    pub account_id: Option<AccountId>,
    pub old_kind: TransactionType,
    pub old_amount: Money,
    pub new_kind: TransactionType,
    pub new_amount: Money,
}

impl PostingChange {
    pub fn is_noop(&self) -> bool {
        self.old_kind == self.new_kind && self.old_amount == self.new_amount
    }
}

/// Balance delta produced by editing a posted entry.
///
/// Same type: `new − old`, signed by the type. A flip reverses the original
/// posting and applies the new one in one step: credit→debit subtracts
/// `old + new`, debit→credit adds `old + new`.
pub fn edit_delta(change: &PostingChange) -> Money {
    use TransactionType::{Credit, Debit};

    match (change.old_kind, change.new_kind) {
        (Credit, Credit) => change.new_amount - change.old_amount,
        (Debit, Debit) => -(change.new_amount - change.old_amount),
        (Credit, Debit) => -(change.old_amount + change.new_amount),
        (Debit, Credit) => change.old_amount + change.new_amount,
    }
}

/// Registry of bank accounts. All balance changes go through here so a
/// missing account leaves everything untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountBook {
    accounts: BTreeMap<AccountId, BankAccount>,
}

impl AccountBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_accounts(accounts: impl IntoIterator<Item = BankAccount>) -> Self {
        let mut book = Self::new();
        for account in accounts {
            book.insert(account);
        }
        book
    }

    /// Adds or replaces an account, returning the previous value.
    pub fn insert(&mut self, account: BankAccount) -> Option<BankAccount> {
        self.accounts.insert(account.id(), account)
    }

    pub fn remove(&mut self, id: AccountId) -> Option<BankAccount> {
        self.accounts.remove(&id)
    }

    pub fn get(&self, id: AccountId) -> Option<&BankAccount> {
        self.accounts.get(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &BankAccount> {
        self.accounts.values()
    }

    pub fn balance(&self, id: AccountId) -> Result<Money, CoreError> {
        self.get(id)
            .map(BankAccount::current_balance)
            .ok_or(CoreError::AccountNotFound(id))
    }

    /// Applies a new posting of `amount` in direction `kind`.
    pub fn post(
        &mut self,
        id: AccountId,
        kind: TransactionType,
        amount: Money,
    ) -> Result<Money, CoreError> {
        crate::balance_service::ensure_positive(amount, "posting")?;
        self.apply(id, kind.signed(amount))
    }

    /// Undoes an earlier posting.
    pub fn reverse(
        &mut self,
        id: AccountId,
        kind: TransactionType,
        amount: Money,
    ) -> Result<Money, CoreError> {
        crate::balance_service::ensure_positive(amount, "reversal")?;
        self.apply(id, -kind.signed(amount))
    }

    /// Re-posts an edited entry using [`edit_delta`].
    pub fn apply_edit(&mut self, id: AccountId, change: &PostingChange) -> Result<Money, CoreError> {
        crate::balance_service::ensure_positive(change.new_amount, "edited amount")?;
        let delta = edit_delta(change);
        debug!(
            account = %id,
            entry = %change.entry_id,
            delta = %delta,
            "applying edit to posted entry"
        );
        self.apply(id, delta)
    }

    /// Explicit manual adjustment, positive or negative.
    pub fn adjust(&mut self, id: AccountId, delta: Money, reason: &str) -> Result<Money, CoreError> {
        debug!(account = %id, delta = %delta, reason, "manual balance adjustment");
        self.apply(id, delta)
    }

    fn apply(&mut self, id: AccountId, delta: Money) -> Result<Money, CoreError> {
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or(CoreError::AccountNotFound(id))?;
        account.apply_delta(delta);
        Ok(account.current_balance())
    }
}
