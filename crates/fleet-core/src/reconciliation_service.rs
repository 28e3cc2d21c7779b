//! Matches bank statement lines against daybook entries and records
//! reconciled pairs.

use std::collections::{BTreeMap, BTreeSet};

use fleet_domain::{AccountId, BankTransaction, BankTransactionId, EntryId, LedgerEntry, Money};
use tracing::debug;

use crate::{adjustment_service::AccountBook, CoreError};

/// Tunables for automatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchPolicy {
    /// Largest allowed distance in days between the two dates, inclusive.
    pub date_tolerance_days: u32,
}

impl MatchPolicy {
    pub const DEFAULT_TOLERANCE_DAYS: u32 = 3;

    pub fn new(date_tolerance_days: u32) -> Self {
        Self { date_tolerance_days }
    }
}

impl Default for MatchPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE_DAYS)
    }
}

/// A proposed bank line to ledger entry pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MatchPair {
    pub bank_id: BankTransactionId,
    pub entry_id: EntryId,
    /// Absolute date distance between the two sides.
    pub day_gap: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub matches: Vec<MatchPair>,
    pub unmatched_bank: Vec<BankTransactionId>,
    pub unmatched_ledger: Vec<EntryId>,
}

impl ReconciliationReport {
    pub fn is_fully_matched(&self) -> bool {
        self.unmatched_bank.is_empty() && self.unmatched_ledger.is_empty()
    }

    pub fn matched_bank_ids(&self) -> BTreeSet<BankTransactionId> {
        self.matches.iter().map(|pair| pair.bank_id).collect()
    }

    pub fn matched_entry_ids(&self) -> BTreeSet<EntryId> {
        self.matches.iter().map(|pair| pair.entry_id).collect()
    }
}

pub struct ReconciliationService;

impl ReconciliationService {
    /// Pairs bank lines with ledger entries of the same amount and type whose
    /// dates lie within the policy tolerance.
    ///
    /// Bank lines are taken in (date, id) order. Each one claims the closest
    /// unused ledger entry by date, ties going to the lowest entry id. The
    /// result depends only on the inputs, not on their order.
    pub fn match_transactions(
        bank: &[BankTransaction],
        ledger: &[LedgerEntry],
        policy: MatchPolicy,
    ) -> ReconciliationReport {
        let mut bank_lines: Vec<&BankTransaction> = bank.iter().collect();
        bank_lines.sort_by_key(|line| (line.date, line.id));

        let mut candidates: Vec<&LedgerEntry> = ledger.iter().collect();
        candidates.sort_by_key(|entry| entry.id);

        let mut used: BTreeSet<EntryId> = BTreeSet::new();
        let mut report = ReconciliationReport::default();

        for line in bank_lines {
            let best = candidates
                .iter()
                .filter(|entry| !used.contains(&entry.id))
                .filter(|entry| entry.kind == line.kind && entry.amount == line.amount)
                .filter_map(|entry| {
                    let gap = (entry.date - line.date).num_days().unsigned_abs();
                    (gap <= u64::from(policy.date_tolerance_days)).then_some((gap, entry.id))
                })
                .min();

            match best {
                Some((gap, entry_id)) => {
                    used.insert(entry_id);
                    report.matches.push(MatchPair {
                        bank_id: line.id,
                        entry_id,
                        day_gap: u32::try_from(gap).unwrap_or(u32::MAX),
                    });
                }
                None => report.unmatched_bank.push(line.id),
            }
        }

        report.unmatched_ledger = candidates
            .iter()
            .map(|entry| entry.id)
            .filter(|id| !used.contains(id))
            .collect();
        report
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The pair was newly recorded and the bank line posted.
    Reconciled { balance: Money },
    /// The pair had been recorded before; nothing changed.
    AlreadyReconciled,
}

/// Set of reconciled pairs. Each bank line and each entry belongs to at most
/// one pair, and pairs are never recorded twice.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    by_bank: BTreeMap<BankTransactionId, EntryId>,
    by_entry: BTreeMap<EntryId, BankTransactionId>,
    posted_to: BTreeMap<EntryId, AccountId>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the pair and posts the bank line to its account. Repeating a
    /// recorded pair is a no-op.
    pub fn reconcile(
        &mut self,
        accounts: &mut AccountBook,
        bank: &BankTransaction,
        entry: &LedgerEntry,
    ) -> Result<ReconcileOutcome, CoreError> {
        match self.try_reconcile(accounts, bank, entry) {
            Ok(balance) => Ok(ReconcileOutcome::Reconciled { balance }),
            Err(err) if err.is_benign() => Ok(ReconcileOutcome::AlreadyReconciled),
            Err(err) => Err(err),
        }
    }

    /// Like [`Reconciler::reconcile`] but reports a repeated pair as
    /// [`CoreError::DuplicateReconciliation`]. Returns the account balance
    /// after posting.
    pub fn try_reconcile(
        &mut self,
        accounts: &mut AccountBook,
        bank: &BankTransaction,
        entry: &LedgerEntry,
    ) -> Result<Money, CoreError> {
        match (self.by_bank.get(&bank.id), self.by_entry.get(&entry.id)) {
            (Some(bound), _) if *bound == entry.id => {
                return Err(CoreError::DuplicateReconciliation {
                    bank: bank.id,
                    entry: entry.id,
                })
            }
            (Some(bound), _) => {
                return Err(CoreError::ReconciliationConflict(format!(
                    "bank line {} is already reconciled with entry {bound}",
                    bank.id
                )))
            }
            (None, Some(bound)) => {
                return Err(CoreError::ReconciliationConflict(format!(
                    "entry {} is already reconciled with bank line {bound}",
                    entry.id
                )))
            }
            (None, None) => {}
        }

        if bank.kind != entry.kind || bank.amount != entry.amount {
            return Err(CoreError::InvalidAmount(format!(
                "bank line {} ({} {}) does not match entry {} ({} {})",
                bank.id, bank.kind, bank.amount, entry.id, entry.kind, entry.amount
            )));
        }

        let balance = accounts.post(bank.account_id, bank.kind, bank.amount)?;
        self.by_bank.insert(bank.id, entry.id);
        self.by_entry.insert(entry.id, bank.id);
        self.posted_to.insert(entry.id, bank.account_id);
        debug!(bank = %bank.id, entry = %entry.id, balance = %balance, "reconciled pair");
        Ok(balance)
    }

    /// Reconciles every pair of `report`. Pairs already recorded are skipped,
    /// so applying a report twice leaves the same state. If any pair fails,
    /// neither the reconciler nor the accounts change.
    pub fn apply_report(
        &mut self,
        accounts: &mut AccountBook,
        report: &ReconciliationReport,
        bank: &[BankTransaction],
        ledger: &[LedgerEntry],
    ) -> Result<Vec<ReconcileOutcome>, CoreError> {
        let saved_pairs = self.clone();
        let saved_accounts = accounts.clone();
        let result = self.apply_pairs(accounts, report, bank, ledger);
        if result.is_err() {
            *self = saved_pairs;
            *accounts = saved_accounts;
        }
        result
    }

    fn apply_pairs(
        &mut self,
        accounts: &mut AccountBook,
        report: &ReconciliationReport,
        bank: &[BankTransaction],
        ledger: &[LedgerEntry],
    ) -> Result<Vec<ReconcileOutcome>, CoreError> {
        let bank_by_id: BTreeMap<_, _> = bank.iter().map(|line| (line.id, line)).collect();
        let ledger_by_id: BTreeMap<_, _> = ledger.iter().map(|entry| (entry.id, entry)).collect();

        let mut outcomes = Vec::with_capacity(report.matches.len());
        for pair in &report.matches {
            let line = bank_by_id.get(&pair.bank_id).ok_or_else(|| {
                CoreError::ReconciliationConflict(format!("unknown bank line {}", pair.bank_id))
            })?;
            let entry = ledger_by_id
                .get(&pair.entry_id)
                .ok_or(CoreError::EntryNotFound(pair.entry_id))?;
            outcomes.push(self.reconcile(accounts, line, entry)?);
        }
        Ok(outcomes)
    }

    /// Forgets the pair holding `entry_id`, e.g. after the entry is reversed.
    /// Balances are not touched.
    pub fn release_entry(&mut self, entry_id: EntryId) -> Option<BankTransactionId> {
        let bank_id = self.by_entry.remove(&entry_id)?;
        self.by_bank.remove(&bank_id);
        self.posted_to.remove(&entry_id);
        Some(bank_id)
    }

    pub fn is_reconciled(&self, bank_id: BankTransactionId) -> bool {
        self.by_bank.contains_key(&bank_id)
    }

    pub fn partner_of_entry(&self, entry_id: EntryId) -> Option<BankTransactionId> {
        self.by_entry.get(&entry_id).copied()
    }

    /// Account the entry's bank line was posted to, if the entry is reconciled.
    pub fn account_of_entry(&self, entry_id: EntryId) -> Option<AccountId> {
        self.posted_to.get(&entry_id).copied()
    }

    pub fn partner_of_bank(&self, bank_id: BankTransactionId) -> Option<EntryId> {
        self.by_bank.get(&bank_id).copied()
    }

    /// Recorded pairs ordered by bank line id.
    pub fn pairs(&self) -> impl Iterator<Item = (BankTransactionId, EntryId)> + '_ {
        self.by_bank.iter().map(|(bank, entry)| (*bank, *entry))
    }

    pub fn len(&self) -> usize {
        self.by_bank.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_bank.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use fleet_domain::{AccountId, BankAccount, BankAccountType, TransactionType};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, d).unwrap()
    }

    fn line(id: u64, account: AccountId, d: u32, kind: TransactionType, amount: i64) -> BankTransaction {
        BankTransaction::new(id, account, day(d), kind, Money::new(amount))
    }

    fn setup() -> (AccountBook, AccountId) {
        let account = BankAccount::new("ICICI", "000411223344", BankAccountType::Current, Money::new(1_000));
        let id = account.id;
        (AccountBook::from_accounts([account]), id)
    }

    #[test]
    fn prefers_closest_date_then_lowest_id() {
        let account = AccountId::new();
        let bank = vec![line(1, account, 10, TransactionType::Credit, 500)];
        let ledger = vec![
            LedgerEntry::credit(7, day(12), Money::new(500)),
            LedgerEntry::credit(4, day(8), Money::new(500)),
            LedgerEntry::credit(9, day(11), Money::new(500)),
        ];
        let report = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].entry_id, EntryId(9));
        assert_eq!(report.matches[0].day_gap, 1);
        assert_eq!(report.unmatched_ledger, vec![EntryId(4), EntryId(7)]);

        let ledger = vec![
            LedgerEntry::credit(7, day(12), Money::new(500)),
            LedgerEntry::credit(4, day(8), Money::new(500)),
        ];
        let report = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        assert_eq!(report.matches[0].entry_id, EntryId(4));
    }

    #[test]
    fn amount_type_and_window_must_agree() {
        let account = AccountId::new();
        let bank = vec![
            line(1, account, 10, TransactionType::Credit, 500),
            line(2, account, 10, TransactionType::Debit, 300),
            line(3, account, 1, TransactionType::Debit, 80),
        ];
        let ledger = vec![
            LedgerEntry::debit(1, day(10), Money::new(500)),
            LedgerEntry::debit(2, day(13), Money::new(300)),
            LedgerEntry::debit(3, day(5), Money::new(80)),
        ];
        let report = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].bank_id, BankTransactionId(2));
        assert_eq!(report.unmatched_bank, vec![BankTransactionId(3), BankTransactionId(1)]);
        assert_eq!(report.unmatched_ledger, vec![EntryId(1), EntryId(3)]);

        let strict = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::new(0));
        assert!(strict.matches.is_empty());
    }

    #[test]
    fn matching_ignores_input_order() {
        let account = AccountId::new();
        let mut bank = vec![
            line(1, account, 3, TransactionType::Credit, 100),
            line(2, account, 4, TransactionType::Credit, 100),
        ];
        let mut ledger = vec![
            LedgerEntry::credit(10, day(4), Money::new(100)),
            LedgerEntry::credit(11, day(3), Money::new(100)),
        ];
        let first = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        bank.reverse();
        ledger.reverse();
        let second = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        assert_eq!(first, second);
        assert!(first.is_fully_matched());
    }

    #[test]
    fn empty_inputs_produce_empty_report() {
        let report = ReconciliationService::match_transactions(&[], &[], MatchPolicy::default());
        assert_eq!(report, ReconciliationReport::default());
    }

    #[test]
    fn reconciling_twice_is_a_noop() {
        let (mut accounts, account) = setup();
        let bank = line(1, account, 10, TransactionType::Credit, 500);
        let entry = LedgerEntry::credit(1, day(10), Money::new(500));
        let mut reconciler = Reconciler::new();

        let first = reconciler.reconcile(&mut accounts, &bank, &entry).unwrap();
        assert_eq!(first, ReconcileOutcome::Reconciled { balance: Money::new(1_500) });
        let second = reconciler.reconcile(&mut accounts, &bank, &entry).unwrap();
        assert_eq!(second, ReconcileOutcome::AlreadyReconciled);
        assert_eq!(accounts.balance(account).unwrap(), Money::new(1_500));

        let err = reconciler.try_reconcile(&mut accounts, &bank, &entry).unwrap_err();
        assert!(err.is_benign());
        assert!(matches!(err, CoreError::DuplicateReconciliation { .. }));
    }

    #[test]
    fn conflicting_partner_is_rejected() {
        let (mut accounts, account) = setup();
        let bank = line(1, account, 10, TransactionType::Credit, 500);
        let entry = LedgerEntry::credit(1, day(10), Money::new(500));
        let other = LedgerEntry::credit(2, day(10), Money::new(500));
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&mut accounts, &bank, &entry).unwrap();

        let err = reconciler.reconcile(&mut accounts, &bank, &other).unwrap_err();
        assert!(matches!(err, CoreError::ReconciliationConflict(_)));
        assert_eq!(reconciler.partner_of_bank(bank.id), Some(EntryId(1)));
        assert_eq!(reconciler.account_of_entry(EntryId(1)), Some(account));
        assert_eq!(reconciler.account_of_entry(EntryId(2)), None);
        assert_eq!(accounts.balance(account).unwrap(), Money::new(1_500));

        assert_eq!(reconciler.release_entry(EntryId(1)), Some(bank.id));
        assert!(!reconciler.is_reconciled(bank.id));
        assert_eq!(reconciler.account_of_entry(EntryId(1)), None);
        assert_eq!(reconciler.release_entry(EntryId(1)), None);
    }

    #[test]
    fn missing_account_or_mismatch_records_nothing() {
        let (mut accounts, account) = setup();
        let mut reconciler = Reconciler::new();

        let orphan = line(1, AccountId::new(), 10, TransactionType::Debit, 50);
        let entry = LedgerEntry::debit(1, day(10), Money::new(50));
        let err = reconciler.reconcile(&mut accounts, &orphan, &entry).unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(_)));
        assert!(reconciler.is_empty());

        let mismatched = line(2, account, 10, TransactionType::Debit, 60);
        let err = reconciler.reconcile(&mut accounts, &mismatched, &entry).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount(_)));
        assert!(!reconciler.is_reconciled(mismatched.id));
    }

    #[test]
    fn applying_a_report_twice_keeps_state() {
        let (mut accounts, account) = setup();
        let bank = vec![
            line(1, account, 2, TransactionType::Credit, 400),
            line(2, account, 5, TransactionType::Debit, 150),
        ];
        let ledger = vec![
            LedgerEntry::credit(1, day(3), Money::new(400)),
            LedgerEntry::debit(2, day(5), Money::new(150)),
        ];
        let report = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        let mut reconciler = Reconciler::new();

        reconciler.apply_report(&mut accounts, &report, &bank, &ledger).unwrap();
        let pairs: Vec<_> = reconciler.pairs().collect();
        let balance = accounts.balance(account).unwrap();
        assert_eq!(balance, Money::new(1_250));

        let outcomes = reconciler.apply_report(&mut accounts, &report, &bank, &ledger).unwrap();
        assert!(outcomes.iter().all(|o| *o == ReconcileOutcome::AlreadyReconciled));
        assert_eq!(reconciler.pairs().collect::<Vec<_>>(), pairs);
        assert_eq!(accounts.balance(account).unwrap(), balance);
    }

    #[test]
    fn failed_report_rolls_back() {
        let (mut accounts, account) = setup();
        let bank = vec![
            line(1, account, 2, TransactionType::Credit, 400),
            line(2, AccountId::new(), 5, TransactionType::Debit, 150),
        ];
        let ledger = vec![
            LedgerEntry::credit(1, day(2), Money::new(400)),
            LedgerEntry::debit(2, day(5), Money::new(150)),
        ];
        let report = ReconciliationService::match_transactions(&bank, &ledger, MatchPolicy::default());
        assert_eq!(report.matches.len(), 2);

        let mut reconciler = Reconciler::new();
        let err = reconciler.apply_report(&mut accounts, &report, &bank, &ledger).unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(_)));
        assert!(reconciler.is_empty());
        assert_eq!(accounts.balance(account).unwrap(), Money::new(1_000));
    }
}
