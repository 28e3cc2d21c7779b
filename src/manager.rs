use chrono::NaiveDate;
use fleet_core::{
    Accumulation, AccountBook, BalanceService, CloseOutcome, CoreError, Daybook, EntryEdit,
    LedgerSource, PostingChange, ReconciliationReport, ReconciliationService, Reconciler,
    SettlementInput, SettlementService, SnapshotStore, SummaryExporter,
};
use fleet_domain::{
    AccountId, BankTransaction, DeductionRate, EntryId, LedgerEntry, Money, PayBasis, PayeeId,
    PayeeSettlement, Period, PeriodKey,
};
use tracing::{debug, info, warn};

use crate::{FleetError, Session};

/// Facade that runs one bank account's month: fetch entries, keep balances,
/// reconcile against the statement, close the period and settle payees.
pub struct DaybookManager {
    session: Session,
    account: AccountId,
    source: Box<dyn LedgerSource>,
    store: Box<dyn SnapshotStore>,
    daybook: Daybook,
    accounts: AccountBook,
    reconciler: Reconciler,
}

impl DaybookManager {
    /// Builds a manager for `account`, loading the account list from `source`.
    pub fn new(
        session: Session,
        account: AccountId,
        source: Box<dyn LedgerSource>,
        store: Box<dyn SnapshotStore>,
    ) -> Result<Self, FleetError> {
        let accounts = AccountBook::from_accounts(source.fetch_accounts()?);
        accounts.balance(account)?;
        Ok(Self {
            session,
            account,
            source,
            store,
            daybook: Daybook::new(),
            accounts,
            reconciler: Reconciler::new(),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn account_id(&self) -> AccountId {
        self.account
    }

    pub fn daybook(&self) -> &Daybook {
        &self.daybook
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn store(&self) -> &dyn SnapshotStore {
        self.store.as_ref()
    }

    pub fn balance(&self) -> Result<Money, FleetError> {
        Ok(self.accounts.balance(self.account)?)
    }

    /// Opens `key` and posts the account's entries for that month. The
    /// opening balance comes from the stored snapshot of `key`, else the
    /// stored closing of the previous month, else zero. A month already open
    /// in memory, such as the one a close carried into, keeps its opening
    /// and only receives entries it does not hold yet.
    pub fn load_period(&mut self, key: PeriodKey) -> Result<Accumulation, FleetError> {
        let (from, to) = month_bounds(key)?;
        let entries = self.source.fetch_entries(Some(self.account), from, to)?;

        let mut staged = self.daybook.clone();
        match staged.period(key).map(|period| period.is_closed()) {
            Some(true) => return Err(CoreError::PeriodAlreadyClosed(key).into()),
            Some(false) => debug!(period = %key, "period already open, merging entries"),
            None => {
                let opening = self.stored_opening(key)?;
                staged.open_period(key, opening)?;
            }
        }
        for entry in entries {
            if staged.entry(entry.id).is_some() {
                continue;
            }
            staged.post(entry)?;
        }
        self.daybook = staged;

        let summary = self.daybook.summary(key)?;
        info!(
            account = %self.account,
            period = %key,
            entries = summary.entries.len(),
            opening = %summary.period.opening_balance,
            closing = %summary.closing_balance(),
            "loaded period"
        );
        Ok(summary)
    }

    pub fn post_entry(&mut self, entry: LedgerEntry) -> Result<Period, FleetError> {
        let id = entry.id;
        let period = self.daybook.post(entry)?.clone();
        debug!(entry = %id, period = %period.key, closing = %period.closing_balance, "posted entry");
        Ok(period)
    }

    /// Edits an entry. If it was already reconciled the account balance is
    /// moved by the edit delta.
    pub fn edit_entry(&mut self, id: EntryId, edit: EntryEdit) -> Result<PostingChange, FleetError> {
        let posted_to = self.posted_account(id)?;
        if let Some(account) = posted_to {
            self.accounts.balance(account)?;
        }
        let change = self.daybook.edit(id, edit)?;
        if let Some(account) = posted_to {
            let balance = self.accounts.apply_edit(account, &change)?;
            info!(entry = %id, account = %account, balance = %balance, "adjusted balance for edited entry");
        }
        Ok(change)
    }

    /// Removes an entry. A reconciled entry is un-posted from the account and
    /// its bank line becomes unmatched again.
    pub fn reverse_entry(&mut self, id: EntryId) -> Result<LedgerEntry, FleetError> {
        let posted_to = self.posted_account(id)?;
        if let Some(account) = posted_to {
            self.accounts.balance(account)?;
        }
        let removed = self.daybook.reverse(id)?;
        if let Some(account) = posted_to {
            self.accounts.reverse(account, removed.kind, removed.amount)?;
            self.reconciler.release_entry(id);
            info!(entry = %id, account = %account, "reversed reconciled entry");
        }
        Ok(removed)
    }

    /// Matches the month's statement against its entries and records the
    /// pairs. Only lines and entries not reconciled yet take part.
    pub fn reconcile(&mut self, key: PeriodKey) -> Result<ReconciliationReport, FleetError> {
        let (from, to) = month_bounds(key)?;
        let statement: Vec<BankTransaction> = self
            .source
            .fetch_statement(self.account, from, to)?
            .into_iter()
            .filter(|line| !self.reconciler.is_reconciled(line.id))
            .collect();
        let entries: Vec<LedgerEntry> = self
            .daybook
            .entries(key)
            .iter()
            .filter(|entry| self.reconciler.partner_of_entry(entry.id).is_none())
            .cloned()
            .collect();

        let report = ReconciliationService::match_transactions(
            &statement,
            &entries,
            self.session.match_policy(),
        );
        self.reconciler
            .apply_report(&mut self.accounts, &report, &statement, &entries)?;

        if !report.unmatched_bank.is_empty() {
            warn!(
                period = %key,
                unmatched = report.unmatched_bank.len(),
                "bank lines without a daybook entry"
            );
        }
        info!(
            account = %self.account,
            period = %key,
            matched = report.matches.len(),
            unmatched_ledger = report.unmatched_ledger.len(),
            balance = %self.accounts.balance(self.account)?,
            "reconciled statement"
        );
        Ok(report)
    }

    /// Closes `key`, persisting the opened next period and then the closed
    /// one. Nothing changes in memory if persisting fails, and `key` is only
    /// stored as closed once everything else is written.
    pub fn close_period(&mut self, key: PeriodKey) -> Result<CloseOutcome, FleetError> {
        let mut staged = self.daybook.clone();
        let outcome = staged.close(key, self.session.clock())?;
        self.store.save_period(self.account, &outcome.next)?;
        self.store.save_period(self.account, &outcome.closed)?;
        self.daybook = staged;
        info!(
            account = %self.account,
            period = %key,
            closing = %outcome.closed.closing_balance,
            next = %outcome.next.key,
            "closed period"
        );
        Ok(outcome)
    }

    /// Settles `payee` for `period`, netting out advances booked in the
    /// daybook, and stores the snapshot. `deductions` defaults to the
    /// configured ones.
    pub fn settle(
        &mut self,
        payee: PayeeId,
        period: PeriodKey,
        basis: PayBasis,
        deductions: Option<Vec<DeductionRate>>,
    ) -> Result<PayeeSettlement, FleetError> {
        let rates = deductions.unwrap_or_else(|| self.session.default_deductions().to_vec());
        let advance =
            SettlementService::advance_total(self.daybook.entries(period), payee, period);
        let input = SettlementInput::new(payee, period, basis)
            .with_deductions(rates)
            .with_advance(advance);

        let breakdown =
            SettlementService::calculate_with_package_days(&input, self.session.package_days())?;
        if breakdown.owes_back() {
            warn!(payee = %payee, period = %period, net = %breakdown.net, "payee owes money back");
        }
        let snapshot = SettlementService::snapshot(breakdown, self.session.clock());
        let info = self.store.save_settlement(&snapshot)?;
        info!(
            payee = %payee,
            period = %period,
            net = %snapshot.net_amount(),
            path = %info.path.display(),
            "stored settlement"
        );
        Ok(snapshot)
    }

    pub fn settlement_history(&self, payee: PayeeId) -> Result<Vec<PayeeSettlement>, FleetError> {
        Ok(self.store.list_settlements(payee)?)
    }

    /// Plain-text summary of a period with per-head totals.
    pub fn export_period(&self, key: PeriodKey) -> Result<String, FleetError> {
        let summary = self.daybook.summary(key)?;
        let heads = BalanceService::head_totals(&summary.entries);
        Ok(self.session.exporter().export_period(&summary, &heads)?)
    }

    fn stored_opening(&self, key: PeriodKey) -> Result<Money, FleetError> {
        match self.store.load_period(self.account, key) {
            Ok(period) if period.is_closed() => {
                return Err(CoreError::PeriodAlreadyClosed(key).into())
            }
            Ok(period) => return Ok(period.opening_balance),
            Err(CoreError::PeriodNotFound(_)) => {}
            Err(err) => return Err(err.into()),
        }
        match self.store.load_period(self.account, key.previous()) {
            Ok(previous) if previous.is_closed() => Ok(previous.closing_balance),
            Ok(_) | Err(CoreError::PeriodNotFound(_)) => Ok(Money::ZERO),
            Err(err) => Err(err.into()),
        }
    }

    /// The account an entry's bank line was posted to, if it was reconciled.
    fn posted_account(&self, id: EntryId) -> Result<Option<AccountId>, FleetError> {
        self.daybook.entry(id).ok_or(CoreError::EntryNotFound(id))?;
        Ok(self.reconciler.account_of_entry(id))
    }
}

fn month_bounds(key: PeriodKey) -> Result<(NaiveDate, NaiveDate), CoreError> {
    match (key.first_day(), key.last_day()) {
        (Some(first), Some(last)) => Ok((first, last)),
        _ => Err(CoreError::PeriodNotFound(key)),
    }
}
