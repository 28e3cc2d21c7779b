//! Daybook bookkeeping and the monthly period lifecycle (`Open → Closed`).

use std::collections::BTreeMap;

use chrono::NaiveDate;
use fleet_domain::{
    EntryId, LedgerEntry, Money, Period, PeriodKey, PeriodStatus, TransactionType,
};

use crate::{
    adjustment_service::PostingChange,
    balance_service::{ensure_positive, Accumulation, BalanceService},
    time::Clock,
    CoreError,
};

/// Requested change to a posted entry. Only amount and type are editable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryEdit {
    pub amount: Option<Money>,
    pub kind: Option<TransactionType>,
}

impl EntryEdit {
    pub fn amount(amount: Money) -> Self {
        Self {
            amount: Some(amount),
            kind: None,
        }
    }

    pub fn kind(kind: TransactionType) -> Self {
        Self {
            amount: None,
            kind: Some(kind),
        }
    }

    pub fn with_amount(mut self, amount: Money) -> Self {
        self.amount = Some(amount);
        self
    }
}

/// Result of closing a period: the locked period and the period opened with
/// its carried-forward balance.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseOutcome {
    pub closed: Period,
    pub next: Period,
}

#[derive(Debug, Clone)]
struct PeriodState {
    period: Period,
    entries: Vec<LedgerEntry>,
}

impl PeriodState {
    fn refresh(&mut self) -> Result<(), CoreError> {
        let accumulation = BalanceService::accumulate(
            self.period.key,
            self.period.opening_balance,
            &self.entries,
        )?;
        self.period.total_credits = accumulation.period.total_credits;
        self.period.total_debits = accumulation.period.total_debits;
        self.period.closing_balance = accumulation.period.closing_balance;
        Ok(())
    }
}

/// In-memory daybook for one account, organised by calendar month.
#[derive(Debug, Clone, Default)]
pub struct Daybook {
    periods: BTreeMap<PeriodKey, PeriodState>,
}

impl Daybook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens `key` explicitly with the given opening balance.
    pub fn open_period(&mut self, key: PeriodKey, opening_balance: Money) -> Result<&Period, CoreError> {
        if let Some(existing) = self.periods.get(&key) {
            return Err(if existing.period.is_closed() {
                CoreError::PeriodAlreadyClosed(key)
            } else {
                CoreError::PeriodAlreadyOpen(key)
            });
        }
        self.ensure_no_later_closed(key)?;
        self.periods.insert(
            key,
            PeriodState {
                period: Period::opened(key, opening_balance),
                entries: Vec::new(),
            },
        );
        self.carry_forward(key)?;
        self.period(key).ok_or(CoreError::PeriodNotFound(key))
    }

    /// Records a new entry, opening its month on first use with the closing
    /// balance of the nearest earlier period (zero if none). Open months
    /// directly after it pick up the new closing balance.
    pub fn post(&mut self, entry: LedgerEntry) -> Result<&Period, CoreError> {
        ensure_positive(entry.amount, &format!("entry {}", entry.id))?;
        if self.locate(entry.id).is_some() {
            return Err(CoreError::DuplicateEntry(entry.id));
        }
        let key = PeriodKey::of(entry.date);
        match self.periods.get(&key) {
            Some(state) if state.period.is_closed() => {
                return Err(CoreError::PeriodAlreadyClosed(key))
            }
            Some(_) => {}
            None => {
                self.ensure_no_later_closed(key)?;
                let opening = self.carried_balance(key);
                self.periods.insert(
                    key,
                    PeriodState {
                        period: Period::opened(key, opening),
                        entries: Vec::new(),
                    },
                );
            }
        }

        let state = self
            .periods
            .get_mut(&key)
            .ok_or(CoreError::PeriodNotFound(key))?;
        state.entries.push(entry);
        if let Err(err) = state.refresh() {
            state.entries.pop();
            return Err(err);
        }
        self.carry_forward(key)?;
        self.period(key).ok_or(CoreError::PeriodNotFound(key))
    }

    /// Changes amount and/or type of an entry in an open period and returns
    /// the before/after view used to adjust the bank balance.
    pub fn edit(&mut self, id: EntryId, edit: EntryEdit) -> Result<PostingChange, CoreError> {
        let key = self.locate(id).ok_or(CoreError::EntryNotFound(id))?;
        if let Some(amount) = edit.amount {
            ensure_positive(amount, &format!("entry {id}"))?;
        }
        let state = self
            .periods
            .get_mut(&key)
            .ok_or(CoreError::PeriodNotFound(key))?;
        if state.period.is_closed() {
            return Err(CoreError::PeriodAlreadyClosed(key));
        }
        let entry = state
            .entries
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or(CoreError::EntryNotFound(id))?;
        let change = PostingChange {
            entry_id: id,
            account_id: entry.account_id,
            old_kind: entry.kind,
            old_amount: entry.amount,
            new_kind: edit.kind.unwrap_or(entry.kind),
            new_amount: edit.amount.unwrap_or(entry.amount),
        };
        entry.kind = change.new_kind;
        entry.amount = change.new_amount;
        state.refresh()?;
        self.carry_forward(key)?;
        Ok(change)
    }

    /// Removes an entry from an open period.
    pub fn reverse(&mut self, id: EntryId) -> Result<LedgerEntry, CoreError> {
        let key = self.locate(id).ok_or(CoreError::EntryNotFound(id))?;
        let state = self
            .periods
            .get_mut(&key)
            .ok_or(CoreError::PeriodNotFound(key))?;
        if state.period.is_closed() {
            return Err(CoreError::PeriodAlreadyClosed(key));
        }
        let position = state
            .entries
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(CoreError::EntryNotFound(id))?;
        let removed = state.entries.remove(position);
        state.refresh()?;
        self.carry_forward(key)?;
        Ok(removed)
    }

    /// Locks `key` and opens the following month with the carried-forward
    /// closing balance. Earlier periods must already be closed.
    pub fn close(&mut self, key: PeriodKey, clock: &dyn Clock) -> Result<CloseOutcome, CoreError> {
        let state = self.periods.get(&key).ok_or(CoreError::PeriodNotFound(key))?;
        if state.period.is_closed() {
            return Err(CoreError::PeriodAlreadyClosed(key));
        }
        if let Some(earlier) = self
            .periods
            .range(..key)
            .find(|(_, state)| !state.period.is_closed())
            .map(|(earlier, _)| *earlier)
        {
            return Err(CoreError::EarlierPeriodOpen(earlier));
        }

        let next_key = key.next();
        if self
            .periods
            .get(&next_key)
            .is_some_and(|next| next.period.is_closed())
        {
            return Err(CoreError::PeriodAlreadyClosed(next_key));
        }

        let state = self
            .periods
            .get_mut(&key)
            .ok_or(CoreError::PeriodNotFound(key))?;
        state.period.status = PeriodStatus::Closed;
        state.period.closed_at = Some(clock.now());
        let closed = state.period.clone();

        let next = self.periods.entry(next_key).or_insert_with(|| PeriodState {
            period: Period::opened(next_key, closed.closing_balance),
            entries: Vec::new(),
        });
        next.period.opening_balance = closed.closing_balance;
        next.refresh()?;
        Ok(CloseOutcome {
            closed,
            next: next.period.clone(),
        })
    }

    pub fn period(&self, key: PeriodKey) -> Option<&Period> {
        self.periods.get(&key).map(|state| &state.period)
    }

    pub fn periods(&self) -> impl Iterator<Item = &Period> {
        self.periods.values().map(|state| &state.period)
    }

    /// Entries of a period in posting order.
    pub fn entries(&self, key: PeriodKey) -> &[LedgerEntry] {
        self.periods
            .get(&key)
            .map(|state| state.entries.as_slice())
            .unwrap_or(&[])
    }

    pub fn entry(&self, id: EntryId) -> Option<&LedgerEntry> {
        let key = self.locate(id)?;
        self.entries(key).iter().find(|entry| entry.id == id)
    }

    /// Entries dated within `[from, to]`, across periods.
    pub fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&LedgerEntry> {
        self.periods
            .range(PeriodKey::of(from)..=PeriodKey::of(to))
            .flat_map(|(_, state)| state.entries.iter())
            .filter(|entry| entry.date >= from && entry.date <= to)
            .collect()
    }

    /// Running balances and totals for a period.
    pub fn summary(&self, key: PeriodKey) -> Result<Accumulation, CoreError> {
        let state = self.periods.get(&key).ok_or(CoreError::PeriodNotFound(key))?;
        let mut accumulation =
            BalanceService::accumulate(key, state.period.opening_balance, &state.entries)?;
        accumulation.period.status = state.period.status;
        accumulation.period.closed_at = state.period.closed_at;
        Ok(accumulation)
    }

    fn locate(&self, id: EntryId) -> Option<PeriodKey> {
        self.periods
            .iter()
            .find(|(_, state)| state.entries.iter().any(|entry| entry.id == id))
            .map(|(key, _)| *key)
    }

    fn carried_balance(&self, key: PeriodKey) -> Money {
        self.periods
            .range(..key)
            .next_back()
            .map(|(_, state)| state.period.closing_balance)
            .unwrap_or(Money::ZERO)
    }

    /// Re-opens each open month that directly follows `key` with its
    /// predecessor's closing balance. Stops at the first gap or closed month.
    fn carry_forward(&mut self, key: PeriodKey) -> Result<(), CoreError> {
        let Some(mut carried) = self.period(key).map(|period| period.closing_balance) else {
            return Ok(());
        };
        let mut next_key = key.next();
        while let Some(state) = self.periods.get_mut(&next_key) {
            if state.period.is_closed() {
                break;
            }
            state.period.opening_balance = carried;
            state.refresh()?;
            carried = state.period.closing_balance;
            next_key = next_key.next();
        }
        Ok(())
    }

    fn ensure_no_later_closed(&self, key: PeriodKey) -> Result<(), CoreError> {
        let later_closed = self
            .periods
            .range(key..)
            .filter(|(_, state)| state.period.is_closed())
            .map(|(later, _)| *later)
            .last();
        match later_closed {
            Some(later) => Err(CoreError::PeriodAlreadyClosed(later)),
            None => Ok(()),
        }
    }
}
