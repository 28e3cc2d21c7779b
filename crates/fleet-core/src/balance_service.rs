//! Folds daybook entries into period totals and running balances.

use std::collections::BTreeMap;

use fleet_domain::{EntryId, HeadTotals, LedgerEntry, Money, Period, PeriodKey, TransactionType};

use crate::CoreError;

/// Period summary plus the entries annotated with their running balance, in
/// posting order.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation {
    pub period: Period,
    pub entries: Vec<LedgerEntry>,
}

impl Accumulation {
    pub fn closing_balance(&self) -> Money {
        self.period.closing_balance
    }
}

pub struct BalanceService;

impl BalanceService {
    /// Computes totals and running balances for `entries`, all of which must
    /// fall inside `period`.
    ///
    /// Entries are ordered by date; entries sharing a date keep their input
    /// order. The inputs are not modified.
    pub fn accumulate(
        period: PeriodKey,
        opening_balance: Money,
        entries: &[LedgerEntry],
    ) -> Result<Accumulation, CoreError> {
        for entry in entries {
            Self::validate(period, entry)?;
        }

        let mut ordered = entries.to_vec();
        ordered.sort_by_key(|entry| entry.date);

        let mut running = opening_balance;
        let mut total_credits = Money::ZERO;
        let mut total_debits = Money::ZERO;
        for entry in &mut ordered {
            match entry.kind {
                TransactionType::Credit => {
                    total_credits = total_credits
                        .checked_add(entry.amount)
                        .ok_or_else(|| overflow(period, entry.id))?;
                    running = running
                        .checked_add(entry.amount)
                        .ok_or_else(|| overflow(period, entry.id))?;
                }
                TransactionType::Debit => {
                    total_debits = total_debits
                        .checked_add(entry.amount)
                        .ok_or_else(|| overflow(period, entry.id))?;
                    running = running
                        .checked_sub(entry.amount)
                        .ok_or_else(|| overflow(period, entry.id))?;
                }
            }
            entry.running_balance = Some(running);
        }
        debug_assert_eq!(total_credits - total_debits, running - opening_balance);

        let mut summary = Period::opened(period, opening_balance);
        summary.total_credits = total_credits;
        summary.total_debits = total_debits;
        summary.closing_balance = running;
        Ok(Accumulation {
            period: summary,
            entries: ordered,
        })
    }

    /// Accumulates entries whose period is inferred from the earliest entry.
    /// Returns `None` for an empty slice.
    pub fn summarize(
        opening_balance: Money,
        entries: &[LedgerEntry],
    ) -> Result<Option<Accumulation>, CoreError> {
        let Some(first) = entries.iter().min_by_key(|entry| entry.date) else {
            return Ok(None);
        };
        Self::accumulate(PeriodKey::of(first.date), opening_balance, entries).map(Some)
    }

    /// Credit and debit totals per account head, sorted by head name.
    pub fn head_totals(entries: &[LedgerEntry]) -> Vec<HeadTotals> {
        let mut heads: BTreeMap<&str, HeadTotals> = BTreeMap::new();
        for entry in entries {
            let totals = heads
                .entry(entry.account_head.as_str())
                .or_insert_with(|| HeadTotals {
                    account_head: entry.account_head.clone(),
                    credits: Money::ZERO,
                    debits: Money::ZERO,
                    entry_count: 0,
                });
            match entry.kind {
                TransactionType::Credit => totals.credits += entry.amount,
                TransactionType::Debit => totals.debits += entry.amount,
            }
            totals.entry_count += 1;
        }
        heads.into_values().collect()
    }

    fn validate(period: PeriodKey, entry: &LedgerEntry) -> Result<(), CoreError> {
        let found = PeriodKey::of(entry.date);
        if found != period {
            return Err(CoreError::CrossPeriodEntries {
                expected: period,
                found,
                entry: entry.id,
            });
        }
        ensure_positive(entry.amount, &format!("entry {}", entry.id))
    }
}

fn overflow(period: PeriodKey, entry: EntryId) -> CoreError {
    CoreError::InvalidAmount(format!(
        "balance of {period} leaves the amount range at entry {entry}"
    ))
}

/// Rejects zero and negative amounts.
pub(crate) fn ensure_positive(amount: Money, what: &str) -> Result<(), CoreError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(CoreError::InvalidAmount(format!(
            "{what} must be greater than zero, got {amount}"
        )))
    }
}
