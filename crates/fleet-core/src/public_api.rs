//! Stable, public-facing helpers that wrap the internal service layer.
//!
//! Frontends that collect raw user input (amount strings, dates) can call
//! these without depending on the entire service surface area.

use chrono::NaiveDate;

use fleet_domain::{
    BankTransaction, EntryId, LedgerEntry, Money, PayBasis, PayeeId, PeriodKey,
    SettlementBreakdown, TransactionType,
};

use crate::{
    adjustment_service::AccountBook,
    balance_service::BalanceService,
    period_service::{Daybook, EntryEdit},
    reconciliation_service::{MatchPolicy, ReconciliationReport, ReconciliationService, Reconciler},
    settlement_service::{SettlementInput, SettlementService},
    time::Clock,
    CoreError,
};

/// Summarized totals for one period.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiPeriodSummary {
    pub period: PeriodKey,
    pub opening_balance: Money,
    pub total_credits: Money,
    pub total_debits: Money,
    pub closing_balance: Money,
    pub entry_count: usize,
    pub closed: bool,
}

/// Posts an entry whose amount is given as user text, e.g. `"1250.50"`.
pub fn api_post_entry(
    daybook: &mut Daybook,
    id: u64,
    date: NaiveDate,
    kind: TransactionType,
    amount: &str,
) -> Result<EntryId, CoreError> {
    let amount = Money::parse(amount)?;
    daybook.post(LedgerEntry::new(EntryId(id), date, kind, amount))?;
    Ok(EntryId(id))
}

/// Edits an entry. If the entry is reconciled, the balance of the account
/// its bank line was posted to moves by the edit delta; otherwise only the
/// daybook changes.
pub fn api_edit_entry(
    daybook: &mut Daybook,
    accounts: &mut AccountBook,
    reconciler: &Reconciler,
    id: EntryId,
    edit: EntryEdit,
) -> Result<Option<Money>, CoreError> {
    daybook.entry(id).ok_or(CoreError::EntryNotFound(id))?;
    let posted_to = reconciler.account_of_entry(id);
    if let Some(account) = posted_to {
        accounts.balance(account)?;
    }
    let change = daybook.edit(id, edit)?;
    match posted_to {
        Some(account) => accounts.apply_edit(account, &change).map(Some),
        None => Ok(None),
    }
}

pub fn api_period_summary(daybook: &Daybook, key: PeriodKey) -> Result<ApiPeriodSummary, CoreError> {
    let summary = daybook.summary(key)?;
    let period = summary.period;
    Ok(ApiPeriodSummary {
        period: key,
        opening_balance: period.opening_balance,
        total_credits: period.total_credits,
        total_debits: period.total_debits,
        closing_balance: period.closing_balance,
        entry_count: summary.entries.len(),
        closed: period.is_closed(),
    })
}

/// Closes a period and returns the opening balance carried into the next one.
pub fn api_close_period(
    daybook: &mut Daybook,
    key: PeriodKey,
    clock: &dyn Clock,
) -> Result<Money, CoreError> {
    daybook.close(key, clock).map(|outcome| outcome.next.opening_balance)
}

/// Matches a statement against the daybook and records every proposed pair.
pub fn api_reconcile_statement(
    reconciler: &mut Reconciler,
    accounts: &mut AccountBook,
    statement: &[BankTransaction],
    entries: &[LedgerEntry],
    tolerance_days: u32,
) -> Result<ReconciliationReport, CoreError> {
    let report = ReconciliationService::match_transactions(
        statement,
        entries,
        MatchPolicy::new(tolerance_days),
    );
    reconciler.apply_report(accounts, &report, statement, entries)?;
    Ok(report)
}

/// Settles a per-trip payee, netting out advances recorded in `entries`.
pub fn api_settle_trips(
    payee: PayeeId,
    period: PeriodKey,
    rate: &str,
    trips: u32,
    entries: &[LedgerEntry],
) -> Result<SettlementBreakdown, CoreError> {
    let basis = PayBasis::PerTrip {
        rate: Money::parse(rate)?,
        trips,
    };
    let advance = SettlementService::advance_total(entries, payee, period);
    SettlementService::calculate(&SettlementInput::new(payee, period, basis).with_advance(advance))
}

/// Closing balance of arbitrary entries from a single month.
pub fn api_closing_balance(opening: Money, entries: &[LedgerEntry]) -> Result<Money, CoreError> {
    Ok(BalanceService::summarize(opening, entries)?
        .map(|accumulation| accumulation.closing_balance())
        .unwrap_or(opening))
}
