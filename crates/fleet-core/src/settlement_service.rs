//! Payroll settlement: gross pay, percentage deductions and advances.

use fleet_domain::{
    Deduction, DeductionRate, DocumentKind, LedgerEntry, Money, PayBasis, PayeeId,
    PayeeSettlement, PeriodKey, SettlementBreakdown, TransactionType,
};
use rust_decimal::Decimal;

use crate::{time::Clock, CoreError};

/// Days in the notional month used to prorate package pay.
pub const DEFAULT_PACKAGE_DAYS: u32 = 30;

/// Everything needed to settle one payee for one period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementInput {
    pub payee_id: PayeeId,
    pub period: PeriodKey,
    pub basis: PayBasis,
    pub deductions: Vec<DeductionRate>,
    pub advance: Money,
}

impl SettlementInput {
    pub fn new(payee_id: PayeeId, period: PeriodKey, basis: PayBasis) -> Self {
        Self {
            payee_id,
            period,
            basis,
            deductions: Vec::new(),
            advance: Money::ZERO,
        }
    }

    pub fn with_deduction(mut self, label: impl Into<String>, rate_percent: Decimal) -> Self {
        self.deductions.push(DeductionRate::new(label, rate_percent));
        self
    }

    pub fn with_deductions(mut self, rates: impl IntoIterator<Item = DeductionRate>) -> Self {
        self.deductions.extend(rates);
        self
    }

    pub fn with_advance(mut self, advance: Money) -> Self {
        self.advance = advance;
        self
    }
}

pub struct SettlementService;

impl SettlementService {
    /// Computes a settlement using a 30-day package month.
    pub fn calculate(input: &SettlementInput) -> Result<SettlementBreakdown, CoreError> {
        Self::calculate_with_package_days(input, DEFAULT_PACKAGE_DAYS)
    }

    /// Computes `net = gross − Σ deductions − advance`. Every deduction is
    /// taken off gross independently. Net may be negative.
    pub fn calculate_with_package_days(
        input: &SettlementInput,
        package_days: u32,
    ) -> Result<SettlementBreakdown, CoreError> {
        if input.advance.is_negative() {
            return Err(CoreError::InvalidAmount(format!(
                "advance must not be negative, got {}",
                input.advance
            )));
        }
        let gross = Self::gross(&input.basis, package_days)?;

        let mut deductions = Vec::with_capacity(input.deductions.len());
        for rate in &input.deductions {
            if rate.rate_percent.is_sign_negative() {
                return Err(CoreError::InvalidAmount(format!(
                    "deduction `{}` has a negative rate {}%",
                    rate.label, rate.rate_percent
                )));
            }
            deductions.push(Deduction {
                label: rate.label.clone(),
                rate_percent: rate.rate_percent,
                amount: gross.percent(rate.rate_percent)?,
            });
        }
        let total_deductions = deductions
            .iter()
            .try_fold(Money::ZERO, |total, d| total.checked_add(d.amount))
            .ok_or_else(|| CoreError::InvalidAmount("deductions overflow".to_string()))?;
        let net = gross
            .checked_sub(total_deductions)
            .and_then(|net| net.checked_sub(input.advance))
            .ok_or_else(|| CoreError::InvalidAmount("net pay overflows".to_string()))?;

        Ok(SettlementBreakdown {
            payee_id: input.payee_id,
            period: input.period,
            basis: input.basis.clone(),
            gross,
            deductions,
            total_deductions,
            advance: input.advance,
            net,
        })
    }

    /// Gross pay for a basis.
    pub fn gross(basis: &PayBasis, package_days: u32) -> Result<Money, CoreError> {
        match basis {
            PayBasis::PerTrip { rate, trips } => {
                if rate.is_negative() {
                    return Err(CoreError::InvalidAmount(format!(
                        "trip rate must not be negative, got {rate}"
                    )));
                }
                Ok(rate.times(*trips)?)
            }
            PayBasis::Package {
                monthly_rate,
                working_days,
            } => {
                if monthly_rate.is_negative() {
                    return Err(CoreError::InvalidAmount(format!(
                        "monthly rate must not be negative, got {monthly_rate}"
                    )));
                }
                Ok(monthly_rate.mul_ratio(*working_days, package_days)?)
            }
        }
    }

    /// Sum of advances already paid to `payee` within `period`: debit entries
    /// linked to an advance document.
    pub fn advance_total(entries: &[LedgerEntry], payee: PayeeId, period: PeriodKey) -> Money {
        entries
            .iter()
            .filter(|entry| entry.payee_id == Some(payee))
            .filter(|entry| period.contains(entry.date))
            .filter(|entry| entry.kind == TransactionType::Debit)
            .filter(|entry| entry.is_linked_to(DocumentKind::Advance))
            .map(|entry| entry.amount)
            .sum()
    }

    /// Freezes a breakdown into a historical record.
    pub fn snapshot(breakdown: SettlementBreakdown, clock: &dyn Clock) -> PayeeSettlement {
        PayeeSettlement::new(breakdown, clock.now())
    }
}
