//! Payroll and car-payment settlement records.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{common::*, money::Money, period::PeriodKey};

/// How gross pay is earned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum PayBasis {
    /// Paid per completed trip.
    PerTrip { rate: Money, trips: u32 },
    /// Fixed monthly package prorated by working days.
    Package { monthly_rate: Money, working_days: u32 },
}

impl fmt::Display for PayBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayBasis::PerTrip { rate, trips } => write!(f, "{trips} trip(s) @ {rate}"),
            PayBasis::Package {
                monthly_rate,
                working_days,
            } => write!(f, "{working_days} day(s) of {monthly_rate}/month"),
        }
    }
}

/// A named percentage deduction such as TDS or a penalty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionRate {
    pub label: String,
    pub rate_percent: Decimal,
}

impl DeductionRate {
    pub fn new(label: impl Into<String>, rate_percent: Decimal) -> Self {
        Self {
            label: label.into(),
            rate_percent,
        }
    }
}

/// A deduction rate together with the amount it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deduction {
    pub label: String,
    pub rate_percent: Decimal,
    pub amount: Money,
}

/// Result of one settlement calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementBreakdown {
    pub payee_id: PayeeId,
    pub period: PeriodKey,
    pub basis: PayBasis,
    pub gross: Money,
    pub deductions: Vec<Deduction>,
    pub total_deductions: Money,
    pub advance: Money,
    /// May be negative when the payee owes money back.
    pub net: Money,
}

impl SettlementBreakdown {
    pub fn owes_back(&self) -> bool {
        self.net.is_negative()
    }
}

/// Persisted historical snapshot of a settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayeeSettlement {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub breakdown: SettlementBreakdown,
}

impl PayeeSettlement {
    pub fn new(breakdown: SettlementBreakdown, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at,
            breakdown,
        }
    }

    pub fn payee_id(&self) -> PayeeId {
        self.breakdown.payee_id
    }

    pub fn net_amount(&self) -> Money {
        self.breakdown.net
    }
}

impl Displayable for PayeeSettlement {
    fn display_label(&self) -> String {
        format!(
            "settlement {} for {} [{}]: net {}",
            self.id, self.breakdown.payee_id, self.breakdown.period, self.breakdown.net
        )
    }
}
