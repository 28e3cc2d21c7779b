//! Monthly accounting periods and their summaries.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Calendar month identifying a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey {
    pub year: i32,
    pub month: u32,
}

impl PeriodKey {
    /// Returns `None` for months outside `1..=12`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    /// The period containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Parses the `YYYY-MM` form produced by `Display`.
    pub fn parse(raw: &str) -> Option<Self> {
        let (year, month) = raw.trim().split_once('-')?;
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    pub fn first_day(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn last_day(&self) -> Option<NaiveDate> {
        self.next().first_day()?.pred_opt()
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodStatus {
    Open,
    Closed,
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeriodStatus::Open => "Open",
            PeriodStatus::Closed => "Closed",
        };
        f.write_str(label)
    }
}

/// Opening balance, totals and closing balance of one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Period {
    pub key: PeriodKey,
    pub opening_balance: Money,
    pub total_credits: Money,
    pub total_debits: Money,
    pub closing_balance: Money,
    pub status: PeriodStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl Period {
    /// An open period with no activity yet.
    pub fn opened(key: PeriodKey, opening_balance: Money) -> Self {
        Self {
            key,
            opening_balance,
            total_credits: Money::ZERO,
            total_debits: Money::ZERO,
            closing_balance: opening_balance,
            status: PeriodStatus::Open,
            closed_at: None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.status == PeriodStatus::Closed
    }

    /// Net movement of the period (`credits − debits`).
    pub fn net_movement(&self) -> Money {
        self.total_credits - self.total_debits
    }
}

/// Credit/debit totals for one account head.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadTotals {
    pub account_head: String,
    pub credits: Money,
    pub debits: Money,
    pub entry_count: usize,
}

impl HeadTotals {
    pub fn net(&self) -> Money {
        self.credits - self.debits
    }
}
