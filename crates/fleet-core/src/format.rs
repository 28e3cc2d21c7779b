use std::fmt::Write as _;

use chrono::NaiveDate;
use fleet_domain::{HeadTotals, Money, PayeeSettlement};

use crate::{balance_service::Accumulation, CoreError};

/// Formats currency amounts for presentation.
pub trait CurrencyFormatter: Send + Sync {
    fn format_amount(&self, amount: Money, currency: &str) -> String;
}

/// Formats dates for presentation.
pub trait DateFormatter: Send + Sync {
    fn format_date(&self, date: NaiveDate) -> String;
}

/// Renders computed results for an outer surface (PDF, spreadsheet, screen).
/// The core only supplies the structure.
pub trait SummaryExporter: Send + Sync {
    fn export_period(&self, summary: &Accumulation, heads: &[HeadTotals]) -> Result<String, CoreError>;
    fn export_settlement(&self, settlement: &PayeeSettlement) -> Result<String, CoreError>;
}

/// Lakh/crore digit grouping as used for `en-IN`: `₹1,23,456.00`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndianGroupingFormatter;

impl IndianGroupingFormatter {
    fn group(digits: &str) -> String {
        if digits.len() <= 3 {
            return digits.to_string();
        }
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (left, right) = rest.split_at(rest.len() - 2);
            groups.push(right);
            rest = left;
        }
        groups.push(rest);
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    }
}

impl CurrencyFormatter for IndianGroupingFormatter {
    fn format_amount(&self, amount: Money, currency: &str) -> String {
        let plain = amount.abs().to_string();
        let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));
        let symbol = match currency {
            "INR" => "₹".to_string(),
            other => format!("{other} "),
        };
        let sign = if amount.is_negative() { "-" } else { "" };
        format!("{sign}{symbol}{}.{fraction}", Self::group(whole))
    }
}

impl DateFormatter for IndianGroupingFormatter {
    fn format_date(&self, date: NaiveDate) -> String {
        date.format("%d-%m-%Y").to_string()
    }
}

/// Plain-text exporter used for logs and quick previews.
pub struct TextExporter<F> {
    formatter: F,
    currency: String,
}

impl<F: CurrencyFormatter + DateFormatter> TextExporter<F> {
    pub fn new(formatter: F, currency: impl Into<String>) -> Self {
        Self {
            formatter,
            currency: currency.into(),
        }
    }

    fn money(&self, amount: Money) -> String {
        self.formatter.format_amount(amount, &self.currency)
    }
}

impl<F: CurrencyFormatter + DateFormatter> SummaryExporter for TextExporter<F> {
    fn export_period(&self, summary: &Accumulation, heads: &[HeadTotals]) -> Result<String, CoreError> {
        let period = &summary.period;
        let mut out = String::new();
        let write_err = |err: std::fmt::Error| CoreError::Serde(err.to_string());
        writeln!(out, "Period {} ({})", period.key, period.status).map_err(write_err)?;
        writeln!(out, "Opening  {}", self.money(period.opening_balance)).map_err(write_err)?;
        writeln!(out, "Credits  {}", self.money(period.total_credits)).map_err(write_err)?;
        writeln!(out, "Debits   {}", self.money(period.total_debits)).map_err(write_err)?;
        writeln!(out, "Closing  {}", self.money(period.closing_balance)).map_err(write_err)?;
        for entry in &summary.entries {
            writeln!(
                out,
                "{} {:<6} {:>16} {:>16} {}",
                self.formatter.format_date(entry.date),
                entry.kind,
                self.money(entry.amount),
                self.money(entry.running_balance.unwrap_or(Money::ZERO)),
                entry.account_head
            )
            .map_err(write_err)?;
        }
        for head in heads {
            writeln!(
                out,
                "{}: {} in / {} out ({} entries)",
                head.account_head,
                self.money(head.credits),
                self.money(head.debits),
                head.entry_count
            )
            .map_err(write_err)?;
        }
        Ok(out)
    }

    fn export_settlement(&self, settlement: &PayeeSettlement) -> Result<String, CoreError> {
        let breakdown = &settlement.breakdown;
        let mut out = String::new();
        let write_err = |err: std::fmt::Error| CoreError::Serde(err.to_string());
        writeln!(out, "Settlement {} [{}]", breakdown.payee_id, breakdown.period).map_err(write_err)?;
        writeln!(out, "Basis    {}", breakdown.basis).map_err(write_err)?;
        writeln!(out, "Gross    {}", self.money(breakdown.gross)).map_err(write_err)?;
        for deduction in &breakdown.deductions {
            writeln!(
                out,
                "- {} @ {}%  {}",
                deduction.label,
                deduction.rate_percent,
                self.money(deduction.amount)
            )
            .map_err(write_err)?;
        }
        writeln!(out, "Advance  {}", self.money(breakdown.advance)).map_err(write_err)?;
        writeln!(out, "Net      {}", self.money(breakdown.net)).map_err(write_err)?;
        Ok(out)
    }
}
