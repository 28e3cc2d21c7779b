use std::path::PathBuf;

use fleet_domain::DeductionRate;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

const DEFAULT_DATA_DIR: &str = "FleetLedger";

/// Company-wide settings shared by every session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "Config::default_locale")]
    pub locale: String,
    #[serde(default = "Config::default_currency")]
    pub currency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default)]
    pub reconciliation: ReconciliationSettings,
    #[serde(default)]
    pub payroll: PayrollSettings,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom root for period and settlement snapshots. Defaults to
    /// `~/Documents/FleetLedger`.
    pub data_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSettings {
    /// Largest date gap, in days, between a bank line and its entry.
    #[serde(default = "ReconciliationSettings::default_tolerance")]
    pub date_tolerance_days: u32,
}

impl ReconciliationSettings {
    fn default_tolerance() -> u32 {
        3
    }
}

impl Default for ReconciliationSettings {
    fn default() -> Self {
        Self {
            date_tolerance_days: Self::default_tolerance(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSettings {
    /// Days in the month used to prorate package pay.
    #[serde(default = "PayrollSettings::default_package_days")]
    pub package_days: u32,
    /// Deductions applied when a settlement names none, e.g. TDS.
    #[serde(default)]
    pub default_deductions: Vec<DeductionRate>,
}

impl PayrollSettings {
    fn default_package_days() -> u32 {
        30
    }
}

impl Default for PayrollSettings {
    fn default() -> Self {
        Self {
            package_days: Self::default_package_days(),
            default_deductions: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            locale: Self::default_locale(),
            currency: Self::default_currency(),
            company_name: None,
            reconciliation: ReconciliationSettings::default(),
            payroll: PayrollSettings::default(),
            data_root: None,
        }
    }
}

impl Config {
    pub fn default_locale() -> String {
        "en-IN".into()
    }

    pub fn default_currency() -> String {
        "INR".into()
    }

    pub fn resolve_data_root(&self) -> PathBuf {
        if let Some(path) = &self.data_root {
            return path.clone();
        }

        let base = dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        base.join(DEFAULT_DATA_DIR)
    }

    /// Rejects settings the calculators cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("currency must not be empty".into()));
        }
        if self.payroll.package_days == 0 {
            return Err(ConfigError::Invalid(
                "payroll.package_days must be greater than zero".into(),
            ));
        }
        if let Some(rate) = self
            .payroll
            .default_deductions
            .iter()
            .find(|rate| rate.rate_percent.is_sign_negative())
        {
            return Err(ConfigError::Invalid(format!(
                "deduction `{}` has a negative rate",
                rate.label
            )));
        }
        Ok(())
    }
}
