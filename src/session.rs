use std::{path::PathBuf, sync::Arc};

use fleet_config::{Config, ConfigManager};
use fleet_core::{
    Clock, CurrencyFormatter, IndianGroupingFormatter, MatchPolicy, SystemClock, TextExporter,
};
use fleet_domain::{DeductionRate, Money};
use fleet_storage_json::JsonSnapshotStore;

use crate::FleetError;

/// Settings and services shared by one user session. Built once from
/// [`Config`] and handed to whatever needs it.
#[derive(Clone)]
pub struct Session {
    config: Config,
    clock: Arc<dyn Clock>,
}

impl Session {
    pub fn new(config: Config) -> Result<Self, FleetError> {
        config.validate()?;
        Ok(Self {
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Loads the saved configuration, falling back to defaults.
    pub fn load(manager: &ConfigManager) -> Result<Self, FleetError> {
        let config = manager.load()?;
        tracing::debug!(path = %manager.config_path().display(), "loaded configuration");
        Self::new(config)
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn match_policy(&self) -> MatchPolicy {
        MatchPolicy::new(self.config.reconciliation.date_tolerance_days)
    }

    pub fn package_days(&self) -> u32 {
        self.config.payroll.package_days
    }

    pub fn default_deductions(&self) -> &[DeductionRate] {
        &self.config.payroll.default_deductions
    }

    pub fn data_root(&self) -> PathBuf {
        self.config.resolve_data_root()
    }

    /// Opens the JSON snapshot store under the configured data root.
    pub fn snapshot_store(&self) -> Result<JsonSnapshotStore, FleetError> {
        Ok(JsonSnapshotStore::new(self.data_root())?)
    }

    pub fn exporter(&self) -> TextExporter<IndianGroupingFormatter> {
        TextExporter::new(IndianGroupingFormatter, self.config.currency.clone())
    }

    pub fn format_amount(&self, amount: Money) -> String {
        IndianGroupingFormatter.format_amount(amount, &self.config.currency)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("now", &self.clock.now())
            .finish()
    }
}
