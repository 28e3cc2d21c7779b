//! fleet-config
//!
//! Persistent company settings: locale, reconciliation window and payroll
//! defaults, plus disk persistence and backups for them.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::{Config, PayrollSettings, ReconciliationSettings};
