//! fleet-core
//!
//! Business logic for the fleet ledger: balances, period lifecycle,
//! reconciliation and payroll settlement.
//! Depends on fleet-domain. No terminal I/O, no direct storage interactions.

pub mod adjustment_service;
pub mod balance_service;
pub mod error;
pub mod format;
pub mod period_service;
pub mod public_api;
pub mod reconciliation_service;
pub mod settlement_service;
pub mod source;
pub mod storage;
pub mod time;

pub use adjustment_service::*;
pub use balance_service::*;
pub use error::CoreError;
pub use format::*;
pub use period_service::*;
pub use reconciliation_service::*;
pub use settlement_service::*;
pub use source::*;
pub use storage::*;
pub use time::*;
