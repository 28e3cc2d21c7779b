#![doc(test(attr(deny(warnings))))]

//! Fleet Ledger ties the daybook, reconciliation and payroll settlement core
//! to configuration, logging and JSON snapshot storage.

pub mod errors;
pub mod manager;
pub mod session;
pub mod utils;

pub use errors::FleetError;
pub use manager::DaybookManager;
pub use session::Session;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Fleet Ledger tracing initialized.");
    });
}
