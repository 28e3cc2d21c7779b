//! fleet-domain
//!
//! Pure domain models (Money, LedgerEntry, Period, BankAccount, PayeeSettlement).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod bank;
pub mod common;
pub mod entry;
pub mod money;
pub mod period;
pub mod settlement;

pub use bank::*;
pub use common::*;
pub use entry::*;
pub use money::*;
pub use period::*;
pub use settlement::*;
