use std::path::PathBuf;

use fleet_domain::{AccountId, PayeeId, PayeeSettlement, Period, PeriodKey};
use uuid::Uuid;

use crate::CoreError;

/// Describes a persisted settlement snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotInfo {
    pub id: Uuid,
    pub payee_id: PayeeId,
    pub period: PeriodKey,
    pub path: PathBuf,
}

/// Abstraction over persistence backends for closed periods and settlement
/// history.
pub trait SnapshotStore: Send + Sync {
    fn save_period(&self, account: AccountId, period: &Period) -> Result<(), CoreError>;
    fn load_period(&self, account: AccountId, key: PeriodKey) -> Result<Period, CoreError>;
    fn list_periods(&self, account: AccountId) -> Result<Vec<PeriodKey>, CoreError>;
    fn save_settlement(&self, snapshot: &PayeeSettlement) -> Result<SnapshotInfo, CoreError>;
    /// Snapshots of one payee, oldest period first.
    fn list_settlements(&self, payee: PayeeId) -> Result<Vec<PayeeSettlement>, CoreError>;
}
