#![allow(dead_code)]

use std::{path::PathBuf, sync::Mutex};

use chrono::{NaiveDate, TimeZone, Utc};
use fleet_config::{Config, ConfigManager};
use fleet_core::FixedClock;
use fleet_domain::{BankAccount, BankAccountType, BankTransaction, LedgerEntry, Money};
use fleet_ledger::{DaybookManager, Session};
use fleet_storage_json::{JsonLedgerSource, JsonSnapshotStore};
use once_cell::sync::Lazy;
use tempfile::TempDir;

/// Holds TempDir guards so temporary folders live for the duration of the test run.
static TEST_DIRS: Lazy<Mutex<Vec<TempDir>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Isolated directories plus the bank account every fixture posts to.
pub struct TestEnv {
    pub base: PathBuf,
    pub account: BankAccount,
    pub source: JsonLedgerSource,
    pub config_manager: ConfigManager,
}

impl TestEnv {
    pub fn session(&self) -> Session {
        let config = Config {
            data_root: Some(self.base.join("data")),
            ..self.config_manager.load().expect("load config")
        };
        Session::new(config)
            .expect("session")
            .with_clock(FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()))
    }

    pub fn manager(&self) -> DaybookManager {
        let session = self.session();
        let store = JsonSnapshotStore::new(session.data_root()).expect("snapshot store");
        DaybookManager::new(
            session,
            self.account.id,
            Box::new(self.source.clone()),
            Box::new(store),
        )
        .expect("daybook manager")
    }

    pub fn export(&self, entries: &[LedgerEntry], statement: &[BankTransaction]) {
        self.source
            .write_export(entries, std::slice::from_ref(&self.account), statement)
            .expect("write export");
    }
}

/// Creates an isolated environment backed by a unique directory for each test.
pub fn setup_test_env() -> TestEnv {
    let temp = TempDir::new().expect("create temp dir");
    let base = temp.path().to_path_buf();
    TEST_DIRS.lock().expect("lock temp dir registry").push(temp);

    let account = BankAccount::new("HDFC Bank", "50200011223344", BankAccountType::Current, Money::new(1_000));
    let source = JsonLedgerSource::new(base.join("export"));
    let config_manager =
        ConfigManager::with_base_dir(base.clone()).expect("create config manager for temp dir");

    TestEnv {
        base,
        account,
        source,
        config_manager,
    }
}

pub fn day(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}
