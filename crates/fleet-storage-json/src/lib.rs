//! fleet-storage-json
//!
//! Filesystem JSON persistence for closed periods and settlement snapshots,
//! plus a file-backed [`LedgerSource`] reading a daybook export.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use fleet_core::{CoreError, LedgerSource, SnapshotInfo, SnapshotStore};
use fleet_domain::{
    AccountId, BankAccount, BankTransaction, LedgerEntry, PayeeId, PayeeSettlement, Period,
    PeriodKey,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

const JSON_EXTENSION: &str = "json";
const TMP_SUFFIX: &str = "tmp";
const PERIODS_DIR: &str = "periods";
const SETTLEMENTS_DIR: &str = "settlements";

const ENTRIES_FILE: &str = "entries.json";
const ACCOUNTS_FILE: &str = "accounts.json";
const STATEMENTS_FILE: &str = "statements.json";

/// Snapshot store laid out as
/// `<root>/periods/<account>/<YYYY-MM>.json` and
/// `<root>/settlements/<payee>/<YYYY-MM>_<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    root: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(root: PathBuf) -> Result<Self, CoreError> {
        fs::create_dir_all(root.join(PERIODS_DIR))?;
        fs::create_dir_all(root.join(SETTLEMENTS_DIR))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn period_path(&self, account: AccountId, key: PeriodKey) -> PathBuf {
        self.root
            .join(PERIODS_DIR)
            .join(account.to_string())
            .join(format!("{key}.{JSON_EXTENSION}"))
    }

    pub fn settlement_path(&self, snapshot: &PayeeSettlement) -> PathBuf {
        self.settlement_dir(snapshot.payee_id()).join(format!(
            "{}_{}.{JSON_EXTENSION}",
            snapshot.breakdown.period, snapshot.id
        ))
    }

    fn settlement_dir(&self, payee: PayeeId) -> PathBuf {
        self.root.join(SETTLEMENTS_DIR).join(payee.to_string())
    }
}

impl SnapshotStore for JsonSnapshotStore {
    /// Closed periods are immutable: rewriting one with different figures
    /// fails with [`CoreError::PeriodAlreadyClosed`].
    fn save_period(&self, account: AccountId, period: &Period) -> Result<(), CoreError> {
        let path = self.period_path(account, period.key);
        if path.exists() {
            let stored: Period = read_json(&path)?;
            if stored.is_closed() {
                if stored == *period {
                    return Ok(());
                }
                warn!(account = %account, period = %period.key, "refusing to overwrite closed period");
                return Err(CoreError::PeriodAlreadyClosed(period.key));
            }
        }
        write_json(&path, period)?;
        debug!(account = %account, period = %period.key, status = %period.status, "saved period");
        Ok(())
    }

    fn load_period(&self, account: AccountId, key: PeriodKey) -> Result<Period, CoreError> {
        let path = self.period_path(account, key);
        if !path.exists() {
            return Err(CoreError::PeriodNotFound(key));
        }
        read_json(&path)
    }

    fn list_periods(&self, account: AccountId) -> Result<Vec<PeriodKey>, CoreError> {
        let dir = self.root.join(PERIODS_DIR).join(account.to_string());
        let mut keys: Vec<PeriodKey> = json_stems(&dir)?
            .iter()
            .filter_map(|stem| PeriodKey::parse(stem))
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn save_settlement(&self, snapshot: &PayeeSettlement) -> Result<SnapshotInfo, CoreError> {
        let path = self.settlement_path(snapshot);
        if path.exists() {
            return Err(CoreError::Storage(format!(
                "settlement snapshot {} already exists",
                snapshot.id
            )));
        }
        write_json(&path, snapshot)?;
        debug!(
            payee = %snapshot.payee_id(),
            period = %snapshot.breakdown.period,
            net = %snapshot.net_amount(),
            "saved settlement snapshot"
        );
        Ok(SnapshotInfo {
            id: snapshot.id,
            payee_id: snapshot.payee_id(),
            period: snapshot.breakdown.period,
            path,
        })
    }

    fn list_settlements(&self, payee: PayeeId) -> Result<Vec<PayeeSettlement>, CoreError> {
        let dir = self.settlement_dir(payee);
        let mut snapshots = Vec::new();
        for stem in json_stems(&dir)? {
            let path = dir.join(format!("{stem}.{JSON_EXTENSION}"));
            match read_json::<PayeeSettlement>(&path) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable settlement"),
            }
        }
        snapshots.sort_by_key(|snapshot| (snapshot.breakdown.period, snapshot.created_at));
        Ok(snapshots)
    }
}

/// Reads a daybook export directory holding `entries.json`,
/// `accounts.json` and `statements.json`. Missing files read as empty.
#[derive(Debug, Clone)]
pub struct JsonLedgerSource {
    dir: PathBuf,
}

impl JsonLedgerSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes an export in the layout this source reads.
    pub fn write_export(
        &self,
        entries: &[LedgerEntry],
        accounts: &[BankAccount],
        statements: &[BankTransaction],
    ) -> Result<(), CoreError> {
        write_json(&self.dir.join(ENTRIES_FILE), &entries)?;
        write_json(&self.dir.join(ACCOUNTS_FILE), &accounts)?;
        write_json(&self.dir.join(STATEMENTS_FILE), &statements)
    }

    fn read_list<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<T>, CoreError> {
        let path = self.dir.join(file);
        if !path.exists() {
            debug!(path = %path.display(), "export file missing, treating as empty");
            return Ok(Vec::new());
        }
        read_json(&path)
    }
}

impl LedgerSource for JsonLedgerSource {
    fn fetch_entries(
        &self,
        account: Option<AccountId>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<LedgerEntry>, CoreError> {
        let entries: Vec<LedgerEntry> = self.read_list(ENTRIES_FILE)?;
        Ok(entries
            .into_iter()
            .filter(|entry| entry.date >= from && entry.date <= to)
            .filter(|entry| account.is_none() || entry.account_id == account)
            .map(|mut entry| {
                entry.running_balance = None;
                entry
            })
            .collect())
    }

    fn fetch_accounts(&self) -> Result<Vec<BankAccount>, CoreError> {
        self.read_list(ACCOUNTS_FILE)
    }

    fn fetch_statement(
        &self,
        account: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<BankTransaction>, CoreError> {
        let lines: Vec<BankTransaction> = self.read_list(STATEMENTS_FILE)?;
        Ok(lines
            .into_iter()
            .filter(|line| line.account_id == account)
            .filter(|line| line.date >= from && line.date <= to)
            .collect())
    }
}

fn json_stems(dir: &Path) -> Result<Vec<String>, CoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut stems = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some(JSON_EXTENSION) {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
            stems.push(stem.to_string());
        }
    }
    stems.sort();
    Ok(stems)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(format!("{}: {err}", path.display())))
}

/// Serializes to a sibling temp file, then renames it over `path`.
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(value).map_err(|err| CoreError::Serde(err.to_string()))?;
    let tmp = tmp_path(path);
    let mut file = File::create(&tmp)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}
