use chrono::{NaiveDate, TimeZone, Utc};
use fleet_core::{
    CoreError, Daybook, FixedClock, LedgerSource, SettlementInput, SettlementService,
    SnapshotStore,
};
use fleet_domain::{
    AccountId, BankAccount, BankAccountType, BankTransaction, LedgerEntry, Money, PayBasis,
    PayeeId, PeriodKey, TransactionType,
};
use fleet_storage_json::{JsonLedgerSource, JsonSnapshotStore};
use std::fs;
use tempfile::tempdir;

fn april() -> PeriodKey {
    PeriodKey::new(2024, 4).unwrap()
}

fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

fn clock(day: u32) -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).unwrap())
}

#[test]
fn closed_period_round_trips_and_cannot_be_rewritten() {
    let dir = tempdir().expect("tempdir");
    let store = JsonSnapshotStore::new(dir.path().to_path_buf()).expect("create store");
    let account = AccountId::new();

    let mut daybook = Daybook::new();
    daybook.open_period(april(), Money::new(1_000)).expect("open");
    daybook
        .post(LedgerEntry::credit(1, date(4, 2), Money::new(5_000)))
        .expect("post");
    let outcome = daybook.close(april(), &clock(1)).expect("close");

    store.save_period(account, &outcome.closed).expect("save closed");
    store.save_period(account, &outcome.next).expect("save next");
    let path = store.period_path(account, april());
    assert!(path.ends_with(format!("periods/{account}/2024-04.json")));

    let loaded = store.load_period(account, april()).expect("load");
    assert_eq!(loaded, outcome.closed);
    assert_eq!(
        store.list_periods(account).expect("list"),
        vec![april(), april().next()]
    );

    // Saving the identical snapshot again is accepted.
    store.save_period(account, &outcome.closed).expect("resave");

    let mut tampered = outcome.closed.clone();
    tampered.closing_balance = Money::new(1);
    let err = store.save_period(account, &tampered).unwrap_err();
    assert!(matches!(err, CoreError::PeriodAlreadyClosed(_)));
    assert_eq!(store.load_period(account, april()).expect("load"), outcome.closed);
}

#[test]
fn missing_period_is_not_found() {
    let dir = tempdir().expect("tempdir");
    let store = JsonSnapshotStore::new(dir.path().to_path_buf()).expect("create store");
    let err = store.load_period(AccountId::new(), april()).unwrap_err();
    assert!(matches!(err, CoreError::PeriodNotFound(_)));
}

#[test]
fn settlements_are_kept_as_history() {
    let dir = tempdir().expect("tempdir");
    let store = JsonSnapshotStore::new(dir.path().to_path_buf()).expect("create store");
    let payee = PayeeId::new();

    let mut saved = Vec::new();
    for (month, trips, day) in [(5, 12, 3), (4, 10, 2), (4, 11, 4)] {
        let input = SettlementInput::new(
            payee,
            PeriodKey::new(2024, month).unwrap(),
            PayBasis::PerTrip {
                rate: Money::new(400),
                trips,
            },
        );
        let breakdown = SettlementService::calculate(&input).expect("calculate");
        let snapshot = SettlementService::snapshot(breakdown, &clock(day));
        let info = store.save_settlement(&snapshot).expect("save");
        assert!(info.path.exists());
        assert_eq!(info.id, snapshot.id);
        saved.push(snapshot);
    }

    let history = store.list_settlements(payee).expect("list");
    let trips: Vec<Money> = history.iter().map(|s| s.breakdown.gross).collect();
    assert_eq!(trips, vec![Money::new(4_000), Money::new(4_400), Money::new(4_800)]);

    let err = store.save_settlement(&saved[0]).unwrap_err();
    assert!(matches!(err, CoreError::Storage(_)));
    assert!(store.list_settlements(PayeeId::new()).expect("empty").is_empty());
}

#[test]
fn ledger_source_filters_by_account_and_window() {
    let dir = tempdir().expect("tempdir");
    let source = JsonLedgerSource::new(dir.path());

    let hdfc = BankAccount::new("HDFC", "50100223344", BankAccountType::Current, Money::new(10_000));
    let sbi = BankAccount::new("SBI", "30221199", BankAccountType::Savings, Money::ZERO);
    let entries = vec![
        LedgerEntry::credit(1, date(4, 1), Money::new(100)).with_account(hdfc.id),
        LedgerEntry::debit(2, date(4, 15), Money::new(50)).with_account(sbi.id),
        LedgerEntry::debit(3, date(5, 1), Money::new(25)).with_account(hdfc.id),
    ];
    let statements = vec![
        BankTransaction::new(1, hdfc.id, date(4, 2), TransactionType::Credit, Money::new(100)),
        BankTransaction::new(2, sbi.id, date(4, 16), TransactionType::Debit, Money::new(50)),
    ];
    source
        .write_export(&entries, &[hdfc.clone(), sbi.clone()], &statements)
        .expect("write export");

    let april_hdfc = source
        .fetch_entries(Some(hdfc.id), date(4, 1), date(4, 30))
        .expect("entries");
    assert_eq!(april_hdfc.len(), 1);
    assert_eq!(april_hdfc[0].id.0, 1);

    let all = source.fetch_entries(None, date(4, 1), date(5, 31)).expect("entries");
    assert_eq!(all.len(), 3);

    let accounts = source.fetch_accounts().expect("accounts");
    assert_eq!(accounts.len(), 2);
    assert_eq!(accounts[0].current_balance(), Money::new(10_000));

    let statement = source.fetch_statement(sbi.id, date(4, 1), date(4, 30)).expect("statement");
    assert_eq!(statement.len(), 1);
    assert_eq!(statement[0].id.0, 2);
}

#[test]
fn ledger_source_treats_missing_files_as_empty_and_reports_corruption() {
    let dir = tempdir().expect("tempdir");
    let source = JsonLedgerSource::new(dir.path());
    assert!(source.fetch_accounts().expect("accounts").is_empty());

    fs::write(dir.path().join("entries.json"), "[{").expect("write");
    let err = source
        .fetch_entries(None, date(4, 1), date(4, 30))
        .unwrap_err();
    assert!(matches!(err, CoreError::Serde(_)));
}
