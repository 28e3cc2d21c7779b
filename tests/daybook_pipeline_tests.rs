mod common;

use std::sync::{Arc, Mutex};

use common::{day, setup_test_env};
use fleet_core::{CoreError, EntryEdit, SnapshotInfo, SnapshotStore};
use fleet_domain::{
    AccountId, BankTransaction, DeductionRate, DocumentKind, DocumentRef, EntryId, LedgerEntry,
    Money, PayBasis, PayeeId, PayeeSettlement, Period, PeriodKey, PeriodStatus, TransactionType,
};
use fleet_ledger::{DaybookManager, FleetError};
use fleet_storage_json::JsonSnapshotStore;
use rust_decimal_macros::dec;

fn key(month: u32) -> PeriodKey {
    PeriodKey::new(2024, month).unwrap()
}

fn closed_march(closing: Money) -> Period {
    let mut period = Period::opened(key(3), closing);
    period.status = PeriodStatus::Closed;
    period
}

fn core_err(err: FleetError) -> CoreError {
    match err {
        FleetError::Core(inner) => inner,
        other => panic!("expected core error, got {other:?}"),
    }
}

/// JSON store whose period writes fail for one chosen month.
struct FlakyStore {
    inner: JsonSnapshotStore,
    failing: Arc<Mutex<Option<PeriodKey>>>,
}

impl SnapshotStore for FlakyStore {
    fn save_period(&self, account: AccountId, period: &Period) -> Result<(), CoreError> {
        if *self.failing.lock().expect("lock") == Some(period.key) {
            return Err(CoreError::Storage("disk full".to_string()));
        }
        self.inner.save_period(account, period)
    }

    fn load_period(&self, account: AccountId, key: PeriodKey) -> Result<Period, CoreError> {
        self.inner.load_period(account, key)
    }

    fn list_periods(&self, account: AccountId) -> Result<Vec<PeriodKey>, CoreError> {
        self.inner.list_periods(account)
    }

    fn save_settlement(&self, snapshot: &PayeeSettlement) -> Result<SnapshotInfo, CoreError> {
        self.inner.save_settlement(snapshot)
    }

    fn list_settlements(&self, payee: PayeeId) -> Result<Vec<PayeeSettlement>, CoreError> {
        self.inner.list_settlements(payee)
    }
}

#[test]
fn month_end_reconciles_closes_and_carries_forward() {
    fleet_ledger::init();
    let env = setup_test_env();
    let account = env.account.id;
    env.export(
        &[
            LedgerEntry::credit(1, day(4, 2), Money::new(5_000)).with_account(account),
            LedgerEntry::debit(2, day(4, 18), Money::new(3_000)).with_account(account),
            LedgerEntry::credit(3, day(5, 2), Money::new(10)).with_account(account),
        ],
        &[
            BankTransaction::new(10, account, day(4, 3), TransactionType::Credit, Money::new(5_000)),
            BankTransaction::new(11, account, day(4, 17), TransactionType::Debit, Money::new(3_000)),
            BankTransaction::new(12, account, day(4, 25), TransactionType::Debit, Money::new(15))
                .with_description("SMS charges"),
        ],
    );

    let mut manager = env.manager();
    manager
        .store()
        .save_period(account, &closed_march(Money::new(1_000)))
        .expect("seed march");

    let april = manager.load_period(key(4)).expect("load april");
    assert_eq!(april.period.opening_balance, Money::new(1_000));
    assert_eq!(april.entries.len(), 2);
    assert_eq!(april.closing_balance(), Money::new(3_000));

    let report = manager.reconcile(key(4)).expect("reconcile");
    assert_eq!(report.matches.len(), 2);
    assert_eq!(report.unmatched_bank.len(), 1);
    assert!(report.unmatched_ledger.is_empty());
    assert_eq!(manager.balance().unwrap(), Money::new(3_000));

    let again = manager.reconcile(key(4)).expect("reconcile again");
    assert!(again.matches.is_empty());
    assert_eq!(manager.reconciler().len(), 2);
    assert_eq!(manager.balance().unwrap(), Money::new(3_000));

    let outcome = manager.close_period(key(4)).expect("close");
    assert_eq!(outcome.closed.closing_balance, Money::new(3_000));
    assert_eq!(outcome.next.opening_balance, Money::new(3_000));
    assert_eq!(
        manager.store().list_periods(account).expect("periods"),
        vec![key(3), key(4), key(5)]
    );

    let err = manager
        .post_entry(LedgerEntry::debit(9, day(4, 30), Money::new(1)))
        .unwrap_err();
    assert!(matches!(core_err(err), CoreError::PeriodAlreadyClosed(_)));

    let err = manager.close_period(key(4)).unwrap_err();
    assert!(matches!(core_err(err), CoreError::PeriodAlreadyClosed(_)));

    // The month the close carried into keeps going on the same manager.
    let may = manager.load_period(key(5)).expect("load may after close");
    assert_eq!(may.period.opening_balance, Money::new(3_000));
    assert_eq!(may.entries.len(), 1);
    assert_eq!(may.closing_balance(), Money::new(3_010));
    let reloaded = manager.load_period(key(5)).expect("reload may");
    assert_eq!(reloaded.entries.len(), 1);
    let err = manager.load_period(key(4)).unwrap_err();
    assert!(matches!(core_err(err), CoreError::PeriodAlreadyClosed(_)));

    let mut fresh = env.manager();
    let err = fresh.load_period(key(4)).unwrap_err();
    assert!(matches!(core_err(err), CoreError::PeriodAlreadyClosed(_)));
    let may = fresh.load_period(key(5)).expect("load may");
    assert_eq!(may.period.opening_balance, Money::new(3_000));
    assert_eq!(may.closing_balance(), Money::new(3_010));
}

#[test]
fn editing_reconciled_entry_adjusts_bank_balance() {
    let env = setup_test_env();
    let account = env.account.id;
    env.export(
        &[
            LedgerEntry::credit(1, day(4, 5), Money::new(500)).with_account(account),
            LedgerEntry::debit(2, day(4, 6), Money::new(40)).with_account(account),
        ],
        &[BankTransaction::new(1, account, day(4, 5), TransactionType::Credit, Money::new(500))],
    );
    let mut manager = env.manager();
    manager.load_period(key(4)).expect("load");
    manager.reconcile(key(4)).expect("reconcile");
    assert_eq!(manager.balance().unwrap(), Money::new(1_500));

    let change = manager
        .edit_entry(
            EntryId(1),
            EntryEdit::kind(TransactionType::Debit).with_amount(Money::new(300)),
        )
        .expect("edit");
    assert_eq!(change.old_kind, TransactionType::Credit);
    assert_eq!(manager.balance().unwrap(), Money::new(700));

    // Unreconciled entries never touch the bank balance.
    manager
        .edit_entry(EntryId(2), EntryEdit::amount(Money::new(90)))
        .expect("edit unreconciled");
    assert_eq!(manager.balance().unwrap(), Money::new(700));

    let removed = manager.reverse_entry(EntryId(1)).expect("reverse");
    assert_eq!(removed.kind, TransactionType::Debit);
    assert_eq!(manager.balance().unwrap(), Money::new(1_000));
    assert!(manager.reconciler().is_empty());

    let err = manager
        .edit_entry(EntryId(1), EntryEdit::amount(Money::new(1)))
        .unwrap_err();
    assert!(matches!(core_err(err), CoreError::EntryNotFound(_)));
}

#[test]
fn settlement_uses_configured_deductions_and_daybook_advances() {
    let env = setup_test_env();
    let mut config = env.config_manager.load().expect("load");
    config.payroll.default_deductions = vec![
        DeductionRate::new("TDS", dec!(10)),
        DeductionRate::new("Penalty", dec!(5)),
    ];
    env.config_manager.save(&config).expect("save config");

    let account = env.account.id;
    let driver = PayeeId::new();
    env.export(
        &[LedgerEntry::debit(1, day(4, 10), Money::new(2_000))
            .with_account(account)
            .with_payee(driver)
            .with_document(DocumentRef::new(DocumentKind::Advance, "ADV-0042"))],
        &[],
    );

    let mut manager = env.manager();
    manager.load_period(key(4)).expect("load");

    let basis = PayBasis::PerTrip {
        rate: Money::new(500),
        trips: 20,
    };
    let snapshot = manager
        .settle(driver, key(4), basis.clone(), None)
        .expect("settle");
    let breakdown = &snapshot.breakdown;
    assert_eq!(breakdown.gross, Money::new(10_000));
    assert_eq!(breakdown.total_deductions, Money::new(1_500));
    assert_eq!(breakdown.advance, Money::new(2_000));
    assert_eq!(breakdown.net, Money::new(6_500));

    let recomputed = manager
        .settle(driver, key(4), basis, None)
        .expect("settle again");
    assert_eq!(recomputed.breakdown, snapshot.breakdown);
    assert_ne!(recomputed.id, snapshot.id);

    let owner = PayeeId::new();
    let owing = manager
        .settle(
            owner,
            key(4),
            PayBasis::PerTrip {
                rate: Money::new(100),
                trips: 10,
            },
            Some(vec![DeductionRate::new("TDS", dec!(20))]),
        )
        .expect("settle owner");
    assert_eq!(owing.breakdown.advance, Money::ZERO);
    assert_eq!(owing.breakdown.net, Money::new(800));

    let history = manager.settlement_history(driver).expect("history");
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|s| s.net_amount() == Money::new(6_500)));
}

#[test]
fn configured_tolerance_drives_matching() {
    let env = setup_test_env();
    let mut config = env.config_manager.load().expect("load");
    config.reconciliation.date_tolerance_days = 0;
    env.config_manager.save(&config).expect("save config");

    let account = env.account.id;
    env.export(
        &[LedgerEntry::credit(1, day(4, 5), Money::new(250)).with_account(account)],
        &[BankTransaction::new(1, account, day(4, 6), TransactionType::Credit, Money::new(250))],
    );
    let mut manager = env.manager();
    manager.load_period(key(4)).expect("load");
    let report = manager.reconcile(key(4)).expect("reconcile");
    assert!(report.matches.is_empty());
    assert_eq!(report.unmatched_ledger, vec![EntryId(1)]);
    assert_eq!(manager.balance().unwrap(), Money::new(1_000));
}

#[test]
fn export_renders_rupee_amounts() {
    let env = setup_test_env();
    let account = env.account.id;
    env.export(
        &[
            LedgerEntry::credit(1, day(4, 1), Money::new(250_000))
                .with_account(account)
                .classified("Income", "Freight", "Pune route"),
            LedgerEntry::debit(2, day(4, 2), Money::new(4_500))
                .with_account(account)
                .classified("Expense", "Tolls", "NH48"),
        ],
        &[],
    );
    let mut manager = env.manager();
    manager.load_period(key(4)).expect("load");
    let text = manager.export_period(key(4)).expect("export");
    assert!(text.contains("₹2,45,500.00"), "{text}");
    assert!(text.contains("Tolls"));
}

#[test]
fn unknown_account_is_rejected_up_front() {
    let env = setup_test_env();
    env.source
        .write_export(&[], &[], &[])
        .expect("write empty export");
    let session = env.session();
    let store = fleet_storage_json::JsonSnapshotStore::new(session.data_root()).expect("store");
    let result = fleet_ledger::DaybookManager::new(
        session,
        env.account.id,
        Box::new(env.source.clone()),
        Box::new(store),
    );
    let err = result.err().expect("missing account must fail");
    assert!(matches!(core_err(err), CoreError::AccountNotFound(_)));
}

#[test]
fn empty_month_keeps_opening_balance() {
    let env = setup_test_env();
    env.export(&[], &[]);
    let mut manager = env.manager();
    let summary = manager.load_period(key(4)).expect("load");
    assert!(summary.entries.is_empty());
    assert_eq!(summary.closing_balance(), Money::ZERO);
    let outcome = manager.close_period(key(4)).expect("close");
    assert_eq!(outcome.next.opening_balance, Money::ZERO);
}

#[test]
fn failed_close_leaves_store_and_daybook_open() {
    let env = setup_test_env();
    let account = env.account.id;
    env.export(
        &[LedgerEntry::credit(1, day(4, 2), Money::new(5_000)).with_account(account)],
        &[],
    );
    let session = env.session();
    let failing = Arc::new(Mutex::new(Some(key(5))));
    let store = FlakyStore {
        inner: JsonSnapshotStore::new(session.data_root()).expect("snapshot store"),
        failing: Arc::clone(&failing),
    };
    let mut manager = DaybookManager::new(
        session,
        account,
        Box::new(env.source.clone()),
        Box::new(store),
    )
    .expect("daybook manager");
    manager.load_period(key(4)).expect("load april");

    let err = manager.close_period(key(4)).unwrap_err();
    assert!(matches!(core_err(err), CoreError::Storage(_)));
    let err = manager.store().load_period(account, key(4)).unwrap_err();
    assert!(matches!(err, CoreError::PeriodNotFound(_)));
    assert!(!manager.daybook().period(key(4)).unwrap().is_closed());
    manager
        .post_entry(LedgerEntry::debit(2, day(4, 20), Money::new(200)))
        .expect("april still open");

    *failing.lock().expect("lock") = Some(key(4));
    let err = manager.close_period(key(4)).unwrap_err();
    assert!(matches!(core_err(err), CoreError::Storage(_)));
    let err = manager.store().load_period(account, key(4)).unwrap_err();
    assert!(matches!(err, CoreError::PeriodNotFound(_)));
    let may = manager.store().load_period(account, key(5)).expect("may stored open");
    assert!(!may.is_closed());
    assert!(manager.daybook().period(key(5)).is_none());

    *failing.lock().expect("lock") = None;
    let outcome = manager.close_period(key(4)).expect("close after recovery");
    assert_eq!(outcome.closed.closing_balance, Money::new(4_800));
    let stored = manager.store().load_period(account, key(4)).expect("april stored");
    assert!(stored.is_closed());
    assert_eq!(stored.closing_balance, Money::new(4_800));
    assert_eq!(
        manager.store().load_period(account, key(5)).expect("may").opening_balance,
        Money::new(4_800)
    );
}
