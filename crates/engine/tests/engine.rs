use chrono::{DateTime, Duration, TimeZone, Utc};

use engine::{
    DocumentStore, Engine, EngineError, Money, MonthlyStats, RegisterBalanceCmd, RegisterOutcome,
    RegistrationKind, month_key, suggest_record,
};
use memory_backend::{ManualClock, MemoryAuth, MemoryStorage, MemoryStore};

type TestEngine = Engine<MemoryStore, MemoryStorage, MemoryAuth, ManualClock>;

fn august() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap()
}

fn engine_for(auth: MemoryAuth) -> (TestEngine, MemoryStore, ManualClock) {
    let store = MemoryStore::new();
    let clock = ManualClock::new(august());
    let engine = Engine::builder(store.clone(), MemoryStorage::new(), auth)
        .clock(clock.clone())
        .build();
    (engine, store, clock)
}

fn engine_signed_in() -> (TestEngine, MemoryStore, ManualClock) {
    engine_for(MemoryAuth::signed_in("alice"))
}

fn income(amount: i64) -> RegisterBalanceCmd {
    RegisterBalanceCmd::new(
        "alice",
        RegistrationKind::Income,
        "Salario",
        "Ingreso",
        Money::new(amount),
    )
}

fn expense(amount: i64) -> RegisterBalanceCmd {
    RegisterBalanceCmd::new(
        "alice",
        RegistrationKind::Expense,
        "Mercado",
        "Necesidad",
        Money::new(amount),
    )
}

#[tokio::test]
async fn income_and_expense_move_the_running_balance() {
    let (engine, _store, _clock) = engine_signed_in();

    let first = engine.register_balance(income(100_000)).await.unwrap();
    assert_eq!(first.balance_after, Money::new(100_000));

    let second = engine.register_balance(expense(30_000)).await.unwrap();
    assert_eq!(second.balance_after, Money::new(70_000));

    // Round-trip: the next read returns exactly the last balance_after.
    assert_eq!(engine.current_balance("alice").await, Money::new(70_000));
}

#[tokio::test]
async fn registration_matches_the_committed_aggregate() {
    let (engine, store, _clock) = engine_signed_in();

    engine.register_balance(income(50_000)).await.unwrap();
    let last = engine.register_balance(expense(12_500)).await.unwrap();

    let stats = store
        .get::<MonthlyStats>(&month_key(2026, 8, "alice"))
        .await
        .unwrap()
        .found()
        .unwrap();
    assert_eq!(stats.balance, last.balance_after);
    assert_eq!(stats.total_income, Money::new(50_000));
    assert_eq!(stats.total_expenses, Money::new(12_500));
}

#[tokio::test]
async fn adjustments_subtract_and_count_as_expenses() {
    let (engine, _store, _clock) = engine_signed_in();

    engine.register_balance(income(10_000)).await.unwrap();
    let adjusted = engine
        .register_balance(RegisterBalanceCmd::new(
            "alice",
            RegistrationKind::Adjustment,
            "Corrección",
            "Ajuste",
            Money::new(1_500),
        ))
        .await
        .unwrap();

    assert_eq!(adjusted.balance_after, Money::new(8_500));
    let stats = engine.monthly_stats("alice", 2026, 8).await.unwrap().unwrap();
    assert_eq!(stats.total_expenses, Money::new(1_500));
}

#[tokio::test]
async fn unauthenticated_calls_never_touch_the_store() {
    let (engine, store, _clock) = engine_for(MemoryAuth::new());

    let err = engine.register_balance(income(100)).await.unwrap_err();
    assert_eq!(err, EngineError::Unauthenticated);
    assert!(err.user_message().starts_with("Usuario no autenticado"));

    assert!(
        store
            .get::<MonthlyStats>(&month_key(2026, 8, "alice"))
            .await
            .unwrap()
            .found()
            .is_none()
    );
    assert!(engine.offline_queue().pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn a_session_for_another_user_is_rejected() {
    let (engine, _store, _clock) = engine_for(MemoryAuth::signed_in("bob"));
    let err = engine.register_balance(income(100)).await.unwrap_err();
    assert_eq!(err, EngineError::Unauthenticated);
}

#[tokio::test]
async fn non_positive_amounts_fail_validation_and_are_not_queued() {
    let (engine, _store, _clock) = engine_signed_in();

    let err = engine
        .submit_registration(RegisterBalanceCmd::new(
            "alice",
            RegistrationKind::Income,
            "Nada",
            "Ingreso",
            Money::ZERO,
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(engine.offline_queue().pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn first_registration_of_a_month_carries_the_previous_balance() {
    let (engine, _store, clock) = engine_signed_in();

    engine.register_balance(income(100_000)).await.unwrap();

    clock.set(Utc.with_ymd_and_hms(2026, 9, 2, 9, 0, 0).unwrap());
    let first_of_september = engine.register_balance(expense(10_000)).await.unwrap();
    assert_eq!(first_of_september.balance_after, Money::new(90_000));

    let stats = engine.monthly_stats("alice", 2026, 9).await.unwrap().unwrap();
    assert_eq!(stats.variation.previous_month_balance, Money::new(100_000));
    assert_eq!(stats.total_expenses, Money::new(10_000));
    assert_eq!(stats.total_income, Money::ZERO);
}

#[tokio::test]
async fn failed_writes_leave_no_partial_state() {
    let (engine, store, _clock) = engine_signed_in();
    engine.register_balance(income(40_000)).await.unwrap();

    store.set_offline(true);
    assert!(engine.register_balance(expense(5_000)).await.is_err());
    store.set_offline(false);

    // Neither the registration nor an aggregate change is visible.
    let history = engine.balance_history("alice", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(engine.current_balance("alice").await, Money::new(40_000));
}

#[tokio::test]
async fn retryable_failures_queue_and_the_sweep_replays_them() {
    let (engine, store, _clock) = engine_signed_in();
    engine.register_balance(income(40_000)).await.unwrap();

    store.set_offline(true);
    let outcome = engine.submit_registration(expense(15_000)).await.unwrap();
    let RegisterOutcome::Queued { error, .. } = outcome else {
        panic!("expected the registration to queue");
    };
    assert!(error.is_retryable());

    // Still offline: the sweep leaves the entry with a bumped retry count.
    let report = engine.sweep_pending().await.unwrap();
    assert_eq!(report.replayed, 0);
    assert_eq!(report.remaining, 1);
    let pending = engine.offline_queue().pending().await.unwrap();
    assert_eq!(pending[0].retry_count, 1);

    store.set_offline(false);
    let report = engine.sweep_pending().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert_eq!(report.remaining, 0);
    assert_eq!(engine.current_balance("alice").await, Money::new(25_000));
}

#[tokio::test]
async fn current_balance_prefers_the_cache_and_degrades_to_zero() {
    let (engine, store, clock) = engine_signed_in();
    engine.register_balance(income(60_000)).await.unwrap();

    // Populate the cache, then kill the backend: the cached value serves.
    assert_eq!(engine.current_balance("alice").await, Money::new(60_000));
    store.set_offline(true);
    assert_eq!(engine.current_balance("alice").await, Money::new(60_000));

    // Past the TTL the entry is gone and the read degrades to zero.
    clock.advance(Duration::minutes(6));
    assert_eq!(engine.current_balance("alice").await, Money::ZERO);

    store.set_offline(false);
    assert_eq!(engine.current_balance("alice").await, Money::new(60_000));
}

#[tokio::test]
async fn history_is_newest_first_and_respects_the_limit() {
    let (engine, _store, clock) = engine_signed_in();

    engine.register_balance(income(10_000)).await.unwrap();
    clock.advance(Duration::minutes(1));
    engine.register_balance(expense(2_000)).await.unwrap();
    clock.advance(Duration::minutes(1));
    engine.register_balance(expense(3_000)).await.unwrap();

    let history = engine.balance_history("alice", 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].amount, Money::new(3_000));
    assert_eq!(history[1].amount, Money::new(2_000));

    let full = engine.balance_history("alice", 10).await.unwrap();
    assert_eq!(full.len(), 3);
}

#[tokio::test]
async fn summary_folds_every_month_of_the_user() {
    let (engine, _store, clock) = engine_signed_in();

    engine.register_balance(income(100_000)).await.unwrap();
    engine.register_balance(expense(30_000)).await.unwrap();

    clock.set(Utc.with_ymd_and_hms(2026, 9, 2, 9, 0, 0).unwrap());
    engine.register_balance(income(50_000)).await.unwrap();

    let summary = engine.summary_stats("alice").await.unwrap();
    assert_eq!(summary.total_income, Money::new(150_000));
    assert_eq!(summary.total_expenses, Money::new(30_000));
    assert_eq!(summary.balance, Money::new(120_000));
    assert_eq!(summary.months, 2);
}

#[tokio::test]
async fn manual_correction_applies_the_suggested_record() {
    let (engine, _store, _clock) = engine_signed_in();
    engine.register_balance(income(100_000)).await.unwrap();

    // The user declares a real balance of 150000: delta +50000.
    let draft = suggest_record(Money::new(50_000));
    assert_eq!(draft.kind, RegistrationKind::Income);
    assert_eq!(draft.category, "Ingreso");

    let registrations = engine
        .apply_correction("alice", Money::new(50_000), &[draft])
        .await
        .unwrap();
    assert_eq!(registrations.len(), 1);
    assert_eq!(engine.current_balance("alice").await, Money::new(150_000));
}

#[tokio::test]
async fn corrections_with_mismatched_records_are_rejected() {
    let (engine, _store, _clock) = engine_signed_in();
    engine.register_balance(income(100_000)).await.unwrap();

    let draft = suggest_record(Money::new(40_000));
    let err = engine
        .apply_correction("alice", Money::new(50_000), &[draft])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.current_balance("alice").await, Money::new(100_000));
}

#[tokio::test]
async fn refresh_percentages_persists_the_breakdown() {
    let (engine, _store, _clock) = engine_signed_in();
    engine.register_balance(income(10_000)).await.unwrap();
    engine.register_balance(expense(6_000)).await.unwrap();

    let refreshed = engine.refresh_percentages("alice").await.unwrap().unwrap();
    assert_eq!(refreshed.percentages.needs, 36.0);
    assert_eq!(refreshed.percentages.wants, 24.0);
    assert_eq!(refreshed.percentages.savings, 40.0);
    assert_eq!(refreshed.percentages.investment, 0.0);

    // The patched aggregate is what later reads observe.
    let stored = engine.monthly_stats("alice", 2026, 8).await.unwrap().unwrap();
    assert_eq!(stored.percentages, refreshed.percentages);
}

#[tokio::test]
async fn refresh_percentages_without_registrations_is_a_no_op() {
    let (engine, _store, _clock) = engine_signed_in();
    assert!(engine.refresh_percentages("alice").await.unwrap().is_none());
}
