//! Offline queue behavior, exercised against the in-memory backend.
//!
//! These live as integration tests (rather than `#[cfg(test)]` modules in
//! `engine`) because they depend on `memory_backend`, which in turn depends
//! on `engine`; keeping them here avoids pulling two copies of `engine` into
//! the lib-test target.

use chrono::{TimeZone, Utc};
use memory_backend::{ManualClock, MemoryStorage};

use engine::{Money, OfflineQueue, PendingPayload, RegisterBalanceCmd, RegistrationKind};

fn queue() -> OfflineQueue<MemoryStorage, ManualClock> {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap());
    OfflineQueue::new(MemoryStorage::new(), clock)
}

fn payload() -> PendingPayload {
    PendingPayload::RegisterBalance(RegisterBalanceCmd::new(
        "user-1",
        RegistrationKind::Expense,
        "Mercado",
        "Necesidad",
        Money::new(4_500),
    ))
}

#[tokio::test]
async fn save_appends_with_zero_retries() {
    let queue = queue();
    let saved = queue.save(payload()).await.unwrap();
    assert_eq!(saved.retry_count, 0);

    let pending = queue.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0], saved);
}

#[tokio::test]
async fn remove_drops_only_the_given_operation() {
    let queue = queue();
    let first = queue.save(payload()).await.unwrap();
    let second = queue.save(payload()).await.unwrap();

    queue.remove(first.id).await.unwrap();
    let pending = queue.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, second.id);
}

#[tokio::test]
async fn record_failure_bumps_retry_count() {
    let queue = queue();
    let saved = queue.save(payload()).await.unwrap();
    queue.record_failure(saved.id).await.unwrap();
    queue.record_failure(saved.id).await.unwrap();

    let pending = queue.pending().await.unwrap();
    assert_eq!(pending[0].retry_count, 2);
}

#[tokio::test]
async fn queue_round_trips_through_storage() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 8, 7, 12, 0, 0).unwrap());
    let storage = MemoryStorage::new();
    let queue = OfflineQueue::new(storage.clone(), clock.clone());
    queue.save(payload()).await.unwrap();

    // A fresh queue over the same storage sees the persisted entry.
    let reopened = OfflineQueue::new(storage, clock);
    let pending = reopened.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    match &pending[0].payload {
        PendingPayload::RegisterBalance(cmd) => {
            assert_eq!(cmd.amount, Money::new(4_500));
        }
    }
}
