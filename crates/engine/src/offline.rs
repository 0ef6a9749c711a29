//! Offline queue for writes that could not reach the backend.
//!
//! Operations whose failure classified as retryable are appended here and
//! replayed opportunistically by [`Engine::sweep_pending`]. Entries that
//! fail again stay queued with a bumped retry count; there is no backoff
//! and no retry cap; scheduling the sweep is the host's responsibility.
//!
//! [`Engine::sweep_pending`]: crate::Engine::sweep_pending

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{Clock, KeyValueStorage, RegisterBalanceCmd, StoreError};

const QUEUE_KEY: &str = "@sofinance:pending_operations";

/// The write a pending operation will re-invoke. Only balance
/// registrations are replayable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum PendingPayload {
    RegisterBalance(RegisterBalanceCmd),
}

/// One queued write.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOperation {
    pub id: Uuid,
    #[serde(flatten)]
    pub payload: PendingPayload,
    pub timestamp: DateTime<Utc>,
    pub retry_count: u32,
}

#[derive(Debug)]
pub struct OfflineQueue<S, C> {
    storage: S,
    clock: C,
}

impl<S: KeyValueStorage, C: Clock> OfflineQueue<S, C> {
    pub fn new(storage: S, clock: C) -> Self {
        Self { storage, clock }
    }

    /// Appends `payload` to the persisted queue.
    pub async fn save(&self, payload: PendingPayload) -> Result<PendingOperation, StoreError> {
        let operation = PendingOperation {
            id: Uuid::new_v4(),
            payload,
            timestamp: self.clock.now(),
            retry_count: 0,
        };
        let mut operations = self.pending().await?;
        operations.push(operation.clone());
        self.persist(&operations).await?;
        info!(operation_id = %operation.id, "queued operation for offline replay");
        Ok(operation)
    }

    /// Every queued operation, oldest first.
    pub async fn pending(&self) -> Result<Vec<PendingOperation>, StoreError> {
        match self.storage.get_item(QUEUE_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    /// Drops a replayed operation.
    pub async fn remove(&self, id: Uuid) -> Result<(), StoreError> {
        let mut operations = self.pending().await?;
        operations.retain(|op| op.id != id);
        if operations.is_empty() {
            self.storage.remove_item(QUEUE_KEY).await
        } else {
            self.persist(&operations).await
        }
    }

    /// Bumps the retry counter of an operation whose replay failed.
    pub async fn record_failure(&self, id: Uuid) -> Result<(), StoreError> {
        let mut operations = self.pending().await?;
        for operation in &mut operations {
            if operation.id == id {
                operation.retry_count += 1;
            }
        }
        self.persist(&operations).await
    }

    async fn persist(&self, operations: &[PendingOperation]) -> Result<(), StoreError> {
        let raw = serde_json::to_string(operations)?;
        self.storage.set_item(QUEUE_KEY, raw).await
    }
}
