//! The ledger writer and its offline companions.

use chrono::Datelike;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    AuthProvider, BalanceRegistration, Clock, DocumentStore, EngineError, KeyValueStorage, Money,
    MonthlyStats, PendingPayload, RegisterBalanceCmd, ResultEngine, StoreTransaction,
    monthly_stats::{month_key, previous_month},
};

use super::{Engine, with_tx};

/// What happened to a submitted registration.
#[derive(Debug)]
pub enum RegisterOutcome {
    /// The registration and its aggregate update committed.
    Committed(BalanceRegistration),
    /// The write failed with a retryable error and was queued for replay.
    Queued {
        operation_id: Uuid,
        error: EngineError,
    },
}

/// Result of one offline-queue sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub replayed: usize,
    pub remaining: usize,
}

impl<S, K, A, C> Engine<S, K, A, C>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
    C: Clock + Clone,
{
    /// Registers one balance event: computes the running balance, writes
    /// the immutable registration and the updated monthly aggregate in a
    /// single transaction, then invalidates the user's balance-derived
    /// cache entries.
    ///
    /// The aggregate read and both writes share one transaction, so either
    /// both documents commit or neither does, and `balance_after` on the
    /// registration always equals the aggregate balance written next to
    /// it. Contention aborts from the backend surface directly, with no
    /// local retry.
    pub async fn register_balance(
        &self,
        cmd: RegisterBalanceCmd,
    ) -> ResultEngine<BalanceRegistration> {
        self.require_user(&cmd.user_id)?;
        if !cmd.amount.is_positive() {
            return Err(EngineError::Validation(
                "el monto debe ser mayor a cero".to_string(),
            ));
        }

        let now = self.clock.now();
        let (year, month) = (now.year(), now.month());
        let key = month_key(year, month, &cmd.user_id);

        let registration = with_tx!(self, |tx| {
            let current = tx.get::<MonthlyStats>(&key).await?.found();
            let carry_in = match &current {
                Some(stats) => stats.balance,
                None => {
                    let (prev_year, prev_month) = previous_month(year, month);
                    tx.get::<MonthlyStats>(&month_key(prev_year, prev_month, &cmd.user_id))
                        .await?
                        .found()
                        .map_or(Money::ZERO, |stats| stats.balance)
                }
            };

            let balance_after = carry_in + cmd.kind.signed(cmd.amount);
            let registration = BalanceRegistration::new(
                cmd.user_id.clone(),
                cmd.kind,
                cmd.description.clone(),
                cmd.category.clone(),
                cmd.amount,
                balance_after,
                now,
            )?;

            let stats = match current {
                Some(mut stats) => {
                    stats.apply(cmd.kind, cmd.amount, now);
                    stats
                }
                None => MonthlyStats::seeded(
                    cmd.user_id.clone(),
                    year,
                    month,
                    cmd.kind,
                    cmd.amount,
                    carry_in,
                    now,
                ),
            };

            tx.set(&registration.id.to_string(), &registration)?;
            tx.set(&key, &stats)?;
            Ok(registration)
        })?;

        if let Err(err) = self.cache.invalidate_balance(&cmd.user_id).await {
            warn!(user_id = %cmd.user_id, error = %err, "cache invalidation failed after write");
        }
        Ok(registration)
    }

    /// Runs the ledger writer, queueing the command for offline replay when
    /// the failure is retryable. Non-retryable failures surface as errors.
    pub async fn submit_registration(
        &self,
        cmd: RegisterBalanceCmd,
    ) -> ResultEngine<RegisterOutcome> {
        match self.register_balance(cmd.clone()).await {
            Ok(registration) => Ok(RegisterOutcome::Committed(registration)),
            Err(error) if error.is_retryable() => {
                let operation = self.queue.save(PendingPayload::RegisterBalance(cmd)).await?;
                warn!(
                    operation_id = %operation.id,
                    error = %error,
                    "registration failed; queued for replay"
                );
                Ok(RegisterOutcome::Queued {
                    operation_id: operation.id,
                    error,
                })
            }
            Err(error) => Err(error),
        }
    }

    /// Replays every queued operation once. Successful replays leave the
    /// queue; failed ones stay with a bumped retry count for the next
    /// sweep. The caller schedules how often this runs.
    pub async fn sweep_pending(&self) -> ResultEngine<SweepReport> {
        let operations = self.queue.pending().await?;
        let mut replayed = 0;
        for operation in operations {
            let PendingPayload::RegisterBalance(cmd) = &operation.payload;
            match self.register_balance(cmd.clone()).await {
                Ok(registration) => {
                    self.queue.remove(operation.id).await?;
                    replayed += 1;
                    info!(
                        operation_id = %operation.id,
                        registration_id = %registration.id,
                        "replayed queued registration"
                    );
                }
                Err(error) => {
                    self.queue.record_failure(operation.id).await?;
                    warn!(
                        operation_id = %operation.id,
                        retries = operation.retry_count + 1,
                        error = %error,
                        "queued registration failed again"
                    );
                }
            }
        }
        let remaining = self.queue.pending().await?.len();
        Ok(SweepReport { replayed, remaining })
    }
}
