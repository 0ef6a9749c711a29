//! Aggregate reads: cache-first balance, stats, history and summary.

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use serde_json::Map;
use tracing::warn;

use crate::{
    AuthProvider, BalanceRegistration, CacheKey, Clock, DocumentStore, EngineError,
    KeyValueStorage, Money, MonthlyStats, Percentages, Query, ResultEngine, SortOrder,
    StoreTransaction, Variation,
    monthly_stats::{month_key, previous_month},
    store::Document,
};

use super::{Engine, with_tx};

/// How many registrations a history fetch pulls from the store; callers
/// truncate below this.
const HISTORY_LIMIT: usize = 50;

/// All-time rollup across a user's monthly aggregates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_income: Money,
    pub total_expenses: Money,
    pub balance: Money,
    pub months: usize,
}

impl<S, K, A, C> Engine<S, K, A, C>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
    C: Clock + Clone,
{
    /// The user's current balance.
    ///
    /// Cache-first; a miss reads the current month's aggregate (absent
    /// aggregate means 0) and repopulates the cache. This read never fails:
    /// backend errors degrade to 0 with a logged warning, so the UI always
    /// has a number to show.
    pub async fn current_balance(&self, user_id: &str) -> Money {
        match self.current_balance_inner(user_id).await {
            Ok(balance) => balance,
            Err(err) => {
                warn!(user_id, error = %err, "balance read failed; defaulting to zero");
                Money::ZERO
            }
        }
    }

    async fn current_balance_inner(&self, user_id: &str) -> ResultEngine<Money> {
        let key = CacheKey::Balance { user_id };
        match self.cache.get::<Money>(key).await {
            Ok(Some(balance)) => return Ok(balance),
            Ok(None) => {}
            Err(err) => warn!(user_id, error = %err, "cache read failed; querying the store"),
        }

        let now = self.clock.now();
        let stats = self
            .store
            .get::<MonthlyStats>(&month_key(now.year(), now.month(), user_id))
            .await?
            .found();
        let balance = stats.map_or(Money::ZERO, |stats| stats.balance);

        if let Err(err) = self.cache.set(key, &balance).await {
            warn!(user_id, error = %err, "failed to cache balance");
        }
        Ok(balance)
    }

    /// The aggregate for one month, if any registrations touched it.
    pub async fn monthly_stats(
        &self,
        user_id: &str,
        year: i32,
        month: u32,
    ) -> ResultEngine<Option<MonthlyStats>> {
        let key = CacheKey::MonthlyStats {
            user_id,
            year,
            month,
        };
        match self.cache.get::<MonthlyStats>(key).await {
            Ok(Some(stats)) => return Ok(Some(stats)),
            Ok(None) => {}
            Err(err) => warn!(user_id, error = %err, "cache read failed; querying the store"),
        }

        let stats = self
            .store
            .get::<MonthlyStats>(&month_key(year, month, user_id))
            .await?
            .found();
        if let Some(stats) = &stats {
            if let Err(err) = self.cache.set(key, stats).await {
                warn!(user_id, error = %err, "failed to cache monthly stats");
            }
        }
        Ok(stats)
    }

    /// The user's most recent registrations, newest first.
    pub async fn balance_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> ResultEngine<Vec<BalanceRegistration>> {
        let limit = limit.min(HISTORY_LIMIT);
        let key = CacheKey::History { user_id };
        match self.cache.get::<Vec<BalanceRegistration>>(key).await {
            Ok(Some(mut history)) => {
                history.truncate(limit);
                return Ok(history);
            }
            Ok(None) => {}
            Err(err) => warn!(user_id, error = %err, "cache read failed; querying the store"),
        }

        let mut history = self
            .store
            .query::<BalanceRegistration>(
                Query::new()
                    .filter("userId", user_id)
                    .order_by("occurredAt", SortOrder::Descending)
                    .limit(HISTORY_LIMIT),
            )
            .await?;

        if let Err(err) = self.cache.set(key, &history).await {
            warn!(user_id, error = %err, "failed to cache history");
        }
        history.truncate(limit);
        Ok(history)
    }

    /// Lifetime totals folded over every monthly aggregate of the user.
    /// The balance reported is the latest month's.
    pub async fn summary_stats(&self, user_id: &str) -> ResultEngine<SummaryStats> {
        let key = CacheKey::Summary { user_id };
        match self.cache.get::<SummaryStats>(key).await {
            Ok(Some(summary)) => return Ok(summary),
            Ok(None) => {}
            Err(err) => warn!(user_id, error = %err, "cache read failed; querying the store"),
        }

        let months = self
            .store
            .query::<MonthlyStats>(Query::new().filter("userId", user_id))
            .await?;

        let summary = months.iter().fold(SummaryStats::default(), |acc, stats| {
            SummaryStats {
                total_income: acc.total_income + stats.total_income,
                total_expenses: acc.total_expenses + stats.total_expenses,
                balance: acc.balance,
                months: acc.months + 1,
            }
        });
        let latest = months
            .iter()
            .max_by_key(|stats| (stats.year, stats.month))
            .map_or(Money::ZERO, |stats| stats.balance);
        let summary = SummaryStats {
            balance: latest,
            ..summary
        };

        if let Err(err) = self.cache.set(key, &summary).await {
            warn!(user_id, error = %err, "failed to cache summary");
        }
        Ok(summary)
    }

    /// Recomputes the current month's percentage breakdown and variation
    /// from its totals and the previous month's balance, and patches the
    /// stored aggregate. Returns the refreshed aggregate, or `None` when
    /// the month has no registrations yet.
    pub async fn refresh_percentages(&self, user_id: &str) -> ResultEngine<Option<MonthlyStats>> {
        self.require_user(user_id)?;
        let now = self.clock.now();
        let (year, month) = (now.year(), now.month());
        let key = month_key(year, month, user_id);

        let refreshed = with_tx!(self, |tx| {
            let Some(mut stats) = tx.get::<MonthlyStats>(&key).await?.found() else {
                return Ok(None);
            };

            let (prev_year, prev_month) = previous_month(year, month);
            let carry_in = tx
                .get::<MonthlyStats>(&month_key(prev_year, prev_month, user_id))
                .await?
                .found()
                .map_or(Money::ZERO, |stats| stats.balance);

            stats.percentages = Percentages::calculate(stats.total_income, stats.total_expenses);
            stats.variation = Variation::between(carry_in, stats.balance);
            stats.updated_at = now;

            let mut patch = Map::new();
            patch.insert(
                "percentages".to_string(),
                serde_json::to_value(stats.percentages).map_err(crate::StoreError::from)?,
            );
            patch.insert(
                "variation".to_string(),
                serde_json::to_value(stats.variation).map_err(crate::StoreError::from)?,
            );
            patch.insert(
                "updatedAt".to_string(),
                serde_json::to_value(stats.updated_at).map_err(crate::StoreError::from)?,
            );
            tx.update(MonthlyStats::COLLECTION, &key, patch);
            Ok(Some(stats))
        })?;

        if refreshed.is_some() {
            if let Err(err) = self.cache.invalidate_balance(user_id).await {
                warn!(user_id, error = %err, "cache invalidation failed after refresh");
            }
        }
        Ok(refreshed)
    }
}
