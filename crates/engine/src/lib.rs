//! SoFinance balance engine.
//!
//! The library maintains a per-user running balance over a stream of
//! income/expense/adjustment events, keeps per-month aggregates consistent
//! with the ledger, and fronts the server-of-record with a TTL cache and an
//! offline replay queue. The backend document store, the auth provider, the
//! local key/value storage and the clock are injected ports; see
//! [`DocumentStore`], [`AuthProvider`], [`KeyValueStorage`] and [`Clock`].
//!
//! Writes go through [`Engine::register_balance`] (or
//! [`Engine::submit_registration`] for offline-aware submission); reads go
//! through [`Engine::current_balance`] and friends. Manual corrections are
//! validated by the [`records`] rules before
//! [`Engine::apply_correction`] turns them into registrations.

pub use auth::{AuthProvider, UserSession};
pub use cache::{Cache, CacheConfig, CacheKey, CacheStats};
pub use clock::{Clock, SystemClock};
pub use commands::RegisterBalanceCmd;
pub use error::{EngineError, StoreError};
pub use money::Money;
pub use monthly_stats::{MonthlyStats, Percentages, Variation, month_key, previous_month};
pub use offline::{OfflineQueue, PendingOperation, PendingPayload};
pub use ops::{Engine, EngineBuilder, RegisterOutcome, SummaryStats, SweepReport};
pub use records::{
    BalanceRecord, INCOME_CATEGORY, NEED_CATEGORY, RECONCILE_TOLERANCE, absolute_total, net_total,
    suggest_record, validate_records,
};
pub use registrations::{BalanceRegistration, RegistrationKind};
pub use store::{DocRead, Document, DocumentStore, Query, SortOrder, StoreTransaction};
pub use storage::KeyValueStorage;

mod auth;
mod cache;
mod clock;
mod commands;
mod error;
mod money;
mod monthly_stats;
mod offline;
mod ops;
pub mod records;
mod registrations;
mod storage;
mod store;

type ResultEngine<T> = Result<T, EngineError>;
