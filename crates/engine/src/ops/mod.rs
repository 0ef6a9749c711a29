use crate::{
    AuthProvider, Cache, CacheConfig, Clock, DocumentStore, EngineError, KeyValueStorage,
    OfflineQueue, ResultEngine, SystemClock,
};

mod balances;
mod reconcile;
mod register;

pub use register::{RegisterOutcome, SweepReport};

pub use balances::SummaryStats;

/// Run a block inside a store transaction, committing on success and
/// discarding the buffered writes on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let mut $tx = $self.store.begin().await.map_err(EngineError::from)?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await.map_err(EngineError::from)?;
                Ok::<_, EngineError>(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The balance engine: ledger writes, aggregate reads, cache coherency and
/// offline replay over injected backend ports.
#[derive(Debug)]
pub struct Engine<S, K, A, C> {
    store: S,
    auth: A,
    clock: C,
    cache: Cache<K, C>,
    queue: OfflineQueue<K, C>,
}

impl<S, K, A> Engine<S, K, A, SystemClock>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
{
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder(store: S, storage: K, auth: A) -> EngineBuilder<S, K, A, SystemClock> {
        EngineBuilder {
            store,
            storage,
            auth,
            clock: SystemClock,
            cache_config: CacheConfig::default(),
        }
    }
}

impl<S, K, A, C> Engine<S, K, A, C>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
    C: Clock + Clone,
{
    /// The cache layer, exposed for maintenance (stats, expiry sweeps).
    pub fn cache(&self) -> &Cache<K, C> {
        &self.cache
    }

    /// The offline queue, exposed for inspection.
    pub fn offline_queue(&self) -> &OfflineQueue<K, C> {
        &self.queue
    }

    pub(crate) fn require_user(&self, user_id: &str) -> ResultEngine<()> {
        match self.auth.current_user() {
            Some(session) if session.user_id == user_id => Ok(()),
            _ => Err(EngineError::Unauthenticated),
        }
    }
}

/// The builder for `Engine`.
pub struct EngineBuilder<S, K, A, C> {
    store: S,
    storage: K,
    auth: A,
    clock: C,
    cache_config: CacheConfig,
}

impl<S, K, A, C> EngineBuilder<S, K, A, C>
where
    S: DocumentStore,
    K: KeyValueStorage + Clone,
    A: AuthProvider,
    C: Clock + Clone,
{
    /// Replace the wall clock, mainly to pin time in tests.
    pub fn clock<C2: Clock + Clone>(self, clock: C2) -> EngineBuilder<S, K, A, C2> {
        EngineBuilder {
            store: self.store,
            storage: self.storage,
            auth: self.auth,
            clock,
            cache_config: self.cache_config,
        }
    }

    /// Override the cache TTL table.
    #[must_use]
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.cache_config = config;
        self
    }

    /// Construct `Engine`.
    pub fn build(self) -> Engine<S, K, A, C> {
        let cache = Cache::new(self.storage.clone(), self.clock.clone(), self.cache_config);
        let queue = OfflineQueue::new(self.storage, self.clock.clone());
        Engine {
            store: self.store,
            auth: self.auth,
            clock: self.clock,
            cache,
            queue,
        }
    }
}
