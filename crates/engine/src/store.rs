//! Document store port.
//!
//! The backend is an opaque transactional document store; the engine only
//! relies on the capability set `{read, write, shallow patch, equality
//! query, atomic multi-document transaction}`. Reads return [`DocRead`]
//! instead of a nullable value, and transaction handles expose the same
//! narrow typed surface as the store itself plus `commit`.
//!
//! Transaction semantics expected from implementations: snapshot-isolated
//! reads and a compare-and-swap commit over the read set. The engine adds
//! no retry of its own; a contention abort surfaces to the caller.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::StoreError;

/// A type persisted in the document store, tied to its collection.
pub trait Document: Serialize + DeserializeOwned {
    const COLLECTION: &'static str;
}

/// Outcome of a document read.
///
/// A missing document is an expected state, not an error: the monthly
/// aggregate is created lazily and the ledger writer probes for it on
/// every registration.
#[derive(Clone, Debug, PartialEq)]
pub enum DocRead<T> {
    Found(T),
    Missing,
}

impl<T> DocRead<T> {
    /// Converts to `Option`, discarding the distinction at call sites that
    /// only care about presence.
    pub fn found(self) -> Option<T> {
        match self {
            Self::Found(doc) => Some(doc),
            Self::Missing => None,
        }
    }
}

/// Sort direction for [`Query::order_by`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Equality-filtered query over one collection.
#[derive(Clone, Debug, Default)]
pub struct Query {
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some((field.into(), order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Handle to the backend document store.
#[allow(async_fn_in_trait)]
pub trait DocumentStore {
    type Tx: StoreTransaction;

    /// Opens a transaction with a snapshot-isolated view of the store.
    async fn begin(&self) -> Result<Self::Tx, StoreError>;

    /// Reads one document by id.
    async fn get<T: Document>(&self, id: &str) -> Result<DocRead<T>, StoreError>;

    /// Creates or replaces one document.
    async fn set<T: Document>(&self, id: &str, doc: &T) -> Result<(), StoreError>;

    /// Shallow-merges `patch` into an existing document.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Runs an equality query against `T`'s collection.
    async fn query<T: Document>(&self, query: Query) -> Result<Vec<T>, StoreError>;
}

/// Transaction handle: same typed operations, atomic commit.
///
/// Writes are buffered until [`commit`](Self::commit); dropping the handle
/// without committing discards them.
#[allow(async_fn_in_trait)]
pub trait StoreTransaction {
    async fn get<T: Document>(&mut self, id: &str) -> Result<DocRead<T>, StoreError>;

    fn set<T: Document>(&mut self, id: &str, doc: &T) -> Result<(), StoreError>;

    fn update(&mut self, collection: &str, id: &str, patch: Map<String, Value>);

    async fn commit(self) -> Result<(), StoreError>;
}
