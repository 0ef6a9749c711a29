use std::{
    cmp::Ordering,
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::{Map, Value};

use engine::{DocRead, Document, DocumentStore, Query, SortOrder, StoreError, StoreTransaction};

type Collections = HashMap<String, HashMap<String, Value>>;
type VersionKey = (String, String);

#[derive(Debug, Default)]
struct Inner {
    collections: Collections,
    versions: HashMap<VersionKey, u64>,
    next_version: u64,
    offline: bool,
}

impl Inner {
    fn version_of(&self, collection: &str, id: &str) -> u64 {
        self.versions
            .get(&(collection.to_string(), id.to_string()))
            .copied()
            .unwrap_or(0)
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline {
            return Err(StoreError::Unavailable("backend offline".to_string()));
        }
        Ok(())
    }
}

/// In-memory transactional document store.
///
/// Transactions read from a snapshot taken at `begin` and commit with a
/// compare-and-swap over every document they read: if any of those
/// documents changed in the meantime the commit fails as `Unavailable`
/// ("transaction conflict"), matching how a contended backend transaction
/// surfaces to the engine.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail as `Unavailable` until turned
    /// back on. For exercising failure paths.
    pub fn set_offline(&self, offline: bool) {
        self.inner().offline = offline;
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DocumentStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let inner = self.inner();
        inner.ensure_online()?;
        Ok(MemoryTransaction {
            store: Arc::clone(&self.inner),
            snapshot: inner.collections.clone(),
            snapshot_versions: inner.versions.clone(),
            read_versions: HashMap::new(),
            writes: Vec::new(),
        })
    }

    async fn get<T: Document>(&self, id: &str) -> Result<DocRead<T>, StoreError> {
        let inner = self.inner();
        inner.ensure_online()?;
        read_from(&inner.collections, T::COLLECTION, id)
    }

    async fn set<T: Document>(&self, id: &str, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        let mut inner = self.inner();
        inner.ensure_online()?;
        apply_set(&mut inner, T::COLLECTION, id, value);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner();
        inner.ensure_online()?;
        apply_update(&mut inner, collection, id, patch)
    }

    async fn query<T: Document>(&self, query: Query) -> Result<Vec<T>, StoreError> {
        let inner = self.inner();
        inner.ensure_online()?;
        let docs = inner
            .collections
            .get(T::COLLECTION)
            .map(|docs| docs.values().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        drop(inner);

        let mut matches: Vec<Value> = docs
            .into_iter()
            .filter(|doc| {
                query
                    .filters
                    .iter()
                    .all(|(field, expected)| doc.get(field) == Some(expected))
            })
            .collect();

        if let Some((field, order)) = &query.order_by {
            matches.sort_by(|a, b| {
                let ordering = compare_fields(a.get(field), b.get(field));
                match order {
                    SortOrder::Ascending => ordering,
                    SortOrder::Descending => ordering.reverse(),
                }
            });
        }
        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }

        matches
            .into_iter()
            .map(|doc| serde_json::from_value(doc).map_err(StoreError::from))
            .collect()
    }
}

/// Buffered transaction over a [`MemoryStore`] snapshot.
#[derive(Debug)]
pub struct MemoryTransaction {
    store: Arc<Mutex<Inner>>,
    snapshot: Collections,
    snapshot_versions: HashMap<VersionKey, u64>,
    read_versions: HashMap<VersionKey, u64>,
    writes: Vec<WriteOp>,
}

#[derive(Debug)]
enum WriteOp {
    Set {
        collection: String,
        id: String,
        value: Value,
    },
    Update {
        collection: String,
        id: String,
        patch: Map<String, Value>,
    },
}

impl StoreTransaction for MemoryTransaction {
    async fn get<T: Document>(&mut self, id: &str) -> Result<DocRead<T>, StoreError> {
        let key = (T::COLLECTION.to_string(), id.to_string());
        let snapshot_version = self.snapshot_versions.get(&key).copied().unwrap_or(0);
        self.read_versions.entry(key).or_insert(snapshot_version);

        // Read-your-writes: a value buffered in this transaction wins over
        // the snapshot.
        for write in self.writes.iter().rev() {
            if let WriteOp::Set {
                collection,
                id: write_id,
                value,
            } = write
                && collection.as_str() == T::COLLECTION
                && write_id.as_str() == id
            {
                return Ok(DocRead::Found(serde_json::from_value(value.clone())?));
            }
        }

        read_from(&self.snapshot, T::COLLECTION, id)
    }

    fn set<T: Document>(&mut self, id: &str, doc: &T) -> Result<(), StoreError> {
        let value = serde_json::to_value(doc)?;
        self.writes.push(WriteOp::Set {
            collection: T::COLLECTION.to_string(),
            id: id.to_string(),
            value,
        });
        Ok(())
    }

    fn update(&mut self, collection: &str, id: &str, patch: Map<String, Value>) {
        self.writes.push(WriteOp::Update {
            collection: collection.to_string(),
            id: id.to_string(),
            patch,
        });
    }

    async fn commit(self) -> Result<(), StoreError> {
        let mut inner = self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.ensure_online()?;

        for ((collection, id), read_version) in &self.read_versions {
            if inner.version_of(collection, id) != *read_version {
                return Err(StoreError::Unavailable(
                    "transaction conflict".to_string(),
                ));
            }
        }

        for write in self.writes {
            match write {
                WriteOp::Set {
                    collection,
                    id,
                    value,
                } => apply_set(&mut inner, &collection, &id, value),
                WriteOp::Update {
                    collection,
                    id,
                    patch,
                } => apply_update(&mut inner, &collection, &id, patch)?,
            }
        }
        Ok(())
    }
}

fn read_from<T: Document>(
    collections: &Collections,
    collection: &str,
    id: &str,
) -> Result<DocRead<T>, StoreError> {
    match collections.get(collection).and_then(|docs| docs.get(id)) {
        Some(value) => Ok(DocRead::Found(serde_json::from_value(value.clone())?)),
        None => Ok(DocRead::Missing),
    }
}

fn apply_set(inner: &mut Inner, collection: &str, id: &str, value: Value) {
    inner
        .collections
        .entry(collection.to_string())
        .or_default()
        .insert(id.to_string(), value);
    inner.next_version += 1;
    let version = inner.next_version;
    inner
        .versions
        .insert((collection.to_string(), id.to_string()), version);
}

fn apply_update(
    inner: &mut Inner,
    collection: &str,
    id: &str,
    patch: Map<String, Value>,
) -> Result<(), StoreError> {
    let doc = inner
        .collections
        .get_mut(collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
    if let Value::Object(fields) = doc {
        for (key, value) in patch {
            fields.insert(key, value);
        }
    }
    inner.next_version += 1;
    let version = inner.next_version;
    inner
        .versions
        .insert((collection.to_string(), id.to_string()), version);
    Ok(())
}

fn compare_fields(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            match (a.as_f64(), b.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
                _ => Ordering::Equal,
            }
        }
        (Some(a), Some(b)) => a.to_string().cmp(&b.to_string()),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}
