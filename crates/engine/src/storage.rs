//! Persistent local key/value storage port.
//!
//! Backs the cache layer and the offline queue. The shape follows the
//! platform storage contract: string keys, string values, batched get and
//! remove.

use crate::StoreError;

#[allow(async_fn_in_trait)]
pub trait KeyValueStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, StoreError>;

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError>;

    /// All stored keys. Used for prefix scans (expiry sweep, stats).
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}
