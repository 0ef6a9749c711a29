use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use engine::{KeyValueStorage, StoreError};

/// In-memory key/value storage with the platform storage contract.
#[derive(Clone, Debug, Default)]
pub struct MemoryStorage {
    items: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn items(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.items.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KeyValueStorage for MemoryStorage {
    async fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items().get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.items().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items().remove(key);
        Ok(())
    }

    async fn multi_get(
        &self,
        keys: &[String],
    ) -> Result<Vec<(String, Option<String>)>, StoreError> {
        let items = self.items();
        Ok(keys
            .iter()
            .map(|key| (key.clone(), items.get(key).cloned()))
            .collect())
    }

    async fn multi_remove(&self, keys: &[String]) -> Result<(), StoreError> {
        let mut items = self.items();
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.items().keys().cloned().collect())
    }
}
