use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::{StoreEngine, error::StoreError};

/// HashMap-backed store engine, used by tests and ephemeral nodes.
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore(Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>);

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn inner(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Vec<u8>, Vec<u8>>>, StoreError> {
        self.0.lock().map_err(|_| StoreError::LockError)
    }
}

impl StoreEngine for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError> {
        self.inner()?.get(key).cloned().ok_or(StoreError::NotFound)
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError> {
        self.inner()?.insert(key.to_vec(), value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.inner()?.remove(key);
        Ok(())
    }
}
