//! Key/value storage for the dnero node.
//!
//! [`StoreEngine`] is the minimal contract a database backend must provide:
//! raw `get`/`put`/`delete` over opaque byte keys, with a distinguished
//! [`StoreError::NotFound`] for absent keys. [`KvStore`] wraps an engine with
//! the typed RLP codec used project-wide. Backends must be crash-consistent at
//! the granularity of individual operations; multi-key atomicity is not
//! required by the components built on top (they are idempotent on replay).

pub mod error;
pub mod in_memory;

use std::sync::Arc;

use dnero_rlp::{decode::RLPDecode, encode::RLPEncode};

pub use error::StoreError;
pub use in_memory::InMemoryStore;

/// This trait provides the minimal set of operations required from a database
/// backend. Implementations should focus on providing efficient access to the
/// underlying storage without implementing business logic.
pub trait StoreEngine: Send + Sync + 'static {
    /// Retrieves a value by key, or [`StoreError::NotFound`].
    fn get(&self, key: &[u8]) -> Result<Vec<u8>, StoreError>;

    /// Stores a key/value pair, overwriting any previous value.
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<(), StoreError>;

    /// Removes a key/value pair. Removing an absent key is not an error.
    fn delete(&self, key: &[u8]) -> Result<(), StoreError>;
}

/// Typed store handle shared across components. Values are serialized with
/// the project-wide RLP codec.
#[derive(Clone)]
pub struct KvStore {
    engine: Arc<dyn StoreEngine>,
}

impl KvStore {
    pub fn new(engine: Arc<dyn StoreEngine>) -> Self {
        Self { engine }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn get<T: RLPDecode>(&self, key: &[u8]) -> Result<T, StoreError> {
        let raw = self.engine.get(key)?;
        Ok(T::decode(&raw)?)
    }

    pub fn put<T: RLPEncode>(&self, key: &[u8], value: &T) -> Result<(), StoreError> {
        self.engine.put(key, value.encode_to_vec())
    }

    pub fn delete(&self, key: &[u8]) -> Result<(), StoreError> {
        self.engine.delete(key)
    }

    /// Existence probe; any error other than [`StoreError::NotFound`] is
    /// propagated.
    pub fn contains(&self, key: &[u8]) -> Result<bool, StoreError> {
        match self.engine.get(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_put_get_roundtrip() {
        let store = KvStore::in_memory();
        store.put(b"height", &42u64).unwrap();
        assert_eq!(store.get::<u64>(b"height").unwrap(), 42);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = KvStore::in_memory();
        let err = store.get::<u64>(b"missing").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete() {
        let store = KvStore::in_memory();
        store.put(b"k", &7u8).unwrap();
        store.delete(b"k").unwrap();
        assert!(store.get::<u8>(b"k").unwrap_err().is_not_found());
        // Deleting again is a no-op.
        store.delete(b"k").unwrap();
    }

    #[test]
    fn test_contains() {
        let store = KvStore::in_memory();
        assert!(!store.contains(b"k").unwrap());
        store.put(b"k", &1u8).unwrap();
        assert!(store.contains(b"k").unwrap());
    }

    #[test]
    fn test_overwrite() {
        let store = KvStore::in_memory();
        store.put(b"k", &1u64).unwrap();
        store.put(b"k", &2u64).unwrap();
        assert_eq!(store.get::<u64>(b"k").unwrap(), 2);
    }
}
