//! Block persistence and the transaction index/receipt stores.
//!
//! Every persisted record lives under a byte-prefixed key in the shared
//! key/value store: `"block/" ‖ hash` for blocks, `"tx/" ‖ hash` for index
//! entries, `"txr/" ‖ hash` for receipts. Smart-contract transactions that
//! were signed with an Ethereum wallet get indexed twice, under both the
//! native and the recomputed Ethereum legacy hash, so RPC lookups succeed for
//! whichever hash the submitter computed.

pub mod error;
pub mod tx_index;

use dnero_common::Hash;
use dnero_core::Block;
use dnero_storage::{KvStore, StoreError};

pub use error::ChainError;
pub use tx_index::{TxIndexEntry, TxReceiptEntry};

/// DB key for the given block hash.
fn block_key(hash: Hash) -> Vec<u8> {
    [b"block/".as_slice(), hash.as_bytes()].concat()
}

/// The canonical chain of finalized blocks, backed by the key/value store.
#[derive(Clone, Debug)]
pub struct Chain {
    pub chain_id: String,
    store: KvStore,
}

impl Chain {
    pub fn new(chain_id: impl Into<String>, store: KvStore) -> Self {
        Self {
            chain_id: chain_id.into(),
            store,
        }
    }

    pub fn store(&self) -> &KvStore {
        &self.store
    }

    /// Persists a block and indexes its transactions.
    pub fn add_block(&self, block: &Block) -> Result<Hash, ChainError> {
        let hash = block.hash();
        self.store.put(&block_key(hash), block)?;
        self.add_txs_to_index(block, false)?;
        Ok(hash)
    }

    pub fn find_block(&self, hash: Hash) -> Result<Option<Block>, ChainError> {
        match self.store.get::<Block>(&block_key(hash)) {
            Ok(block) => Ok(Some(block)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
