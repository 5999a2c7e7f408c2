use dnero_rlp::error::RLPDecodeError;
use dnero_storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error("transaction index {index} out of range for block {block:?}")]
    InvalidTxIndex { block: dnero_common::Hash, index: u64 },
}
