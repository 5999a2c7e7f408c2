use dnero_rlp::error::RLPDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The probed key does not exist. Non-fatal: callers use this to answer
    /// "does it exist" questions; every other variant is an actual failure.
    #[error("key not found")]
    NotFound,
    #[error(transparent)]
    RLPDecode(#[from] RLPDecodeError),
    #[error("failed to lock store for access")]
    LockError,
    #[error("{0}")]
    Custom(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}
