//! Consensus-adjacent core types: the sorted stake candidate pools, the
//! aggregated sentry votes, and the minimal block surface the engines are
//! built around.

pub mod block;
pub mod elite_edge;
pub mod pool;
pub mod sentry;
pub mod validator;

use dnero_common::Hash;
use thiserror::Error;

pub use block::{Block, BlockHeader};
pub use elite_edge::{EliteEdgeNode, EliteEdgeNodePool};
pub use pool::{CandidatePool, PoolCandidate};
pub use sentry::{AggregatedVotes, Sentry, SentryCandidatePool};
pub use validator::ValidatorCandidatePool;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum PoolError {
    #[error("insufficient stake: {0}")]
    InsufficientStake(ethereum_types::U256),
    #[error("stake exceeds the elite edge node cap")]
    StakeExceedsCap,
    #[error("no matched stake holder address found: {0}")]
    HolderNotFound(ethereum_types::Address),
    #[error(transparent)]
    Stake(#[from] dnero_common::types::stake::StakeError),
}

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum VoteError {
    #[error("cannot merge incompatible votes")]
    IncompatibleVotes,
    #[error("signature multiplicities overflowed")]
    MultiplicityOverflow,
    #[error("pool hash mismatch: local {local:?}, vote {vote:?}")]
    PoolHashMismatch { local: Hash, vote: Hash },
    #[error("multiplies size {multiplies} is not equal to pool size {pool}")]
    MultipliesSizeMismatch { multiplies: usize, pool: usize },
    #[error("signature cannot be empty")]
    EmptySignature,
    #[error("signature verification failed")]
    SignatureVerificationFailed,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("sentry candidate pool unavailable as of block {0:?}")]
    PoolUnavailable(Hash),
    #[error("{0}")]
    Custom(String),
}

/// Handle into the ledger for the consensus engines. Wired at construction;
/// breaks the node/ledger/consensus reference cycle (the ledger never calls
/// back into consensus through this).
pub trait Ledger: Send + Sync {
    /// The sentry candidate pool as of the given block, a snapshot: later
    /// ledger mutations must not affect previously returned pools.
    fn get_sentry_candidate_pool(&self, block: Hash) -> Result<SentryCandidatePool, LedgerError>;
}
