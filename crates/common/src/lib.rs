pub mod chain_config;
pub mod constants;
pub mod fees;
pub mod types;

pub use ethereum_types::{Address, H256, U256};

/// 32-byte content identifier.
pub type Hash = ethereum_types::H256;

/// 65-byte recoverable secp256k1 signature `r ‖ s ‖ recovery_id`.
pub type Signature = ethereum_types::Signature;

/// Block height.
pub type BlockHeight = u64;
