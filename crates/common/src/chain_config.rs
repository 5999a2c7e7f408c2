//! Per-chain configuration: fork activation heights, checkpoint cadence and
//! the mapping from chain names to EVM-compatible chain ids.

use dnero_crypto::keccak::keccak256;
use ethereum_types::U256;
use serde::{Deserialize, Serialize};

use crate::BlockHeight;

/// Block-height-gated behavior switches. Activation heights are chain
/// specific; below the activation height the old rule applies verbatim.
#[repr(u8)]
#[derive(Debug, PartialEq, Eq, PartialOrd, Hash, Clone, Copy, Serialize, Deserialize)]
pub enum Fork {
    /// Validators begin receiving per-block DToken rewards.
    ValidatorReward = 0,
    /// The versioned deposit-stake transaction variant is accepted.
    VersionedStake = 1,
    /// Smart-contract transactions are accepted.
    SmartContract = 2,
    /// Elite-edge staking is accepted.
    EliteEdge = 3,
    /// Minimum fee, minimum gas price and max gas limit switch to the
    /// higher "NewFee" schedule.
    NewFeeAdjustment = 4,
    /// Ethereum-compatible RPC endpoints begin honoring EIP-155 transactions.
    RpcCompatibility = 5,
    /// Staking reward distribution becomes sampled rather than exhaustive.
    SampleStakingReward = 6,
}

use Fork::*;

pub const FORKS: [Fork; 7] = [
    ValidatorReward,
    VersionedStake,
    SmartContract,
    EliteEdge,
    NewFeeAdjustment,
    RpcCompatibility,
    SampleStakingReward,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Chain identifier string ("mainnet", "testnet", "privatenet", ...).
    pub chain_id: String,

    /// Block heights at which each fork activates
    /// (None = never, 0 = active from genesis).
    pub fork_activation_heights: [Option<BlockHeight>; FORKS.len()],
}

impl ChainConfig {
    pub fn is_fork_activated(&self, fork: Fork, block_height: BlockHeight) -> bool {
        self.fork_activation_heights[fork as usize]
            .is_some_and(|activation_height| block_height >= activation_height)
    }

    pub fn activation_height(&self, fork: Fork) -> Option<BlockHeight> {
        self.fork_activation_heights[fork as usize]
    }

    pub fn mainnet() -> Self {
        Self {
            chain_id: "mainnet".to_string(),
            fork_activation_heights: [
                Some(4_164_982),  // ValidatorReward
                Some(5_877_350),  // VersionedStake
                Some(8_411_427),  // SmartContract
                Some(12_330_620), // EliteEdge
                Some(14_175_000), // NewFeeAdjustment
                Some(13_706_700), // RpcCompatibility
                Some(9_497_418),  // SampleStakingReward
            ],
        }
    }

    /// All forks active from genesis; used by local development chains and
    /// tests.
    pub fn privatenet() -> Self {
        Self {
            chain_id: "privatenet".to_string(),
            fork_activation_heights: [Some(0); FORKS.len()],
        }
    }

    /// The EVM-compatible chain id this chain advertises over Ethereum RPC.
    /// Known names map to fixed small integers; any other name hashes to a
    /// positive big integer.
    pub fn eth_chain_id(&self) -> U256 {
        eth_chain_id(&self.chain_id)
    }
}

pub fn eth_chain_id(chain_id: &str) -> U256 {
    match chain_id {
        "mainnet" => U256::from(1),
        "testnet_sapphire" => U256::from(3),
        "testnet_amber" => U256::from(4),
        "testnet" => U256::from(5),
        "privatenet" => U256::from(6),
        other => U256::from_big_endian(keccak256(other.as_bytes()).as_bytes()),
    }
}

/// The interval between checkpoints.
pub const CHECKPOINT_INTERVAL: u64 = 100;

/// Returns whether a block height is a checkpoint.
pub fn is_checkpoint_height(height: BlockHeight) -> bool {
    height % CHECKPOINT_INTERVAL == 1
}

/// Returns the height of the last checkpoint at or before `height`.
pub fn last_checkpoint_height(height: BlockHeight) -> BlockHeight {
    let multiple = height / CHECKPOINT_INTERVAL;
    CHECKPOINT_INTERVAL * multiple + 1
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fork_activation() {
        let config = ChainConfig::mainnet();
        assert!(!config.is_fork_activated(Fork::SmartContract, 8_411_426));
        assert!(config.is_fork_activated(Fork::SmartContract, 8_411_427));
        assert!(config.is_fork_activated(Fork::SmartContract, 8_411_428));
    }

    #[test]
    fn test_privatenet_all_active() {
        let config = ChainConfig::privatenet();
        for fork in FORKS {
            assert!(config.is_fork_activated(fork, 0));
        }
    }

    #[test]
    fn test_eth_chain_ids() {
        assert_eq!(eth_chain_id("mainnet"), U256::from(1));
        assert_eq!(eth_chain_id("testnet"), U256::from(5));
        assert_eq!(ChainConfig::privatenet().eth_chain_id(), U256::from(6));
        // Unknown names hash to something large and deterministic.
        let id = eth_chain_id("somechain");
        assert!(id > U256::from(u64::MAX));
        assert_eq!(id, eth_chain_id("somechain"));
    }

    #[test]
    fn test_checkpoint_heights() {
        assert!(is_checkpoint_height(1));
        assert!(is_checkpoint_height(101));
        assert!(!is_checkpoint_height(100));
        assert_eq!(last_checkpoint_height(150), 101);
        assert_eq!(last_checkpoint_height(101), 101);
        assert_eq!(last_checkpoint_height(99), 1);
    }
}
