//! Fork-gated gas and fee schedule.

use ethereum_types::U256;

use crate::{
    BlockHeight,
    chain_config::{ChainConfig, Fork},
    constants::*,
};

pub fn minimum_gas_price(config: &ChainConfig, block_height: BlockHeight) -> U256 {
    if !config.is_fork_activated(Fork::NewFeeAdjustment, block_height) {
        return U256::from(MINIMUM_GAS_PRICE);
    }

    U256::from(MINIMUM_GAS_PRICE_NEW_FEE)
}

pub fn max_gas_limit(config: &ChainConfig, block_height: BlockHeight) -> U256 {
    if !config.is_fork_activated(Fork::NewFeeAdjustment, block_height) {
        return U256::from(MAXIMUM_TX_GAS_LIMIT);
    }

    U256::from(MAXIMUM_TX_GAS_LIMIT_NEW_FEE)
}

pub fn minimum_transaction_fee(config: &ChainConfig, block_height: BlockHeight) -> U256 {
    if !config.is_fork_activated(Fork::NewFeeAdjustment, block_height) {
        return U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI);
    }

    U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI_NEW_FEE)
}

/// Special handling for many-to-many sends:
/// `minSendTxFee = max(numAccountsAffected, 2) * newMinFee / 2`.
pub fn send_tx_minimum_fee(
    config: &ChainConfig,
    num_accounts_affected: u64,
    block_height: BlockHeight,
) -> U256 {
    if !config.is_fork_activated(Fork::NewFeeAdjustment, block_height) {
        return U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI); // backward compatibility
    }

    let num_accounts_affected = num_accounts_affected.max(2);

    U256::from(num_accounts_affected) * U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI_NEW_FEE)
        / U256::from(2)
}
