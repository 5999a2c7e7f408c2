//! Validation helpers shared across executors.

use dnero_common::{
    BlockHeight,
    chain_config::ChainConfig,
    fees,
    types::{Account, Coins, TxInput},
};
use dnero_crypto::ecdsa::verify_signature;
use ethereum_types::{Address, U256};
use tracing::debug;

use crate::{error::ExecutionError, state::StoreView};

/// Resolves the account a transaction input draws from.
pub fn get_input(view: &StoreView, input: &TxInput) -> Result<Account, ExecutionError> {
    view.get_account(input.address)?
        .ok_or(ExecutionError::AccountNotFound(input.address))
}

/// Basic shape validation, before any state is consulted.
pub fn validate_input_basic(input: &TxInput) -> Result<(), ExecutionError> {
    if input.address == Address::zero() {
        return Err(ExecutionError::InvalidInput("empty input address"));
    }
    Ok(())
}

/// Signature and sequence validation against the resolved account.
pub fn validate_input_advanced(
    account: &Account,
    signing_bytes: &[u8],
    input: &TxInput,
) -> Result<(), ExecutionError> {
    let expected = account.sequence + 1;
    if input.sequence != expected {
        debug!(
            address = %input.address,
            expected,
            got = input.sequence,
            "Invalid input sequence"
        );
        return Err(ExecutionError::InvalidSequence {
            expected,
            got: input.sequence,
        });
    }

    if !verify_signature(signing_bytes, &input.signature, input.address) {
        return Err(ExecutionError::InvalidSignature);
    }
    Ok(())
}

/// Fees are paid in DToken only and must meet the fork-gated minimum.
pub fn sanity_check_for_fee(
    config: &ChainConfig,
    fee: &Coins,
    block_height: BlockHeight,
) -> Result<(), ExecutionError> {
    let minimum = fees::minimum_transaction_fee(config, block_height);
    if !fee.dnero_wei.is_zero() || fee.dtoken_wei < minimum {
        return Err(ExecutionError::InvalidFee(minimum));
    }
    Ok(())
}

/// Fee check for sends, which scale with the number of accounts touched.
pub fn sanity_check_for_send_tx_fee(
    config: &ChainConfig,
    fee: &Coins,
    num_accounts_affected: u64,
    block_height: BlockHeight,
) -> Result<(), ExecutionError> {
    let minimum = fees::send_tx_minimum_fee(config, num_accounts_affected, block_height);
    if !fee.dnero_wei.is_zero() || fee.dtoken_wei < minimum {
        return Err(ExecutionError::InvalidFee(minimum));
    }
    Ok(())
}

pub fn sanity_check_for_gas_price(
    config: &ChainConfig,
    gas_price: U256,
    block_height: BlockHeight,
) -> Result<(), ExecutionError> {
    let minimum = fees::minimum_gas_price(config, block_height);
    if gas_price < minimum {
        return Err(ExecutionError::InvalidGasPrice(minimum));
    }
    Ok(())
}

/// Deducts the fee from the account balance; false if it cannot be covered.
pub fn charge_fee(account: &mut Account, fee: &Coins) -> bool {
    match account.balance.checked_sub(fee) {
        Some(remaining) => {
            account.balance = remaining;
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dnero_common::constants::MINIMUM_TRANSACTION_FEE_DTOKEN_WEI;

    #[test]
    fn test_charge_fee() {
        let mut account = Account::new(Coins::new(U256::from(5), U256::from(100)));
        assert!(charge_fee(&mut account, &Coins::dtoken(U256::from(40))));
        assert_eq!(account.balance.dtoken_wei, U256::from(60));
        assert!(!charge_fee(&mut account, &Coins::dtoken(U256::from(61))));
        // Balance untouched after a failed charge.
        assert_eq!(account.balance.dtoken_wei, U256::from(60));
    }

    #[test]
    fn test_fee_must_be_dtoken_only() {
        let config = ChainConfig::mainnet();
        let ok_fee = Coins::dtoken(U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI));
        assert!(sanity_check_for_fee(&config, &ok_fee, 1).is_ok());

        let mut dnero_fee = ok_fee;
        dnero_fee.dnero_wei = U256::from(1);
        assert!(sanity_check_for_fee(&config, &dnero_fee, 1).is_err());

        let low_fee = Coins::dtoken(U256::from(MINIMUM_TRANSACTION_FEE_DTOKEN_WEI - 1));
        assert!(sanity_check_for_fee(&config, &low_fee, 1).is_err());
    }
}
