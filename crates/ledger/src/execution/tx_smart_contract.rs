use std::sync::Arc;

use dnero_blockchain::Chain;
use dnero_common::{
    Hash,
    chain_config::{ChainConfig, Fork},
    fees,
    types::{Coins, SmartContractTx, Tx},
};
use ethereum_types::U256;
use tracing::debug;

use crate::{
    error::ExecutionError,
    execution::{
        TxExecutor,
        executils::{
            charge_fee, get_input, sanity_check_for_gas_price, validate_input_advanced,
            validate_input_basic,
        },
        vm::Evm,
    },
    state::StoreView,
};

pub struct SmartContractTxExecutor {
    config: ChainConfig,
    chain: Chain,
    evm: Arc<dyn Evm>,
}

impl SmartContractTxExecutor {
    pub fn new(config: ChainConfig, chain: Chain, evm: Arc<dyn Evm>) -> Self {
        Self { config, chain, evm }
    }

    fn cast(tx: &Tx) -> Result<&SmartContractTx, ExecutionError> {
        match tx {
            Tx::SmartContract(tx) => Ok(tx),
            _ => Err(ExecutionError::InvalidInput(
                "not a smart contract transaction",
            )),
        }
    }
}

impl TxExecutor for SmartContractTxExecutor {
    fn sanity_check(&self, view: &StoreView, tx_enum: &Tx) -> Result<(), ExecutionError> {
        let block_height = view.height() + 1;
        let tx = Self::cast(tx_enum)?;

        if !self
            .config
            .is_fork_activated(Fork::SmartContract, block_height)
        {
            return Err(ExecutionError::FeatureNotActive);
        }

        validate_input_basic(&tx.from)?;

        let from_account = get_input(view, &tx.from)?;

        let signing_bytes = tx_enum.signing_bytes(&self.config.chain_id);
        validate_input_advanced(&from_account, &signing_bytes, &tx.from).inspect_err(|err| {
            debug!(from = %tx.from.address, %err, "Input validation failed")
        })?;

        sanity_check_for_gas_price(&self.config, tx.gas_price, block_height)?;

        let max_gas_limit = fees::max_gas_limit(&self.config, block_height);
        if U256::from(tx.gas_limit) > max_gas_limit {
            return Err(ExecutionError::InvalidGasLimit(max_gas_limit));
        }

        // Conservative overflow guard on the worst-case fee.
        let fee_limit = tx
            .gas_price
            .checked_mul(U256::from(tx.gas_limit))
            .ok_or(ExecutionError::FeeLimitTooHigh)?;
        let value = tx.from.coins.dtoken_wei;
        let minimal_balance = Coins::dtoken(
            fee_limit
                .checked_add(value)
                .ok_or(ExecutionError::FeeLimitTooHigh)?,
        );
        if !from_account.balance.is_gte(&minimal_balance) {
            debug!(from = %tx.from.address, "Source does not have enough balance");
            return Err(ExecutionError::InsufficientFund);
        }

        Ok(())
    }

    fn process(&self, view: &mut StoreView, tx_enum: &Tx) -> Result<Hash, ExecutionError> {
        let tx = Self::cast(tx_enum)?;

        // The EVM may transfer coins from the sender (e.g. on deployment),
        // so it runs before the account is re-read for fee charging.
        let result = self.evm.execute(view, tx);

        let from_address = tx.from.address;
        let mut from_account = get_input(view, &tx.from)?;

        let fee_amount = tx.gas_price * U256::from(result.gas_used);
        if !charge_fee(&mut from_account, &Coins::dtoken(fee_amount)) {
            return Err(ExecutionError::Generic(
                "failed to charge transaction fee".to_string(),
            ));
        }

        from_account.sequence += 1;
        view.set_account(from_address, &from_account)?;

        // Events from a reverted execution are not recorded.
        let logs = if result.error.is_some() {
            Vec::new()
        } else {
            result.logs
        };
        self.chain
            .add_tx_receipt(
                tx_enum,
                logs,
                result.ret,
                result.contract_address,
                result.gas_used,
                result.error,
            )
            .map_err(|err| ExecutionError::Generic(err.to_string()))?;

        Ok(tx_enum.tx_id(&self.config.chain_id))
    }

    fn effective_gas_price(&self, tx: &Tx) -> U256 {
        match tx {
            Tx::SmartContract(tx) => tx.gas_price,
            _ => U256::zero(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use dnero_common::constants::{MAXIMUM_TX_GAS_LIMIT_NEW_FEE, MINIMUM_GAS_PRICE_NEW_FEE};
    use dnero_common::types::{Account, Log, TxInput, TxOutput};
    use dnero_crypto::{ecdsa::PrivateKey, keccak::keccak256};
    use dnero_storage::KvStore;
    use ethereum_types::Address;
    use rand::rngs::OsRng;

    use crate::execution::vm::EvmResult;

    /// EVM stub: transfers nothing, burns a fixed amount of gas and emits
    /// one log.
    struct FixedGasEvm {
        gas_used: u64,
        error: Option<String>,
    }

    impl Evm for FixedGasEvm {
        fn execute(&self, _view: &mut StoreView, tx: &SmartContractTx) -> EvmResult {
            EvmResult {
                ret: Bytes::from_static(b"\x01"),
                contract_address: Address::zero(),
                gas_used: self.gas_used,
                logs: vec![Log {
                    address: tx.to.address,
                    topics: vec![],
                    data: Bytes::from_static(b"called"),
                }],
                error: self.error.clone(),
            }
        }
    }

    fn harness(evm: Arc<dyn Evm>) -> (SmartContractTxExecutor, StoreView, PrivateKey, Chain) {
        let config = ChainConfig::privatenet();
        let store = KvStore::in_memory();
        let chain = Chain::new(config.chain_id.clone(), store.clone());
        let mut view = StoreView::new(store, 10);
        let key = PrivateKey::generate(&mut OsRng);
        view.set_account(
            key.address(),
            &Account::new(Coins::dtoken(U256::exp10(24))),
        )
        .unwrap();
        (
            SmartContractTxExecutor::new(config, chain.clone(), evm),
            view,
            key,
            chain,
        )
    }

    fn signed_contract_tx(key: &PrivateKey, gas_price: U256, gas_limit: u64) -> Tx {
        let mut tx = SmartContractTx {
            from: TxInput::new(key.address(), Coins::dtoken(U256::from(5)), 1),
            to: TxOutput::new(Address::repeat_byte(8), Coins::zero()),
            gas_limit,
            gas_price,
            data: Bytes::from_static(b"\x60\x00"),
        };
        tx.from.signature =
            key.sign(&Tx::SmartContract(tx.clone()).signing_bytes("privatenet"));
        Tx::SmartContract(tx)
    }

    #[test]
    fn test_execute_writes_receipt() {
        let evm = Arc::new(FixedGasEvm {
            gas_used: 30_000,
            error: None,
        });
        let (executor, mut view, key, chain) = harness(evm);
        let tx = signed_contract_tx(&key, U256::from(MINIMUM_GAS_PRICE_NEW_FEE), 100_000);

        executor.sanity_check(&view, &tx).unwrap();
        executor.process(&mut view, &tx).unwrap();

        let receipt = chain
            .find_tx_receipt_by_hash(keccak256(tx.to_bytes()))
            .unwrap()
            .expect("receipt written");
        assert_eq!(receipt.gas_used, 30_000);
        assert_eq!(receipt.logs.len(), 1);
        assert_eq!(receipt.evm_err, "");

        // Fee charged and sequence bumped.
        let account = view.get_account(key.address()).unwrap().unwrap();
        assert_eq!(account.sequence, 1);
        assert_eq!(
            account.balance.dtoken_wei,
            U256::exp10(24) - U256::from(MINIMUM_GAS_PRICE_NEW_FEE) * U256::from(30_000u64)
        );
    }

    #[test]
    fn test_reverted_execution_drops_logs() {
        let evm = Arc::new(FixedGasEvm {
            gas_used: 21_000,
            error: Some("execution reverted".to_string()),
        });
        let (executor, mut view, key, chain) = harness(evm);
        let tx = signed_contract_tx(&key, U256::from(MINIMUM_GAS_PRICE_NEW_FEE), 100_000);

        executor.sanity_check(&view, &tx).unwrap();
        executor.process(&mut view, &tx).unwrap();

        let receipt = chain
            .find_tx_receipt_by_hash(keccak256(tx.to_bytes()))
            .unwrap()
            .unwrap();
        assert!(receipt.logs.is_empty());
        assert_eq!(receipt.evm_err, "execution reverted");
    }

    #[test]
    fn test_gas_price_and_limit_checks() {
        let evm = Arc::new(FixedGasEvm {
            gas_used: 0,
            error: None,
        });
        let (executor, view, key, _) = harness(evm);

        let low_price = signed_contract_tx(&key, U256::from(MINIMUM_GAS_PRICE_NEW_FEE - 1), 100_000);
        assert!(matches!(
            executor.sanity_check(&view, &low_price),
            Err(ExecutionError::InvalidGasPrice(_))
        ));

        let over_limit = signed_contract_tx(
            &key,
            U256::from(MINIMUM_GAS_PRICE_NEW_FEE),
            MAXIMUM_TX_GAS_LIMIT_NEW_FEE + 1,
        );
        assert!(matches!(
            executor.sanity_check(&view, &over_limit),
            Err(ExecutionError::InvalidGasLimit(_))
        ));
    }
}
