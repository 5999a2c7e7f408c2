use std::sync::Arc;

use dnero_blockchain::Chain;
use dnero_common::{Hash, chain_config::ChainConfig, types::Tx};
use dnero_core::{LedgerError, SentryCandidatePool};
use ethereum_types::U256;

use crate::{
    error::ExecutionError,
    execution::{Evm, Executor},
    state::StoreView,
};

/// The ledger: owns transaction execution for the chain and answers the
/// consensus engines' state queries.
pub struct Ledger {
    chain: Chain,
    executor: Executor,
}

impl Ledger {
    pub fn new(config: ChainConfig, chain: Chain, evm: Arc<dyn Evm>) -> Self {
        let executor = Executor::new(config, chain.clone(), evm);
        Self { chain, executor }
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// A state view as of the given block height.
    pub fn state_view(&self, height: u64) -> StoreView {
        StoreView::new(self.chain.store().clone(), height)
    }

    /// Validates and applies one transaction to the view.
    pub fn execute_tx(&self, view: &mut StoreView, tx: &Tx) -> Result<Hash, ExecutionError> {
        self.executor.execute(view, tx)
    }

    /// Gas-price key the mempool orders transactions by.
    pub fn effective_gas_price(&self, tx: &Tx) -> U256 {
        self.executor.effective_gas_price(tx)
    }
}

impl dnero_core::Ledger for Ledger {
    fn get_sentry_candidate_pool(
        &self,
        block_hash: Hash,
    ) -> Result<SentryCandidatePool, LedgerError> {
        let block = self
            .chain
            .find_block(block_hash)
            .map_err(|err| LedgerError::Custom(err.to_string()))?
            .ok_or(LedgerError::PoolUnavailable(block_hash))?;

        let view = self.state_view(block.height());
        view.get_sentry_candidate_pool()
            .map_err(|err| LedgerError::Custom(err.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use bytes::Bytes;
    use dnero_common::types::{SmartContractTx, StakeHolder, Stake};
    use dnero_core::{Block, BlockHeader, Ledger as _, Sentry};
    use dnero_crypto::bls;
    use dnero_storage::KvStore;
    use ethereum_types::Address;
    use rand::rngs::OsRng;

    use crate::execution::vm::EvmResult;

    struct NoopEvm;

    impl Evm for NoopEvm {
        fn execute(&self, _view: &mut StoreView, _tx: &SmartContractTx) -> EvmResult {
            EvmResult::default()
        }
    }

    #[test]
    fn test_sentry_pool_snapshot_by_block() {
        let config = ChainConfig::privatenet();
        let store = KvStore::in_memory();
        let chain = Chain::new(config.chain_id.clone(), store.clone());
        let ledger = Ledger::new(config, chain.clone(), Arc::new(NoopEvm));

        // Seed a pool with one sentry.
        let bls_key = bls::SecretKey::generate(&mut OsRng);
        let holder = Address::repeat_byte(1);
        let mut pool = SentryCandidatePool::new();
        pool.add(Sentry {
            stake_holder: StakeHolder::new(
                holder,
                vec![Stake::new(
                    holder,
                    ethereum_types::U256::from(2_000u64) * ethereum_types::U256::exp10(18),
                )],
            ),
            pubkey: bls_key.public_key(),
        });
        let mut view = ledger.state_view(5);
        view.update_sentry_candidate_pool(&pool).unwrap();

        let block = Block {
            header: BlockHeader {
                chain_id: "privatenet".to_string(),
                height: 5,
                parent: Hash::repeat_byte(0),
                state_hash: Hash::repeat_byte(0),
            },
            txs: vec![Bytes::new()],
        };
        let block_hash = chain.add_block(&block).unwrap();

        let fetched = ledger.get_sentry_candidate_pool(block_hash).unwrap();
        assert_eq!(fetched.len(), 1);
        assert!(fetched.contains(holder));

        // Unknown blocks yield no pool.
        assert!(ledger
            .get_sentry_candidate_pool(Hash::repeat_byte(9))
            .is_err());
    }

    #[test]
    fn test_execute_tx_routes_to_executor() {
        use dnero_common::types::{Coins, DepositStakeTxV1, StakePurpose, Tx, TxInput, TxOutput};
        use dnero_common::{U256, types::Account};
        use dnero_crypto::ecdsa::PrivateKey;

        let config = ChainConfig::privatenet();
        let store = KvStore::in_memory();
        let chain = Chain::new(config.chain_id.clone(), store.clone());
        let ledger = Ledger::new(config.clone(), chain, Arc::new(NoopEvm));

        let source_key = PrivateKey::generate(&mut OsRng);
        let holder_key = PrivateKey::generate(&mut OsRng);
        let bls_key = bls::SecretKey::generate(&mut OsRng);
        let mut view = ledger.state_view(10);
        view.set_account(
            source_key.address(),
            &Account::new(Coins::new(
                U256::from(10_000u64) * U256::exp10(18),
                U256::from(10u64) * U256::exp10(18),
            )),
        )
        .unwrap();

        let pop = bls_key.pop();
        let mut tx = DepositStakeTxV1 {
            fee: Coins::dtoken(U256::from(3) * U256::exp10(17)),
            source: TxInput::new(
                source_key.address(),
                Coins::dnero(U256::from(2_000u64) * U256::exp10(18)),
                1,
            ),
            holder: TxOutput::new(holder_key.address(), Coins::zero()),
            purpose: StakePurpose::Sentry,
            bls_pubkey: bls_key.public_key(),
            bls_pop: pop,
            holder_sig: holder_key.sign(&pop.to_bytes()),
        };
        tx.source.signature = source_key
            .sign(&Tx::DepositStakeV1(tx.clone()).signing_bytes(&config.chain_id));
        let tx = Tx::DepositStakeV1(tx);

        let tx_id = ledger.execute_tx(&mut view, &tx).unwrap();
        assert_eq!(tx_id, tx.tx_id(&config.chain_id));
        assert!(view
            .get_sentry_candidate_pool()
            .unwrap()
            .contains(holder_key.address()));
        assert!(ledger.effective_gas_price(&tx) > U256::zero());
    }
}
