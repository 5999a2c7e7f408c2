pub mod executils;
pub mod tx_deposit_stake;
pub mod tx_send;
pub mod tx_smart_contract;
pub mod tx_withdraw_stake;
pub mod vm;

use std::sync::Arc;

use dnero_blockchain::Chain;
use dnero_common::{Hash, chain_config::ChainConfig, types::Tx};
use ethereum_types::U256;

use crate::{error::ExecutionError, state::StoreView};

pub use tx_deposit_stake::DepositStakeExecutor;
pub use tx_send::SendTxExecutor;
pub use tx_smart_contract::SmartContractTxExecutor;
pub use tx_withdraw_stake::WithdrawStakeExecutor;
pub use vm::{Evm, EvmResult};

/// Per-kind transaction executor: a read-only sanity check followed by a
/// state-mutating process step. `process` must only be called on a
/// transaction that passed `sanity_check` against the same view.
pub trait TxExecutor {
    fn sanity_check(&self, view: &StoreView, tx: &Tx) -> Result<(), ExecutionError>;

    fn process(&self, view: &mut StoreView, tx: &Tx) -> Result<Hash, ExecutionError>;

    /// Effective gas price reported to the mempool for ordering.
    fn effective_gas_price(&self, tx: &Tx) -> U256;
}

/// Dispatches transactions to their executors.
pub struct Executor {
    deposit_stake: DepositStakeExecutor,
    withdraw_stake: WithdrawStakeExecutor,
    send: SendTxExecutor,
    smart_contract: SmartContractTxExecutor,
}

impl Executor {
    pub fn new(config: ChainConfig, chain: Chain, evm: Arc<dyn Evm>) -> Self {
        Self {
            deposit_stake: DepositStakeExecutor::new(config.clone()),
            withdraw_stake: WithdrawStakeExecutor::new(config.clone()),
            send: SendTxExecutor::new(config.clone()),
            smart_contract: SmartContractTxExecutor::new(config, chain, evm),
        }
    }

    fn route(&self, tx: &Tx) -> &dyn TxExecutor {
        match tx {
            Tx::Send(_) => &self.send,
            Tx::SmartContract(_) => &self.smart_contract,
            Tx::DepositStake(_) | Tx::DepositStakeV1(_) => &self.deposit_stake,
            Tx::WithdrawStake(_) => &self.withdraw_stake,
        }
    }

    /// Runs the full check-then-mutate cycle for one transaction and returns
    /// its id.
    pub fn execute(&self, view: &mut StoreView, tx: &Tx) -> Result<Hash, ExecutionError> {
        let executor = self.route(tx);
        executor.sanity_check(view, tx)?;
        executor.process(view, tx)
    }

    pub fn effective_gas_price(&self, tx: &Tx) -> U256 {
        self.route(tx).effective_gas_price(tx)
    }
}
