use dnero_common::{
    Hash,
    chain_config::ChainConfig,
    constants::GAS_WITHDRAW_STAKE_TX,
    types::{StakePurpose, Tx, WithdrawStakeTx},
};
use ethereum_types::U256;
use tracing::debug;

use crate::{
    error::ExecutionError,
    execution::{
        TxExecutor,
        executils::{
            charge_fee, get_input, sanity_check_for_fee, validate_input_advanced,
            validate_input_basic,
        },
    },
    state::StoreView,
};

pub struct WithdrawStakeExecutor {
    config: ChainConfig,
}

impl WithdrawStakeExecutor {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    fn cast(tx: &Tx) -> Result<&WithdrawStakeTx, ExecutionError> {
        match tx {
            Tx::WithdrawStake(tx) => Ok(tx),
            _ => Err(ExecutionError::InvalidInput(
                "not a withdraw stake transaction",
            )),
        }
    }
}

impl TxExecutor for WithdrawStakeExecutor {
    fn sanity_check(&self, view: &StoreView, tx_enum: &Tx) -> Result<(), ExecutionError> {
        let block_height = view.height() + 1;
        let tx = Self::cast(tx_enum)?;

        validate_input_basic(&tx.source)?;

        let source_account = get_input(view, &tx.source)?;

        let signing_bytes = tx_enum.signing_bytes(&self.config.chain_id);
        validate_input_advanced(&source_account, &signing_bytes, &tx.source).inspect_err(
            |err| debug!(source = %tx.source.address, %err, "Input validation failed"),
        )?;

        sanity_check_for_fee(&self.config, &tx.fee, block_height)?;

        if !source_account.balance.is_gte(&tx.fee) {
            return Err(ExecutionError::InsufficientFund);
        }

        Ok(())
    }

    fn process(&self, view: &mut StoreView, tx_enum: &Tx) -> Result<Hash, ExecutionError> {
        let current_height = view.height() + 1;
        let tx = Self::cast(tx_enum)?;

        let mut source_account = get_input(view, &tx.source)?;

        if !charge_fee(&mut source_account, &tx.fee) {
            return Err(ExecutionError::Generic(
                "failed to charge transaction fee".to_string(),
            ));
        }

        let source_address = tx.source.address;
        let holder_address = tx.holder.address;

        match tx.purpose {
            StakePurpose::Validator => {
                let mut vcp = view.get_validator_candidate_pool()?;
                vcp.withdraw_stake(source_address, holder_address, current_height)?;
                view.update_validator_candidate_pool(&vcp)?;
            }
            StakePurpose::Sentry => {
                let mut scp = view.get_sentry_candidate_pool()?;
                scp.withdraw_stake(source_address, holder_address, current_height)?;
                view.update_sentry_candidate_pool(&scp)?;
            }
            StakePurpose::EliteEdgeNode => {
                let mut eenp = view.get_elite_edge_node_pool()?;
                eenp.withdraw_stake(source_address, holder_address, current_height)?;
                view.update_elite_edge_node_pool(&eenp)?;
            }
        }

        source_account.sequence += 1;
        view.set_account(source_address, &source_account)?;

        Ok(tx_enum.tx_id(&self.config.chain_id))
    }

    fn effective_gas_price(&self, tx: &Tx) -> U256 {
        tx.fee().dtoken_wei / U256::from(GAS_WITHDRAW_STAKE_TX)
    }
}
