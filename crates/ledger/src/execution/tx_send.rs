use dnero_common::{
    Hash,
    chain_config::ChainConfig,
    constants::{GAS_SEND_TX_PER_ACCOUNT, MAX_ACCOUNTS_AFFECTED_PER_TX},
    types::{Account, Coins, SendTx, Tx},
};
use ethereum_types::U256;
use tracing::debug;

use crate::{
    error::ExecutionError,
    execution::{
        TxExecutor,
        executils::{
            get_input, sanity_check_for_send_tx_fee, validate_input_advanced,
            validate_input_basic,
        },
    },
    state::StoreView,
};

pub struct SendTxExecutor {
    config: ChainConfig,
}

impl SendTxExecutor {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    fn cast(tx: &Tx) -> Result<&SendTx, ExecutionError> {
        match tx {
            Tx::Send(tx) => Ok(tx),
            _ => Err(ExecutionError::InvalidInput("not a send transaction")),
        }
    }

    fn num_accounts_affected(tx: &SendTx) -> u64 {
        (tx.inputs.len() + tx.outputs.len()) as u64
    }

    fn sum_input_coins(tx: &SendTx) -> Result<Coins, ExecutionError> {
        tx.inputs
            .iter()
            .try_fold(Coins::zero(), |acc, input| acc.checked_add(&input.coins))
            .ok_or(ExecutionError::InvalidInput("input coins overflow"))
    }

    fn sum_output_coins(tx: &SendTx) -> Result<Coins, ExecutionError> {
        tx.outputs
            .iter()
            .try_fold(Coins::zero(), |acc, output| acc.checked_add(&output.coins))
            .ok_or(ExecutionError::InvalidInput("output coins overflow"))
    }
}

impl TxExecutor for SendTxExecutor {
    fn sanity_check(&self, view: &StoreView, tx_enum: &Tx) -> Result<(), ExecutionError> {
        let block_height = view.height() + 1;
        let tx = Self::cast(tx_enum)?;

        if tx.inputs.is_empty() || tx.outputs.is_empty() {
            return Err(ExecutionError::InvalidInput("no inputs or outputs"));
        }
        if Self::num_accounts_affected(tx) > MAX_ACCOUNTS_AFFECTED_PER_TX as u64 {
            return Err(ExecutionError::InvalidInput(
                "transaction affects too many accounts",
            ));
        }

        sanity_check_for_send_tx_fee(
            &self.config,
            &tx.fee,
            Self::num_accounts_affected(tx),
            block_height,
        )?;

        // Coins in must equal coins out plus the fee.
        let total_in = Self::sum_input_coins(tx)?;
        let total_out = Self::sum_output_coins(tx)?;
        let expected_in = total_out
            .checked_add(&tx.fee)
            .ok_or(ExecutionError::InvalidInput("output coins overflow"))?;
        if total_in != expected_in {
            debug!(%total_in, %expected_in, "Send amounts do not balance");
            return Err(ExecutionError::InvalidInput(
                "inputs do not equal outputs plus fee",
            ));
        }

        let signing_bytes = tx_enum.signing_bytes(&self.config.chain_id);
        for input in &tx.inputs {
            validate_input_basic(input)?;
            let account = get_input(view, input)?;
            validate_input_advanced(&account, &signing_bytes, input)?;
            if !account.balance.is_gte(&input.coins) {
                return Err(ExecutionError::InsufficientFund);
            }
        }

        Ok(())
    }

    fn process(&self, view: &mut StoreView, tx_enum: &Tx) -> Result<Hash, ExecutionError> {
        let tx = Self::cast(tx_enum)?;

        for input in &tx.inputs {
            let mut account = get_input(view, input)?;
            account.balance = account
                .balance
                .checked_sub(&input.coins)
                .ok_or(ExecutionError::InsufficientFund)?;
            account.sequence += 1;
            view.set_account(input.address, &account)?;
        }

        for output in &tx.outputs {
            let mut account = view
                .get_account(output.address)?
                .unwrap_or_else(|| Account::new(Coins::zero()));
            account.balance = account
                .balance
                .checked_add(&output.coins)
                .ok_or(ExecutionError::InvalidInput("output coins overflow"))?;
            view.set_account(output.address, &account)?;
        }

        Ok(tx_enum.tx_id(&self.config.chain_id))
    }

    fn effective_gas_price(&self, tx: &Tx) -> U256 {
        let num_accounts = match tx {
            Tx::Send(send) => Self::num_accounts_affected(send).max(1),
            _ => 1,
        };
        tx.fee().dtoken_wei / (U256::from(GAS_SEND_TX_PER_ACCOUNT) * U256::from(num_accounts))
    }
}
