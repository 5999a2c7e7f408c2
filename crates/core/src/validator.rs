use dnero_common::types::stake::{Stake, StakeHolder};
use ethereum_types::{Address, U256};
use lazy_static::lazy_static;

use crate::{PoolError, pool::CandidatePool};

lazy_static! {
    /// Each stake deposit needs to be at least 2,000,000 Dnero.
    pub static ref MIN_VALIDATOR_STAKE_DEPOSIT: U256 =
        U256::from(2_000_000u64) * U256::exp10(18);
}

/// Validator candidates carry no attributes beyond their stakes.
pub type ValidatorCandidatePool = CandidatePool<StakeHolder>;

impl ValidatorCandidatePool {
    pub fn deposit_stake(
        &mut self,
        source: Address,
        holder: Address,
        amount: U256,
    ) -> Result<(), PoolError> {
        if amount < *MIN_VALIDATOR_STAKE_DEPOSIT {
            return Err(PoolError::InsufficientStake(amount));
        }

        match self.search(holder) {
            Ok(pos) => self.sorted[pos].deposit_stake(source, amount)?,
            Err(_) => {
                self.add(StakeHolder::new(holder, vec![Stake::new(source, amount)]));
            }
        }
        Ok(())
    }
}
