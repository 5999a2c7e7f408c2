use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethereum_types::{Address, U256};
use thiserror::Error;

use crate::{BlockHeight, constants::RETURN_LOCKING_PERIOD};

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum StakeError {
    #[error("no stake from source {0} found")]
    NoMatchedStake(Address),
    #[error("stake from source {0} is already withdrawn")]
    AlreadyWithdrawn(Address),
    #[error("stake from source {0} is not yet eligible for return")]
    NotYetReturnable(Address),
    #[error("cannot deposit to the withdrawn stake from source {0}")]
    CannotDepositToWithdrawn(Address),
    #[error("stake amount overflow")]
    AmountOverflow,
}

/// A single stake deposit. Lifecycle: active (`withdrawn == false`), pending
/// return (`withdrawn == true`, waiting for `return_height`), returned
/// (removed from its holder's list).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stake {
    /// The address that funded the stake.
    pub source: Address,
    /// Amount in the staking denomination of the pool this stake lives in.
    pub amount: U256,
    pub withdrawn: bool,
    /// Height at which a withdrawn stake becomes eligible for return.
    pub return_height: BlockHeight,
}

impl Stake {
    pub fn new(source: Address, amount: U256) -> Self {
        Self {
            source,
            amount,
            withdrawn: false,
            return_height: BlockHeight::MAX,
        }
    }
}

impl RLPEncode for Stake {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.source)
            .encode_field(&self.amount)
            .encode_field(&self.withdrawn)
            .encode_field(&self.return_height)
            .finish();
    }
}

impl RLPDecode for Stake {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (amount, decoder) = decoder.decode_field("amount")?;
        let (withdrawn, decoder) = decoder.decode_field("withdrawn")?;
        let (return_height, decoder) = decoder.decode_field("return_height")?;
        Ok((
            Stake {
                source,
                amount,
                withdrawn,
                return_height,
            },
            decoder.finish()?,
        ))
    }
}

/// A stake holder: the candidate address and its stakes, one per distinct
/// source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StakeHolder {
    pub holder: Address,
    pub stakes: Vec<Stake>,
}

impl StakeHolder {
    pub fn new(holder: Address, stakes: Vec<Stake>) -> Self {
        Self { holder, stakes }
    }

    /// Total amount of non-withdrawn stake.
    pub fn total_stake(&self) -> U256 {
        self.stakes
            .iter()
            .filter(|stake| !stake.withdrawn)
            .fold(U256::zero(), |acc, stake| acc + stake.amount)
    }

    /// Whether any stake is still active.
    pub fn has_stake(&self) -> bool {
        self.stakes.iter().any(|stake| !stake.withdrawn)
    }

    /// Merges a deposit into the existing stake from `source`, or appends a
    /// new stake. A stake with a pending withdrawal cannot receive deposits.
    pub fn deposit_stake(&mut self, source: Address, amount: U256) -> Result<(), StakeError> {
        for stake in &mut self.stakes {
            if stake.source == source {
                if stake.withdrawn {
                    return Err(StakeError::CannotDepositToWithdrawn(source));
                }
                stake.amount = stake
                    .amount
                    .checked_add(amount)
                    .ok_or(StakeError::AmountOverflow)?;
                return Ok(());
            }
        }

        self.stakes.push(Stake::new(source, amount));
        Ok(())
    }

    /// Marks the stake from `source` as pending return.
    pub fn withdraw_stake(
        &mut self,
        source: Address,
        current_height: BlockHeight,
    ) -> Result<&Stake, StakeError> {
        for stake in &mut self.stakes {
            if stake.source == source {
                if stake.withdrawn {
                    return Err(StakeError::AlreadyWithdrawn(source));
                }
                stake.withdrawn = true;
                stake.return_height = current_height + RETURN_LOCKING_PERIOD;
                return Ok(stake);
            }
        }

        Err(StakeError::NoMatchedStake(source))
    }

    /// Removes and returns the stake from `source`, which must be withdrawn
    /// and past its return height.
    pub fn return_stake(
        &mut self,
        source: Address,
        current_height: BlockHeight,
    ) -> Result<Stake, StakeError> {
        let idx = self
            .stakes
            .iter()
            .position(|stake| stake.source == source)
            .ok_or(StakeError::NoMatchedStake(source))?;

        let stake = &self.stakes[idx];
        if !stake.withdrawn {
            return Err(StakeError::NoMatchedStake(source));
        }
        if current_height < stake.return_height {
            return Err(StakeError::NotYetReturnable(source));
        }
        Ok(self.stakes.remove(idx))
    }
}

impl RLPEncode for StakeHolder {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.holder)
            .encode_field(&self.stakes)
            .finish();
    }
}

impl RLPDecode for StakeHolder {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (holder, decoder) = decoder.decode_field("holder")?;
        let (stakes, decoder) = decoder.decode_field("stakes")?;
        Ok((StakeHolder { holder, stakes }, decoder.finish()?))
    }
}
