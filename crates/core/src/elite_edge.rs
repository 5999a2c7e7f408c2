use dnero_common::{
    BlockHeight,
    types::stake::{Stake, StakeHolder},
};
use dnero_crypto::bls;
use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethereum_types::{Address, U256};
use lazy_static::lazy_static;

use crate::{
    PoolError,
    pool::{CandidatePool, PoolCandidate},
};

lazy_static! {
    /// Each stake deposit needs to be at least 10,000 DToken.
    pub static ref MIN_ELITE_EDGE_STAKE_DEPOSIT: U256 = U256::from(10_000u64) * U256::exp10(18);

    /// No elite edge node can hold more than 500,000 DToken of stake.
    pub static ref MAX_ELITE_EDGE_STAKE_DEPOSIT: U256 = U256::from(500_000u64) * U256::exp10(18);
}

/// An elite edge node candidate. Stakes are denominated in DToken, unlike
/// the validator and sentry pools.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EliteEdgeNode {
    pub stake_holder: StakeHolder,
    pub pubkey: bls::PublicKey,
}

impl PoolCandidate for EliteEdgeNode {
    fn holder(&self) -> Address {
        self.stake_holder.holder
    }

    fn stake_holder(&self) -> &StakeHolder {
        &self.stake_holder
    }

    fn stake_holder_mut(&mut self) -> &mut StakeHolder {
        &mut self.stake_holder
    }
}

impl RLPEncode for EliteEdgeNode {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.stake_holder)
            .encode_bytes(&self.pubkey.to_bytes())
            .finish();
    }
}

impl RLPDecode for EliteEdgeNode {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (stake_holder, decoder) = decoder.decode_field("stake_holder")?;
        let (pubkey_bytes, decoder): ([u8; 48], _) = decoder.decode_field("pubkey")?;
        let pubkey = bls::PublicKey::from_bytes(&pubkey_bytes)
            .map_err(|err| RLPDecodeError::Custom(err.to_string()))?;
        Ok((
            EliteEdgeNode {
                stake_holder,
                pubkey,
            },
            decoder.finish()?,
        ))
    }
}

pub type EliteEdgeNodePool = CandidatePool<EliteEdgeNode>;

impl EliteEdgeNodePool {
    pub fn index(&self, pubkey: &bls::PublicKey) -> Option<usize> {
        self.iter().position(|node| &node.pubkey == pubkey)
    }

    pub fn deposit_stake(
        &mut self,
        source: Address,
        holder: Address,
        amount: U256,
        pubkey: bls::PublicKey,
        _block_height: BlockHeight,
    ) -> Result<(), PoolError> {
        if amount < *MIN_ELITE_EDGE_STAKE_DEPOSIT {
            return Err(PoolError::InsufficientStake(amount));
        }

        match self.search(holder) {
            Ok(pos) => {
                let node = &mut self.sorted[pos];
                let combined = node
                    .stake_holder
                    .total_stake()
                    .checked_add(amount)
                    .ok_or(PoolError::StakeExceedsCap)?;
                if combined > *MAX_ELITE_EDGE_STAKE_DEPOSIT {
                    return Err(PoolError::StakeExceedsCap);
                }
                node.stake_holder.deposit_stake(source, amount)?;
            }
            Err(_) => {
                if amount > *MAX_ELITE_EDGE_STAKE_DEPOSIT {
                    return Err(PoolError::StakeExceedsCap);
                }
                self.add(EliteEdgeNode {
                    stake_holder: StakeHolder::new(holder, vec![Stake::new(source, amount)]),
                    pubkey,
                });
            }
        }
        Ok(())
    }
}
