use dnero_common::{
    BlockHeight, Hash,
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
    PoolError, VoteError,
    pool::{CandidatePool, PoolCandidate},
};

lazy_static! {
    /// Each stake deposit needs to be at least 2,000 Dnero.
    pub static ref MIN_SENTRY_STAKE_DEPOSIT: U256 = U256::from(2_000u64) * U256::exp10(18);
}

/// A sentry candidate: a stake holder plus the BLS key it attests with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sentry {
    pub stake_holder: StakeHolder,
    pub pubkey: bls::PublicKey,
}

impl PoolCandidate for Sentry {
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

impl RLPEncode for Sentry {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.stake_holder)
            .encode_bytes(&self.pubkey.to_bytes())
            .finish();
    }
}

impl RLPDecode for Sentry {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (stake_holder, decoder) = decoder.decode_field("stake_holder")?;
        let (pubkey_bytes, decoder): ([u8; 48], _) = decoder.decode_field("pubkey")?;
        let pubkey = bls::PublicKey::from_bytes(&pubkey_bytes)
            .map_err(|err| RLPDecodeError::Custom(err.to_string()))?;
        Ok((
            Sentry {
                stake_holder,
                pubkey,
            },
            decoder.finish()?,
        ))
    }
}

pub type SentryCandidatePool = CandidatePool<Sentry>;

impl SentryCandidatePool {
    /// Position of the candidate with the given BLS public key, in the pool
    /// this is called on; `with_stake().index(..)` therefore gives the
    /// multiplicity-vector index.
    pub fn index(&self, pubkey: &bls::PublicKey) -> Option<usize> {
        self.iter().position(|sentry| &sentry.pubkey == pubkey)
    }

    /// The candidates' public keys, in pool order.
    pub fn pub_keys(&self) -> Vec<bls::PublicKey> {
        self.iter().map(|sentry| sentry.pubkey).collect()
    }

    pub fn deposit_stake(
        &mut self,
        source: Address,
        holder: Address,
        amount: U256,
        pubkey: bls::PublicKey,
        _block_height: BlockHeight,
    ) -> Result<(), PoolError> {
        if amount < *MIN_SENTRY_STAKE_DEPOSIT {
            return Err(PoolError::InsufficientStake(amount));
        }

        match self.search(holder) {
            Ok(pos) => self.sorted[pos].stake_holder.deposit_stake(source, amount)?,
            Err(_) => {
                self.add(Sentry {
                    stake_holder: StakeHolder::new(holder, vec![Stake::new(source, amount)]),
                    pubkey,
                });
            }
        }
        Ok(())
    }
}

//
// ------- AggregatedVotes ------- //
//

/// Votes on a block, signed by a subset of the sentry candidate pool and
/// aggregated across gossip rounds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedVotes {
    /// Hash of the block being attested.
    pub block: Hash,
    /// Hash of the sentry candidate pool the multiplicities index into.
    pub scp: Hash,
    /// How many times each signer's signature has been folded in; indexed by
    /// the with-stake pool position.
    pub multiplies: Vec<u32>,
    /// Aggregate BLS signature.
    pub signature: bls::Signature,
}

impl AggregatedVotes {
    pub fn new(block: Hash, scp: &SentryCandidatePool) -> Self {
        Self {
            block,
            scp: scp.hash(),
            multiplies: vec![0; scp.with_stake().len()],
            signature: bls::Signature::empty(),
        }
    }

    /// The bytes to be signed: block and pool hash only. Multiplicities and
    /// the signature itself stay outside the payload so that signatures
    /// aggregate across participants without re-signing.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&self.block)
            .encode_field(&self.scp)
            .finish();
        buf
    }

    /// Adds the signer's signature. Returns false if the signer has already
    /// signed.
    pub fn sign(&mut self, key: &bls::SecretKey, signer_idx: usize) -> bool {
        if self.multiplies[signer_idx] > 0 {
            // Already signed, do nothing.
            return false;
        }

        self.multiplies[signer_idx] = 1;
        self.signature.aggregate(&key.sign(&self.signing_bytes()));
        true
    }

    /// Creates a new aggregation that combines two vote sets. Returns
    /// `Ok(None)` if the other vote is a subset of this one (no new
    /// information).
    pub fn merge(&self, other: &AggregatedVotes) -> Result<Option<AggregatedVotes>, VoteError> {
        if self.block != other.block || self.scp != other.scp {
            return Err(VoteError::IncompatibleVotes);
        }

        let mut new_multiplies = Vec::with_capacity(self.multiplies.len());
        let mut is_subset = true;
        for (mine, theirs) in self.multiplies.iter().zip(other.multiplies.iter()) {
            let combined = mine
                .checked_add(*theirs)
                .ok_or(VoteError::MultiplicityOverflow)?;
            new_multiplies.push(combined);
            if *mine == 0 && *theirs != 0 {
                is_subset = false;
            }
        }
        if is_subset {
            return Ok(None);
        }

        let mut signature = self.signature;
        signature.aggregate(&other.signature);
        Ok(Some(AggregatedVotes {
            block: self.block,
            scp: self.scp,
            multiplies: new_multiplies,
            signature,
        }))
    }

    /// The number of distinct signers in the vote.
    pub fn abs(&self) -> usize {
        self.multiplies.iter().filter(|m| **m != 0).count()
    }

    /// Selects the better of two votes; ties go to `self`.
    pub fn pick<'a>(&'a self, other: &'a AggregatedVotes) -> Result<&'a AggregatedVotes, VoteError> {
        if self.block != other.block || self.scp != other.scp {
            return Err(VoteError::IncompatibleVotes);
        }
        if other.abs() > self.abs() {
            return Ok(other);
        }
        Ok(self)
    }

    /// Verifies the vote set against the pool it claims to index into.
    pub fn validate(&self, scp: &SentryCandidatePool) -> Result<(), VoteError> {
        if scp.hash() != self.scp {
            return Err(VoteError::PoolHashMismatch {
                local: scp.hash(),
                vote: self.scp,
            });
        }
        let with_stake = scp.with_stake();
        if self.multiplies.len() != with_stake.len() {
            return Err(VoteError::MultipliesSizeMismatch {
                multiplies: self.multiplies.len(),
                pool: with_stake.len(),
            });
        }
        if self.signature.is_empty() {
            return Err(VoteError::EmptySignature);
        }
        let agg_pubkey = bls::aggregate_public_keys(&with_stake.pub_keys(), &self.multiplies);
        if !self.signature.verify(&self.signing_bytes(), &agg_pubkey) {
            return Err(VoteError::SignatureVerificationFailed);
        }
        Ok(())
    }
}

impl RLPEncode for AggregatedVotes {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.block)
            .encode_field(&self.scp)
            .encode_field(&self.multiplies)
            .encode_bytes(&self.signature.to_bytes())
            .finish();
    }
}

impl RLPDecode for AggregatedVotes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (block, decoder) = decoder.decode_field("block")?;
        let (scp, decoder) = decoder.decode_field("scp")?;
        let (multiplies, decoder) = decoder.decode_field("multiplies")?;
        let (signature_bytes, decoder): ([u8; 96], _) = decoder.decode_field("signature")?;
        let signature = bls::Signature::from_bytes(&signature_bytes)
            .map_err(|err| RLPDecodeError::Custom(err.to_string()))?;
        Ok((
            AggregatedVotes {
                block,
                scp,
                multiplies,
                signature,
            },
            decoder.finish()?,
        ))
    }
}
