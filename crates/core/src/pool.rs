use dnero_common::{
    BlockHeight, Hash,
    types::stake::{Stake, StakeHolder},
};
use dnero_crypto::keccak::keccak256;
use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethereum_types::Address;
use tracing::{debug, warn};

use crate::PoolError;

/// A candidate held in a sorted pool.
pub trait PoolCandidate {
    fn holder(&self) -> Address;
    fn stake_holder(&self) -> &StakeHolder;
    fn stake_holder_mut(&mut self) -> &mut StakeHolder;
}

impl PoolCandidate for StakeHolder {
    fn holder(&self) -> Address {
        self.holder
    }

    fn stake_holder(&self) -> &StakeHolder {
        self
    }

    fn stake_holder_mut(&mut self) -> &mut StakeHolder {
        self
    }
}

/// A set of candidates kept in ascending order by holder address, at most
/// one candidate per holder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidatePool<C> {
    pub(crate) sorted: Vec<C>,
}

impl<C> Default for CandidatePool<C> {
    fn default() -> Self {
        Self { sorted: Vec::new() }
    }
}

impl<C: PoolCandidate> CandidatePool<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> {
        self.sorted.iter()
    }

    pub(crate) fn search(&self, holder: Address) -> Result<usize, usize> {
        self.sorted
            .binary_search_by(|candidate| candidate.holder().as_bytes().cmp(holder.as_bytes()))
    }

    /// Inserts a candidate in sorted position; returns false (no mutation)
    /// if a candidate with the same holder already exists.
    pub fn add(&mut self, candidate: C) -> bool {
        match self.search(candidate.holder()) {
            Ok(_) => false,
            Err(pos) => {
                self.sorted.insert(pos, candidate);
                true
            }
        }
    }

    /// Removes the candidate with the given holder; returns false if absent.
    pub fn remove(&mut self, holder: Address) -> bool {
        match self.search(holder) {
            Ok(pos) => {
                self.sorted.remove(pos);
                true
            }
            Err(_) => false,
        }
    }

    pub fn contains(&self, holder: Address) -> bool {
        self.search(holder).is_ok()
    }

    pub fn get(&self, holder: Address) -> Option<&C> {
        self.search(holder).ok().map(|pos| &self.sorted[pos])
    }

    pub(crate) fn get_mut(&mut self, holder: Address) -> Option<&mut C> {
        match self.search(holder) {
            Ok(pos) => Some(&mut self.sorted[pos]),
            Err(_) => None,
        }
    }
}

impl<C: PoolCandidate + Clone> CandidatePool<C> {
    /// A new pool containing only the candidates with at least one
    /// non-withdrawn stake, in the same order. BLS multiplicity vectors index
    /// into this projection.
    pub fn with_stake(&self) -> Self {
        Self {
            sorted: self
                .sorted
                .iter()
                .filter(|candidate| candidate.stake_holder().has_stake())
                .cloned()
                .collect(),
        }
    }
}

impl<C: PoolCandidate> CandidatePool<C> {
    /// Marks the `(holder, source)` stake as pending return.
    pub fn withdraw_stake(
        &mut self,
        source: Address,
        holder: Address,
        current_height: BlockHeight,
    ) -> Result<(), PoolError> {
        let candidate = self
            .get_mut(holder)
            .ok_or(PoolError::HolderNotFound(holder))?;
        candidate
            .stake_holder_mut()
            .withdraw_stake(source, current_height)?;
        Ok(())
    }

    /// Removes and returns every stake whose locking period has elapsed.
    /// Candidates left with no stakes are removed from the pool. Iterates in
    /// reverse because of in-place deletion.
    pub fn return_stakes(&mut self, current_height: BlockHeight) -> Vec<Stake> {
        let mut returned_stakes = Vec::new();

        for cidx in (0..self.sorted.len()).rev() {
            let candidate = &mut self.sorted[cidx];
            let stake_holder = candidate.stake_holder_mut();
            for sidx in (0..stake_holder.stakes.len()).rev() {
                let stake = &stake_holder.stakes[sidx];
                if stake.withdrawn && current_height >= stake.return_height {
                    debug!(
                        source = %stake.source,
                        amount = %stake.amount,
                        "Stake to be returned"
                    );
                    let source = stake.source;
                    match stake_holder.return_stake(source, current_height) {
                        Ok(returned) => returned_stakes.push(returned),
                        Err(err) => {
                            warn!(%source, %err, "Failed to return stake");
                            continue;
                        }
                    }
                }
            }

            if stake_holder.stakes.is_empty() {
                self.sorted.remove(cidx);
            }
        }
        returned_stakes
    }
}

impl<C: PoolCandidate + RLPEncode> CandidatePool<C> {
    /// Deterministic digest of the canonical serialization of the sorted
    /// sequence.
    pub fn hash(&self) -> Hash {
        keccak256(&self.encode_to_vec())
    }
}

impl<C: RLPEncode> RLPEncode for CandidatePool<C> {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf).encode_field(&self.sorted).finish();
    }
}

impl<C: RLPDecode> RLPDecode for CandidatePool<C> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (sorted, decoder) = decoder.decode_field("sorted")?;
        Ok((CandidatePool { sorted }, decoder.finish()?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dnero_common::constants::RETURN_LOCKING_PERIOD;
    use ethereum_types::U256;

    fn addr(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn pool_with_stakes() -> CandidatePool<StakeHolder> {
        let mut pool = CandidatePool::new();
        pool.add(StakeHolder::new(
            addr(1),
            vec![
                Stake::new(addr(10), U256::from(100)),
                Stake::new(addr(11), U256::from(200)),
            ],
        ));
        pool.add(StakeHolder::new(
            addr(2),
            vec![Stake::new(addr(12), U256::from(300))],
        ));
        pool
    }

    #[test]
    fn test_add_keeps_sorted_and_unique() {
        let mut pool = CandidatePool::new();
        for byte in [7u8, 3, 9, 1, 5] {
            assert!(pool.add(StakeHolder::new(addr(byte), vec![])));
        }
        assert!(!pool.add(StakeHolder::new(addr(3), vec![])));
        let holders: Vec<_> = pool.iter().map(|c| c.holder()).collect();
        assert_eq!(holders, vec![addr(1), addr(3), addr(5), addr(7), addr(9)]);
    }

    #[test]
    fn test_return_stakes_removes_emptied_candidates() {
        let mut pool = pool_with_stakes();
        pool.withdraw_stake(addr(12), addr(2), 100).unwrap();

        // Not yet eligible: nothing returned.
        assert!(pool.return_stakes(100 + RETURN_LOCKING_PERIOD - 1).is_empty());
        assert_eq!(pool.len(), 2);

        let returned = pool.return_stakes(100 + RETURN_LOCKING_PERIOD);
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].source, addr(12));
        // The candidate's stake list emptied, so the candidate is gone.
        assert_eq!(pool.len(), 1);
        assert!(!pool.contains(addr(2)));
    }

    #[test]
    fn test_return_stakes_keeps_candidates_with_remaining_stake() {
        let mut pool = pool_with_stakes();
        pool.withdraw_stake(addr(10), addr(1), 50).unwrap();

        let returned = pool.return_stakes(50 + RETURN_LOCKING_PERIOD);
        assert_eq!(returned.len(), 1);
        assert!(pool.contains(addr(1)));
        assert_eq!(pool.get(addr(1)).unwrap().stakes.len(), 1);
    }

    #[test]
    fn test_with_stake_is_ordered_subsequence() {
        let mut pool = pool_with_stakes();
        pool.withdraw_stake(addr(12), addr(2), 100).unwrap();
        let projection = pool.with_stake();
        assert_eq!(projection.len(), 1);
        assert_eq!(projection.iter().next().unwrap().holder(), addr(1));
    }
}
