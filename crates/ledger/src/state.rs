use dnero_common::{BlockHeight, types::Account};
use dnero_core::{EliteEdgeNodePool, SentryCandidatePool, ValidatorCandidatePool};
use dnero_storage::{KvStore, StoreError};
use ethereum_types::Address;

/// Well-known state keys.
const VALIDATOR_CANDIDATE_POOL_KEY: &[u8] = b"ls/vcp";
const SENTRY_CANDIDATE_POOL_KEY: &[u8] = b"ls/scp";
const ELITE_EDGE_NODE_POOL_KEY: &[u8] = b"ls/eenp";
const STAKE_TRANSACTION_HEIGHT_LIST_KEY: &[u8] = b"ls/sthl";

fn account_key(address: Address) -> Vec<u8> {
    [b"ls/a/".as_slice(), address.as_bytes()].concat()
}

/// A mutable, possibly-uncommitted view over the ledger state used during a
/// block's execution. The view points at the parent of the block currently
/// being processed; executors derive the current block height as
/// `height() + 1`.
#[derive(Clone, Debug)]
pub struct StoreView {
    store: KvStore,
    height: BlockHeight,
}

impl StoreView {
    pub fn new(store: KvStore, height: BlockHeight) -> Self {
        Self { store, height }
    }

    /// Height of the block this view's state belongs to.
    pub fn height(&self) -> BlockHeight {
        self.height
    }

    /// A view over the same backing store, rebased to another height.
    pub fn at_height(&self, height: BlockHeight) -> Self {
        Self {
            store: self.store.clone(),
            height,
        }
    }

    pub fn get_account(&self, address: Address) -> Result<Option<Account>, StoreError> {
        match self.store.get(&account_key(address)) {
            Ok(account) => Ok(Some(account)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub fn set_account(&mut self, address: Address, account: &Account) -> Result<(), StoreError> {
        self.store.put(&account_key(address), account)
    }

    pub fn get_validator_candidate_pool(&self) -> Result<ValidatorCandidatePool, StoreError> {
        self.get_pool(VALIDATOR_CANDIDATE_POOL_KEY)
    }

    pub fn update_validator_candidate_pool(
        &mut self,
        pool: &ValidatorCandidatePool,
    ) -> Result<(), StoreError> {
        self.store.put(VALIDATOR_CANDIDATE_POOL_KEY, pool)
    }

    pub fn get_sentry_candidate_pool(&self) -> Result<SentryCandidatePool, StoreError> {
        self.get_pool(SENTRY_CANDIDATE_POOL_KEY)
    }

    pub fn update_sentry_candidate_pool(
        &mut self,
        pool: &SentryCandidatePool,
    ) -> Result<(), StoreError> {
        self.store.put(SENTRY_CANDIDATE_POOL_KEY, pool)
    }

    pub fn get_elite_edge_node_pool(&self) -> Result<EliteEdgeNodePool, StoreError> {
        self.get_pool(ELITE_EDGE_NODE_POOL_KEY)
    }

    pub fn update_elite_edge_node_pool(
        &mut self,
        pool: &EliteEdgeNodePool,
    ) -> Result<(), StoreError> {
        self.store.put(ELITE_EDGE_NODE_POOL_KEY, pool)
    }

    /// Heights of blocks containing validator stake transactions, consulted
    /// by the consensus engine when it re-derives the validator set.
    pub fn get_stake_transaction_height_list(&self) -> Result<Vec<BlockHeight>, StoreError> {
        match self.store.get(STAKE_TRANSACTION_HEIGHT_LIST_KEY) {
            Ok(list) => Ok(list),
            Err(StoreError::NotFound) => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    pub fn update_stake_transaction_height_list(
        &mut self,
        list: &Vec<BlockHeight>,
    ) -> Result<(), StoreError> {
        self.store.put(STAKE_TRANSACTION_HEIGHT_LIST_KEY, list)
    }

    fn get_pool<P>(&self, key: &[u8]) -> Result<P, StoreError>
    where
        P: dnero_rlp::decode::RLPDecode + Default,
    {
        match self.store.get(key) {
            Ok(pool) => Ok(pool),
            Err(StoreError::NotFound) => Ok(P::default()),
            Err(err) => Err(err),
        }
    }
}
