//! The sentry vote engine.
//!
//! For each new block the engine snapshots the sentry candidate pool,
//! self-signs a fresh aggregated vote if this node is in the with-stake pool,
//! and then folds in votes gossiped by peers, round by round, keeping the
//! best aggregation seen so far. One task owns all state mutations; network
//! handlers only ever touch the bounded intake channel.

use std::sync::{Arc, Mutex};

use dnero_common::Hash;
use dnero_core::{AggregatedVotes, Ledger, LedgerError, SentryCandidatePool};
use dnero_crypto::bls;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Estimated number of neighbors during gossip = 2^3 = 8.
const MAX_LOG_NEIGHBORS: u32 = 3;
const MAX_ROUND: u32 = 10;

#[derive(Clone, Debug)]
pub struct ConsensusConfig {
    /// Capacity of the vote intake queue; votes arriving on a full queue are
    /// dropped.
    pub message_queue_size: usize,
    /// Non-sentry nodes relay the best vote they have seen instead of
    /// aggregating.
    pub pass_through_sentry_vote: bool,
    /// Enforce the per-round multiplicity bound `m ≤ 8^round` on incoming
    /// and merged votes. Bounds the cost of aggregate verification under a
    /// gossip tree of branching factor 8.
    pub enforce_vote_multiplies_bound: bool,
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self {
            message_queue_size: 512,
            pass_through_sentry_vote: false,
            enforce_vote_multiplies_bound: true,
        }
    }
}

#[derive(Default)]
struct EngineState {
    /// Current block being voted on; zero until the first block arrives.
    block: Hash,
    round: u32,
    /// The vote selected for the current round's broadcast.
    curr_vote: Option<AggregatedVotes>,
    /// The best vote merged so far, promoted on the next round.
    next_vote: Option<AggregatedVotes>,
    scp: SentryCandidatePool,
    scp_hash: Hash,
    /// This node's index in the with-stake pool; None if not a sentry.
    signer_index: Option<usize>,
}

pub struct SentryEngine {
    ledger: Arc<dyn Ledger>,
    priv_key: bls::SecretKey,
    config: ConsensusConfig,
    state: Mutex<EngineState>,
    incoming_tx: mpsc::Sender<AggregatedVotes>,
    incoming_rx: Mutex<Option<mpsc::Receiver<AggregatedVotes>>>,
}

impl SentryEngine {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        priv_key: bls::SecretKey,
        config: ConsensusConfig,
    ) -> Arc<Self> {
        let (incoming_tx, incoming_rx) = mpsc::channel(config.message_queue_size.max(1));
        Arc::new(Self {
            ledger,
            priv_key,
            config,
            state: Mutex::new(EngineState::default()),
            incoming_tx,
            incoming_rx: Mutex::new(Some(incoming_rx)),
        })
    }

    /// Spawns the engine's main loop. Pending votes in the intake buffer are
    /// discarded on cancellation.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) {
        let engine = self;
        let Some(mut incoming) = engine
            .incoming_rx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        else {
            warn!("Sentry engine already started");
            return;
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    vote = incoming.recv() => match vote {
                        Some(vote) => engine.process_vote(vote),
                        None => return,
                    },
                }
            }
        });
    }

    /// Resets per-block state and resamples the sentry pool as of `block`.
    pub fn start_new_block(&self, block: Hash) -> Result<(), LedgerError> {
        let mut state = self.lock_state();

        state.block = block;
        state.next_vote = None;
        state.curr_vote = None;
        state.round = 1;

        let scp = self.ledger.get_sentry_candidate_pool(block)?;
        state.scp_hash = scp.hash();
        state.signer_index = scp.with_stake().index(&self.priv_key.public_key());

        debug!(
            block = ?block,
            scp = ?state.scp_hash,
            signer_index = ?state.signer_index,
            "Starting new block"
        );

        if let Some(signer_index) = state.signer_index {
            let mut vote = AggregatedVotes::new(block, &scp);
            vote.sign(&self.priv_key, signer_index);
            state.curr_vote = Some(vote.clone());
            state.next_vote = Some(vote);
        }
        state.scp = scp;

        Ok(())
    }

    /// Promotes the best vote into the broadcast slot and advances the
    /// round, up to [`MAX_ROUND`].
    pub fn start_new_round(&self) {
        let mut state = self.lock_state();
        if state.round < MAX_ROUND {
            state.round += 1;
            if let Some(next_vote) = state.next_vote.clone() {
                state.curr_vote = Some(next_vote);
            }
        }
    }

    pub fn get_vote_to_broadcast(&self) -> Option<AggregatedVotes> {
        self.lock_state().curr_vote.clone()
    }

    pub fn get_best_vote(&self) -> Option<AggregatedVotes> {
        self.lock_state().next_vote.clone()
    }

    pub fn round(&self) -> u32 {
        self.lock_state().round
    }

    /// Non-blocking intake for network handlers; the vote is dropped if the
    /// queue is full.
    pub fn handle_vote(&self, vote: AggregatedVotes) {
        if let Err(err) = self.incoming_tx.try_send(vote) {
            debug!(%err, "Sentry engine queue is full, discarding vote");
        }
    }

    fn is_sentry(state: &EngineState) -> bool {
        state.signer_index.is_some()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn process_vote(&self, vote: AggregatedVotes) {
        let mut state = self.lock_state();

        if !self.validate_vote(&state, &vote) {
            return;
        }

        let Some(next_vote) = state.next_vote.clone() else {
            state.next_vote = Some(vote);
            return;
        };

        let candidate = if !Self::is_sentry(&state) && self.config.pass_through_sentry_vote {
            match next_vote.pick(&vote) {
                Ok(picked) if *picked == next_vote => {
                    // Incoming vote is not better than the current best.
                    debug!(multiplies = ?vote.multiplies, "Skipping vote: not better");
                    return;
                }
                Ok(_) => vote,
                Err(err) => {
                    info!(
                        block = ?state.block,
                        round = state.round,
                        %err,
                        "Failed to pick sentry vote"
                    );
                    return;
                }
            }
        } else {
            match next_vote.merge(&vote) {
                Ok(Some(merged)) => merged,
                Ok(None) => {
                    // Incoming vote is a subset of the current best.
                    debug!(multiplies = ?vote.multiplies, "Skipping vote: no new index");
                    return;
                }
                Err(err) => {
                    info!(
                        block = ?state.block,
                        round = state.round,
                        %err,
                        "Failed to merge sentry vote"
                    );
                    return;
                }
            }
        };

        // The merged vote must still fit the next round's bound; otherwise
        // adopting it would make our own broadcast invalid.
        if !self.check_multiplies_for_round(&candidate, state.round + 1) {
            info!(
                block = ?state.block,
                round = state.round,
                multiplies = ?candidate.multiplies,
                "Skipping vote: candidate vote overflows"
            );
            return;
        }

        info!(
            block = ?state.block,
            round = state.round,
            multiplies = ?candidate.multiplies,
            "New sentry vote"
        );
        state.next_vote = Some(candidate);
    }

    fn validate_vote(&self, state: &EngineState, vote: &AggregatedVotes) -> bool {
        if state.block.is_zero() {
            debug!(vote_block = ?vote.block, "Ignoring sentry vote: local not ready");
            return false;
        }
        if vote.block != state.block {
            debug!(
                local_block = ?state.block,
                vote_block = ?vote.block,
                "Ignoring sentry vote: block hash does not match local candidate"
            );
            return false;
        }
        if vote.scp != state.scp_hash {
            debug!(
                local_scp = ?state.scp_hash,
                vote_scp = ?vote.scp,
                "Ignoring sentry vote: scp hash does not match local value"
            );
            return false;
        }
        if !self.check_multiplies_for_round(vote, state.round) {
            debug!(
                round = state.round,
                multiplies = ?vote.multiplies,
                "Ignoring sentry vote: multiplies exceed limit for round"
            );
            return false;
        }
        if let Err(err) = vote.validate(&state.scp) {
            warn!(
                vote_block = ?vote.block,
                multiplies = ?vote.multiplies,
                %err,
                "Ignoring sentry vote: invalid vote"
            );
            return false;
        }
        true
    }

    fn check_multiplies_for_round(&self, vote: &AggregatedVotes, k: u32) -> bool {
        if !self.config.enforce_vote_multiplies_bound {
            return true;
        }
        let limit = max_multiply(k);
        vote.multiplies.iter().all(|m| u64::from(*m) <= limit)
    }
}

fn max_multiply(k: u32) -> u64 {
    1u64 << (k * MAX_LOG_NEIGHBORS).min(63)
}
