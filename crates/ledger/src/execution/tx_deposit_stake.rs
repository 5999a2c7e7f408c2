use dnero_common::{
    Hash, Signature,
    chain_config::{ChainConfig, Fork},
    constants::GAS_DEPOSIT_STAKE_TX,
    types::{DepositStakeTxV1, StakePurpose, Tx},
};
use dnero_core::{
    elite_edge::{MAX_ELITE_EDGE_STAKE_DEPOSIT, MIN_ELITE_EDGE_STAKE_DEPOSIT},
    sentry::MIN_SENTRY_STAKE_DEPOSIT,
    validator::MIN_VALIDATOR_STAKE_DEPOSIT,
};
use dnero_crypto::{bls, ecdsa::verify_signature};
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

pub struct DepositStakeExecutor {
    config: ChainConfig,
}

impl DepositStakeExecutor {
    pub fn new(config: ChainConfig) -> Self {
        Self { config }
    }

    /// Up-casts the versionless variant; existing deposits predate the BLS
    /// key material, so those fields come back empty.
    fn cast(tx: &Tx) -> Result<DepositStakeTxV1, ExecutionError> {
        match tx {
            Tx::DepositStakeV1(tx) => Ok(tx.clone()),
            Tx::DepositStake(tx) => Ok(DepositStakeTxV1 {
                fee: tx.fee,
                source: tx.source.clone(),
                holder: tx.holder.clone(),
                purpose: tx.purpose,
                bls_pubkey: bls::PublicKey::empty(),
                bls_pop: bls::Signature::empty(),
                holder_sig: Signature::zero(),
            }),
            _ => Err(ExecutionError::InvalidInput("not a deposit stake transaction")),
        }
    }

    /// A holder entering a BLS-keyed pool must prove possession of its key:
    /// the PoP must verify against the public key, and the holder address
    /// must have natively signed the PoP bytes.
    fn verify_new_holder_key_material(tx: &DepositStakeTxV1) -> Result<(), ExecutionError> {
        if tx.bls_pubkey.is_empty() {
            return Err(ExecutionError::Generic("must provide BLS pubkey".to_string()));
        }
        if tx.bls_pop.is_empty() {
            return Err(ExecutionError::Generic("must provide BLS POP".to_string()));
        }
        if tx.holder_sig == Signature::zero() {
            return Err(ExecutionError::Generic(
                "must provide holder signature".to_string(),
            ));
        }
        if !verify_signature(&tx.bls_pop.to_bytes(), &tx.holder_sig, tx.holder.address) {
            return Err(ExecutionError::Generic(
                "BLS key info is not properly signed".to_string(),
            ));
        }
        if !tx.bls_pop.pop_verify(&tx.bls_pubkey) {
            return Err(ExecutionError::Generic("BLS pop is invalid".to_string()));
        }
        Ok(())
    }
}

impl TxExecutor for DepositStakeExecutor {
    fn sanity_check(&self, view: &StoreView, tx_enum: &Tx) -> Result<(), ExecutionError> {
        // The view points to the parent of the current block.
        let block_height = view.height() + 1;

        if matches!(tx_enum, Tx::DepositStakeV1(_))
            && !self
                .config
                .is_fork_activated(Fork::VersionedStake, block_height)
        {
            return Err(ExecutionError::FeatureNotActive);
        }

        let tx = Self::cast(tx_enum)?;

        validate_input_basic(&tx.source)?;

        let source_account = get_input(view, &tx.source)?;

        let signing_bytes = tx_enum.signing_bytes(&self.config.chain_id);
        validate_input_advanced(&source_account, &signing_bytes, &tx.source).inspect_err(|err| {
            debug!(source = %tx.source.address, %err, "Input validation failed")
        })?;

        sanity_check_for_fee(&self.config, &tx.fee, block_height)?;

        // Versionless deposits predate elite-edge staking.
        if matches!(tx_enum, Tx::DepositStake(_)) && tx.purpose == StakePurpose::EliteEdgeNode {
            return Err(ExecutionError::InvalidStakePurpose);
        }

        let stake = tx.source.coins;
        match tx.purpose {
            StakePurpose::Validator | StakePurpose::Sentry => {
                // Validator and sentry stakes are denominated in Dnero.
                if !stake.dtoken_wei.is_zero() {
                    return Err(ExecutionError::InvalidStake);
                }
            }
            StakePurpose::EliteEdgeNode => {
                // Elite-edge stakes are denominated in DToken.
                if !stake.dnero_wei.is_zero() {
                    return Err(ExecutionError::InvalidStake);
                }
            }
        }

        // Minimum stake deposit requirements, to avoid spamming.
        match tx.purpose {
            StakePurpose::Validator => {
                if stake.dnero_wei < *MIN_VALIDATOR_STAKE_DEPOSIT {
                    return Err(ExecutionError::InsufficientStake);
                }
            }
            StakePurpose::Sentry => {
                if stake.dnero_wei < *MIN_SENTRY_STAKE_DEPOSIT {
                    return Err(ExecutionError::InsufficientStake);
                }
            }
            StakePurpose::EliteEdgeNode => {
                if !self.config.is_fork_activated(Fork::EliteEdge, block_height) {
                    return Err(ExecutionError::FeatureNotActive);
                }
                if stake.dtoken_wei < *MIN_ELITE_EDGE_STAKE_DEPOSIT {
                    return Err(ExecutionError::InsufficientStake);
                }
                let pool = view.get_elite_edge_node_pool()?;
                let current_stake = pool
                    .get(tx.holder.address)
                    .map(|node| node.stake_holder.total_stake())
                    .unwrap_or_default();
                let combined = current_stake
                    .checked_add(stake.dtoken_wei)
                    .ok_or(ExecutionError::StakeExceedsCap)?;
                if combined > *MAX_ELITE_EDGE_STAKE_DEPOSIT {
                    return Err(ExecutionError::StakeExceedsCap);
                }
            }
        }

        let minimal_balance = stake
            .checked_add(&tx.fee)
            .ok_or(ExecutionError::InvalidStake)?;
        if !source_account.balance.is_gte(&minimal_balance) {
            debug!(source = %tx.source.address, "Source does not have enough balance");
            return Err(ExecutionError::InsufficientFund);
        }

        Ok(())
    }

    fn process(&self, view: &mut StoreView, tx_enum: &Tx) -> Result<Hash, ExecutionError> {
        let block_height = view.height() + 1;
        let tx = Self::cast(tx_enum)?;

        // Reload the account: balances may be stale across executor phases.
        let mut source_account = get_input(view, &tx.source)?;

        if !charge_fee(&mut source_account, &tx.fee) {
            return Err(ExecutionError::Generic(
                "failed to charge transaction fee".to_string(),
            ));
        }

        let stake = tx.source.coins;
        source_account.balance = source_account
            .balance
            .checked_sub(&stake)
            .ok_or(ExecutionError::NotEnoughBalanceToStake)?;

        let source_address = tx.source.address;
        let holder_address = tx.holder.address;

        match tx.purpose {
            StakePurpose::Validator => {
                let mut vcp = view.get_validator_candidate_pool()?;
                vcp.deposit_stake(source_address, holder_address, stake.dnero_wei)?;
                view.update_validator_candidate_pool(&vcp)?;
            }
            StakePurpose::Sentry => {
                let mut scp = view.get_sentry_candidate_pool()?;
                if !scp.contains(holder_address) {
                    Self::verify_new_holder_key_material(&tx)?;
                }
                scp.deposit_stake(
                    source_address,
                    holder_address,
                    stake.dnero_wei,
                    tx.bls_pubkey,
                    block_height,
                )?;
                view.update_sentry_candidate_pool(&scp)?;
            }
            StakePurpose::EliteEdgeNode => {
                let mut eenp = view.get_elite_edge_node_pool()?;
                if !eenp.contains(holder_address) {
                    Self::verify_new_holder_key_material(&tx)?;
                }
                eenp.deposit_stake(
                    source_address,
                    holder_address,
                    stake.dtoken_wei,
                    tx.bls_pubkey,
                    block_height,
                )?;
                view.update_elite_edge_node_pool(&eenp)?;
            }
        }

        // Only validator stake transactions feed the height list the
        // consensus engine samples the validator set from.
        if tx.purpose == StakePurpose::Validator {
            let mut height_list = view.get_stake_transaction_height_list()?;
            height_list.push(block_height);
            view.update_stake_transaction_height_list(&height_list)?;
        }

        source_account.sequence += 1;
        view.set_account(source_address, &source_account)?;

        Ok(tx_enum.tx_id(&self.config.chain_id))
    }

    fn effective_gas_price(&self, tx: &Tx) -> U256 {
        tx.fee().dtoken_wei / U256::from(GAS_DEPOSIT_STAKE_TX)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dnero_common::types::{Coins, TxInput, TxOutput};
    use dnero_common::{U256, types::Account};
    use dnero_crypto::ecdsa::PrivateKey;
    use dnero_storage::KvStore;
    use ethereum_types::Address;
    use rand::rngs::OsRng;

    struct Harness {
        config: ChainConfig,
        executor: DepositStakeExecutor,
        view: StoreView,
        source_key: PrivateKey,
        holder_key: PrivateKey,
        bls_key: bls::SecretKey,
    }

    impl Harness {
        fn new() -> Self {
            let config = ChainConfig::privatenet();
            let mut view = StoreView::new(KvStore::in_memory(), 100);
            let source_key = PrivateKey::generate(&mut OsRng);
            // Plenty of both denominations.
            let balance = Coins::new(
                U256::from(10_000_000u64) * U256::exp10(18),
                U256::from(1_000_000u64) * U256::exp10(18),
            );
            view.set_account(source_key.address(), &Account::new(balance))
                .unwrap();
            Self {
                executor: DepositStakeExecutor::new(config.clone()),
                config,
                view,
                source_key,
                holder_key: PrivateKey::generate(&mut OsRng),
                bls_key: bls::SecretKey::generate(&mut OsRng),
            }
        }

        fn deposit_tx(&self, purpose: StakePurpose, stake: Coins, sequence: u64) -> Tx {
            let pop = self.bls_key.pop();
            let holder_sig = self.holder_key.sign(&pop.to_bytes());
            let mut tx = DepositStakeTxV1 {
                fee: Coins::dtoken(U256::from(3) * U256::exp10(17)),
                source: TxInput::new(self.source_key.address(), stake, sequence),
                holder: TxOutput::new(self.holder_key.address(), Coins::zero()),
                purpose,
                bls_pubkey: self.bls_key.public_key(),
                bls_pop: pop,
                holder_sig,
            };
            let signing_bytes =
                Tx::DepositStakeV1(tx.clone()).signing_bytes(&self.config.chain_id);
            tx.source.signature = self.source_key.sign(&signing_bytes);
            Tx::DepositStakeV1(tx)
        }

        fn execute(&mut self, tx: &Tx) -> Result<Hash, ExecutionError> {
            self.executor.sanity_check(&self.view, tx)?;
            self.executor.process(&mut self.view, tx)
        }
    }

    fn dnero(amount: u64) -> Coins {
        Coins::dnero(U256::from(amount) * U256::exp10(18))
    }

    fn dtoken(amount: u64) -> Coins {
        Coins::dtoken(U256::from(amount) * U256::exp10(18))
    }

    #[test]
    fn test_sentry_deposit_creates_candidate() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);
        harness.execute(&tx).unwrap();

        let scp = harness.view.get_sentry_candidate_pool().unwrap();
        assert!(scp.contains(harness.holder_key.address()));
        assert_eq!(
            scp.index(&harness.bls_key.public_key()),
            Some(
                scp.iter()
                    .position(|s| s.stake_holder.holder == harness.holder_key.address())
                    .unwrap()
            )
        );

        let account = harness
            .view
            .get_account(harness.source_key.address())
            .unwrap()
            .unwrap();
        assert_eq!(account.sequence, 1);
    }

    #[test]
    fn test_replay_fails_on_sequence() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);
        harness.execute(&tx).unwrap();

        // The same transaction again must fail: the account sequence moved.
        let err = harness.execute(&tx).unwrap_err();
        assert!(matches!(
            err,
            ExecutionError::InvalidSequence {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_versioned_stake_fork_gate() {
        let mut harness = Harness::new();
        harness.config.fork_activation_heights[Fork::VersionedStake as usize] = Some(102);
        harness.executor = DepositStakeExecutor::new(harness.config.clone());

        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);

        // View height 100 => block height 101, below the activation height.
        assert!(matches!(
            harness.executor.sanity_check(&harness.view, &tx),
            Err(ExecutionError::FeatureNotActive)
        ));

        // The same transaction one block later passes the same check.
        let mut view = StoreView::new(KvStore::in_memory(), 101);
        view.set_account(
            harness.source_key.address(),
            &Account::new(Coins::new(
                U256::from(10_000_000u64) * U256::exp10(18),
                U256::from(1_000_000u64) * U256::exp10(18),
            )),
        )
        .unwrap();
        harness.executor.sanity_check(&view, &tx).unwrap();
    }

    #[test]
    fn test_insufficient_sentry_stake_rejected() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(1999), 1);
        assert!(matches!(
            harness.execute(&tx),
            Err(ExecutionError::InsufficientStake)
        ));
    }

    #[test]
    fn test_sentry_stake_must_be_dnero() {
        let mut harness = Harness::new();
        let mut stake = dnero(2000);
        stake.dtoken_wei = U256::from(1);
        let tx = harness.deposit_tx(StakePurpose::Sentry, stake, 1);
        assert!(matches!(
            harness.execute(&tx),
            Err(ExecutionError::InvalidStake)
        ));
    }

    #[test]
    fn test_fee_below_minimum_rejected() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);
        let Tx::DepositStakeV1(mut inner) = tx else {
            unreachable!()
        };
        inner.fee = Coins::dtoken(U256::from(1));
        let signing_bytes =
            Tx::DepositStakeV1(inner.clone()).signing_bytes(&harness.config.chain_id);
        inner.source.signature = harness.source_key.sign(&signing_bytes);
        let tx = Tx::DepositStakeV1(inner);
        assert!(matches!(
            harness.execute(&tx),
            Err(ExecutionError::InvalidFee(_))
        ));
    }

    #[test]
    fn test_invalid_pop_rejected_for_new_holder() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);
        let Tx::DepositStakeV1(mut inner) = tx else {
            unreachable!()
        };
        // PoP from a different key than the advertised pubkey.
        let other = bls::SecretKey::generate(&mut OsRng);
        inner.bls_pop = other.pop();
        inner.holder_sig = harness.holder_key.sign(&inner.bls_pop.to_bytes());
        let signing_bytes =
            Tx::DepositStakeV1(inner.clone()).signing_bytes(&harness.config.chain_id);
        inner.source.signature = harness.source_key.sign(&signing_bytes);
        let tx = Tx::DepositStakeV1(inner);

        let err = harness.execute(&tx).unwrap_err();
        assert!(matches!(err, ExecutionError::Generic(msg) if msg.contains("pop")));
    }

    #[test]
    fn test_elite_edge_cap() {
        let mut harness = Harness::new();

        let tx = harness.deposit_tx(StakePurpose::EliteEdgeNode, dtoken(300_000), 1);
        harness.execute(&tx).unwrap();

        // 300,000 + 250,000 > 500,000: rejected before any mutation.
        let tx = harness.deposit_tx(StakePurpose::EliteEdgeNode, dtoken(250_000), 2);
        assert!(matches!(
            harness.execute(&tx),
            Err(ExecutionError::StakeExceedsCap)
        ));
    }

    #[test]
    fn test_elite_edge_fork_gate() {
        let mut harness = Harness::new();
        harness.config.fork_activation_heights[Fork::EliteEdge as usize] = Some(1_000);
        harness.executor = DepositStakeExecutor::new(harness.config.clone());

        let tx = harness.deposit_tx(StakePurpose::EliteEdgeNode, dtoken(10_000), 1);
        assert!(matches!(
            harness.execute(&tx),
            Err(ExecutionError::FeatureNotActive)
        ));
    }

    #[test]
    fn test_validator_deposit_appends_height_list() {
        let mut harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Validator, dnero(2_000_000), 1);
        harness.execute(&tx).unwrap();

        assert_eq!(
            harness.view.get_stake_transaction_height_list().unwrap(),
            vec![101]
        );
        let vcp = harness.view.get_validator_candidate_pool().unwrap();
        assert!(vcp.contains(harness.holder_key.address()));
    }

    #[test]
    fn test_effective_gas_price() {
        let harness = Harness::new();
        let tx = harness.deposit_tx(StakePurpose::Sentry, dnero(2000), 1);
        assert_eq!(
            harness.executor.effective_gas_price(&tx),
            (U256::from(3) * U256::exp10(17)) / U256::from(GAS_DEPOSIT_STAKE_TX)
        );
    }
}
