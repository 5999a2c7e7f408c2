use dnero_core::PoolError;
use dnero_storage::StoreError;
use ethereum_types::Address;
use thiserror::Error;

/// Transaction validation and execution failures. Each failure the sanity
/// checks can produce has a distinct variant; the RPC layer maps these onto
/// its error codes.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("feature is not active yet at this block height")]
    FeatureNotActive,
    #[error("invalid transaction input: {0}")]
    InvalidInput(&'static str),
    #[error("failed to get the account: {0}")]
    AccountNotFound(Address),
    #[error("signature verification failed")]
    InvalidSignature,
    #[error("invalid sequence: expected {expected}, got {got}")]
    InvalidSequence { expected: u64, got: u64 },
    #[error("insufficient fee, transaction fee needs to be at least {0} DTokenWei")]
    InvalidFee(ethereum_types::U256),
    #[error("invalid stake purpose")]
    InvalidStakePurpose,
    #[error("invalid stake for stake deposit")]
    InvalidStake,
    #[error("insufficient amount of stake")]
    InsufficientStake,
    #[error("stake exceeds the elite edge node cap")]
    StakeExceedsCap,
    #[error("not enough balance to stake")]
    NotEnoughBalanceToStake,
    #[error("insufficient gas price, needs to be at least {0} DTokenWei")]
    InvalidGasPrice(ethereum_types::U256),
    #[error("invalid gas limit, needs to be at most {0}")]
    InvalidGasLimit(ethereum_types::U256),
    #[error("fee limit too high")]
    FeeLimitTooHigh,
    #[error("insufficient fund")]
    InsufficientFund,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{0}")]
    Generic(String),
}

impl From<PoolError> for ExecutionError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::InsufficientStake(_) => ExecutionError::InsufficientStake,
            PoolError::StakeExceedsCap => ExecutionError::StakeExceedsCap,
            other => ExecutionError::Generic(other.to_string()),
        }
    }
}
