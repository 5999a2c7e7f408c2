//! Protocol constants. Fork-gated accessors live in [`crate::fees`].

/// DenomDneroWei is the basic unit of Dnero, 1 Dnero = 10^18 DneroWei.
pub const DENOM_DNERO_WEI: &str = "DneroWei";

/// DenomDTokenWei is the basic unit of DToken, 1 DToken = 10^18 DTokenWei.
pub const DENOM_DTOKEN_WEI: &str = "DTokenWei";

// Initial gas parameters

/// Minimum gas price for a smart contract transaction.
pub const MINIMUM_GAS_PRICE: u64 = 100_000_000; // 1e8 wei

/// Maximum gas limit for a smart contract transaction.
pub const MAXIMUM_TX_GAS_LIMIT: u64 = 10_000_000;

/// Minimum fee for a regular transaction.
pub const MINIMUM_TRANSACTION_FEE_DTOKEN_WEI: u64 = 1_000_000_000_000; // 1e12 wei

// NewFee gas burn adjustment

pub const MINIMUM_GAS_PRICE_NEW_FEE: u64 = 4_000_000_000_000; // 4e12 wei

pub const MAXIMUM_TX_GAS_LIMIT_NEW_FEE: u64 = 20_000_000;

pub const MINIMUM_TRANSACTION_FEE_DTOKEN_WEI_NEW_FEE: u64 = 300_000_000_000_000_000; // 3e17 wei

/// Max number of accounts one transaction is allowed to modify, to avoid
/// spamming.
pub const MAX_ACCOUNTS_AFFECTED_PER_TX: usize = 512;

// Gas costs per transaction kind, consulted for mempool ordering.

pub const GAS_SEND_TX_PER_ACCOUNT: u64 = 5_000;

pub const GAS_DEPOSIT_STAKE_TX: u64 = 10_000;

pub const GAS_WITHDRAW_STAKE_TX: u64 = 10_000;

/// Number of blocks a withdrawn stake stays locked before it can be returned
/// to its source.
pub const RETURN_LOCKING_PERIOD: u64 = 28_800;

// Inflation is currently disabled; the rate constants are retained because
// the denominator semantics (generated wei per existing DneroWei per block)
// are part of the chain parameters.

pub const VALIDATOR_DNERO_GENERATION_RATE_NUMERATOR: i64 = 0; // ZERO inflation for Dnero

pub const VALIDATOR_DNERO_GENERATION_RATE_DENOMINATOR: i64 = 100_000_000_000; // 1e11

pub const VALIDATOR_DTOKEN_GENERATION_RATE_NUMERATOR: i64 = 0; // ZERO initial inflation for DToken

pub const VALIDATOR_DTOKEN_GENERATION_RATE_DENOMINATOR: i64 = 1_000_000_000; // 1e9
