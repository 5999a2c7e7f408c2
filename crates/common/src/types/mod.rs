pub mod account;
pub mod coin;
pub mod eth;
pub mod log;
pub mod stake;
pub mod transaction;

pub use account::Account;
pub use coin::Coins;
pub use eth::EthLegacyTx;
pub use log::Log;
pub use stake::{Stake, StakeHolder};
pub use transaction::{
    DepositStakeTx, DepositStakeTxV1, SendTx, SmartContractTx, StakePurpose, Tx, TxInput, TxOutput,
    WithdrawStakeTx,
};
