use bytes::Bytes;
use dnero_common::types::{Log, SmartContractTx};
use ethereum_types::Address;

use crate::state::StoreView;

/// Result of executing a smart-contract transaction.
#[derive(Clone, Debug, Default)]
pub struct EvmResult {
    pub ret: Bytes,
    /// The deployed contract address for creations, zero otherwise.
    pub contract_address: Address,
    pub gas_used: u64,
    pub logs: Vec<Log>,
    pub error: Option<String>,
}

/// Contract with the EVM interpreter, which lives outside this crate.
///
/// `execute` runs the transaction against the view, transferring value and
/// mutating contract storage as needed. It must not touch the sender's
/// sequence number (the executor owns it) and reports failures through
/// [`EvmResult::error`] rather than by returning an error: a reverted
/// transaction still consumes gas and produces a receipt.
pub trait Evm: Send + Sync {
    fn execute(&self, view: &mut StoreView, tx: &SmartContractTx) -> EvmResult;
}
