//! The ledger: transaction execution over a state view.
//!
//! Each transaction kind has an executor with two phases: a read-only
//! `sanity_check` that validates the transaction against the current view
//! and returns a distinct error code per failure, and a `process` that
//! mutates the view. Failures are values; nothing in the execution path
//! panics on user input.

pub mod error;
pub mod execution;
pub mod ledger;
pub mod state;

pub use error::ExecutionError;
pub use execution::{Executor, TxExecutor};
pub use ledger::Ledger;
pub use state::StoreView;
