//! Consensus engines. The sentry engine aggregates off-path BLS attestations
//! from the sentry tier; block proposal and finalization live elsewhere and
//! feed this crate through block-arrival notifications.

pub mod sentry;

pub use sentry::{ConsensusConfig, SentryEngine};
