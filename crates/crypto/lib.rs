//! Cryptographic primitives for the dnero node.
//!
//! Two signature schemes coexist on this chain:
//! - secp256k1 recoverable ECDSA for account transactions ([`ecdsa`]), with
//!   keccak-derived addresses (Ethereum-compatible),
//! - BLS12-381 aggregate signatures for sentry block attestations ([`bls`]),
//!   in the minimal-pubkey convention (public keys in G1, signatures in G2).

pub mod bls;
pub mod ecdsa;
pub mod error;
pub mod keccak;

pub use error::CryptoError;
