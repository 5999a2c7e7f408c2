//! Recursive Length Prefix (RLP) encoding and decoding.
//!
//! RLP is the canonical serialization used project-wide: transactions, stake
//! pools, aggregated votes, index entries and every value persisted through
//! the key/value store go through this crate. Determinism matters more than
//! speed here; pool hashes and signing payloads are computed over these bytes.
//!
//! - [`encode::RLPEncode`] / [`decode::RLPDecode`]: the core traits
//! - [`structs::Encoder`] / [`structs::Decoder`]: field-by-field builders for
//!   struct types, with decode error context

pub mod constants;
pub mod decode;
pub mod encode;
pub mod error;
pub mod structs;
