use ethereum_types::H256;

/// Keccak-256 of the given bytes, the content-addressing hash used
/// project-wide (pool hashes, transaction hashes, block hashes).
pub fn keccak256(data: impl AsRef<[u8]>) -> H256 {
    keccak_hash::keccak(data)
}
