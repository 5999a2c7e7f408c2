//! secp256k1 recoverable ECDSA for account transactions.
//!
//! Native signatures are 65 bytes `r ‖ s ‖ recovery_id` over the keccak of
//! the signing payload; addresses are the low 20 bytes of the keccak of the
//! uncompressed public key.

use ethereum_types::{Address, H256, Signature};
use secp256k1::{
    Message, PublicKey, SECP256K1, SecretKey,
    ecdsa::{RecoverableSignature, RecoveryId},
};
use rand::RngCore;

use crate::{error::CryptoError, keccak::keccak256};

#[derive(Clone, Debug)]
pub struct PrivateKey(SecretKey);

impl PrivateKey {
    pub fn generate(rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; 32];
        loop {
            rng.fill_bytes(&mut bytes);
            if let Ok(key) = SecretKey::from_slice(&bytes) {
                return Self(key);
            }
        }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|_| CryptoError::InvalidSecretKey)
    }

    pub fn public_key(&self) -> PublicKey {
        self.0.public_key(SECP256K1)
    }

    pub fn address(&self) -> Address {
        address_from_pubkey(&self.public_key())
    }

    /// Signs the keccak of `msg`, producing a 65-byte recoverable signature.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        self.sign_digest(keccak256(msg))
    }

    pub fn sign_digest(&self, digest: H256) -> Signature {
        let msg = Message::from_digest(digest.0);
        let (recovery_id, signature) = SECP256K1
            .sign_ecdsa_recoverable(&msg, &self.0)
            .serialize_compact();

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(&signature);
        bytes[64] = recovery_id.to_i32() as u8;
        Signature::from_slice(&bytes)
    }
}

pub fn address_from_pubkey(pubkey: &PublicKey) -> Address {
    Address::from(keccak256(&pubkey.serialize_uncompressed()[1..]))
}

/// Recovers the signer address from a 32-byte digest and a 65-byte
/// recoverable signature.
pub fn recover_signer(digest: H256, signature: &Signature) -> Result<Address, CryptoError> {
    let bytes = signature.as_bytes();
    let recovery_id = RecoveryId::from_i32(i32::from(bytes[64]))
        .map_err(|_| CryptoError::InvalidSignature("recovery id"))?;
    let signature = RecoverableSignature::from_compact(&bytes[..64], recovery_id)
        .map_err(|_| CryptoError::InvalidSignature("compact form"))?;
    let pubkey = SECP256K1
        .recover_ecdsa(&Message::from_digest(digest.0), &signature)
        .map_err(|_| CryptoError::RecoveryFailed)?;
    Ok(address_from_pubkey(&pubkey))
}

/// Verifies a native signature over `msg` against the expected signer
/// address. The message is keccak-hashed before recovery.
pub fn verify_signature(msg: &[u8], signature: &Signature, signer: Address) -> bool {
    recover_signer(keccak256(msg), signature).is_ok_and(|recovered| recovered == signer)
}

/// Verifies that `signature` over the given Ethereum signing digest recovers
/// to `from`. Used to detect smart-contract transactions that were signed
/// with an Ethereum wallet rather than a native one.
pub fn validate_eth_signature(from: Address, digest: H256, signature: &Signature) -> bool {
    recover_signer(digest, signature).is_ok_and(|recovered| recovered == from)
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_and_verify() {
        let key = PrivateKey::generate(&mut OsRng);
        let sig = key.sign(b"transfer 5 dnero");
        assert!(verify_signature(b"transfer 5 dnero", &sig, key.address()));
        assert!(!verify_signature(b"transfer 9 dnero", &sig, key.address()));
    }

    #[test]
    fn test_recover_signer() {
        let key = PrivateKey::generate(&mut OsRng);
        let digest = keccak256(b"payload");
        let sig = key.sign_digest(digest);
        assert_eq!(recover_signer(digest, &sig).unwrap(), key.address());
    }

    #[test]
    fn test_wrong_signer_rejected() {
        let key = PrivateKey::generate(&mut OsRng);
        let other = PrivateKey::generate(&mut OsRng);
        let sig = key.sign(b"payload");
        assert!(!verify_signature(b"payload", &sig, other.address()));
    }
}
