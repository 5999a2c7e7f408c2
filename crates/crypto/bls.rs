//! BLS12-381 aggregate signatures for sentry block attestations.
//!
//! Minimal-pubkey convention: public keys live in G1 (48-byte compressed),
//! signatures in G2 (96-byte compressed). Signatures over the same message
//! aggregate by group addition and verify against the sum of the signer
//! public keys, weighted by the multiplicity each signature was folded in
//! with. Proof-of-possession uses a separate domain tag to close the
//! rogue-key attack.

use bls12_381::{
    G1Affine, G1Projective, G2Affine, G2Prepared, G2Projective, Gt, Scalar,
    hash_to_curve::{ExpandMsgXmd, HashToCurve},
    multi_miller_loop,
};
use ff::Field;
use rand::RngCore;
use sha2_09::Sha256;

use crate::error::CryptoError;

/// Domain separation tag for block attestation signatures.
const DST_SIGNATURE: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";
/// Domain separation tag for proofs of possession.
const DST_POP: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

fn hash_to_g2(msg: &[u8], dst: &[u8]) -> G2Projective {
    <G2Projective as HashToCurve<ExpandMsgXmd<Sha256>>>::hash_to_curve(msg, dst)
}

#[derive(Clone, Debug)]
pub struct SecretKey(Scalar);

impl SecretKey {
    pub fn generate(rng: &mut impl RngCore) -> Self {
        Self(Scalar::random(rng))
    }

    /// Deserializes a secret key from its canonical 32-byte little-endian form.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, CryptoError> {
        Option::from(Scalar::from_bytes(bytes))
            .map(Self)
            .ok_or(CryptoError::InvalidSecretKey)
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(G1Projective::generator() * self.0)
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature(hash_to_g2(msg, DST_SIGNATURE) * self.0)
    }

    /// Proof of possession: a signature by this key over its own public key.
    pub fn pop(&self) -> Signature {
        let pubkey = self.public_key();
        Signature(hash_to_g2(&pubkey.to_bytes(), DST_POP) * self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PublicKey(G1Projective);

impl PublicKey {
    /// The identity element, used as the "absent key" placeholder in
    /// transactions that do not carry one.
    pub fn empty() -> Self {
        Self(G1Projective::identity())
    }

    pub fn is_empty(&self) -> bool {
        bool::from(self.0.is_identity())
    }

    pub fn to_bytes(&self) -> [u8; 48] {
        G1Affine::from(&self.0).to_compressed()
    }

    pub fn from_bytes(bytes: &[u8; 48]) -> Result<Self, CryptoError> {
        Option::from(G1Affine::from_compressed(bytes))
            .map(|p: G1Affine| Self(G1Projective::from(p)))
            .ok_or(CryptoError::InvalidPoint("BLS12-381 G1 public key"))
    }
}

/// Computes the weighted sum `Σ multiplies[i] · pubkeys[i]`, the public key
/// an aggregate signature with those multiplicities verifies against.
/// Zero-weight entries are skipped.
pub fn aggregate_public_keys(pubkeys: &[PublicKey], multiplies: &[u32]) -> PublicKey {
    let mut acc = G1Projective::identity();
    for (pubkey, multiply) in pubkeys.iter().zip(multiplies.iter()) {
        match multiply {
            0 => continue,
            1 => acc += pubkey.0,
            m => acc += pubkey.0 * Scalar::from(u64::from(*m)),
        }
    }
    PublicKey(acc)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Signature(G2Projective);

impl Signature {
    /// The identity signature, the neutral element of aggregation.
    pub fn empty() -> Self {
        Self(G2Projective::identity())
    }

    pub fn is_empty(&self) -> bool {
        bool::from(self.0.is_identity())
    }

    /// Folds another signature into this one.
    pub fn aggregate(&mut self, other: &Signature) {
        self.0 += other.0;
    }

    /// Verifies this signature over `msg` against `pubkey` (which may itself
    /// be a weighted aggregate).
    pub fn verify(&self, msg: &[u8], pubkey: &PublicKey) -> bool {
        self.verify_with_dst(msg, pubkey, DST_SIGNATURE)
    }

    /// Verifies this signature as a proof of possession for `pubkey`.
    pub fn pop_verify(&self, pubkey: &PublicKey) -> bool {
        self.verify_with_dst(&pubkey.to_bytes(), pubkey, DST_POP)
    }

    fn verify_with_dst(&self, msg: &[u8], pubkey: &PublicKey, dst: &[u8]) -> bool {
        if pubkey.is_empty() {
            return false;
        }

        // e(-G1, sig) · e(pk, H(msg)) == 1  <=>  e(G1, sig) == e(pk, H(msg))
        let sig = G2Prepared::from(G2Affine::from(&self.0));
        let hashed = G2Prepared::from(G2Affine::from(hash_to_g2(msg, dst)));
        let neg_generator = -G1Affine::generator();
        let pubkey = G1Affine::from(&pubkey.0);

        let terms = [(&neg_generator, &sig), (&pubkey, &hashed)];
        multi_miller_loop(&terms).final_exponentiation() == Gt::identity()
    }

    pub fn to_bytes(&self) -> [u8; 96] {
        G2Affine::from(&self.0).to_compressed()
    }

    pub fn from_bytes(bytes: &[u8; 96]) -> Result<Self, CryptoError> {
        Option::from(G2Affine::from_compressed(bytes))
            .map(|p: G2Affine| Self(G2Projective::from(p)))
            .ok_or(CryptoError::InvalidPoint("BLS12-381 G2 signature"))
    }
}
