//! Ethereum legacy-transaction projection of smart-contract transactions.
//!
//! A smart-contract transaction signed by an Ethereum wallet carries an
//! EIP-155 signature over the legacy signing payload rather than the native
//! one. Re-deriving the legacy transaction from the native fields lets such
//! transactions be looked up under the hash their submitting wallet computed.

use bytes::Bytes;
use dnero_crypto::keccak::keccak256;
use dnero_rlp::{encode::RLPEncode, structs::Encoder};
use ethereum_types::{Address, U256};

use crate::{Hash, chain_config::eth_chain_id, types::transaction::SmartContractTx};

/// An Ethereum legacy (pre-typed) transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EthLegacyTx {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas: u64,
    /// Zero address means contract creation and is encoded as an empty
    /// byte string.
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl EthLegacyTx {
    /// Reconstructs the legacy transaction an Ethereum wallet would have
    /// produced for the given native smart-contract transaction.
    ///
    /// The native sequence starts at 1 where an Ethereum nonce starts at 0,
    /// and the native 65-byte signature stores the raw recovery id in its
    /// last byte; `v = 2·chain_id + 8 + (recovery + 27)` is the EIP-155
    /// encoding of the same id.
    pub fn from_smart_contract(tx: &SmartContractTx, chain_id: &str) -> Self {
        let sig = tx.from.signature.as_bytes();
        let r = U256::from_big_endian(&sig[..32]);
        let s = U256::from_big_endian(&sig[32..64]);
        let recovery = U256::from(sig[64]);
        let v = eth_chain_id(chain_id) * U256::from(2) + U256::from(8) + recovery + U256::from(27);

        Self {
            nonce: tx.from.sequence.saturating_sub(1),
            gas_price: tx.gas_price,
            gas: tx.gas_limit,
            to: tx.to.address,
            value: tx.from.coins.dtoken_wei,
            data: tx.data.clone(),
            v,
            r,
            s,
        }
    }

    fn encode_to_address<'a>(&self, encoder: Encoder<'a>) -> Encoder<'a> {
        if self.to == Address::zero() {
            encoder.encode_bytes(&[])
        } else {
            encoder.encode_field(&self.to)
        }
    }

    /// The EIP-155 signing hash:
    /// `keccak(rlp([nonce, gas_price, gas, to, value, data, chain_id, 0, 0]))`.
    pub fn signing_hash(&self, chain_id: &str) -> Hash {
        let mut buf = Vec::new();
        let encoder = Encoder::new(&mut buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas);
        self.encode_to_address(encoder)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&eth_chain_id(chain_id))
            .encode_field(&0u8)
            .encode_field(&0u8)
            .finish();
        keccak256(&buf)
    }

    /// The transaction hash Ethereum tooling computes:
    /// `keccak(rlp([nonce, gas_price, gas, to, value, data, v, r, s]))`.
    pub fn hash(&self) -> Hash {
        keccak256(&self.encode_to_vec())
    }
}

impl RLPEncode for EthLegacyTx {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        let encoder = Encoder::new(buf)
            .encode_field(&self.nonce)
            .encode_field(&self.gas_price)
            .encode_field(&self.gas);
        self.encode_to_address(encoder)
            .encode_field(&self.value)
            .encode_field(&self.data)
            .encode_field(&self.v)
            .encode_field(&self.r)
            .encode_field(&self.s)
            .finish();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::types::{coin::Coins, transaction::{TxInput, TxOutput}};
    use dnero_crypto::ecdsa::{PrivateKey, validate_eth_signature};
    use ethereum_types::Signature;
    use rand::rngs::OsRng;

    fn sample_tx(from: Address, sequence: u64) -> SmartContractTx {
        SmartContractTx {
            from: TxInput::new(from, Coins::dtoken(U256::from(1000)), sequence),
            to: TxOutput::new(Address::repeat_byte(9), Coins::zero()),
            gas_limit: 21_000,
            gas_price: U256::from(4_000_000_000_000u64),
            data: Bytes::from_static(b"\x60\x60"),
        }
    }

    #[test]
    fn test_eth_fields_derived_from_native() {
        let mut tx = sample_tx(Address::repeat_byte(1), 5);
        let mut sig = [0u8; 65];
        sig[0] = 0xaa;
        sig[32] = 0xbb;
        sig[64] = 1;
        tx.from.signature = Signature::from_slice(&sig);

        let eth_tx = EthLegacyTx::from_smart_contract(&tx, "privatenet");
        assert_eq!(eth_tx.nonce, 4);
        assert_eq!(eth_tx.gas, 21_000);
        assert_eq!(eth_tx.value, U256::from(1000));
        // v = 2*6 + 8 + (1 + 27) = 48 for privatenet (chain id 6).
        assert_eq!(eth_tx.v, U256::from(48));
        assert_eq!(eth_tx.r, U256::from_big_endian(&sig[..32]));
    }

    #[test]
    fn test_eth_signed_tx_validates() {
        let key = PrivateKey::generate(&mut OsRng);
        let mut tx = sample_tx(key.address(), 1);

        // Sign the EIP-155 payload the way an Ethereum wallet would.
        let eth_digest =
            EthLegacyTx::from_smart_contract(&tx, "privatenet").signing_hash("privatenet");
        tx.from.signature = key.sign_digest(eth_digest);

        let eth_tx = EthLegacyTx::from_smart_contract(&tx, "privatenet");
        assert!(validate_eth_signature(
            tx.from.address,
            eth_tx.signing_hash("privatenet"),
            &tx.from.signature
        ));

        // A natively signed transaction does not validate as ETH-signed.
        let mut native = sample_tx(key.address(), 1);
        native.from.signature = key.sign(b"native signing payload");
        let eth_tx = EthLegacyTx::from_smart_contract(&native, "privatenet");
        assert!(!validate_eth_signature(
            native.from.address,
            eth_tx.signing_hash("privatenet"),
            &native.from.signature
        ));
    }

    #[test]
    fn test_contract_creation_encodes_empty_to() {
        let mut tx = sample_tx(Address::repeat_byte(1), 1);
        tx.to = TxOutput::new(Address::zero(), Coins::zero());
        let eth_tx = EthLegacyTx::from_smart_contract(&tx, "privatenet");
        let create_hash = eth_tx.hash();

        let mut call = sample_tx(Address::repeat_byte(1), 1);
        call.to = TxOutput::new(Address::repeat_byte(9), Coins::zero());
        let call_hash = EthLegacyTx::from_smart_contract(&call, "privatenet").hash();
        assert_ne!(create_hash, call_hash);
    }
}
