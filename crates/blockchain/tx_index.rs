use bytes::Bytes;
use dnero_common::{
    BlockHeight, Hash,
    types::{EthLegacyTx, Log, Tx},
};
use dnero_core::Block;
use dnero_crypto::{ecdsa::validate_eth_signature, keccak::keccak256};
use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use dnero_storage::StoreError;
use ethereum_types::Address;
use tracing::debug;

use crate::{Chain, error::ChainError};

/// DB key for the index entry of the given transaction hash.
fn tx_index_key(hash: Hash) -> Vec<u8> {
    [b"tx/".as_slice(), hash.as_bytes()].concat()
}

/// DB key for the receipt of the given transaction hash.
fn tx_receipt_key(hash: Hash) -> Vec<u8> {
    [b"txr/".as_slice(), hash.as_bytes()].concat()
}

/// Positional metadata to look up a transaction given only its hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxIndexEntry {
    pub block_hash: Hash,
    pub block_height: BlockHeight,
    pub index: u64,
}

impl RLPEncode for TxIndexEntry {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.block_hash)
            .encode_field(&self.block_height)
            .encode_field(&self.index)
            .finish();
    }
}

impl RLPDecode for TxIndexEntry {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (block_hash, decoder) = decoder.decode_field("block_hash")?;
        let (block_height, decoder) = decoder.decode_field("block_height")?;
        let (index, decoder) = decoder.decode_field("index")?;
        Ok((
            TxIndexEntry {
                block_hash,
                block_height,
                index,
            },
            decoder.finish()?,
        ))
    }
}

/// Smart-contract transaction execution result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceiptEntry {
    pub tx_hash: Hash,
    pub logs: Vec<Log>,
    pub evm_ret: Bytes,
    pub contract_address: Address,
    pub gas_used: u64,
    pub evm_err: String,
}

impl RLPEncode for TxReceiptEntry {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.tx_hash)
            .encode_field(&self.logs)
            .encode_field(&self.evm_ret)
            .encode_field(&self.contract_address)
            .encode_field(&self.gas_used)
            .encode_field(&self.evm_err)
            .finish();
    }
}

impl RLPDecode for TxReceiptEntry {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (tx_hash, decoder) = decoder.decode_field("tx_hash")?;
        let (logs, decoder) = decoder.decode_field("logs")?;
        let (evm_ret, decoder) = decoder.decode_field("evm_ret")?;
        let (contract_address, decoder) = decoder.decode_field("contract_address")?;
        let (gas_used, decoder) = decoder.decode_field("gas_used")?;
        let (evm_err, decoder) = decoder.decode_field("evm_err")?;
        Ok((
            TxReceiptEntry {
                tx_hash,
                logs,
                evm_ret,
                contract_address,
                gas_used,
                evm_err,
            },
            decoder.finish()?,
        ))
    }
}

impl Chain {
    /// Adds the transactions of the given block to the index. With
    /// `force == false`, hashes that already have an entry are skipped.
    pub fn add_txs_to_index(&self, block: &Block, force: bool) -> Result<(), ChainError> {
        for (idx, tx_bytes) in block.txs.iter().enumerate() {
            let entry = TxIndexEntry {
                block_hash: block.hash(),
                block_height: block.height(),
                index: idx as u64,
            };

            let tx_hash = keccak256(tx_bytes);
            self.put_index_entry(tx_hash, &entry, force)?;

            if let Some(eth_hash) = self.eth_tx_hash(tx_bytes) {
                self.put_index_entry(eth_hash, &entry, force)?;
            }
        }
        Ok(())
    }

    fn put_index_entry(
        &self,
        tx_hash: Hash,
        entry: &TxIndexEntry,
        force: bool,
    ) -> Result<(), ChainError> {
        let key = tx_index_key(tx_hash);
        if !force && self.store().contains(&key)? {
            return Ok(());
        }
        self.store().put(&key, entry)?;
        Ok(())
    }

    /// The Ethereum-compatible hash of a smart-contract transaction, if the
    /// transaction decodes as one and its signature proves it was ETH-signed.
    /// Natively signed transactions have no second hash.
    fn eth_tx_hash(&self, tx_bytes: &[u8]) -> Option<Hash> {
        let Ok(Tx::SmartContract(tx)) = Tx::from_bytes(tx_bytes) else {
            return None;
        };

        let eth_tx = EthLegacyTx::from_smart_contract(&tx, &self.chain_id);
        let signing_hash = eth_tx.signing_hash(&self.chain_id);
        if !validate_eth_signature(tx.from.address, signing_hash, &tx.from.signature) {
            debug!(from = %tx.from.address, "Not an ETH-signed transaction, skipping dual index");
            return None;
        }
        Some(eth_tx.hash())
    }

    /// Looks up a transaction by hash; returns the raw transaction bytes and
    /// the containing block.
    pub fn find_tx_by_hash(&self, hash: Hash) -> Result<Option<(Bytes, Block)>, ChainError> {
        let entry: TxIndexEntry = match self.store().get(&tx_index_key(hash)) {
            Ok(entry) => entry,
            Err(StoreError::NotFound) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        let Some(block) = self.find_block(entry.block_hash)? else {
            return Ok(None);
        };
        let tx_bytes = block
            .txs
            .get(entry.index as usize)
            .cloned()
            .ok_or(ChainError::InvalidTxIndex {
                block: entry.block_hash,
                index: entry.index,
            })?;
        Ok(Some((tx_bytes, block)))
    }

    /// Records a smart-contract transaction's execution result under
    /// `"txr/" ‖ native_hash`.
    pub fn add_tx_receipt(
        &self,
        tx: &Tx,
        logs: Vec<Log>,
        evm_ret: Bytes,
        contract_address: Address,
        gas_used: u64,
        evm_err: Option<String>,
    ) -> Result<(), ChainError> {
        let tx_hash = keccak256(tx.to_bytes());
        let entry = TxReceiptEntry {
            tx_hash,
            logs,
            evm_ret,
            contract_address,
            gas_used,
            evm_err: evm_err.unwrap_or_default(),
        };
        self.store().put(&tx_receipt_key(tx_hash), &entry)?;
        Ok(())
    }

    pub fn find_tx_receipt_by_hash(
        &self,
        hash: Hash,
    ) -> Result<Option<TxReceiptEntry>, ChainError> {
        match self.store().get(&tx_receipt_key(hash)) {
            Ok(entry) => Ok(Some(entry)),
            Err(StoreError::NotFound) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dnero_common::{
        U256,
        types::{Coins, SmartContractTx, TxInput, TxOutput},
    };
    use dnero_core::BlockHeader;
    use dnero_crypto::ecdsa::PrivateKey;
    use dnero_storage::KvStore;
    use rand::rngs::OsRng;

    fn test_chain() -> Chain {
        Chain::new("privatenet", KvStore::in_memory())
    }

    fn block_with_txs(height: u64, txs: Vec<Bytes>) -> Block {
        Block {
            header: BlockHeader {
                chain_id: "privatenet".to_string(),
                height,
                parent: Hash::repeat_byte(1),
                state_hash: Hash::repeat_byte(2),
            },
            txs,
        }
    }

    fn eth_signed_contract_tx(key: &PrivateKey) -> Tx {
        let mut tx = SmartContractTx {
            from: TxInput::new(key.address(), Coins::dtoken(U256::from(77)), 3),
            to: TxOutput::new(Address::repeat_byte(9), Coins::zero()),
            gas_limit: 21_000,
            gas_price: U256::from(4_000_000_000_000u64),
            data: Bytes::from_static(b"\x01\x02"),
        };
        let digest =
            EthLegacyTx::from_smart_contract(&tx, "privatenet").signing_hash("privatenet");
        tx.from.signature = key.sign_digest(digest);
        Tx::SmartContract(tx)
    }

    #[test]
    fn test_index_and_find() {
        let chain = test_chain();
        let block = block_with_txs(5, vec![Bytes::from_static(b"tx-a"), Bytes::from_static(b"tx-b")]);
        let block_hash = chain.add_block(&block).unwrap();

        let (tx_bytes, found_block) = chain
            .find_tx_by_hash(keccak256(b"tx-b"))
            .unwrap()
            .expect("tx should be indexed");
        assert_eq!(tx_bytes, Bytes::from_static(b"tx-b"));
        assert_eq!(found_block.hash(), block_hash);

        assert!(chain.find_tx_by_hash(keccak256(b"tx-z")).unwrap().is_none());
    }

    #[test]
    fn test_index_respects_force_flag() {
        let chain = test_chain();
        let tx = Bytes::from_static(b"tx-a");
        let first = block_with_txs(5, vec![tx.clone()]);
        chain.add_block(&first).unwrap();

        // Re-indexing the same tx from another block without force keeps the
        // original entry.
        let second = block_with_txs(6, vec![tx.clone()]);
        chain.add_block(&second).unwrap();
        let (_, block) = chain.find_tx_by_hash(keccak256(&tx)).unwrap().unwrap();
        assert_eq!(block.height(), 5);

        // With force, the entry is overwritten.
        chain.add_txs_to_index(&second, true).unwrap();
        let (_, block) = chain.find_tx_by_hash(keccak256(&tx)).unwrap().unwrap();
        assert_eq!(block.height(), 6);
    }

    #[test]
    fn test_dual_index_for_eth_signed_tx() {
        let key = PrivateKey::generate(&mut OsRng);
        let tx = eth_signed_contract_tx(&key);
        let tx_bytes = Bytes::from(tx.to_bytes());

        let native_hash = keccak256(&tx_bytes);
        let Tx::SmartContract(ref sc) = tx else {
            unreachable!()
        };
        let eth_hash = EthLegacyTx::from_smart_contract(sc, "privatenet").hash();
        assert_ne!(native_hash, eth_hash);

        let chain = test_chain();
        let block = block_with_txs(7, vec![tx_bytes.clone()]);
        chain.add_block(&block).unwrap();

        let (native_bytes, native_block) =
            chain.find_tx_by_hash(native_hash).unwrap().expect("native");
        let (eth_bytes, eth_block) = chain.find_tx_by_hash(eth_hash).unwrap().expect("eth");
        assert_eq!(native_bytes, eth_bytes);
        assert_eq!(native_block.hash(), eth_block.hash());
        assert_eq!(native_bytes, tx_bytes);
    }

    #[test]
    fn test_native_signed_tx_not_dual_indexed() {
        let key = PrivateKey::generate(&mut OsRng);
        let mut sc = SmartContractTx {
            from: TxInput::new(key.address(), Coins::dtoken(U256::from(77)), 3),
            to: TxOutput::new(Address::repeat_byte(9), Coins::zero()),
            gas_limit: 21_000,
            gas_price: U256::from(4_000_000_000_000u64),
            data: Bytes::new(),
        };
        let tx = Tx::SmartContract(sc.clone());
        sc.from.signature = key.sign(&tx.signing_bytes("privatenet"));
        let tx = Tx::SmartContract(sc.clone());

        let chain = test_chain();
        let block = block_with_txs(8, vec![Bytes::from(tx.to_bytes())]);
        chain.add_block(&block).unwrap();

        let eth_hash = EthLegacyTx::from_smart_contract(&sc, "privatenet").hash();
        assert!(chain.find_tx_by_hash(eth_hash).unwrap().is_none());
    }

    #[test]
    fn test_receipts_roundtrip() {
        let key = PrivateKey::generate(&mut OsRng);
        let tx = eth_signed_contract_tx(&key);
        let chain = test_chain();

        let logs = vec![Log {
            address: Address::repeat_byte(4),
            topics: vec![Hash::repeat_byte(5)],
            data: Bytes::from_static(b"event"),
        }];
        chain
            .add_tx_receipt(
                &tx,
                logs.clone(),
                Bytes::from_static(b"ret"),
                Address::repeat_byte(6),
                21_000,
                None,
            )
            .unwrap();

        let tx_hash = keccak256(tx.to_bytes());
        let receipt = chain
            .find_tx_receipt_by_hash(tx_hash)
            .unwrap()
            .expect("receipt");
        assert_eq!(receipt.tx_hash, tx_hash);
        assert_eq!(receipt.logs, logs);
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.evm_err, "");

        assert!(chain
            .find_tx_receipt_by_hash(Hash::repeat_byte(1))
            .unwrap()
            .is_none());
    }
}
