use bytes::Bytes;
use dnero_common::{BlockHeight, Hash};
use dnero_crypto::keccak::keccak256;
use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

/// The header surface this core needs: enough identity to hash, link and
/// index by. The full wire-level block format lives with the sync layer.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockHeader {
    pub chain_id: String,
    pub height: BlockHeight,
    pub parent: Hash,
    /// Root hash of the state trie after executing this block.
    pub state_hash: Hash,
}

impl BlockHeader {
    pub fn hash(&self) -> Hash {
        keccak256(&self.encode_to_vec())
    }
}

impl RLPEncode for BlockHeader {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.chain_id)
            .encode_field(&self.height)
            .encode_field(&self.parent)
            .encode_field(&self.state_hash)
            .finish();
    }
}

impl RLPDecode for BlockHeader {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (chain_id, decoder) = decoder.decode_field("chain_id")?;
        let (height, decoder) = decoder.decode_field("height")?;
        let (parent, decoder) = decoder.decode_field("parent")?;
        let (state_hash, decoder) = decoder.decode_field("state_hash")?;
        Ok((
            BlockHeader {
                chain_id,
                height,
                parent,
                state_hash,
            },
            decoder.finish()?,
        ))
    }
}

/// A block: header plus the raw bytes of its transactions. Transactions stay
/// opaque here; decoding happens where their content is needed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub header: BlockHeader,
    pub txs: Vec<Bytes>,
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn height(&self) -> BlockHeight {
        self.header.height
    }
}

impl RLPEncode for Block {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.header)
            .encode_field(&self.txs)
            .finish();
    }
}

impl RLPDecode for Block {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (header, decoder) = decoder.decode_field("header")?;
        let (txs, decoder) = decoder.decode_field("txs")?;
        Ok((Block { header, txs }, decoder.finish()?))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_block_roundtrip_and_hash() {
        let block = Block {
            header: BlockHeader {
                chain_id: "privatenet".to_string(),
                height: 42,
                parent: Hash::repeat_byte(1),
                state_hash: Hash::repeat_byte(2),
            },
            txs: vec![Bytes::from_static(b"tx-one"), Bytes::from_static(b"tx-two")],
        };

        let encoded = block.encode_to_vec();
        let decoded = Block::decode(&encoded).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.hash(), block.hash());

        let mut other = block.clone();
        other.header.height = 43;
        assert_ne!(other.hash(), block.hash());
    }
}
