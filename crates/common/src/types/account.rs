use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};

use crate::{BlockHeight, types::coin::Coins};

/// Ledger account state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Strictly increasing per signed transaction; a transaction carries the
    /// sequence it expects (`account.sequence + 1`).
    pub sequence: u64,
    pub balance: Coins,
    pub last_updated_block_height: BlockHeight,
}

impl Account {
    pub fn new(balance: Coins) -> Self {
        Self {
            sequence: 0,
            balance,
            last_updated_block_height: 0,
        }
    }
}

impl RLPEncode for Account {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.sequence)
            .encode_field(&self.balance)
            .encode_field(&self.last_updated_block_height)
            .finish();
    }
}

impl RLPDecode for Account {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (sequence, decoder) = decoder.decode_field("sequence")?;
        let (balance, decoder) = decoder.decode_field("balance")?;
        let (last_updated_block_height, decoder) =
            decoder.decode_field("last_updated_block_height")?;
        Ok((
            Account {
                sequence,
                balance,
                last_updated_block_height,
            },
            decoder.finish()?,
        ))
    }
}
