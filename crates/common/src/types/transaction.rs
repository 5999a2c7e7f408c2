use bytes::Bytes;
use dnero_crypto::{bls, keccak::keccak256};
use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethereum_types::{Address, U256};

use crate::{Hash, Signature, types::coin::Coins};

/// Discriminator byte prepended to the RLP body of each transaction variant.
/// The gaps in the numbering belong to transaction kinds outside this core
/// (coinbase, slashing, fund reservation, split rules).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TxType {
    Send = 2,
    SmartContract = 7,
    DepositStake = 8,
    WithdrawStake = 9,
    DepositStakeV1 = 10,
}

impl TxType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            2 => Some(TxType::Send),
            7 => Some(TxType::SmartContract),
            8 => Some(TxType::DepositStake),
            9 => Some(TxType::WithdrawStake),
            10 => Some(TxType::DepositStakeV1),
            _ => None,
        }
    }
}

/// Purpose of a stake deposit/withdrawal.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StakePurpose {
    Validator = 0,
    Sentry = 1,
    EliteEdgeNode = 2,
}

impl StakePurpose {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StakePurpose::Validator),
            1 => Some(StakePurpose::Sentry),
            2 => Some(StakePurpose::EliteEdgeNode),
            _ => None,
        }
    }
}

impl RLPEncode for StakePurpose {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        (*self as u8).encode(buf)
    }
}

impl RLPDecode for StakePurpose {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (value, rest) = u8::decode_unfinished(rlp)?;
        let purpose = StakePurpose::from_u8(value)
            .ok_or_else(|| RLPDecodeError::Custom(format!("invalid stake purpose: {value}")))?;
        Ok((purpose, rest))
    }
}

/// Coin-movement input: contributes coins, bears the signature and sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxInput {
    pub address: Address,
    pub coins: Coins,
    pub sequence: u64,
    pub signature: Signature,
}

impl TxInput {
    pub fn new(address: Address, coins: Coins, sequence: u64) -> Self {
        Self {
            address,
            coins,
            sequence,
            signature: Signature::zero(),
        }
    }
}

impl RLPEncode for TxInput {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.coins)
            .encode_field(&self.sequence)
            .encode_field(&self.signature)
            .finish();
    }
}

impl RLPDecode for TxInput {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (coins, decoder) = decoder.decode_field("coins")?;
        let (sequence, decoder) = decoder.decode_field("sequence")?;
        let (signature, decoder) = decoder.decode_field("signature")?;
        Ok((
            TxInput {
                address,
                coins,
                sequence,
                signature,
            },
            decoder.finish()?,
        ))
    }
}

/// Coin-movement output: receives coins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxOutput {
    pub address: Address,
    pub coins: Coins,
}

impl TxOutput {
    pub fn new(address: Address, coins: Coins) -> Self {
        Self { address, coins }
    }
}

impl RLPEncode for TxOutput {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.address)
            .encode_field(&self.coins)
            .finish();
    }
}

impl RLPDecode for TxOutput {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (address, decoder) = decoder.decode_field("address")?;
        let (coins, decoder) = decoder.decode_field("coins")?;
        Ok((TxOutput { address, coins }, decoder.finish()?))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendTx {
    pub fee: Coins,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

impl RLPEncode for SendTx {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.fee)
            .encode_field(&self.inputs)
            .encode_field(&self.outputs)
            .finish();
    }
}

impl RLPDecode for SendTx {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (fee, decoder) = decoder.decode_field("fee")?;
        let (inputs, decoder) = decoder.decode_field("inputs")?;
        let (outputs, decoder) = decoder.decode_field("outputs")?;
        Ok((
            SendTx {
                fee,
                inputs,
                outputs,
            },
            decoder.finish()?,
        ))
    }
}

/// The versionless deposit-stake transaction, predating BLS-keyed pools.
/// Up-cast to [`DepositStakeTxV1`] at execution time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositStakeTx {
    pub fee: Coins,
    pub source: TxInput,
    pub holder: TxOutput,
    pub purpose: StakePurpose,
}

impl RLPEncode for DepositStakeTx {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.fee)
            .encode_field(&self.source)
            .encode_field(&self.holder)
            .encode_field(&self.purpose)
            .finish();
    }
}

impl RLPDecode for DepositStakeTx {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (fee, decoder) = decoder.decode_field("fee")?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (holder, decoder) = decoder.decode_field("holder")?;
        let (purpose, decoder) = decoder.decode_field("purpose")?;
        Ok((
            DepositStakeTx {
                fee,
                source,
                holder,
                purpose,
            },
            decoder.finish()?,
        ))
    }
}

/// The versioned deposit-stake transaction. Carries the BLS key material a
/// new sentry or elite-edge holder must prove possession of: the public key,
/// the proof-of-possession, and a native signature over the PoP bytes by the
/// holder address. Existing holders leave all three empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositStakeTxV1 {
    pub fee: Coins,
    pub source: TxInput,
    pub holder: TxOutput,
    pub purpose: StakePurpose,
    pub bls_pubkey: bls::PublicKey,
    pub bls_pop: bls::Signature,
    pub holder_sig: Signature,
}

impl RLPEncode for DepositStakeTxV1 {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.fee)
            .encode_field(&self.source)
            .encode_field(&self.holder)
            .encode_field(&self.purpose)
            .encode_bytes(&self.bls_pubkey.to_bytes())
            .encode_bytes(&self.bls_pop.to_bytes())
            .encode_field(&self.holder_sig)
            .finish();
    }
}

impl RLPDecode for DepositStakeTxV1 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (fee, decoder) = decoder.decode_field("fee")?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (holder, decoder) = decoder.decode_field("holder")?;
        let (purpose, decoder) = decoder.decode_field("purpose")?;
        let (pubkey_bytes, decoder): ([u8; 48], _) = decoder.decode_field("bls_pubkey")?;
        let (pop_bytes, decoder): ([u8; 96], _) = decoder.decode_field("bls_pop")?;
        let (holder_sig, decoder) = decoder.decode_field("holder_sig")?;

        let bls_pubkey = bls::PublicKey::from_bytes(&pubkey_bytes)
            .map_err(|err| RLPDecodeError::Custom(err.to_string()))?;
        let bls_pop = bls::Signature::from_bytes(&pop_bytes)
            .map_err(|err| RLPDecodeError::Custom(err.to_string()))?;

        Ok((
            DepositStakeTxV1 {
                fee,
                source,
                holder,
                purpose,
                bls_pubkey,
                bls_pop,
                holder_sig,
            },
            decoder.finish()?,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawStakeTx {
    pub fee: Coins,
    pub source: TxInput,
    pub holder: TxOutput,
    pub purpose: StakePurpose,
}

impl RLPEncode for WithdrawStakeTx {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.fee)
            .encode_field(&self.source)
            .encode_field(&self.holder)
            .encode_field(&self.purpose)
            .finish();
    }
}

impl RLPDecode for WithdrawStakeTx {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (fee, decoder) = decoder.decode_field("fee")?;
        let (source, decoder) = decoder.decode_field("source")?;
        let (holder, decoder) = decoder.decode_field("holder")?;
        let (purpose, decoder) = decoder.decode_field("purpose")?;
        Ok((
            WithdrawStakeTx {
                fee,
                source,
                holder,
                purpose,
            },
            decoder.finish()?,
        ))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SmartContractTx {
    pub from: TxInput,
    /// Zero address means contract creation.
    pub to: TxOutput,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub data: Bytes,
}

impl SmartContractTx {
    pub fn is_contract_creation(&self) -> bool {
        self.to.address == Address::zero()
    }
}

impl RLPEncode for SmartContractTx {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.from)
            .encode_field(&self.to)
            .encode_field(&self.gas_limit)
            .encode_field(&self.gas_price)
            .encode_field(&self.data)
            .finish();
    }
}

impl RLPDecode for SmartContractTx {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (from, decoder) = decoder.decode_field("from")?;
        let (to, decoder) = decoder.decode_field("to")?;
        let (gas_limit, decoder) = decoder.decode_field("gas_limit")?;
        let (gas_price, decoder) = decoder.decode_field("gas_price")?;
        let (data, decoder) = decoder.decode_field("data")?;
        Ok((
            SmartContractTx {
                from,
                to,
                gas_limit,
                gas_price,
                data,
            },
            decoder.finish()?,
        ))
    }
}

/// The transaction union. Executors dispatch on the variant; adding a new
/// kind touches only the dispatcher and the new executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tx {
    Send(SendTx),
    SmartContract(SmartContractTx),
    DepositStake(DepositStakeTx),
    WithdrawStake(WithdrawStakeTx),
    DepositStakeV1(DepositStakeTxV1),
}

impl Tx {
    pub fn tx_type(&self) -> TxType {
        match self {
            Tx::Send(_) => TxType::Send,
            Tx::SmartContract(_) => TxType::SmartContract,
            Tx::DepositStake(_) => TxType::DepositStake,
            Tx::WithdrawStake(_) => TxType::WithdrawStake,
            Tx::DepositStakeV1(_) => TxType::DepositStakeV1,
        }
    }

    /// Serializes as `type_byte ‖ rlp(body)`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![self.tx_type() as u8];
        match self {
            Tx::Send(tx) => tx.encode(&mut buf),
            Tx::SmartContract(tx) => tx.encode(&mut buf),
            Tx::DepositStake(tx) => tx.encode(&mut buf),
            Tx::WithdrawStake(tx) => tx.encode(&mut buf),
            Tx::DepositStakeV1(tx) => tx.encode(&mut buf),
        }
        buf
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RLPDecodeError> {
        let (tag, body) = bytes.split_first().ok_or(RLPDecodeError::InvalidLength)?;
        let tx_type = TxType::from_u8(*tag)
            .ok_or_else(|| RLPDecodeError::Custom(format!("unknown transaction type: {tag}")))?;
        match tx_type {
            TxType::Send => SendTx::decode(body).map(Tx::Send),
            TxType::SmartContract => SmartContractTx::decode(body).map(Tx::SmartContract),
            TxType::DepositStake => DepositStakeTx::decode(body).map(Tx::DepositStake),
            TxType::WithdrawStake => WithdrawStakeTx::decode(body).map(Tx::WithdrawStake),
            TxType::DepositStakeV1 => DepositStakeTxV1::decode(body).map(Tx::DepositStakeV1),
        }
    }

    /// The canonical bytes a signer commits to: the chain id and the
    /// serialized transaction with every input signature blanked.
    pub fn signing_bytes(&self, chain_id: &str) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.clear_signatures();

        let mut buf = Vec::new();
        Encoder::new(&mut buf)
            .encode_field(&chain_id)
            .encode_bytes(&unsigned.to_bytes())
            .finish();
        buf
    }

    fn clear_signatures(&mut self) {
        match self {
            Tx::Send(tx) => {
                for input in &mut tx.inputs {
                    input.signature = Signature::zero();
                }
            }
            Tx::SmartContract(tx) => tx.from.signature = Signature::zero(),
            Tx::DepositStake(tx) => tx.source.signature = Signature::zero(),
            Tx::WithdrawStake(tx) => tx.source.signature = Signature::zero(),
            Tx::DepositStakeV1(tx) => tx.source.signature = Signature::zero(),
        }
    }

    /// Chain-scoped transaction id: the keccak of the signing bytes.
    pub fn tx_id(&self, chain_id: &str) -> Hash {
        keccak256(&self.signing_bytes(chain_id))
    }

    pub fn fee(&self) -> Coins {
        match self {
            Tx::Send(tx) => tx.fee,
            // Smart-contract fees are gas-metered, not declared.
            Tx::SmartContract(_) => Coins::zero(),
            Tx::DepositStake(tx) => tx.fee,
            Tx::WithdrawStake(tx) => tx.fee,
            Tx::DepositStakeV1(tx) => tx.fee,
        }
    }
}
