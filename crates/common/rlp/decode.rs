use bytes::Bytes;
use ethereum_types::{H160, H256, H520, U256};

use super::{
    constants::{RLP_EMPTY_LIST, RLP_NULL},
    error::RLPDecodeError,
};

/// Max payload size accepted when decoding.
/// While technically any size is RLP spec-compliant, there are no well-formed
/// messages in our protocols that could carry such big payloads, so they are
/// either bugs or malicious.
const MAX_RLP_BYTES: usize = 1024 * 1024 * 1024;

/// Trait for decoding RLP encoded slices of data.
/// Implementors provide [`decode_unfinished`](RLPDecode::decode_unfinished),
/// which returns the decoded value along with the remaining bytes; consumers
/// usually call [`decode`](RLPDecode::decode).
pub trait RLPDecode: Sized {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError>;

    fn decode(rlp: &[u8]) -> Result<Self, RLPDecodeError> {
        let (decoded, remaining) = Self::decode_unfinished(rlp)?;
        if !remaining.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }

        Ok(decoded)
    }
}

impl RLPDecode for bool {
    #[inline(always)]
    fn decode_unfinished(buf: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let first = *buf.first().ok_or(RLPDecodeError::InvalidLength)?;
        let value = match first {
            RLP_NULL => false,
            0x01 => true,
            b => return Err(RLPDecodeError::MalformedBoolean(b)),
        };

        Ok((value, &buf[1..]))
    }
}

macro_rules! impl_rlp_decode_uint {
    ($t:ty) => {
        impl RLPDecode for $t {
            fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
                let (bytes, rest) = decode_bytes(rlp)?;
                let padded = static_left_pad(bytes)?;
                Ok((<$t>::from_be_bytes(padded), rest))
            }
        }
    };
}

impl_rlp_decode_uint!(u8);
impl_rlp_decode_uint!(u16);
impl_rlp_decode_uint!(u32);
impl_rlp_decode_uint!(u64);
impl_rlp_decode_uint!(usize);

impl RLPDecode for U256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (bytes, rest) = decode_bytes(rlp)?;
        let padded: [u8; 32] = static_left_pad(bytes)?;
        Ok((U256::from_big_endian(&padded), rest))
    }
}

// Decodes a byte string of a fixed size. If you want to decode a list of
// elements, use the Vec<T> implementation instead.
impl<const N: usize> RLPDecode for [u8; N] {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (decoded, rest) = decode_bytes(rlp)?;
        let value = decoded
            .try_into()
            .map_err(|_| RLPDecodeError::InvalidLength)?;

        Ok((value, rest))
    }
}

impl RLPDecode for Bytes {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (decoded, rest) = decode_bytes(rlp)?;
        Ok((Bytes::copy_from_slice(decoded), rest))
    }
}

impl RLPDecode for String {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (str_bytes, rest) = decode_bytes(rlp)?;
        let value =
            String::from_utf8(str_bytes.to_vec()).map_err(|_| RLPDecodeError::MalformedData)?;
        Ok((value, rest))
    }
}

impl RLPDecode for H160 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (value, rest) = <[u8; 20]>::decode_unfinished(rlp)?;
        Ok((H160(value), rest))
    }
}

impl RLPDecode for H256 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (value, rest) = <[u8; 32]>::decode_unfinished(rlp)?;
        Ok((H256(value), rest))
    }
}

impl RLPDecode for H520 {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let (value, rest) = <[u8; 65]>::decode_unfinished(rlp)?;
        Ok((H520(value), rest))
    }
}

// A Vec<T> is interpreted as a list of elements of the same type. To decode a
// byte string, use the [u8; N] or Bytes implementations instead.
impl<T: RLPDecode> RLPDecode for Vec<T> {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        if rlp.is_empty() {
            return Err(RLPDecodeError::InvalidLength);
        }

        if rlp[0] == RLP_EMPTY_LIST {
            return Ok((Vec::new(), &rlp[1..]));
        }

        let (is_list, payload, input_rest) = decode_rlp_item(rlp)?;
        if !is_list {
            return Err(RLPDecodeError::UnexpectedString);
        }

        let mut result = Vec::new();
        let mut current = payload;

        while !current.is_empty() {
            let (item, rest) = T::decode_unfinished(current)?;
            result.push(item);
            current = rest;
        }

        Ok((result, input_rest))
    }
}

/// Decodes an RLP item from a slice of bytes.
/// It returns a 3-element tuple with the following elements:
/// - A boolean indicating if the item is a list or not.
/// - The payload of the item, without its prefix.
/// - The remaining bytes after the item.
pub fn decode_rlp_item(data: &[u8]) -> Result<(bool, &[u8], &[u8]), RLPDecodeError> {
    let first_byte = *data.first().ok_or(RLPDecodeError::InvalidLength)?;

    match first_byte {
        0..=0x7f => Ok((false, &data[..1], &data[1..])),
        0x80..=0xb7 => {
            let length = (first_byte - 0x80) as usize;
            if data.len() < length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            Ok((false, &data[1..length + 1], &data[length + 1..]))
        }
        0xb8..=0xbf => {
            let length_of_length = (first_byte - 0xb7) as usize;
            if data.len() < length_of_length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            let length = usize::from_be_bytes(static_left_pad(&data[1..length_of_length + 1])?);
            if length > MAX_RLP_BYTES || data.len() < length_of_length + length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            Ok((
                false,
                &data[length_of_length + 1..length_of_length + length + 1],
                &data[length_of_length + length + 1..],
            ))
        }
        RLP_EMPTY_LIST..=0xf7 => {
            let length = (first_byte - RLP_EMPTY_LIST) as usize;
            if data.len() < length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            Ok((true, &data[1..length + 1], &data[length + 1..]))
        }
        0xf8..=0xff => {
            let length_of_length = (first_byte - 0xf7) as usize;
            if data.len() < length_of_length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            let length = usize::from_be_bytes(static_left_pad(&data[1..length_of_length + 1])?);
            if length > MAX_RLP_BYTES || data.len() < length_of_length + length + 1 {
                return Err(RLPDecodeError::InvalidLength);
            }
            Ok((
                true,
                &data[length_of_length + 1..length_of_length + length + 1],
                &data[length_of_length + length + 1..],
            ))
        }
    }
}

/// Decodes the payload of an RLP string item.
/// It returns a 2-element tuple with the following elements:
/// - The payload of the item.
/// - The remaining bytes after the item.
pub fn decode_bytes(data: &[u8]) -> Result<(&[u8], &[u8]), RLPDecodeError> {
    let (is_list, payload, rest) = decode_rlp_item(data)?;
    if is_list {
        return Err(RLPDecodeError::UnexpectedList);
    }
    Ok((payload, rest))
}

/// Pads a slice of bytes with zeros on the left to make it a fixed size array.
/// Rejects leading zeros (non-canonical integer encoding) and oversized input.
#[inline]
pub fn static_left_pad<const N: usize>(data: &[u8]) -> Result<[u8; N], RLPDecodeError> {
    let mut result = [0; N];

    if data.is_empty() {
        return Ok(result);
    }
    if data[0] == 0 {
        return Err(RLPDecodeError::MalformedData);
    }
    if data.len() > N {
        return Err(RLPDecodeError::InvalidLength);
    }
    result[N - data.len()..].copy_from_slice(data);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::RLPEncode;

    #[test]
    fn test_decode_integers() {
        assert_eq!(u64::decode(&[RLP_NULL]).unwrap(), 0);
        assert_eq!(u64::decode(&[0x01]).unwrap(), 1);
        assert_eq!(u64::decode(&[0x81, 0x80]).unwrap(), 0x80);
        assert_eq!(u64::decode(&[0x82, 0x04, 0x00]).unwrap(), 1024);
        // leading zeros are non-canonical
        assert!(u64::decode(&[0x82, 0x00, 0x01]).is_err());
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        assert!(u64::decode(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn test_roundtrip_bytes() {
        let data = Bytes::from_static(b"some arbitrary payload bytes");
        let encoded = data.encode_to_vec();
        assert_eq!(Bytes::decode(&encoded).unwrap(), data);
    }

    #[test]
    fn test_roundtrip_vec_of_hashes() {
        let hashes: Vec<H256> = (0u8..5).map(|i| H256::repeat_byte(i)).collect();
        let encoded = hashes.encode_to_vec();
        assert_eq!(Vec::<H256>::decode(&encoded).unwrap(), hashes);
    }

    #[test]
    fn test_roundtrip_u256() {
        let value = U256::from_dec_str("2000000000000000000000").unwrap();
        let encoded = value.encode_to_vec();
        assert_eq!(U256::decode(&encoded).unwrap(), value);
    }

    #[test]
    fn test_decode_string() {
        let encoded = "mainnet".encode_to_vec();
        assert_eq!(String::decode(&encoded).unwrap(), "mainnet");
    }
}
