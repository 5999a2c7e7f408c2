use std::fmt;

use dnero_rlp::{
    decode::RLPDecode,
    encode::RLPEncode,
    error::RLPDecodeError,
    structs::{Decoder, Encoder},
};
use ethereum_types::U256;

use crate::constants::{DENOM_DNERO_WEI, DENOM_DTOKEN_WEI};

/// A two-denomination coin amount: Dnero (the staking/governance coin) and
/// DToken (the gas/fee coin), both in wei (10^-18).
///
/// Amounts are unsigned, so non-negativity holds by construction; arithmetic
/// is checked and returns `None` on overflow or underflow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coins {
    pub dnero_wei: U256,
    pub dtoken_wei: U256,
}

impl Coins {
    pub const fn new(dnero_wei: U256, dtoken_wei: U256) -> Self {
        Self {
            dnero_wei,
            dtoken_wei,
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// A Dnero-only amount.
    pub fn dnero(dnero_wei: impl Into<U256>) -> Self {
        Self {
            dnero_wei: dnero_wei.into(),
            dtoken_wei: U256::zero(),
        }
    }

    /// A DToken-only amount.
    pub fn dtoken(dtoken_wei: impl Into<U256>) -> Self {
        Self {
            dnero_wei: U256::zero(),
            dtoken_wei: dtoken_wei.into(),
        }
    }

    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        Some(Coins {
            dnero_wei: self.dnero_wei.checked_add(other.dnero_wei)?,
            dtoken_wei: self.dtoken_wei.checked_add(other.dtoken_wei)?,
        })
    }

    pub fn checked_sub(&self, other: &Coins) -> Option<Coins> {
        Some(Coins {
            dnero_wei: self.dnero_wei.checked_sub(other.dnero_wei)?,
            dtoken_wei: self.dtoken_wei.checked_sub(other.dtoken_wei)?,
        })
    }

    /// Component-wise greater-or-equal; must hold on both denominations.
    pub fn is_gte(&self, other: &Coins) -> bool {
        self.dnero_wei >= other.dnero_wei && self.dtoken_wei >= other.dtoken_wei
    }

    pub fn is_zero(&self) -> bool {
        self.dnero_wei.is_zero() && self.dtoken_wei.is_zero()
    }

    /// At least one denomination strictly positive.
    pub fn is_positive(&self) -> bool {
        !self.is_zero()
    }

    /// The amount of coins for the given percentage, rounded down per
    /// denomination.
    pub fn calculate_percentage(&self, percentage: u32) -> Coins {
        let p = U256::from(percentage);
        let hundred = U256::from(100);
        Coins {
            dnero_wei: self.dnero_wei * p / hundred,
            dtoken_wei: self.dtoken_wei * p / hundred,
        }
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}, {} {}",
            self.dnero_wei, DENOM_DNERO_WEI, self.dtoken_wei, DENOM_DTOKEN_WEI
        )
    }
}

impl RLPEncode for Coins {
    fn encode(&self, buf: &mut dyn bytes::BufMut) {
        Encoder::new(buf)
            .encode_field(&self.dnero_wei)
            .encode_field(&self.dtoken_wei)
            .finish();
    }
}

impl RLPDecode for Coins {
    fn decode_unfinished(rlp: &[u8]) -> Result<(Self, &[u8]), RLPDecodeError> {
        let decoder = Decoder::new(rlp)?;
        let (dnero_wei, decoder) = decoder.decode_field("dnero_wei")?;
        let (dtoken_wei, decoder) = decoder.decode_field("dtoken_wei")?;
        Ok((
            Coins {
                dnero_wei,
                dtoken_wei,
            },
            decoder.finish()?,
        ))
    }
}

/// Parses a string representation of a coin amount. A trailing `wei` suffix
/// (case-insensitive) means a raw integer; otherwise the value is a decimal
/// number of whole coins, scaled by 10^18, with up to 18 fractional digits.
pub fn parse_coin_amount(input: &str) -> Option<U256> {
    let input = input.trim();
    if let Some(raw) = input
        .strip_suffix("wei")
        .or_else(|| input.strip_suffix("Wei"))
        .or_else(|| input.strip_suffix("WEI"))
    {
        return U256::from_dec_str(raw.trim()).ok();
    }

    let (whole, frac) = match input.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (input, ""),
    };
    if frac.len() > 18 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let whole = if whole.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(whole).ok()?
    };

    let mut frac_wei = U256::zero();
    if !frac.is_empty() {
        let scale = U256::exp10(18 - frac.len());
        frac_wei = U256::from_dec_str(frac).ok()? * scale;
    }

    whole.checked_mul(U256::exp10(18))?.checked_add(frac_wei)
}

#[cfg(test)]
mod test {
    use super::*;
    use dnero_rlp::decode::RLPDecode;

    fn coins(dnero: u64, dtoken: u64) -> Coins {
        Coins::new(U256::from(dnero), U256::from(dtoken))
    }

    #[test]
    fn test_checked_arithmetic() {
        let a = coins(10, 5);
        let b = coins(3, 5);
        assert_eq!(a.checked_add(&b), Some(coins(13, 10)));
        assert_eq!(a.checked_sub(&b), Some(coins(7, 0)));
        // Underflow on either component fails the whole subtraction.
        assert_eq!(b.checked_sub(&a), None);
        assert_eq!(coins(5, 10).checked_sub(&coins(6, 0)), None);
    }

    #[test]
    fn test_is_gte_requires_both_components() {
        assert!(coins(10, 10).is_gte(&coins(10, 10)));
        assert!(coins(11, 10).is_gte(&coins(10, 10)));
        assert!(!coins(11, 9).is_gte(&coins(10, 10)));
        assert!(!coins(9, 11).is_gte(&coins(10, 10)));
    }

    #[test]
    fn test_positivity() {
        assert!(!coins(0, 0).is_positive());
        assert!(coins(1, 0).is_positive());
        assert!(coins(0, 1).is_positive());
        assert!(coins(0, 0).is_zero());
    }

    #[test]
    fn test_calculate_percentage() {
        assert_eq!(coins(200, 50).calculate_percentage(10), coins(20, 5));
        assert_eq!(coins(3, 0).calculate_percentage(50), coins(1, 0));
    }

    #[test]
    fn test_rlp_roundtrip() {
        let amount = Coins::new(U256::exp10(24), U256::from(7));
        let encoded = amount.encode_to_vec();
        assert_eq!(Coins::decode(&encoded).unwrap(), amount);
    }

    #[test]
    fn test_parse_coin_amount() {
        assert_eq!(parse_coin_amount("2000"), Some(U256::from(2000) * U256::exp10(18)));
        assert_eq!(parse_coin_amount("1.5"), Some(U256::from(15) * U256::exp10(17)));
        assert_eq!(parse_coin_amount("1000wei"), Some(U256::from(1000)));
        assert_eq!(parse_coin_amount("1000 wei"), Some(U256::from(1000)));
        assert_eq!(parse_coin_amount("0"), Some(U256::zero()));
        assert_eq!(parse_coin_amount("-5"), None);
        assert_eq!(parse_coin_amount("1.0000000000000000001"), None); // >18 decimals
        assert_eq!(parse_coin_amount("abc"), None);
    }
}
