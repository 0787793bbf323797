use crate::{
    config::SCALAR_BITS,
    error::{ProtocolError, Result},
};
use num::{BigUint, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::marker::PhantomData;

/// Width of the tokens found in peer-supplied debug text.
pub const TOKEN_BITS: usize = 64;

/// Where the bit of weight 2^k lives inside a vector of `width` bits.
pub trait BitOrder {
    const NAME: &'static str;

    fn position(weight: usize, width: usize) -> usize;
}

/// Bit 0 is the least significant bit. Used for every circuit input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LittleEndian;

/// Bit 0 is the most significant bit. Used only when decoding peer text tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MsbFirst;

impl BitOrder for LittleEndian {
    const NAME: &'static str = "little-endian";

    fn position(weight: usize, _width: usize) -> usize {
        weight
    }
}

impl BitOrder for MsbFirst {
    const NAME: &'static str = "msb-first";

    fn position(weight: usize, width: usize) -> usize {
        width - 1 - weight
    }
}

/// Fixed-width vector of 0/1 entries whose width and bit order are part of the type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bits<O: BitOrder, const W: usize> {
    bits: Vec<u8>,
    order: PhantomData<O>,
}

/// 254-bit little-endian encoding of scalars and field elements fed to circuits.
pub type CircuitBits = Bits<LittleEndian, SCALAR_BITS>;

/// 64-bit msb-first encoding of debug tokens read back from peer text output.
pub type TokenBits = Bits<MsbFirst, TOKEN_BITS>;

impl<O: BitOrder, const W: usize> Bits<O, W> {
    /**
     * Encode an integer into exactly W bits following the order O
     *
     * @param value - integer in [0, 2^W)
     * @return - bit vector, or ValueTooWide if value needs more than W bits
     */
    pub fn to_bits(value: &BigUint) -> Result<Self> {
        if value.bits() > W as u64 {
            return Err(ProtocolError::ValueTooWide { width: W });
        }
        let mut bits = vec![0u8; W];
        for weight in 0..W {
            if value.bit(weight as u64) {
                bits[O::position(weight, W)] = 1;
            }
        }
        Ok(Self {
            bits,
            order: PhantomData,
        })
    }

    /**
     * Decode the bit vector back into an integer
     *
     * @return - integer in [0, 2^W)
     */
    pub fn from_bits(&self) -> BigUint {
        let mut value = BigUint::zero();
        for weight in 0..W {
            if self.bits[O::position(weight, W)] == 1 {
                value.set_bit(weight as u64, true);
            }
        }
        value
    }

    /**
     * Adopt a raw 0/1 array, checking width and alphabet
     *
     * @param raw - exactly W entries, each 0 or 1, laid out in order O
     * @return - typed bit vector
     */
    pub fn from_slice(raw: &[u8]) -> Result<Self> {
        if raw.len() != W {
            return Err(ProtocolError::ShapeMismatch {
                field: O::NAME,
                expected: W,
                actual: raw.len(),
            });
        }
        if let Some((index, value)) = raw.iter().enumerate().find(|(_, b)| **b > 1) {
            return Err(ProtocolError::NotABit {
                field: O::NAME,
                index,
                value: *value as u64,
            });
        }
        Ok(Self {
            bits: raw.to_vec(),
            order: PhantomData,
        })
    }

    /// Bits from the least significant to the most significant, whatever the layout.
    pub fn iter_lsb_first(&self) -> impl DoubleEndedIterator<Item = bool> + '_ {
        (0..W).map(move |weight| self.bits[O::position(weight, W)] == 1)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bits
    }

    pub fn width(&self) -> usize {
        W
    }
}

impl TokenBits {
    pub fn from_u64(value: u64) -> Self {
        let mut bits = vec![0u8; TOKEN_BITS];
        for weight in 0..TOKEN_BITS {
            bits[MsbFirst::position(weight, TOKEN_BITS)] = ((value >> weight) & 1) as u8;
        }
        Self {
            bits,
            order: PhantomData,
        }
    }
}

impl<O: BitOrder, const W: usize> Serialize for Bits<O, W> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(self.bits.iter())
    }
}

impl<'de, O: BitOrder, const W: usize> Deserialize<'de> for Bits<O, W> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Vec::<u8>::deserialize(deserializer)?;
        Self::from_slice(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::One;
    use proptest::prelude::*;

    #[test]
    fn test_little_endian_layout() {
        let bits = CircuitBits::to_bits(&BigUint::from(6u8)).unwrap();
        assert_eq!(bits.width(), 254);
        assert_eq!(&bits.as_slice()[0..4], &[0, 1, 1, 0]);
        assert!(bits.as_slice()[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_msb_first_layout() {
        let bits = TokenBits::from_u64(6);
        assert_eq!(&bits.as_slice()[60..], &[0, 1, 1, 0]);
        assert!(bits.as_slice()[..60].iter().all(|b| *b == 0));
        assert_eq!(bits.from_bits(), BigUint::from(6u8));
        assert_eq!(
            TokenBits::to_bits(&BigUint::from(6u8)).unwrap(),
            TokenBits::from_u64(6)
        );
    }

    #[test]
    fn test_same_value_different_layouts() {
        // identical integer, mirrored layouts at the same width
        let le = Bits::<LittleEndian, 64>::to_bits(&BigUint::from(1u8)).unwrap();
        let be = TokenBits::to_bits(&BigUint::from(1u8)).unwrap();
        assert_eq!(le.as_slice()[0], 1);
        assert_eq!(be.as_slice()[63], 1);
        assert_ne!(le.as_slice(), be.as_slice());
        assert_eq!(le.from_bits(), be.from_bits());
    }

    #[test]
    fn test_rejects_wide_values() {
        let too_wide = BigUint::one() << 254usize;
        assert_eq!(
            CircuitBits::to_bits(&too_wide),
            Err(ProtocolError::ValueTooWide { width: 254 })
        );
        let widest = too_wide - 1u8;
        assert_eq!(CircuitBits::to_bits(&widest).unwrap().from_bits(), widest);
    }

    #[test]
    fn test_rejects_bad_slices() {
        assert!(matches!(
            CircuitBits::from_slice(&[0, 1]),
            Err(ProtocolError::ShapeMismatch { expected: 254, actual: 2, .. })
        ));
        let mut raw = vec![0u8; 64];
        raw[5] = 2;
        assert!(matches!(
            TokenBits::from_slice(&raw),
            Err(ProtocolError::NotABit { index: 5, value: 2, .. })
        ));
    }

    #[test]
    fn test_serde_as_plain_array() {
        let bits = TokenBits::from_u64(1);
        let json = serde_json::to_string(&bits).unwrap();
        assert!(json.starts_with("[0,0,"));
        assert!(json.ends_with(",1]"));
        let back: TokenBits = serde_json::from_str(&json).unwrap();
        assert_eq!(back, bits);
        assert!(serde_json::from_str::<TokenBits>("[0,1]").is_err());
    }

    proptest! {
        #[test]
        fn prop_integer_round_trip(bytes in proptest::collection::vec(any::<u8>(), 32)) {
            let mut bytes = bytes;
            bytes[31] &= 0x3f;
            let value = BigUint::from_bytes_le(&bytes);
            let bits = CircuitBits::to_bits(&value).unwrap();
            prop_assert_eq!(bits.from_bits(), value);
        }

        #[test]
        fn prop_vector_round_trip(raw in proptest::collection::vec(0u8..=1, 254)) {
            let bits = CircuitBits::from_slice(&raw).unwrap();
            let again = CircuitBits::to_bits(&bits.from_bits()).unwrap();
            prop_assert_eq!(again.as_slice(), &raw[..]);
        }

        #[test]
        fn prop_token_round_trip(value in any::<u64>()) {
            let bits = TokenBits::from_u64(value);
            prop_assert_eq!(bits.from_bits(), BigUint::from(value));
        }
    }
}
