use crate::{
    gadgets::field::{FieldElement, FieldModulus},
    phases::F,
};
use num::BigUint;
use plonky2::{
    field::types::{Field, PrimeField64},
    hash::poseidon::PoseidonHash,
    plonk::config::Hasher,
};
use std::fmt;

/// Number of 32-bit Goldilocks limbs a field element is split into (8 * 32 = 256 >= 254).
pub const LIMBS_PER_ELEMENT: usize = 8;

/// Running accumulator value: the four 64-bit limbs of a Poseidon digest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Commitment(pub [u64; 4]);

impl Commitment {
    /// Limbs as circuit field elements (each limb is < 2^64 < P).
    pub fn to_field_elements(&self) -> [FieldElement; 4] {
        self.0.map(FieldElement::from)
    }

    /// Limbs as decimal strings, the wire encoding.
    pub fn to_decimal(&self) -> [String; 4] {
        self.0.map(|limb| limb.to_string())
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:016x}{:016x}{:016x}{:016x}",
            self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

/// One-way compression of a sequence of field elements into a commitment
pub trait CompressionFunction {
    fn compress(&self, inputs: &[FieldElement]) -> Commitment;
}

/**
 * Split a field element into LE-ordered 32-bit limbs as Goldilocks elements
 * @dev 32-bit limbs are always canonical in Goldilocks, 64-bit limbs would not be
 *
 * @param element - element to split
 * @return - 8 Goldilocks elements, least significant limb first
 */
pub fn element_limbs(element: &FieldElement) -> [F; LIMBS_PER_ELEMENT] {
    let digits = element.value().to_u32_digits();
    let mut limbs = [F::ZERO; LIMBS_PER_ELEMENT];
    for (limb, digit) in limbs.iter_mut().zip(digits.iter()) {
        *limb = F::from_canonical_u32(*digit);
    }
    limbs
}

/// Poseidon sponge over Goldilocks, the native hash of the proving stack
#[derive(Debug, Clone, Copy, Default)]
pub struct PoseidonCompression;

impl PoseidonCompression {
    /**
     * Hash field elements into the raw Poseidon digest limbs
     *
     * @param inputs - field elements, each expanded into 8 limbs
     * @return - the 4 canonical u64 limbs of the digest
     */
    pub fn digest(inputs: &[FieldElement]) -> [u64; 4] {
        let limbs: Vec<F> = inputs.iter().flat_map(element_limbs).collect();
        PoseidonHash::hash_no_pad(limbs.as_slice())
            .elements
            .map(|x| x.to_canonical_u64())
    }

    /**
     * Hash field elements and map the 256-bit digest into the circuit field
     *
     * @param field - circuit field modulus used for the reduction
     * @param inputs - field elements to hash
     * @return - digest reduced mod P
     */
    pub fn digest_to_field(field: &FieldModulus, inputs: &[FieldElement]) -> FieldElement {
        let digest = Self::digest(inputs);
        let mut value = BigUint::from(0u8);
        for limb in digest.iter().rev() {
            value = (value << 64usize) + *limb;
        }
        field.reduce(&value)
    }
}

impl CompressionFunction for PoseidonCompression {
    fn compress(&self, inputs: &[FieldElement]) -> Commitment {
        Commitment(Self::digest(inputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limbs_cover_the_element() {
        let field = FieldModulus::bn254();
        let max = field.neg(&field.one());
        let limbs = element_limbs(&max);
        let mut value = BigUint::from(0u8);
        for limb in limbs.iter().rev() {
            value = (value << 32usize) + limb.to_canonical_u64();
        }
        assert_eq!(value, max.value());

        let small = element_limbs(&FieldElement::from(5));
        assert_eq!(small[0], F::from_canonical_u32(5));
        assert!(small[1..].iter().all(|l| *l == F::ZERO));
    }

    #[test]
    fn test_compression_is_deterministic_and_binding() {
        let hasher = PoseidonCompression;
        let a = hasher.compress(&[FieldElement::from(1), FieldElement::from(2)]);
        let b = hasher.compress(&[FieldElement::from(1), FieldElement::from(2)]);
        let c = hasher.compress(&[FieldElement::from(2), FieldElement::from(1)]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_commitment_encodings() {
        let commitment = Commitment([1, 2, 3, u64::MAX]);
        assert_eq!(
            commitment.to_decimal(),
            ["1", "2", "3", "18446744073709551615"].map(String::from)
        );
        assert_eq!(commitment.to_field_elements()[3], FieldElement::from(u64::MAX));
        assert!(commitment.to_string().starts_with("ffffffffffffffff"));
    }
}
