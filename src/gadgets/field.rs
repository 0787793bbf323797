use crate::{
    error::{ProtocolError, Result},
    gadgets::bits::CircuitBits,
};
use ark_bn254::Fr;
use ark_ff::{Field, PrimeField};
use num::{BigInt, BigUint, Integer, One, Zero};
use std::fmt;

/// Cofactor of Baby Jubjub: the full group has order 8 * l.
pub const COFACTOR: u64 = 8;

/// Element of the BN254 scalar field, the field circuit wires and curve coordinates live in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldElement(Fr);

/// Integer strictly below the curve order
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CurveScalar(BigUint);

impl FieldElement {
    pub fn inner(&self) -> Fr {
        self.0
    }

    /// Canonical integer representative in [0, P).
    pub fn value(&self) -> BigUint {
        BigUint::from(self.0.into_bigint())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == Fr::ZERO
    }

    pub fn to_bits(&self) -> Result<CircuitBits> {
        CircuitBits::to_bits(&self.value())
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        FieldElement(value)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        FieldElement(Fr::from(value))
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl CurveScalar {
    pub fn value(&self) -> &BigUint {
        &self.0
    }

    pub fn is_odd(&self) -> bool {
        self.0.is_odd()
    }

    /// 254-bit little-endian form handed to circuits.
    pub fn to_bits(&self) -> Result<CircuitBits> {
        CircuitBits::to_bits(&self.0)
    }
}

impl fmt::Display for CurveScalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/**
 * Modular exponentiation driven by a fixed-width little-endian exponent
 * @dev scans from the most significant bit down, so leading zero bits only square the unit
 *
 * @param base - base, any integer
 * @param exponent - exponent bits, bit 0 = least significant
 * @param modulus - modulus of the reduction
 * @return - base^exponent mod modulus
 */
pub fn pow(base: &BigUint, exponent: &CircuitBits, modulus: &BigUint) -> BigUint {
    let base = base % modulus;
    let mut acc = BigUint::one() % modulus;
    for bit in exponent.iter_lsb_first().rev() {
        acc = &acc * &acc % modulus;
        if bit {
            acc = acc * &base % modulus;
        }
    }
    acc
}

/**
 * Inverse of `a` modulo `m` through the extended Euclidean algorithm
 *
 * @param a - value to invert
 * @param m - modulus
 * @return - a^-1 mod m, or NotInvertible if gcd(a, m) != 1
 */
pub fn modinv(a: &BigUint, m: &BigUint) -> Result<BigUint> {
    let not_invertible = || ProtocolError::NotInvertible {
        value: a.to_string(),
        modulus: m.to_string(),
    };
    if m.is_zero() {
        return Err(not_invertible());
    }
    let a = BigInt::from(a.clone());
    let m = BigInt::from(m.clone());
    let egcd = a.extended_gcd(&m);
    if !egcd.gcd.is_one() {
        return Err(not_invertible());
    }
    egcd.x.mod_floor(&m).to_biguint().ok_or_else(not_invertible)
}

/// The circuit field modulus P, arithmetic delegated to `ark_bn254::Fr`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldModulus {
    p: BigUint,
}

impl FieldModulus {
    pub fn bn254() -> Self {
        Self {
            p: BigUint::from(Fr::MODULUS),
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.p
    }

    /**
     * Adopt an integer as a field element without reducing it
     *
     * @param value - integer expected to be < P
     * @return - field element, or NonCanonical if value >= P
     */
    pub fn element(&self, value: BigUint) -> Result<FieldElement> {
        if value >= self.p {
            return Err(ProtocolError::NonCanonical {
                value: value.to_string(),
                modulus: self.p.to_string(),
            });
        }
        Ok(self.reduce(&value))
    }

    /// Parse a decimal string as sent over the wire.
    pub fn parse(&self, digits: &str) -> Result<FieldElement> {
        let value = BigUint::parse_bytes(digits.trim().as_bytes(), 10).ok_or_else(|| {
            ProtocolError::MalformedPeerData(format!("not a decimal: {digits:?}"))
        })?;
        self.element(value)
    }

    pub fn reduce(&self, value: &BigUint) -> FieldElement {
        FieldElement(Fr::from_le_bytes_mod_order(&value.to_bytes_le()))
    }

    pub fn zero(&self) -> FieldElement {
        FieldElement(Fr::ZERO)
    }

    pub fn one(&self) -> FieldElement {
        FieldElement(Fr::ONE)
    }

    pub fn add(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        FieldElement(a.0 + b.0)
    }

    pub fn sub(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        FieldElement(a.0 - b.0)
    }

    pub fn neg(&self, a: &FieldElement) -> FieldElement {
        FieldElement(-a.0)
    }

    pub fn mul(&self, a: &FieldElement, b: &FieldElement) -> FieldElement {
        FieldElement(a.0 * b.0)
    }

    pub fn square(&self, a: &FieldElement) -> FieldElement {
        FieldElement(a.0.square())
    }

    pub fn pow(&self, base: &FieldElement, exponent: &CircuitBits) -> FieldElement {
        FieldElement(base.0.pow(exponent.from_bits().to_u64_digits()))
    }

    pub fn inverse(&self, a: &FieldElement) -> Result<FieldElement> {
        a.0.inverse()
            .map(FieldElement)
            .ok_or_else(|| ProtocolError::NotInvertible {
                value: a.to_string(),
                modulus: self.p.to_string(),
            })
    }

    pub fn div(&self, a: &FieldElement, b: &FieldElement) -> Result<FieldElement> {
        Ok(self.mul(a, &self.inverse(b)?))
    }

    pub fn is_square(&self, a: &FieldElement) -> bool {
        !a.0.legendre().is_qnr()
    }

    /**
     * Square root in the circuit field
     *
     * @param a - element whose root is searched
     * @return - some root r with r^2 = a, or None if a is not a square
     */
    pub fn sqrt(&self, a: &FieldElement) -> Option<FieldElement> {
        a.0.sqrt().map(FieldElement)
    }
}

/// The curve-order modulus N used for every blinding exponent.
///
/// N = 8 * l is not prime, so this side stays on plain integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurveOrder {
    n: BigUint,
    subgroup: BigUint,
}

impl CurveOrder {
    pub fn baby_jubjub() -> Self {
        let subgroup = BigUint::from(ark_ed_on_bn254::Fr::MODULUS);
        Self {
            n: &subgroup * COFACTOR,
            subgroup,
        }
    }

    pub fn modulus(&self) -> &BigUint {
        &self.n
    }

    pub fn subgroup_order(&self) -> &BigUint {
        &self.subgroup
    }

    pub fn scalar(&self, value: BigUint) -> Result<CurveScalar> {
        if value >= self.n {
            return Err(ProtocolError::NonCanonical {
                value: value.to_string(),
                modulus: self.n.to_string(),
            });
        }
        Ok(CurveScalar(value))
    }

    pub fn add(&self, a: &CurveScalar, b: &CurveScalar) -> CurveScalar {
        CurveScalar((&a.0 + &b.0) % &self.n)
    }

    pub fn mul(&self, a: &CurveScalar, b: &CurveScalar) -> CurveScalar {
        CurveScalar(&a.0 * &b.0 % &self.n)
    }

    pub fn pow(&self, base: &CurveScalar, exponent: &CircuitBits) -> CurveScalar {
        CurveScalar(pow(&base.0, exponent, &self.n))
    }

    /// Inverse modulo N, checked even for odd inputs: N also has the odd factor l.
    pub fn modinv(&self, a: &CurveScalar) -> Result<CurveScalar> {
        Ok(CurveScalar(modinv(&a.0, &self.n)?))
    }
}
