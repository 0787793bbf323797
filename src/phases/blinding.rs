use {
    crate::{
        error::Result,
        gadgets::{
            curve::{BabyJubjub, HashDomain, Point},
            field::{CurveScalar, FieldElement},
        },
    },
    log::trace,
};

/// Hash of a cell identifier onto the prime-order subgroup
pub type HashedIdentifier = Point;

/// Identifier (or another tag) multiplied by one or more blinding exponents
pub type BlindedTag = Point;

/**
 * Hash a board cell and its village state onto the curve
 *
 * @param curve - Baby Jubjub instance
 * @param cell - cell index
 * @param village_state - 1 if the cell holds a village owned by the player
 * @return - hashed identifier H(cell, village_state)
 */
pub fn hashed_identifier(curve: &BabyJubjub, cell: usize, village_state: u64) -> HashedIdentifier {
    curve.hash_to_curve(
        HashDomain::Cell,
        &[FieldElement::from(cell as u64), FieldElement::from(village_state)],
    )
}

/// Filler identifier for a village slot that carries no claim.
pub fn decoy(curve: &BabyJubjub, village: usize) -> HashedIdentifier {
    curve.hash_to_curve(HashDomain::Decoy, &[FieldElement::from(village as u64)])
}

pub fn blind(curve: &BabyJubjub, identifier: &Point, exponent: &CurveScalar) -> BlindedTag {
    curve.mul(identifier, exponent)
}

/**
 * Remove one blinding layer
 * @dev the inverse is taken modulo the full curve order N, which also cancels on the subgroup
 *
 * @param curve - Baby Jubjub instance
 * @param tag - tag previously blinded with `exponent`
 * @param exponent - exponent used to blind
 * @return - exponent^-1 * tag, or NotInvertible
 */
pub fn unblind(curve: &BabyJubjub, tag: &BlindedTag, exponent: &CurveScalar) -> Result<Point> {
    let inverse = curve.order().modinv(exponent)?;
    trace!("unblinding tag");
    Ok(curve.mul(tag, &inverse))
}
