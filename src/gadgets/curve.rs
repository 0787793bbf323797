use crate::{
    config::ProtocolConfig,
    error::{ProtocolError, Result},
    gadgets::{
        field::{CurveOrder, CurveScalar, FieldElement, FieldModulus, COFACTOR},
        hash::PoseidonCompression,
    },
};
use ark_bn254::Fr as Fq;
use ark_ec::{
    twisted_edwards::{Affine, MontCurveConfig, TECurveConfig},
    AffineRepr, CurveConfig, CurveGroup,
};
use ark_ff::{MontFp, PrimeField};
use serde::{Deserialize, Serialize};

/// Twisted Edwards coefficients of Baby Jubjub: a x^2 + y^2 = 1 + d x^2 y^2.
pub const COEFF_A: u64 = 168700;
pub const COEFF_D: u64 = 168696;

/// Baby Jubjub with the circom coefficients, over the BN254 scalar field.
///
/// The generator is Base8, which spans the prime-order subgroup.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct BabyJubjubConfig;

impl CurveConfig for BabyJubjubConfig {
    type BaseField = Fq;
    type ScalarField = ark_ed_on_bn254::Fr;

    const COFACTOR: &'static [u64] = &[COFACTOR];

    // 8^-1 mod l
    const COFACTOR_INV: ark_ed_on_bn254::Fr = MontFp!(
        "2394026564107420727433200628387514462817212225638746351800188703329891451411"
    );
}

impl TECurveConfig for BabyJubjubConfig {
    const COEFF_A: Fq = MontFp!("168700");
    const COEFF_D: Fq = MontFp!("168696");

    const GENERATOR: Affine<Self> = Affine::new_unchecked(
        MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553"),
        MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203"),
    );

    type MontCurveConfig = BabyJubjubConfig;
}

// A = 2(a + d) / (a - d), B = 4 / (a - d)
impl MontCurveConfig for BabyJubjubConfig {
    const COEFF_A: Fq = MontFp!("168698");
    const COEFF_B: Fq = MontFp!("1");

    type TECurveConfig = BabyJubjubConfig;
}

/// Affine point of Baby Jubjub
pub type Point = Affine<BabyJubjubConfig>;

/// Wire form of a point: decimal coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRepr(pub String, pub String);

impl From<&Point> for PointRepr {
    fn from(point: &Point) -> Self {
        PointRepr(
            FieldElement::from(point.x).to_string(),
            FieldElement::from(point.y).to_string(),
        )
    }
}

/// Domain separation for hash-to-curve inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashDomain {
    /// Identifier of a board cell and its village state
    Cell = 1,
    /// Filler tags that never match a cell identifier
    Decoy = 2,
}

/// Baby Jubjub with scalars reduced by the full curve order
#[derive(Debug, Clone)]
pub struct BabyJubjub {
    field: FieldModulus,
    order: CurveOrder,
}

impl BabyJubjub {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            field: config.field.clone(),
            order: config.curve_order.clone(),
        }
    }

    pub fn field(&self) -> &FieldModulus {
        &self.field
    }

    pub fn order(&self) -> &CurveOrder {
        &self.order
    }

    pub fn identity(&self) -> Point {
        Point::zero()
    }

    pub fn base8(&self) -> Point {
        Point::generator()
    }

    /**
     * Build a point from coordinates, checking curve membership
     *
     * @param x - x coordinate
     * @param y - y coordinate
     * @return - point, or NotOnCurve
     */
    pub fn point(&self, x: FieldElement, y: FieldElement) -> Result<Point> {
        let point = Point::new_unchecked(x.inner(), y.inner());
        if !point.is_on_curve() {
            return Err(ProtocolError::NotOnCurve {
                x: x.to_string(),
                y: y.to_string(),
            });
        }
        Ok(point)
    }

    /**
     * Decode and check a point received over the wire
     * @dev small-order components are refused, they would leak our exponent mod 8
     *
     * @param repr - decimal coordinates
     * @return - point of the prime-order subgroup
     */
    pub fn decode(&self, repr: &PointRepr) -> Result<Point> {
        let point = self.point(self.field.parse(&repr.0)?, self.field.parse(&repr.1)?)?;
        if !point.is_in_correct_subgroup_assuming_on_curve() {
            return Err(ProtocolError::NotInSubgroup {
                x: repr.0.clone(),
                y: repr.1.clone(),
            });
        }
        Ok(point)
    }

    pub fn add(&self, p: &Point, q: &Point) -> Point {
        (p.into_group() + q).into_affine()
    }

    /// Multiply by a scalar below the full order N.
    pub fn mul(&self, p: &Point, scalar: &CurveScalar) -> Point {
        p.mul_bigint(scalar.value().to_u64_digits()).into_affine()
    }

    pub fn clear_cofactor(&self, p: &Point) -> Point {
        p.clear_cofactor()
    }

    /**
     * Try-and-increment hash onto the prime-order subgroup
     * @dev x comes from a Poseidon digest, y is the smaller root, then the cofactor is cleared
     *
     * @param domain - domain separation tag
     * @param inputs - field elements being hashed
     * @return - subgroup point, never the identity
     */
    pub fn hash_to_curve(&self, domain: HashDomain, inputs: &[FieldElement]) -> Point {
        let f = &self.field;
        let a = FieldElement::from(COEFF_A);
        let d = FieldElement::from(COEFF_D);
        let mut counter = 0u64;
        loop {
            let mut preimage = vec![FieldElement::from(domain as u64), FieldElement::from(counter)];
            preimage.extend_from_slice(inputs);
            let x = PoseidonCompression::digest_to_field(f, &preimage);
            counter += 1;

            // y^2 = (1 - a x^2) / (1 - d x^2)
            let x2 = f.square(&x);
            let numerator = f.sub(&f.one(), &f.mul(&a, &x2));
            let denominator = f.sub(&f.one(), &f.mul(&d, &x2));
            let Some(y) = f
                .div(&numerator, &denominator)
                .ok()
                .and_then(|y2| f.sqrt(&y2))
            else {
                continue;
            };
            let y = if y.inner().into_bigint() > Fq::MODULUS_MINUS_ONE_DIV_TWO {
                f.neg(&y)
            } else {
                y
            };
            let candidate = Point::new_unchecked(x.inner(), y.inner()).clear_cofactor();
            if !candidate.is_zero() {
                return candidate;
            }
        }
    }
}
