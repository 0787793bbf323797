use {
    crate::{
        config::{ProtocolConfig, SCALAR_BITS},
        error::{ProtocolError, Result},
        gadgets::{
            bits::CircuitBits,
            field::{CurveOrder, CurveScalar},
        },
    },
    num::{BigUint, Integer},
    rand::RngCore,
};

/// Bytes drawn per candidate: 32 bytes, of which the top 2 bits are cleared.
const SCALAR_BYTES: usize = (SCALAR_BITS + 7) / 8;

/// Draws single-use odd blinding exponents below the curve order
#[derive(Debug, Clone)]
pub struct ExponentGenerator {
    order: CurveOrder,
}

/// Exponents for one step: one per board cell, plus the responder exponent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepExponents {
    pub cells: Vec<CurveScalar>,
    pub step: CurveScalar,
}

impl StepExponents {
    /// Cell exponents in circuit form.
    pub fn cell_bits(&self) -> Result<Vec<CircuitBits>> {
        self.cells.iter().map(CurveScalar::to_bits).collect()
    }
}

impl ExponentGenerator {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            order: config.curve_order.clone(),
        }
    }

    pub fn order(&self) -> &CurveOrder {
        &self.order
    }

    /**
     * Draw one blinding exponent
     * @dev 254 random bits, redrawn while >= N, then bit 0 is set
     *
     * @param rng - source of randomness
     * @return - odd scalar in [1, N) coprime to N, or RandomnessUnavailable
     */
    pub fn generate<R: RngCore + ?Sized>(&self, rng: &mut R) -> Result<CurveScalar> {
        let n = self.order.modulus();
        let l = self.order.subgroup_order();
        let mut bytes = [0u8; SCALAR_BYTES];
        loop {
            rng.try_fill_bytes(&mut bytes)
                .map_err(|e| ProtocolError::RandomnessUnavailable(e.to_string()))?;
            // keep 254 bits
            bytes[SCALAR_BYTES - 1] &= 0xff >> (SCALAR_BYTES * 8 - SCALAR_BITS);
            let candidate = BigUint::from_bytes_le(&bytes);
            if &candidate >= n {
                continue;
            }
            // N is even, so an even candidate below N stays below N once made odd
            let mut value = candidate | BigUint::from(1u8);
            if value.is_multiple_of(l) {
                value = (value + 2u8) % n;
            }
            return self.order.scalar(value);
        }
    }

    pub fn generate_batch<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        count: usize,
    ) -> Result<Vec<CurveScalar>> {
        (0..count).map(|_| self.generate(rng)).collect()
    }

    /**
     * Draw every exponent a player needs for one step
     *
     * @param rng - source of randomness
     * @param config - protocol configuration (number of cells)
     * @return - STATE_SIZE cell exponents and one step exponent
     */
    pub fn generate_step<R: RngCore + ?Sized>(
        &self,
        rng: &mut R,
        config: &ProtocolConfig,
    ) -> Result<StepExponents> {
        Ok(StepExponents {
            cells: self.generate_batch(rng, config.state_size)?,
            step: self.generate(rng)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        proptest::prelude::*,
        rand::{rngs::StdRng, RngCore, SeedableRng},
    };

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0)
        }

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::new(
                std::io::ErrorKind::Other,
                "entropy source closed",
            )))
        }
    }

    fn generator() -> ExponentGenerator {
        ExponentGenerator::new(&ProtocolConfig::standard().unwrap())
    }

    proptest! {
        #[test]
        fn test_exponents_are_odd_and_reduced(seed in any::<u64>()) {
            let generator = generator();
            let mut rng = StdRng::seed_from_u64(seed);
            let e = generator.generate(&mut rng).unwrap();
            prop_assert!(e.is_odd());
            prop_assert!(e.value() < generator.order().modulus());
            prop_assert!(generator.order().modinv(&e).is_ok());
            let bits = e.to_bits().unwrap();
            prop_assert_eq!(bits.width(), SCALAR_BITS);
            prop_assert_eq!(bits.as_slice()[0], 1);
        }
    }

    #[test]
    fn test_step_exponents() {
        let config = ProtocolConfig::standard().unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let exponents = generator().generate_step(&mut rng, &config).unwrap();
        assert_eq!(exponents.cells.len(), config.state_size);
        assert_eq!(exponents.cell_bits().unwrap().len(), config.state_size);
        // single use: no two draws coincide
        assert_ne!(exponents.cells[0], exponents.cells[1]);
        assert!(exponents.step.is_odd());
    }

    #[test]
    fn test_rng_failure_is_reported() {
        let err = generator().generate(&mut BrokenRng).unwrap_err();
        assert!(matches!(err, ProtocolError::RandomnessUnavailable(_)));
    }
}
