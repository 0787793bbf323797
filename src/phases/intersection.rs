use {
    crate::{
        config::ProtocolConfig,
        error::{expect_len, Result},
        gadgets::{curve::BabyJubjub, field::CurveScalar},
        phases::blinding::{blind, decoy, hashed_identifier, unblind, BlindedTag},
        utils::game::CaptureVector,
    },
    log::info,
    std::collections::BTreeSet,
};

/// What the claimer sends back to the owner of the tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PsiResponse {
    /// b * a_i * H_i for every cell, in cell order
    pub dh_output: Vec<BlindedTag>,
    /// b * H(cell(v), 1) for claimed villages, b * Decoy(v) otherwise
    pub hidden_tags: Vec<BlindedTag>,
}

/**
 * Answer the owner's blinded identifiers with the claimer's own exponent
 *
 * @param curve - Baby Jubjub instance
 * @param config - protocol configuration
 * @param received_tags - a_i * H_i for each cell, as received from the owner
 * @param claims - villages the claimer declares captured
 * @param step_exponent - claimer exponent b for this step
 * @return - double-blinded tags and hidden village tags
 */
pub fn respond(
    curve: &BabyJubjub,
    config: &ProtocolConfig,
    received_tags: &[BlindedTag],
    claims: &CaptureVector,
    step_exponent: &CurveScalar,
) -> Result<PsiResponse> {
    expect_len("received_tags", config.state_size, received_tags.len())?;
    claims.expect_len("claims", config.nb_villages)?;

    let dh_output = received_tags
        .iter()
        .map(|tag| blind(curve, tag, step_exponent))
        .collect();

    let hidden_tags = config
        .village_cells
        .iter()
        .enumerate()
        .map(|(village, cell)| {
            let identifier = if claims.is_set(village) {
                hashed_identifier(curve, *cell, 1)
            } else {
                decoy(curve, village)
            };
            blind(curve, &identifier, step_exponent)
        })
        .collect();

    Ok(PsiResponse {
        dh_output,
        hidden_tags,
    })
}

/// Villages confirmed as captured
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntersectionResult {
    villages: BTreeSet<usize>,
}

impl IntersectionResult {
    pub fn contains(&self, village: usize) -> bool {
        self.villages.contains(&village)
    }

    pub fn villages(&self) -> impl Iterator<Item = usize> + '_ {
        self.villages.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.villages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.villages.is_empty()
    }

    /// Claims that the intersection did not confirm. Report only.
    pub fn unconfirmed(&self, claims: &CaptureVector) -> Vec<usize> {
        claims
            .villages()
            .into_iter()
            .filter(|v| !self.contains(*v))
            .collect()
    }

    pub fn to_capture_vector(&self, nb_villages: usize) -> Result<CaptureVector> {
        let villages: Vec<usize> = self.villages().collect();
        CaptureVector::from_villages(nb_villages, &villages)
    }
}

impl FromIterator<usize> for IntersectionResult {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self {
            villages: iter.into_iter().collect(),
        }
    }
}

/// Owner side of the exchange: strips its own blinding and intersects
#[derive(Debug, Clone)]
pub struct IntersectionChecker {
    config: ProtocolConfig,
    curve: BabyJubjub,
}

impl IntersectionChecker {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            config: config.clone(),
            curve: BabyJubjub::new(config),
        }
    }

    /**
     * Remove the owner's per-cell exponents from the double-blinded tags
     *
     * @param dh_output - b * a_i * H_i for each cell
     * @param exponents - the owner's a_i
     * @return - b * H_i for each cell
     */
    pub fn unblind_all(
        &self,
        dh_output: &[BlindedTag],
        exponents: &[CurveScalar],
    ) -> Result<Vec<BlindedTag>> {
        expect_len("dh_output", self.config.state_size, dh_output.len())?;
        expect_len("blinding_exponents", self.config.state_size, exponents.len())?;
        dh_output
            .iter()
            .zip(exponents)
            .map(|(tag, exponent)| unblind(&self.curve, tag, exponent))
            .collect()
    }

    /**
     * Compute which villages claimed by the peer the owner really holds
     *
     * @param response - the peer's answer to our outgoing tags
     * @param exponents - exponents used to blind the outgoing tags
     * @return - villages v with b * H(cell(v), state) equal to the hidden tag of v
     */
    pub fn check(
        &self,
        response: &PsiResponse,
        exponents: &[CurveScalar],
    ) -> Result<IntersectionResult> {
        expect_len("hidden_tags", self.config.nb_villages, response.hidden_tags.len())?;
        let unblinded = self.unblind_all(&response.dh_output, exponents)?;
        let result: IntersectionResult = self
            .config
            .village_cells
            .iter()
            .zip(&response.hidden_tags)
            .enumerate()
            .filter(|(_, (cell, hidden))| unblinded[**cell] == **hidden)
            .map(|(village, _)| village)
            .collect();
        info!(
            "intersection confirmed {} of {} villages",
            result.len(),
            self.config.nb_villages
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{error::ProtocolError, phases::exponent::ExponentGenerator},
        rand::{rngs::StdRng, SeedableRng},
    };

    struct Exchange {
        config: ProtocolConfig,
        curve: BabyJubjub,
        owner_exponents: Vec<CurveScalar>,
        owner_tags: Vec<BlindedTag>,
        step_exponent: CurveScalar,
    }

    impl Exchange {
        fn respond(&self, claims: &CaptureVector) -> Result<PsiResponse> {
            respond(
                &self.curve,
                &self.config,
                &self.owner_tags,
                claims,
                &self.step_exponent,
            )
        }
    }

    // owner holds the given villages, everything else is village_state 0
    fn exchange(owned: &[usize], seed: u64) -> Exchange {
        let config = ProtocolConfig::standard().unwrap();
        let curve = BabyJubjub::new(&config);
        let mut rng = StdRng::seed_from_u64(seed);
        let exponents = ExponentGenerator::new(&config)
            .generate_step(&mut rng, &config)
            .unwrap();
        let owned_cells: Vec<usize> = owned.iter().map(|v| config.village_cells[*v]).collect();
        let owner_tags = (0..config.state_size)
            .map(|cell| {
                let state = owned_cells.contains(&cell) as u64;
                let h = hashed_identifier(&curve, cell, state);
                blind(&curve, &h, &exponents.cells[cell])
            })
            .collect();
        Exchange {
            config,
            curve,
            owner_exponents: exponents.cells,
            owner_tags,
            step_exponent: exponents.step,
        }
    }

    #[test]
    fn test_confirms_only_genuine_captures() {
        let ex = exchange(&[2, 5], 3);
        let claims = CaptureVector::from_villages(8, &[2, 6]).unwrap();
        let response = ex.respond(&claims).unwrap();
        assert_eq!(response.dh_output.len(), 100);
        assert_eq!(response.hidden_tags.len(), 8);

        let result = IntersectionChecker::new(&ex.config)
            .check(&response, &ex.owner_exponents)
            .unwrap();
        assert_eq!(result.villages().collect::<Vec<_>>(), vec![2]);
        assert_eq!(result.unconfirmed(&claims), vec![6]);
        assert_eq!(result.to_capture_vector(8).unwrap().villages(), vec![2]);
    }

    #[test]
    fn test_no_claims_no_intersection() {
        let ex = exchange(&[0, 1, 2, 3, 4, 5, 6, 7], 4);
        let claims = CaptureVector::none(8);
        let response = ex.respond(&claims).unwrap();
        let result = IntersectionChecker::new(&ex.config)
            .check(&response, &ex.owner_exponents)
            .unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_wrong_exponents_confirm_nothing() {
        let ex = exchange(&[2], 5);
        let claims = CaptureVector::from_villages(8, &[2]).unwrap();
        let response = ex.respond(&claims).unwrap();
        let mut wrong = ex.owner_exponents.clone();
        wrong.swap(33, 34);
        let result = IntersectionChecker::new(&ex.config).check(&response, &wrong).unwrap();
        assert!(!result.contains(2));
    }

    #[test]
    fn test_rejects_truncated_response() {
        let ex = exchange(&[], 6);
        let claims = CaptureVector::none(8);
        let mut response = ex.respond(&claims).unwrap();
        response.hidden_tags.pop();
        let err = IntersectionChecker::new(&ex.config)
            .check(&response, &ex.owner_exponents)
            .unwrap_err();
        assert!(matches!(err, ProtocolError::ShapeMismatch { field: "hidden_tags", .. }));
        let truncated = &ex.owner_tags[1..];
        assert!(respond(&ex.curve, &ex.config, truncated, &claims, &ex.step_exponent).is_err());
    }
}
