use {
    crate::{
        config::ProtocolConfig,
        error::{expect_len, ProtocolError, Result},
        gadgets::{
            curve::BabyJubjub,
            field::{CurveScalar, FieldElement},
            hash::{Commitment, CompressionFunction},
        },
        phases::blinding::{blind, hashed_identifier, BlindedTag, HashedIdentifier},
        utils::{
            game::{Action, CaptureVector, GameState, MiscCounters},
            rules::RuleEngine,
        },
    },
    log::{debug, warn, Level},
    plonky2::util::timing::TimingTree,
};

/// Everything one fold consumes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepInput {
    pub prev_state: GameState,
    pub prev_misc: MiscCounters,
    pub actions: Vec<Action>,
    pub damage: Vec<u64>,
    pub captures: Vec<u8>,
    pub action_captures: Vec<u8>,
    pub blinding_exponents: Vec<CurveScalar>,
    pub prior_commitment: Commitment,
}

/// Result of an accepted fold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub commitment_before: Commitment,
    pub commitment_after: Commitment,
    pub next_state: GameState,
    pub next_misc: MiscCounters,
    pub captures: CaptureVector,
    pub action_captures: CaptureVector,
    /// H(i, village_state_i) for every cell of the next state
    pub identifiers: Vec<HashedIdentifier>,
    /// identifiers blinded with the per-cell exponents, sent to the peer
    pub tags: Vec<BlindedTag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(Transition),
    Rejected(ProtocolError),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }

    pub fn into_result(self) -> Result<Transition> {
        match self {
            ValidationOutcome::Accepted(transition) => Ok(transition),
            ValidationOutcome::Rejected(reason) => Err(reason),
        }
    }
}

impl From<Result<Transition>> for ValidationOutcome {
    fn from(result: Result<Transition>) -> Self {
        match result {
            Ok(transition) => ValidationOutcome::Accepted(transition),
            Err(reason) => ValidationOutcome::Rejected(reason),
        }
    }
}

/**
 * Public starting point of every chain, identical for both players
 *
 * @param config - protocol configuration
 * @param hasher - compression function of the fold
 * @return - Hash(PROTOCOL_VERSION, STATE_SIZE, NB_VILLAGES, NB_ACTIONS)
 */
pub fn genesis<H: CompressionFunction>(config: &ProtocolConfig, hasher: &H) -> Commitment {
    hasher.compress(&[
        FieldElement::from(config.version),
        FieldElement::from(config.state_size as u64),
        FieldElement::from(config.nb_villages as u64),
        FieldElement::from(config.nb_actions as u64),
    ])
}

/**
 * Check that every declared capture is authorized by the action batch
 *
 * @param captures - villages declared captured
 * @param action_captures - villages targeted by a capture action
 * @return - CaptureAuthorizationViolation listing every unauthorized village
 */
pub fn validate_captures(captures: &CaptureVector, action_captures: &CaptureVector) -> Result<()> {
    let villages: Vec<usize> = captures
        .villages()
        .into_iter()
        .filter(|v| !action_captures.is_set(*v))
        .collect();
    if !villages.is_empty() {
        return Err(ProtocolError::CaptureAuthorizationViolation { villages });
    }
    Ok(())
}

fn validate_state(state: &GameState, config: &ProtocolConfig) -> Result<()> {
    expect_len("prev_state", config.state_size, state.len())?;
    let bounds = &config.bounds;
    for (index, cell) in state.cells().iter().enumerate() {
        let checks = [
            ("unit_type", cell.unit_type, bounds.max_unit_type),
            ("hit_points", cell.hit_points, bounds.max_hit_points),
            ("village_state", cell.village_state, bounds.max_village_state),
            ("remaining_range", cell.remaining_range, bounds.max_remaining_range),
        ];
        if let Some((field, value, max)) = checks.into_iter().find(|(_, v, max)| v > max) {
            return Err(ProtocolError::CellOutOfBounds {
                index,
                field,
                value,
                max,
            });
        }
    }
    Ok(())
}

/**
 * Shape, range and bit checks on a step input, run before anything is folded
 *
 * @param input - step input
 * @param config - protocol configuration
 * @return - the capture vectors once both are known to be well formed
 */
pub fn validate(
    input: &StepInput,
    config: &ProtocolConfig,
) -> Result<(CaptureVector, CaptureVector)> {
    validate_state(&input.prev_state, config)?;

    expect_len("actions", config.nb_actions, input.actions.len())?;
    for (index, action) in input.actions.iter().enumerate() {
        action.validate(index, config)?;
    }

    expect_len("damage", config.state_size, input.damage.len())?;

    let captures = CaptureVector::from_bits("captures", &input.captures)?;
    captures.expect_len("captures", config.nb_villages)?;
    let action_captures = CaptureVector::from_bits("action_captures", &input.action_captures)?;
    action_captures.expect_len("action_captures", config.nb_villages)?;

    expect_len("blinding_exponents", config.state_size, input.blinding_exponents.len())?;
    // odd is not enough: N = 8 * l, so odd multiples of l must be refused too
    for exponent in &input.blinding_exponents {
        config.curve_order.modinv(exponent)?;
    }

    Ok((captures, action_captures))
}

/// Folds game steps into a running commitment over a private state
#[derive(Debug, Clone)]
pub struct StateAccumulator<H: CompressionFunction, R: RuleEngine> {
    config: ProtocolConfig,
    curve: BabyJubjub,
    hasher: H,
    rules: R,
    commitment: Commitment,
    state: GameState,
    misc: MiscCounters,
    steps: u64,
}

impl<H: CompressionFunction, R: RuleEngine> StateAccumulator<H, R> {
    /**
     * Start a chain at the genesis commitment
     *
     * @param config - protocol configuration
     * @param hasher - compression function of the fold
     * @param rules - game-rule collaborator
     * @param state - private starting board
     * @param misc - private starting counters
     * @return - accumulator with zero steps folded
     */
    pub fn new(
        config: &ProtocolConfig,
        hasher: H,
        rules: R,
        state: GameState,
        misc: MiscCounters,
    ) -> Self {
        let commitment = genesis(config, &hasher);
        Self {
            config: config.clone(),
            curve: BabyJubjub::new(config),
            hasher,
            rules,
            commitment,
            state,
            misc,
            steps: 0,
        }
    }

    pub fn commitment(&self) -> Commitment {
        self.commitment
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn misc(&self) -> &MiscCounters {
        &self.misc
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn curve(&self) -> &BabyJubjub {
        &self.curve
    }

    /**
     * Pure transition: validate, apply the rules, fold and blind the outgoing identifiers
     *
     * @param input - full step input, including the prior commitment
     * @return - Accepted with the next commitment and state, or Rejected with the first violation
     */
    pub fn transition(&self, input: &StepInput) -> ValidationOutcome {
        let mut timing = TimingTree::new("fold step", Level::Debug);
        let outcome = self.try_transition(input, &mut timing).into();
        timing.print();
        outcome
    }

    fn try_transition(&self, input: &StepInput, timing: &mut TimingTree) -> Result<Transition> {
        // 1. shape
        timing.push("validate", Level::Debug);
        let checked = validate(input, &self.config);
        timing.pop();
        let (captures, action_captures) = checked?;

        // 2. no unauthorized capture ever reaches the fold
        validate_captures(&captures, &action_captures)?;

        // 3. game rules
        timing.push("apply actions", Level::Debug);
        let applied = self.rules.apply_actions(
            &input.prev_state,
            &input.prev_misc,
            &input.actions,
            &input.damage,
        );
        timing.pop();
        let (next_state, next_misc) =
            applied.map_err(|e| ProtocolError::RuleRejected(format!("{e:#}")))?;
        validate_state(&next_state, &self.config)?;

        // 4. fold
        timing.push("compress", Level::Debug);
        let mut preimage = input.prior_commitment.to_field_elements().to_vec();
        preimage.extend(next_state.serialize(&next_misc));
        let commitment_after = self.hasher.compress(&preimage);
        timing.pop();

        // 5. outgoing tags
        timing.push("blind identifiers", Level::Debug);
        let (identifiers, tags) = self.blind_identifiers(&next_state, &input.blinding_exponents);
        timing.pop();

        Ok(Transition {
            commitment_before: input.prior_commitment,
            commitment_after,
            next_state,
            next_misc,
            captures,
            action_captures,
            identifiers,
            tags,
        })
    }

    fn blind_identifiers(
        &self,
        state: &GameState,
        exponents: &[CurveScalar],
    ) -> (Vec<HashedIdentifier>, Vec<BlindedTag>) {
        let identifiers: Vec<HashedIdentifier> = state
            .cells()
            .iter()
            .enumerate()
            .map(|(i, cell)| hashed_identifier(&self.curve, i, cell.village_state))
            .collect();
        let tags = identifiers
            .iter()
            .zip(exponents)
            .map(|(identifier, exponent)| blind(&self.curve, identifier, exponent))
            .collect();
        (identifiers, tags)
    }

    /**
     * Build the input of the next step on top of the current chain head
     *
     * @param actions - action batch
     * @param damage - damage received on each cell
     * @param captures - villages declared captured this step
     * @param action_captures - villages targeted by capture actions
     * @param blinding_exponents - one exponent per cell
     * @return - step input
     */
    pub fn prepare(
        &self,
        actions: Vec<Action>,
        damage: Vec<u64>,
        captures: Vec<u8>,
        action_captures: Vec<u8>,
        blinding_exponents: Vec<CurveScalar>,
    ) -> StepInput {
        StepInput {
            prev_state: self.state.clone(),
            prev_misc: self.misc,
            actions,
            damage,
            captures,
            action_captures,
            blinding_exponents,
            prior_commitment: self.commitment,
        }
    }

    /**
     * Fold one step on top of the current chain head
     * @dev the accumulator only advances on Accepted, a rejection leaves it untouched
     *
     * @param input - step input, usually from `prepare`
     * @return - outcome of the transition
     */
    pub fn step(&mut self, input: &StepInput) -> ValidationOutcome {
        let on_head = input.prior_commitment == self.commitment && input.prev_state == self.state;
        let outcome = if !on_head {
            ValidationOutcome::Rejected(ProtocolError::ChainMismatch {
                expected: self.commitment.to_string(),
                actual: input.prior_commitment.to_string(),
            })
        } else {
            self.transition(input)
        };
        match &outcome {
            ValidationOutcome::Accepted(transition) => {
                self.commitment = transition.commitment_after;
                self.state = transition.next_state.clone();
                self.misc = transition.next_misc;
                self.steps += 1;
                debug!("step {} folded into {}", self.steps, self.commitment);
            }
            ValidationOutcome::Rejected(reason) => {
                warn!("step {} rejected: {}", self.steps + 1, reason);
            }
        }
        outcome
    }
}
