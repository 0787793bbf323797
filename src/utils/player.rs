use {
    crate::{
        config::ProtocolConfig,
        gadgets::{curve::BabyJubjub, hash::PoseidonCompression},
        phases::{
            accumulator::{StateAccumulator, Transition},
            exponent::{ExponentGenerator, StepExponents},
            intersection::{respond, IntersectionChecker, IntersectionResult},
            witness::{PeerMessage, PeerPayload, ReconciliationWitness, StepWitness},
        },
        utils::{
            game::{action_batch, CaptureVector, GameState, MiscCounters, Transaction},
            rules::BasicRules,
            unit::Unit,
        },
    },
    anyhow::{bail, ensure, Context, Result},
    log::{debug, info},
    rand::RngCore,
};

/// Gold each player starts with.
pub const STARTING_GOLD: u64 = 100;

/// Cells where the two commanders start on the standard map.
pub const COMMANDER_CELLS: [usize; 2] = [0, 99];

// what a folded step keeps around until reconciliation
#[derive(Debug, Clone)]
struct Round {
    step: u64,
    exponents: StepExponents,
    transition: Transition,
    witness: StepWitness,
}

/// One player's side of the turn loop: fold, answer the peer, reconcile
pub struct Player<R: RngCore> {
    config: ProtocolConfig,
    curve: BabyJubjub,
    generator: ExponentGenerator,
    checker: IntersectionChecker,
    accumulator: StateAccumulator<PoseidonCompression, BasicRules>,
    rng: R,
    pending: Vec<Transaction>,
    damage: Vec<u64>,
    round: Option<Round>,
    reconciliation: Option<ReconciliationWitness>,
}

impl<R: RngCore> Player<R> {
    pub fn new(config: &ProtocolConfig, state: GameState, misc: MiscCounters, rng: R) -> Self {
        Self {
            config: config.clone(),
            curve: BabyJubjub::new(config),
            generator: ExponentGenerator::new(config),
            checker: IntersectionChecker::new(config),
            accumulator: StateAccumulator::new(
                config,
                PoseidonCompression,
                BasicRules::new(config),
                state,
                misc,
            ),
            rng,
            pending: Vec::new(),
            damage: vec![0; config.state_size],
            round: None,
            reconciliation: None,
        }
    }

    /**
     * Player with the standard starting position
     *
     * @param config - protocol configuration
     * @param seat - 0 or 1, selects the commander's starting corner
     * @param rng - source of blinding exponents
     * @return - player with a lone commander and the starting gold
     */
    pub fn standard(config: &ProtocolConfig, seat: usize, rng: R) -> Result<Self> {
        let cell = *COMMANDER_CELLS
            .get(seat)
            .with_context(|| format!("no seat {seat}"))?;
        let state = GameState::with_commander(config, cell)?;
        let misc = MiscCounters {
            gold: STARTING_GOLD,
            ..Default::default()
        };
        Ok(Self::new(config, state, misc, rng))
    }

    pub fn accumulator(&self) -> &StateAccumulator<PoseidonCompression, BasicRules> {
        &self.accumulator
    }

    pub fn step_witness(&self) -> Option<&StepWitness> {
        self.round.as_ref().map(|round| &round.witness)
    }

    pub fn reconciliation_witness(&self) -> Option<&ReconciliationWitness> {
        self.reconciliation.as_ref()
    }

    /// Queue a transaction for the next step.
    pub fn queue(&mut self, transaction: Transaction) -> Result<()> {
        ensure!(
            self.pending.len() < self.config.nb_actions,
            "at most {} actions per step",
            self.config.nb_actions
        );
        if let Transaction::PurchaseUnit(_, unit) = transaction {
            ensure!(unit != Unit::OrcCommander, "commanders cannot be recruited");
        }
        self.pending.push(transaction);
        Ok(())
    }

    /// Damage reported by the opponent, applied at the next step.
    pub fn receive_damage(&mut self, cell: usize, amount: u64) -> Result<()> {
        let slot = self
            .damage
            .get_mut(cell)
            .with_context(|| format!("cell {cell} is off the board"))?;
        *slot = slot
            .checked_add(amount)
            .with_context(|| format!("damage on cell {cell} overflows"))?;
        Ok(())
    }

    /**
     * Phase 1: fold the queued step and publish the blinded cell identifiers
     *
     * @param captures - villages declared captured this step
     * @return - commit payload for the peer
     */
    pub fn phase1(&mut self, captures: &[usize]) -> Result<PeerPayload> {
        let actions = action_batch(&self.pending, self.config.nb_actions)?;
        let action_captures = CaptureVector::from_actions(&actions, self.config.nb_villages);
        let captures = CaptureVector::from_villages(self.config.nb_villages, captures)?;
        let exponents = self.generator.generate_step(&mut self.rng, &self.config)?;

        let input = self.accumulator.prepare(
            actions,
            self.damage.clone(),
            captures.as_slice().to_vec(),
            action_captures.as_slice().to_vec(),
            exponents.cells.clone(),
        );
        let transition = self
            .accumulator
            .step(&input)
            .into_result()
            .context("phase 1 fold rejected")?;

        let step = self.accumulator.steps();
        let witness =
            StepWitness::new(&self.config, step, &input, &transition, &exponents.step, None)?;
        let payload = PeerPayload::commit(&self.config, step, &transition);
        debug!("phase 1 of step {} committed to {}", step, transition.commitment_after);

        self.pending.clear();
        self.damage = vec![0; self.config.state_size];
        self.round = Some(Round {
            step,
            exponents,
            transition,
            witness,
        });
        Ok(payload)
    }

    /**
     * Phase 2: answer the peer's commit with our own claims
     *
     * @param peer - JSON commit payload received from the peer
     * @return - response payload for the peer
     */
    pub fn phase2(&mut self, peer: &str) -> Result<PeerPayload> {
        let round = self.round.as_mut().context("phase 2 before phase 1")?;
        let payload = PeerPayload::from_json(peer)?;
        let commit = match payload.validate(&self.config, &self.curve)? {
            PeerMessage::Commit(commit) => commit,
            PeerMessage::Response { .. } => bail!("expected a commit in phase 2"),
        };
        ensure!(
            commit.step == round.step,
            "peer committed step {}, we are at step {}",
            commit.step,
            round.step
        );

        let response = respond(
            &self.curve,
            &self.config,
            &commit.tags,
            &round.transition.captures,
            &round.exponents.step,
        )?;
        round.witness.received_peer_data = Some(payload);
        debug!(
            "phase 2 of step {}: peer claims villages {:?}",
            round.step,
            commit.captures.villages()
        );
        Ok(PeerPayload::response(&self.config, round.step, &response))
    }

    /**
     * Phase 3: strip our blinding from the peer's response and intersect
     *
     * @param peer - JSON response payload received from the peer
     * @return - villages the peer claimed that we really held
     */
    pub fn phase3(&mut self, peer: &str) -> Result<IntersectionResult> {
        let round = self.round.as_ref().context("phase 3 before phase 1")?;
        let response = match PeerPayload::decode(peer, &self.config, &self.curve)? {
            PeerMessage::Response { step, response } => {
                ensure!(
                    step == round.step,
                    "peer answered step {step}, we are at step {}",
                    round.step
                );
                response
            }
            PeerMessage::Commit(_) => bail!("expected a response in phase 3"),
        };

        let result = self.checker.check(&response, &round.exponents.cells)?;
        self.reconciliation = Some(ReconciliationWitness::new(
            &self.config,
            round.step,
            &round.transition.identifiers,
            &round.exponents.cells,
            &response,
            &result,
        )?);
        info!(
            "step {}: {} villages lost to the peer",
            round.step,
            result.len()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{rngs::StdRng, SeedableRng},
    };

    fn assert_send<T: Send>() {}

    #[test]
    fn test_players_are_send() {
        assert_send::<Player<StdRng>>();
    }

    #[test]
    fn test_two_player_turn() {
        let config = ProtocolConfig::standard().unwrap();

        // alice holds villages 2 and 5 with her commander in her corner
        let mut alice_state = GameState::with_commander(&config, 0).unwrap();
        for village in [2, 5] {
            alice_state.cells_mut()[config.village_cells[village]].village_state = 1;
        }
        let alice_misc = MiscCounters {
            gold: STARTING_GOLD,
            villages_owned: 2,
            accumulated_upkeep: 0,
        };
        let mut alice = Player::new(&config, alice_state, alice_misc, StdRng::seed_from_u64(1));

        // bob has units standing on villages 2 and 6
        let mut bob_state = GameState::empty(config.state_size);
        bob_state.cells_mut()[config.village_cells[2]] = Unit::OrcCommander.default_cell();
        bob_state.cells_mut()[config.village_cells[6]] = Unit::OrcSoldier.default_cell();
        let bob_misc = MiscCounters {
            gold: STARTING_GOLD,
            villages_owned: 0,
            accumulated_upkeep: 1,
        };
        let mut bob = Player::new(&config, bob_state, bob_misc, StdRng::seed_from_u64(2));
        bob.queue(Transaction::CaptureVillage(2)).unwrap();
        bob.queue(Transaction::CaptureVillage(6)).unwrap();

        // phase 1
        let alice_commit = alice.phase1(&[]).unwrap().to_json().unwrap();
        let bob_commit = bob.phase1(&[2, 6]).unwrap().to_json().unwrap();
        assert_eq!(bob.accumulator().misc().villages_owned, 2);
        assert_eq!(bob.accumulator().misc().gold, STARTING_GOLD + 4 - 1);

        // phase 2
        let alice_response = alice.phase2(&bob_commit).unwrap().to_json().unwrap();
        let bob_response = bob.phase2(&alice_commit).unwrap().to_json().unwrap();

        // phase 3
        let alice_lost = alice.phase3(&bob_response).unwrap();
        let bob_lost = bob.phase3(&alice_response).unwrap();
        assert_eq!(alice_lost.villages().collect::<Vec<_>>(), vec![2]);
        assert_eq!(
            alice_lost.unconfirmed(&CaptureVector::from_villages(8, &[2, 6]).unwrap()),
            vec![6]
        );
        assert!(bob_lost.is_empty());

        let witness = alice.step_witness().unwrap();
        assert_eq!(witness.step, 1);
        assert_eq!(witness.serialized_state.len(), 400);
        assert_eq!(witness.blinding_exponents.len(), 100);
        assert!(witness.received_peer_data.is_some());
        let reconciliation = alice.reconciliation_witness().unwrap();
        assert_eq!(reconciliation.confirmed, vec![0, 0, 1, 0, 0, 0, 0, 0]);
        assert_eq!(reconciliation.inverse_exponents.len(), 100);
    }

    #[test]
    fn test_phase_order_and_limits() {
        let config = ProtocolConfig::standard().unwrap();
        let mut player = Player::standard(&config, 1, StdRng::seed_from_u64(9)).unwrap();
        assert!(player.phase2("{}").is_err());
        assert!(player.phase3("{}").is_err());
        assert!(Player::standard(&config, 2, StdRng::seed_from_u64(9)).is_err());

        for _ in 0..config.nb_actions {
            player.queue(Transaction::None).unwrap();
        }
        assert!(player.queue(Transaction::None).is_err());
        assert!(player.receive_damage(100, 1).is_err());

        player.receive_damage(3, u64::MAX).unwrap();
        let err = player.receive_damage(3, 1).unwrap_err();
        assert!(err.to_string().contains("overflows"));
    }

    #[test]
    fn test_unauthorized_claim_is_refused() {
        let config = ProtocolConfig::standard().unwrap();
        let mut player = Player::standard(&config, 0, StdRng::seed_from_u64(11)).unwrap();
        let before = player.accumulator().commitment();
        let err = player.phase1(&[4]).unwrap_err();
        assert!(format!("{err:#}").contains("capture authorization violated"));
        assert_eq!(player.accumulator().commitment(), before);
        assert_eq!(player.accumulator().steps(), 0);
    }
}
