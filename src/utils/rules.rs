use {
    crate::{
        config::ProtocolConfig,
        utils::{
            game::{Action, ActionKind, GameCell, GameState, MiscCounters},
            unit::Unit,
        },
    },
    anyhow::{anyhow, bail, ensure, Result},
};

/// Gold earned per owned village at the end of a turn.
pub const VILLAGE_INCOME: u64 = 2;

/// Game-rule collaborator: derives the next private state from a validated batch
pub trait RuleEngine {
    /**
     * Apply damage and an action batch to a state
     * @dev must be pure and deterministic, rejections go through the returned error
     *
     * @param prev_state - board before the step
     * @param prev_misc - counters before the step
     * @param actions - validated action batch
     * @param damage - damage received on each cell
     * @return - next board and counters
     */
    fn apply_actions(
        &self,
        prev_state: &GameState,
        prev_misc: &MiscCounters,
        actions: &[Action],
        damage: &[u64],
    ) -> Result<(GameState, MiscCounters)>;
}

/// Reference rules: movement, village capture, recruiting, damage, income and upkeep
#[derive(Debug, Clone)]
pub struct BasicRules {
    config: ProtocolConfig,
}

impl BasicRules {
    pub fn new(config: &ProtocolConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn cell_at(&self, x: i64, y: i64) -> Result<usize> {
        self.config
            .cell_index(x, y)
            .ok_or_else(|| anyhow!("({x}, {y}) is off the board"))
    }

    fn distance(&self, from: usize, to: usize) -> u64 {
        let width = self.config.board_width;
        let (fx, fy) = (from % width, from / width);
        let (tx, ty) = (to % width, to / width);
        (fx.abs_diff(tx) + fy.abs_diff(ty)) as u64
    }

    fn apply_damage(&self, cells: &mut [GameCell], damage: &[u64]) {
        for (cell, amount) in cells.iter_mut().zip(damage) {
            if cell.is_empty() || *amount == 0 {
                continue;
            }
            cell.hit_points = cell.hit_points.saturating_sub(*amount);
            if cell.hit_points == 0 {
                *cell = cell.vacated();
            }
        }
    }

    fn move_unit(&self, cells: &mut [GameCell], action: &Action) -> Result<()> {
        let src = self.cell_at(action.src_x, action.src_y)?;
        let dst = self.cell_at(action.dst_x, action.dst_y)?;
        let unit = cells[src];
        ensure!(!unit.is_empty(), "no unit to move at cell {src}");
        ensure!(src != dst, "unit at cell {src} moves onto itself");
        ensure!(cells[dst].is_empty(), "cell {dst} is occupied");
        let distance = self.distance(src, dst);
        ensure!(
            distance <= unit.remaining_range,
            "unit at cell {src} can move {} cells, not {distance}",
            unit.remaining_range
        );
        cells[dst] = GameCell {
            village_state: cells[dst].village_state,
            remaining_range: unit.remaining_range - distance,
            ..unit
        };
        cells[src] = unit.vacated();
        Ok(())
    }

    fn capture_village(
        &self,
        cells: &mut [GameCell],
        misc: &mut MiscCounters,
        action: &Action,
    ) -> Result<()> {
        let village = action.village_id as usize;
        let cell = self
            .config
            .village_cell(village)
            .ok_or_else(|| anyhow!("unknown village {village}"))?;
        let target = &mut cells[cell];
        ensure!(!target.is_empty(), "no unit stands on village {village}");
        ensure!(target.village_state == 0, "village {village} is already owned");
        misc.villages_owned = misc
            .villages_owned
            .checked_add(1)
            .ok_or_else(|| anyhow!("village count overflows"))?;
        target.village_state = 1;
        Ok(())
    }

    fn purchase_unit(
        &self,
        cells: &mut [GameCell],
        misc: &mut MiscCounters,
        action: &Action,
    ) -> Result<()> {
        let unit = Unit::try_from(action.summoned_unit as u64)?;
        let cost = unit
            .cost()
            .ok_or_else(|| anyhow!("{unit:?} cannot be recruited"))?;
        let castle = action.spawn_castle as usize;
        let target = cells
            .get_mut(castle)
            .ok_or_else(|| anyhow!("castle {castle} is off the board"))?;
        ensure!(target.is_empty(), "castle {castle} is occupied");
        ensure!(misc.gold >= cost, "{unit:?} costs {cost} gold, {} left", misc.gold);
        misc.accumulated_upkeep = misc
            .accumulated_upkeep
            .checked_add(unit.upkeep())
            .ok_or_else(|| anyhow!("upkeep overflows"))?;
        misc.gold -= cost;
        *target = GameCell {
            village_state: target.village_state,
            ..unit.default_cell()
        };
        Ok(())
    }

    fn end_turn(&self, cells: &mut [GameCell], misc: &mut MiscCounters) -> Result<()> {
        let gold = misc
            .villages_owned
            .checked_mul(VILLAGE_INCOME)
            .and_then(|income| misc.gold.checked_add(income))
            .ok_or_else(|| anyhow!("gold overflows"))?;
        misc.gold = gold.saturating_sub(misc.accumulated_upkeep);
        for cell in cells.iter_mut().filter(|cell| !cell.is_empty()) {
            cell.remaining_range = Unit::try_from(cell.unit_type)?.movement();
        }
        Ok(())
    }
}

impl RuleEngine for BasicRules {
    fn apply_actions(
        &self,
        prev_state: &GameState,
        prev_misc: &MiscCounters,
        actions: &[Action],
        damage: &[u64],
    ) -> Result<(GameState, MiscCounters)> {
        ensure!(
            damage.len() == prev_state.len(),
            "damage covers {} cells, the board has {}",
            damage.len(),
            prev_state.len()
        );
        let mut state = prev_state.clone();
        let mut misc = *prev_misc;

        // damage dealt by the opponent lands first
        self.apply_damage(state.cells_mut(), damage);

        for (index, action) in actions.iter().enumerate() {
            let result = match ActionKind::try_from(action.kind)? {
                ActionKind::None => Ok(()),
                ActionKind::Move => self.move_unit(state.cells_mut(), action),
                ActionKind::CaptureVillage => {
                    self.capture_village(state.cells_mut(), &mut misc, action)
                }
                ActionKind::PurchaseUnit => {
                    self.purchase_unit(state.cells_mut(), &mut misc, action)
                }
            };
            if let Err(e) = result {
                bail!("action {index}: {e}");
            }
        }

        self.end_turn(state.cells_mut(), &mut misc)?;
        Ok((state, misc))
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::utils::game::{action_batch, Transaction},
    };

    fn setup() -> (ProtocolConfig, BasicRules) {
        let config = ProtocolConfig::standard().unwrap();
        let rules = BasicRules::new(&config);
        (config, rules)
    }

    fn idle(config: &ProtocolConfig) -> Vec<Action> {
        action_batch(&[], config.nb_actions).unwrap()
    }

    #[test]
    fn test_idle_step_keeps_zero_state() {
        let (config, rules) = setup();
        let state = GameState::empty(config.state_size);
        let misc = MiscCounters::default();
        let damage = vec![0; config.state_size];
        let (next, next_misc) = rules
            .apply_actions(&state, &misc, &idle(&config), &damage)
            .unwrap();
        assert_eq!(next, state);
        assert_eq!(next_misc, misc);
    }

    #[test]
    fn test_move_then_capture() {
        let (config, rules) = setup();
        // commander at (0, 0), village 0 sits at cell 12 = (2, 1)
        let state = GameState::with_commander(&config, 0).unwrap();
        let misc = MiscCounters {
            gold: 100,
            ..Default::default()
        };
        let actions = action_batch(
            &[
                Transaction::MoveUnit((0, 0), (2, 1)),
                Transaction::CaptureVillage(0),
            ],
            config.nb_actions,
        )
        .unwrap();
        let damage = vec![0; config.state_size];
        let (next, next_misc) = rules.apply_actions(&state, &misc, &actions, &damage).unwrap();

        assert!(next.cells()[0].is_empty());
        let village = next.cells()[12];
        assert_eq!(village.unit_type, Unit::OrcCommander.id());
        assert_eq!(village.village_state, 1);
        // range is refreshed at the end of the turn
        assert_eq!(village.remaining_range, 5);
        assert_eq!(next_misc.villages_owned, 1);
        assert_eq!(next_misc.gold, 100 + VILLAGE_INCOME);
    }

    #[test]
    fn test_purchase_and_upkeep() {
        let (config, rules) = setup();
        let state = GameState::with_commander(&config, 0).unwrap();
        let misc = MiscCounters {
            gold: 20,
            ..Default::default()
        };
        let actions = action_batch(
            &[Transaction::PurchaseUnit(1, Unit::OrcSoldier)],
            config.nb_actions,
        )
        .unwrap();
        let damage = vec![0; config.state_size];
        let (next, next_misc) = rules.apply_actions(&state, &misc, &actions, &damage).unwrap();
        assert_eq!(next.cells()[1], Unit::OrcSoldier.default_cell());
        assert_eq!(next_misc.gold, 20 - 12 - 1);
        assert_eq!(next_misc.accumulated_upkeep, 1);

        let broke = MiscCounters {
            gold: 5,
            ..Default::default()
        };
        assert!(rules.apply_actions(&state, &broke, &actions, &damage).is_err());
    }

    #[test]
    fn test_damage_removes_dead_units() {
        let (config, rules) = setup();
        let state = GameState::with_commander(&config, 12).unwrap();
        let misc = MiscCounters::default();
        let mut damage = vec![0; config.state_size];
        damage[12] = 10;
        let (hurt, _) = rules.apply_actions(&state, &misc, &idle(&config), &damage).unwrap();
        assert_eq!(hurt.cells()[12].hit_points, 48);

        damage[12] = 100;
        let (dead, _) = rules.apply_actions(&hurt, &misc, &idle(&config), &damage).unwrap();
        assert!(dead.cells()[12].is_empty());
    }

    #[test]
    fn test_rejects_illegal_moves() {
        let (config, rules) = setup();
        let state = GameState::with_commander(&config, 0).unwrap();
        let misc = MiscCounters::default();
        let damage = vec![0; config.state_size];
        for transaction in [
            // too far
            Transaction::MoveUnit((0, 0), (9, 9)),
            // nothing to move
            Transaction::MoveUnit((5, 5), (5, 6)),
            // nobody on the village
            Transaction::CaptureVillage(3),
        ] {
            let actions = action_batch(&[transaction], config.nb_actions).unwrap();
            assert!(rules.apply_actions(&state, &misc, &actions, &damage).is_err());
        }
        assert!(rules
            .apply_actions(&state, &misc, &idle(&config), &damage[1..])
            .is_err());
    }

    #[test]
    fn test_counter_overflow_is_refused() {
        let (config, rules) = setup();
        let damage = vec![0; config.state_size];

        // income on top of a full purse
        let state = GameState::empty(config.state_size);
        let rich = MiscCounters {
            gold: u64::MAX,
            villages_owned: 1,
            accumulated_upkeep: 0,
        };
        let err = rules
            .apply_actions(&state, &rich, &idle(&config), &damage)
            .unwrap_err();
        assert!(err.to_string().contains("gold overflows"));

        // one village too many
        let state = GameState::with_commander(&config, 12).unwrap();
        let owner = MiscCounters {
            villages_owned: u64::MAX,
            ..Default::default()
        };
        let capture = action_batch(&[Transaction::CaptureVillage(0)], config.nb_actions).unwrap();
        let err = rules
            .apply_actions(&state, &owner, &capture, &damage)
            .unwrap_err();
        assert!(err.to_string().contains("village count overflows"));

        // upkeep already at the ceiling
        let state = GameState::with_commander(&config, 0).unwrap();
        let indebted = MiscCounters {
            gold: 100,
            villages_owned: 0,
            accumulated_upkeep: u64::MAX,
        };
        let purchase = action_batch(
            &[Transaction::PurchaseUnit(1, Unit::OrcSoldier)],
            config.nb_actions,
        )
        .unwrap();
        let err = rules
            .apply_actions(&state, &indebted, &purchase, &damage)
            .unwrap_err();
        assert!(err.to_string().contains("upkeep overflows"));
    }
}
