use crate::{
    config::{ProtocolConfig, ACTION_FIELDS},
    error::{expect_len, ProtocolError, Result},
    gadgets::field::FieldElement,
    utils::unit::Unit,
};
use serde::{Deserialize, Serialize};

/// Sentinel for unused action fields.
pub const NA: i64 = -1;

/// One board position: [unit type, hit points, village state, remaining range]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameCell {
    pub unit_type: u64,
    pub hit_points: u64,
    pub village_state: u64,
    pub remaining_range: u64,
}

impl GameCell {
    pub fn canonical(&self) -> [u64; 4] {
        [
            self.unit_type,
            self.hit_points,
            self.village_state,
            self.remaining_range,
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.unit_type == Unit::None.id()
    }

    /// Same cell with the unit removed, the village stays.
    pub fn vacated(&self) -> GameCell {
        GameCell {
            village_state: self.village_state,
            ..GameCell::default()
        }
    }
}

/// Per-player counters: [gold, villages owned, accumulated upkeep]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiscCounters {
    pub gold: u64,
    pub villages_owned: u64,
    pub accumulated_upkeep: u64,
}

impl MiscCounters {
    pub fn canonical(&self) -> [u64; 3] {
        [self.gold, self.villages_owned, self.accumulated_upkeep]
    }
}

/// Full private board of one player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    cells: Vec<GameCell>,
}

impl GameState {
    pub fn new(cells: Vec<GameCell>) -> Self {
        Self { cells }
    }

    pub fn empty(size: usize) -> Self {
        Self {
            cells: vec![GameCell::default(); size],
        }
    }

    /**
     * Starting board: a commander in the given cell, everything else empty
     *
     * @param config - protocol configuration (board size)
     * @param commander_cell - cell where the commander starts
     * @return - initial game state
     */
    pub fn with_commander(config: &ProtocolConfig, commander_cell: usize) -> Result<Self> {
        let mut state = Self::empty(config.state_size);
        let cell = state
            .cells
            .get_mut(commander_cell)
            .ok_or(ProtocolError::ShapeMismatch {
                field: "commander_cell",
                expected: config.state_size,
                actual: commander_cell,
            })?;
        *cell = Unit::OrcCommander.default_cell();
        Ok(state)
    }

    pub fn cells(&self) -> &[GameCell] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [GameCell] {
        &mut self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /**
     * Flatten state and counters into the field elements committed by a fold
     *
     * @param misc - counters stored next to the board
     * @return - 4 elements per cell, then the 3 counters
     */
    pub fn serialize(&self, misc: &MiscCounters) -> Vec<FieldElement> {
        self.cells
            .iter()
            .flat_map(GameCell::canonical)
            .chain(misc.canonical())
            .map(FieldElement::from)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    None = 0,
    Move = 1,
    CaptureVillage = 2,
    PurchaseUnit = 3,
}

impl TryFrom<i64> for ActionKind {
    type Error = ProtocolError;

    fn try_from(value: i64) -> Result<Self> {
        match value {
            0 => Ok(ActionKind::None),
            1 => Ok(ActionKind::Move),
            2 => Ok(ActionKind::CaptureVillage),
            3 => Ok(ActionKind::PurchaseUnit),
            _ => Err(ProtocolError::MalformedAction {
                index: 0,
                reason: format!("unknown kind {value}"),
            }),
        }
    }
}

/// Circuit encoding of an action:
/// [kind, src_x, src_y, dst_x, dst_y, village_id, spawn_castle, summoned_unit]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: i64,
    pub src_x: i64,
    pub src_y: i64,
    pub dst_x: i64,
    pub dst_y: i64,
    pub village_id: i64,
    pub spawn_castle: i64,
    pub summoned_unit: i64,
}

impl Action {
    pub fn idle() -> Self {
        Self::from_canonical([0, NA, NA, NA, NA, NA, NA, NA])
    }

    pub fn canonical(&self) -> [i64; ACTION_FIELDS] {
        [
            self.kind,
            self.src_x,
            self.src_y,
            self.dst_x,
            self.dst_y,
            self.village_id,
            self.spawn_castle,
            self.summoned_unit,
        ]
    }

    pub fn from_canonical(fields: [i64; ACTION_FIELDS]) -> Self {
        Self {
            kind: fields[0],
            src_x: fields[1],
            src_y: fields[2],
            dst_x: fields[3],
            dst_y: fields[4],
            village_id: fields[5],
            spawn_castle: fields[6],
            summoned_unit: fields[7],
        }
    }

    /**
     * Check one action slot against the encoding and the board dimensions
     *
     * @param index - slot index, reported on failure
     * @param config - protocol configuration
     * @return - MalformedAction naming the first offending field
     */
    pub fn validate(&self, index: usize, config: &ProtocolConfig) -> Result<ActionKind> {
        let malformed = |reason: String| ProtocolError::MalformedAction { index, reason };
        let kind = ActionKind::try_from(self.kind)
            .map_err(|_| malformed(format!("unknown kind {}", self.kind)))?;

        // fields that each kind is allowed to use
        let used: [bool; ACTION_FIELDS] = match kind {
            ActionKind::None => [true, false, false, false, false, false, false, false],
            ActionKind::Move => [true, true, true, true, true, false, false, false],
            ActionKind::CaptureVillage => [true, false, false, false, false, true, false, false],
            ActionKind::PurchaseUnit => [true, false, false, false, false, false, true, true],
        };
        for (position, (value, is_used)) in self.canonical().iter().zip(used).enumerate().skip(1) {
            if !is_used && *value != NA {
                return Err(malformed(format!("field {position} must be {NA}, got {value}")));
            }
        }

        match kind {
            ActionKind::None => {}
            ActionKind::Move => {
                if config.cell_index(self.src_x, self.src_y).is_none() {
                    return Err(malformed(format!(
                        "source ({}, {}) is off the board",
                        self.src_x, self.src_y
                    )));
                }
                if config.cell_index(self.dst_x, self.dst_y).is_none() {
                    return Err(malformed(format!(
                        "destination ({}, {}) is off the board",
                        self.dst_x, self.dst_y
                    )));
                }
            }
            ActionKind::CaptureVillage => {
                if self.village_id < 0 || self.village_id as usize >= config.nb_villages {
                    return Err(malformed(format!("unknown village {}", self.village_id)));
                }
            }
            ActionKind::PurchaseUnit => {
                if self.spawn_castle < 0 || self.spawn_castle as usize >= config.state_size {
                    return Err(malformed(format!("castle {} is off the board", self.spawn_castle)));
                }
                let unit = u64::try_from(self.summoned_unit)
                    .ok()
                    .and_then(|id| Unit::try_from(id).ok())
                    .ok_or_else(|| malformed(format!("unknown unit {}", self.summoned_unit)))?;
                if unit.cost().is_none() {
                    return Err(malformed(format!(
                        "unit {} cannot be recruited",
                        self.summoned_unit
                    )));
                }
            }
        }
        Ok(kind)
    }
}

pub type Position = (u64, u64);

/// Player-facing move, encoded into an `Action` slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    None,
    MoveUnit(Position, Position),
    CaptureVillage(u64),
    PurchaseUnit(u64, Unit),
}

impl Transaction {
    pub fn to_action(&self) -> Action {
        match self {
            Transaction::None => Action::idle(),
            Transaction::MoveUnit((src_x, src_y), (dst_x, dst_y)) => Action::from_canonical([
                ActionKind::Move as i64,
                *src_x as i64,
                *src_y as i64,
                *dst_x as i64,
                *dst_y as i64,
                NA,
                NA,
                NA,
            ]),
            Transaction::CaptureVillage(village_id) => Action::from_canonical([
                ActionKind::CaptureVillage as i64,
                NA,
                NA,
                NA,
                NA,
                *village_id as i64,
                NA,
                NA,
            ]),
            Transaction::PurchaseUnit(castle, unit) => Action::from_canonical([
                ActionKind::PurchaseUnit as i64,
                NA,
                NA,
                NA,
                NA,
                NA,
                *castle as i64,
                unit.id() as i64,
            ]),
        }
    }
}

/**
 * Pad a list of transactions to a full action batch
 *
 * @param transactions - at most `nb_actions` transactions
 * @param nb_actions - batch size
 * @return - exactly `nb_actions` actions, idle slots last
 */
pub fn action_batch(transactions: &[Transaction], nb_actions: usize) -> Result<Vec<Action>> {
    if transactions.len() > nb_actions {
        return Err(ProtocolError::ShapeMismatch {
            field: "actions",
            expected: nb_actions,
            actual: transactions.len(),
        });
    }
    let mut actions: Vec<Action> = transactions.iter().map(Transaction::to_action).collect();
    actions.resize(nb_actions, Action::idle());
    Ok(actions)
}

/// Bit-like vector indexed by village id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureVector(Vec<u8>);

impl CaptureVector {
    pub fn none(nb_villages: usize) -> Self {
        Self(vec![0; nb_villages])
    }

    /**
     * Build a vector with the given villages set
     *
     * @param nb_villages - vector length
     * @param villages - village ids to set
     * @return - capture vector, ShapeMismatch on an id past the end
     */
    pub fn from_villages(nb_villages: usize, villages: &[usize]) -> Result<Self> {
        let mut bits = vec![0; nb_villages];
        for village in villages {
            let bit = bits.get_mut(*village).ok_or(ProtocolError::ShapeMismatch {
                field: "village",
                expected: nb_villages,
                actual: *village,
            })?;
            *bit = 1;
        }
        Ok(Self(bits))
    }

    /// Adopt raw entries after checking they are all 0 or 1.
    pub fn from_bits(field: &'static str, raw: &[u8]) -> Result<Self> {
        if let Some((index, value)) = raw.iter().enumerate().find(|(_, b)| **b > 1) {
            return Err(ProtocolError::NotABit {
                field,
                index,
                value: *value as u64,
            });
        }
        Ok(Self(raw.to_vec()))
    }

    /**
     * Authorizations derived from the capture actions of a batch
     *
     * @param actions - action batch
     * @param nb_villages - vector length
     * @return - 1 for every village targeted by a capture action
     */
    pub fn from_actions(actions: &[Action], nb_villages: usize) -> Self {
        let mut bits = vec![0; nb_villages];
        for action in actions {
            if action.kind == ActionKind::CaptureVillage as i64 && action.village_id >= 0 {
                if let Some(bit) = bits.get_mut(action.village_id as usize) {
                    *bit = 1;
                }
            }
        }
        Self(bits)
    }

    pub fn expect_len(&self, field: &'static str, expected: usize) -> Result<()> {
        expect_len(field, expected, self.0.len())
    }

    pub fn is_set(&self, village: usize) -> bool {
        self.0.get(village).map_or(false, |b| *b == 1)
    }

    pub fn villages(&self) -> Vec<usize> {
        self.0
            .iter()
            .enumerate()
            .filter(|(_, b)| **b == 1)
            .map(|(v, _)| v)
            .collect()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
