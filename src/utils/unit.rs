use crate::utils::game::GameCell;
use anyhow::{anyhow, Result};

/// Units available on the standard map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    None,
    OrcCommander,
    OrcSoldier,
}

impl Unit {
    const ALL: [Unit; 3] = [Unit::None, Unit::OrcCommander, Unit::OrcSoldier];

    pub fn id(&self) -> u64 {
        match self {
            Unit::None => 0,
            Unit::OrcCommander => 1,
            Unit::OrcSoldier => 2,
        }
    }

    pub fn is_commander(&self) -> bool {
        matches!(self, Unit::OrcCommander)
    }

    pub fn hit_points(&self) -> u64 {
        match self {
            Unit::None => 0,
            Unit::OrcCommander => 58,
            Unit::OrcSoldier => 12,
        }
    }

    pub fn movement(&self) -> u64 {
        match self {
            Unit::None => 0,
            Unit::OrcCommander | Unit::OrcSoldier => 5,
        }
    }

    /// Gold spent to recruit, None if the unit cannot be recruited.
    pub fn cost(&self) -> Option<u64> {
        match self {
            Unit::OrcSoldier => Some(12),
            Unit::None | Unit::OrcCommander => None,
        }
    }

    pub fn upkeep(&self) -> u64 {
        match self {
            Unit::OrcSoldier => 1,
            Unit::None | Unit::OrcCommander => 0,
        }
    }

    /// Cell content right after the unit is placed on the board
    pub fn default_cell(&self) -> GameCell {
        GameCell {
            unit_type: self.id(),
            hit_points: self.hit_points(),
            village_state: 0,
            remaining_range: self.movement(),
        }
    }

    pub fn max_id() -> u64 {
        Self::ALL.iter().map(Unit::id).max().unwrap_or(0)
    }

    pub fn max_hit_points() -> u64 {
        Self::ALL.iter().map(Unit::hit_points).max().unwrap_or(0)
    }

    pub fn max_movement() -> u64 {
        Self::ALL.iter().map(Unit::movement).max().unwrap_or(0)
    }
}

impl TryFrom<u64> for Unit {
    type Error = anyhow::Error;

    fn try_from(value: u64) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|unit| unit.id() == value)
            .ok_or_else(|| anyhow!("invalid unit id {value}"))
    }
}

impl From<Unit> for u64 {
    fn from(value: Unit) -> Self {
        value.id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_ids_round_trip() {
        for id in 0..=Unit::max_id() {
            let unit = Unit::try_from(id).unwrap();
            assert_eq!(u64::from(unit), id);
        }
        assert!(Unit::try_from(3).is_err());
    }

    #[test]
    fn test_default_cells() {
        let commander = Unit::OrcCommander.default_cell();
        assert_eq!(commander.hit_points, 58);
        assert_eq!(commander.remaining_range, 5);
        assert!(Unit::OrcCommander.is_commander());
        assert_eq!(Unit::None.default_cell(), GameCell::default());
        assert_eq!(Unit::OrcCommander.cost(), None);
        assert_eq!(Unit::OrcSoldier.cost(), Some(12));
        assert_eq!(Unit::max_hit_points(), 58);
    }
}
