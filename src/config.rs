use crate::{
    error::{ProtocolError, Result},
    gadgets::field::{CurveOrder, FieldModulus},
    utils::unit::Unit,
};

// Versioned protocol contract: changing any of these is a breaking version bump.
pub const PROTOCOL_VERSION: u64 = 1;
pub const STATE_SIZE: usize = 100;
pub const NB_VILLAGES: usize = 8;
pub const NB_ACTIONS: usize = 10;
pub const ACTION_FIELDS: usize = 8;
pub const SCALAR_BITS: usize = 254;
pub const BOARD_WIDTH: usize = 10;

/// Cells holding a village on the standard 10x10 map, indexed by village id.
pub const STANDARD_VILLAGES: [usize; NB_VILLAGES] = [12, 17, 33, 46, 53, 66, 82, 87];

/// Upper bounds accepted for every field of a game cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellBounds {
    pub max_unit_type: u64,
    pub max_hit_points: u64,
    pub max_village_state: u64,
    pub max_remaining_range: u64,
}

impl CellBounds {
    pub fn standard() -> Self {
        Self {
            max_unit_type: Unit::max_id(),
            max_hit_points: Unit::max_hit_points(),
            max_village_state: 1,
            max_remaining_range: Unit::max_movement(),
        }
    }
}

/// Everything a component needs to know about the protocol instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    pub version: u64,
    pub state_size: usize,
    pub nb_villages: usize,
    pub nb_actions: usize,
    pub board_width: usize,
    pub field: FieldModulus,
    pub curve_order: CurveOrder,
    pub bounds: CellBounds,
    pub village_cells: Vec<usize>,
}

impl ProtocolConfig {
    /**
     * Generate the version 1 configuration shared by both players
     *
     * @return - BN254 / Baby Jubjub moduli, 10x10 board, 8 villages, 10 actions per batch
     */
    pub fn standard() -> Result<ProtocolConfig> {
        let config = ProtocolConfig {
            version: PROTOCOL_VERSION,
            state_size: STATE_SIZE,
            nb_villages: NB_VILLAGES,
            nb_actions: NB_ACTIONS,
            board_width: BOARD_WIDTH,
            field: FieldModulus::bn254(),
            curve_order: CurveOrder::baby_jubjub(),
            bounds: CellBounds::standard(),
            village_cells: STANDARD_VILLAGES.to_vec(),
        };
        config.validate()?;
        Ok(config)
    }

    /**
     * Check internal consistency of sizes and village layout
     *
     * @return - ShapeMismatch on an inconsistent layout
     */
    pub fn validate(&self) -> Result<()> {
        if self.board_width == 0 || self.state_size % self.board_width != 0 {
            return Err(ProtocolError::ShapeMismatch {
                field: "board_width",
                expected: self.state_size,
                actual: self.board_width,
            });
        }
        if self.village_cells.len() != self.nb_villages {
            return Err(ProtocolError::ShapeMismatch {
                field: "village_cells",
                expected: self.nb_villages,
                actual: self.village_cells.len(),
            });
        }
        for (village, cell) in self.village_cells.iter().enumerate() {
            if *cell >= self.state_size || self.village_cells[..village].contains(cell) {
                return Err(ProtocolError::ShapeMismatch {
                    field: "village_cells",
                    expected: self.state_size,
                    actual: *cell,
                });
            }
        }
        Ok(())
    }

    pub fn board_height(&self) -> usize {
        self.state_size / self.board_width
    }

    pub fn village_cell(&self, village: usize) -> Option<usize> {
        self.village_cells.get(village).copied()
    }

    pub fn village_at(&self, cell: usize) -> Option<usize> {
        self.village_cells.iter().position(|c| *c == cell)
    }

    /// Cell index of (x, y), if on the board.
    pub fn cell_index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.board_width || y >= self.board_height() {
            return None;
        }
        Some(y * self.board_width + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_config() {
        let config = ProtocolConfig::standard().unwrap();
        assert_eq!(config.state_size, 100);
        assert_eq!(config.nb_villages, 8);
        assert_eq!(config.nb_actions, 10);
        assert_eq!(config.board_height(), 10);
        assert_eq!(config.village_cell(2), Some(33));
        assert_eq!(config.village_at(33), Some(2));
        assert_eq!(config.village_at(0), None);
        assert_eq!(config.cell_index(3, 4), Some(43));
        assert_eq!(config.cell_index(10, 0), None);
        assert_eq!(config.cell_index(-1, 0), None);
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let mut config = ProtocolConfig::standard().unwrap();
        config.village_cells[1] = config.village_cells[0];
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::standard().unwrap();
        config.village_cells.pop();
        assert!(config.validate().is_err());

        let mut config = ProtocolConfig::standard().unwrap();
        config.board_width = 7;
        assert!(config.validate().is_err());
    }
}
