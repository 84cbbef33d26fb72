use std::fmt;

use serde::{Deserialize, Serialize};

use crate::*;

pub const MIN_SIDE: Coord = 5;
pub const MAX_SIDE: Coord = 45;
pub const MIN_MINES: CellCount = 2;

/// Board dimensions and the requested number of mines.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Difficulty {
    pub width: Coord,
    pub height: Coord,
    pub mines: CellCount,
}

impl Difficulty {
    pub const fn new(width: Coord, height: Coord, mines: CellCount) -> Self {
        Self {
            width,
            height,
            mines,
        }
    }

    pub const fn beginner() -> Self {
        Self::new(8, 8, 10)
    }

    pub const fn intermediate() -> Self {
        Self::new(16, 16, 40)
    }

    pub const fn expert() -> Self {
        Self::new(30, 16, 99)
    }

    pub const fn custom_default() -> Self {
        Self::new(20, 20, 50)
    }

    pub const fn size(&self) -> Coord2 {
        (self.width, self.height)
    }

    pub const fn total_cells(&self) -> CellCount {
        mult(self.width, self.height)
    }

    /// Caller-side bounds check, [`Grid`] never performs it.
    pub fn validate(&self) -> Result<Self> {
        let side = MIN_SIDE..=MAX_SIDE;
        if !side.contains(&self.width) || !side.contains(&self.height) {
            return Err(GameError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }

        if self.mines < MIN_MINES {
            return Err(GameError::TooFewMines);
        }

        // at least two blank cells besides the mines and the first click
        let max = self.total_cells().saturating_sub(3);
        if self.mines > max {
            return Err(GameError::TooManyMines {
                mines: self.mines,
                max,
            });
        }

        Ok(*self)
    }

    /// Upper bound offered for custom boards: 95% of the cells.
    pub fn max_custom_mines(&self) -> CellCount {
        let max = u32::from(self.total_cells()) * 95 / 100;
        max.try_into().unwrap_or(CellCount::MAX)
    }

    pub fn with_clamped_mines(self) -> Self {
        Self {
            mines: self.mines.min(self.max_custom_mines()),
            ..self
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::beginner()
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{} with {} mines", self.width, self.height, self.mines)
    }
}

/// Named presets plus the player-editable custom board.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Expert,
    Custom,
}

impl Level {
    pub const ALL: [Level; 4] = [
        Level::Beginner,
        Level::Intermediate,
        Level::Expert,
        Level::Custom,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Expert => "Expert",
            Self::Custom => "Custom",
        }
    }

    /// Preset difficulty, `None` for [`Level::Custom`] which is owned by the caller.
    pub const fn preset(self) -> Option<Difficulty> {
        match self {
            Self::Beginner => Some(Difficulty::beginner()),
            Self::Intermediate => Some(Difficulty::intermediate()),
            Self::Expert => Some(Difficulty::expert()),
            Self::Custom => None,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
