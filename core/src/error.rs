use thiserror::Error;

use crate::{CellCount, Coord};

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Invalid coordinates")]
    InvalidCoords,
    #[error("Playing space must be between 5x5 and 45x45, got {width}x{height}")]
    InvalidSize { width: Coord, height: Coord },
    #[error("Too few mines, need at least two")]
    TooFewMines,
    #[error("Too many mines, requested {mines} but at most {max} leave two blank cells")]
    TooManyMines { mines: CellCount, max: CellCount },
}

pub type Result<T> = std::result::Result<T, GameError>;
