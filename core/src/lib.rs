use std::ops::BitOr;

use serde::{Deserialize, Serialize};

pub use cell::*;
pub use difficulty::*;
pub use error::*;
pub use generator::*;
pub use grid::*;
pub use observable::*;
pub use session::*;
pub use timer::*;
pub use types::*;

mod cell;
mod difficulty;
mod error;
mod generator;
mod grid;
mod observable;
mod session;
mod timer;
mod types;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FlagOutcome {
    NoChange,
    Flagged,
    Unflagged,
}

impl FlagOutcome {
    pub const fn has_update(self) -> bool {
        match self {
            Self::NoChange => false,
            Self::Flagged => true,
            Self::Unflagged => true,
        }
    }

    /// Whether the host should swallow the input event that triggered the flag.
    pub const fn stops_propagation(self) -> bool {
        self.has_update()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RevealOutcome {
    NoChange,
    Revealed,
    HitMine,
    Won,
}

impl RevealOutcome {
    pub const fn has_update(self) -> bool {
        use RevealOutcome::*;
        match self {
            NoChange => false,
            Revealed => true,
            HitMine => true,
            Won => true,
        }
    }

    pub const fn is_final(self) -> bool {
        matches!(self, Self::HitMine | Self::Won)
    }
}

/// Merges outcomes of several reveals, the most significant one wins.
impl BitOr for RevealOutcome {
    type Output = RevealOutcome;

    fn bitor(self, rhs: Self) -> Self::Output {
        use RevealOutcome::*;
        match (self, rhs) {
            (HitMine, _) => HitMine,
            (_, HitMine) => HitMine,
            (Won, _) => Won,
            (_, Won) => Won,
            (Revealed, _) => Revealed,
            (_, Revealed) => Revealed,
            (NoChange, NoChange) => NoChange,
        }
    }
}

/// Final result delivered to game-over subscribers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Won,
    Lost,
}

impl GameResult {
    pub const fn is_win(self) -> bool {
        matches!(self, Self::Won)
    }
}
