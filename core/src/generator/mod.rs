use crate::*;
pub use fixed::*;
pub use random::*;

mod fixed;
mod random;

/// Chooses which cells receive a mine when the grid is lazily initialized.
pub trait MinePlacer {
    /// Returns up to `count` distinct coordinates taken from `candidates`.
    fn place(&mut self, candidates: &[Coord2], count: usize) -> Vec<Coord2>;
}
