use super::*;

/// Deterministic layout, used for replays and tests.
///
/// Coordinates that are not candidates (e.g. the first revealed cell) are skipped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FixedPlacer {
    mines: Vec<Coord2>,
}

impl FixedPlacer {
    pub fn new(mines: impl IntoIterator<Item = Coord2>) -> Self {
        Self {
            mines: mines.into_iter().collect(),
        }
    }
}

impl MinePlacer for FixedPlacer {
    fn place(&mut self, candidates: &[Coord2], count: usize) -> Vec<Coord2> {
        let mut placed: Vec<Coord2> = Vec::with_capacity(count.min(self.mines.len()));

        for &coords in &self.mines {
            if placed.len() == count {
                log::warn!(
                    "Fixed layout has more mines than fit, dropping the rest after {}",
                    count
                );
                break;
            }
            if !candidates.contains(&coords) {
                log::warn!("Fixed mine at {:?} is not placeable, skipped", coords);
                continue;
            }
            if !placed.contains(&coords) {
                placed.push(coords);
            }
        }

        placed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_non_candidates_and_duplicates() {
        let mut placer = FixedPlacer::new([(0, 0), (1, 1), (0, 0), (2, 2)]);

        let mines = placer.place(&[(0, 0), (2, 2), (3, 3)], 5);

        assert_eq!(mines, vec![(0, 0), (2, 2)]);
    }

    #[test]
    fn truncates_to_count() {
        let mut placer = FixedPlacer::new([(0, 0), (1, 0), (2, 0)]);

        let mines = placer.place(&[(0, 0), (1, 0), (2, 0)], 2);

        assert_eq!(mines, vec![(0, 0), (1, 0)]);
    }
}
