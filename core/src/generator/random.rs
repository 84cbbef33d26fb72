use rand::prelude::*;

use super::*;

/// Uniform placement without replacement, reproducible from its seed.
#[derive(Clone, Debug)]
pub struct RandomPlacer {
    seed: u64,
    rng: SmallRng,
}

impl RandomPlacer {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl MinePlacer for RandomPlacer {
    fn place(&mut self, candidates: &[Coord2], count: usize) -> Vec<Coord2> {
        let mut pool = candidates.to_vec();
        let count = count.min(pool.len());

        // partial Fisher-Yates, the first `count` slots end up uniformly sampled
        for i in 0..count {
            let pick = self.rng.random_range(i..pool.len());
            pool.swap(i, pick);
        }

        pool.truncate(count);
        pool
    }
}
