use crate::*;

/// Owns the selected difficulty and the grid of the game in progress.
///
/// A grid lives for exactly one game; resetting discards it, which also
/// releases its timer.
#[derive(Debug)]
pub struct Session {
    level: Level,
    custom: Difficulty,
    seed: Option<u64>,
    games_started: u64,
    grid: Option<Grid>,
    started: Observable<bool>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            level: Level::default(),
            custom: Difficulty::custom_default(),
            seed: None,
            games_started: 0,
            grid: None,
            started: Observable::new(false),
        }
    }

    /// Makes every game reproducible: game `n` is seeded with `seed + n`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn select_level(&mut self, level: Level) {
        log::debug!("Selected level {}", level);
        self.level = level;
    }

    pub fn custom(&self) -> Difficulty {
        self.custom
    }

    /// Updates the custom board, capping its mines to the custom maximum.
    pub fn set_custom(&mut self, custom: Difficulty) {
        self.custom = custom.with_clamped_mines();
    }

    pub fn difficulty(&self) -> Difficulty {
        self.level.preset().unwrap_or(self.custom)
    }

    pub fn is_started(&self) -> bool {
        self.started.value()
    }

    pub fn subscribe_started(&mut self, listener: impl FnMut(&bool) + 'static) -> SubscriptionId {
        self.started.subscribe(listener)
    }

    pub fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }

    pub fn grid_mut(&mut self) -> Option<&mut Grid> {
        self.grid.as_mut()
    }

    /// Starts a new game with the selected difficulty.
    ///
    /// On an invalid difficulty the current game, if any, is left untouched.
    pub fn start(&mut self) -> Result<&mut Grid> {
        let difficulty = self.difficulty().validate().inspect_err(|err| {
            log::warn!("Refusing to start {}: {}", self.level, err);
        })?;

        let mut grid = match self.seed {
            Some(seed) => Grid::with_seed(difficulty, seed.wrapping_add(self.games_started)),
            None => Grid::new(difficulty),
        };
        grid.subscribe_game_over(|result| match result {
            GameResult::Won => log::info!("Congratulations!"),
            GameResult::Lost => log::info!("Game over!"),
        });

        self.games_started += 1;
        log::info!("Started a new game! Difficulty: {}", self.level);
        self.started.set(true);
        Ok(self.grid.insert(grid))
    }

    /// Discards the current game and starts over with the same settings.
    pub fn reset(&mut self) -> Result<&mut Grid> {
        self.grid = None;
        self.start()
    }

    /// Discards the current game and returns to difficulty selection.
    pub fn hard_reset(&mut self) {
        self.grid = None;
        self.started.set(false);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    fn mine_layout(grid: &Grid) -> Vec<Coord2> {
        grid.cells()
            .filter(|cell| cell.is_mine())
            .map(Cell::coords)
            .collect()
    }

    #[test]
    fn start_uses_selected_preset() {
        let mut session = Session::new();
        session.select_level(Level::Expert);

        let grid = session.start().unwrap();

        assert_eq!(grid.difficulty(), Difficulty::expert());
        assert_eq!(grid.status(), GridStatus::Unplaced);
        assert!(session.is_started());
    }

    #[test]
    fn invalid_custom_difficulty_is_rejected() {
        let mut session = Session::new();
        session.select_level(Level::Custom);
        session.set_custom(Difficulty::new(50, 10, 20));

        assert_eq!(
            session.start().err(),
            Some(GameError::InvalidSize {
                width: 50,
                height: 10
            })
        );
        assert!(session.grid().is_none());
        assert!(!session.is_started());
    }

    #[test]
    fn custom_mines_are_capped() {
        let mut session = Session::new();
        session.set_custom(Difficulty::new(10, 10, 99));

        assert_eq!(session.custom().mines, 95);
    }

    #[test]
    fn reset_replaces_grid() {
        let mut session = Session::new().with_seed(3);
        session.start().unwrap().reveal((4, 4)).unwrap();
        assert!(session.grid().unwrap().is_timer_running());

        let grid = session.reset().unwrap();

        assert_eq!(grid.status(), GridStatus::Unplaced);
        assert_eq!(grid.revealed_count(), 0);
        assert!(!grid.is_timer_running());
    }

    #[test]
    fn hard_reset_clears_started() {
        let changes = Rc::new(std::cell::RefCell::new(Vec::new()));
        let mut session = Session::new();
        let sink = Rc::clone(&changes);
        session.subscribe_started(move |started| sink.borrow_mut().push(*started));

        session.start().unwrap();
        session.hard_reset();

        assert!(session.grid().is_none());
        assert!(!session.is_started());
        assert_eq!(*changes.borrow(), vec![true, false]);
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let mut first = Session::new().with_seed(42);
        let mut second = Session::new().with_seed(42);

        first.start().unwrap().reveal((0, 0)).unwrap();
        second.start().unwrap().reveal((0, 0)).unwrap();

        let first_layout = mine_layout(first.grid().unwrap());
        assert_eq!(first_layout.len(), 10);
        assert_eq!(first_layout, mine_layout(second.grid().unwrap()));
    }
}
