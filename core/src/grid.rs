use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::*;

/// Lifecycle of a grid: `Unplaced -> Active -> Won | Lost`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridStatus {
    /// Cells exist but mines have not been placed yet
    Unplaced,
    /// Mines are placed and the clock is running
    Active,
    Won,
    Lost,
}

impl GridStatus {
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

/// A single game: owns every cell and all global counters.
///
/// Mines are placed on the first reveal, never at construction, so the first
/// revealed cell is always safe.
pub struct Grid {
    difficulty: Difficulty,
    cells: Array2<Cell>,
    placer: Box<dyn MinePlacer>,
    timer_driver: Box<dyn TimerDriver>,
    timer: Option<TimerLease>,
    placed_mines: CellCount,
    total_revealed: CellCount,
    initialized: bool,
    used_flags: Observable<CellCount>,
    seconds_played: Observable<u32>,
    mouse_down: Observable<bool>,
    result: Observable<Option<GameResult>>,
    time_string: Memo<String>,
}

impl Grid {
    /// Creates a grid with an entropy-seeded [`RandomPlacer`].
    pub fn new(difficulty: Difficulty) -> Self {
        Self::with_placer(difficulty, RandomPlacer::from_entropy())
    }

    pub fn with_seed(difficulty: Difficulty, seed: u64) -> Self {
        Self::with_placer(difficulty, RandomPlacer::new(seed))
    }

    pub fn with_placer(difficulty: Difficulty, placer: impl MinePlacer + 'static) -> Self {
        let Difficulty { width, height, .. } = difficulty;
        let cells = Array2::from_shape_fn((usize::from(height), usize::from(width)), |(y, x)| {
            // both fit in `Coord` since the shape came from `Coord`s
            Cell::new((x as Coord, y as Coord))
        });
        log::debug!("New grid: {}", difficulty);

        Self {
            difficulty,
            cells,
            placer: Box::new(placer),
            timer_driver: Box::new(ManualTimer),
            timer: None,
            placed_mines: 0,
            total_revealed: 0,
            initialized: false,
            used_flags: Observable::new(0),
            seconds_played: Observable::new(0),
            mouse_down: Observable::new(false),
            result: Observable::new(None),
            time_string: Memo::new(),
        }
    }

    /// Replaces the clock source, must be set before the first reveal to take effect.
    pub fn with_timer_driver(mut self, driver: impl TimerDriver + 'static) -> Self {
        self.timer_driver = Box::new(driver);
        self
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn size(&self) -> Coord2 {
        self.difficulty.size()
    }

    pub fn total_cells(&self) -> CellCount {
        self.cells.len().try_into().unwrap_or(CellCount::MAX)
    }

    pub fn validate_coords(&self, coords: Coord2) -> Result<Coord2> {
        let (width, height) = self.size();
        if coords.0 < width && coords.1 < height {
            Ok(coords)
        } else {
            Err(GameError::InvalidCoords)
        }
    }

    pub fn cell(&self, coords: Coord2) -> Result<&Cell> {
        let coords = self.validate_coords(coords)?;
        Ok(self.cell_at(coords))
    }

    pub fn cell_mut(&mut self, coords: Coord2) -> Result<CellMut<'_>> {
        let coords = self.validate_coords(coords)?;
        Ok(CellMut::new(self, coords))
    }

    pub fn reveal(&mut self, coords: Coord2) -> Result<RevealOutcome> {
        Ok(self.cell_mut(coords)?.reveal())
    }

    pub fn flag(&mut self, coords: Coord2) -> Result<FlagOutcome> {
        Ok(self.cell_mut(coords)?.flag())
    }

    pub fn set_mouse_held(&mut self, coords: Coord2, held: bool) -> Result<()> {
        self.cell_mut(coords)?.set_mouse_held(held);
        Ok(())
    }

    /// Cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    /// One view per row, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = ArrayView1<'_, Cell>> {
        self.cells.rows().into_iter()
    }

    pub fn status(&self) -> GridStatus {
        match self.result.value() {
            Some(GameResult::Won) => GridStatus::Won,
            Some(GameResult::Lost) => GridStatus::Lost,
            None if self.initialized => GridStatus::Active,
            None => GridStatus::Unplaced,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_game_over(&self) -> bool {
        self.result.value().is_some()
    }

    pub fn won_game(&self) -> bool {
        self.result.value() == Some(GameResult::Won)
    }

    pub fn result(&self) -> Option<GameResult> {
        self.result.value()
    }

    /// Number of mines actually placed, zero before the first reveal.
    pub fn mine_count(&self) -> CellCount {
        self.placed_mines
    }

    pub fn revealed_count(&self) -> CellCount {
        self.total_revealed
    }

    pub fn used_flags(&self) -> CellCount {
        self.used_flags.value()
    }

    /// Requested mines minus placed flags, negative when over-flagged.
    pub fn flags_remaining(&self) -> isize {
        (self.difficulty.mines as isize) - (self.used_flags.value() as isize)
    }

    pub fn seconds_played(&self) -> u32 {
        self.seconds_played.value()
    }

    pub fn time_string(&self) -> String {
        self.time_string
            .get_or_compute(self.seconds_played.version(), || {
                format_clock(self.seconds_played.value())
            })
    }

    pub fn mouse_down(&self) -> bool {
        self.mouse_down.value()
    }

    pub fn is_timer_running(&self) -> bool {
        self.timer.is_some()
    }

    pub fn timer_started_at(&self) -> Option<Instant> {
        self.timer.as_ref().map(TimerLease::started_at)
    }

    /// One clock tick from the host, ignored unless the timer is running.
    pub fn tick(&mut self) {
        if self.timer.is_some() {
            self.seconds_played.update(|seconds| seconds.saturating_add(1));
        }
    }

    /// Catches the clock up to the wall time `now`; never moves it backwards.
    pub fn poll_timer(&mut self, now: Instant) {
        let Some(timer) = &self.timer else {
            return;
        };
        let elapsed = timer.elapsed_secs_at(now);
        if elapsed > self.seconds_played.value() {
            self.seconds_played.set(elapsed);
        }
    }

    pub fn subscribe_used_flags(
        &mut self,
        listener: impl FnMut(&CellCount) + 'static,
    ) -> SubscriptionId {
        self.used_flags.subscribe(listener)
    }

    pub fn subscribe_seconds_played(&mut self, listener: impl FnMut(&u32) + 'static) -> SubscriptionId {
        self.seconds_played.subscribe(listener)
    }

    pub fn subscribe_mouse_down(&mut self, listener: impl FnMut(&bool) + 'static) -> SubscriptionId {
        self.mouse_down.subscribe(listener)
    }

    /// Called once, with the final result, when the game ends.
    pub fn subscribe_game_over(
        &mut self,
        mut listener: impl FnMut(GameResult) + 'static,
    ) -> SubscriptionId {
        self.result.subscribe(move |result| {
            if let Some(result) = *result {
                listener(result);
            }
        })
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.used_flags.unsubscribe(id)
            || self.seconds_played.unsubscribe(id)
            || self.mouse_down.unsubscribe(id)
            || self.result.unsubscribe(id)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            width: self.difficulty.width,
            height: self.difficulty.height,
            cells: self.cells.iter().map(Cell::state).collect(),
            used_flags: self.used_flags(),
            flags_remaining: self.flags_remaining(),
            seconds_played: self.seconds_played(),
            time: self.time_string(),
            status: self.status(),
            mouse_down: self.mouse_down(),
        }
    }

    pub(crate) fn cell_at(&self, coords: Coord2) -> &Cell {
        &self.cells[coords.to_nd_index()]
    }

    pub(crate) fn cell_at_mut(&mut self, coords: Coord2) -> &mut Cell {
        &mut self.cells[coords.to_nd_index()]
    }

    pub(crate) fn set_mouse_down(&mut self, down: bool) {
        self.mouse_down.set(down);
    }

    pub(crate) fn use_flag(&mut self) {
        self.used_flags.update(|flags| flags.saturating_add(1));
    }

    pub(crate) fn remove_flag(&mut self) {
        self.used_flags.update(|flags| flags.saturating_sub(1));
    }

    fn neighbors(&self, coords: Coord2) -> NeighborIter {
        NeighborIter::new(coords, self.size())
    }

    /// Safe cells that must be revealed to win.
    fn safe_cell_target(&self) -> CellCount {
        let mines = if self.initialized {
            self.placed_mines
        } else {
            self.difficulty.mines
        };
        self.total_cells().saturating_sub(mines)
    }

    /// Counts one newly revealed cell; may end the game as a win and lazily
    /// initializes the grid on the very first reveal.
    pub(crate) fn increment_revealed(&mut self) {
        self.total_revealed += 1;

        if self.total_revealed == self.safe_cell_target() {
            self.auto_flag();
            self.game_over(true);
        }

        if !self.initialized {
            self.init();
        }
    }

    /// Places the mines, computes adjacency, then starts the clock.
    fn init(&mut self) {
        self.assign_mines();
        self.compute_adjacencies();
        self.initialized = true;

        if !self.is_game_over() {
            self.timer = Some(self.timer_driver.start(TICK_PERIOD));
            log::debug!("Timer started");
        }
    }

    fn assign_mines(&mut self) {
        let candidates: Vec<Coord2> = self
            .cells
            .iter()
            .filter(|cell| !cell.is_revealed())
            .map(Cell::coords)
            .collect();
        let requested = usize::from(self.difficulty.mines);
        let count = requested.min(candidates.len().saturating_sub(2));
        if count < requested {
            log::warn!(
                "Cannot fit {} mines while keeping two cells safe, placing {}",
                requested,
                count
            );
        }

        for coords in self.placer.place(&candidates, count) {
            let cell = self.cell_at_mut(coords);
            if !cell.is_mine() {
                cell.set_mine();
                self.placed_mines += 1;
            }
        }

        if usize::from(self.placed_mines) != count {
            log::warn!(
                "Placed mine count mismatch, actual: {}, requested: {}",
                self.placed_mines,
                count
            );
        }
        log::debug!("Placed {} mines", self.placed_mines);
    }

    fn compute_adjacencies(&mut self) {
        let (width, height) = self.size();
        for y in 0..height {
            for x in 0..width {
                let count = self
                    .neighbors((x, y))
                    .filter(|&pos| self.cell_at(pos).is_mine())
                    .count();
                // at most eight neighbors
                self.cell_at_mut((x, y)).set_adjacent(count as u8);
            }
        }
    }

    /// Reveals the connected zero-adjacency region around `start` and its
    /// numbered border. Each cell is visited at most once.
    pub(crate) fn reveal_adjacent_cells(&mut self, start: Coord2) {
        let mut visited: Array2<bool> = Array2::default(self.cells.dim());
        visited[start.to_nd_index()] = true;
        let mut to_visit = vec![start];
        log::trace!("Starting flood-fill from {:?}", start);

        while let Some(current) = to_visit.pop() {
            for next in self.neighbors(current) {
                if visited[next.to_nd_index()] {
                    continue;
                }
                visited[next.to_nd_index()] = true;

                let cell = self.cell_at(next);
                if cell.is_mine() {
                    continue;
                }
                if cell.adjacent_mines() == 0 {
                    to_visit.push(next);
                }
                if !cell.is_revealed() {
                    self.reveal_in_flood(next);
                }
            }
        }
    }

    fn reveal_in_flood(&mut self, coords: Coord2) {
        let cell = self.cell_at_mut(coords);
        let was_flagged = cell.set_flagged(false);
        cell.set_revealed();
        if was_flagged {
            self.remove_flag();
        }
        log::trace!("Flood revealed {:?}", coords);
        self.increment_revealed();
    }

    /// Flags every mine not flagged yet, used when the game is won.
    fn auto_flag(&mut self) {
        let mut flagged = 0;
        for cell in self.cells.iter_mut() {
            if cell.is_mine() && cell.set_flagged(true) {
                flagged += 1;
            }
        }
        for _ in 0..flagged {
            self.use_flag();
        }
    }

    /// Shows every mine and ends the game as a loss.
    pub(crate) fn reveal_mines(&mut self) {
        let mut revealed = 0;
        let mut unflagged = 0;
        for cell in self.cells.iter_mut().filter(|cell| cell.is_mine()) {
            if cell.set_flagged(false) {
                unflagged += 1;
            }
            if cell.set_revealed() {
                revealed += 1;
            }
        }
        self.total_revealed = self.total_revealed.saturating_add(revealed);
        for _ in 0..unflagged {
            self.remove_flag();
        }
        self.game_over(false);
    }

    /// Terminal transition; releases the timer lease.
    fn game_over(&mut self, won: bool) {
        if self.is_game_over() {
            return;
        }

        self.timer = None;
        let result = if won {
            GameResult::Won
        } else {
            GameResult::Lost
        };
        log::debug!(
            "Game over: {:?} after {}s, {} revealed",
            result,
            self.seconds_played(),
            self.total_revealed
        );
        self.result.set(Some(result));
    }
}

impl std::fmt::Debug for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Grid")
            .field("difficulty", &self.difficulty)
            .field("status", &self.status())
            .field("placed_mines", &self.placed_mines)
            .field("total_revealed", &self.total_revealed)
            .field("used_flags", &self.used_flags.value())
            .field("seconds_played", &self.seconds_played.value())
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

/// Everything a renderer reads from a grid, in one serializable value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub width: Coord,
    pub height: Coord,
    /// Row-major
    pub cells: Vec<CellState>,
    pub used_flags: CellCount,
    pub flags_remaining: isize,
    pub seconds_played: u32,
    pub time: String,
    pub status: GridStatus,
    pub mouse_down: bool,
}

impl BoardSnapshot {
    pub fn cell(&self, (x, y): Coord2) -> Option<&CellState> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells
            .get(usize::from(y) * usize::from(self.width) + usize::from(x))
    }
}
