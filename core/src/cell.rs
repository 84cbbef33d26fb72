use serde::{Deserialize, Serialize};

use crate::*;

/// One grid position.
///
/// Never flagged and revealed at the same time. The adjacency count is written
/// once, when the grid places its mines.
#[derive(Debug)]
pub struct Cell {
    coords: Coord2,
    is_mine: bool,
    is_flagged: Observable<bool>,
    is_revealed: Observable<bool>,
    adjacent: Observable<u8>,
}

impl Cell {
    pub(crate) fn new(coords: Coord2) -> Self {
        Self {
            coords,
            is_mine: false,
            is_flagged: Observable::new(false),
            is_revealed: Observable::new(false),
            adjacent: Observable::new(0),
        }
    }

    pub fn coords(&self) -> Coord2 {
        self.coords
    }

    pub fn is_mine(&self) -> bool {
        self.is_mine
    }

    pub fn is_flagged(&self) -> bool {
        self.is_flagged.value()
    }

    pub fn is_revealed(&self) -> bool {
        self.is_revealed.value()
    }

    pub fn adjacent_mines(&self) -> u8 {
        self.adjacent.value()
    }

    pub fn state(&self) -> CellState {
        CellState {
            is_mine: self.is_mine,
            is_flagged: self.is_flagged(),
            is_revealed: self.is_revealed(),
            adjacent_mines: self.adjacent_mines(),
        }
    }

    pub(crate) fn set_mine(&mut self) {
        self.is_mine = true;
    }

    pub(crate) fn set_adjacent(&mut self, count: u8) {
        self.adjacent.set(count);
    }

    pub(crate) fn set_revealed(&mut self) -> bool {
        self.is_revealed.set(true)
    }

    pub(crate) fn set_flagged(&mut self, flagged: bool) -> bool {
        self.is_flagged.set(flagged)
    }
}

/// Plain copy of a cell's observable state.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellState {
    pub is_mine: bool,
    pub is_flagged: bool,
    pub is_revealed: bool,
    pub adjacent_mines: u8,
}

/// A cell together with the grid that owns it.
///
/// Actions are gated on the grid's game-over state; every effect that reaches
/// beyond this cell goes through a grid operation.
pub struct CellMut<'a> {
    grid: &'a mut Grid,
    coords: Coord2,
}

impl<'a> CellMut<'a> {
    pub(crate) fn new(grid: &'a mut Grid, coords: Coord2) -> Self {
        Self { grid, coords }
    }

    pub fn cell(&self) -> &Cell {
        self.grid.cell_at(self.coords)
    }

    pub fn reveal(self) -> RevealOutcome {
        let cell = self.cell();
        if self.grid.is_game_over() || cell.is_revealed() || cell.is_flagged() {
            return RevealOutcome::NoChange;
        }
        let is_mine = cell.is_mine();

        self.grid.set_mouse_down(false);

        if is_mine {
            log::debug!("Mine hit at {:?}", self.coords);
            self.grid.reveal_mines();
            return RevealOutcome::HitMine;
        }

        self.grid.cell_at_mut(self.coords).set_revealed();
        // may place the mines, so the adjacency count is read afterwards
        self.grid.increment_revealed();

        if self.grid.cell_at(self.coords).adjacent_mines() == 0 {
            self.grid.reveal_adjacent_cells(self.coords);
        }

        if self.grid.won_game() {
            RevealOutcome::Won
        } else {
            RevealOutcome::Revealed
        }
    }

    pub fn flag(self) -> FlagOutcome {
        let cell = self.cell();
        if self.grid.is_game_over() || cell.is_revealed() {
            return FlagOutcome::NoChange;
        }
        let was_flagged = cell.is_flagged();

        self.grid.set_mouse_down(false);

        if was_flagged {
            self.grid.remove_flag();
        } else {
            self.grid.use_flag();
        }
        self.grid.cell_at_mut(self.coords).set_flagged(!was_flagged);

        if was_flagged {
            FlagOutcome::Unflagged
        } else {
            FlagOutcome::Flagged
        }
    }

    /// Pointer held down on (or released from) this cell, presentation only.
    pub fn set_mouse_held(self, held: bool) {
        let cell = self.cell();
        let pressable = !cell.is_revealed() && !cell.is_flagged();
        self.grid.set_mouse_down(held && pressable);
    }

    pub fn subscribe_revealed(
        &mut self,
        listener: impl FnMut(&bool) + 'static,
    ) -> SubscriptionId {
        self.grid
            .cell_at_mut(self.coords)
            .is_revealed
            .subscribe(listener)
    }

    pub fn subscribe_flagged(&mut self, listener: impl FnMut(&bool) + 'static) -> SubscriptionId {
        self.grid
            .cell_at_mut(self.coords)
            .is_flagged
            .subscribe(listener)
    }

    pub fn subscribe_adjacent(&mut self, listener: impl FnMut(&u8) + 'static) -> SubscriptionId {
        self.grid
            .cell_at_mut(self.coords)
            .adjacent
            .subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let cell = self.grid.cell_at_mut(self.coords);
        cell.is_revealed.unsubscribe(id)
            || cell.is_flagged.unsubscribe(id)
            || cell.adjacent.unsubscribe(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn grid(mines: &[Coord2]) -> Grid {
        Grid::with_placer(Difficulty::new(5, 5, 2), FixedPlacer::new(mines.to_vec()))
    }

    #[test]
    fn reveal_twice_is_a_no_op() {
        let mut grid = grid(&[(0, 0), (4, 4)]);

        assert_eq!(grid.reveal((1, 1)), Ok(RevealOutcome::Revealed));
        let revealed = grid.revealed_count();

        assert_eq!(grid.reveal((1, 1)), Ok(RevealOutcome::NoChange));
        assert_eq!(grid.revealed_count(), revealed);
    }

    #[test]
    fn flag_after_reveal_is_a_no_op() {
        let mut grid = grid(&[(0, 0), (4, 4)]);
        grid.reveal((1, 1)).unwrap();

        assert_eq!(grid.flag((1, 1)), Ok(FlagOutcome::NoChange));
        assert!(!grid.cell((1, 1)).unwrap().is_flagged());
        assert_eq!(grid.used_flags(), 0);
    }

    #[test]
    fn flagged_cell_cannot_be_revealed() {
        let mut grid = grid(&[(0, 0), (4, 4)]);

        assert_eq!(grid.flag((1, 1)), Ok(FlagOutcome::Flagged));
        assert_eq!(grid.reveal((1, 1)), Ok(RevealOutcome::NoChange));
        assert!(!grid.cell((1, 1)).unwrap().is_revealed());
        assert!(!grid.is_initialized());
    }

    #[test]
    fn flag_roundtrip_restores_counter() {
        let mut grid = grid(&[(0, 0), (4, 4)]);
        grid.reveal((1, 1)).unwrap();
        let before = grid.used_flags();

        assert_eq!(grid.flag((3, 3)), Ok(FlagOutcome::Flagged));
        assert_eq!(grid.used_flags(), before + 1);
        assert_eq!(grid.flag((3, 3)), Ok(FlagOutcome::Unflagged));

        assert_eq!(grid.used_flags(), before);
        assert!(!grid.cell((3, 3)).unwrap().is_flagged());
    }

    #[test]
    fn flag_outcome_stops_propagation_only_when_handled() {
        let mut grid = grid(&[(0, 0), (4, 4)]);

        assert!(grid.flag((2, 2)).unwrap().stops_propagation());
        grid.reveal((1, 1)).unwrap();
        assert!(!grid.flag((1, 1)).unwrap().stops_propagation());
    }

    #[test]
    fn mouse_held_only_on_pressable_cells() {
        let mut grid = grid(&[(0, 0), (4, 4)]);

        grid.set_mouse_held((2, 2), true).unwrap();
        assert!(grid.mouse_down());
        grid.set_mouse_held((2, 2), false).unwrap();
        assert!(!grid.mouse_down());

        grid.flag((3, 3)).unwrap();
        grid.set_mouse_held((3, 3), true).unwrap();
        assert!(!grid.mouse_down());
    }

    #[test]
    fn reveal_releases_mouse() {
        let mut grid = grid(&[(0, 0), (4, 4)]);

        grid.set_mouse_held((1, 1), true).unwrap();
        grid.reveal((1, 1)).unwrap();

        assert!(!grid.mouse_down());
    }

    #[test]
    fn cell_subscriptions_fire_on_change() {
        let events = Rc::new(RefCell::new(Vec::new()));
        let mut grid = grid(&[(0, 0), (4, 4)]);

        {
            let mut cell = grid.cell_mut((1, 1)).unwrap();
            let revealed = Rc::clone(&events);
            cell.subscribe_revealed(move |value| revealed.borrow_mut().push(("revealed", *value)));
            let adjacent = Rc::clone(&events);
            cell.subscribe_adjacent(move |value| {
                adjacent.borrow_mut().push(("adjacent", *value != 0))
            });
        }

        grid.reveal((1, 1)).unwrap();

        assert_eq!(
            *events.borrow(),
            vec![("revealed", true), ("adjacent", true)]
        );
    }

    #[test]
    fn unsubscribe_through_handle() {
        let calls = Rc::new(RefCell::new(0));
        let mut grid = grid(&[(0, 0), (4, 4)]);

        let mut cell = grid.cell_mut((2, 2)).unwrap();
        let counter = Rc::clone(&calls);
        let id = cell.subscribe_flagged(move |_| *counter.borrow_mut() += 1);
        assert!(cell.unsubscribe(id));

        grid.flag((2, 2)).unwrap();

        assert_eq!(*calls.borrow(), 0);
    }
}
