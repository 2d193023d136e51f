use crate::arena::Arena;
use crate::constants::SPAWN_SAMPLE_ATTEMPTS;
use crate::rng::Rng;
use crate::types::Cell;

/// Picks uniformly random free cells for food and obstacles.
#[derive(Clone, Debug)]
pub struct Spawner {
    rng: Rng,
    attempts: usize,
}

impl Spawner {
    pub fn new(rng: Rng) -> Self {
        Self {
            rng,
            attempts: SPAWN_SAMPLE_ATTEMPTS,
        }
    }

    pub fn with_attempts(rng: Rng, attempts: usize) -> Self {
        Self { rng, attempts }
    }

    /// Returns a cell for which `excluded` is false, or `None` when every cell
    /// of the arena is excluded.
    ///
    /// Sampling is tried first; when the board is crowded enough that every
    /// probe hits, the free cells are enumerated and one is drawn uniformly.
    pub fn place_free<F>(&mut self, arena: &Arena, excluded: F) -> Option<Cell>
    where
        F: Fn(Cell) -> bool,
    {
        if arena.cell_count() == 0 {
            return None;
        }
        for _ in 0..self.attempts {
            let cell = arena.random_cell(&mut self.rng);
            if !excluded(cell) {
                return Some(cell);
            }
        }

        let free: Vec<Cell> = arena.cells().filter(|cell| !excluded(*cell)).collect();
        if free.is_empty() {
            return None;
        }
        Some(free[self.rng.below(free.len())])
    }
}
