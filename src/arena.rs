use std::collections::HashMap;

use crate::rng::Rng;
use crate::types::{Cell, GameConfig};

/// Bounded grid the run plays out on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Arena {
    pub width: i32,
    pub height: i32,
    pub cell_size: u32,
}

impl Arena {
    pub fn new(width: i32, height: i32, cell_size: u32) -> Self {
        Self {
            width: width.max(0),
            height: height.max(0),
            cell_size,
        }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(config.grid_width, config.grid_height, config.cell_size)
    }

    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.x < self.width && cell.y >= 0 && cell.y < self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn center(&self) -> Cell {
        Cell::new(self.width / 2, self.height / 2)
    }

    /// Uniform over every cell; occupancy is the spawner's concern.
    pub fn random_cell(&self, rng: &mut Rng) -> Cell {
        Cell::new(rng.int(0, self.width - 1), rng.int(0, self.height - 1))
    }

    /// Row-major iteration over all cells.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Cell::new(x, y)))
    }

    /// Top-left pixel of a cell.
    pub fn cell_origin_px(&self, cell: Cell) -> (i64, i64) {
        let size = self.cell_size as i64;
        (cell.x as i64 * size, cell.y as i64 * size)
    }

    pub fn cell_at_px(&self, x_px: i64, y_px: i64) -> Option<Cell> {
        if self.cell_size == 0 || x_px < 0 || y_px < 0 {
            return None;
        }
        let size = self.cell_size as i64;
        let cell = Cell::new((x_px / size) as i32, (y_px / size) as i32);
        self.in_bounds(cell).then_some(cell)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Occupant {
    Snake,
    Obstacle,
}

/// Cells blocked by the snake body or an obstacle. The two never overlap:
/// an obstacle is removed in the same tick the head enters its cell.
#[derive(Clone, Debug, Default)]
pub struct Occupancy {
    cells: HashMap<Cell, Occupant>,
}

impl Occupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cell: Cell) -> Option<Occupant> {
        self.cells.get(&cell).copied()
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.cells.contains_key(&cell)
    }

    pub fn is_snake(&self, cell: Cell) -> bool {
        self.get(cell) == Some(Occupant::Snake)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.get(cell) == Some(Occupant::Obstacle)
    }

    pub fn insert(&mut self, cell: Cell, occupant: Occupant) -> Option<Occupant> {
        self.cells.insert(cell, occupant)
    }

    pub fn remove(&mut self, cell: Cell) -> Option<Occupant> {
        self.cells.remove(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn count(&self, occupant: Occupant) -> usize {
        self.cells.values().filter(|value| **value == occupant).count()
    }
}
