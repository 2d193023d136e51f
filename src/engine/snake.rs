use std::collections::VecDeque;

use crate::types::Cell;

/// Body cells, head first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snake {
    body: VecDeque<Cell>,
}

impl Snake {
    pub fn new(head: Cell) -> Self {
        Self {
            body: VecDeque::from([head]),
        }
    }

    /// Builds a snake from head-first cells. Returns `None` for an empty or
    /// self-intersecting body.
    pub fn from_cells<I>(cells: I) -> Option<Self>
    where
        I: IntoIterator<Item = Cell>,
    {
        let body: VecDeque<Cell> = cells.into_iter().collect();
        if body.is_empty() {
            return None;
        }
        let mut seen = std::collections::HashSet::with_capacity(body.len());
        if !body.iter().all(|cell| seen.insert(*cell)) {
            return None;
        }
        Some(Self { body })
    }

    pub fn head(&self) -> Cell {
        // The constructors never produce an empty body and advance only grows
        // or keeps the length.
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.body.contains(&cell)
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.body.iter().copied()
    }

    /// Pushes `to` as the new head. Without `grow` the tail is dropped and
    /// returned so the caller can release its cell.
    ///
    /// The caller must have checked that `to` is not part of the body.
    pub fn advance(&mut self, to: Cell, grow: bool) -> Option<Cell> {
        self.body.push_front(to);
        if grow {
            None
        } else {
            self.body.pop_back()
        }
    }
}
