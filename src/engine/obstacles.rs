use serde::Serialize;

use crate::types::Cell;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Obstacle {
    pub cell: Cell,
    #[serde(rename = "createdAtMs")]
    pub created_at_ms: u64,
}

/// Active obstacles plus the spawn cadence. Obstacles never age out; they
/// stay until the snake runs into them.
#[derive(Clone, Debug)]
pub struct ObstacleRegistry {
    active: Vec<Obstacle>,
    interval_ms: u64,
    last_spawn_ms: u64,
}

impl ObstacleRegistry {
    pub fn new(interval_ms: u64, started_at_ms: u64) -> Self {
        Self {
            active: Vec::new(),
            interval_ms,
            last_spawn_ms: started_at_ms,
        }
    }

    /// True once a full interval has passed since the last spawn.
    pub fn is_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_spawn_ms) >= self.interval_ms
    }

    pub fn spawn(&mut self, cell: Cell, now_ms: u64) -> Obstacle {
        let obstacle = Obstacle {
            cell,
            created_at_ms: now_ms,
        };
        self.active.push(obstacle);
        self.last_spawn_ms = now_ms;
        obstacle
    }

    /// Restarts the cadence without spawning, used when no cell was free.
    pub fn skip(&mut self, now_ms: u64) {
        self.last_spawn_ms = now_ms;
    }

    pub fn remove_at(&mut self, cell: Cell) -> Option<Obstacle> {
        let idx = self.active.iter().position(|obstacle| obstacle.cell == cell)?;
        Some(self.active.remove(idx))
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.active.iter().any(|obstacle| obstacle.cell == cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.active.iter()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.active.iter().map(|obstacle| obstacle.cell)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}
