use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{
    CELL_SIZE_PX, FOOD_REWARD, GRID_HEIGHT, GRID_WIDTH, OBSTACLE_INTERVAL_MS, OBSTACLE_PENALTY,
    TICK_RATE,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// Candidate order used by the pilot; earlier entries win ties.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A pilot's verdict for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steer {
    /// Keep the current heading.
    Continue,
    Turn(Direction),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Terminated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    Wall,
    SelfCollision,
    /// No free cell was left for the food.
    ArenaFull,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    #[serde(rename = "gridWidth", alias = "grid_width")]
    pub grid_width: i32,
    #[serde(rename = "gridHeight", alias = "grid_height")]
    pub grid_height: i32,
    /// Pixels per cell. Only the renderer cares.
    #[serde(rename = "cellSize", alias = "cell_size")]
    pub cell_size: u32,
    #[serde(rename = "tickRate", alias = "tick_rate")]
    pub tick_rate: u32,
    #[serde(rename = "obstacleIntervalMs", alias = "obstacle_interval_ms")]
    pub obstacle_interval_ms: u64,
    #[serde(rename = "foodReward", alias = "food_reward")]
    pub food_reward: u32,
    #[serde(rename = "obstaclePenalty", alias = "obstacle_penalty")]
    pub obstacle_penalty: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            grid_width: GRID_WIDTH,
            grid_height: GRID_HEIGHT,
            cell_size: CELL_SIZE_PX,
            tick_rate: TICK_RATE,
            obstacle_interval_ms: OBSTACLE_INTERVAL_MS,
            food_reward: FOOD_REWARD,
            obstacle_penalty: OBSTACLE_PENALTY,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("grid must be at least 1x1, got {width}x{height}")]
    EmptyGrid { width: i32, height: i32 },
    #[error("cell size must be positive")]
    ZeroCellSize,
    #[error("tick rate must be positive")]
    ZeroTickRate,
    #[error("screen {width_px}x{height_px} is smaller than one {cell_size}px cell")]
    ScreenTooSmall {
        width_px: u32,
        height_px: u32,
        cell_size: u32,
    },
}

impl GameConfig {
    pub fn new(grid_width: i32, grid_height: i32) -> Self {
        Self {
            grid_width,
            grid_height,
            ..Default::default()
        }
    }

    /// Derives the grid from a pixel screen, dropping any partial cell.
    pub fn from_screen(width_px: u32, height_px: u32, cell_size: u32) -> Result<Self, ConfigError> {
        if cell_size == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        let config = Self {
            grid_width: (width_px / cell_size) as i32,
            grid_height: (height_px / cell_size) as i32,
            cell_size,
            ..Default::default()
        };
        if config.grid_width < 1 || config.grid_height < 1 {
            return Err(ConfigError::ScreenTooSmall {
                width_px,
                height_px,
                cell_size,
            });
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.grid_width < 1 || self.grid_height < 1 {
            return Err(ConfigError::EmptyGrid {
                width: self.grid_width,
                height: self.grid_height,
            });
        }
        if self.cell_size == 0 {
            return Err(ConfigError::ZeroCellSize);
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    FoodEaten {
        cell: Cell,
        score: u32,
    },
    ObstacleSpawned {
        cell: Cell,
    },
    ObstacleHit {
        cell: Cell,
        score: u32,
    },
    NewHighScore {
        score: u32,
        persisted: bool,
    },
    Terminated {
        reason: TerminationReason,
    },
}

/// Read-only view handed to the renderer once per tick.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub state: RunState,
    pub snake: Vec<Cell>,
    pub food: Option<Cell>,
    pub obstacles: Vec<Cell>,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub seed: u32,
    pub ticks: u64,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub score: u32,
    #[serde(rename = "highScore")]
    pub high_score: u32,
    #[serde(rename = "foodEaten")]
    pub food_eaten: u32,
    #[serde(rename = "obstaclesHit")]
    pub obstacles_hit: u32,
    #[serde(rename = "obstaclesSpawned")]
    pub obstacles_spawned: u32,
    #[serde(rename = "maxLength")]
    pub max_length: usize,
    pub reason: Option<TerminationReason>,
}
