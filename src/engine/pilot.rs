use crate::arena::Arena;
use crate::types::{Cell, Direction, Steer};

use super::obstacles::ObstacleRegistry;
use super::snake::Snake;
use super::utils::manhattan;

/// Direction taken when every neighbour is blocked. The engine then detects
/// the collision on the same tick.
pub const STUCK_FALLBACK: Direction = Direction::Right;

/// Everything a pilot may look at when deciding a tick.
#[derive(Clone, Copy, Debug)]
pub struct PilotView<'a> {
    pub arena: &'a Arena,
    pub snake: &'a Snake,
    pub obstacles: &'a ObstacleRegistry,
    pub food: Option<Cell>,
    pub heading: Direction,
}

pub trait Pilot {
    fn steer(&mut self, view: &PilotView<'_>) -> Steer;
}

/// One-step greedy descent on Manhattan distance to the food.
#[derive(Clone, Copy, Debug, Default)]
pub struct GreedyPilot;

impl Pilot for GreedyPilot {
    fn steer(&mut self, view: &PilotView<'_>) -> Steer {
        match view.food {
            Some(food) => Steer::Turn(choose_direction(
                view.snake,
                food,
                view.obstacles,
                view.arena,
            )),
            None => Steer::Continue,
        }
    }
}

/// Directions whose next cell is inside the arena and free of body and
/// obstacles, in `Direction::ALL` order.
pub fn valid_moves(snake: &Snake, obstacles: &ObstacleRegistry, arena: &Arena) -> Vec<Direction> {
    let head = snake.head();
    Direction::ALL
        .into_iter()
        .filter(|dir| {
            let next = head.step(*dir);
            arena.in_bounds(next) && !snake.contains(next) && !obstacles.contains(next)
        })
        .collect()
}

pub fn choose_direction(
    snake: &Snake,
    food: Cell,
    obstacles: &ObstacleRegistry,
    arena: &Arena,
) -> Direction {
    let head = snake.head();
    let mut best: Option<(Direction, i32)> = None;
    for dir in valid_moves(snake, obstacles, arena) {
        let distance = manhattan(head.step(dir), food);
        // strict: the first minimum in enumeration order wins
        if best.is_none_or(|(_, best_distance)| distance < best_distance) {
            best = Some((dir, distance));
        }
    }
    best.map(|(dir, _)| dir).unwrap_or(STUCK_FALLBACK)
}
