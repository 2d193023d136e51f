use serde_json::json;

use crate::arena::{Arena, Occupancy, Occupant};
use crate::log::{self, Level, LogContext};
use crate::rng::Rng;
use crate::score_store::ScoreStore;
use crate::types::{
    Cell, Direction, GameConfig, RunState, RunSummary, RuntimeEvent, Snapshot, Steer,
    TerminationReason,
};

mod obstacles;
mod pilot;
mod snake;
mod spawn_system;
mod utils;

pub use self::obstacles::{Obstacle, ObstacleRegistry};
pub use self::pilot::{choose_direction, valid_moves, GreedyPilot, Pilot, PilotView, STUCK_FALLBACK};
pub use self::snake::Snake;
pub use self::spawn_system::Spawner;
pub use self::utils::{manhattan, now_ms};

#[derive(Clone, Debug, Default)]
struct RunStats {
    food_eaten: u32,
    obstacles_hit: u32,
    obstacles_spawned: u32,
    max_length: usize,
}

/// One self-playing run. Each `step` is a full tick: steer, collide, move,
/// spawn, persist.
pub struct GameEngine {
    pub config: GameConfig,
    pub arena: Arena,

    seed: u32,
    spawner: Spawner,
    pilot: Box<dyn Pilot + Send>,
    store: ScoreStore,

    snake: Snake,
    occupancy: Occupancy,
    obstacles: ObstacleRegistry,
    food: Option<Cell>,
    heading: Direction,
    score: u32,
    high_score: u32,

    events: Vec<RuntimeEvent>,
    stats: RunStats,
    state: RunState,
    end_reason: Option<TerminationReason>,
    tick_counter: u64,
    elapsed_ms: u64,
}

impl GameEngine {
    pub fn new(config: GameConfig, seed: u32, store: ScoreStore) -> Self {
        Self::with_pilot(config, seed, store, Box::new(GreedyPilot))
    }

    pub fn with_pilot(
        config: GameConfig,
        seed: u32,
        store: ScoreStore,
        pilot: Box<dyn Pilot + Send>,
    ) -> Self {
        let arena = Arena::from_config(&config);
        let snake = Snake::new(arena.center());
        let mut occupancy = Occupancy::new();
        occupancy.insert(snake.head(), Occupant::Snake);
        let obstacles = ObstacleRegistry::new(config.obstacle_interval_ms, 0);
        let high_score = store.best();

        let mut engine = Self {
            config,
            arena,
            seed,
            spawner: Spawner::new(Rng::new(seed)),
            pilot,
            store,
            snake,
            occupancy,
            obstacles,
            food: None,
            heading: Direction::Right,
            score: 0,
            high_score,
            events: Vec::new(),
            stats: RunStats {
                max_length: 1,
                ..RunStats::default()
            },
            state: RunState::Running,
            end_reason: None,
            tick_counter: 0,
            elapsed_ms: 0,
        };
        engine.food = engine.place_food();
        if engine.food.is_none() {
            engine.terminate(TerminationReason::ArenaFull);
        }
        engine
    }

    pub fn is_ended(&self) -> bool {
        self.state == RunState::Terminated
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn end_reason(&self) -> Option<TerminationReason> {
        self.end_reason
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn snake(&self) -> &Snake {
        &self.snake
    }

    pub fn food(&self) -> Option<Cell> {
        self.food
    }

    pub fn obstacles(&self) -> &ObstacleRegistry {
        &self.obstacles
    }

    pub fn heading(&self) -> Direction {
        self.heading
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    pub fn score_store(&self) -> &ScoreStore {
        &self.store
    }

    /// Hands the store back so the next run starts from the same best score.
    pub fn into_score_store(self) -> ScoreStore {
        self.store
    }

    /// Ends the run from outside, e.g. on a quit request. No-op once ended.
    pub fn stop(&mut self) {
        self.terminate(TerminationReason::Quit);
    }

    pub fn step(&mut self, dt_ms: u64) {
        if self.is_ended() {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        let view = PilotView {
            arena: &self.arena,
            snake: &self.snake,
            obstacles: &self.obstacles,
            food: self.food,
            heading: self.heading,
        };
        if let Steer::Turn(dir) = self.pilot.steer(&view) {
            self.heading = dir;
        }

        let candidate = self.snake.head().step(self.heading);
        if !self.arena.in_bounds(candidate) {
            self.terminate(TerminationReason::Wall);
            return;
        }
        if self.occupancy.is_snake(candidate) {
            self.terminate(TerminationReason::SelfCollision);
            return;
        }

        if self.occupancy.is_obstacle(candidate) {
            self.hit_obstacle(candidate);
        }

        let ate = self.food == Some(candidate);
        if let Some(tail) = self.snake.advance(candidate, ate) {
            self.occupancy.remove(tail);
        }
        self.occupancy.insert(candidate, Occupant::Snake);
        self.stats.max_length = self.stats.max_length.max(self.snake.len());

        if ate {
            self.eat_food(candidate);
            if self.is_ended() {
                return;
            }
        }

        self.update_obstacle_cadence();
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            state: self.state,
            snake: self.snake.cells().collect(),
            food: self.food,
            obstacles: self.obstacles.cells().collect(),
            score: self.score,
            high_score: self.high_score,
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> RunSummary {
        RunSummary {
            seed: self.seed,
            ticks: self.tick_counter,
            duration_ms: self.elapsed_ms,
            score: self.score,
            high_score: self.high_score,
            food_eaten: self.stats.food_eaten,
            obstacles_hit: self.stats.obstacles_hit,
            obstacles_spawned: self.stats.obstacles_spawned,
            max_length: self.stats.max_length,
            reason: self.end_reason,
        }
    }

    fn hit_obstacle(&mut self, cell: Cell) {
        if self.obstacles.remove_at(cell).is_none() {
            return;
        }
        self.occupancy.remove(cell);
        self.score = self.score.saturating_sub(self.config.obstacle_penalty);
        self.stats.obstacles_hit += 1;
        self.events.push(RuntimeEvent::ObstacleHit {
            cell,
            score: self.score,
        });
    }

    fn eat_food(&mut self, cell: Cell) {
        self.score = self.score.saturating_add(self.config.food_reward);
        self.stats.food_eaten += 1;
        self.events.push(RuntimeEvent::FoodEaten {
            cell,
            score: self.score,
        });
        if self.score > self.high_score {
            self.commit_high_score();
        }

        self.food = self.place_food();
        if self.food.is_none() {
            self.terminate(TerminationReason::ArenaFull);
        }
    }

    fn commit_high_score(&mut self) {
        self.high_score = self.score;
        let persisted = match self.store.commit_if_greater(self.score) {
            Ok(_) => self.store.file_path().is_some(),
            Err(error) => {
                self.log(
                    Level::Warn,
                    "high_score_write_failed",
                    json!({ "score": self.score, "error": error.to_string() }),
                );
                false
            }
        };
        self.events.push(RuntimeEvent::NewHighScore {
            score: self.score,
            persisted,
        });
    }

    fn update_obstacle_cadence(&mut self) {
        let now_ms = self.elapsed_ms;
        if !self.obstacles.is_due(now_ms) {
            return;
        }
        let food = self.food;
        let occupancy = &self.occupancy;
        let placed = self
            .spawner
            .place_free(&self.arena, |cell| occupancy.is_occupied(cell) || Some(cell) == food);
        match placed {
            Some(cell) => {
                self.obstacles.spawn(cell, now_ms);
                self.occupancy.insert(cell, Occupant::Obstacle);
                self.stats.obstacles_spawned += 1;
                self.events.push(RuntimeEvent::ObstacleSpawned { cell });
            }
            None => {
                self.obstacles.skip(now_ms);
                self.log(
                    Level::Warn,
                    "obstacle_spawn_skipped",
                    json!({ "reason": "no free cell" }),
                );
            }
        }
    }

    fn place_food(&mut self) -> Option<Cell> {
        let occupancy = &self.occupancy;
        self.spawner
            .place_free(&self.arena, |cell| occupancy.is_occupied(cell))
    }

    fn terminate(&mut self, reason: TerminationReason) {
        if self.is_ended() {
            return;
        }
        self.state = RunState::Terminated;
        self.end_reason = Some(reason);
        self.events.push(RuntimeEvent::Terminated { reason });
    }

    fn log(&self, level: Level, event: &str, details: serde_json::Value) {
        log::emit(
            level,
            event,
            &LogContext {
                run_id: None,
                seed: Some(self.seed),
                tick: Some(self.tick_counter),
            },
            details,
        );
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashSet, VecDeque};
    use std::fs;
    use std::path::PathBuf;

    use crate::constants::TICK_MS;
    use crate::engine::{GameEngine, Pilot, PilotView, Snake};
    use crate::arena::{Occupancy, Occupant};
    use crate::score_store::ScoreStore;
    use crate::types::{
        Cell, Direction, GameConfig, RunState, RuntimeEvent, Steer, TerminationReason,
    };

    /// Replays a fixed list of verdicts, then keeps going straight.
    struct ScriptedPilot {
        script: VecDeque<Steer>,
    }

    impl ScriptedPilot {
        fn boxed(script: &[Steer]) -> Box<Self> {
            Box::new(Self {
                script: script.iter().copied().collect(),
            })
        }
    }

    impl Pilot for ScriptedPilot {
        fn steer(&mut self, _view: &PilotView<'_>) -> Steer {
            self.script.pop_front().unwrap_or(Steer::Continue)
        }
    }

    fn place_snake(engine: &mut GameEngine, cells: &[(i32, i32)], heading: Direction) {
        let snake = Snake::from_cells(cells.iter().map(|(x, y)| Cell::new(*x, *y)))
            .expect("valid snake");
        let mut occupancy = Occupancy::new();
        for cell in snake.cells() {
            occupancy.insert(cell, Occupant::Snake);
        }
        for cell in engine.obstacles.cells() {
            occupancy.insert(cell, Occupant::Obstacle);
        }
        engine.snake = snake;
        engine.occupancy = occupancy;
        engine.heading = heading;
    }

    fn place_obstacle(engine: &mut GameEngine, x: i32, y: i32) {
        let cell = Cell::new(x, y);
        engine.obstacles.spawn(cell, engine.elapsed_ms);
        engine.occupancy.insert(cell, Occupant::Obstacle);
    }

    fn temp_file(name: &str) -> PathBuf {
        let unique = format!("{}-{}-{}", name, std::process::id(), rand::random::<u64>());
        std::env::temp_dir().join(unique).join("highscore.txt")
    }

    fn assert_consistent(engine: &GameEngine) {
        let cells: Vec<Cell> = engine.snake.cells().collect();
        let unique: HashSet<Cell> = cells.iter().copied().collect();
        assert_eq!(unique.len(), cells.len(), "snake overlaps itself");
        for cell in &cells {
            assert!(engine.arena.in_bounds(*cell));
            assert!(!engine.obstacles.contains(*cell), "obstacle under snake");
        }
        if let Some(food) = engine.food {
            assert!(!unique.contains(&food), "food under snake");
            assert!(!engine.obstacles.contains(food), "food under obstacle");
        }
        assert_eq!(
            engine.occupancy.count(Occupant::Snake),
            engine.snake.len()
        );
        assert_eq!(
            engine.occupancy.count(Occupant::Obstacle),
            engine.obstacles.len()
        );
        assert!(engine.high_score >= engine.score);
    }

    #[test]
    fn new_run_starts_at_center_heading_right() {
        let engine = GameEngine::new(GameConfig::default(), 1, ScoreStore::in_memory());
        assert_eq!(engine.state(), RunState::Running);
        assert_eq!(engine.snake().cells().collect::<Vec<_>>(), vec![Cell::new(15, 10)]);
        assert_eq!(engine.heading(), Direction::Right);
        assert!(engine.obstacles().is_empty());
        assert_eq!(engine.score(), 0);
        let food = engine.food().expect("food placed");
        assert_ne!(food, Cell::new(15, 10));
        assert_consistent(&engine);
    }

    #[test]
    fn high_score_is_loaded_from_store() {
        let path = temp_file("engine-high-score-load");
        fs::create_dir_all(path.parent().expect("parent")).expect("create dir");
        fs::write(&path, "17").expect("write file");
        let engine = GameEngine::new(GameConfig::default(), 1, ScoreStore::open(path.clone()));
        assert_eq!(engine.high_score(), 17);
        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn same_seed_produces_same_trajectory() {
        let mut a = GameEngine::new(GameConfig::new(12, 12), 424_242, ScoreStore::in_memory());
        let mut b = GameEngine::new(GameConfig::new(12, 12), 424_242, ScoreStore::in_memory());
        for _ in 0..600 {
            a.step(TICK_MS);
            b.step(TICK_MS);
            assert_eq!(a.build_snapshot(true), b.build_snapshot(true));
            if a.is_ended() {
                break;
            }
        }
        assert_eq!(a.build_summary(), b.build_summary());
    }

    #[test]
    fn invariants_hold_across_many_seeds() {
        for seed in 1..=40u32 {
            let mut engine = GameEngine::new(GameConfig::new(10, 8), seed, ScoreStore::in_memory());
            let mut last_high = engine.high_score();
            for _ in 0..1_500 {
                engine.step(TICK_MS);
                assert_consistent(&engine);
                assert!(engine.high_score() >= last_high);
                last_high = engine.high_score();
                if engine.is_ended() {
                    break;
                }
            }
        }
    }

    #[test]
    fn greedy_run_heads_for_food() {
        let mut engine = GameEngine::new(GameConfig::new(10, 10), 3, ScoreStore::in_memory());
        place_snake(&mut engine, &[(5, 5)], Direction::Right);
        engine.food = Some(Cell::new(8, 5));
        engine.step(TICK_MS);
        assert_eq!(engine.heading(), Direction::Right);
        assert_eq!(engine.snake().head(), Cell::new(6, 5));
    }

    #[test]
    fn continue_keeps_previous_heading() {
        let mut engine = GameEngine::with_pilot(
            GameConfig::new(10, 10),
            3,
            ScoreStore::in_memory(),
            ScriptedPilot::boxed(&[Steer::Turn(Direction::Down), Steer::Continue]),
        );
        place_snake(&mut engine, &[(5, 5)], Direction::Right);
        engine.food = Some(Cell::new(0, 0));
        engine.step(TICK_MS);
        engine.step(TICK_MS);
        assert_eq!(engine.heading(), Direction::Down);
        assert_eq!(engine.snake().head(), Cell::new(5, 7));
    }

    #[test]
    fn moving_onto_own_body_terminates_without_mutation() {
        let mut engine = GameEngine::with_pilot(
            GameConfig::new(10, 10),
            9,
            ScoreStore::in_memory(),
            ScriptedPilot::boxed(&[Steer::Turn(Direction::Up), Steer::Turn(Direction::Up)]),
        );
        place_snake(&mut engine, &[(2, 2), (2, 3), (2, 4), (2, 5)], Direction::Up);
        engine.food = Some(Cell::new(9, 9));

        engine.step(TICK_MS);
        assert_eq!(engine.snake().head(), Cell::new(2, 1));
        assert_eq!(engine.state(), RunState::Running);

        // Curl the body so the cell above the head is part of it.
        place_snake(&mut engine, &[(2, 2), (3, 2), (3, 1), (2, 1)], Direction::Up);
        let before: Vec<Cell> = engine.snake().cells().collect();
        engine.step(TICK_MS);

        assert_eq!(engine.state(), RunState::Terminated);
        assert_eq!(engine.end_reason(), Some(TerminationReason::SelfCollision));
        assert_eq!(engine.snake().cells().collect::<Vec<_>>(), before);

        let tick = engine.tick();
        engine.step(TICK_MS);
        assert_eq!(engine.tick(), tick, "terminated runs do not advance");
    }

    #[test]
    fn leaving_the_arena_terminates() {
        let mut engine = GameEngine::with_pilot(
            GameConfig::new(10, 10),
            9,
            ScoreStore::in_memory(),
            ScriptedPilot::boxed(&[Steer::Continue]),
        );
        place_snake(&mut engine, &[(9, 4)], Direction::Right);
        engine.step(TICK_MS);
        assert_eq!(engine.end_reason(), Some(TerminationReason::Wall));
        assert_eq!(engine.snake().head(), Cell::new(9, 4));
        let snapshot = engine.build_snapshot(true);
        assert!(snapshot.events.contains(&RuntimeEvent::Terminated {
            reason: TerminationReason::Wall
        }));
    }

    #[test]
    fn boxed_in_snake_falls_back_right_and_terminates() {
        let mut engine = GameEngine::new(GameConfig::new(10, 10), 5, ScoreStore::in_memory());
        place_snake(&mut engine, &[(9, 0), (9, 1), (8, 1), (8, 0)], Direction::Up);
        engine.food = Some(Cell::new(0, 9));
        engine.step(TICK_MS);
        assert_eq!(engine.heading(), Direction::Right);
        assert_eq!(engine.end_reason(), Some(TerminationReason::Wall));
    }

    #[test]
    fn eating_food_grows_scores_and_relocates() {
        let mut engine = GameEngine::new(GameConfig::new(10, 10), 7, ScoreStore::in_memory());
        place_snake(&mut engine, &[(5, 5), (4, 5)], Direction::Right);
        engine.food = Some(Cell::new(6, 5));
        engine.step(TICK_MS);

        assert_eq!(engine.snake().len(), 3);
        assert_eq!(engine.score(), 5);
        assert_eq!(engine.high_score(), 5);
        let food = engine.food().expect("food relocated");
        assert!(!engine.snake().contains(food));
        assert_consistent(&engine);

        let events = engine.build_snapshot(true).events;
        assert!(events.contains(&RuntimeEvent::FoodEaten {
            cell: Cell::new(6, 5),
            score: 5
        }));
        assert!(events.contains(&RuntimeEvent::NewHighScore {
            score: 5,
            persisted: false
        }));
        assert!(engine.build_snapshot(true).events.is_empty());
    }

    #[test]
    fn obstacle_hit_costs_points_removes_obstacle_and_continues() {
        let mut engine = GameEngine::with_pilot(
            GameConfig::new(10, 10),
            7,
            ScoreStore::in_memory(),
            ScriptedPilot::boxed(&[Steer::Turn(Direction::Right), Steer::Turn(Direction::Right)]),
        );
        place_snake(&mut engine, &[(2, 2)], Direction::Right);
        engine.food = Some(Cell::new(9, 9));
        place_obstacle(&mut engine, 3, 2);
        place_obstacle(&mut engine, 4, 2);
        engine.score = 4;

        engine.step(TICK_MS);
        assert_eq!(engine.score(), 1);
        assert_eq!(engine.state(), RunState::Running);
        assert_eq!(engine.snake().head(), Cell::new(3, 2));
        assert!(!engine.obstacles().contains(Cell::new(3, 2)));

        engine.step(TICK_MS);
        assert_eq!(engine.score(), 0, "score is floored at zero");
        assert!(engine.obstacles().is_empty());
        assert_eq!(engine.build_summary().obstacles_hit, 2);
        assert_consistent(&engine);
    }

    #[test]
    fn obstacles_spawn_once_per_interval() {
        let mut engine = GameEngine::new(GameConfig::new(100, 50), 13, ScoreStore::in_memory());
        // Far enough that the snake cannot reach it within the test.
        engine.food = Some(Cell::new(0, 0));

        for _ in 0..19 {
            engine.step(TICK_MS);
        }
        assert_eq!(engine.elapsed_ms(), 1_900);
        assert!(engine.obstacles().is_empty());

        engine.step(TICK_MS);
        assert_eq!(engine.obstacles().len(), 1);
        assert_eq!(
            engine.obstacles().iter().next().map(|o| o.created_at_ms),
            Some(2_000)
        );

        for _ in 0..19 {
            engine.step(TICK_MS);
            assert_eq!(engine.obstacles().len(), 1);
        }
        engine.step(TICK_MS);
        assert_eq!(engine.elapsed_ms(), 4_000);
        assert_eq!(engine.obstacles().len(), 2);
        assert_consistent(&engine);
    }

    #[test]
    fn new_high_score_is_persisted_during_the_tick() {
        let path = temp_file("engine-high-score-commit");
        let mut engine = GameEngine::new(GameConfig::new(10, 10), 7, ScoreStore::open(path.clone()));
        place_snake(&mut engine, &[(5, 5)], Direction::Right);
        engine.food = Some(Cell::new(6, 5));
        engine.step(TICK_MS);

        assert_eq!(engine.high_score(), 5);
        assert_eq!(fs::read_to_string(&path).expect("persisted"), "5");
        assert_eq!(engine.score_store().load(), engine.high_score());

        let store = engine.into_score_store();
        let next = GameEngine::new(GameConfig::new(10, 10), 8, store);
        assert_eq!(next.high_score(), 5);
        let _ = fs::remove_dir_all(path.parent().expect("parent"));
    }

    #[test]
    fn lower_score_does_not_touch_high_score() {
        let mut store = ScoreStore::in_memory();
        store.commit_if_greater(50).expect("in-memory commit");
        let mut engine = GameEngine::new(GameConfig::new(10, 10), 7, store);
        place_snake(&mut engine, &[(5, 5)], Direction::Right);
        engine.food = Some(Cell::new(6, 5));
        engine.step(TICK_MS);
        assert_eq!(engine.score(), 5);
        assert_eq!(engine.high_score(), 50);
    }

    #[test]
    fn filling_the_arena_ends_the_run() {
        let mut engine = GameEngine::new(GameConfig::new(2, 1), 1, ScoreStore::in_memory());
        assert_eq!(engine.snake().head(), Cell::new(1, 0));
        assert_eq!(engine.food(), Some(Cell::new(0, 0)));

        engine.step(TICK_MS);
        assert_eq!(engine.end_reason(), Some(TerminationReason::ArenaFull));
        assert_eq!(engine.snake().len(), 2);
        assert_eq!(engine.score(), 5);
        assert_eq!(engine.high_score(), 5);
        assert_eq!(engine.food(), None);
    }

    #[test]
    fn single_cell_arena_cannot_start() {
        let engine = GameEngine::new(GameConfig::new(1, 1), 1, ScoreStore::in_memory());
        assert!(engine.is_ended());
        assert_eq!(engine.end_reason(), Some(TerminationReason::ArenaFull));
    }

    #[test]
    fn stop_ends_the_run_once() {
        let mut engine = GameEngine::new(GameConfig::default(), 2, ScoreStore::in_memory());
        engine.stop();
        engine.stop();
        assert_eq!(engine.end_reason(), Some(TerminationReason::Quit));
        let terminations = engine
            .build_snapshot(true)
            .events
            .into_iter()
            .filter(|event| matches!(event, RuntimeEvent::Terminated { .. }))
            .count();
        assert_eq!(terminations, 1);
    }
}
