use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};

use crate::arena::Arena;
use crate::constants::tick_ms_for_rate;
use crate::engine::GameEngine;
use crate::types::{Cell, RunSummary, Snapshot};

/// Shared flag the render/input side sets to end the run. The runner checks
/// it once per tick, before stepping.
#[derive(Clone, Debug, Default)]
pub struct QuitHandle {
    requested: Arc<AtomicBool>,
}

impl QuitHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

pub trait Renderer {
    fn render(&mut self, snapshot: &Snapshot);
}

impl<F> Renderer for F
where
    F: FnMut(&Snapshot),
{
    fn render(&mut self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Drives `engine` at its configured tick rate until it terminates or a quit
/// is requested. Elapsed time fed to the engine is measured, so obstacle
/// cadence follows the wall clock.
pub async fn run_realtime<R>(engine: &mut GameEngine, quit: &QuitHandle, renderer: &mut R) -> RunSummary
where
    R: Renderer + ?Sized,
{
    let period = Duration::from_millis(tick_ms_for_rate(engine.config.tick_rate));
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    renderer.render(&engine.build_snapshot(true));
    // The first interval tick fires immediately; start measuring from it.
    interval.tick().await;
    let mut last_tick_at = Instant::now();

    while !engine.is_ended() {
        interval.tick().await;
        if quit.is_requested() {
            engine.stop();
            renderer.render(&engine.build_snapshot(true));
            break;
        }
        let now = Instant::now();
        let dt_ms = now.duration_since(last_tick_at).as_millis() as u64;
        last_tick_at = now;

        engine.step(dt_ms);
        renderer.render(&engine.build_snapshot(true));
    }
    engine.build_summary()
}

/// Plain-text frame: `@` head, `o` body, `*` food, `#` obstacle.
pub fn render_text(arena: &Arena, snapshot: &Snapshot) -> String {
    let width = arena.width.max(0) as usize;
    let height = arena.height.max(0) as usize;
    let mut grid = vec![vec!['.'; width]; height];
    let mut put = |cell: Cell, glyph: char| {
        if arena.in_bounds(cell) {
            grid[cell.y as usize][cell.x as usize] = glyph;
        }
    };
    for cell in &snapshot.obstacles {
        put(*cell, '#');
    }
    if let Some(food) = snapshot.food {
        put(food, '*');
    }
    for (idx, cell) in snapshot.snake.iter().enumerate() {
        put(*cell, if idx == 0 { '@' } else { 'o' });
    }

    let mut out = format!(
        "Score: {}  High Score: {}\n",
        snapshot.score, snapshot.high_score
    );
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}
