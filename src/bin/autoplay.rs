use std::io::{self, Write};
use std::path::PathBuf;

use autosnake::arena::Arena;
use autosnake::config::{load_game_config, resolve_high_score_path};
use autosnake::engine::GameEngine;
use autosnake::log::{self, Level, LogContext};
use autosnake::runner::{render_text, run_realtime, QuitHandle};
use autosnake::score_store::ScoreStore;
use autosnake::types::{RuntimeEvent, Snapshot, TerminationReason};
use clap::Parser;
use serde_json::json;

/// Watch the snake play itself in the terminal.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long)]
    config: Option<PathBuf>,
    /// Defaults to $AUTOSNAKE_HIGHSCORE_PATH, then ./highscore.txt.
    #[arg(long)]
    highscore: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long)]
    tick_rate: Option<u32>,
    /// Start a fresh run after each game over instead of exiting.
    #[arg(long)]
    restart: bool,
    /// Print JSON snapshots instead of text frames.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let mut config = match load_game_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            log::emit(
                Level::Error,
                "config_invalid",
                &LogContext::default(),
                json!({ "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    };
    if let Some(tick_rate) = cli.tick_rate {
        config.tick_rate = tick_rate.max(1);
    }

    let high_score_path = resolve_high_score_path(cli.highscore.clone());
    let mut store = ScoreStore::open(high_score_path.clone());
    log::info(
        "autoplay_started",
        json!({
            "highScorePath": high_score_path.to_string_lossy(),
            "highScore": store.best(),
            "gridWidth": config.grid_width,
            "gridHeight": config.grid_height,
            "tickRate": config.tick_rate,
        }),
    );

    let quit = QuitHandle::new();
    let ctrl_c_quit = quit.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_quit.request();
        }
    });

    let mut seed = cli.seed.unwrap_or_else(rand::random::<u32>);
    loop {
        let mut engine = GameEngine::new(config.clone(), seed, store);
        let arena = engine.arena;
        let mut renderer = |snapshot: &Snapshot| draw(&arena, snapshot, cli.json);
        let summary = run_realtime(&mut engine, &quit, &mut renderer).await;

        log::emit(
            Level::Info,
            "run_finished",
            &LogContext {
                run_id: None,
                seed: Some(seed),
                tick: Some(summary.ticks),
            },
            json!(summary),
        );
        store = engine.into_score_store();

        let quitting = summary.reason == Some(TerminationReason::Quit);
        if quitting || !cli.restart {
            println!("\nGame Over! Score: {}  High Score: {}", summary.score, summary.high_score);
            break;
        }
        seed = seed.wrapping_add(1);
    }

    log::info("autoplay_finished", json!({ "highScore": store.best() }));
}

fn draw(arena: &Arena, snapshot: &Snapshot, as_json: bool) {
    let mut stdout = io::stdout().lock();
    let written = if as_json {
        match serde_json::to_string(snapshot) {
            Ok(line) => writeln!(stdout, "{line}"),
            Err(error) => Err(io::Error::other(error)),
        }
    } else {
        // clear screen, cursor home
        write!(stdout, "\x1b[2J\x1b[H{}", render_text(arena, snapshot))
    };
    // write errors on a closed stdout are ignored
    let _ = written.and_then(|_| stdout.flush());
    for event in &snapshot.events {
        if let RuntimeEvent::NewHighScore { score, persisted } = event {
            log::info("new_high_score", json!({ "score": score, "persisted": persisted }));
        }
    }
}
