use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use autosnake::config::load_game_config;
use autosnake::constants::tick_ms_for_rate;
use autosnake::engine::{now_ms, GameEngine};
use autosnake::log::{self, Level, LogContext};
use autosnake::score_store::ScoreStore;
use autosnake::types::{GameConfig, RunSummary, RuntimeEvent, Snapshot, TerminationReason};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use serde::Serialize;
use serde_json::json;

/// Plays seeded runs headlessly and checks the board invariants every tick.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[arg(long, default_value_t = 3)]
    runs: u32,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    width: Option<i32>,
    #[arg(long)]
    height: Option<i32>,
    /// Safety cap per run; greedy runs can circle for a long time.
    #[arg(long, default_value_t = 20_000)]
    max_ticks: u64,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Persist the best score here; omitted means in-memory only.
    #[arg(long)]
    highscore: Option<PathBuf>,
    #[arg(long)]
    run_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    #[serde(flatten)]
    summary: RunSummary,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct RunOutcome {
    result: RunResultLine,
    anomaly_records: Vec<AnomalyRecord>,
}

#[derive(Clone, Debug, Serialize)]
struct BatchSummary {
    #[serde(rename = "runId")]
    run_id: String,
    #[serde(rename = "generatedAtIso")]
    generated_at_iso: String,
    #[serde(rename = "runCount")]
    run_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: f64,
    #[serde(rename = "averageTicks")]
    average_ticks: u64,
    #[serde(rename = "bestScore")]
    best_score: u32,
    #[serde(rename = "reasonCounts")]
    reason_counts: BTreeMap<String, usize>,
    runs: Vec<RunResultLine>,
}

fn main() {
    let cli = Cli::parse();
    let started_at_ms = now_ms();
    let seed = normalize_seed(cli.seed.unwrap_or(started_at_ms));
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| default_run_id(seed, started_at_ms));
    let root_context = LogContext {
        run_id: Some(&run_id),
        ..LogContext::default()
    };

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(message) => {
            log::emit(Level::Error, "config_invalid", &root_context, json!({ "error": message }));
            std::process::exit(2);
        }
    };

    let mut store = match cli.highscore.clone() {
        Some(path) => ScoreStore::open(path),
        None => ScoreStore::in_memory(),
    };
    let mut results = Vec::new();
    let mut has_anomaly = false;

    for idx in 0..cli.runs {
        let run_seed = seed.wrapping_add(idx);
        let context = LogContext {
            run_id: Some(&run_id),
            seed: Some(run_seed),
            tick: None,
        };
        log::emit(
            Level::Info,
            "run_started",
            &context,
            json!({
                "gridWidth": config.grid_width,
                "gridHeight": config.grid_height,
                "highScore": store.best(),
            }),
        );

        let engine = GameEngine::new(config.clone(), run_seed, store);
        let (outcome, returned_store) = run_once(engine, cli.max_ticks);
        store = returned_store;

        for anomaly in &outcome.anomaly_records {
            log::emit(
                Level::Warn,
                "anomaly_detected",
                &LogContext {
                    tick: Some(anomaly.tick),
                    ..context.clone()
                },
                json!({ "message": anomaly.message }),
            );
        }
        has_anomaly |= !outcome.result.anomalies.is_empty();

        log::emit(
            Level::Info,
            "run_finished",
            &LogContext {
                tick: Some(outcome.result.summary.ticks),
                ..context.clone()
            },
            json!({
                "reason": outcome.result.summary.reason,
                "score": outcome.result.summary.score,
                "highScore": outcome.result.summary.high_score,
            }),
        );

        match serde_json::to_string(&outcome.result) {
            Ok(line) => println!("{line}"),
            Err(error) => log::emit(
                Level::Error,
                "result_serialize_failed",
                &context,
                json!({ "error": error.to_string() }),
            ),
        }
        results.push(outcome.result);
    }

    let summary = build_batch_summary(run_id.clone(), results);
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            log::emit(
                Level::Error,
                "summary_write_failed",
                &root_context,
                json!({ "path": path.to_string_lossy(), "error": error.to_string() }),
            );
            std::process::exit(2);
        }
    }

    log::emit(
        Level::Info,
        "batch_finished",
        &root_context,
        json!({
            "runCount": summary.run_count,
            "anomalyCount": summary.anomaly_count,
            "bestScore": summary.best_score,
            "reasonCounts": summary.reason_counts,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn resolve_config(cli: &Cli) -> Result<GameConfig, String> {
    let mut config = load_game_config(cli.config.as_deref()).map_err(|error| error.to_string())?;
    if let Some(width) = cli.width {
        config.grid_width = width;
    }
    if let Some(height) = cli.height {
        config.grid_height = height;
    }
    config.validate().map_err(|error| error.to_string())?;
    Ok(config)
}

fn run_once(mut engine: GameEngine, max_ticks: u64) -> (RunOutcome, ScoreStore) {
    let dt_ms = tick_ms_for_rate(engine.config.tick_rate);
    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_high_score = engine.high_score();

    while !engine.is_ended() {
        engine.step(dt_ms);
        let snapshot = engine.build_snapshot(true);
        let mut messages = collect_snapshot_anomalies(&snapshot);
        if snapshot.high_score < last_high_score {
            messages.push(format!(
                "high score went down: {last_high_score} -> {}",
                snapshot.high_score
            ));
        }
        last_high_score = snapshot.high_score;
        let committed = snapshot
            .events
            .iter()
            .any(|event| matches!(event, RuntimeEvent::NewHighScore { persisted: true, .. }));
        if committed && engine.score_store().load() != snapshot.high_score {
            messages.push(format!(
                "persisted high score {} differs from {}",
                engine.score_store().load(),
                snapshot.high_score
            ));
        }
        for message in messages {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        if snapshot.tick >= max_ticks {
            engine.stop();
            break;
        }
    }

    let outcome = RunOutcome {
        result: RunResultLine {
            summary: engine.build_summary(),
            anomalies,
        },
        anomaly_records,
    };
    (outcome, engine.into_score_store())
}

fn collect_snapshot_anomalies(snapshot: &Snapshot) -> Vec<String> {
    let mut anomalies = Vec::new();
    let body: HashSet<_> = snapshot.snake.iter().copied().collect();
    if body.len() != snapshot.snake.len() {
        anomalies.push("snake body contains duplicate cells".to_string());
    }
    let obstacles: HashSet<_> = snapshot.obstacles.iter().copied().collect();
    if obstacles.len() != snapshot.obstacles.len() {
        anomalies.push("two obstacles share a cell".to_string());
    }
    if let Some(cell) = snapshot.obstacles.iter().find(|cell| body.contains(cell)) {
        anomalies.push(format!("obstacle under snake at ({}, {})", cell.x, cell.y));
    }
    if let Some(food) = snapshot.food {
        if body.contains(&food) || obstacles.contains(&food) {
            anomalies.push(format!("food on occupied cell ({}, {})", food.x, food.y));
        }
    }
    if snapshot.score > snapshot.high_score {
        anomalies.push(format!(
            "score {} above high score {}",
            snapshot.score, snapshot.high_score
        ));
    }
    anomalies
}

fn normalize_seed(seed: u64) -> u32 {
    seed as u32
}

fn default_run_id(seed: u32, timestamp_ms: u64) -> String {
    format!("sim-{seed}-{timestamp_ms}")
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn reason_key(reason: Option<TerminationReason>) -> String {
    match reason {
        Some(TerminationReason::Wall) => "wall",
        Some(TerminationReason::SelfCollision) => "self_collision",
        Some(TerminationReason::ArenaFull) => "arena_full",
        Some(TerminationReason::Quit) => "quit",
        None => "running",
    }
    .to_string()
}

fn build_batch_summary(run_id: String, runs: Vec<RunResultLine>) -> BatchSummary {
    let run_count = runs.len();
    let mut reason_counts = BTreeMap::new();
    for run in &runs {
        *reason_counts.entry(reason_key(run.summary.reason)).or_insert(0) += 1;
    }
    let (average_score, average_ticks) = if run_count == 0 {
        (0.0, 0)
    } else {
        let total_score: u64 = runs.iter().map(|run| run.summary.score as u64).sum();
        let total_ticks: u64 = runs.iter().map(|run| run.summary.ticks).sum();
        (
            total_score as f64 / run_count as f64,
            total_ticks / run_count as u64,
        )
    };
    BatchSummary {
        run_id,
        generated_at_iso: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        run_count,
        anomaly_count: runs.iter().map(|run| run.anomalies.len()).sum(),
        average_score,
        average_ticks,
        best_score: runs.iter().map(|run| run.summary.high_score).max().unwrap_or(0),
        reason_counts,
        runs,
    }
}

fn write_summary(path: &Path, summary: &BatchSummary) -> io::Result<()> {
    let text = serde_json::to_string_pretty(summary).map_err(io::Error::other)?;
    std::fs::write(path, text)
}
