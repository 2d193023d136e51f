//! One JSON object per line on stderr.

use serde::Serialize;
use serde_json::Value;

use crate::engine::now_ms;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warn,
    Error,
}

#[derive(Clone, Debug, Default)]
pub struct LogContext<'a> {
    pub run_id: Option<&'a str>,
    pub seed: Option<u32>,
    pub tick: Option<u64>,
}

#[derive(Clone, Debug, Serialize)]
struct StructuredLogLine<'a> {
    #[serde(rename = "timestampMs")]
    timestamp_ms: u64,
    level: Level,
    event: &'a str,
    #[serde(rename = "runId", skip_serializing_if = "Option::is_none")]
    run_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tick: Option<u64>,
    details: Value,
}

pub fn format_line(level: Level, event: &str, context: &LogContext<'_>, details: Value) -> String {
    let line = StructuredLogLine {
        timestamp_ms: now_ms(),
        level,
        event,
        run_id: context.run_id,
        seed: context.seed,
        tick: context.tick,
        details,
    };
    serde_json::to_string(&line).unwrap_or_else(|error| {
        format!(r#"{{"level":"error","event":"log_serialize_failed","details":"{error}"}}"#)
    })
}

pub fn emit(level: Level, event: &str, context: &LogContext<'_>, details: Value) {
    eprintln!("{}", format_line(level, event, context, details));
}

pub fn info(event: &str, details: Value) {
    emit(Level::Info, event, &LogContext::default(), details);
}

pub fn warn(event: &str, details: Value) {
    emit(Level::Warn, event, &LogContext::default(), details);
}
