pub mod arena;
pub mod config;
pub mod constants;
pub mod engine;
pub mod log;
pub mod rng;
pub mod runner;
pub mod score_store;
pub mod types;
