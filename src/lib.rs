//! Baltic-Harvest: a resumable vessel record harvester
//!
//! This crate collects structured vessel records from balticshipping.com by
//! enumerating IMO numbers. The core is a concurrent fetch-and-checkpoint
//! engine that survives interruption and crash: every unit of work is
//! recorded in a durable checkpoint store, so a restarted run picks up
//! exactly where the previous one left off.

pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod report;
pub mod sink;
pub mod space;
pub mod strategy;

use thiserror::Error;

/// Main error type for Baltic-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid identifier specification: {0}")]
    InvalidSpec(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Record sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Concurrency governor closed")]
    GovernorClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Baltic-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use space::{FailureKind, IdentifierSpace, KeySpec, WorkStatus};
pub use strategy::{ExtractError, ExtractionStrategy, Record};
