//! Error types for attack simulations

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use fracture_core::{MetricError, NetworkError};

use crate::types::AttackType;

/// Errors raised by an [`Attacker`](crate::attacker::Attacker)
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AttackError {
    #[error("Attack size must be at least 1")]
    InvalidAttackSize,

    #[error("Cannot remove {requested} nodes: only {remaining} remain")]
    Exhausted { requested: usize, remaining: usize },

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Metric error: {0}")]
    Metric(#[from] MetricError),
}

/// Errors raised while running a simulation or filling a result store
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Attack failed: {0}")]
    Attack(#[from] AttackError),

    #[error("Measurement failed: {0}")]
    Network(#[from] NetworkError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Fraction {0} already recorded")]
    DuplicateKey(String),

    #[error("Fraction {key} recorded after {last}")]
    OutOfOrder { key: String, last: String },

    #[error("No result slot for {attack} at {timestamp}")]
    MissingSlot {
        attack: AttackType,
        timestamp: String,
    },

    #[error("Result slot for {attack} at {timestamp} already written")]
    SlotFilled {
        attack: AttackType,
        timestamp: String,
    },

    #[error("Failed to persist results: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors in a simulation configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Step must be a positive fraction, got {0}")]
    InvalidStep(f64),

    #[error("Step {step} is finer than the {digits} digits of a result key")]
    StepTooFine { step: f64, digits: usize },

    #[error("Invalid fraction range: start {start}, end {end}")]
    InvalidRange { start: f64, end: f64 },

    #[error("At least one attack type is required")]
    NoAttackTypes,

    #[error("Failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Errors raised while reading topology snapshots
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("File name {name} does not match {format}: {reason}")]
    InvalidFormat {
        name: String,
        format: String,
        reason: String,
    },

    #[error("{}:{line}: {reason}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        reason: String,
    },
}
