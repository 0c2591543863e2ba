use std::path::PathBuf;
use thiserror::Error;

use crate::board::Side;

/// Failures of the evaluation table file that cannot be healed by a reset.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("table has {0} bytes, expected {expected}", expected = crate::evolving::TABLE_SIZE)]
    TableSize(usize),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Invariant violations inside the evolving agent. These abort the current
/// operation and never reach the persisted table.
#[derive(Debug, Error)]
pub enum EvolvingError {
    #[error("feature {name}={value} outside [0, {limit})")]
    FeatureOutOfRange {
        name: &'static str,
        value: u8,
        limit: usize,
    },
    #[error("history move {index} was made by {recorded} but {expected} was to move")]
    CorruptHistory {
        index: usize,
        recorded: Side,
        expected: Side,
    },
    #[error("history move {index} cannot be replayed at ({x}, {y})")]
    IllegalHistory { index: usize, x: i32, y: i32 },
    #[error("replayed history does not reproduce the final board")]
    ReplayMismatch,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Evolving(#[from] EvolvingError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}
