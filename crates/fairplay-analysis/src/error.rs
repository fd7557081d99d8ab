//! Analysis error types

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Stockfish error: {0}")]
    Engine(String),

    #[error("PGN error: {0}")]
    Pgn(#[from] chess_core::PgnError),

    #[error("No evaluations produced for game")]
    NoEvaluations,

    #[error("Cloud evaluation error: {0}")]
    Cloud(#[from] reqwest::Error),

    #[error("Task failed: {0}")]
    Task(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse category of a per-game failure, kept in the player result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Parse,
    Engine,
    NoEvaluations,
    Other,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Parse => "parse",
            FailureKind::Engine => "engine",
            FailureKind::NoEvaluations => "no_evaluations",
            FailureKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// A game that could not be analyzed. `index` is 1-based, in fetch order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameFailure {
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl GameFailure {
    pub fn new(index: usize, error: &AnalysisError) -> Self {
        let kind = match error {
            AnalysisError::Pgn(_) => FailureKind::Parse,
            AnalysisError::Engine(_) => FailureKind::Engine,
            AnalysisError::NoEvaluations => FailureKind::NoEvaluations,
            _ => FailureKind::Other,
        };
        Self {
            index,
            kind,
            message: error.to_string(),
        }
    }
}
