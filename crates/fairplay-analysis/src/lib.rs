//! Fair-play analysis: per-move evaluation, per-game statistics and
//! player-level suspicion scoring.

pub mod analysis_cache;
pub mod analyzer;
pub mod cloud;
pub mod comparison;
pub mod config;
pub mod enhanced;
pub mod error;
pub mod evaluator;
pub mod fatigue;
pub mod game;
pub mod heuristic;
pub mod player;
pub mod probes;
pub mod quality;
pub mod report;
pub mod stockfish;
pub mod timing;

pub use analyzer::ChessAnalyzer;
pub use config::{AnalysisConfig, Thresholds};
pub use enhanced::EnhancedPlayerAnalyzer;
pub use error::{AnalysisError, FailureKind, GameFailure};
pub use evaluator::{EvaluationChain, Evaluator, LocalEngine, PositionEvaluation};
pub use game::{analyze_game, GameAnalysis};
pub use player::{aggregate, PlayerAnalysis, RiskLevel};
pub use quality::{EnhancedResult, GameAnalysisV3};
pub use report::DetailedReport;
pub use stockfish::StockfishEngine;
