//! Analysis configuration: engine settings, worker pool size and red-flag thresholds.

use std::env;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::stockfish::{EngineOptions, SearchLimit};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub engine_correlation_red_flag: f64,
    pub avg_centipawn_loss_red_flag: f64,
    pub accuracy_fluctuation_red_flag: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            engine_correlation_red_flag: 95.0,
            avg_centipawn_loss_red_flag: 15.0,
            accuracy_fluctuation_red_flag: 30.0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Path to Stockfish binary; resolved from common locations when unset
    pub engine_path: Option<String>,

    /// Search depth per position
    pub engine_depth: u32,

    /// Optional per-position time limit, used together with depth
    pub movetime_ms: Option<u64>,

    pub threads: u32,
    pub hash_mb: u32,

    /// Plies evaluated per game by the enhanced analyzer
    pub max_plies: usize,

    /// Parallel games in the enhanced analyzer
    pub workers: usize,

    /// Directory for the per-game analysis cache
    pub cache_dir: PathBuf,

    /// Query Lichess for server-side analysis of Lichess games
    pub use_cloud: bool,

    pub thresholds: Thresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            engine_path: None,
            engine_depth: 18,
            movetime_ms: None,
            threads: 2,
            hash_mb: 256,
            max_plies: 100,
            workers: 4,
            cache_dir: PathBuf::from("cache/analysis"),
            use_cloud: true,
            thresholds: Thresholds::default(),
        }
    }
}

impl AnalysisConfig {
    /// Apply environment overrides on top of the current values.
    pub fn apply_env(mut self) -> Self {
        if let Ok(path) = env::var("STOCKFISH_PATH") {
            self.engine_path = Some(path);
        }

        self.engine_depth = env::var("ENGINE_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.engine_depth);

        self.movetime_ms = env::var("ENGINE_MOVETIME_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(self.movetime_ms);

        self.workers = env::var("ANALYSIS_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(self.workers);

        if let Ok(dir) = env::var("FAIRPLAY_ANALYSIS_CACHE") {
            self.cache_dir = PathBuf::from(dir);
        }

        self
    }

    /// Configured pool size, at least one. Not capped by the CPU count.
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// More workers than CPUs only adds contention between engines.
    pub fn oversubscribed(&self) -> bool {
        self.effective_workers() > num_cpus::get()
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            threads: self.threads,
            hash_mb: self.hash_mb,
        }
    }

    /// Depth only, unless a movetime is configured.
    pub fn search_limit(&self) -> SearchLimit {
        match self.movetime_ms {
            Some(movetime_ms) => SearchLimit::DepthOrTime {
                depth: self.engine_depth,
                movetime_ms,
            },
            None => SearchLimit::Depth(self.engine_depth),
        }
    }

    pub fn enhanced_search_limit(&self) -> SearchLimit {
        SearchLimit::DepthOrTime {
            depth: self.engine_depth,
            movetime_ms: self.movetime_ms.unwrap_or_else(|| self.enhanced_movetime_ms()),
        }
    }

    /// Per-move time budget the enhanced analyzer pairs with the depth limit.
    pub fn enhanced_movetime_ms(&self) -> u64 {
        match self.engine_depth {
            d if d >= 28 => 4000,
            d if d >= 24 => 2000,
            d if d >= 20 => 1000,
            _ => 500,
        }
    }

    /// Find a Stockfish binary: configured path, then bundled locations, then `PATH`.
    pub fn resolve_engine_path(&self) -> Result<PathBuf, AnalysisError> {
        if let Some(configured) = &self.engine_path {
            let candidates = [
                PathBuf::from(configured),
                PathBuf::from(configured.replace('\\', "/")),
                env::current_dir().unwrap_or_default().join(configured),
            ];
            if let Some(found) = candidates.iter().find(|p| p.is_file()) {
                info!(path = %found.display(), "Using configured Stockfish");
                return Ok(found.clone());
            }
            debug!(configured = %configured, "Configured Stockfish path not found");
        }

        let bundled = [
            "stockfish/stockfish",
            "stockfish/stockfish-ubuntu-x86-64-avx2",
            "stockfish/stockfish-windows-x86-64.exe",
            "/usr/local/bin/stockfish",
            "/usr/bin/stockfish",
            "/usr/games/stockfish",
            "/opt/homebrew/bin/stockfish",
        ];
        if let Some(found) = bundled.iter().map(Path::new).find(|p| p.is_file()) {
            return Ok(found.to_path_buf());
        }

        if let Some(paths) = env::var_os("PATH") {
            for dir in env::split_paths(&paths) {
                for name in ["stockfish", "stockfish.exe"] {
                    let candidate = dir.join(name);
                    if candidate.is_file() {
                        return Ok(candidate);
                    }
                }
            }
        }

        Err(AnalysisError::Config(
            "Stockfish not found; set analysis.engine_path or STOCKFISH_PATH".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.engine_depth, 18);
        assert_eq!(config.threads, 2);
        assert_eq!(config.hash_mb, 256);
        assert_eq!(config.max_plies, 100);
        assert_eq!(config.thresholds.engine_correlation_red_flag, 95.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"engine_depth": 12, "thresholds": {"avg_centipawn_loss_red_flag": 20}}"#)
                .unwrap();
        assert_eq!(config.engine_depth, 12);
        assert_eq!(config.workers, 4);
        assert_eq!(config.thresholds.avg_centipawn_loss_red_flag, 20.0);
        assert_eq!(config.thresholds.engine_correlation_red_flag, 95.0);
    }

    #[test]
    fn worker_count_is_not_capped_by_cpus() {
        let mut config = AnalysisConfig::default();
        assert_eq!(config.effective_workers(), 4);
        config.workers = num_cpus::get() + 8;
        assert_eq!(config.effective_workers(), num_cpus::get() + 8);
        assert!(config.oversubscribed());
        config.workers = 0;
        assert_eq!(config.effective_workers(), 1);
        assert!(!config.oversubscribed());
    }

    #[test]
    fn movetime_follows_depth() {
        let mut config = AnalysisConfig::default();
        config.engine_depth = 16;
        assert_eq!(config.enhanced_movetime_ms(), 500);
        config.engine_depth = 20;
        assert_eq!(config.enhanced_movetime_ms(), 1000);
        config.engine_depth = 28;
        assert_eq!(config.enhanced_movetime_ms(), 4000);
        assert_eq!(config.search_limit(), SearchLimit::Depth(28));
        assert_eq!(
            config.enhanced_search_limit(),
            SearchLimit::DepthOrTime { depth: 28, movetime_ms: 4000 }
        );
    }

    #[test]
    fn missing_configured_path_errors_without_fallbacks() {
        let config = AnalysisConfig {
            engine_path: Some("/definitely/not/here".into()),
            ..Default::default()
        };
        // Either a system Stockfish exists or the error names the env var
        if let Err(e) = config.resolve_engine_path() {
            assert!(e.to_string().contains("STOCKFISH_PATH"));
        }
    }
}
