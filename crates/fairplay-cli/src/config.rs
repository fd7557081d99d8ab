use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fairplay_analysis::AnalysisConfig;
use game_fetcher::FetcherConfig;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::CliError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChessComSection {
    pub request_delay_ms: u64,
    pub max_games: usize,
    pub cache_enabled: bool,
    pub cache_dir: PathBuf,
}

impl Default for ChessComSection {
    fn default() -> Self {
        Self {
            request_delay_ms: 1000,
            max_games: 50,
            cache_enabled: true,
            cache_dir: PathBuf::from("cache"),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LichessSection {
    pub api_token: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSection {
    pub default_format: String,
    pub output_dir: PathBuf,
    pub export_dir: PathBuf,
}

impl Default for ReportSection {
    fn default() -> Self {
        Self {
            default_format: "html".to_string(),
            output_dir: PathBuf::from("reports"),
            export_dir: PathBuf::from("exports"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub chess_com: ChessComSection,
    pub lichess: LichessSection,
    pub analysis: AnalysisConfig,
    pub report: ReportSection,
    pub logging: LoggingSection,
}

impl AppConfig {
    /// Defaults, then the JSON file, then environment overrides.
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let config = if path.is_file() {
            let text = std::fs::read_to_string(path)?;
            let config: AppConfig = serde_json::from_str(&text).map_err(|source| CliError::Config {
                path: path.display().to_string(),
                source,
            })?;
            info!(path = %path.display(), "Loaded configuration");
            config
        } else {
            warn!(path = %path.display(), "Config file not found, using defaults");
            AppConfig::default()
        };
        Ok(config.apply_env())
    }

    pub fn apply_env(mut self) -> Self {
        self.analysis = self.analysis.apply_env();

        if let Ok(token) = env::var("LICHESS_TOKEN") {
            if !token.is_empty() {
                self.lichess.api_token = Some(token);
            }
        }

        if let Ok(dir) = env::var("FAIRPLAY_CACHE_DIR") {
            self.analysis.cache_dir = PathBuf::from(&dir).join("analysis");
            self.chess_com.cache_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("FAIRPLAY_REPORT_DIR") {
            self.report.output_dir = PathBuf::from(dir);
        }

        self
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            request_delay: Duration::from_millis(self.chess_com.request_delay_ms),
            cache_dir: self
                .chess_com
                .cache_enabled
                .then(|| self.chess_com.cache_dir.clone()),
            lichess_token: self.lichess.api_token.clone(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_merges_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"chess_com": {"max_games": 10}, "analysis": {"engine_depth": 12}}"#,
        )
        .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let config: AppConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(config.chess_com.max_games, 10);
        assert_eq!(config.chess_com.request_delay_ms, 1000);
        assert_eq!(config.analysis.engine_depth, 12);
        assert_eq!(config.analysis.thresholds.engine_correlation_red_flag, 95.0);
        assert_eq!(config.report.default_format, "html");
    }

    #[test]
    fn save_then_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut config = AppConfig::default();
        config.report.output_dir = PathBuf::from("out");
        config.save(&path).unwrap();

        let reloaded: AppConfig = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(reloaded.report.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn disabled_cache_has_no_dir() {
        let mut config = AppConfig::default();
        config.chess_com.cache_enabled = false;
        assert!(config.fetcher_config().cache_dir.is_none());
    }
}
