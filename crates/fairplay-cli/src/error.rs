use fairplay_analysis::AnalysisError;
use game_fetcher::FetchError;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Username is required")]
    MissingUsername,

    #[error("No games found for {0}")]
    NoGames(String),

    #[error("Config error in {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid glob pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
