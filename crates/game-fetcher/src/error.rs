use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Player not found on {platform}: {username}")]
    PlayerNotFound { platform: &'static str, username: String },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),
}
