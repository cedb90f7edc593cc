use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShowcaseError {
    #[error("GitHub API error: {0}")]
    ApiError(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<url::ParseError> for ShowcaseError {
    fn from(err: url::ParseError) -> Self {
        ShowcaseError::InvalidUrl(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ShowcaseError>;
