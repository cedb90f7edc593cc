use crate::error::{Result, ShowcaseError};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_PORT: u16 = 14105;
pub const MAX_PER_PAGE: u32 = 100;

/// Settings for talking to the GitHub REST API
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub api_base: Url,
    pub token: Option<String>,
    pub user_agent: String,
    pub request_timeout: Duration,
    pub per_page: u32,
    pub max_pages: u32,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_URL).expect("default API URL is valid"),
            token: None,
            user_agent: format!("repo-showcase/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: Duration::from_secs(30),
            per_page: MAX_PER_PAGE,
            max_pages: 10,
            max_retries: 3,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

impl GitHubConfig {
    pub fn with_api_base(mut self, api_base: &str) -> Result<Self> {
        let url = Url::parse(api_base)?;
        if url.cannot_be_a_base() {
            return Err(ShowcaseError::InvalidUrl(format!("not a base URL: {}", api_base)));
        }
        self.api_base = url;
        Ok(self)
    }

    /// Empty tokens are treated as absent.
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token.filter(|t| !t.trim().is_empty());
        self
    }

    /// Page size clamped to what the API accepts.
    pub fn effective_per_page(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }
}

/// Everything one refresh run needs
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    pub owner: String,
    pub github: GitHubConfig,
    pub snapshot_path: PathBuf,
    pub concurrency: usize,
}

impl RefreshConfig {
    pub fn new(owner: impl Into<String>, github: GitHubConfig, snapshot_path: impl Into<PathBuf>) -> Result<Self> {
        let owner = owner.into();
        if owner.trim().is_empty() {
            return Err(ShowcaseError::ConfigError("owner must not be empty".to_string()));
        }

        Ok(Self {
            owner,
            github,
            snapshot_path: snapshot_path.into(),
            concurrency: 8,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Picks the listening port: the first non-empty of the two candidate values,
/// else [`DEFAULT_PORT`].
pub fn resolve_port(primary: Option<&str>, fallback: Option<&str>) -> Result<u16> {
    let chosen = [primary, fallback]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|v| !v.is_empty());

    match chosen {
        Some(value) => value
            .parse::<u16>()
            .map_err(|e| ShowcaseError::ConfigError(format!("invalid port '{}': {}", value, e))),
        None => Ok(DEFAULT_PORT),
    }
}
