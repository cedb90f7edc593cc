use crate::config::GitHubConfig;
use crate::error::{Result, ShowcaseError};
use crate::types::{GitHubCommit, GitHubProfile, GitHubRepo};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response, StatusCode};
use std::time::{Duration, SystemTime};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

const LOW_RATE_LIMIT: u32 = 10;
const MAX_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

pub struct GitHubClient {
    client: Client,
    config: GitHubConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));

        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ShowcaseError::ConfigError(format!("invalid token: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(GitHubClient { client, config })
    }

    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    /// Builds an API URL from path segments, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| ShowcaseError::InvalidUrl(self.config.api_base.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn make_request(&self, url: &Url) -> Result<Response> {
        let mut retries = 0;
        let mut rate_limit_waits = 0;

        loop {
            let response = self.client.get(url.clone()).send().await?;

            let rate_limit_remaining = header_number::<u32>(&response, "X-RateLimit-Remaining");
            let rate_limit_reset = header_number::<u64>(&response, "X-RateLimit-Reset");

            match response.status() {
                status if status.is_success() => {
                    if let Some(remaining) = rate_limit_remaining.filter(|r| *r < LOW_RATE_LIMIT) {
                        warn!(remaining, "Rate limit low, adding delay");
                        sleep(Duration::from_secs(1)).await;
                    }
                    return Ok(response);
                }
                StatusCode::NOT_FOUND => {
                    return Err(ShowcaseError::NotFound(url.to_string()));
                }
                StatusCode::CONFLICT => {
                    return Err(ShowcaseError::Conflict(url.to_string()));
                }
                StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
                    if rate_limit_remaining == Some(0) =>
                {
                    let reset_time = SystemTime::UNIX_EPOCH
                        + Duration::from_secs(rate_limit_reset.unwrap_or(0));
                    let wait_time = reset_time
                        .duration_since(SystemTime::now())
                        .unwrap_or(Duration::from_secs(0));

                    if wait_time > MAX_RATE_LIMIT_WAIT || rate_limit_waits >= self.config.max_retries {
                        return Err(ShowcaseError::RateLimitExceeded(format!(
                            "API rate limit exceeded, resets in {}s",
                            wait_time.as_secs()
                        )));
                    }
                    rate_limit_waits += 1;
                    warn!(wait_secs = wait_time.as_secs() + 1, "Rate limit reached, waiting");
                    sleep(wait_time + Duration::from_secs(1)).await;
                }
                status if status.is_server_error() && retries < self.config.max_retries => {
                    retries += 1;
                    warn!(%status, attempt = retries, "Server error, retrying");
                    sleep(self.config.retry_backoff).await;
                }
                status => {
                    let error_text = response.text().await.unwrap_or_default();
                    return Err(ShowcaseError::ApiError(format!(
                        "{} failed with status {}: {}",
                        url, status, error_text
                    )));
                }
            }
        }
    }

    /// Fetch the profile for a user or organization
    pub async fn fetch_profile(&self, owner: &str) -> Result<GitHubProfile> {
        let url = self.endpoint(&["users", owner])?;
        let response = self.make_request(&url).await?;
        Ok(response.json().await?)
    }

    /// Fetch one page of repositories from `/{kind}/{owner}/repos`
    pub async fn fetch_repos_page(
        &self,
        kind: OwnerKind,
        owner: &str,
        page: u32,
    ) -> Result<(Vec<GitHubRepo>, bool)> {
        let per_page = self.config.effective_per_page();
        let mut url = self.endpoint(&[kind.path_segment(), owner, "repos"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &per_page.to_string())
            .append_pair("page", &page.to_string());

        let response = self.make_request(&url).await?;
        let repos: Vec<GitHubRepo> = response.json().await?;
        let has_more = repos.len() == per_page as usize;

        Ok((repos, has_more))
    }

    /// List every repository of `owner`, trying the organization endpoint first
    /// and falling back to the user endpoint when the owner is not an org.
    pub async fn list_repositories(&self, owner: &str) -> Result<Vec<GitHubRepo>> {
        let (first_page, mut has_more, kind) =
            match self.fetch_repos_page(OwnerKind::Organization, owner, 1).await {
                Ok((repos, more)) => (repos, more, OwnerKind::Organization),
                Err(ShowcaseError::NotFound(_)) => {
                    info!(owner, "Not an organization, using user repositories endpoint");
                    let (repos, more) = self.fetch_repos_page(OwnerKind::User, owner, 1).await?;
                    (repos, more, OwnerKind::User)
                }
                Err(e) => return Err(e),
            };

        let mut all_repos = first_page;
        let mut page = 1;

        while has_more && page < self.config.max_pages {
            page += 1;
            let (repos, more) = self.fetch_repos_page(kind, owner, page).await?;
            debug!(page, count = repos.len(), "Fetched repository page");
            all_repos.extend(repos);
            has_more = more;
        }

        if has_more {
            warn!(max_pages = self.config.max_pages, "Stopped paginating at page limit");
        }

        Ok(all_repos)
    }

    /// Most recent commit on the default branch. `None` when the repository
    /// has no history.
    pub async fn latest_commit(&self, owner: &str, repo: &str) -> Result<Option<GitHubCommit>> {
        let mut url = self.endpoint(&["repos", owner, repo, "commits"])?;
        url.query_pairs_mut().append_pair("per_page", "1");

        let response = match self.make_request(&url).await {
            Ok(response) => response,
            // GitHub answers 409 for empty repositories
            Err(ShowcaseError::Conflict(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let commits: Vec<GitHubCommit> = response.json().await?;
        Ok(commits.into_iter().next())
    }
}

/// Which repository listing endpoint an owner is served from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerKind {
    Organization,
    User,
}

impl OwnerKind {
    fn path_segment(self) -> &'static str {
        match self {
            OwnerKind::Organization => "orgs",
            OwnerKind::User => "users",
        }
    }
}

fn header_number<T: std::str::FromStr>(response: &Response, name: &str) -> Option<T> {
    response
        .headers()
        .get(name)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<T>().ok())
}
