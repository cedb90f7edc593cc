use chrono::{DateTime, Utc};
use serde::Deserialize;

// GitHub API response structures

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubProfile {
    pub login: Option<String>,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub public_repos: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRepo {
    pub id: u64,
    pub name: String,
    pub full_name: Option<String>,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Option<Vec<String>>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub size: Option<u64>,
    pub stargazers_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommit {
    pub author: Option<GitHubCommitUser>,
    pub commit: GitHubCommitDetail,
}

/// The GitHub account linked to a commit, if any.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitUser {
    pub login: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubCommitDetail {
    pub author: Option<GitAuthor>,
}

/// Raw git author signature from the commit object.
#[derive(Debug, Clone, Deserialize)]
pub struct GitAuthor {
    pub name: Option<String>,
}
