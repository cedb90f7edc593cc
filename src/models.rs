use crate::types::{GitHubCommit, GitHubProfile, GitHubRepo};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Avatar used when a commit has no linked GitHub account.
pub const GHOST_AVATAR_URL: &str = "https://github.com/ghost.png";
pub const GHOST_LOGIN: &str = "ghost";

/// Organization or user profile shown in the showcase header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub avatar_url: String,
    pub bio: Option<String>,
    pub public_repos: u64,
}

impl Profile {
    /// Builds the profile from the API resource, substituting defaults for
    /// missing fields. `repo_count` backs `public_repos`.
    pub fn from_api(profile: GitHubProfile, owner: &str, repo_count: usize) -> Self {
        let name = profile
            .name
            .filter(|n| !n.trim().is_empty())
            .or(profile.login)
            .unwrap_or_else(|| owner.to_string());

        Self {
            name,
            avatar_url: profile
                .avatar_url
                .unwrap_or_else(|| format!("https://github.com/{}.png", owner)),
            bio: profile.bio.filter(|b| !b.trim().is_empty()),
            public_repos: profile.public_repos.unwrap_or(repo_count as u64),
        }
    }
}

/// Author of a repository's most recent commit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Maintainer {
    pub name: String,
    pub avatar: String,
}

impl Maintainer {
    /// Prefers the linked GitHub account; falls back to the raw git author
    /// name, or the `ghost` placeholder when the commit carries no name at all.
    pub fn from_commit(commit: &GitHubCommit) -> Self {
        if let Some(author) = &commit.author {
            return Self {
                name: author.login.clone(),
                avatar: author
                    .avatar_url
                    .clone()
                    .unwrap_or_else(|| GHOST_AVATAR_URL.to_string()),
            };
        }

        let name = commit
            .commit
            .author
            .as_ref()
            .and_then(|a| a.name.clone())
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| GHOST_LOGIN.to_string());

        Self {
            name,
            avatar: GHOST_AVATAR_URL.to_string(),
        }
    }
}

/// Repository record as published in the snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub html_url: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub stargazers_count: u64,
    pub maintainer: Option<Maintainer>,
}

impl Repository {
    pub fn from_api(repo: GitHubRepo, maintainer: Option<Maintainer>) -> Self {
        Self {
            id: repo.id,
            name: repo.name,
            html_url: repo.html_url,
            description: repo.description,
            language: repo.language,
            topics: repo.topics.unwrap_or_default(),
            pushed_at: repo.pushed_at,
            size: repo.size.unwrap_or(0),
            stargazers_count: repo.stargazers_count.unwrap_or(0),
            maintainer,
        }
    }
}

/// The single persisted artifact, replaced wholesale on every refresh
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generated_at: DateTime<Utc>,
    pub profile: Profile,
    pub repos: Vec<Repository>,
}

/// Summary of a successful refresh run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshReport {
    pub generated_at: DateTime<Utc>,
    pub repo_count: usize,
    pub maintainers_resolved: usize,
    pub elapsed_ms: u64,
}

/// Timestamp for a new snapshot: `now` at millisecond precision, bumped past
/// `previous` so successive snapshots strictly increase.
pub fn next_generated_at(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    let now = now.trunc_subsecs(3);
    match previous {
        Some(prev) if now <= prev => prev.trunc_subsecs(3) + Duration::milliseconds(1),
        _ => now,
    }
}
