use crate::catalog::{LinkTarget, SortKey};
use crate::config::{self, GitHubConfig, RefreshConfig, DEFAULT_API_URL};
use crate::error::Result;
use crate::schedule::{Schedule, SchedulePolicy};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "repo-showcase")]
#[command(about = "Repository showcase server - refreshes a GitHub owner's repository snapshot and serves it as JSON")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// GitHub organization or user to showcase
    #[arg(long, env = "GITHUB_OWNER", default_value = "1141RWD", global = true)]
    pub owner: String,

    /// Bearer token for the GitHub API (raises rate limits)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, global = true)]
    pub api_url: String,

    /// Snapshot file location
    #[arg(long, env = "SNAPSHOT_PATH", default_value = "data.json", global = true)]
    pub snapshot: PathBuf,

    /// Timeout for each GitHub API request, in seconds
    #[arg(long, default_value_t = 30, global = true)]
    pub request_timeout_secs: u64,

    /// Repositories per page when listing (max 100)
    #[arg(long, default_value_t = 100, global = true)]
    pub per_page: u32,

    /// Maximum number of repository pages to fetch
    #[arg(long, default_value_t = 10, global = true)]
    pub max_pages: u32,

    /// Concurrent maintainer lookups
    #[arg(long, default_value_t = 8, global = true)]
    pub concurrency: usize,

    #[command(flatten)]
    pub serve: ServeArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one refresh and exit; non-zero exit status on failure
    Refresh,
    /// Print the showcase from the current snapshot
    List(ListArgs),
}

/// Options for the default serve mode
#[derive(Args)]
pub struct ServeArgs {
    /// HTTP port (falls back to PORT, then 14105)
    #[arg(long, env = "SERVER_PORT")]
    pub port: Option<String>,

    #[arg(long, env = "PORT", hide = true)]
    pub fallback_port: Option<String>,

    /// Scheduling policy for refreshes
    #[arg(long, value_enum, default_value = "aligned")]
    pub schedule: SchedulePolicy,

    /// Refresh period in seconds
    #[arg(long, default_value_t = 300)]
    pub period_secs: u64,
}

#[derive(Args)]
pub struct ListArgs {
    /// Case-insensitive search on name and description
    #[arg(long, default_value = "")]
    pub search: String,

    /// Only repositories with this topic or language
    #[arg(long)]
    pub tag: Option<String>,

    #[arg(long, value_enum, default_value = "name")]
    pub sort: SortKey,

    #[arg(long, value_enum, default_value = "repository")]
    pub link: LinkTarget,

    /// JSON array of repository names to feature
    #[arg(long, default_value = "pinnings.json")]
    pub pinned: PathBuf,
}

impl Cli {
    pub fn refresh_config(&self) -> Result<RefreshConfig> {
        let github = GitHubConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            per_page: self.per_page,
            max_pages: self.max_pages.max(1),
            ..GitHubConfig::default()
        }
        .with_api_base(&self.api_url)?
        .with_token(self.token.clone());

        Ok(RefreshConfig::new(self.owner.clone(), github, self.snapshot.clone())?
            .with_concurrency(self.concurrency))
    }
}

impl ServeArgs {
    pub fn port(&self) -> Result<u16> {
        config::resolve_port(self.port.as_deref(), self.fallback_port.as_deref())
    }

    pub fn schedule(&self) -> Result<Schedule> {
        Schedule::new(self.schedule, Duration::from_secs(self.period_secs))
    }
}
