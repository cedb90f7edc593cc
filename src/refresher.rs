use crate::config::RefreshConfig;
use crate::error::Result;
use crate::github::GitHubClient;
use crate::models::{next_generated_at, Maintainer, Profile, RefreshReport, Repository, Snapshot};
use crate::store::SnapshotStore;
use crate::types::GitHubRepo;
use async_trait::async_trait;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

/// One unit of refresh work, as seen by the scheduler.
#[async_trait]
pub trait RefreshJob: Send + Sync {
    async fn refresh(&self) -> Result<RefreshReport>;
}

/// Fetches the profile and repositories, enriches them with maintainers and
/// publishes the resulting snapshot.
pub struct Refresher {
    client: GitHubClient,
    store: SnapshotStore,
    owner: String,
    concurrency: usize,
}

impl Refresher {
    pub fn new(config: RefreshConfig) -> Result<Self> {
        let client = GitHubClient::new(config.github)?;
        if !client.has_token() {
            warn!("No GITHUB_TOKEN configured, rate limits will be strict");
        }

        Ok(Self {
            client,
            store: SnapshotStore::new(config.snapshot_path),
            owner: config.owner,
            concurrency: config.concurrency.max(1),
        })
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Fetch and enrich everything without touching the stored snapshot.
    /// `generated_at` is set to the current time.
    pub async fn build_snapshot(&self) -> Result<Snapshot> {
        info!(owner = %self.owner, "Fetching profile");
        let profile = self.client.fetch_profile(&self.owner).await?;

        info!(owner = %self.owner, "Fetching repositories");
        let repos = dedup_by_id(self.client.list_repositories(&self.owner).await?);

        info!(count = repos.len(), "Found repositories, fetching maintainers");
        let repo_count = repos.len();
        let repos = self.enrich(repos).await;

        Ok(Snapshot {
            generated_at: Utc::now(),
            profile: Profile::from_api(profile, &self.owner, repo_count),
            repos,
        })
    }

    /// Full run: build, stamp and atomically publish. Nothing is written when
    /// the profile or repository list cannot be fetched.
    pub async fn run(&self) -> Result<RefreshReport> {
        let started = Instant::now();
        let mut snapshot = self.build_snapshot().await?;

        let previous = self.store.last_generated_at().await;
        snapshot.generated_at = next_generated_at(previous, snapshot.generated_at);
        self.store.write(&snapshot).await?;

        let report = RefreshReport {
            generated_at: snapshot.generated_at,
            repo_count: snapshot.repos.len(),
            maintainers_resolved: snapshot.repos.iter().filter(|r| r.maintainer.is_some()).count(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        info!(
            path = %self.store.path().display(),
            repos = report.repo_count,
            maintainers = report.maintainers_resolved,
            elapsed_ms = report.elapsed_ms,
            "Snapshot published"
        );
        Ok(report)
    }

    async fn enrich(&self, repos: Vec<GitHubRepo>) -> Vec<Repository> {
        stream::iter(repos)
            .map(|repo| async move {
                let maintainer = self.lookup_maintainer(&repo).await;
                Repository::from_api(repo, maintainer)
            })
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn lookup_maintainer(&self, repo: &GitHubRepo) -> Option<Maintainer> {
        let full_name = repo
            .full_name
            .clone()
            .unwrap_or_else(|| format!("{}/{}", self.owner, repo.name));
        let (owner, name) = full_name
            .split_once('/')
            .unwrap_or((self.owner.as_str(), repo.name.as_str()));

        match self.client.latest_commit(owner, name).await {
            Ok(Some(commit)) => Some(Maintainer::from_commit(&commit)),
            Ok(None) => {
                debug!(repo = %repo.name, "No commits");
                None
            }
            Err(e) => {
                warn!(repo = %repo.name, error = %e, "Failed to fetch maintainer");
                None
            }
        }
    }
}

#[async_trait]
impl RefreshJob for Refresher {
    async fn refresh(&self) -> Result<RefreshReport> {
        self.run().await
    }
}

/// Drops repeated ids (pagination can shift between pages), keeping the
/// first occurrence.
fn dedup_by_id(repos: Vec<GitHubRepo>) -> Vec<GitHubRepo> {
    let mut seen = HashSet::with_capacity(repos.len());
    repos
        .into_iter()
        .filter(|repo| {
            let fresh = seen.insert(repo.id);
            if !fresh {
                debug!(id = repo.id, name = %repo.name, "Dropping duplicate repository");
            }
            fresh
        })
        .collect()
}
