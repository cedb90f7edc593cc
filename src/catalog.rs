//! Showcase presentation logic: search, tag filtering, sorting, the featured
//! split and card formatting.
//!
//! Everything here is a pure function of a [`ViewState`] and an already
//! fetched snapshot. Interactions produce a new `ViewState`; renderers call
//! [`render`] again with it.

use crate::error::Result;
use crate::models::{Repository, Snapshot};
use chrono::{DateTime, Datelike, Utc};
use clap::ValueEnum;
use std::cmp::Ordering;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_BIO: &str = "Interactive web design projects";
pub const FALLBACK_LANGUAGE_COLOR: &str = "#ccc";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    #[default]
    Name,
    Updated,
    Size,
    Stars,
}

/// Where a card links to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LinkTarget {
    #[default]
    Repository,
    Pages,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub search: String,
    pub tag: Option<String>,
    pub sort: SortKey,
    pub link: LinkTarget,
}

impl ViewState {
    pub fn with_search(self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..self
        }
    }

    /// Selecting a tag resets the free-text search.
    pub fn with_tag(self, tag: impl Into<String>) -> Self {
        Self {
            tag: Some(tag.into()),
            search: String::new(),
            ..self
        }
    }

    pub fn clear_tag(self) -> Self {
        Self { tag: None, ..self }
    }

    pub fn with_sort(self, sort: SortKey) -> Self {
        Self { sort, ..self }
    }

    pub fn with_link(self, link: LinkTarget) -> Self {
        Self { link, ..self }
    }
}

/// Filtered, sorted repositories split into featured and the rest
#[derive(Debug)]
pub struct CatalogView<'a> {
    pub featured: Vec<&'a Repository>,
    pub others: Vec<&'a Repository>,
}

impl CatalogView<'_> {
    pub fn is_empty(&self) -> bool {
        self.featured.is_empty() && self.others.is_empty()
    }
}

pub fn render<'a>(repos: &'a [Repository], pinned: &[String], state: &ViewState) -> CatalogView<'a> {
    let mut visible: Vec<&Repository> = repos.iter().filter(|r| matches(r, state)).collect();
    sort_repos(&mut visible, state.sort);

    let (featured, others): (Vec<_>, Vec<_>) = visible
        .into_iter()
        .partition(|r| pinned.iter().any(|p| p == &r.name));

    CatalogView { featured, others }
}

pub fn matches(repo: &Repository, state: &ViewState) -> bool {
    let search = state.search.to_lowercase();
    let matches_search = repo.name.to_lowercase().contains(&search)
        || repo
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&search));

    if !matches_search {
        return false;
    }

    match &state.tag {
        Some(tag) => {
            let tag = tag.to_lowercase();
            let has_topic = repo.topics.iter().any(|t| t == &tag);
            let is_language = repo
                .language
                .as_deref()
                .is_some_and(|l| l.to_lowercase() == tag);
            has_topic || is_language
        }
        None => true,
    }
}

/// Stable sort; every key except `Name` is descending.
pub fn sort_repos(repos: &mut [&Repository], key: SortKey) {
    repos.sort_by(|a, b| match key {
        // None sorts below any timestamp, so reversing puts it last
        SortKey::Updated => b.pushed_at.cmp(&a.pushed_at),
        SortKey::Size => b.size.cmp(&a.size),
        SortKey::Stars => b.stargazers_count.cmp(&a.stargazers_count),
        SortKey::Name => compare_names(&a.name, &b.name),
    });
}

/// Names starting with a digit come first, then uppercase, then lowercase,
/// then anything else. Within a group: case-insensitive, lowercase first on ties.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    fn category(name: &str) -> u8 {
        match name.chars().next() {
            Some(c) if c.is_ascii_digit() => 0,
            Some(c) if c.is_ascii_uppercase() => 1,
            Some(c) if c.is_ascii_lowercase() => 2,
            _ => 3,
        }
    }

    category(a)
        .cmp(&category(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| b.cmp(a))
}

pub fn format_size(kb: u64) -> String {
    if kb < 1024 {
        format!("{} KB", kb)
    } else {
        format!("{:.1} MB", kb as f64 / 1024.0)
    }
}

pub fn format_age(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(at);
    let seconds = elapsed.num_seconds();
    let minutes = elapsed.num_minutes();
    let hours = elapsed.num_hours();
    let days = elapsed.num_days();

    if seconds < 60 {
        "just now".to_string()
    } else if minutes < 60 {
        format!("{} minutes ago", minutes)
    } else if hours < 24 {
        format!("{} hours ago", hours)
    } else if days <= 7 {
        format!("{} days ago", days)
    } else {
        format!("{}/{:02}/{:02}", at.year(), at.month(), at.day())
    }
}

pub fn language_color(language: &str) -> &'static str {
    match language {
        "JavaScript" => "#f1e05a",
        "Python" => "#3572A5",
        "HTML" => "#e34c26",
        "CSS" => "#563d7c",
        "Vue" => "#41b883",
        "TypeScript" => "#2b7489",
        "Java" => "#b07219",
        "Shell" => "#89e051",
        "C++" => "#f34b7d",
        "PHP" => "#4F5D95",
        "Rust" => "#dea584",
        _ => FALLBACK_LANGUAGE_COLOR,
    }
}

/// URL a card opens: the repository page or the owner's GitHub Pages site.
pub fn card_link(repo: &Repository, link: LinkTarget, owner: &str) -> Option<String> {
    match link {
        LinkTarget::Repository => repo.html_url.clone(),
        LinkTarget::Pages => Some(format!(
            "https://{}.github.io/{}",
            owner.to_lowercase(),
            repo.name
        )),
    }
}

/// Header figures with display defaults filled in
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSummary {
    pub name: String,
    pub bio: String,
    pub public_repos: u64,
    pub total_stars: u64,
}

impl ProfileSummary {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let profile = &snapshot.profile;
        let public_repos = if profile.public_repos > 0 {
            profile.public_repos
        } else {
            snapshot.repos.len() as u64
        };

        Self {
            name: profile.name.clone(),
            bio: profile.bio.clone().unwrap_or_else(|| DEFAULT_BIO.to_string()),
            public_repos,
            total_stars: snapshot.repos.iter().map(|r| r.stargazers_count).sum(),
        }
    }
}

/// Pinned repository names from a JSON array. A missing or malformed file
/// yields an empty list.
pub async fn load_pinned(path: &Path) -> Vec<String> {
    match read_pinned(path).await {
        Ok(names) => names,
        Err(e) => {
            warn!(path = %path.display(), "Could not load pinned names: {}", e);
            Vec::new()
        }
    }
}

async fn read_pinned(path: &Path) -> Result<Vec<String>> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
