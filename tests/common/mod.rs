#![allow(dead_code)]

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use repo_showcase::config::GitHubConfig;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the fake GitHub API should answer
#[derive(Clone, Default)]
pub struct MockGitHub {
    pub profile: Option<Value>,
    /// Serve repositories from `/orgs/{owner}/repos`; otherwise only the user endpoint answers
    pub is_org: bool,
    pub repos: Vec<Value>,
    /// Repositories whose commit lookup fails with 500
    pub failing_commits: HashSet<String>,
    /// Repositories with no history (409)
    pub empty_repos: HashSet<String>,
    /// Repositories whose last commit has no linked account
    pub unlinked_authors: HashSet<String>,
    /// Delay before answering commit lookups
    pub commit_delay: Option<Duration>,
    /// Answer 500 on the profile endpoint
    pub profile_fails: bool,
    /// Answer 403 with an exhausted, already expired rate limit on the profile endpoint
    pub profile_rate_limited: bool,
    /// Answer 500 on whichever repository list endpoint serves the owner
    pub repos_fail: bool,
}

/// Requests seen by the mock, for assertions
#[derive(Clone, Default)]
pub struct RequestLog {
    pub paths: Arc<Mutex<Vec<String>>>,
    pub authorization: Arc<Mutex<Vec<Option<String>>>>,
}

impl RequestLog {
    pub fn paths(&self) -> Vec<String> {
        self.paths.lock().unwrap().clone()
    }

    pub fn authorization(&self) -> Vec<Option<String>> {
        self.authorization.lock().unwrap().clone()
    }

    fn record(&self, path: String, headers: &HeaderMap) {
        self.paths.lock().unwrap().push(path);
        self.authorization.lock().unwrap().push(
            headers
                .get("authorization")
                .and_then(|h| h.to_str().ok())
                .map(str::to_string),
        );
    }
}

#[derive(Clone)]
struct MockState {
    mock: Arc<MockGitHub>,
    log: RequestLog,
}

pub struct MockServer {
    pub base_url: String,
    pub log: RequestLog,
}

impl MockServer {
    pub async fn start(mock: MockGitHub) -> anyhow::Result<Self> {
        let log = RequestLog::default();
        let state = MockState {
            mock: Arc::new(mock),
            log: log.clone(),
        };

        let app = Router::new()
            .route("/users/:owner", get(profile))
            .route("/users/:owner/repos", get(user_repos))
            .route("/orgs/:owner/repos", get(org_repos))
            .route("/repos/:owner/:repo/commits", get(commits))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(MockServer {
            base_url: format!("http://{}", addr),
            log,
        })
    }

    /// Client settings pointed at this mock, with fast retries
    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            request_timeout: Duration::from_secs(5),
            retry_backoff: Duration::from_millis(10),
            max_retries: 1,
            ..GitHubConfig::default()
        }
        .with_api_base(&self.base_url)
        .expect("mock base URL is valid")
    }
}

/// A URL nothing is listening on
pub async fn unreachable_base_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn repo_json(id: u64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "full_name": format!("acme/{}", name),
        "html_url": format!("https://github.com/acme/{}", name),
        "description": format!("The {} project", name),
        "language": "Rust",
        "topics": ["showcase"],
        "pushed_at": "2024-05-01T12:00:00Z",
        "size": 2048,
        "stargazers_count": id,
        "url": format!("https://api.github.com/repos/acme/{}", name),
    })
}

pub fn profile_json() -> Value {
    json!({
        "login": "acme",
        "name": "Acme Corp",
        "avatar_url": "https://avatars.example/acme.png",
        "bio": "We build things",
        "public_repos": 3,
    })
}

async fn profile(
    State(state): State<MockState>,
    Path(owner): Path<String>,
    headers: HeaderMap,
) -> Response {
    state.log.record(format!("/users/{}", owner), &headers);
    if state.mock.profile_fails {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if state.mock.profile_rate_limited {
        return (
            StatusCode::FORBIDDEN,
            [("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", "0")],
            Json(json!({"message": "API rate limit exceeded"})),
        )
            .into_response();
    }
    match &state.mock.profile {
        Some(profile) => Json(profile.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

fn page_of(repos: &[Value], params: &HashMap<String, String>) -> Vec<Value> {
    let per_page: usize = params.get("per_page").and_then(|v| v.parse().ok()).unwrap_or(30);
    let page: usize = params.get("page").and_then(|v| v.parse().ok()).unwrap_or(1);
    repos
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .cloned()
        .collect()
}

async fn user_repos(
    State(state): State<MockState>,
    Path(owner): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.log.record(format!("/users/{}/repos", owner), &headers);
    if state.mock.profile.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    if state.mock.repos_fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(page_of(&state.mock.repos, &params)).into_response()
}

async fn org_repos(
    State(state): State<MockState>,
    Path(owner): Path<String>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    state.log.record(format!("/orgs/{}/repos", owner), &headers);
    if !state.mock.is_org {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response();
    }
    if state.mock.repos_fail {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    Json(page_of(&state.mock.repos, &params)).into_response()
}

async fn commits(
    State(state): State<MockState>,
    Path((owner, repo)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    state.log.record(format!("/repos/{}/{}/commits", owner, repo), &headers);
    if let Some(delay) = state.mock.commit_delay {
        tokio::time::sleep(delay).await;
    }
    if state.mock.failing_commits.contains(&repo) {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    if state.mock.empty_repos.contains(&repo) {
        return (
            StatusCode::CONFLICT,
            Json(json!({"message": "Git Repository is empty."})),
        )
            .into_response();
    }

    let author = if state.mock.unlinked_authors.contains(&repo) {
        Value::Null
    } else {
        json!({
            "login": format!("{}-dev", repo),
            "avatar_url": format!("https://avatars.example/{}-dev.png", repo),
        })
    };

    Json(json!([{
        "sha": "abc123",
        "author": author,
        "commit": { "author": { "name": format!("{} Author", repo) } },
    }]))
    .into_response()
}
