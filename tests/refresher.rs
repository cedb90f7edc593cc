mod common;

use common::{profile_json, repo_json, unreachable_base_url, MockGitHub, MockServer};
use repo_showcase::config::{GitHubConfig, RefreshConfig};
use repo_showcase::models::{Snapshot, GHOST_AVATAR_URL};
use repo_showcase::refresher::Refresher;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

/// The directory guard must outlive the test body.
fn temp_snapshot_path() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("data.json");
    (dir, path)
}

fn refresher_for(server: &MockServer, path: &PathBuf) -> Refresher {
    let config = RefreshConfig::new("acme", server.github_config(), path.clone())
        .expect("valid config")
        .with_concurrency(4);
    Refresher::new(config).expect("Failed to create refresher")
}

#[tokio::test]
async fn test_failed_lookups_keep_every_repository() {
    let names = ["alpha", "beta", "gamma", "delta", "epsilon"];
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: names.iter().enumerate().map(|(i, n)| repo_json(i as u64 + 1, n)).collect(),
        failing_commits: HashSet::from(["beta".to_string(), "delta".to_string()]),
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    let refresher = refresher_for(&server, &path);
    let report = refresher.run().await.expect("refresh failed");

    assert_eq!(report.repo_count, 5);
    assert_eq!(report.maintainers_resolved, 3);

    let snapshot: Snapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    let order: Vec<&str> = snapshot.repos.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(order, names.to_vec());

    let beta = &snapshot.repos[1];
    assert!(beta.maintainer.is_none());
    assert_eq!(beta.id, 2);
    assert_eq!(beta.html_url.as_deref(), Some("https://github.com/acme/beta"));
    assert_eq!(beta.description.as_deref(), Some("The beta project"));
    assert_eq!(beta.topics, vec!["showcase".to_string()]);
    assert_eq!(beta.size, 2048);

    let alpha = snapshot.repos[0].maintainer.as_ref().expect("alpha has a maintainer");
    assert_eq!(alpha.name, "alpha-dev");
    assert_eq!(alpha.avatar, "https://avatars.example/alpha-dev.png");
}

#[tokio::test]
async fn test_missing_maintainer_serialized_as_null() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "empty")],
        empty_repos: HashSet::from(["empty".to_string()]),
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    assert_ok!(refresher_for(&server, &path).run().await);

    let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["repos"][0]["maintainer"], Value::Null);
    assert_eq!(raw["repos"][0]["name"], json!("empty"));
}

#[tokio::test]
async fn test_unlinked_commit_author_uses_git_name() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "legacy")],
        unlinked_authors: HashSet::from(["legacy".to_string()]),
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    let snapshot = refresher_for(&server, &path)
        .build_snapshot()
        .await
        .expect("build failed");

    let maintainer = snapshot.repos[0].maintainer.as_ref().expect("maintainer present");
    assert_eq!(maintainer.name, "legacy Author");
    assert_eq!(maintainer.avatar, GHOST_AVATAR_URL);
    // build_snapshot never writes
    assert!(!path.exists());
}

#[tokio::test]
async fn test_empty_repository_list() {
    let server = MockServer::start(MockGitHub {
        profile: Some(json!({ "login": "acme" })),
        is_org: true,
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    let report = refresher_for(&server, &path).run().await.expect("refresh failed");
    assert_eq!(report.repo_count, 0);

    let raw: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["repos"], json!([]));
    // defaults substituted for the sparse profile
    assert_eq!(raw["profile"]["name"], json!("acme"));
    assert_eq!(raw["profile"]["avatar_url"], json!("https://github.com/acme.png"));
    assert_eq!(raw["profile"]["public_repos"], json!(0));
}

#[tokio::test]
async fn test_duplicate_ids_are_dropped() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "alpha"), repo_json(2, "beta"), repo_json(1, "alpha")],
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    let snapshot = refresher_for(&server, &path).build_snapshot().await.expect("build failed");

    let ids: Vec<u64> = snapshot.repos.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2]);
}

#[tokio::test]
async fn test_unreachable_api_leaves_snapshot_untouched() {
    let (_dir, path) = temp_snapshot_path();
    let original = br#"{"generated_at":"2024-01-01T00:00:00Z","profile":{},"repos":[]}"#;
    std::fs::write(&path, original).unwrap();

    let github = GitHubConfig::default()
        .with_api_base(&unreachable_base_url().await)
        .expect("valid base URL");
    let config = RefreshConfig::new("acme", github, path.clone()).expect("valid config");
    let refresher = Refresher::new(config).expect("Failed to create refresher");

    assert_err!(refresher.run().await);
    assert_eq!(std::fs::read(&path).unwrap(), original.to_vec());
}

#[tokio::test]
async fn test_profile_failure_aborts_without_writing() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        profile_fails: true,
        is_org: true,
        repos: vec![repo_json(1, "alpha")],
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    assert_err!(refresher_for(&server, &path).run().await);
    assert!(!path.exists());
}

const EXISTING_SNAPSHOT: &[u8] =
    br#"{"generated_at":"2024-01-01T00:00:00Z","profile":{"name":"acme","avatar_url":"https://github.com/acme.png","bio":null,"public_repos":0},"repos":[]}"#;

#[tokio::test]
async fn test_org_list_failure_leaves_snapshot_untouched() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "alpha")],
        repos_fail: true,
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    std::fs::write(&path, EXISTING_SNAPSHOT).unwrap();

    assert_err!(refresher_for(&server, &path).run().await);
    assert_eq!(std::fs::read(&path).unwrap(), EXISTING_SNAPSHOT.to_vec());
    assert!(!server.log.paths().iter().any(|p| p.contains("/commits")));
}

#[tokio::test]
async fn test_user_list_failure_after_fallback_leaves_snapshot_untouched() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        repos: vec![repo_json(1, "alpha")],
        repos_fail: true,
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    std::fs::write(&path, EXISTING_SNAPSHOT).unwrap();

    assert_err!(refresher_for(&server, &path).run().await);
    assert_eq!(std::fs::read(&path).unwrap(), EXISTING_SNAPSHOT.to_vec());

    let paths = server.log.paths();
    assert!(paths.contains(&"/orgs/acme/repos".to_string()));
    assert!(paths.contains(&"/users/acme/repos".to_string()));
}

#[tokio::test]
async fn test_generated_at_strictly_increases() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "alpha")],
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    let refresher = refresher_for(&server, &path);

    let first = refresher.run().await.expect("first refresh failed");
    let second = refresher.run().await.expect("second refresh failed");
    let third = refresher.run().await.expect("third refresh failed");

    assert!(second.generated_at > first.generated_at);
    assert!(third.generated_at > second.generated_at);

    let stored = refresher.store().load().await.expect("snapshot readable");
    assert_eq!(stored.generated_at, third.generated_at);
}

#[tokio::test]
async fn test_no_temp_file_left_behind() {
    let server = MockServer::start(MockGitHub {
        profile: Some(profile_json()),
        is_org: true,
        repos: vec![repo_json(1, "alpha")],
        ..Default::default()
    })
    .await
    .expect("Failed to start mock");

    let (_dir, path) = temp_snapshot_path();
    assert_ok!(refresher_for(&server, &path).run().await);

    let entries: Vec<String> = std::fs::read_dir(path.parent().unwrap())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["data.json".to_string()]);
}
