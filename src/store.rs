use crate::error::Result;
use crate::models::Snapshot;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// On-disk home of the snapshot file.
///
/// Writes go to a sibling temp file that is renamed over the target, so a
/// reader sees either the previous snapshot or the new one, never a mix.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

#[derive(Deserialize)]
struct GeneratedAt {
    generated_at: DateTime<Utc>,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot.json"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Raw snapshot bytes, exactly as stored.
    pub async fn read_bytes(&self) -> Result<Vec<u8>> {
        Ok(fs::read(&self.path).await?)
    }

    pub async fn load(&self) -> Result<Snapshot> {
        let bytes = self.read_bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `generated_at` of the stored snapshot, if one exists and parses.
    pub async fn last_generated_at(&self) -> Option<DateTime<Utc>> {
        let bytes = self.read_bytes().await.ok()?;
        serde_json::from_slice::<GeneratedAt>(&bytes)
            .ok()
            .map(|g| g.generated_at)
    }

    /// Serialize and atomically replace the stored snapshot.
    pub async fn write(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = fs::rename(&temp_path, &self.path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "Snapshot written");
        Ok(())
    }
}
