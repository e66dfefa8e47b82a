//! File-level upload checkpoints.
//!
//! A single JSON document records which input files have been uploaded in
//! full:
//!
//! ```json
//! { "uploadedFiles": ["/data/a.csv"], "lastUpdated": "2024-05-01T12:00:00Z" }
//! ```
//!
//! Every operation reads the whole document and every mutation writes it
//! back, via a temp file and rename so an interrupted write leaves the
//! previous document intact. There is no cross-process locking; only one
//! uploader may use a checkpoint file at a time.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckpointDocument {
    #[serde(default)]
    uploaded_files: Vec<String>,
    last_updated: DateTime<Utc>,
}

impl CheckpointDocument {
    fn empty() -> Self {
        Self {
            uploaded_files: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckpointStats {
    pub total_checkpointed: usize,
    pub last_updated: DateTime<Utc>,
}

/// Handle on a checkpoint document at a fixed path.
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `file` has been fully uploaded.
    pub async fn is_file_checkpointed(&self, file: &Path) -> Result<bool> {
        let key = file_key(file)?;
        let doc = self.load().await?;
        Ok(doc.uploaded_files.iter().any(|f| *f == key))
    }

    /// Record `file` as uploaded. Adding a file twice keeps one entry.
    pub async fn checkpoint_file(&self, file: &Path) -> Result<()> {
        let key = file_key(file)?;
        let mut doc = self.load().await?;
        if !doc.uploaded_files.contains(&key) {
            doc.uploaded_files.push(key);
        }
        doc.last_updated = Utc::now();
        self.save(&doc).await
    }

    pub async fn checkpointed_files(&self) -> Result<Vec<PathBuf>> {
        let doc = self.load().await?;
        Ok(doc.uploaded_files.into_iter().map(PathBuf::from).collect())
    }

    /// Forget every checkpointed file.
    pub async fn clear(&self) -> Result<()> {
        self.save(&CheckpointDocument::empty()).await
    }

    pub async fn stats(&self) -> Result<CheckpointStats> {
        let doc = self.load().await?;
        Ok(CheckpointStats {
            total_checkpointed: doc.uploaded_files.len(),
            last_updated: doc.last_updated,
        })
    }

    /// Read the document, creating an empty one if none exists yet.
    async fn load(&self) -> Result<CheckpointDocument> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("corrupt checkpoint file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let doc = CheckpointDocument::empty();
                self.save(&doc).await?;
                tracing::debug!(path = %self.path.display(), "created empty checkpoint");
                Ok(doc)
            }
            Err(e) => Err(e)
                .with_context(|| format!("failed to read checkpoint {}", self.path.display())),
        }
    }

    async fn save(&self, doc: &CheckpointDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(doc)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace checkpoint {}", self.path.display()))?;
        Ok(())
    }
}

/// Checkpoint key for a file: its absolute path.
fn file_key(file: &Path) -> Result<String> {
    let absolute = if file.is_absolute() {
        file.to_path_buf()
    } else {
        std::env::current_dir()
            .context("failed to resolve current directory")?
            .join(file)
    };
    Ok(absolute.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store(tmp: &TempDir) -> CheckpointStore {
        CheckpointStore::new(tmp.path().join("state").join("checkpoint.json"))
    }

    #[tokio::test]
    async fn first_read_creates_empty_document() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        assert!(!store.path().exists());

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_checkpointed, 0);
        assert!(store.path().exists());

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
        assert!(raw["uploadedFiles"].as_array().unwrap().is_empty());
        assert!(raw["lastUpdated"].is_string());
    }

    #[tokio::test]
    async fn checkpoint_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        let file = tmp.path().join("a.csv");

        store.checkpoint_file(&file).await.unwrap();
        store.checkpoint_file(&file).await.unwrap();

        let files = store.checkpointed_files().await.unwrap();
        assert_eq!(files, vec![file.clone()]);
        assert!(store.is_file_checkpointed(&file).await.unwrap());
        assert!(!store
            .is_file_checkpointed(&tmp.path().join("b.csv"))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn state_survives_a_new_handle() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("a.csv");
        store(&tmp).checkpoint_file(&file).await.unwrap();

        let reopened = store(&tmp);
        assert!(reopened.is_file_checkpointed(&file).await.unwrap());
        assert_eq!(reopened.stats().await.unwrap().total_checkpointed, 1);
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        store.checkpoint_file(&tmp.path().join("a.csv")).await.unwrap();
        store.checkpoint_file(&tmp.path().join("b.csv")).await.unwrap();
        assert_eq!(store.stats().await.unwrap().total_checkpointed, 2);

        store.clear().await.unwrap();
        assert!(store.checkpointed_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_existing_document_format() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(
            store.path(),
            r#"{"uploadedFiles":["/data/leads/a.csv"],"lastUpdated":"2024-05-01T12:00:00.000Z"}"#,
        )
        .unwrap();

        assert!(store
            .is_file_checkpointed(Path::new("/data/leads/a.csv"))
            .await
            .unwrap());
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.last_updated.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(store.stats().await.is_err());
    }
}
