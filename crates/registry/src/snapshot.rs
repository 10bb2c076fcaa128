//! SnapshotFile - durable JSON backing for the registry
//!
//! The whole table is rewritten on every change: written to a sibling temp
//! file, then renamed over the target.

use contracts::{ContractError, Subscriber};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotDocument {
    version: u32,
    subscribers: Vec<Subscriber>,
}

/// JSON snapshot of the subscriber table
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored table; a missing file is an empty table
    #[instrument(name = "registry_snapshot_load", skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<Vec<Subscriber>, ContractError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no snapshot yet, starting empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(self.error(e)),
        };

        let document: SnapshotDocument =
            serde_json::from_slice(&bytes).map_err(|e| self.error(e))?;
        if document.version != SNAPSHOT_VERSION {
            return Err(self.error(format!(
                "unsupported snapshot version {}",
                document.version
            )));
        }
        Ok(document.subscribers)
    }

    /// Replace the stored table
    #[instrument(
        name = "registry_snapshot_store",
        skip(self, subscribers),
        fields(path = %self.path.display(), subscribers = subscribers.len())
    )]
    pub async fn store(&self, subscribers: Vec<Subscriber>) -> Result<(), ContractError> {
        let document = SnapshotDocument {
            version: SNAPSHOT_VERSION,
            subscribers,
        };
        let bytes = serde_json::to_vec_pretty(&document).map_err(|e| self.error(e))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.error(e))?;
        }

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| self.error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.error(e))?;
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn error(&self, e: impl ToString) -> ContractError {
        ContractError::persistence(self.path.display().to_string(), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("registry.json"));
        assert!(file.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let file = SnapshotFile::new(dir.path().join("nested").join("registry.json"));

        file.store(vec![Subscriber::new("u1", "tok-A")]).await.unwrap();
        let loaded = file.load().await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].identity, "u1");
        assert!(!dir.path().join("nested").join("registry.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, b"{not json").unwrap();

        let err = SnapshotFile::new(&path).load().await.unwrap_err();
        assert!(matches!(err, ContractError::Persistence { .. }));
    }
}
