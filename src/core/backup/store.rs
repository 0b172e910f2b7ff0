//! Snapshot files on local disk
//!
//! One pretty-printed JSON file per snapshot, named `<backup_id>.json`.

use super::snapshot::{BackupMetadata, BackupSnapshot};
use crate::domain::{Result, TableSyncError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

/// Directory of snapshot files
#[derive(Debug, Clone)]
pub struct BackupStore {
    directory: PathBuf,
}

/// Metadata-only view used when listing
#[derive(Deserialize)]
struct MetadataOnly {
    metadata: BackupMetadata,
}

impl BackupStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Writes a snapshot, creating the directory if needed
    pub async fn save(&self, snapshot: &BackupSnapshot) -> Result<PathBuf> {
        let path = self.path_for(&snapshot.metadata.backup_id)?;
        tokio::fs::create_dir_all(&self.directory).await?;
        let contents = serde_json::to_string_pretty(snapshot)?;
        tokio::fs::write(&path, contents).await?;

        tracing::info!(
            backup_id = %snapshot.metadata.backup_id,
            path = %path.display(),
            records = snapshot.total_records(),
            "Backup written"
        );
        Ok(path)
    }

    /// Loads a snapshot by id
    ///
    /// An exact id is tried first; otherwise a unique file whose name
    /// contains `backup_id` is accepted.
    ///
    /// # Errors
    ///
    /// Fails when no snapshot or more than one snapshot matches, or when the
    /// file cannot be parsed.
    pub async fn load(&self, backup_id: &str) -> Result<BackupSnapshot> {
        let path = self.resolve(backup_id).await?;
        let contents = tokio::fs::read_to_string(&path).await?;
        serde_json::from_str(&contents).map_err(|e| {
            TableSyncError::Backup(format!("Failed to parse backup {}: {}", path.display(), e))
        })
    }

    /// Metadata of every readable snapshot, newest first
    ///
    /// Files that do not parse are skipped with a warning.
    pub async fn list(&self) -> Result<Vec<BackupMetadata>> {
        let mut backups = Vec::new();
        for path in self.snapshot_files().await? {
            let parsed = tokio::fs::read_to_string(&path)
                .await
                .map_err(TableSyncError::from)
                .and_then(|contents| Ok(serde_json::from_str::<MetadataOnly>(&contents)?));
            match parsed {
                Ok(entry) => backups.push(entry.metadata),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable backup file");
                }
            }
        }
        backups.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(backups)
    }

    /// Removes a snapshot; `false` when it did not exist
    ///
    /// # Errors
    ///
    /// Rejects ids that would name a file outside the backup directory.
    pub async fn delete(&self, backup_id: &str) -> Result<bool> {
        let path = self.path_for(backup_id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn path_for(&self, backup_id: &str) -> Result<PathBuf> {
        validate_backup_id(backup_id)?;
        Ok(self.directory.join(format!("{backup_id}.{EXTENSION}")))
    }

    async fn resolve(&self, backup_id: &str) -> Result<PathBuf> {
        let exact = self.path_for(backup_id)?;
        if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
            return Ok(exact);
        }

        let mut matches: Vec<PathBuf> = self
            .snapshot_files()
            .await?
            .into_iter()
            .filter(|path| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .is_some_and(|stem| stem.contains(backup_id))
            })
            .collect();

        match matches.len() {
            1 => Ok(matches.remove(0)),
            0 => Err(TableSyncError::Backup(format!(
                "No backup matching '{backup_id}' in {}",
                self.directory.display()
            ))),
            n => Err(TableSyncError::Backup(format!(
                "'{backup_id}' matches {n} backups; use the full id"
            ))),
        }
    }

    async fn snapshot_files(&self) -> Result<Vec<PathBuf>> {
        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// Ids are plain file stems: no separators, no `..`, not empty
fn validate_backup_id(backup_id: &str) -> Result<()> {
    let invalid = backup_id.trim().is_empty()
        || backup_id.contains(&['/', '\\'][..])
        || backup_id.contains("..")
        || backup_id.chars().any(char::is_control);
    if invalid {
        return Err(TableSyncError::Backup(format!("Invalid backup id '{backup_id}'")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::backup::snapshot::{new_backup_id, SnapshotData};
    use tempfile::TempDir;

    fn snapshot(id: &str) -> BackupSnapshot {
        let mut data = SnapshotData::new();
        data.insert("Patients".to_string(), Vec::new());
        BackupSnapshot::new(id.to_string(), "test", data, Vec::new()).unwrap()
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("nested"));
        let original = snapshot(&new_backup_id());

        let path = store.save(&original).await.unwrap();
        assert!(path.exists());

        let loaded = store.load(&original.metadata.backup_id).await.unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn test_load_by_unique_fragment() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        store.save(&snapshot("backup-1-aaaa")).await.unwrap();
        store.save(&snapshot("backup-2-bbbb")).await.unwrap();

        let loaded = store.load("bbbb").await.unwrap();
        assert_eq!(loaded.metadata.backup_id, "backup-2-bbbb");

        assert!(store.load("backup-").await.is_err());
        assert!(store.load("zzzz").await.is_err());
    }

    #[tokio::test]
    async fn test_list_newest_first_and_skips_garbage() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        store.save(&snapshot("backup-1-old")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.save(&snapshot("backup-2-new")).await.unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();

        let listed = store.list().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|m| m.backup_id.as_str()).collect();
        assert_eq!(ids, vec!["backup-2-new", "backup-1-old"]);
    }

    #[tokio::test]
    async fn test_list_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path().join("absent"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = BackupStore::new(dir.path());
        store.save(&snapshot("backup-1-x")).await.unwrap();
        assert!(store.delete("backup-1-x").await.unwrap());
        assert!(!store.delete("backup-1-x").await.unwrap());
    }

    #[tokio::test]
    async fn test_ids_outside_directory_are_rejected() {
        let root = TempDir::new().unwrap();
        let outside = root.path().join("victim.json");
        std::fs::write(&outside, "{}").unwrap();
        let store = BackupStore::new(root.path().join("backups"));

        for id in ["../victim", "a/b", "a\\b", "..", ""] {
            assert!(
                matches!(store.delete(id).await, Err(TableSyncError::Backup(_))),
                "{id:?} accepted"
            );
            assert!(store.load(id).await.is_err());
        }
        assert!(outside.exists());
        assert!(store.save(&snapshot("../victim")).await.is_err());
    }
}
