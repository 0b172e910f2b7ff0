//! Backup snapshot format

use super::checksum::calculate_checksum;
use crate::domain::{Result, TableSyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Wire entities per table, keys inline
pub type SnapshotData = BTreeMap<String, Vec<Map<String, Value>>>;

/// Description of a snapshot, stored next to its data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub backup_id: String,
    pub timestamp: DateTime<Utc>,
    pub tables: Vec<String>,
    pub record_counts: BTreeMap<String, usize>,
    /// Tables whose scan did not reach the end of the table
    #[serde(default)]
    pub incomplete_tables: Vec<String>,
    pub created_by: String,
    /// SHA-256 of the canonical `data` section
    pub checksum: String,
}

/// A full backup: metadata plus every backed-up entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub metadata: BackupMetadata,
    pub data: SnapshotData,
}

impl BackupSnapshot {
    /// Builds a snapshot, computing counts and the checksum from `data`
    pub fn new(
        backup_id: String,
        created_by: impl Into<String>,
        data: SnapshotData,
        incomplete_tables: Vec<String>,
    ) -> Result<Self> {
        let checksum = checksum_of(&data)?;
        let metadata = BackupMetadata {
            backup_id,
            timestamp: Utc::now(),
            tables: data.keys().cloned().collect(),
            record_counts: data.iter().map(|(t, rows)| (t.clone(), rows.len())).collect(),
            incomplete_tables,
            created_by: created_by.into(),
            checksum,
        };
        Ok(Self { metadata, data })
    }

    pub fn total_records(&self) -> usize {
        self.data.values().map(Vec::len).sum()
    }

    /// Checks the stored checksum against the data
    ///
    /// # Errors
    ///
    /// Returns a backup error when the data was altered after the snapshot
    /// was taken.
    pub fn verify(&self) -> Result<()> {
        let actual = checksum_of(&self.data)?;
        if actual != self.metadata.checksum {
            return Err(TableSyncError::Backup(format!(
                "Checksum mismatch for {}: expected {}, got {}",
                self.metadata.backup_id, self.metadata.checksum, actual
            )));
        }
        Ok(())
    }
}

/// New backup id: `backup-<millis>-<uuid>`
pub fn new_backup_id() -> String {
    format!("backup-{}-{}", Utc::now().timestamp_millis(), uuid::Uuid::new_v4())
}

fn checksum_of(data: &SnapshotData) -> Result<String> {
    calculate_checksum(&serde_json::to_value(data)?)
}
