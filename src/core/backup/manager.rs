//! Backup and restore of whole tables

use super::snapshot::{new_backup_id, BackupSnapshot, SnapshotData};
use super::store::BackupStore;
use crate::adapters::tablestore::{wire, TableClient};
use crate::config::TableSyncConfig;
use crate::core::bulk::{BulkMutator, BulkOptions, BulkUpsertReport};
use crate::core::scan::{ScanOptions, ScanStatus, TableScan};
use crate::domain::{Record, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// A written backup
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub snapshot: BackupSnapshot,
    pub path: PathBuf,
}

impl BackupOutcome {
    /// Every table scan reached the end of its table
    pub fn is_complete(&self) -> bool {
        self.snapshot.metadata.incomplete_tables.is_empty()
    }
}

/// Which parts of a snapshot to restore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Tables to restore; `None` restores every table in the snapshot
    pub tables: Option<Vec<String>>,
    /// Leave records whose key already exists untouched
    pub skip_existing: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            tables: None,
            skip_existing: true,
        }
    }
}

/// Result of a restore
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub backup_id: String,
    /// Per-table upsert results
    pub tables: BTreeMap<String, BulkUpsertReport>,
    /// Problems that kept whole tables or entities from being attempted
    pub errors: Vec<String>,
}

impl RestoreReport {
    pub fn restored(&self) -> usize {
        self.tables.values().map(|r| r.restored).sum()
    }

    pub fn skipped(&self) -> usize {
        self.tables.values().map(|r| r.skipped).sum()
    }

    pub fn failures(&self) -> usize {
        self.tables.values().map(|r| r.failures.len()).sum::<usize>() + self.errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Takes and restores snapshots of the configured tables
pub struct BackupManager {
    client: TableClient,
    store: BackupStore,
    tables: Vec<String>,
    scan: ScanOptions,
    bulk: BulkOptions,
}

impl BackupManager {
    pub fn new(client: TableClient, store: BackupStore, tables: Vec<String>) -> Self {
        Self {
            client,
            store,
            tables,
            scan: ScanOptions::default(),
            bulk: BulkOptions::default(),
        }
    }

    pub fn from_config(client: TableClient, config: &TableSyncConfig) -> Self {
        Self::new(
            client,
            BackupStore::new(&config.backup.directory),
            config.backup.effective_tables(&config.store.tables),
        )
        .with_scan_options(ScanOptions::from(&config.scan))
        .with_bulk_options(BulkOptions::from(&config.bulk))
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_bulk_options(mut self, bulk: BulkOptions) -> Self {
        self.bulk = bulk;
        self
    }

    pub fn store(&self) -> &BackupStore {
        &self.store
    }

    /// Scans every table and writes one snapshot
    ///
    /// A table whose scan stops early is still included with the records
    /// read so far and listed in `incomplete_tables`.
    pub async fn create(&self, created_by: &str) -> Result<BackupOutcome> {
        let backup_id = new_backup_id();
        let mut data = SnapshotData::new();
        let mut incomplete = Vec::new();

        tracing::info!(backup_id = %backup_id, tables = ?self.tables, "Starting backup");

        for table in &self.tables {
            let report = TableScan::new(self.client.clone(), table, self.scan)
                .collect()
                .await;

            match &report.status {
                ScanStatus::Complete => {}
                status => {
                    tracing::warn!(table = %table, status = %status, "Table backup may be incomplete");
                    incomplete.push(table.clone());
                }
            }

            tracing::info!(table = %table, records = report.records.len(), "Table backed up");
            data.insert(
                table.clone(),
                report.records.iter().map(wire::record_to_wire).collect(),
            );
        }

        let snapshot = BackupSnapshot::new(backup_id, created_by, data, incomplete)?;
        let path = self.store.save(&snapshot).await?;
        Ok(BackupOutcome { snapshot, path })
    }

    /// Loads a snapshot, verifies it and upserts its entities
    ///
    /// # Errors
    ///
    /// Fails before writing anything if the snapshot cannot be loaded or its
    /// checksum does not match. Per-entity failures are reported, not raised.
    pub async fn restore(&self, backup_id: &str, options: &RestoreOptions) -> Result<RestoreReport> {
        let snapshot = self.store.load(backup_id).await?;
        snapshot.verify()?;
        Ok(self.restore_snapshot(snapshot, options).await)
    }

    /// Upserts the entities of an already verified snapshot
    pub async fn restore_snapshot(&self, snapshot: BackupSnapshot, options: &RestoreOptions) -> RestoreReport {
        let mut report = RestoreReport {
            backup_id: snapshot.metadata.backup_id.clone(),
            ..Default::default()
        };
        let mutator = BulkMutator::new(self.client.clone(), self.bulk);

        if let Some(selected) = &options.tables {
            for table in selected.iter().filter(|t| !snapshot.data.contains_key(*t)) {
                report.errors.push(format!("Table {table} is not in backup {}", report.backup_id));
            }
        }

        for (table, entities) in snapshot.data {
            if let Some(selected) = &options.tables {
                if !selected.contains(&table) {
                    continue;
                }
            }
            if !self.client.requests().has_credential(&table) {
                report.errors.push(format!("No credential configured for table {table}"));
                continue;
            }

            let mut records: Vec<Record> = Vec::with_capacity(entities.len());
            for entity in entities {
                match wire::record_from_wire(entity, None) {
                    Ok(record) => records.push(record),
                    Err(e) => report.errors.push(format!("Invalid entity in {table}: {e}")),
                }
            }

            tracing::info!(
                table = %table,
                records = records.len(),
                skip_existing = options.skip_existing,
                "Restoring table"
            );
            let table_report = mutator.bulk_upsert(&table, records, options.skip_existing).await;
            report.tables.insert(table, table_report);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tablestore::{local_store_config, InMemoryTableService};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn manager(service: &Arc<InMemoryTableService>, dir: &TempDir, tables: &[&str]) -> BackupManager {
        let client = service.connect(&local_store_config(tables)).unwrap();
        BackupManager::new(
            client,
            BackupStore::new(dir.path()),
            tables.iter().map(|t| t.to_string()).collect(),
        )
        .with_scan_options(ScanOptions {
            page_size: 1000,
            max_pages: 10,
            page_delay: Duration::ZERO,
        })
        .with_bulk_options(BulkOptions {
            concurrency: 4,
            batch_delay: Duration::ZERO,
        })
    }

    fn seeded() -> Arc<InMemoryTableService> {
        let service = InMemoryTableService::new();
        for i in 0..5 {
            service.seed("Patients", "patient", &format!("File {i}"), json!({ "name": format!("P{i}") }));
        }
        service.seed("Users", "user", "a@example.com", json!({ "name": "A" }));
        Arc::new(service)
    }

    #[tokio::test]
    async fn test_backup_then_restore_into_empty_store() {
        let dir = TempDir::new().unwrap();
        let source = seeded();
        let outcome = manager(&source, &dir, &["Patients", "Users"])
            .create("tester")
            .await
            .unwrap();

        assert!(outcome.is_complete());
        assert_eq!(outcome.snapshot.metadata.record_counts["Patients"], 5);
        assert_eq!(outcome.snapshot.metadata.created_by, "tester");
        let first = &outcome.snapshot.data["Patients"][0];
        assert!(first.get("Timestamp").is_none());
        assert!(first.get("odata.etag").is_none());

        let target = Arc::new(InMemoryTableService::new());
        let report = manager(&target, &dir, &["Patients", "Users"])
            .restore(&outcome.snapshot.metadata.backup_id, &RestoreOptions::default())
            .await
            .unwrap();

        assert_eq!(report.restored(), 6);
        assert!(report.is_clean());
        assert_eq!(target.len("Patients"), 5);
        assert_eq!(target.attributes("Users", "user", "a@example.com").unwrap()["name"], "A");
    }

    #[tokio::test]
    async fn test_restore_keeps_property_types() {
        let dir = TempDir::new().unwrap();
        let source = Arc::new(InMemoryTableService::new());
        source.seed(
            "Patients",
            "patient",
            "File 1",
            json!({ "Visits@odata.type": "Edm.Int64", "Visits": "12", "name": "A" }),
        );
        let outcome = manager(&source, &dir, &["Patients"]).create("system").await.unwrap();
        assert_eq!(outcome.snapshot.data["Patients"][0]["Visits@odata.type"], "Edm.Int64");

        let target = Arc::new(InMemoryTableService::new());
        manager(&target, &dir, &["Patients"])
            .restore(&outcome.snapshot.metadata.backup_id, &RestoreOptions::default())
            .await
            .unwrap();

        let restored = target.attributes("Patients", "patient", "File 1").unwrap();
        assert_eq!(restored["Visits@odata.type"], "Edm.Int64");
        assert_eq!(restored["Visits"], "12");
    }

    #[tokio::test]
    async fn test_restore_skips_existing_and_filters_tables() {
        let dir = TempDir::new().unwrap();
        let service = seeded();
        let manager = manager(&service, &dir, &["Patients", "Users"]);
        let outcome = manager.create("system").await.unwrap();

        service.seed("Patients", "patient", "File 0", json!({ "name": "changed" }));
        let report = manager
            .restore(
                &outcome.snapshot.metadata.backup_id,
                &RestoreOptions {
                    tables: Some(vec!["Patients".to_string()]),
                    skip_existing: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.skipped(), 5);
        assert_eq!(report.restored(), 0);
        assert!(!report.tables.contains_key("Users"));
        assert_eq!(service.attributes("Patients", "patient", "File 0").unwrap()["name"], "changed");
    }

    #[tokio::test]
    async fn test_restore_overwrites_without_skip() {
        let dir = TempDir::new().unwrap();
        let service = seeded();
        let manager = manager(&service, &dir, &["Patients"]);
        let outcome = manager.create("system").await.unwrap();

        service.seed("Patients", "patient", "File 0", json!({ "name": "changed" }));
        let report = manager
            .restore(
                &outcome.snapshot.metadata.backup_id,
                &RestoreOptions {
                    tables: None,
                    skip_existing: false,
                },
            )
            .await
            .unwrap();

        assert_eq!(report.restored(), 5);
        assert_eq!(service.attributes("Patients", "patient", "File 0").unwrap()["name"], "P0");
    }

    #[tokio::test]
    async fn test_restore_rejects_tampered_backup() {
        let dir = TempDir::new().unwrap();
        let service = seeded();
        let manager = manager(&service, &dir, &["Patients"]);
        let outcome = manager.create("system").await.unwrap();

        let contents = std::fs::read_to_string(&outcome.path).unwrap();
        std::fs::write(&outcome.path, contents.replace("\"P1\"", "\"P9\"")).unwrap();

        let err = manager
            .restore(&outcome.snapshot.metadata.backup_id, &RestoreOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[tokio::test]
    async fn test_backup_marks_failed_table_incomplete() {
        let dir = TempDir::new().unwrap();
        let service = seeded();
        service.fail_query(1, 503);
        let outcome = manager(&service, &dir, &["Patients", "Users"])
            .create("system")
            .await
            .unwrap();

        assert!(!outcome.is_complete());
        assert_eq!(outcome.snapshot.metadata.incomplete_tables, vec!["Patients"]);
        assert_eq!(outcome.snapshot.metadata.record_counts["Users"], 1);
    }

    #[tokio::test]
    async fn test_restore_reports_missing_credential() {
        let dir = TempDir::new().unwrap();
        let service = seeded();
        let outcome = manager(&service, &dir, &["Patients", "Users"])
            .create("system")
            .await
            .unwrap();

        let report = manager(&service, &dir, &["Patients"])
            .restore(&outcome.snapshot.metadata.backup_id, &RestoreOptions::default())
            .await
            .unwrap();
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].contains("Users"));
        assert!(!report.is_clean());
    }
}
