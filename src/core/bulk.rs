//! Bulk mutations
//!
//! Best-effort administrative operations built on the single-entity client.
//! Point operations fan out through a bounded pool; each item's failure is
//! recorded and never stops the rest of the run.

use crate::adapters::tablestore::{DeleteOutcome, StoreResult, TableClient};
use crate::config::BulkConfig;
use crate::core::scan::{ScanOptions, ScanStatus, TableScan};
use crate::domain::{Record, RecordKey, TableStoreError};
use futures::stream::{self, StreamExt};
use std::time::Duration;

/// Pool settings for bulk runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Maximum point operations in flight
    pub concurrency: usize,
    /// Pause each pool slot takes after an operation
    pub batch_delay: Duration,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self::from(&BulkConfig::default())
    }
}

impl From<&BulkConfig> for BulkOptions {
    fn from(config: &BulkConfig) -> Self {
        Self {
            concurrency: config.concurrency,
            batch_delay: Duration::from_millis(config.batch_delay_ms),
        }
    }
}

/// One item a bulk run could not process
#[derive(Debug, Clone, PartialEq)]
pub struct BulkFailure {
    pub partition_key: String,
    pub row_key: String,
    pub error: String,
    /// Whether the store throttled the request
    pub is_throttled: bool,
    /// Scan page the item came from, for delete runs
    pub page: Option<usize>,
}

impl BulkFailure {
    fn new(key: &RecordKey, error: &TableStoreError, page: Option<usize>) -> Self {
        Self {
            partition_key: key.partition_key().to_string(),
            row_key: key.row_key().to_string(),
            error: error.to_string(),
            is_throttled: error.is_throttled(),
            page,
        }
    }
}

/// Outcome of [`BulkMutator::delete_all`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteAllReport {
    pub deleted: usize,
    /// Records already gone when their delete arrived
    pub already_absent: usize,
    pub pages: usize,
    pub failures: Vec<BulkFailure>,
    /// How the underlying scan ended
    pub scan_status: ScanStatus,
}

impl DeleteAllReport {
    /// No item failed and the scan reached the end of the table
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.scan_status.is_complete()
    }
}

/// Outcome of [`BulkMutator::bulk_upsert`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkUpsertReport {
    pub restored: usize,
    /// Records left alone because their key already existed
    pub skipped: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkUpsertReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

enum Written {
    Restored,
    Skipped,
}

/// Runs bulk deletes and upserts against one client
#[derive(Clone)]
pub struct BulkMutator {
    client: TableClient,
    options: BulkOptions,
}

impl BulkMutator {
    pub fn new(client: TableClient, options: BulkOptions) -> Self {
        Self { client, options }
    }

    /// Deletes every record of `table`, page by page
    ///
    /// Each page is deleted through the pool before the next page is
    /// fetched. Item failures are collected and later pages still run; only
    /// a failed page request ends the run early.
    pub async fn delete_all(&self, table: &str, scan_options: ScanOptions) -> DeleteAllReport {
        let mut scan = TableScan::new(self.client.clone(), table, scan_options);
        let mut deleted = 0;
        let mut already_absent = 0;
        let mut failures = Vec::new();

        tracing::info!(table = %table, concurrency = self.options.concurrency, "Deleting all records");

        while let Some(page) = scan.next_page().await {
            let keys = page.records.into_iter().map(|record| record.key);
            let results = self.run(keys, |key| self.delete_one(table, key)).await;

            let mut page_failures = 0;
            for (key, result) in results {
                match result {
                    Ok(DeleteOutcome::Deleted) => deleted += 1,
                    Ok(DeleteOutcome::AlreadyAbsent) => already_absent += 1,
                    Err(e) => {
                        crate::log_bulk_failure!(table, key.partition_key(), key.row_key(), e);
                        failures.push(BulkFailure::new(&key, &e, Some(page.number)));
                        page_failures += 1;
                    }
                }
            }

            tracing::info!(
                table = %table,
                page = page.number,
                deleted_so_far = deleted,
                page_failures = page_failures,
                "Delete page processed"
            );
        }

        let scan_status = scan.status().cloned().unwrap_or(ScanStatus::Complete);
        tracing::info!(
            table = %table,
            deleted = deleted,
            already_absent = already_absent,
            failures = failures.len(),
            scan_status = %scan_status,
            "Delete all finished"
        );

        DeleteAllReport {
            deleted,
            already_absent,
            pages: scan.pages_fetched(),
            failures,
            scan_status,
        }
    }

    /// Writes `records` into `table` as insert-or-replace
    ///
    /// With `skip_existing`, each key is probed first and left untouched if
    /// it exists. Failures are collected per record.
    pub async fn bulk_upsert(
        &self,
        table: &str,
        records: Vec<Record>,
        skip_existing: bool,
    ) -> BulkUpsertReport {
        let total = records.len();
        let results = self
            .run(records, |record| self.upsert_one(table, record, skip_existing))
            .await;

        let mut report = BulkUpsertReport::default();
        for (key, result) in results {
            match result {
                Ok(Written::Restored) => report.restored += 1,
                Ok(Written::Skipped) => report.skipped += 1,
                Err(e) => {
                    crate::log_bulk_failure!(table, key.partition_key(), key.row_key(), e);
                    report.failures.push(BulkFailure::new(&key, &e, None));
                }
            }
        }

        tracing::info!(
            table = %table,
            total = total,
            restored = report.restored,
            skipped = report.skipped,
            failures = report.failures.len(),
            "Bulk upsert finished"
        );

        report
    }

    async fn delete_one(&self, table: &str, key: RecordKey) -> (RecordKey, StoreResult<DeleteOutcome>) {
        let result = self.client.delete(table, &key).await;
        (key, result)
    }

    async fn upsert_one(
        &self,
        table: &str,
        record: Record,
        skip_existing: bool,
    ) -> (RecordKey, StoreResult<Written>) {
        let result = self.write(table, &record, skip_existing).await;
        (record.key, result)
    }

    async fn write(&self, table: &str, record: &Record, skip_existing: bool) -> StoreResult<Written> {
        if skip_existing && self.client.get(table, &record.key).await?.is_some() {
            return Ok(Written::Skipped);
        }
        self.client.upsert(table, record).await?;
        Ok(Written::Restored)
    }

    /// Drives `op` over `items` with at most `concurrency` in flight
    async fn run<I, T, F, Fut, R>(&self, items: I, op: F) -> Vec<(RecordKey, R)>
    where
        I: IntoIterator<Item = T>,
        F: Fn(T) -> Fut,
        Fut: std::future::Future<Output = (RecordKey, R)>,
    {
        let delay = self.options.batch_delay;
        stream::iter(items)
            .map(|item| {
                let fut = op(item);
                async move {
                    let outcome = fut.await;
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    outcome
                }
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tablestore::{local_store_config, ContinuationMode, InMemoryTableService};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    const TABLE: &str = "Patients";

    fn service(count: usize, mode: ContinuationMode) -> Arc<InMemoryTableService> {
        let service = InMemoryTableService::new().with_continuation_mode(mode);
        for i in 0..count {
            service.seed(TABLE, "patient", &format!("File {i:05}"), json!({ "n": i }));
        }
        Arc::new(service)
    }

    fn mutator(service: &Arc<InMemoryTableService>) -> BulkMutator {
        let client = service.connect(&local_store_config(&[TABLE])).unwrap();
        BulkMutator::new(
            client,
            BulkOptions {
                concurrency: 10,
                batch_delay: Duration::ZERO,
            },
        )
    }

    fn scan_options() -> ScanOptions {
        ScanOptions {
            page_size: 1000,
            max_pages: 50,
            page_delay: Duration::ZERO,
        }
    }

    fn record(rk: &str, name: &str) -> Record {
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), Value::from(name));
        Record::new(RecordKey::new("patient", rk).unwrap(), attributes)
    }

    #[tokio::test]
    async fn test_delete_all_clears_table() {
        let service = service(2500, ContinuationMode::Headers);
        let report = mutator(&service).delete_all(TABLE, scan_options()).await;
        assert_eq!(report.deleted, 2500);
        assert!(report.failures.is_empty());
        assert!(report.is_clean());
        assert!(service.is_empty(TABLE));
    }

    #[tokio::test]
    async fn test_delete_all_without_tokens() {
        let service = service(1500, ContinuationMode::Omitted);
        let report = mutator(&service).delete_all(TABLE, scan_options()).await;
        assert_eq!(report.deleted, 1500);
        assert!(report.is_clean());
        assert!(service.is_empty(TABLE));
    }

    #[tokio::test]
    async fn test_item_failure_does_not_stop_later_pages() {
        let service = service(2500, ContinuationMode::Headers);
        service.fail_row("File 00003", 503);

        let report = mutator(&service).delete_all(TABLE, scan_options()).await;

        assert_eq!(report.deleted, 2499);
        assert_eq!(report.pages, 3);
        assert_eq!(report.failures.len(), 1);
        let failure = &report.failures[0];
        assert_eq!(failure.row_key, "File 00003");
        assert_eq!(failure.page, Some(1));
        assert!(failure.is_throttled);
        assert!(!report.is_clean());
        assert_eq!(service.row_keys(TABLE).into_iter().collect::<Vec<_>>(), vec!["File 00003"]);
    }

    #[tokio::test]
    async fn test_delete_all_reports_aborted_scan() {
        let service = service(2500, ContinuationMode::Headers);
        service.fail_query(2, 500);
        let report = mutator(&service).delete_all(TABLE, scan_options()).await;
        assert_eq!(report.deleted, 1000);
        assert!(matches!(report.scan_status, ScanStatus::Aborted(_)));
    }

    #[tokio::test]
    async fn test_bulk_upsert_skips_existing() {
        let service = service(0, ContinuationMode::Headers);
        service.seed(TABLE, "patient", "File 1", json!({ "name": "stored" }));

        let records = vec![record("File 1", "restored"), record("File 2", "restored")];
        let report = mutator(&service).bulk_upsert(TABLE, records, true).await;

        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped, 1);
        assert!(report.is_clean());
        let kept = service.attributes(TABLE, "patient", "File 1").unwrap();
        assert_eq!(kept["name"], "stored");
    }

    #[tokio::test]
    async fn test_bulk_upsert_overwrites_when_not_skipping() {
        let service = service(0, ContinuationMode::Headers);
        service.seed(TABLE, "patient", "File 1", json!({ "name": "stored", "old": true }));

        let report = mutator(&service)
            .bulk_upsert(TABLE, vec![record("File 1", "restored")], false)
            .await;

        assert_eq!(report.restored, 1);
        assert_eq!(report.skipped, 0);
        let replaced = service.attributes(TABLE, "patient", "File 1").unwrap();
        assert_eq!(replaced["name"], "restored");
        assert!(replaced.get("old").is_none());
    }

    #[tokio::test]
    async fn test_bulk_upsert_collects_failures() {
        let service = service(0, ContinuationMode::Headers);
        service.fail_row("File 2", 403);

        let records = (1..=3).map(|i| record(&format!("File {i}"), "x")).collect();
        let report = mutator(&service).bulk_upsert(TABLE, records, true).await;

        assert_eq!(report.restored, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].row_key, "File 2");
        assert!(!report.failures[0].is_throttled);
        assert_eq!(service.len(TABLE), 2);
    }
}
