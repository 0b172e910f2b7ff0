//! Patient repository

use super::{count_records, decode_records, identifier, list_entities, now_timestamp};
use super::{EntityPage, Listing, TableCount};
use crate::adapters::tablestore::{CreateOutcome, DeleteOutcome, TableClient, UpdateOutcome};
use crate::config::TableSyncConfig;
use crate::core::bulk::{BulkMutator, BulkOptions, DeleteAllReport};
use crate::core::codec;
use crate::core::scan::{first_page, ScanOptions, ScanStatus, TableScan};
use crate::domain::patient::{DEFAULT_PATIENT_STATUS, PATIENT_PARTITION};
use crate::domain::{Patient, PatientUpdate, RecordKey, Result, TableEntity, TableStoreError, TableSyncError};

/// Patients keyed by medical record number
#[derive(Clone)]
pub struct PatientRepository {
    client: TableClient,
    table: String,
    scan: ScanOptions,
    bulk: BulkOptions,
}

impl PatientRepository {
    pub fn new(client: TableClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            scan: ScanOptions::default(),
            bulk: BulkOptions::default(),
        }
    }

    /// Repository for the configured patients table
    pub fn from_config(client: TableClient, config: &TableSyncConfig) -> Self {
        Self::new(client, config.store.tables.patients.clone())
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

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Creates a patient
    ///
    /// A blank medical record number is replaced by the next free file
    /// number. The record number doubles as id and row key; `createdAt` is
    /// stamped and a blank status becomes `Unknown`.
    ///
    /// # Errors
    ///
    /// Fails with a `Conflict` store error when the record number is taken.
    pub async fn create(&self, mut patient: Patient) -> Result<Patient> {
        let supplied = patient.medical_record_number.trim().to_string();
        let number = if supplied.is_empty() {
            self.next_file_number().await
        } else {
            supplied
        };

        patient.key = key_for(&number)?;
        patient.id = number.clone();
        patient.medical_record_number = number.clone();
        patient.created_at = now_timestamp();
        if patient.status.trim().is_empty() {
            patient.status = DEFAULT_PATIENT_STATUS.to_string();
        }

        let record = codec::encode(&patient)?;
        match self.client.create(&self.table, &record).await? {
            CreateOutcome::Created => {
                tracing::info!(table = %self.table, medical_record_number = %number, "Patient created");
                Ok(patient)
            }
            CreateOutcome::Conflict => Err(TableStoreError::Conflict(format!(
                "patient {number} already exists"
            ))
            .into()),
        }
    }

    /// Reads one patient by id (medical record number)
    pub async fn get(&self, id: &str) -> Result<Option<Patient>> {
        let key = key_for(id)?;
        match self.client.get(&self.table, &key).await? {
            Some(record) => Ok(Some(codec::decode(&record)?)),
            None => Ok(None),
        }
    }

    /// Merges the changed fields and returns the stored result
    ///
    /// Fields not set in `changes` keep their stored values. Returns `None`
    /// when the patient does not exist.
    pub async fn update(&self, id: &str, changes: &PatientUpdate) -> Result<Option<Patient>> {
        let key = key_for(id)?;
        let attributes = codec::encode_update(&Patient::SCHEMA, changes)?;

        if !attributes.is_empty() {
            match self.client.merge(&self.table, &key, attributes).await? {
                UpdateOutcome::Updated => {
                    tracing::info!(table = %self.table, id = %id, "Patient updated");
                }
                UpdateOutcome::NotFound => return Ok(None),
            }
        }

        self.get(id).await
    }

    /// Deletes a patient; deleting an absent patient succeeds
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let key = key_for(id)?;
        Ok(self.client.delete(&self.table, &key).await?)
    }

    /// Every patient in the table
    pub async fn list(&self) -> Listing<Patient> {
        list_entities(&self.client, &self.table, self.scan).await
    }

    /// First page of patients, for quick initial display
    pub async fn first_page(&self) -> Result<EntityPage<Patient>> {
        let page = first_page(&self.client, &self.table, self.scan).await?;
        Ok(EntityPage {
            items: decode_records(&self.table, page.records),
            has_more: page.has_more,
        })
    }

    pub async fn count(&self) -> TableCount {
        count_records(&self.client, &self.table, self.scan).await
    }

    /// Deletes every patient
    pub async fn delete_all(&self) -> DeleteAllReport {
        BulkMutator::new(self.client.clone(), self.bulk)
            .delete_all(&self.table, self.scan)
            .await
    }

    /// Next free file number
    ///
    /// Scans the table for the highest number in use across record numbers,
    /// ids and row keys. If the scan fails a time-derived number is returned
    /// instead.
    pub async fn next_file_number(&self) -> String {
        let report = TableScan::new(self.client.clone(), &self.table, self.scan)
            .collect()
            .await;

        match &report.status {
            ScanStatus::Aborted(e) => {
                let fallback = identifier::fallback_file_number();
                tracing::warn!(
                    table = %self.table,
                    error = %e,
                    fallback = %fallback,
                    "Could not scan patients for file numbers, using fallback"
                );
                return fallback;
            }
            ScanStatus::PossiblyIncomplete(reason) => {
                tracing::warn!(
                    table = %self.table,
                    reason = %reason,
                    "File number derived from a possibly incomplete scan"
                );
            }
            ScanStatus::Complete => {}
        }

        let patients: Vec<Patient> = decode_records(&self.table, report.records);
        identifier::next_file_number(patients.iter().flat_map(|p| {
            [p.medical_record_number.as_str(), p.id.as_str(), p.key.row_key()]
        }))
    }
}

fn key_for(id: &str) -> Result<RecordKey> {
    RecordKey::new(PATIENT_PARTITION, id).map_err(TableSyncError::Validation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::tablestore::{local_store_config, InMemoryTableService};
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    const TABLE: &str = "Patients";

    fn repository(service: &Arc<InMemoryTableService>) -> PatientRepository {
        let client = service.connect(&local_store_config(&[TABLE])).unwrap();
        PatientRepository::new(client, TABLE)
            .with_scan_options(ScanOptions {
                page_size: 1000,
                max_pages: 50,
                page_delay: Duration::ZERO,
            })
            .with_bulk_options(BulkOptions {
                concurrency: 4,
                batch_delay: Duration::ZERO,
            })
    }

    fn patient(name: &str, email: &str) -> Patient {
        Patient {
            name: name.to_string(),
            email: email.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_allocates_next_file_number() {
        let service = Arc::new(InMemoryTableService::new());
        for (rk, mrn) in [("a", "File 3"), ("b", "File 7"), ("c", "File 12")] {
            service.seed(TABLE, "patient", rk, json!({ "MedicalRecordNumber": mrn }));
        }
        let repo = repository(&service);

        let created = repo.create(patient("Lindiwe", "l@example.com")).await.unwrap();

        assert_eq!(created.medical_record_number, "File 13");
        assert_eq!(created.id, "File 13");
        assert_eq!(created.key.row_key(), "File 13");
        assert_eq!(created.status, "Unknown");
        assert!(!created.created_at.is_empty());
    }

    #[tokio::test]
    async fn test_next_file_number_counts_row_keys_without_record_number() {
        let service = Arc::new(InMemoryTableService::new());
        service.seed(TABLE, "patient", "File 50", json!({ "Name": "Legacy" }));
        service.seed(TABLE, "patient", "x", json!({ "id": "File 60" }));
        service.seed(TABLE, "patient", "y", json!({ "MedicalRecordNumber": "File 7" }));

        assert_eq!(repository(&service).next_file_number().await, "File 61");
    }

    #[tokio::test]
    async fn test_create_then_get_round_trip() {
        let service = Arc::new(InMemoryTableService::new());
        let repo = repository(&service);

        let mut input = patient("Pieter", "p@example.com");
        input.medical_record_number = " File 40 ".to_string();
        input.deceased_date = Some("2024-02-01".to_string());
        input.extra.insert("address".to_string(), json!("12 Long St"));
        let created = repo.create(input).await.unwrap();

        let fetched = repo.get("File 40").await.unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_create_conflict() {
        let service = Arc::new(InMemoryTableService::new());
        let repo = repository(&service);
        let mut input = patient("A", "a@example.com");
        input.medical_record_number = "File 1".to_string();

        repo.create(input.clone()).await.unwrap();
        let err = repo.create(input).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let service = Arc::new(InMemoryTableService::new());
        assert!(repository(&service).get("File 99").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_rejects_invalid_id() {
        let service = Arc::new(InMemoryTableService::new());
        let err = repository(&service).get("File/1").await.unwrap_err();
        assert!(matches!(err, TableSyncError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_update_leaves_other_fields() {
        let service = Arc::new(InMemoryTableService::new());
        service.seed(
            TABLE,
            "patient",
            "File 5",
            json!({ "Name": "Legacy Name", "Email": "old@example.com", "Status": "Alive" }),
        );
        let repo = repository(&service);

        let updated = repo
            .update("File 5", &PatientUpdate::status("Deceased"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.status, "Deceased");
        assert_eq!(updated.email, "old@example.com");
        assert_eq!(updated.name, "Legacy Name");

        let stored = service.attributes(TABLE, "patient", "File 5").unwrap();
        assert_eq!(stored["status"], "Deceased");
        assert!(stored.get("Status").is_none());
        assert_eq!(stored["Email"], "old@example.com");
    }

    #[tokio::test]
    async fn test_update_missing_is_none() {
        let service = Arc::new(InMemoryTableService::new());
        let result = repository(&service)
            .update("File 1", &PatientUpdate::status("Deceased"))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let service = Arc::new(InMemoryTableService::new());
        service.seed(TABLE, "patient", "File 1", json!({ "name": "A" }));
        let repo = repository(&service);

        assert_eq!(repo.delete("File 1").await.unwrap(), DeleteOutcome::Deleted);
        assert_eq!(repo.delete("File 1").await.unwrap(), DeleteOutcome::AlreadyAbsent);
    }

    #[tokio::test]
    async fn test_next_file_number_falls_back_when_scan_fails() {
        let service = Arc::new(InMemoryTableService::new());
        service.fail_query(1, 500);
        let number = repository(&service).next_file_number().await;
        assert!(number.starts_with("File "));
    }

    #[tokio::test]
    async fn test_list_count_and_first_page() {
        let service = Arc::new(InMemoryTableService::new().with_page_cap(10));
        for i in 1..=25 {
            service.seed(TABLE, "patient", &format!("File {i:02}"), json!({ "Name": format!("P{i}") }));
        }
        let repo = repository(&service);

        let listing = repo.list().await;
        assert!(listing.is_complete());
        assert_eq!(listing.items.len(), 25);
        assert_eq!(listing.items[0].name, "P1");
        assert_eq!(listing.items[0].id, "File 01");

        let count = repo.count().await;
        assert_eq!(count.records, 25);
        assert_eq!(count.pages, 3);

        let first = repo.first_page().await.unwrap();
        assert_eq!(first.items.len(), 10);
        assert!(first.has_more);
    }

    #[tokio::test]
    async fn test_delete_all() {
        let service = Arc::new(InMemoryTableService::new());
        for i in 0..30 {
            service.seed(TABLE, "patient", &format!("File {i}"), json!({}));
        }
        let report = repository(&service).delete_all().await;
        assert_eq!(report.deleted, 30);
        assert!(report.is_clean());
        assert!(service.is_empty(TABLE));
    }
}
