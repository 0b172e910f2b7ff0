//! Prescription repository
//!
//! Stored rows keep the medication list as JSON text; this repository
//! converts between that row shape and [`Prescription`].

use super::{decode_records, list_entities, now_timestamp, Listing};
use crate::adapters::tablestore::{CreateOutcome, DeleteOutcome, TableClient, UpdateOutcome};
use crate::config::TableSyncConfig;
use crate::core::codec;
use crate::core::scan::ScanOptions;
use crate::domain::prescription::{DEFAULT_PRESCRIPTION_STATUS, PRESCRIPTION_PARTITION};
use crate::domain::{
    Prescription, PrescriptionMedication, PrescriptionRow, PrescriptionUpdate, RecordKey, Result,
    TableEntity, TableStoreError, TableSyncError,
};
use chrono::{Datelike, Utc};
use rand::Rng;
use serde_json::{Map, Value};

/// Prescriptions keyed by `<patientId>_<millis>`
#[derive(Clone)]
pub struct PrescriptionRepository {
    client: TableClient,
    table: String,
    scan: ScanOptions,
}

impl PrescriptionRepository {
    pub fn new(client: TableClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
            scan: ScanOptions::default(),
        }
    }

    pub fn from_config(client: TableClient, config: &TableSyncConfig) -> Self {
        Self::new(client, config.store.tables.prescriptions.clone())
            .with_scan_options(ScanOptions::from(&config.scan))
    }

    pub fn with_scan_options(mut self, scan: ScanOptions) -> Self {
        self.scan = scan;
        self
    }

    /// Creates a prescription
    ///
    /// Assigns the row key, a fresh `RX-YYYYMM-NNNN` number and both
    /// timestamps. A blank status becomes `active`.
    ///
    /// # Errors
    ///
    /// Returns a validation error when `patient_id` is blank.
    pub async fn create(&self, mut prescription: Prescription) -> Result<Prescription> {
        if prescription.patient_id.trim().is_empty() {
            return Err(TableSyncError::Validation(
                "prescription requires a patient id".to_string(),
            ));
        }

        let now = Utc::now();
        let row_key = format!("{}_{}", prescription.patient_id, now.timestamp_millis());
        prescription.key = key_for(&row_key)?;
        prescription.prescription_number = prescription_number();
        prescription.created_at = now_timestamp();
        prescription.updated_at = prescription.created_at.clone();
        if prescription.status.trim().is_empty() {
            prescription.status = DEFAULT_PRESCRIPTION_STATUS.to_string();
        }

        let record = codec::encode(&to_row(&prescription)?)?;
        match self.client.create(&self.table, &record).await? {
            CreateOutcome::Created => {
                tracing::info!(
                    table = %self.table,
                    row_key = %row_key,
                    prescription_number = %prescription.prescription_number,
                    "Prescription created"
                );
                Ok(prescription)
            }
            CreateOutcome::Conflict => Err(TableStoreError::Conflict(format!(
                "prescription {row_key} already exists"
            ))
            .into()),
        }
    }

    pub async fn get(&self, row_key: &str) -> Result<Option<Prescription>> {
        let key = key_for(row_key)?;
        match self.client.get(&self.table, &key).await? {
            Some(record) => Ok(Some(from_row(codec::decode(&record)?))),
            None => Ok(None),
        }
    }

    /// Every prescription, optionally only those of one patient
    pub async fn list(&self, patient_id: Option<&str>) -> Listing<Prescription> {
        let rows: Listing<PrescriptionRow> = list_entities(&self.client, &self.table, self.scan).await;
        let items = rows
            .items
            .into_iter()
            .filter(|row| patient_id.map_or(true, |id| row.patient_id == id))
            .map(from_row)
            .collect();
        Listing {
            items,
            pages: rows.pages,
            status: rows.status,
        }
    }

    /// Applies the changed fields, always stamping `updatedAt`
    ///
    /// Returns `None` when the prescription does not exist.
    pub async fn update(&self, row_key: &str, changes: &PrescriptionUpdate) -> Result<Option<Prescription>> {
        let key = key_for(row_key)?;

        let mut attributes = Map::new();
        if let Some(status) = &changes.status {
            attributes.insert("status".to_string(), Value::from(status.as_str()));
        }
        if let Some(diagnosis) = &changes.diagnosis {
            attributes.insert("diagnosis".to_string(), Value::from(diagnosis.as_str()));
        }
        if let Some(notes) = &changes.notes {
            attributes.insert("notes".to_string(), Value::from(notes.as_str()));
        }
        if let Some(medications) = &changes.medications {
            attributes.insert("medications".to_string(), Value::from(encode_medications(medications)?));
        }
        if let Some(valid_until) = &changes.valid_until {
            attributes.insert("validUntil".to_string(), Value::from(valid_until.as_str()));
        }
        attributes.insert("updatedAt".to_string(), Value::from(now_timestamp()));

        let attributes = codec::encode_changes(&PrescriptionRow::SCHEMA, attributes);
        match self.client.merge(&self.table, &key, attributes).await? {
            UpdateOutcome::Updated => self.get(row_key).await,
            UpdateOutcome::NotFound => Ok(None),
        }
    }

    pub async fn delete(&self, row_key: &str) -> Result<DeleteOutcome> {
        let key = key_for(row_key)?;
        Ok(self.client.delete(&self.table, &key).await?)
    }

    /// First page of prescriptions
    pub async fn first_page(&self) -> Result<super::EntityPage<Prescription>> {
        let page = crate::core::scan::first_page(&self.client, &self.table, self.scan).await?;
        let rows: Vec<PrescriptionRow> = decode_records(&self.table, page.records);
        Ok(super::EntityPage {
            items: rows.into_iter().map(from_row).collect(),
            has_more: page.has_more,
        })
    }
}

fn key_for(row_key: &str) -> Result<RecordKey> {
    RecordKey::new(PRESCRIPTION_PARTITION, row_key).map_err(TableSyncError::Validation)
}

/// `RX-YYYYMM-NNNN` with a random four-digit suffix
fn prescription_number() -> String {
    let now = Utc::now();
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("RX-{}{:02}-{:04}", now.year(), now.month(), suffix)
}

fn encode_medications(medications: &[PrescriptionMedication]) -> Result<String> {
    Ok(serde_json::to_string(medications)?)
}

fn to_row(prescription: &Prescription) -> Result<PrescriptionRow> {
    Ok(PrescriptionRow {
        key: prescription.key.clone(),
        prescription_number: prescription.prescription_number.clone(),
        patient_id: prescription.patient_id.clone(),
        patient_name: prescription.patient_name.clone(),
        patient_email: prescription.patient_email.clone(),
        doctor_id: prescription.doctor_id.clone(),
        doctor_name: prescription.doctor_name.clone(),
        doctor_license: prescription.doctor_license.clone(),
        clinic_name: prescription.clinic_name.clone(),
        clinic_address: prescription.clinic_address.clone(),
        clinic_phone: prescription.clinic_phone.clone(),
        date: prescription.date.clone(),
        diagnosis: prescription.diagnosis.clone(),
        medications: match &prescription.unreadable_medications {
            Some(raw) if prescription.medications.is_empty() => raw.clone(),
            _ => encode_medications(&prescription.medications)?,
        },
        notes: prescription.notes.clone(),
        status: prescription.status.clone(),
        created_at: prescription.created_at.clone(),
        updated_at: prescription.updated_at.clone(),
        valid_until: prescription.valid_until.clone(),
        extra: prescription.extra.clone(),
    })
}

/// Decodes the medication text
///
/// Text that is not a readable list is kept in `unreadable_medications` so it
/// is written back untouched.
fn from_row(row: PrescriptionRow) -> Prescription {
    let (medications, unreadable_medications) =
        match serde_json::from_str::<Vec<PrescriptionMedication>>(&row.medications) {
            Ok(medications) => (medications, None),
            Err(e) => {
                tracing::warn!(key = %row.key, error = %e, "Unreadable medication list");
                (Vec::new(), Some(row.medications))
            }
        };

    Prescription {
        key: row.key,
        prescription_number: row.prescription_number,
        patient_id: row.patient_id,
        patient_name: row.patient_name,
        patient_email: row.patient_email,
        doctor_id: row.doctor_id,
        doctor_name: row.doctor_name,
        doctor_license: row.doctor_license,
        clinic_name: row.clinic_name,
        clinic_address: row.clinic_address,
        clinic_phone: row.clinic_phone,
        date: row.date,
        diagnosis: row.diagnosis,
        medications,
        unreadable_medications,
        notes: row.notes,
        status: row.status,
        created_at: row.created_at,
        updated_at: row.updated_at,
        valid_until: row.valid_until,
        extra: row.extra,
    }
}
