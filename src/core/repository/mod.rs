//! Typed repositories over the remote tables
//!
//! Each repository owns one table and one entity type. Lookups of absent
//! keys return `None`; creates on existing keys fail with a `Conflict` store
//! error the caller can branch on. Listing operations scan the whole table
//! and report how the scan ended alongside the decoded entities.

pub mod identifier;
pub mod patient;
pub mod prescription;
pub mod user;

pub use identifier::{fallback_file_number, file_number, next_file_number};
pub use patient::PatientRepository;
pub use prescription::PrescriptionRepository;
pub use user::UserRepository;

use crate::adapters::tablestore::TableClient;
use crate::core::codec;
use crate::core::scan::{ScanOptions, ScanStatus, TableScan};
use crate::domain::{Record, TableEntity};
use chrono::{SecondsFormat, Utc};

/// Entities decoded from a full scan
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub status: ScanStatus,
}

impl<T> Listing<T> {
    pub fn is_complete(&self) -> bool {
        self.status.is_complete()
    }
}

/// First page of entities
#[derive(Debug, Clone, PartialEq)]
pub struct EntityPage<T> {
    pub items: Vec<T>,
    /// Whether the store has more records after this page
    pub has_more: bool,
}

/// Record count from a full scan
#[derive(Debug, Clone, PartialEq)]
pub struct TableCount {
    pub records: usize,
    pub pages: usize,
    pub status: ScanStatus,
}

/// Counts the records of `table` without keeping them
pub async fn count_records(client: &TableClient, table: &str, options: ScanOptions) -> TableCount {
    let mut scan = TableScan::new(client.clone(), table, options);
    let mut records = 0;
    while let Some(page) = scan.next_page().await {
        records += page.records.len();
    }
    TableCount {
        records,
        pages: scan.pages_fetched(),
        status: scan.status().cloned().unwrap_or(ScanStatus::Complete),
    }
}

/// Scans `table` and decodes every record as `E`
pub(crate) async fn list_entities<E: TableEntity>(
    client: &TableClient,
    table: &str,
    options: ScanOptions,
) -> Listing<E> {
    let report = TableScan::new(client.clone(), table, options).collect().await;
    Listing {
        items: decode_records(table, report.records),
        pages: report.pages,
        status: report.status,
    }
}

/// Decodes records, skipping any the entity type rejects
pub(crate) fn decode_records<E: TableEntity>(table: &str, records: Vec<Record>) -> Vec<E> {
    records
        .iter()
        .filter_map(|record| match codec::decode::<E>(record) {
            Ok(entity) => Some(entity),
            Err(e) => {
                tracing::warn!(table = %table, key = %record.key, error = %e, "Skipping undecodable record");
                None
            }
        })
        .collect()
}

/// Current time in the format entities store timestamps in
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
