//! Table backups
//!
//! A backup is a JSON snapshot of every configured table, written to the
//! local backup directory:
//!
//! ```json
//! {
//!   "metadata": { "backup_id": "backup-1718000000000-…", "checksum": "…", … },
//!   "data": { "Patients": [ { "PartitionKey": "patient", "RowKey": "File 1", … } ] }
//! }
//! ```
//!
//! Restores verify the checksum before writing anything, then upsert the
//! entities through the bulk pool.

pub mod checksum;
pub mod manager;
pub mod snapshot;
pub mod store;

pub use manager::{BackupManager, BackupOutcome, RestoreOptions, RestoreReport};
pub use snapshot::{new_backup_id, BackupMetadata, BackupSnapshot, SnapshotData};
pub use store::BackupStore;
