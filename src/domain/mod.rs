//! Domain models and types for tablesync.
//!
//! This module contains the record model of the remote table store, the typed
//! entities projected from it and the error taxonomy shared by every layer.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Generic records** ([`Record`], [`RecordKey`])
//! - **Declarative field schemas** ([`FieldSpec`], [`EntitySchema`])
//! - **Domain entities** ([`Patient`], [`Prescription`], [`User`])
//! - **Error types** ([`TableSyncError`], [`TableStoreError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, TableSyncError>`]:
//!
//! ```rust,no_run
//! use tablesync::domain::Result;
//!
//! fn example() -> Result<()> {
//!     let config = tablesync::config::load_config("tablesync.toml")?;
//!     println!("{}", config.store.endpoint);
//!     Ok(())
//! }
//! ```
//!
//! # Field Name Drift
//!
//! Records written by older clients use PascalCase attribute names. Each entity
//! declares, per field, the ordered wire keys it is read from:
//!
//! ```rust
//! use tablesync::domain::{Patient, TableEntity};
//!
//! let field = Patient::SCHEMA.field("name").unwrap();
//! assert_eq!(field.candidates, &["Name", "name"]);
//! ```

pub mod errors;
pub mod patient;
pub mod prescription;
pub mod record;
pub mod result;
pub mod schema;
pub mod user;

// Re-export commonly used types for convenience
pub use errors::{TableStoreError, TableSyncError};
pub use patient::{Patient, PatientUpdate};
pub use prescription::{Prescription, PrescriptionMedication, PrescriptionRow, PrescriptionUpdate};
pub use record::{Record, RecordKey};
pub use result::Result;
pub use schema::{EntitySchema, FieldDefault, FieldSpec, TableEntity};
pub use user::{User, UserProfileUpdate};
