//! Core logic for tablesync
//!
//! Everything here is built on the single-entity client in
//! [`crate::adapters::tablestore`].
//!
//! # Modules
//!
//! - [`codec`] - typed entities to and from record attribute maps
//! - [`scan`] - paginated scans with explicit completion status
//! - [`bulk`] - bounded-concurrency delete-all and upsert runs
//! - [`repository`] - patient, prescription and user repositories
//! - [`backup`] - JSON snapshots and checksum-verified restores
//!
//! # Example
//!
//! ```rust,no_run
//! use tablesync::adapters::tablestore::connect;
//! use tablesync::config::load_config;
//! use tablesync::core::repository::PatientRepository;
//! use tablesync::domain::PatientUpdate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesync.toml")?;
//! let client = connect(&config.store)?;
//! let patients = PatientRepository::from_config(client, &config);
//!
//! if let Some(patient) = patients.update("File 12", &PatientUpdate::status("Deceased")).await? {
//!     println!("{} is now {}", patient.name, patient.status);
//! }
//!
//! let listing = patients.list().await;
//! println!("{} patients ({})", listing.items.len(), listing.status);
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod bulk;
pub mod codec;
pub mod repository;
pub mod scan;
