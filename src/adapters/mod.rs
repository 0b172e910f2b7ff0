//! External system integrations for tablesync.
//!
//! - [`tablestore`] - the remote table store, reached through raw HTTP
//!   requests carrying a per-table signed credential
//!
//! # Example
//!
//! ```rust,no_run
//! use tablesync::adapters::tablestore;
//! use tablesync::config::load_config;
//! use tablesync::domain::RecordKey;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesync.toml")?;
//! let client = tablestore::connect(&config.store)?;
//!
//! let key = RecordKey::new("patient", "File 12")?;
//! if let Some(record) = client.get(&config.store.tables.patients, &key).await? {
//!     println!("{} attributes", record.attributes.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod tablestore;
