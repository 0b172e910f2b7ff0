//! Paginated table scans
//!
//! The store returns at most 1000 records per request. [`TableScan`] hides
//! the cursor chain behind a page-at-a-time API and reports how the scan
//! ended instead of guessing at totals:
//!
//! - [`ScanStatus::Complete`] - the store signalled the end of the table
//! - [`ScanStatus::PossiblyIncomplete`] - the page ceiling was hit or the
//!   cursor chain broke
//! - [`ScanStatus::Aborted`] - a page request failed
//!
//! # Example
//!
//! ```rust,no_run
//! use tablesync::adapters::tablestore::connect;
//! use tablesync::config::load_config;
//! use tablesync::core::scan::{ScanOptions, TableScan};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesync.toml")?;
//! let client = connect(&config.store)?;
//!
//! let report = TableScan::new(client, "Patients", ScanOptions::from(&config.scan))
//!     .collect()
//!     .await;
//! println!("{} records, {}", report.records.len(), report.status);
//! # Ok(())
//! # }
//! ```

pub mod cursor;
pub mod driver;

pub use cursor::{Cursor, IncompleteReason, ScanStatus};
pub use driver::{first_page, FirstPage, Page, ScanOptions, ScanReport, TableScan};
