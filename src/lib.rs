// Tablesync - Remote table store sync layer
// Copyright (c) 2025 Tablesync Contributors
// Licensed under the MIT License

//! # Tablesync
//!
//! A sync layer over a remote, Azure-Table-style key/value store reached via
//! raw REST and per-table signed query strings.
//!
//! ## Overview
//!
//! This library provides:
//! - **Signed requests** for every store operation, credential per table
//! - **Entity normalization** that folds legacy attribute spellings into
//!   canonical fields on read and writes canonical fields only
//! - **Paginated scans** that follow continuation tokens, synthesize a
//!   resume point when the store omits them, and always report whether the
//!   result is complete
//! - **Bulk mutations** (delete-all, upsert) through a bounded pool with
//!   per-item failure reporting
//! - **Repositories** for patients, prescriptions and user profiles
//! - **Backups** as checksummed JSON snapshots
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Codec, scans, bulk runs, repositories, backups
//! - [`adapters`] - The remote table store client
//! - [`domain`] - Entities, record keys and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tablesync::adapters::tablestore::connect;
//! use tablesync::config::load_config;
//! use tablesync::core::repository::PatientRepository;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("tablesync.toml")?;
//!     let client = connect(&config.store)?;
//!     let patients = PatientRepository::from_config(client, &config);
//!
//!     let listing = patients.list().await;
//!     if !listing.is_complete() {
//!         eprintln!("listing may be incomplete: {}", listing.status);
//!     }
//!     println!("{} patients", listing.items.len());
//!     Ok(())
//! }
//! ```
//!
//! ## Scanning
//!
//! A scan yields records page by page and ends with a status instead of
//! guessing:
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use tablesync::adapters::tablestore::TableClient;
//! use tablesync::core::scan::{ScanOptions, TableScan};
//!
//! # async fn example(client: TableClient) {
//! let mut scan = TableScan::new(client, "Patients", ScanOptions::default());
//! {
//!     let mut pages = Box::pin(scan.pages());
//!     while let Some(page) = pages.next().await {
//!         println!("page {}: {} records", page.number, page.records.len());
//!     }
//! }
//! println!("scan {:?}", scan.status());
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::Result`], carrying a
//! [`domain::TableSyncError`]. Store failures are nested as
//! [`domain::TableStoreError`] so callers can branch on `NotFound`,
//! `Conflict` or throttling.
//!
//! ## Testing
//!
//! [`adapters::tablestore::InMemoryTableService`] implements the transport
//! seam in memory with the store's page cap and continuation behavior, so
//! the whole stack runs without a network.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
