//! Remote table store over raw REST
//!
//! Layers, leaf first:
//!
//! - [`request`] - signed request descriptors, no I/O
//! - [`transport`] - the async I/O seam and its reqwest implementation
//! - [`wire`] - entity and query body formats
//! - [`client`] - single-entity operations and page queries
//! - [`memory`] - an in-memory service behind the same seam

pub mod client;
pub mod memory;
pub mod request;
pub mod transport;
pub mod wire;

pub use client::{CreateOutcome, DeleteOutcome, PageResponse, TableClient, UpdateOutcome};
pub use memory::{local_store_config, ContinuationMode, InMemoryTableService};
pub use request::{HttpMethod, SignedRequest, SignedRequestBuilder, TableOperation};
pub use transport::{ReqwestTransport, TableTransport, TransportResponse};
pub use wire::ContinuationToken;

use crate::config::StoreConfig;
use crate::domain::{Result, TableStoreError};
use std::sync::Arc;
use std::time::Duration;

/// Result of a store-level call
pub type StoreResult<T> = std::result::Result<T, TableStoreError>;

/// Builds a [`TableClient`] talking HTTPS to the configured endpoint
///
/// # Errors
///
/// Returns an error if the endpoint is invalid or the HTTP client cannot be
/// built.
pub fn connect(store: &StoreConfig) -> Result<TableClient> {
    let requests = SignedRequestBuilder::new(store)?;
    let transport = ReqwestTransport::new(Duration::from_secs(store.timeout_seconds))?;

    tracing::info!(
        endpoint = %requests.endpoint(),
        api_version = %store.api_version,
        tables_with_credentials = store.credentials.len(),
        "Table store client ready"
    );

    Ok(TableClient::new(requests, Arc::new(transport)))
}
