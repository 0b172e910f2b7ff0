//! Single-entity operations against the table service
//!
//! Expected outcomes (`NotFound`, `Conflict`) come back as values of the
//! outcome enums; only failures nobody can branch on are errors.

use super::request::{SignedRequestBuilder, TableOperation};
use super::transport::{TableTransport, TransportResponse};
use super::wire::{
    self, ContinuationToken, NEXT_PARTITION_KEY_HEADER, NEXT_ROW_KEY_HEADER,
};
use super::StoreResult;
use crate::domain::{Record, RecordKey, TableStoreError};
use serde_json::{Map, Value};
use std::sync::Arc;

/// Result of [`TableClient::create`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    /// A record with the same key already exists; nothing was written
    Conflict,
}

/// Result of [`TableClient::merge`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotFound,
}

/// Result of [`TableClient::delete`]; both variants mean the record is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// One page of a collection query, continuation tokens still raw
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub records: Vec<Record>,
    /// Token found in the response body
    pub body_token: Option<ContinuationToken>,
    /// Token found in the response headers
    pub header_token: Option<ContinuationToken>,
}

/// Point CRUD plus page queries over one transport
///
/// Holds no cache; every call goes to the store.
#[derive(Clone)]
pub struct TableClient {
    requests: SignedRequestBuilder,
    transport: Arc<dyn TableTransport>,
}

impl TableClient {
    /// Creates a client from a request builder and a transport
    pub fn new(requests: SignedRequestBuilder, transport: Arc<dyn TableTransport>) -> Self {
        Self {
            requests,
            transport,
        }
    }

    /// Request builder in use
    pub fn requests(&self) -> &SignedRequestBuilder {
        &self.requests
    }

    /// Inserts a new record
    ///
    /// # Errors
    ///
    /// Any status other than created or `409 Conflict`.
    pub async fn create(&self, table: &str, record: &Record) -> StoreResult<CreateOutcome> {
        let request = self.requests.build(
            table,
            TableOperation::Insert {
                body: wire::record_to_wire(record),
            },
        )?;
        let response = self.transport.send(request).await?;

        tracing::debug!(table = %table, key = %record.key, status = response.status, "Create");

        match response.status {
            s if (200..300).contains(&s) => Ok(CreateOutcome::Created),
            409 => Ok(CreateOutcome::Conflict),
            _ => Err(response.into_error()),
        }
    }

    /// Reads one record; `None` when the key does not exist
    pub async fn get(&self, table: &str, key: &RecordKey) -> StoreResult<Option<Record>> {
        let request = self
            .requests
            .build(table, TableOperation::Read { key: key.clone() })?;
        let response = self.transport.send(request).await?;

        tracing::debug!(table = %table, key = %key, status = response.status, "Get");

        match response.status {
            404 => Ok(None),
            s if (200..300).contains(&s) => decode_entity(response).map(Some),
            _ => Err(response.into_error()),
        }
    }

    /// Merges `attributes` into an existing record, unconditionally
    ///
    /// Attributes not present in the map are left untouched server-side.
    pub async fn merge(
        &self,
        table: &str,
        key: &RecordKey,
        attributes: Map<String, Value>,
    ) -> StoreResult<UpdateOutcome> {
        let body = wire::record_to_wire(&Record::new(key.clone(), attributes));
        let request = self.requests.build(
            table,
            TableOperation::Merge {
                key: key.clone(),
                body,
            },
        )?;
        let response = self.transport.send(request).await?;

        tracing::debug!(table = %table, key = %key, status = response.status, "Merge");

        match response.status {
            404 => Ok(UpdateOutcome::NotFound),
            s if (200..300).contains(&s) => Ok(UpdateOutcome::Updated),
            _ => Err(response.into_error()),
        }
    }

    /// Inserts or replaces a record
    pub async fn upsert(&self, table: &str, record: &Record) -> StoreResult<()> {
        let request = self.requests.build(
            table,
            TableOperation::Upsert {
                key: record.key.clone(),
                body: wire::record_to_wire(record),
            },
        )?;
        let response = self.transport.send(request).await?;

        tracing::debug!(table = %table, key = %record.key, status = response.status, "Upsert");

        if response.is_success() {
            Ok(())
        } else {
            Err(response.into_error())
        }
    }

    /// Deletes a record; deleting an absent key succeeds
    pub async fn delete(&self, table: &str, key: &RecordKey) -> StoreResult<DeleteOutcome> {
        let request = self
            .requests
            .build(table, TableOperation::Delete { key: key.clone() })?;
        let response = self.transport.send(request).await?;

        tracing::debug!(table = %table, key = %key, status = response.status, "Delete");

        match response.status {
            404 => Ok(DeleteOutcome::AlreadyAbsent),
            s if (200..300).contains(&s) => Ok(DeleteOutcome::Deleted),
            _ => Err(response.into_error()),
        }
    }

    /// Fetches one page of `table`
    pub async fn query_page(
        &self,
        table: &str,
        top: usize,
        resume: Option<&ContinuationToken>,
    ) -> StoreResult<PageResponse> {
        let request = self.requests.build(
            table,
            TableOperation::Query {
                top,
                resume: resume.cloned(),
            },
        )?;
        let response = self.transport.send(request).await?;

        if !response.is_success() {
            return Err(response.into_error());
        }

        let header_token = ContinuationToken::from_parts(
            response.header(NEXT_PARTITION_KEY_HEADER),
            response.header(NEXT_ROW_KEY_HEADER),
        );
        let parsed = wire::parse_query_body(&response.body)?;
        let records = parsed
            .entities
            .into_iter()
            .map(|entity| wire::record_from_wire(entity, None))
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(PageResponse {
            records,
            body_token: parsed.continuation,
            header_token,
        })
    }
}

fn decode_entity(response: TransportResponse) -> StoreResult<Record> {
    let etag = response.header("etag").map(str::to_string);
    let entity: Map<String, Value> = serde_json::from_str(&response.body).map_err(|e| {
        TableStoreError::InvalidResponse(format!("entity body is not a JSON object: {e}"))
    })?;
    wire::record_from_wire(entity, etag.as_deref())
}
