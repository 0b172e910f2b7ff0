//! Signed request builder
//!
//! Turns `(table, operation)` into a fully addressed request descriptor with
//! the table's signed query string embedded in the URL. No I/O happens here;
//! a table without a configured credential fails before anything is sent.

use super::wire::ContinuationToken;
use crate::config::{SecretString, StoreConfig};
use crate::domain::{RecordKey, Result, TableStoreError, TableSyncError};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Accept header value asking for minimal OData metadata
pub const ACCEPT_MINIMAL_METADATA: &str = "application/json;odata=minimalmetadata";

const DATA_SERVICE_VERSION: &str = "3.0;NetFx";

/// HTTP verbs used against the table service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Merge,
    Delete,
}

impl HttpMethod {
    /// Verb as sent on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Merge => "MERGE",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation to address
#[derive(Debug, Clone, PartialEq)]
pub enum TableOperation {
    /// Insert a new entity; the body carries `PartitionKey` and `RowKey`
    Insert { body: Map<String, Value> },
    /// Fetch one page of the table
    Query {
        top: usize,
        resume: Option<ContinuationToken>,
    },
    /// Point read
    Read { key: RecordKey },
    /// Unconditional partial update
    Merge {
        key: RecordKey,
        body: Map<String, Value>,
    },
    /// Insert-or-replace
    Upsert {
        key: RecordKey,
        body: Map<String, Value>,
    },
    /// Unconditional delete
    Delete { key: RecordKey },
}

/// A request ready to be sent by a transport
#[derive(Clone, PartialEq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

impl SignedRequest {
    /// Looks up a header by exact name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// URL with the signed query string removed, safe to log
    pub fn redacted_url(&self) -> &str {
        self.url.split('?').next().unwrap_or_default()
    }
}

impl fmt::Debug for SignedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedRequest")
            .field("method", &self.method)
            .field("url", &self.redacted_url())
            .field("headers", &self.headers)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Builds signed requests from an injected store configuration
#[derive(Debug, Clone)]
pub struct SignedRequestBuilder {
    endpoint: String,
    api_version: String,
    credentials: BTreeMap<String, SecretString>,
}

impl SignedRequestBuilder {
    /// Creates a builder from the store configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the endpoint cannot be resolved.
    pub fn new(store: &StoreConfig) -> Result<Self> {
        let endpoint = store.endpoint_url().map_err(TableSyncError::Configuration)?;

        Ok(Self {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            api_version: store.api_version.clone(),
            credentials: store.credentials.clone(),
        })
    }

    /// Base endpoint without trailing slash
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Whether a usable credential exists for `table`
    pub fn has_credential(&self, table: &str) -> bool {
        self.signature(table).is_ok()
    }

    /// Builds the request for `operation` on `table`
    ///
    /// # Errors
    ///
    /// Returns [`TableStoreError::MissingCredential`] if no non-empty signed
    /// query string is configured for `table`.
    pub fn build(
        &self,
        table: &str,
        operation: TableOperation,
    ) -> std::result::Result<SignedRequest, TableStoreError> {
        let sas = self.signature(table)?;

        let (method, url, body) = match operation {
            TableOperation::Insert { body } => (
                HttpMethod::Post,
                format!("{}/{}?{}", self.endpoint, table, sas),
                Some(Value::Object(body)),
            ),
            TableOperation::Query { top, resume } => {
                let mut url = format!("{}/{}?{}&$top={}", self.endpoint, table, sas, top);
                if let Some(token) = resume {
                    url.push_str("&NextPartitionKey=");
                    url.push_str(&urlencoding::encode(&token.next_partition_key));
                    if let Some(row_key) = token.next_row_key.as_deref() {
                        url.push_str("&NextRowKey=");
                        url.push_str(&urlencoding::encode(row_key));
                    }
                }
                (HttpMethod::Get, url, None)
            }
            TableOperation::Read { key } => (HttpMethod::Get, self.entity_url(table, &key, sas), None),
            TableOperation::Merge { key, body } => (
                HttpMethod::Merge,
                self.entity_url(table, &key, sas),
                Some(Value::Object(body)),
            ),
            TableOperation::Upsert { key, body } => (
                HttpMethod::Put,
                self.entity_url(table, &key, sas),
                Some(Value::Object(body)),
            ),
            TableOperation::Delete { key } => {
                (HttpMethod::Delete, self.entity_url(table, &key, sas), None)
            }
        };

        let mut headers = BTreeMap::new();
        headers.insert("x-ms-version".to_string(), self.api_version.clone());
        headers.insert(
            "x-ms-date".to_string(),
            Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        );
        headers.insert(
            "x-ms-client-request-id".to_string(),
            Uuid::new_v4().to_string(),
        );
        headers.insert("Accept".to_string(), ACCEPT_MINIMAL_METADATA.to_string());
        headers.insert(
            "DataServiceVersion".to_string(),
            DATA_SERVICE_VERSION.to_string(),
        );
        headers.insert(
            "MaxDataServiceVersion".to_string(),
            DATA_SERVICE_VERSION.to_string(),
        );
        if body.is_some() {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        match method {
            HttpMethod::Merge | HttpMethod::Delete => {
                headers.insert("If-Match".to_string(), "*".to_string());
            }
            HttpMethod::Post => {
                headers.insert("Prefer".to_string(), "return-no-content".to_string());
            }
            HttpMethod::Get | HttpMethod::Put => {}
        }

        Ok(SignedRequest {
            method,
            url,
            headers,
            body,
        })
    }

    fn signature(&self, table: &str) -> std::result::Result<&str, TableStoreError> {
        self.credentials
            .get(table)
            .map(|secret| secret.expose_secret().query())
            .filter(|query| !query.is_empty())
            .ok_or_else(|| TableStoreError::MissingCredential(table.to_string()))
    }

    fn entity_url(&self, table: &str, key: &RecordKey, sas: &str) -> String {
        format!(
            "{}/{}(PartitionKey='{}',RowKey='{}')?{}",
            self.endpoint,
            table,
            encode_key(key.partition_key()),
            encode_key(key.row_key()),
            sas
        )
    }
}

/// Escapes a key as an OData string literal, then percent-encodes it
pub fn encode_key(value: &str) -> String {
    urlencoding::encode(&value.replace('\'', "''")).into_owned()
}
