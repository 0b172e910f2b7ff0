//! In-memory table service
//!
//! Implements [`TableTransport`] by interpreting the same signed requests the
//! real service receives: it parses the request URL, requires a signature,
//! enforces a per-request page cap and emits continuation tokens. Tokens can
//! be delivered in headers, in the body, or not at all, and individual
//! requests can be made to fail, so scan and bulk behaviour can be exercised
//! without a network.

use super::client::TableClient;
use super::request::{HttpMethod, SignedRequest, SignedRequestBuilder};
use super::transport::{TableTransport, TransportResponse};
use super::wire::{NEXT_PARTITION_KEY_HEADER, NEXT_ROW_KEY_HEADER, PARTITION_KEY, ROW_KEY, TIMESTAMP};
use crate::config::{secret_string, StoreConfig};
use crate::domain::{Result, TableStoreError};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use url::Url;

/// Default per-request page cap, matching the real service
pub const DEFAULT_PAGE_CAP: usize = 1000;

/// Endpoint used by [`local_store_config`]
pub const LOCAL_ENDPOINT: &str = "http://127.0.0.1:10002/devstoreaccount1";

/// Store configuration whose credentials the in-memory service accepts
pub fn local_store_config(tables: &[&str]) -> StoreConfig {
    let mut store = StoreConfig {
        endpoint: LOCAL_ENDPOINT.to_string(),
        ..Default::default()
    };
    for table in tables {
        store.credentials.insert(
            table.to_string(),
            secret_string("?sv=2019-02-02&sp=raud&sig=local".to_string()),
        );
    }
    store
}

/// Where continuation tokens are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContinuationMode {
    /// `x-ms-continuation-*` response headers
    Headers,
    /// `x-ms-continuation-*` fields of the response body
    Body,
    /// Never reported, even when more records exist
    Omitted,
}

type EntityKey = (String, String);

#[derive(Debug, Clone)]
struct StoredEntity {
    attributes: Map<String, Value>,
    timestamp: String,
    version: u64,
}

#[derive(Debug)]
struct State {
    tables: HashMap<String, BTreeMap<EntityKey, StoredEntity>>,
    page_cap: usize,
    mode: ContinuationMode,
    failing_rows: HashMap<String, u16>,
    failing_queries: HashMap<usize, u16>,
    query_count: usize,
    request_log: Vec<(HttpMethod, String)>,
    version: u64,
}

/// Table service held entirely in memory
#[derive(Debug)]
pub struct InMemoryTableService {
    state: Mutex<State>,
}

impl Default for InMemoryTableService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTableService {
    /// Empty service reporting tokens in headers
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                tables: HashMap::new(),
                page_cap: DEFAULT_PAGE_CAP,
                mode: ContinuationMode::Headers,
                failing_rows: HashMap::new(),
                failing_queries: HashMap::new(),
                query_count: 0,
                request_log: Vec::new(),
                version: 0,
            }),
        }
    }

    /// Sets the maximum records returned per query
    pub fn with_page_cap(self, page_cap: usize) -> Self {
        self.lock().page_cap = page_cap.max(1);
        self
    }

    /// Sets where continuation tokens are reported
    pub fn with_continuation_mode(self, mode: ContinuationMode) -> Self {
        self.lock().mode = mode;
        self
    }

    /// Client whose requests are served by this service
    ///
    /// # Errors
    ///
    /// Returns an error if the store endpoint is invalid.
    pub fn connect(self: &Arc<Self>, store: &StoreConfig) -> Result<TableClient> {
        let requests = SignedRequestBuilder::new(store)?;
        Ok(TableClient::new(requests, self.clone()))
    }

    /// Stores an entity directly, bypassing requests
    pub fn seed(&self, table: &str, partition_key: &str, row_key: &str, attributes: Value) {
        let attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let mut state = self.lock();
        state.put(table, (partition_key.to_string(), row_key.to_string()), attributes);
    }

    /// Makes every entity-level request on `row_key` fail with `status`
    pub fn fail_row(&self, row_key: &str, status: u16) {
        self.lock().failing_rows.insert(row_key.to_string(), status);
    }

    /// Makes the `n`th collection query (1-based) fail with `status`
    pub fn fail_query(&self, n: usize, status: u16) {
        self.lock().failing_queries.insert(n, status);
    }

    /// Number of records in `table`
    pub fn len(&self, table: &str) -> usize {
        self.lock().tables.get(table).map_or(0, BTreeMap::len)
    }

    /// Whether `table` is empty
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Stored attributes of one entity
    pub fn attributes(&self, table: &str, partition_key: &str, row_key: &str) -> Option<Map<String, Value>> {
        self.lock()
            .tables
            .get(table)
            .and_then(|t| t.get(&(partition_key.to_string(), row_key.to_string())))
            .map(|e| e.attributes.clone())
    }

    /// Row keys of every record in `table`
    pub fn row_keys(&self, table: &str) -> HashSet<String> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.keys().map(|(_, rk)| rk.clone()).collect())
            .unwrap_or_default()
    }

    /// Collection queries received so far
    pub fn query_count(&self) -> usize {
        self.lock().query_count
    }

    /// Every request received, as `(method, url without signature)`
    pub fn request_log(&self) -> Vec<(HttpMethod, String)> {
        self.lock().request_log.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TableTransport for InMemoryTableService {
    async fn send(
        &self,
        request: SignedRequest,
    ) -> std::result::Result<TransportResponse, TableStoreError> {
        let url = Url::parse(&request.url)
            .map_err(|e| TableStoreError::ConnectionFailed(format!("invalid URL: {e}")))?;

        let mut state = self.lock();
        state
            .request_log
            .push((request.method, request.redacted_url().to_string()));

        if !url.query_pairs().any(|(name, value)| name == "sig" && !value.is_empty()) {
            return Ok(error_response(403, "AuthenticationFailed", "Signature not present"));
        }

        let segment = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string();

        let Some(open) = segment.find('(') else {
            let table = decode(&segment);
            return Ok(match request.method {
                HttpMethod::Get => state.query(&table, &url),
                HttpMethod::Post => state.insert(&table, request.body),
                _ => error_response(405, "MethodNotAllowed", "Unsupported collection verb"),
            });
        };

        let table = decode(&segment[..open]);
        let Some(key) = parse_entity_key(&segment[open..]) else {
            return Ok(error_response(400, "InvalidInput", "Malformed entity address"));
        };

        if let Some(status) = state.failing_rows.get(&key.1).copied() {
            return Ok(error_response(status, "InjectedFailure", "Injected failure"));
        }

        Ok(match request.method {
            HttpMethod::Get => state.read(&table, &key),
            HttpMethod::Merge => state.merge(&table, key, request.body),
            HttpMethod::Put => state.replace(&table, key, request.body),
            HttpMethod::Delete => state.delete(&table, &key),
            HttpMethod::Post => error_response(405, "MethodNotAllowed", "POST on entity"),
        })
    }
}

impl State {
    fn put(&mut self, table: &str, key: EntityKey, attributes: Map<String, Value>) -> u64 {
        self.version += 1;
        let version = self.version;
        let attributes = attributes
            .into_iter()
            .filter(|(name, value)| !value.is_null() && !is_reserved(name))
            .collect();
        self.tables.entry(table.to_string()).or_default().insert(
            key,
            StoredEntity {
                attributes,
                timestamp: Utc::now().to_rfc3339(),
                version,
            },
        );
        version
    }

    fn query(&mut self, table: &str, url: &Url) -> TransportResponse {
        self.query_count += 1;
        if let Some(status) = self.failing_queries.get(&self.query_count).copied() {
            return error_response(status, "InjectedFailure", "Injected query failure");
        }

        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let top = params
            .get("$top")
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(self.page_cap)
            .min(self.page_cap);
        let start = params.get("NextPartitionKey").map(|pk| {
            (
                pk.clone(),
                params.get("NextRowKey").cloned().unwrap_or_default(),
            )
        });

        let empty = BTreeMap::new();
        let rows = self.tables.get(table).unwrap_or(&empty);
        let mut remaining = rows
            .iter()
            .filter(|(key, _)| start.as_ref().map_or(true, |s| *key >= s));

        let page: Vec<Value> = remaining
            .by_ref()
            .take(top)
            .map(|(key, entity)| entity_json(key, entity))
            .collect();
        let next = remaining.next().map(|(key, _)| key.clone());

        let mut body = json!({ "value": page });
        let mut response = TransportResponse::new(200, "");
        if let Some((pk, rk)) = next {
            match self.mode {
                ContinuationMode::Headers => {
                    response = response
                        .with_header(NEXT_PARTITION_KEY_HEADER, pk)
                        .with_header(NEXT_ROW_KEY_HEADER, rk);
                }
                ContinuationMode::Body => {
                    body["x-ms-continuation-NextPartitionKey"] = Value::String(pk);
                    body["x-ms-continuation-NextRowKey"] = Value::String(rk);
                }
                ContinuationMode::Omitted => {}
            }
        }
        response.body = body.to_string();
        response
    }

    fn insert(&mut self, table: &str, body: Option<Value>) -> TransportResponse {
        let Some(Value::Object(mut attributes)) = body else {
            return error_response(400, "InvalidInput", "Body must be an object");
        };
        let Some(key) = take_key(&mut attributes) else {
            return error_response(400, "PropertiesNeedValue", "PartitionKey and RowKey required");
        };
        if let Some(status) = self.failing_rows.get(&key.1).copied() {
            return error_response(status, "InjectedFailure", "Injected failure");
        }
        if self.tables.get(table).is_some_and(|t| t.contains_key(&key)) {
            return error_response(409, "EntityAlreadyExists", "The specified entity already exists.");
        }
        let version = self.put(table, key, attributes);
        TransportResponse::new(204, "").with_header("ETag", etag(version))
    }

    fn read(&self, table: &str, key: &EntityKey) -> TransportResponse {
        match self.tables.get(table).and_then(|t| t.get(key)) {
            Some(entity) => TransportResponse::new(200, entity_json(key, entity).to_string())
                .with_header("ETag", etag(entity.version)),
            None => not_found(),
        }
    }

    fn merge(&mut self, table: &str, key: EntityKey, body: Option<Value>) -> TransportResponse {
        let Some(Value::Object(changes)) = body else {
            return error_response(400, "InvalidInput", "Body must be an object");
        };
        let Some(existing) = self.tables.get(table).and_then(|t| t.get(&key)) else {
            return not_found();
        };
        let mut attributes = existing.attributes.clone();
        for (name, value) in changes {
            if is_reserved(&name) {
                continue;
            }
            if value.is_null() {
                attributes.remove(&name);
            } else {
                attributes.insert(name, value);
            }
        }
        let version = self.put(table, key, attributes);
        TransportResponse::new(204, "").with_header("ETag", etag(version))
    }

    fn replace(&mut self, table: &str, key: EntityKey, body: Option<Value>) -> TransportResponse {
        let Some(Value::Object(attributes)) = body else {
            return error_response(400, "InvalidInput", "Body must be an object");
        };
        let version = self.put(table, key, attributes);
        TransportResponse::new(204, "").with_header("ETag", etag(version))
    }

    fn delete(&mut self, table: &str, key: &EntityKey) -> TransportResponse {
        match self.tables.get_mut(table).and_then(|t| t.remove(key)) {
            Some(_) => TransportResponse::new(204, ""),
            None => not_found(),
        }
    }
}

fn entity_json(key: &EntityKey, entity: &StoredEntity) -> Value {
    let mut map = Map::new();
    map.insert("odata.etag".to_string(), Value::String(etag(entity.version)));
    map.insert(PARTITION_KEY.to_string(), Value::String(key.0.clone()));
    map.insert(ROW_KEY.to_string(), Value::String(key.1.clone()));
    map.insert(TIMESTAMP.to_string(), Value::String(entity.timestamp.clone()));
    for (name, value) in &entity.attributes {
        map.insert(name.clone(), value.clone());
    }
    Value::Object(map)
}

fn etag(version: u64) -> String {
    format!("W/\"datetime'{version}'\"")
}

fn is_reserved(name: &str) -> bool {
    name == PARTITION_KEY || name == ROW_KEY || name == TIMESTAMP || name.starts_with("odata.")
}

fn take_key(attributes: &mut Map<String, Value>) -> Option<EntityKey> {
    let pk = attributes.remove(PARTITION_KEY)?.as_str()?.to_string();
    let rk = attributes.remove(ROW_KEY)?.as_str()?.to_string();
    Some((pk, rk))
}

fn decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Parses `(PartitionKey='..',RowKey='..')` with percent-encoded literals
fn parse_entity_key(raw: &str) -> Option<EntityKey> {
    let inner = raw.strip_prefix("(PartitionKey='")?.strip_suffix("')")?;
    let (pk, rk) = inner.split_once("',RowKey='")?;
    let unescape = |s: &str| decode(s).replace("''", "'");
    Some((unescape(pk), unescape(rk)))
}

fn not_found() -> TransportResponse {
    error_response(404, "ResourceNotFound", "The specified resource does not exist.")
}

fn error_response(status: u16, code: &str, message: &str) -> TransportResponse {
    let body = json!({
        "odata.error": {
            "code": code,
            "message": { "lang": "en-US", "value": message }
        }
    });
    TransportResponse::new(status, body.to_string())
}
