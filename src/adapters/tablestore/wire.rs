//! Wire format of the table service
//!
//! Entities travel as flat JSON objects with the keys inline (`PartitionKey`,
//! `RowKey`) next to store metadata (`Timestamp`, `odata.*` annotations).
//! Property type annotations (`Age@odata.type`) belong to the data: minimal
//! metadata sends Int64, DateTime, Guid and Binary values as strings that only
//! the annotation distinguishes. Query responses wrap them in a `value` array.

use crate::domain::{Record, RecordKey, TableStoreError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PARTITION_KEY: &str = "PartitionKey";
pub const ROW_KEY: &str = "RowKey";
pub const TIMESTAMP: &str = "Timestamp";
const ODATA_ETAG: &str = "odata.etag";

/// Response header carrying the next partition key
pub const NEXT_PARTITION_KEY_HEADER: &str = "x-ms-continuation-nextpartitionkey";
/// Response header carrying the next row key
pub const NEXT_ROW_KEY_HEADER: &str = "x-ms-continuation-nextrowkey";

const BODY_TOKEN_FIELDS: [(&str, &str); 2] = [
    ("x-ms-continuation-NextPartitionKey", "x-ms-continuation-NextRowKey"),
    ("NextPartitionKey", "NextRowKey"),
];

/// Raw continuation values returned by the store
///
/// An empty partition key never forms a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub next_partition_key: String,
    pub next_row_key: Option<String>,
}

impl ContinuationToken {
    /// Builds a token from raw values, treating empty strings as absent
    pub fn from_parts(partition_key: Option<&str>, row_key: Option<&str>) -> Option<Self> {
        let partition_key = partition_key.filter(|pk| !pk.is_empty())?;
        Some(Self {
            next_partition_key: partition_key.to_string(),
            next_row_key: row_key.filter(|rk| !rk.is_empty()).map(str::to_string),
        })
    }
}

/// Decoded body of a collection query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryBody {
    pub entities: Vec<Map<String, Value>>,
    pub continuation: Option<ContinuationToken>,
}

/// Parses a collection query body
///
/// # Errors
///
/// Returns `InvalidResponse` when the body is not JSON or has no `value`
/// array of objects.
pub fn parse_query_body(body: &str) -> Result<QueryBody, TableStoreError> {
    let mut root: Map<String, Value> = serde_json::from_str(body)
        .map_err(|e| TableStoreError::InvalidResponse(format!("query body is not a JSON object: {e}")))?;

    let continuation = BODY_TOKEN_FIELDS.iter().find_map(|(pk_field, rk_field)| {
        ContinuationToken::from_parts(
            root.get(*pk_field).and_then(Value::as_str),
            root.get(*rk_field).and_then(Value::as_str),
        )
    });

    let entities = match root.remove("value") {
        Some(Value::Array(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(TableStoreError::InvalidResponse(format!(
                    "query result item is not an object: {other}"
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => {
            return Err(TableStoreError::InvalidResponse(
                "query body 'value' is not an array".to_string(),
            ))
        }
        None => {
            return Err(TableStoreError::InvalidResponse(
                "query body has no 'value' array".to_string(),
            ))
        }
    };

    Ok(QueryBody {
        entities,
        continuation,
    })
}

/// Converts a wire entity to a [`Record`]
///
/// `etag_header` is the response `ETag`, preferred over the inline
/// `odata.etag` annotation.
///
/// # Errors
///
/// Returns `InvalidResponse` when the keys are missing or malformed.
pub fn record_from_wire(
    mut entity: Map<String, Value>,
    etag_header: Option<&str>,
) -> Result<Record, TableStoreError> {
    let partition_key = take_string(&mut entity, PARTITION_KEY)?;
    let row_key = take_string(&mut entity, ROW_KEY)?;
    let key = RecordKey::new(partition_key, row_key).map_err(TableStoreError::InvalidResponse)?;

    let timestamp = entity
        .remove(TIMESTAMP)
        .and_then(|v| v.as_str().map(str::to_string));
    let inline_etag = entity
        .remove(ODATA_ETAG)
        .and_then(|v| v.as_str().map(str::to_string));

    entity.retain(|name, _| !is_metadata(name));

    Ok(Record {
        key,
        attributes: entity,
        etag: etag_header.map(str::to_string).or(inline_etag),
        timestamp,
    })
}

/// Converts a [`Record`] to a wire entity with its keys inline
///
/// Store metadata (`Timestamp`, etag) is never sent. A type annotation is
/// sent only alongside the property it describes.
pub fn record_to_wire(record: &Record) -> Map<String, Value> {
    let mut entity = Map::with_capacity(record.attributes.len() + 2);
    entity.insert(
        PARTITION_KEY.to_string(),
        Value::String(record.key.partition_key().to_string()),
    );
    entity.insert(
        ROW_KEY.to_string(),
        Value::String(record.key.row_key().to_string()),
    );
    for (name, value) in &record.attributes {
        if name == PARTITION_KEY || name == ROW_KEY || name == TIMESTAMP || is_metadata(name) {
            continue;
        }
        if let Some(property) = annotated_property(name) {
            if !record.attributes.contains_key(property) {
                continue;
            }
        }
        entity.insert(name.clone(), value.clone());
    }
    entity
}

/// Entity-level annotations: `odata.etag`, `odata.metadata`, ...
fn is_metadata(name: &str) -> bool {
    name.starts_with("odata.")
}

/// `Price` for `Price@odata.type`
fn annotated_property(name: &str) -> Option<&str> {
    name.split_once("@odata.").map(|(property, _)| property)
}

fn take_string(entity: &mut Map<String, Value>, field: &str) -> Result<String, TableStoreError> {
    match entity.remove(field) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => Err(TableStoreError::InvalidResponse(format!(
            "{field} is not a string: {other}"
        ))),
        None => Err(TableStoreError::InvalidResponse(format!(
            "entity has no {field}"
        ))),
    }
}
