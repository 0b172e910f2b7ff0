//! Snapshot checksums
//!
//! SHA-256 over canonical JSON: object keys sorted at every depth, no
//! whitespace. Two snapshots with the same content hash the same regardless
//! of key order.

use crate::domain::{Result, TableSyncError};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex-encoded SHA-256 of the canonical form of `data`
///
/// # Examples
///
/// ```
/// use tablesync::core::backup::checksum::calculate_checksum;
/// use serde_json::json;
///
/// let a = calculate_checksum(&json!({"Patients": [], "Users": []})).unwrap();
/// let b = calculate_checksum(&json!({"Users": [], "Patients": []})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 64);
/// ```
pub fn calculate_checksum(data: &Value) -> Result<String> {
    let canonical = serde_json::to_string(&canonicalize(data))
        .map_err(|e| TableSyncError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<&String, Value> =
                map.iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().map(|(k, v)| (k.clone(), v)).collect())
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checksum_changes_with_content() {
        let a = json!({ "Patients": [{ "PartitionKey": "patient", "RowKey": "File 1", "name": "A" }] });
        let b = json!({ "Patients": [{ "PartitionKey": "patient", "RowKey": "File 1", "name": "B" }] });
        assert_ne!(calculate_checksum(&a).unwrap(), calculate_checksum(&b).unwrap());
    }

    #[test]
    fn test_checksum_ignores_nested_key_order() {
        let a = json!({ "t": [{ "b": 1, "a": { "y": 2, "x": 1 } }] });
        let b = json!({ "t": [{ "a": { "x": 1, "y": 2 }, "b": 1 }] });
        assert_eq!(calculate_checksum(&a).unwrap(), calculate_checksum(&b).unwrap());
    }

    #[test]
    fn test_checksum_is_lowercase_hex() {
        let checksum = calculate_checksum(&json!({})).unwrap();
        assert_eq!(checksum.len(), 64);
        assert!(checksum.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_array_order_matters() {
        let a = json!({ "t": [1, 2] });
        let b = json!({ "t": [2, 1] });
        assert_ne!(calculate_checksum(&a).unwrap(), calculate_checksum(&b).unwrap());
    }
}
