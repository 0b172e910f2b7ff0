//! Generic table records
//!
//! A [`Record`] is the untyped unit the remote store deals in: a
//! `(partition key, row key)` address, a flat attribute map and the
//! store-issued concurrency token. Typed entities are projections of it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Characters the table store rejects inside key values
const FORBIDDEN_KEY_CHARS: [char; 4] = ['/', '\\', '#', '?'];

/// Address of one record: partition key plus row key
///
/// `(partition_key, row_key)` uniquely identifies a record within a table.
///
/// # Examples
///
/// ```
/// use tablesync::domain::RecordKey;
///
/// let key = RecordKey::new("patient", "File 12").unwrap();
/// assert_eq!(key.partition_key(), "patient");
/// assert_eq!(key.row_key(), "File 12");
/// assert!(RecordKey::new("patient", "a/b").is_err());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey {
    partition_key: String,
    row_key: String,
}

impl RecordKey {
    /// Creates a key, rejecting characters the store does not accept
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Result<Self, String> {
        let partition_key = partition_key.into();
        let row_key = row_key.into();
        validate_key_part("PartitionKey", &partition_key)?;
        validate_key_part("RowKey", &row_key)?;
        Ok(Self {
            partition_key,
            row_key,
        })
    }

    /// Returns the partition key
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    /// Returns the row key
    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    /// Consumes self and returns `(partition_key, row_key)`
    pub fn into_parts(self) -> (String, String) {
        (self.partition_key, self.row_key)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}

fn validate_key_part(name: &str, value: &str) -> Result<(), String> {
    if let Some(c) = value
        .chars()
        .find(|c| FORBIDDEN_KEY_CHARS.contains(c) || c.is_control())
    {
        return Err(format!("{name} contains forbidden character {c:?}: {value}"));
    }
    if value.len() > 1024 {
        return Err(format!("{name} exceeds 1024 bytes"));
    }
    Ok(())
}

/// One record of a remote table
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// Address of the record
    pub key: RecordKey,

    /// Attribute map (everything except keys and store metadata)
    pub attributes: Map<String, Value>,

    /// Opaque concurrency token issued by the store
    pub etag: Option<String>,

    /// Store-maintained last-modified timestamp
    pub timestamp: Option<String>,
}

impl Record {
    /// Creates a record that has not been read from the store yet
    pub fn new(key: RecordKey, attributes: Map<String, Value>) -> Self {
        Self {
            key,
            attributes,
            etag: None,
            timestamp: None,
        }
    }

    /// Returns an attribute by wire name
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_key_accepts_business_identifiers() {
        let key = RecordKey::new("patient", "File 123").unwrap();
        assert_eq!(key.to_string(), "patient/File 123");
        assert_eq!(key.into_parts(), ("patient".to_string(), "File 123".to_string()));
    }

    #[test]
    fn test_record_key_allows_quotes_and_at_signs() {
        assert!(RecordKey::new("user", "o'brien@example.com").is_ok());
    }

    #[test]
    fn test_record_key_rejects_forbidden_characters() {
        assert!(RecordKey::new("patient", "a#b").is_err());
        assert!(RecordKey::new("pat/ient", "1").is_err());
        assert!(RecordKey::new("patient", "line\nbreak").is_err());
    }

    #[test]
    fn test_record_attribute_lookup() {
        let mut attributes = Map::new();
        attributes.insert("name".to_string(), json!("Jane"));
        let record = Record::new(RecordKey::new("patient", "1").unwrap(), attributes);
        assert_eq!(record.attribute("name"), Some(&json!("Jane")));
        assert!(record.attribute("email").is_none());
        assert!(record.etag.is_none());
    }
}
