//! Declarative field schemas for typed entities
//!
//! Every entity lists its fields as `(canonical name, candidate wire keys,
//! default)`. The candidate order is the read priority: the first candidate
//! holding a non-null, non-empty value wins. The canonical name is the only
//! key the write path emits; every other candidate is a legacy spelling.

use super::record::RecordKey;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Value applied when none of a field's candidates carries a value
///
/// The variant also fixes the JSON type the field is coerced to on decode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    /// String field
    Text(&'static str),
    /// Integer field
    Integer(i64),
    /// Boolean field
    Flag(bool),
    /// Optional string field, absent when no candidate has a value
    Absent,
}

impl FieldDefault {
    /// The default as a JSON value
    pub fn to_value(self) -> Value {
        match self {
            FieldDefault::Text(s) => Value::String(s.to_string()),
            FieldDefault::Integer(n) => Value::from(n),
            FieldDefault::Flag(b) => Value::Bool(b),
            FieldDefault::Absent => Value::Null,
        }
    }
}

/// One domain field and the wire keys it may be stored under
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Canonical wire key, identical to the entity's serde field name
    pub name: &'static str,

    /// Wire keys in read-priority order
    pub candidates: &'static [&'static str],

    /// Value used when no candidate is present
    pub default: FieldDefault,
}

impl FieldSpec {
    /// Creates a field entry
    pub const fn new(
        name: &'static str,
        candidates: &'static [&'static str],
        default: FieldDefault,
    ) -> Self {
        Self {
            name,
            candidates,
            default,
        }
    }

    /// Candidate keys other than the canonical one
    pub fn legacy_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.candidates
            .iter()
            .copied()
            .filter(move |key| *key != self.name)
    }
}

/// Field layout of one entity type
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    /// Entity name used in logs
    pub entity: &'static str,

    /// Fixed partition every record of this entity lives in
    pub partition_key: &'static str,

    /// Modelled fields
    pub fields: &'static [FieldSpec],
}

impl EntitySchema {
    /// Looks up a field by canonical name
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether `key` is any candidate of any modelled field
    pub fn claims(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.candidates.contains(&key))
    }
}

/// A typed projection of a table record
///
/// Implementors serialize to a flat map whose keys are exactly the canonical
/// field names of [`Self::SCHEMA`], plus a flattened map of unmodelled
/// attributes that is carried through untouched.
pub trait TableEntity: Serialize + DeserializeOwned + Sized {
    /// Field layout
    const SCHEMA: EntitySchema;

    /// Record address of this entity
    fn key(&self) -> &RecordKey;

    /// Sets the record address after decoding
    fn set_key(&mut self, key: RecordKey);

    /// Fix-ups applied after decoding (e.g. deriving ids from the row key)
    fn after_decode(&mut self) {}
}
