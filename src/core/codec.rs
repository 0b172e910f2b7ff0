//! Entity codec
//!
//! Converts between [`Record`] attribute maps and typed entities using the
//! entity's declarative [`EntitySchema`]. Decoding reconciles legacy and
//! current key spellings in schema priority order and falls back to the
//! field default; attributes no field claims are carried through in the
//! entity's `extra` map.

use crate::domain::{EntitySchema, FieldDefault, FieldSpec, Record, Result, TableEntity, TableSyncError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Decodes a record into a typed entity
///
/// Never fails on missing or mistyped attributes; those fall back to the
/// field default. Errors only surface if the entity type itself rejects the
/// normalized map.
pub fn decode<E: TableEntity>(record: &Record) -> Result<E> {
    let normalized = normalize(&E::SCHEMA, &record.attributes);
    let mut entity: E = serde_json::from_value(Value::Object(normalized)).map_err(|e| {
        TableSyncError::Serialization(format!(
            "Failed to decode {} {}: {}",
            E::SCHEMA.entity,
            record.key,
            e
        ))
    })?;
    entity.set_key(record.key.clone());
    entity.after_decode();
    Ok(entity)
}

/// Encodes a full entity into a record
///
/// Only canonical keys and carried-through attributes are emitted.
/// Absent optional fields are left out.
pub fn encode<E: TableEntity>(entity: &E) -> Result<Record> {
    let mut attributes = to_object(entity)?;
    attributes.retain(|_, value| !value.is_null());
    Ok(Record::new(entity.key().clone(), attributes))
}

/// Encodes a partial update into the attribute map sent with a merge
///
/// Every changed field is written under its canonical key and each of its
/// legacy spellings is cleared with an explicit null.
pub fn encode_update<U: Serialize>(schema: &EntitySchema, update: &U) -> Result<Map<String, Value>> {
    Ok(encode_changes(schema, to_object(update)?))
}

/// Expands a map of changed canonical fields with legacy-key nulls
///
/// Keys that are not modelled fields pass through unchanged.
pub fn encode_changes(schema: &EntitySchema, changes: Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(changes.len());
    for (name, value) in changes {
        if let Some(field) = schema.field(&name) {
            for legacy in field.legacy_keys() {
                out.insert(legacy.to_string(), Value::Null);
            }
        }
        out.insert(name, value);
    }
    out
}

/// Reduces a raw attribute map to canonical keys
///
/// Every candidate key of every field is consumed; the winning value is
/// coerced to the field's type. Unclaimed attributes are kept as-is.
pub fn normalize(schema: &EntitySchema, attributes: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(schema.fields.len());

    for field in schema.fields {
        out.insert(field.name.to_string(), resolve(field, attributes));
    }

    for (name, value) in attributes {
        if !schema.claims(name) && !out.contains_key(name) && !value.is_null() {
            out.insert(name.clone(), value.clone());
        }
    }

    out
}

fn resolve(field: &FieldSpec, attributes: &Map<String, Value>) -> Value {
    field
        .candidates
        .iter()
        .filter_map(|key| attributes.get(*key))
        .find_map(|value| coerce(value, field.default))
        .unwrap_or_else(|| field.default.to_value())
}

/// Converts a present value to the field's type, `None` when it carries
/// nothing usable
fn coerce(value: &Value, default: FieldDefault) -> Option<Value> {
    match value {
        Value::Null => return None,
        Value::String(s) if s.is_empty() => return None,
        _ => {}
    }

    match default {
        FieldDefault::Text(_) | FieldDefault::Absent => Some(Value::String(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        FieldDefault::Integer(_) => match value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .map(Value::from),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            Value::Bool(b) => Some(Value::from(i64::from(*b))),
            _ => None,
        },
        FieldDefault::Flag(_) => match value {
            Value::Bool(b) => Some(Value::Bool(*b)),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Some(Value::Bool(true)),
                "false" | "0" | "no" => Some(Value::Bool(false)),
                _ => None,
            },
            Value::Number(n) => n.as_i64().map(|i| Value::Bool(i != 0)),
            _ => None,
        },
    }
}

fn to_object<T: Serialize>(value: &T) -> Result<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(TableSyncError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Patient, PatientUpdate, RecordKey, User};
    use serde_json::json;

    fn patient_record(attributes: Value) -> Record {
        let attributes = match attributes {
            Value::Object(map) => map,
            _ => panic!("attributes must be an object"),
        };
        Record::new(RecordKey::new("patient", "File 1").unwrap(), attributes)
    }

    #[test]
    fn test_legacy_only_field_is_read() {
        let patient: Patient = decode(&patient_record(json!({ "Name": "Thandi" }))).unwrap();
        assert_eq!(patient.name, "Thandi");
    }

    #[test]
    fn test_priority_order_per_field() {
        let patient: Patient = decode(&patient_record(json!({
            "Name": "Legacy",
            "name": "Current",
            "status": "Alive",
            "Status": "Deceased"
        })))
        .unwrap();
        // name prefers PascalCase, status prefers camelCase
        assert_eq!(patient.name, "Legacy");
        assert_eq!(patient.status, "Alive");
    }

    #[test]
    fn test_empty_candidate_falls_through() {
        let patient: Patient =
            decode(&patient_record(json!({ "Email": "", "email": "a@b.co" }))).unwrap();
        assert_eq!(patient.email, "a@b.co");
    }

    #[test]
    fn test_defaults_applied_to_empty_record() {
        let patient: Patient = decode(&patient_record(json!({}))).unwrap();
        assert_eq!(patient.status, "Unknown");
        assert_eq!(patient.id, "File 1");
        assert_eq!(patient.name, "");
        assert!(patient.deceased_date.is_none());
    }

    #[test]
    fn test_non_string_values_are_coerced() {
        let patient: Patient =
            decode(&patient_record(json!({ "PostalCode": 2001, "phone": true }))).unwrap();
        assert_eq!(patient.postal_code, "2001");
        assert_eq!(patient.phone, "true");
    }

    #[test]
    fn test_unknown_attributes_pass_through() {
        let record = patient_record(json!({ "name": "A", "address": "1 Main Rd", "legacyFlag": 1 }));
        let patient: Patient = decode(&record).unwrap();
        assert_eq!(patient.extra.get("address"), Some(&json!("1 Main Rd")));

        let encoded = encode(&patient).unwrap();
        assert_eq!(encoded.attribute("address"), Some(&json!("1 Main Rd")));
        assert_eq!(encoded.attribute("legacyFlag"), Some(&json!(1)));
    }

    #[test]
    fn test_encode_emits_only_canonical_keys() {
        let patient: Patient =
            decode(&patient_record(json!({ "Name": "A", "MedicalRecordNumber": "File 1" })))
                .unwrap();
        let encoded = encode(&patient).unwrap();
        assert!(encoded.attribute("Name").is_none());
        assert!(encoded.attribute("MedicalRecordNumber").is_none());
        assert_eq!(encoded.attribute("name"), Some(&json!("A")));
        assert_eq!(encoded.attribute("medicalRecordNumber"), Some(&json!("File 1")));
        assert!(encoded.attribute("deceasedDate").is_none());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let inputs = [
            json!({}),
            json!({ "Name": "Legacy", "name": "", "Status": "Deceased", "DeceasedDate": "2023-04-01" }),
            json!({ "name": "Only camel", "CreatedAt": "2024-01-01T00:00:00Z", "tags": [1, 2] }),
            json!({ "Id": "X", "id": null, "PostalCode": 8001, "notes": { "a": 1 } }),
            json!({ "Email": "", "email": "", "status": "" }),
        ];

        for input in inputs {
            let record = patient_record(input.clone());
            let once: Patient = decode(&record).unwrap();
            let twice: Patient = decode(&encode(&once).unwrap()).unwrap();
            assert_eq!(once, twice, "not idempotent for {input}");
        }
    }

    #[test]
    fn test_encode_update_clears_legacy_keys() {
        let changes = encode_update(&Patient::SCHEMA, &PatientUpdate::status("Deceased")).unwrap();
        assert_eq!(
            Value::Object(changes),
            json!({ "status": "Deceased", "Status": null })
        );
    }

    #[test]
    fn test_encode_changes_passes_unknown_keys() {
        let mut changes = Map::new();
        changes.insert("name".to_string(), json!("B"));
        changes.insert("password".to_string(), json!("hash"));
        let out = encode_changes(&User::SCHEMA, changes);
        assert_eq!(out.get("Name"), Some(&Value::Null));
        assert_eq!(out.get("password"), Some(&json!("hash")));
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_coerce_integer_and_flag() {
        assert_eq!(coerce(&json!("42"), FieldDefault::Integer(0)), Some(json!(42)));
        assert_eq!(coerce(&json!("x"), FieldDefault::Integer(0)), None);
        assert_eq!(coerce(&json!("TRUE"), FieldDefault::Flag(false)), Some(json!(true)));
        assert_eq!(coerce(&json!(0), FieldDefault::Flag(true)), Some(json!(false)));
    }
}
