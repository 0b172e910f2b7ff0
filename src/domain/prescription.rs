//! Prescription entity
//!
//! The stored row keeps the medication list as a single JSON text attribute.
//! [`PrescriptionRow`] is that stored shape; [`Prescription`] is the domain
//! view with the list decoded.

use super::record::RecordKey;
use super::schema::{EntitySchema, FieldDefault, FieldSpec, TableEntity};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Partition holding every prescription record
pub const PRESCRIPTION_PARTITION: &str = "prescription";

/// Status given to prescriptions that do not carry one
pub const DEFAULT_PRESCRIPTION_STATUS: &str = "active";

const TEXT: FieldDefault = FieldDefault::Text("");

const PRESCRIPTION_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("prescriptionNumber", &["prescriptionNumber"], TEXT),
    FieldSpec::new("patientId", &["patientId"], TEXT),
    FieldSpec::new("patientName", &["patientName"], TEXT),
    FieldSpec::new("patientEmail", &["patientEmail"], TEXT),
    FieldSpec::new("doctorId", &["doctorId"], TEXT),
    FieldSpec::new("doctorName", &["doctorName"], TEXT),
    FieldSpec::new("doctorLicense", &["doctorLicense"], TEXT),
    FieldSpec::new("clinicName", &["clinicName"], TEXT),
    FieldSpec::new("clinicAddress", &["clinicAddress"], TEXT),
    FieldSpec::new("clinicPhone", &["clinicPhone"], TEXT),
    FieldSpec::new("date", &["date"], TEXT),
    FieldSpec::new("diagnosis", &["diagnosis"], TEXT),
    FieldSpec::new("medications", &["medications"], FieldDefault::Text("[]")),
    FieldSpec::new("notes", &["notes"], TEXT),
    FieldSpec::new(
        "status",
        &["status"],
        FieldDefault::Text(DEFAULT_PRESCRIPTION_STATUS),
    ),
    FieldSpec::new("createdAt", &["createdAt"], TEXT),
    FieldSpec::new("updatedAt", &["updatedAt"], TEXT),
    FieldSpec::new("validUntil", &["validUntil"], TEXT),
];

/// One prescribed medication
///
/// Counts written as strings or integral floats are accepted. Keys that are
/// not modelled here are kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrescriptionMedication {
    pub medication_id: String,
    pub medication_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generic_name: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(deserialize_with = "lenient_count")]
    pub quantity: u32,
    #[serde(deserialize_with = "lenient_count")]
    pub refills: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accepts `21`, `21.0`, `"21"`, `""` and `null`
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Null => Some(0),
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) if s.trim().is_empty() => Some(0),
        Value::String(s) => s
            .trim()
            .parse::<u64>()
            .ok()
            .or_else(|| s.trim().parse::<f64>().ok().and_then(integral)),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| D::Error::custom(format!("invalid count: {value}")))
}

fn integral(f: f64) -> Option<u64> {
    (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64).then_some(f as u64)
}

/// Prescription as stored: `medications` holds JSON text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrescriptionRow {
    #[serde(skip)]
    pub key: RecordKey,

    pub prescription_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub doctor_license: String,
    pub clinic_name: String,
    pub clinic_address: String,
    pub clinic_phone: String,
    pub date: String,
    pub diagnosis: String,
    pub medications: String,
    pub notes: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub valid_until: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableEntity for PrescriptionRow {
    const SCHEMA: EntitySchema = EntitySchema {
        entity: "prescription",
        partition_key: PRESCRIPTION_PARTITION,
        fields: PRESCRIPTION_FIELDS,
    };

    fn key(&self) -> &RecordKey {
        &self.key
    }

    fn set_key(&mut self, key: RecordKey) {
        self.key = key;
    }
}

/// A prescription with its medication list decoded
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    #[serde(skip)]
    pub key: RecordKey,

    pub prescription_number: String,
    pub patient_id: String,
    pub patient_name: String,
    pub patient_email: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub doctor_license: String,
    pub clinic_name: String,
    pub clinic_address: String,
    pub clinic_phone: String,
    pub date: String,
    pub diagnosis: String,
    pub medications: Vec<PrescriptionMedication>,
    /// Stored medication text that could not be read as a list
    ///
    /// Written back as-is while `medications` is left empty.
    #[serde(skip)]
    pub unreadable_medications: Option<String>,
    pub notes: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub valid_until: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Fields changed by a prescription update
///
/// `updatedAt` is always stamped by the repository.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrescriptionUpdate {
    pub status: Option<String>,
    pub diagnosis: Option<String>,
    pub notes: Option<String>,
    pub medications: Option<Vec<PrescriptionMedication>>,
    pub valid_until: Option<String>,
}
