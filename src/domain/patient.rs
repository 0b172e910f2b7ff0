//! Patient entity

use super::record::RecordKey;
use super::schema::{EntitySchema, FieldDefault, FieldSpec, TableEntity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Partition holding every patient record
pub const PATIENT_PARTITION: &str = "patient";

/// Default vital status for records that never had one
pub const DEFAULT_PATIENT_STATUS: &str = "Unknown";

const TEXT: FieldDefault = FieldDefault::Text("");

// Most demographics were first written PascalCase and are still read that way
// first; clinical fields were migrated to camelCase and prefer it.
const PATIENT_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", &["id", "Id"], TEXT),
    FieldSpec::new("name", &["Name", "name"], TEXT),
    FieldSpec::new("email", &["Email", "email"], TEXT),
    FieldSpec::new("phone", &["Phone", "phone"], TEXT),
    FieldSpec::new("mobilePhone", &["MobilePhone", "mobilePhone"], TEXT),
    FieldSpec::new("whatsappPhone", &["WhatsappPhone", "whatsappPhone"], TEXT),
    FieldSpec::new("passportId", &["PassportId", "passportId"], TEXT),
    FieldSpec::new("gender", &["Gender", "gender"], TEXT),
    FieldSpec::new("race", &["Race", "race"], TEXT),
    FieldSpec::new("dateOfBirth", &["DateOfBirth", "dateOfBirth"], TEXT),
    FieldSpec::new(
        "medicalRecordNumber",
        &["MedicalRecordNumber", "medicalRecordNumber"],
        TEXT,
    ),
    FieldSpec::new(
        "emergencyContact",
        &["EmergencyContact", "emergencyContact"],
        TEXT,
    ),
    FieldSpec::new(
        "insuranceProvider",
        &["InsuranceProvider", "insuranceProvider"],
        TEXT,
    ),
    FieldSpec::new(
        "medicalAidNumber",
        &["medicalAidNumber", "MedicalAidNumber"],
        TEXT,
    ),
    FieldSpec::new("dependentCode", &["dependentCode", "DependentCode"], TEXT),
    FieldSpec::new("allergies", &["allergies", "Allergies"], TEXT),
    FieldSpec::new(
        "currentMedications",
        &["currentMedications", "CurrentMedications"],
        TEXT,
    ),
    FieldSpec::new(
        "chronicConditions",
        &["chronicConditions", "ChronicConditions"],
        TEXT,
    ),
    FieldSpec::new(
        "status",
        &["status", "Status"],
        FieldDefault::Text(DEFAULT_PATIENT_STATUS),
    ),
    FieldSpec::new(
        "deceasedDate",
        &["deceasedDate", "DeceasedDate"],
        FieldDefault::Absent,
    ),
    FieldSpec::new("homeNumber", &["HomeNumber", "homeNumber"], TEXT),
    FieldSpec::new("streetAddress", &["StreetAddress", "streetAddress"], TEXT),
    FieldSpec::new("suburb", &["Suburb", "suburb"], TEXT),
    FieldSpec::new("city", &["City", "city"], TEXT),
    FieldSpec::new("province", &["Province", "province"], TEXT),
    FieldSpec::new("postalCode", &["PostalCode", "postalCode"], TEXT),
    FieldSpec::new("country", &["Country", "country"], TEXT),
    FieldSpec::new("createdAt", &["CreatedAt", "createdAt"], TEXT),
];

/// A patient record
///
/// Row key is the medical record number (`File N`), which is also the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Patient {
    #[serde(skip)]
    pub key: RecordKey,

    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub mobile_phone: String,
    pub whatsapp_phone: String,
    pub passport_id: String,
    pub gender: String,
    pub race: String,
    pub date_of_birth: String,
    pub medical_record_number: String,
    pub emergency_contact: String,
    pub insurance_provider: String,
    pub medical_aid_number: String,
    pub dependent_code: String,
    pub allergies: String,
    pub current_medications: String,
    pub chronic_conditions: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_date: Option<String>,
    pub home_number: String,
    pub street_address: String,
    pub suburb: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub created_at: String,

    /// Attributes without a modelled field
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patient {
    /// Whether the patient is recorded as deceased
    pub fn is_deceased(&self) -> bool {
        self.status.eq_ignore_ascii_case("deceased")
    }
}

impl TableEntity for Patient {
    const SCHEMA: EntitySchema = EntitySchema {
        entity: "patient",
        partition_key: PATIENT_PARTITION,
        fields: PATIENT_FIELDS,
    };

    fn key(&self) -> &RecordKey {
        &self.key
    }

    fn set_key(&mut self, key: RecordKey) {
        self.key = key;
    }

    fn after_decode(&mut self) {
        if self.id.is_empty() {
            self.id = self.key.row_key().to_string();
        }
    }
}

/// Fields changed by a patient update
///
/// Only `Some` fields are sent; everything else is left untouched on the
/// stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mobile_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passport_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emergency_contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_aid_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependent_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chronic_conditions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suburb: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl PatientUpdate {
    /// Update that only changes the vital status
    pub fn status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Default::default()
        }
    }
}
