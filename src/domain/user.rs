//! User profile entity

use super::record::RecordKey;
use super::schema::{EntitySchema, FieldDefault, FieldSpec, TableEntity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Partition holding every user profile
pub const USER_PARTITION: &str = "user";

const TEXT: FieldDefault = FieldDefault::Text("");

const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::new("id", &["id", "Id"], TEXT),
    FieldSpec::new("name", &["name", "Name"], TEXT),
    FieldSpec::new("email", &["email", "Email"], TEXT),
    FieldSpec::new("role", &["role", "Role"], TEXT),
    FieldSpec::new("practiceName", &["practiceName", "PracticeName"], TEXT),
    FieldSpec::new("licenseNumber", &["licenseNumber", "LicenseNumber"], TEXT),
    FieldSpec::new("createdAt", &["createdAt", "CreatedAt"], TEXT),
    FieldSpec::new("lastLogin", &["lastLogin", "LastLogin"], TEXT),
];

/// A practitioner profile, keyed by email
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(skip)]
    pub key: RecordKey,

    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub practice_name: String,
    pub license_number: String,
    pub created_at: String,
    pub last_login: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TableEntity for User {
    const SCHEMA: EntitySchema = EntitySchema {
        entity: "user",
        partition_key: USER_PARTITION,
        fields: USER_FIELDS,
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
        if self.email.is_empty() {
            self.email = self.key.row_key().to_string();
        }
    }
}

/// Profile fields a user may change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}
