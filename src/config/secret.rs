//! Signed credentials held with the secrecy crate
//!
//! Per-table signed query strings grant read/write access to a table until
//! they expire, so they are kept in [`SecretString`]: zeroed on drop, redacted
//! in `Debug` output, and only readable through `expose_secret()`.
//!
//! # Example
//!
//! ```rust
//! use tablesync::config::secret_string;
//! use secrecy::ExposeSecret;
//!
//! let sas = secret_string("?sv=2019-02-02&sig=abc".to_string());
//! assert!(sas.expose_secret().as_ref().starts_with('?'));
//! assert_eq!(sas.expose_secret().query(), "sv=2019-02-02&sig=abc");
//! assert!(!format!("{sas:?}").contains("sig=abc"));
//! ```

use secrecy::{CloneableSecret, DebugSecret, Secret, SerializableSecret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

/// String payload of a [`SecretString`]
#[derive(Clone, Debug, Zeroize)]
#[zeroize(drop)]
pub struct SecretValue(String);

impl CloneableSecret for SecretValue {}
impl DebugSecret for SecretValue {}
impl SerializableSecret for SecretValue {}

impl From<String> for SecretValue {
    fn from(s: String) -> Self {
        SecretValue(s)
    }
}

impl PartialEq<str> for SecretValue {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl AsRef<str> for SecretValue {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl SecretValue {
    /// Whether the secret is empty
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// The signed query string without its leading `?`
    pub fn query(&self) -> &str {
        self.0.trim().trim_start_matches('?')
    }
}

impl Serialize for SecretValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SecretValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretValue)
    }
}

/// A zeroize-on-drop, debug-redacted string
pub type SecretString = Secret<SecretValue>;

/// Wraps a string as a [`SecretString`]
#[inline]
pub fn secret_string(value: String) -> SecretString {
    Secret::new(SecretValue::from(value))
}
