//! Configuration schema types
//!
//! This module defines the configuration structure for tablesync.

use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

/// Hard per-request page cap of the table store
pub const MAX_PAGE_SIZE: usize = 1000;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development environment
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main tablesync configuration
///
/// This is the root configuration structure that maps to the TOML file. It is
/// built once at startup and handed to every component that needs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSyncConfig {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Remote table store connection
    pub store: StoreConfig,

    /// Paginated scan settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Bulk mutation settings
    #[serde(default)]
    pub bulk: BulkConfig,

    /// Backup and restore settings
    #[serde(default)]
    pub backup: BackupConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TableSyncConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.store.validate(&self.environment)?;
        self.scan.validate()?;
        self.bulk.validate()?;
        self.backup.validate(&self.store.tables)?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }
        Ok(())
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Remote table store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Table service endpoint, e.g. `https://account.table.core.windows.net`
    #[serde(default)]
    pub endpoint: String,

    /// Storage account name, used when `endpoint` is empty
    #[serde(default)]
    pub account_name: Option<String>,

    /// Value of the `x-ms-version` header
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Table names per entity
    #[serde(default)]
    pub tables: TableNames,

    /// Pre-issued signed query strings, keyed by table name
    ///
    /// Stored securely in memory and automatically zeroized on drop.
    #[serde(default)]
    pub credentials: BTreeMap<String, SecretString>,
}

impl StoreConfig {
    /// Resolves the table service endpoint
    ///
    /// # Errors
    ///
    /// Returns an error if neither an endpoint nor an account name is
    /// configured, or if the endpoint is not a valid URL.
    pub fn endpoint_url(&self) -> Result<Url, String> {
        let raw = if !self.endpoint.is_empty() {
            self.endpoint.clone()
        } else if let Some(account) = self.account_name.as_deref().filter(|a| !a.is_empty()) {
            format!("https://{account}.table.core.windows.net")
        } else {
            return Err("store.endpoint or store.account_name must be set".to_string());
        };

        Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| format!("store.endpoint is not a valid URL ({raw}): {e}"))
    }

    /// Signed credential for a table, if one is configured
    pub fn credential(&self, table: &str) -> Option<&SecretString> {
        self.credentials.get(table)
    }

    fn validate(&self, environment: &Environment) -> Result<(), String> {
        let url = self.endpoint_url()?;
        match url.scheme() {
            "https" => {}
            "http" if *environment != Environment::Production => {}
            "http" => {
                return Err(
                    "store.endpoint must use https:// in production environments".to_string(),
                )
            }
            other => {
                return Err(format!(
                    "store.endpoint must start with http:// or https://, got {other}://"
                ))
            }
        }

        if self.api_version.is_empty() {
            return Err("store.api_version cannot be empty".to_string());
        }

        if self.timeout_seconds == 0 || self.timeout_seconds > 600 {
            return Err(format!(
                "store.timeout_seconds must be between 1 and 600, got {}",
                self.timeout_seconds
            ));
        }

        self.tables.validate()?;
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://127.0.0.1:10002/devstoreaccount1".to_string(),
            account_name: None,
            api_version: default_api_version(),
            timeout_seconds: default_timeout_seconds(),
            tables: TableNames::default(),
            credentials: BTreeMap::new(),
        }
    }
}

/// Table name per entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableNames {
    #[serde(default = "default_patients_table")]
    pub patients: String,

    #[serde(default = "default_prescriptions_table")]
    pub prescriptions: String,

    #[serde(default = "default_users_table")]
    pub users: String,
}

impl TableNames {
    /// All configured table names
    pub fn all(&self) -> Vec<String> {
        vec![
            self.patients.clone(),
            self.prescriptions.clone(),
            self.users.clone(),
        ]
    }

    /// Whether `table` is one of the configured tables
    pub fn contains(&self, table: &str) -> bool {
        self.patients == table || self.prescriptions == table || self.users == table
    }

    fn validate(&self) -> Result<(), String> {
        for name in [&self.patients, &self.prescriptions, &self.users] {
            validate_table_name(name)?;
        }
        Ok(())
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            patients: default_patients_table(),
            prescriptions: default_prescriptions_table(),
            users: default_users_table(),
        }
    }
}

/// Checks the store's table naming rule: 3-63 alphanumerics, leading letter
fn validate_table_name(name: &str) -> Result<(), String> {
    let valid = (3..=63).contains(&name.len())
        && name.chars().all(|c| c.is_ascii_alphanumeric())
        && name.starts_with(|c: char| c.is_ascii_alphabetic());
    if !valid {
        return Err(format!(
            "Invalid table name '{name}'. Must be 3-63 alphanumeric characters starting with a letter"
        ));
    }
    Ok(())
}

/// Paginated scan configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Page-size hint sent as `$top`
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Hard ceiling on pages fetched by one scan
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Delay between page requests in milliseconds
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
}

impl ScanConfig {
    fn validate(&self) -> Result<(), String> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(format!(
                "scan.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if self.max_pages == 0 {
            return Err("scan.max_pages must be > 0".to_string());
        }
        Ok(())
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_pages: default_max_pages(),
            page_delay_ms: default_page_delay_ms(),
        }
    }
}

/// Bulk mutation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkConfig {
    /// Maximum number of concurrent point operations
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Cooldown per worker slot between operations, in milliseconds
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// Skip records that already exist when restoring
    #[serde(default = "default_true")]
    pub skip_existing: bool,
}

impl BulkConfig {
    fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 || self.concurrency > 100 {
            return Err(format!(
                "bulk.concurrency must be between 1 and 100, got {}",
                self.concurrency
            ));
        }
        Ok(())
    }
}

impl Default for BulkConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            batch_delay_ms: default_batch_delay_ms(),
            skip_existing: true,
        }
    }
}

/// Backup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Directory backup snapshots are written to
    #[serde(default = "default_backup_directory")]
    pub directory: String,

    /// Tables to back up (empty = every configured table)
    #[serde(default)]
    pub tables: Vec<String>,
}

impl BackupConfig {
    /// Tables a backup covers
    pub fn effective_tables(&self, names: &TableNames) -> Vec<String> {
        if self.tables.is_empty() {
            names.all()
        } else {
            self.tables.clone()
        }
    }

    fn validate(&self, names: &TableNames) -> Result<(), String> {
        if self.directory.is_empty() {
            return Err("backup.directory cannot be empty".to_string());
        }
        for table in &self.tables {
            if !names.contains(table) {
                return Err(format!(
                    "backup.tables contains '{table}', which is not a configured table"
                ));
            }
        }
        Ok(())
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            directory: default_backup_directory(),
            tables: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log directory
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        if self.local_enabled && self.local_path.is_empty() {
            return Err("logging.local_path cannot be empty when local logging is enabled".to_string());
        }
        Ok(())
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_api_version() -> String {
    "2019-02-02".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_patients_table() -> String {
    "Patients".to_string()
}

fn default_prescriptions_table() -> String {
    "Prescriptions".to_string()
}

fn default_users_table() -> String {
    "Users".to_string()
}

fn default_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_max_pages() -> usize {
    50
}

fn default_page_delay_ms() -> u64 {
    200
}

fn default_concurrency() -> usize {
    10
}

fn default_batch_delay_ms() -> u64 {
    200
}

fn default_true() -> bool {
    true
}

fn default_backup_directory() -> String {
    "./backups".to_string()
}

fn default_local_path() -> String {
    "./logs".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}
