//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::TableSyncConfig;
use super::secret::secret_string;
use crate::domain::errors::TableSyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Prefix of per-table credential overrides, e.g. `TABLESYNC_CREDENTIAL_PATIENTS`
const CREDENTIAL_ENV_PREFIX: &str = "TABLESYNC_CREDENTIAL_";

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into TableSyncConfig
/// 4. Applies environment variable overrides (TABLESYNC_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns an error if:
/// - File cannot be read
/// - TOML parsing fails
/// - A referenced environment variable is not set
/// - Configuration validation fails
///
/// # Examples
///
/// ```no_run
/// use tablesync::config::loader::load_config;
///
/// let config = load_config("tablesync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<TableSyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(TableSyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        TableSyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    load_config_from_str(&contents)
}

/// Loads configuration from TOML text
///
/// Same pipeline as [`load_config`] minus the file read.
pub fn load_config_from_str(contents: &str) -> Result<TableSyncConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: TableSyncConfig = toml::from_str(&contents)
        .map_err(|e| TableSyncError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        TableSyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left alone.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| TableSyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut missing_vars: Vec<String> = Vec::new();

    let lines: Vec<String> = input
        .lines()
        .map(|line| {
            if line.trim_start().starts_with('#') {
                return line.to_string();
            }

            re.replace_all(line, |caps: &regex::Captures<'_>| {
                let var_name = &caps[1];
                match std::env::var(var_name) {
                    Ok(value) => value,
                    Err(_) => {
                        if !missing_vars.iter().any(|v| v == var_name) {
                            missing_vars.push(var_name.to_string());
                        }
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
        })
        .collect();

    if !missing_vars.is_empty() {
        return Err(TableSyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

/// Applies environment variable overrides using TABLESYNC_* prefix
///
/// Environment variables follow the pattern: TABLESYNC_<SECTION>_<KEY>,
/// for example TABLESYNC_STORE_ENDPOINT or TABLESYNC_SCAN_PAGE_SIZE.
/// Credentials use TABLESYNC_CREDENTIAL_<TABLE>, matched case-insensitively
/// against the configured table names.
fn apply_env_overrides(config: &mut TableSyncConfig) {
    // Application overrides
    if let Ok(val) = std::env::var("TABLESYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // Store overrides
    if let Ok(val) = std::env::var("TABLESYNC_STORE_ENDPOINT") {
        config.store.endpoint = val;
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_ACCOUNT_NAME") {
        config.store.account_name = Some(val);
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_API_VERSION") {
        config.store.api_version = val;
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_TIMEOUT_SECONDS") {
        if let Ok(timeout) = val.parse() {
            config.store.timeout_seconds = timeout;
        }
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_TABLES_PATIENTS") {
        config.store.tables.patients = val;
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_TABLES_PRESCRIPTIONS") {
        config.store.tables.prescriptions = val;
    }
    if let Ok(val) = std::env::var("TABLESYNC_STORE_TABLES_USERS") {
        config.store.tables.users = val;
    }

    // Credential overrides
    for table in config.store.tables.all() {
        let var = format!("{CREDENTIAL_ENV_PREFIX}{}", table.to_uppercase());
        if let Ok(val) = std::env::var(&var) {
            config.store.credentials.insert(table, secret_string(val));
        }
    }

    // Scan overrides
    if let Ok(val) = std::env::var("TABLESYNC_SCAN_PAGE_SIZE") {
        if let Ok(size) = val.parse() {
            config.scan.page_size = size;
        }
    }
    if let Ok(val) = std::env::var("TABLESYNC_SCAN_MAX_PAGES") {
        if let Ok(pages) = val.parse() {
            config.scan.max_pages = pages;
        }
    }
    if let Ok(val) = std::env::var("TABLESYNC_SCAN_PAGE_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.scan.page_delay_ms = delay;
        }
    }

    // Bulk overrides
    if let Ok(val) = std::env::var("TABLESYNC_BULK_CONCURRENCY") {
        if let Ok(concurrency) = val.parse() {
            config.bulk.concurrency = concurrency;
        }
    }
    if let Ok(val) = std::env::var("TABLESYNC_BULK_BATCH_DELAY_MS") {
        if let Ok(delay) = val.parse() {
            config.bulk.batch_delay_ms = delay;
        }
    }
    if let Ok(val) = std::env::var("TABLESYNC_BULK_SKIP_EXISTING") {
        config.bulk.skip_existing = val.parse().unwrap_or(true);
    }

    // Backup overrides
    if let Ok(val) = std::env::var("TABLESYNC_BACKUP_DIRECTORY") {
        config.backup.directory = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var("TABLESYNC_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("TABLESYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
    if let Ok(val) = std::env::var("TABLESYNC_LOGGING_LOCAL_ROTATION") {
        config.logging.local_rotation = val;
    }
}
