//! Integration tests for configuration loading and validation
//!
//! Tests that modify environment variables hold ENV_MUTEX.

use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tablesync::config::{load_config, Environment};
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn cleanup_env_vars() {
    std::env::remove_var("TABLESYNC_APPLICATION_LOG_LEVEL");
    std::env::remove_var("TABLESYNC_STORE_ENDPOINT");
    std::env::remove_var("TABLESYNC_SCAN_MAX_PAGES");
    std::env::remove_var("TABLESYNC_BULK_CONCURRENCY");
    std::env::remove_var("TABLESYNC_CREDENTIAL_PRESCRIPTIONS");
    std::env::remove_var("TEST_PATIENTS_SAS");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

const COMPLETE: &str = r#"
environment = "staging"

[application]
log_level = "debug"

[store]
endpoint = "https://clinic.table.core.windows.net"
api_version = "2019-02-02"
timeout_seconds = 45

[store.tables]
patients = "ClinicPatients"
prescriptions = "ClinicPrescriptions"
users = "ClinicUsers"

[store.credentials]
ClinicPatients = "?sv=2019-02-02&sp=raud&sig=patients"
ClinicUsers = "sv=2019-02-02&sp=r&sig=users"

[scan]
page_size = 500
max_pages = 20
page_delay_ms = 50

[bulk]
concurrency = 4
batch_delay_ms = 100
skip_existing = false

[backup]
directory = "/tmp/tablesync-backups"
tables = ["ClinicPatients"]

[logging]
local_enabled = false
local_path = "/tmp/tablesync"
local_rotation = "hourly"
"#;

#[test]
fn test_load_complete_config() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(COMPLETE);
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.store.timeout_seconds, 45);
    assert_eq!(config.store.tables.patients, "ClinicPatients");
    assert_eq!(config.scan.page_size, 500);
    assert_eq!(config.scan.max_pages, 20);
    assert_eq!(config.bulk.concurrency, 4);
    assert!(!config.bulk.skip_existing);
    assert_eq!(
        config.backup.effective_tables(&config.store.tables),
        vec!["ClinicPatients".to_string()]
    );
    assert!(!config.logging.local_enabled);

    let users = config.store.credential("ClinicUsers").unwrap();
    assert_eq!(users.expose_secret().query(), "sv=2019-02-02&sp=r&sig=users");
    assert!(config.store.credential("ClinicPrescriptions").is_none());
}

#[test]
fn test_minimal_config_uses_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("[store]\naccount_name = \"clinicstore\"\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(
        config.store.endpoint_url().unwrap().as_str(),
        "https://clinicstore.table.core.windows.net/"
    );
    assert_eq!(config.store.tables.all(), vec!["Patients", "Prescriptions", "Users"]);
    assert_eq!(config.scan.page_size, 1000);
    assert_eq!(config.scan.max_pages, 50);
    assert_eq!(config.bulk.concurrency, 10);
    assert!(config.bulk.skip_existing);
    assert_eq!(config.backup.directory, "./backups");
}

#[test]
fn test_credentials_from_environment() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_PATIENTS_SAS", "?sig=substituted");
    std::env::set_var("TABLESYNC_CREDENTIAL_PRESCRIPTIONS", "?sig=override");

    let file = write_config(
        r#"
[store]
endpoint = "https://clinic.table.core.windows.net"

[store.credentials]
Patients = "${TEST_PATIENTS_SAS}"
"#,
    );
    let result = load_config(file.path());
    cleanup_env_vars();

    let config = result.unwrap();
    assert_eq!(
        config.store.credential("Patients").unwrap().expose_secret(),
        "?sig=substituted"
    );
    assert_eq!(
        config.store.credential("Prescriptions").unwrap().expose_secret(),
        "?sig=override"
    );
}

#[test]
fn test_credentials_are_redacted_in_debug_output() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(COMPLETE);
    let config = load_config(file.path()).unwrap();

    let debug = format!("{:?}", config.store);
    assert!(!debug.contains("sig=patients"));
    assert!(!debug.contains("sig=users"));
}

#[test]
fn test_env_overrides() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TABLESYNC_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("TABLESYNC_STORE_ENDPOINT", "https://other.table.core.windows.net");
    std::env::set_var("TABLESYNC_SCAN_MAX_PAGES", "7");
    std::env::set_var("TABLESYNC_BULK_CONCURRENCY", "3");

    let file = write_config(COMPLETE);
    let result = load_config(file.path());
    cleanup_env_vars();

    let config = result.unwrap();
    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.store.endpoint, "https://other.table.core.windows.net");
    assert_eq!(config.scan.max_pages, 7);
    assert_eq!(config.bulk.concurrency, 3);
}

#[test]
fn test_missing_env_var_is_reported() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
[store]
endpoint = "https://clinic.table.core.windows.net"

[store.credentials]
Patients = "${TEST_PATIENTS_SAS}"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("TEST_PATIENTS_SAS"));
}

#[test]
fn test_production_requires_https() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
environment = "production"

[store]
endpoint = "http://127.0.0.1:10002/devstoreaccount1"
"#,
    );
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("https"));
}

#[test]
fn test_invalid_values_are_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let cases = [
        "[store]\nendpoint = \"https://a.table.core.windows.net\"\n[scan]\npage_size = 1001\n",
        "[store]\nendpoint = \"https://a.table.core.windows.net\"\n[scan]\nmax_pages = 0\n",
        "[store]\nendpoint = \"https://a.table.core.windows.net\"\n[bulk]\nconcurrency = 0\n",
        "[store]\nendpoint = \"https://a.table.core.windows.net\"\n[store.tables]\npatients = \"x\"\n",
        "[store]\nendpoint = \"https://a.table.core.windows.net\"\n[backup]\ntables = [\"Appointments\"]\n",
        "[application]\nlog_level = \"verbose\"\n[store]\nendpoint = \"https://a.table.core.windows.net\"\n",
    ];

    for contents in cases {
        let file = write_config(contents);
        assert!(load_config(file.path()).is_err(), "accepted: {contents}");
    }
}
