//! Configuration management for tablesync.
//!
//! TOML configuration with `${VAR_NAME}` substitution, `TABLESYNC_*`
//! environment overrides and validation on load. The loaded
//! [`TableSyncConfig`] is passed explicitly to the components that need it;
//! nothing reads the environment after startup.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tablesync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("tablesync.toml")?;
//! println!("Store: {}", config.store.endpoint);
//! println!("Page size: {}", config.scan.page_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! log_level = "info"
//!
//! [store]
//! account_name = "clinicstore"
//! api_version = "2019-02-02"
//!
//! [store.tables]
//! patients = "Patients"
//! prescriptions = "Prescriptions"
//! users = "Users"
//!
//! [store.credentials]
//! Patients = "${TABLESYNC_PATIENTS_SAS}"
//! Prescriptions = "${TABLESYNC_PRESCRIPTIONS_SAS}"
//! Users = "${TABLESYNC_USERS_SAS}"
//!
//! [scan]
//! page_size = 1000
//! max_pages = 50
//! page_delay_ms = 200
//!
//! [bulk]
//! concurrency = 10
//! batch_delay_ms = 200
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, load_config_from_str};
pub use schema::{
    ApplicationConfig, BackupConfig, BulkConfig, Environment, LoggingConfig, ScanConfig,
    StoreConfig, TableNames, TableSyncConfig, MAX_PAGE_SIZE,
};
pub use secret::{secret_string, SecretString, SecretValue};
