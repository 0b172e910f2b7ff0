//! CLI command implementations
//!
//! Every command returns its process exit code:
//!
//! - `0` success
//! - `1` partial failure (some records failed or a scan may be incomplete)
//! - `2` configuration error
//! - `4` connection or table store error
//! - `5` fatal error

pub mod backup;
pub mod init;
pub mod purge;
pub mod restore;
pub mod status;
pub mod validate;

use crate::adapters::tablestore::{connect, TableClient};
use crate::config::{load_config, TableSyncConfig};

/// Exit code for partial failures
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code for configuration errors
pub const EXIT_CONFIG: i32 = 2;
/// Exit code for connection and store errors
pub const EXIT_STORE: i32 = 4;
/// Exit code for fatal errors
pub const EXIT_FATAL: i32 = 5;

/// Loads the configuration, printing the failure and its exit code on error
pub(crate) fn load_or_report(config_path: &str) -> Result<TableSyncConfig, i32> {
    load_config(config_path).map_err(|e| {
        println!("❌ Failed to load configuration file");
        println!("   Error: {e}");
        EXIT_CONFIG
    })
}

/// Loads the configuration and builds a store client
pub(crate) fn connect_or_report(config_path: &str) -> Result<(TableSyncConfig, TableClient), i32> {
    let config = load_or_report(config_path)?;
    match connect(&config.store) {
        Ok(client) => Ok((config, client)),
        Err(e) => {
            println!("❌ Failed to create table store client");
            println!("   Error: {e}");
            Err(EXIT_STORE)
        }
    }
}
