//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "tablesync.toml")]
    pub output: String,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing tablesync configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        match fs::write(&self.output, Self::generate_config()) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Set store.account_name or store.endpoint in {}", self.output);
                println!("  2. Create a .env file with one signed query string per table:");
                println!("     - TABLESYNC_PATIENTS_SAS");
                println!("     - TABLESYNC_PRESCRIPTIONS_SAS");
                println!("     - TABLESYNC_USERS_SAS");
                println!("  3. Validate configuration: tablesync validate-config");
                println!("  4. Check the tables: tablesync status");
                println!();
                Ok(0)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Sample configuration with every section and its defaults
    fn generate_config() -> String {
        r#"# Tablesync Configuration File

# Runtime environment (development, staging, production)
# Production requires an https:// endpoint
environment = "development"

[application]
# Log level (trace, debug, info, warn, error)
log_level = "info"

# ============================================================================
# Table Store
# ============================================================================
[store]
# Either the full table service endpoint...
# endpoint = "https://clinicstore.table.core.windows.net"
# ...or just the storage account name
account_name = "clinicstore"

# Value of the x-ms-version header
api_version = "2019-02-02"

# Per-request timeout in seconds
timeout_seconds = 30

[store.tables]
patients = "Patients"
prescriptions = "Prescriptions"
users = "Users"

# Signed query strings, one per table (use environment variables)
# Overridable with TABLESYNC_CREDENTIAL_<TABLE>
[store.credentials]
Patients = "${TABLESYNC_PATIENTS_SAS}"
Prescriptions = "${TABLESYNC_PRESCRIPTIONS_SAS}"
Users = "${TABLESYNC_USERS_SAS}"

# ============================================================================
# Paginated Scans
# ============================================================================
[scan]
# Page-size hint per request (1-1000)
page_size = 1000

# Pages fetched before a scan stops as possibly incomplete
max_pages = 50

# Delay between page requests
page_delay_ms = 200

# ============================================================================
# Bulk Operations
# ============================================================================
[bulk]
# Point operations in flight (1-100)
concurrency = 10

# Pause per worker slot between operations
batch_delay_ms = 200

# Restore leaves existing records untouched
skip_existing = true

# ============================================================================
# Backups
# ============================================================================
[backup]
directory = "./backups"

# Tables to back up (empty = every configured table)
tables = []

# ============================================================================
# Logging
# ============================================================================
[logging]
# JSON log files next to console output
local_enabled = true
local_path = "./logs"

# Log rotation (daily, hourly, never)
local_rotation = "daily"
"#
        .to_string()
    }
}
