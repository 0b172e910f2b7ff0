//! Validate config command implementation
//!
//! This module implements the `validate-config` command. Credentials are
//! reported as present or missing, never printed.

use super::EXIT_CONFIG;
use crate::config::load_config;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading runs validation as well
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration validation failed");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        match config.store.endpoint_url() {
            Ok(url) => println!("  Store Endpoint: {url}"),
            Err(e) => println!("  Store Endpoint: {e}"),
        }
        println!("  API Version: {}", config.store.api_version);
        println!("  Request Timeout: {}s", config.store.timeout_seconds);

        println!("  Tables:");
        let mut missing = 0;
        for table in config.store.tables.all() {
            let credential = if config.store.credential(&table).is_some() {
                "credential configured"
            } else {
                missing += 1;
                "⚠️  no credential"
            };
            println!("    - {table}: {credential}");
        }

        println!(
            "  Scan: page size {}, max {} pages, {}ms between pages",
            config.scan.page_size, config.scan.max_pages, config.scan.page_delay_ms
        );
        println!(
            "  Bulk: concurrency {}, {}ms cooldown, skip existing: {}",
            config.bulk.concurrency, config.bulk.batch_delay_ms, config.bulk.skip_existing
        );
        println!("  Backup Directory: {}", config.backup.directory);
        println!(
            "  Backup Tables: {:?}",
            config.backup.effective_tables(&config.store.tables)
        );
        println!();

        if missing > 0 {
            println!("⚠️  {missing} table(s) have no credential; operations on them will fail");
            println!();
        }

        Ok(0)
    }
}
