//! Purge command implementation
//!
//! Deletes every record of one table. Requires `--yes`.

use super::{connect_or_report, EXIT_CONFIG, EXIT_PARTIAL, EXIT_STORE};
use crate::core::bulk::{BulkMutator, BulkOptions};
use crate::core::scan::{ScanOptions, ScanStatus};
use clap::Args;

/// Failures listed before the output is truncated
const MAX_LISTED_FAILURES: usize = 10;

/// Arguments for the purge command
#[derive(Args, Debug)]
pub struct PurgeArgs {
    /// Table to empty
    pub table: String,

    /// Confirm the deletion
    #[arg(long)]
    pub yes: bool,
}

impl PurgeArgs {
    /// Execute the purge command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        if !self.yes {
            println!("❌ Purging deletes every record in {}", self.table);
            println!("   Re-run with --yes to confirm");
            return Ok(EXIT_CONFIG);
        }

        let (config, client) = match connect_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if !config.store.tables.contains(&self.table) {
            println!("❌ Table {} is not configured", self.table);
            return Ok(EXIT_CONFIG);
        }
        if !client.requests().has_credential(&self.table) {
            println!("❌ No credential configured for table {}", self.table);
            return Ok(EXIT_CONFIG);
        }

        tracing::warn!(table = %self.table, "Purging table");
        println!("🗑️  Purging {}", self.table);
        println!();

        let mutator = BulkMutator::new(client, BulkOptions::from(&config.bulk));
        let report = mutator
            .delete_all(&self.table, ScanOptions::from(&config.scan))
            .await;

        println!("Deleted: {}", report.deleted);
        println!("Already absent: {}", report.already_absent);
        println!("Pages: {}", report.pages);
        println!("Failed: {}", report.failures.len());
        println!();

        for failure in report.failures.iter().take(MAX_LISTED_FAILURES) {
            let throttled = if failure.is_throttled { " (throttled)" } else { "" };
            println!(
                "   - {}/{}: {}{}",
                failure.partition_key, failure.row_key, failure.error, throttled
            );
        }
        if report.failures.len() > MAX_LISTED_FAILURES {
            println!("   ... and {} more", report.failures.len() - MAX_LISTED_FAILURES);
        }

        match &report.scan_status {
            ScanStatus::Complete if report.failures.is_empty() => {
                println!("✅ {} is empty", self.table);
                Ok(0)
            }
            ScanStatus::Aborted(e) if report.deleted == 0 && report.already_absent == 0 => {
                println!("❌ Could not read {}: {e}", self.table);
                Ok(EXIT_STORE)
            }
            status => {
                println!("⚠️  Purge finished with problems; scan {status}");
                println!("   Run the purge again to remove the remaining records");
                Ok(EXIT_PARTIAL)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_purge_requires_confirmation() {
        let args = PurgeArgs {
            table: "Patients".to_string(),
            yes: false,
        };
        // Refuses before the configuration is even read
        let code = args.execute("/nonexistent/tablesync.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
