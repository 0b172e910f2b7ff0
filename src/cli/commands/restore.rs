//! Restore command implementation

use super::{connect_or_report, EXIT_CONFIG, EXIT_FATAL, EXIT_PARTIAL};
use crate::core::backup::{BackupManager, RestoreOptions};
use clap::Args;

/// Failures listed before the output is truncated
const MAX_LISTED_FAILURES: usize = 10;

/// Arguments for the restore command
#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Snapshot id, or a fragment matching exactly one snapshot
    pub backup_id: String,

    /// Only restore these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub tables: Vec<String>,

    /// Replace records that already exist instead of skipping them
    #[arg(long)]
    pub overwrite: bool,
}

impl RestoreArgs {
    fn options(&self, skip_existing_default: bool) -> RestoreOptions {
        RestoreOptions {
            tables: if self.tables.is_empty() {
                None
            } else {
                Some(self.tables.clone())
            },
            skip_existing: !self.overwrite && skip_existing_default,
        }
    }

    /// Execute the restore command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(backup_id = %self.backup_id, overwrite = self.overwrite, "Starting restore");

        println!("♻️  Restoring backup {}", self.backup_id);
        println!();

        let (config, client) = match connect_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        if let Some(table) = self.tables.iter().find(|t| !config.store.tables.contains(t)) {
            println!("❌ Table {table} is not configured");
            return Ok(EXIT_CONFIG);
        }

        let options = self.options(config.bulk.skip_existing);
        let manager = BackupManager::from_config(client, &config);
        let report = match manager.restore(&self.backup_id, &options).await {
            Ok(r) => r,
            Err(e) => {
                println!("❌ Restore failed before writing any record");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        println!("{:<20} {:<10} {:<10} {:<10}", "Table", "Restored", "Skipped", "Failed");
        println!("{}", "-".repeat(54));
        for (table, table_report) in &report.tables {
            println!(
                "{:<20} {:<10} {:<10} {:<10}",
                table,
                table_report.restored,
                table_report.skipped,
                table_report.failures.len()
            );
        }
        println!();

        let failures: Vec<String> = report
            .errors
            .iter()
            .cloned()
            .chain(report.tables.values().flat_map(|t| {
                t.failures
                    .iter()
                    .map(|f| format!("{}/{}: {}", f.partition_key, f.row_key, f.error))
            }))
            .collect();

        if failures.is_empty() {
            println!(
                "✅ Restore completed: {} restored, {} skipped",
                report.restored(),
                report.skipped()
            );
            return Ok(0);
        }

        println!("⚠️  Restore finished with {} error(s):", failures.len());
        for failure in failures.iter().take(MAX_LISTED_FAILURES) {
            println!("   - {failure}");
        }
        if failures.len() > MAX_LISTED_FAILURES {
            println!("   ... and {} more", failures.len() - MAX_LISTED_FAILURES);
        }
        Ok(EXIT_PARTIAL)
    }
}
