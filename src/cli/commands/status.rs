//! Status command implementation
//!
//! This module implements the `status` command: a full scan of every
//! configured table, printing record counts and whether each count is
//! complete.

use super::{connect_or_report, EXIT_CONFIG, EXIT_PARTIAL, EXIT_STORE};
use crate::core::repository::count_records;
use crate::core::scan::{ScanOptions, ScanStatus};
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only count this table
    #[arg(long)]
    pub table: Option<String>,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking table status");

        println!("📊 Table Status");
        println!();

        let (config, client) = match connect_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let tables: Vec<String> = match &self.table {
            Some(table) if config.store.tables.contains(table) => vec![table.clone()],
            Some(table) => {
                println!("❌ Table {table} is not configured");
                return Ok(EXIT_CONFIG);
            }
            None => config.store.tables.all(),
        };

        let options = ScanOptions::from(&config.scan);
        let mut aborted = 0;
        let mut incomplete = 0;

        println!("{:<20} {:<10} {:<8} {:<40}", "Table", "Records", "Pages", "Status");
        println!("{}", "-".repeat(80));

        for table in &tables {
            let count = count_records(&client, table, options).await;
            let status = match &count.status {
                ScanStatus::Complete => "✅ complete".to_string(),
                ScanStatus::PossiblyIncomplete(reason) => {
                    incomplete += 1;
                    format!("⚠️  at least ({reason})")
                }
                ScanStatus::Aborted(e) => {
                    aborted += 1;
                    format!("❌ {e}")
                }
            };
            println!("{:<20} {:<10} {:<8} {:<40}", table, count.records, count.pages, status);
        }

        println!();
        if aborted > 0 {
            println!("❌ {aborted} table(s) could not be scanned");
            return Ok(EXIT_STORE);
        }
        if incomplete > 0 {
            println!("⚠️  {incomplete} count(s) may be incomplete; raise scan.max_pages to read further");
            return Ok(EXIT_PARTIAL);
        }
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs { table: None };
        assert!(args.table.is_none());
    }

    #[tokio::test]
    async fn test_status_missing_config() {
        let args = StatusArgs { table: None };
        let code = args.execute("/nonexistent/tablesync.toml").await.unwrap();
        assert_eq!(code, EXIT_CONFIG);
    }
}
