//! Backup command implementations
//!
//! `backup` snapshots the configured tables; `list-backups` and
//! `delete-backup` manage the snapshot directory and never touch the store.

use super::{connect_or_report, load_or_report, EXIT_FATAL, EXIT_PARTIAL};
use crate::core::backup::{BackupManager, BackupStore};
use clap::Args;

/// Arguments for the backup command
#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Recorded as the snapshot's creator
    #[arg(long, default_value = "system")]
    pub created_by: String,
}

impl BackupArgs {
    /// Execute the backup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(created_by = %self.created_by, "Starting backup");

        println!("💾 Backing up tables");
        println!();

        let (config, client) = match connect_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let manager = BackupManager::from_config(client, &config);
        let outcome = match manager.create(&self.created_by).await {
            Ok(o) => o,
            Err(e) => {
                println!("❌ Backup failed");
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        let metadata = &outcome.snapshot.metadata;
        for (table, count) in &metadata.record_counts {
            let marker = if metadata.incomplete_tables.contains(table) {
                "⚠️ "
            } else {
                "✅"
            };
            println!("{marker} {table}: {count} record(s)");
        }
        println!();
        println!("Backup ID: {}", metadata.backup_id);
        println!("File: {}", outcome.path.display());
        println!("Checksum: {}", metadata.checksum);
        println!();

        if !outcome.is_complete() {
            println!(
                "⚠️  Backup may be incomplete for: {}",
                metadata.incomplete_tables.join(", ")
            );
            return Ok(EXIT_PARTIAL);
        }

        println!("✅ Backup completed");
        Ok(0)
    }
}

/// Arguments for the list-backups command
#[derive(Args, Debug)]
pub struct ListBackupsArgs {}

impl ListBackupsArgs {
    /// Execute the list-backups command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let store = BackupStore::new(&config.backup.directory);
        let backups = match store.list().await {
            Ok(b) => b,
            Err(e) => {
                println!("❌ Failed to read backup directory {}", store.directory().display());
                println!("   Error: {e}");
                return Ok(EXIT_FATAL);
            }
        };

        if backups.is_empty() {
            println!("No backups found in {}", store.directory().display());
            return Ok(0);
        }

        println!("Found {} backup(s):", backups.len());
        println!();
        println!("{:<60} {:<20} {:<10} {:<10}", "Backup ID", "Created", "Records", "Complete");
        println!("{}", "-".repeat(104));
        for metadata in backups {
            let records: usize = metadata.record_counts.values().sum();
            let complete = if metadata.incomplete_tables.is_empty() {
                "yes"
            } else {
                "no"
            };
            println!(
                "{:<60} {:<20} {:<10} {:<10}",
                metadata.backup_id,
                metadata.timestamp.format("%Y-%m-%d %H:%M:%S"),
                records,
                complete
            );
        }
        println!();
        Ok(0)
    }
}

/// Arguments for the delete-backup command
#[derive(Args, Debug)]
pub struct DeleteBackupArgs {
    /// Full id of the snapshot to remove
    pub backup_id: String,
}

impl DeleteBackupArgs {
    /// Execute the delete-backup command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_or_report(config_path) {
            Ok(c) => c,
            Err(code) => return Ok(code),
        };

        let store = BackupStore::new(&config.backup.directory);
        match store.delete(&self.backup_id).await {
            Ok(true) => {
                tracing::info!(backup_id = %self.backup_id, "Backup deleted");
                println!("✅ Deleted backup {}", self.backup_id);
                Ok(0)
            }
            Ok(false) => {
                println!("⚠️  No backup with id {}", self.backup_id);
                Ok(EXIT_PARTIAL)
            }
            Err(e) => {
                println!("❌ Failed to delete backup {}", self.backup_id);
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }
}
