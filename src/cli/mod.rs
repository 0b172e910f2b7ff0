//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for tablesync using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Tablesync - remote table store maintenance
#[derive(Parser, Debug)]
#[command(name = "tablesync")]
#[command(version, about, long_about = None)]
#[command(author = "Tablesync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "tablesync.toml", env = "TABLESYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "TABLESYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new configuration file
    Init(commands::init::InitArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Count the records of every configured table
    Status(commands::status::StatusArgs),

    /// Snapshot the configured tables to the backup directory
    Backup(commands::backup::BackupArgs),

    /// List snapshots in the backup directory
    ListBackups(commands::backup::ListBackupsArgs),

    /// Remove a snapshot from the backup directory
    DeleteBackup(commands::backup::DeleteBackupArgs),

    /// Restore entities from a snapshot
    Restore(commands::restore::RestoreArgs),

    /// Delete every record of a table
    Purge(commands::purge::PurgeArgs),
}
