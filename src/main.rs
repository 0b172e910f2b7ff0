// Tablesync - Remote table store sync layer
// Copyright (c) 2025 Tablesync Contributors
// Licensed under the MIT License

use clap::Parser;
use std::process;
use tablesync::cli::commands::EXIT_FATAL;
use tablesync::cli::{Cli, Commands};
use tablesync::config::{load_config, LoggingConfig};
use tablesync::logging::init_logging;

/// Exit code after an interrupt; the run stopped part way
const EXIT_INTERRUPTED: i32 = 1;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // File logging follows the config file when it loads; console only otherwise
    let loaded = load_config(&cli.config).ok();
    let log_level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let logging_config = loaded.map(|c| c.logging).unwrap_or(LoggingConfig {
        local_enabled: false,
        ..Default::default()
    });

    let guard = match init_logging(&log_level, &logging_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Tablesync");

    let exit_code = tokio::select! {
        result = execute_command(&cli) => match result {
            Ok(code) => code,
            Err(e) => {
                tablesync::log_error_with_context!(e, "Command execution failed");
                eprintln!("Error: {e}");
                EXIT_FATAL
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Received SIGINT (Ctrl+C), stopping");
            println!("\n⚠️  Interrupted; operations already sent may have completed");
            EXIT_INTERRUPTED
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(exit_code);
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Init(args) => args.execute().await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Backup(args) => args.execute(&cli.config).await,
        Commands::ListBackups(args) => args.execute(&cli.config).await,
        Commands::DeleteBackup(args) => args.execute(&cli.config).await,
        Commands::Restore(args) => args.execute(&cli.config).await,
        Commands::Purge(args) => args.execute(&cli.config).await,
    }
}
