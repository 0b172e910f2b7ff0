//! Logging and observability
//!
//! Structured logging through `tracing`, with a few macros that keep field
//! names consistent across the scan and bulk paths.
//!
//! # Example
//!
//! ```no_run
//! use tablesync::logging::init_logging;
//! use tablesync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(table = "Patients", "Scan started");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log a fetched scan page
///
/// # Example
///
/// ```no_run
/// use tablesync::log_scan_page;
///
/// log_scan_page!("Patients", 2, 1000, true);
/// ```
#[macro_export]
macro_rules! log_scan_page {
    ($table:expr, $page:expr, $records:expr, $has_more:expr) => {
        tracing::debug!(
            table = %$table,
            page = $page,
            records = $records,
            has_more = $has_more,
            "Fetched scan page"
        );
    };
}

/// Log a single failed item of a bulk operation
///
/// # Example
///
/// ```no_run
/// use tablesync::log_bulk_failure;
/// use tablesync::domain::TableStoreError;
///
/// let error = TableStoreError::from_status(503, "Server busy");
/// log_bulk_failure!("Patients", "patient", "File 7", &error);
/// ```
#[macro_export]
macro_rules! log_bulk_failure {
    ($table:expr, $partition_key:expr, $row_key:expr, $error:expr) => {
        tracing::warn!(
            table = %$table,
            partition_key = %$partition_key,
            row_key = %$row_key,
            throttled = $error.is_throttled(),
            error = %$error,
            "Bulk item failed"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use tablesync::log_error_with_context;
/// use tablesync::domain::TableSyncError;
///
/// let error = TableSyncError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
