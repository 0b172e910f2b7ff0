//! Result type alias for tablesync

use super::errors::TableSyncError;

/// Result type alias for tablesync operations
///
/// # Examples
///
/// ```
/// use tablesync::domain::result::Result;
/// use tablesync::domain::errors::TableSyncError;
///
/// fn example_function() -> Result<String> {
///     Ok("success".to_string())
/// }
///
/// fn failing_function() -> Result<()> {
///     Err(TableSyncError::Validation("Invalid input".to_string()))
/// }
/// ```
pub type Result<T> = std::result::Result<T, TableSyncError>;
