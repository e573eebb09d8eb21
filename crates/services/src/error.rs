//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `DashboardService`.
///
/// Store-layer failures propagate unhandled; the engine does not retry or
/// swallow them.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DashboardServiceError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
