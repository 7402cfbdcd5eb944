use imgbench_client::ApiError;
use imgbench_core::error::CoreError;

/// Errors surfaced by catalog and run operations.
///
/// Backend failures pass through untouched so callers see the original
/// status code and detail.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Backend(#[from] ApiError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl SyncError {
    /// HTTP status of a backend rejection, if that is what this is.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SyncError::Backend(e) => e.status_code(),
            SyncError::Core(_) => None,
        }
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
