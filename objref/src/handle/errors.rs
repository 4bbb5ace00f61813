use std::result;

use thiserror::Error;

/// The error type for handle and wrapper operations.
///
/// Every variant points at a bug in the caller rather than a condition to recover from.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum HandleError {
    #[error("The handle was already released")]
    InvalidHandle,
    #[error("Can't take ownership of a null address")]
    NullAddress,
    #[error("No reference counting table is installed (see API::install())")]
    NoApi,
    #[error("The native library refused to add a reference")]
    RefFailed,
}

impl From<HandleError> for String {
    fn from(error: HandleError) -> Self {
        error.to_string()
    }
}

/// A specialized `Result` type for handle operations.
pub type HandleResult<T> = result::Result<T, HandleError>;
