//! Error types for the tableconverter crate.
//!
//! - [`ReshapeError`] - melt core errors (read, validation, write)
//! - [`SessionError`] - pending-upload session store errors
//! - [`UploadError`] - upload staging errors
//! - [`ServerError`] - top-level HTTP service errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Reshape Errors
// =============================================================================

/// Errors raised by the melt core.
///
/// Every variant aborts the current transformation. The core never logs,
/// retries or recovers; the caller decides what the user sees.
#[derive(Debug, Error)]
pub enum ReshapeError {
    /// The input stream could not be read or parsed.
    #[error("Failed to read input: {0}")]
    Read(#[source] csv::Error),

    /// The input contained no record at all, so there is no header.
    #[error("Input is empty: no header row found")]
    EmptyInput,

    /// A header label is not valid UTF-8.
    #[error("Header column {column} is not valid UTF-8")]
    HeaderEncoding { column: usize },

    /// The delimiter spec cannot be used as a single-byte field separator.
    #[error("Invalid delimiter {0:?}: expected \"tab\" or a string starting with an ASCII character")]
    InvalidDelimiter(String),

    /// The header repeats one or more labels after trimming.
    #[error("Duplicated column names: {}", .0.join(", "))]
    DuplicateColumns(Vec<String>),

    /// One or more requested fixed columns are absent from the header.
    #[error("Fixed column not found in dataset: {}", .0.join(", "))]
    FixedColumnNotFound(Vec<String>),

    /// The stream's header differs from the header a plan was validated against.
    #[error("Input header does not match the validated column plan")]
    HeaderMismatch,

    /// The output sink rejected a write or flush.
    #[error("Failed to write output: {0}")]
    Write(#[source] csv::Error),
}

impl ReshapeError {
    /// True for the failures that come from consuming the input.
    pub fn is_read_error(&self) -> bool {
        matches!(
            self,
            ReshapeError::Read(_) | ReshapeError::EmptyInput | ReshapeError::HeaderEncoding { .. }
        )
    }

    /// True for header/fixed-column problems the caller can fix by choosing
    /// other columns or another delimiter.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            ReshapeError::InvalidDelimiter(_)
                | ReshapeError::DuplicateColumns(_)
                | ReshapeError::FixedColumnNotFound(_)
                | ReshapeError::HeaderMismatch
        )
    }
}

// =============================================================================
// Session Errors
// =============================================================================

/// Errors from the pending-upload session store.
#[derive(Debug, Error)]
pub enum SessionError {
    /// No live session for this key (never created, converted or expired).
    #[error("Session not found or expired")]
    NotFound,

    /// The request carried no session cookie.
    #[error("Missing session cookie")]
    MissingCookie,

    /// A thread panicked while holding the store lock.
    #[error("Session store lock poisoned")]
    Poisoned,
}

// =============================================================================
// Upload Errors
// =============================================================================

/// Errors while receiving and staging an uploaded table.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The multipart form had no file under the expected field.
    #[error("No file provided in field '{0}'")]
    MissingFile(String),

    /// The multipart body could not be decoded.
    #[error("Multipart error: {0}")]
    Multipart(String),

    /// The upload exceeds the configured size limit.
    #[error("Upload of {size} bytes exceeds the limit of {max} bytes")]
    TooLarge { size: usize, max: usize },

    /// Writing the staged copy failed.
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),

    /// The staged table has an unusable header.
    #[error(transparent)]
    Reshape(#[from] ReshapeError),
}

// =============================================================================
// Server Errors (top-level)
// =============================================================================

/// HTTP service errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Session lookup failed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Upload staging failed.
    #[error("Upload error: {0}")]
    Upload(#[from] UploadError),

    /// Conversion request rejected before streaming started.
    #[error("Conversion error: {0}")]
    Reshape(#[from] ReshapeError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for melt operations.
pub type ReshapeResult<T> = Result<T, ReshapeError>;

/// Result type for session store operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Result type for upload staging.
pub type UploadResult<T> = Result<T, UploadError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_columns_message_lists_labels() {
        let err = ReshapeError::DuplicateColumns(vec!["a".into(), "b".into()]);
        assert_eq!(err.to_string(), "Duplicated column names: a, b");
        assert!(err.is_validation_error());
        assert!(!err.is_read_error());
    }

    #[test]
    fn test_error_conversion_chain() {
        // ReshapeError -> UploadError -> ServerError
        let upload: UploadError = ReshapeError::EmptyInput.into();
        let server: ServerError = upload.into();
        assert!(server.to_string().contains("empty"));

        let server: ServerError = SessionError::NotFound.into();
        assert!(server.to_string().contains("expired"));
    }

    #[test]
    fn test_read_error_classification() {
        assert!(ReshapeError::EmptyInput.is_read_error());
        assert!(ReshapeError::HeaderEncoding { column: 2 }.is_read_error());
        assert!(!ReshapeError::FixedColumnNotFound(vec!["c".into()]).is_read_error());
    }
}
