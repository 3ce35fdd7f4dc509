//! Error taxonomy for code operations

use codeops_common::{ErrorBody, ErrorCode};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, OperationError>;

/// Terminal failure of a code operation. Each variant maps to exactly one
/// stable [`ErrorCode`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OperationError {
    /// Language unknown, missing, mismatched with the file, or without a
    /// recipe for the requested action
    #[error("{0}")]
    UnsupportedLanguage(String),

    /// Target path missing, unreadable or malformed
    #[error("{0}")]
    FileNotFound(String),

    /// A tool argument failed the allowlist
    #[error("{0}")]
    InvalidArgs(String),

    /// Inline content rejected before execution
    #[error("{0}")]
    InvalidContent(String),

    /// Another operation currently holds the target
    #[error("{0}")]
    ConcurrentAccess(String),

    /// The tool could not be run to completion
    #[error("{0}")]
    ExecutionError(String),

    /// The test runner ran but collected no tests
    #[error("{0}")]
    NoTestsFound(String),
}

impl OperationError {
    pub fn code(&self) -> ErrorCode {
        match self {
            OperationError::UnsupportedLanguage(_) => ErrorCode::UnsupportedLanguage,
            OperationError::FileNotFound(_) => ErrorCode::FileNotFound,
            OperationError::InvalidArgs(_) => ErrorCode::InvalidArgs,
            OperationError::InvalidContent(_) => ErrorCode::InvalidContent,
            OperationError::ConcurrentAccess(_) => ErrorCode::ConcurrentAccess,
            OperationError::ExecutionError(_) => ErrorCode::ExecutionError,
            OperationError::NoTestsFound(_) => ErrorCode::NoTestsFound,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            OperationError::UnsupportedLanguage(msg)
            | OperationError::FileNotFound(msg)
            | OperationError::InvalidArgs(msg)
            | OperationError::InvalidContent(msg)
            | OperationError::ConcurrentAccess(msg)
            | OperationError::ExecutionError(msg)
            | OperationError::NoTestsFound(msg) => msg,
        }
    }

    /// Whether the caller may succeed by retrying the same request later
    pub fn is_retryable(&self) -> bool {
        matches!(self, OperationError::ConcurrentAccess(_))
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.message().to_string(),
        }
    }
}

impl From<std::io::Error> for OperationError {
    fn from(err: std::io::Error) -> Self {
        OperationError::ExecutionError(format!("I/O error: {}", err))
    }
}

impl From<tokio::task::JoinError> for OperationError {
    fn from(err: tokio::task::JoinError) -> Self {
        OperationError::ExecutionError(format!("Execution task failed: {}", err))
    }
}
