use thiserror::Error;

/// The stable, lowercase-kebab error codes of the taxonomy in spec §7.
///
/// External collaborators (the RPC layer) map on this code, never on the
/// `Display` message, so message wording can change freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidArgument,
    NotFound,
    ComputationError,
    StoreError,
    Internal,
    Cancelled,
}

impl ErrorCode {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "invalid-argument",
            ErrorCode::NotFound => "not-found",
            ErrorCode::ComputationError => "computation-error",
            ErrorCode::StoreError => "store-error",
            ErrorCode::Internal => "internal",
            ErrorCode::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by every public operation of the core (spec §7).
#[derive(Error, Debug)]
pub enum ObsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("computation error: {0}")]
    ComputationError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ObsError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        ObsError::InvalidArgument(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ObsError::NotFound(msg.into())
    }

    pub fn computation_error(msg: impl Into<String>) -> Self {
        ObsError::ComputationError(msg.into())
    }

    pub fn store_error(msg: impl Into<String>) -> Self {
        ObsError::StoreError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ObsError::Internal(msg.into())
    }

    /// The stable error code for this variant, independent of the message.
    pub fn code(&self) -> ErrorCode {
        match self {
            ObsError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ObsError::NotFound(_) => ErrorCode::NotFound,
            ObsError::ComputationError(_) => ErrorCode::ComputationError,
            ObsError::StoreError(_) => ErrorCode::StoreError,
            ObsError::Internal(_) => ErrorCode::Internal,
            ObsError::Cancelled => ErrorCode::Cancelled,
        }
    }
}

pub type ObsResult<T> = Result<T, ObsError>;
