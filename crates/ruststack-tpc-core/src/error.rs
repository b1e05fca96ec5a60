//! TPC error types.
//!
//! [`TpcError`] is the single, closed failure taxonomy of a third-party copy.
//! Validation rejections and outbound transfer failures are both returned as
//! values of this enum, and [`TpcError::status_code`] gives the one outward HTTP
//! status each kind maps to.
//!
//! # Usage
//!
//! ```
//! use ruststack_tpc_core::error::TpcError;
//!
//! let err = TpcError::OutboundResponse {
//!     status: 403,
//!     reason: "Access denied".to_owned(),
//! };
//! assert_eq!(err.status_code(), http::StatusCode::PRECONDITION_FAILED);
//! assert_eq!(err.to_string(), "Third party transfer error: 403 Access denied");
//! ```

use http::StatusCode;

/// Message for [`TpcError::Conflict`].
pub const PARENT_MISSING_MESSAGE: &str = "Parent resource does not exist";

/// Message for [`TpcError::Precondition`].
pub const TARGET_EXISTS_MESSAGE: &str = "Target file exists and Overwrite is false";

/// Failure of a single third-party copy.
///
/// The `Display` output of each variant is the exact body written back to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TpcError {
    /// Malformed, ambiguous, or unsupported header or path.
    #[error("{0}")]
    Validation(String),

    /// The parent of the local target does not exist.
    #[error("Parent resource does not exist")]
    Conflict,

    /// The local target exists and overwrite was not requested.
    #[error("Target file exists and Overwrite is false")]
    Precondition,

    /// The transferred bytes do not match the checksum advertised by the
    /// remote endpoint, or no usable checksum was advertised.
    #[error("{0}")]
    ChecksumVerification(String),

    /// Generic transfer failure (local I/O, unresolvable paths).
    #[error("{0}")]
    Transfer(String),

    /// Transport-level failure of the outbound call.
    #[error("Third party transfer error: {0}")]
    OutboundProtocol(String),

    /// The remote endpoint answered with a non-2xx status.
    #[error("Third party transfer error: {status} {reason}")]
    OutboundResponse {
        /// Upstream status code.
        status: u16,
        /// Upstream reason phrase.
        reason: String,
    },
}

impl TpcError {
    /// Create a [`TpcError::Validation`] from any message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a [`TpcError::Transfer`] from any message.
    #[must_use]
    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer(message.into())
    }

    /// Create a [`TpcError::ChecksumVerification`] from any message.
    #[must_use]
    pub fn checksum(message: impl Into<String>) -> Self {
        Self::ChecksumVerification(message.into())
    }

    /// The outward HTTP status for this failure.
    ///
    /// Upstream statuses are normalized to `412`; the original status only
    /// survives in the message.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Precondition
            | Self::ChecksumVerification(_)
            | Self::Transfer(_)
            | Self::OutboundProtocol(_)
            | Self::OutboundResponse { .. } => StatusCode::PRECONDITION_FAILED,
        }
    }

    /// Short, stable name of the failure kind, used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Conflict => "conflict",
            Self::Precondition => "precondition",
            Self::ChecksumVerification(_) => "checksum",
            Self::Transfer(_) => "transfer",
            Self::OutboundProtocol(_) => "outbound_protocol",
            Self::OutboundResponse { .. } => "outbound_response",
        }
    }
}

/// Startup configuration error. Always fatal.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A storage area entry is malformed.
    #[error("invalid storage area '{name}': {reason}")]
    InvalidStorageArea {
        /// Name of the offending storage area.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Two storage areas share a name.
    #[error("duplicate storage area: {0}")]
    DuplicateStorageArea(String),

    /// Unknown digest algorithm.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigest(String),
}
