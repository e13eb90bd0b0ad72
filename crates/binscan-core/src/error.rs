//! Unified error types for the binscan core library.
//!
//! This module provides a unified error type [`BinscanError`] that covers all failure
//! modes across the binscan system. Configuration has its own specific error type
//! ([`ConfigError`](crate::config::ConfigError)) for internal use, which converts
//! into the unified type.
//!
//! # Design Principles
//!
//! - **Specific variants**: Each error variant captures exactly one failure mode
//! - **Negative results are not errors**: an unknown code, an empty search, or a
//!   bin outside the geofence are ordinary return values, never variants here
//! - **HTTP-ready**: Error types include HTTP status codes and error codes
//!
//! # Example
//!
//! ```rust
//! use binscan_core::error::{BinscanError, Result};
//! use binscan_core::Coordinate;
//!
//! fn require_fix(origin: Option<Coordinate>) -> Result<Coordinate> {
//!     origin.ok_or(BinscanError::LocationUnavailable)
//! }
//!
//! assert!(require_fix(None).unwrap_err().is_not_ready());
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The unified error type for all binscan operations.
#[derive(Debug, Error)]
pub enum BinscanError {
    // =========================================================================
    // LOCATION & SEARCH ERRORS
    // =========================================================================
    /// The device location is not yet known, so a search cannot run.
    #[error("Current location is not available yet. Wait for a location fix and try again.")]
    LocationUnavailable,

    /// A search radius was zero, negative, or not a finite number.
    #[error("Invalid search radius: {0}. Radius must be a positive number of meters.")]
    InvalidRadius(f64),

    /// A latitude/longitude pair was out of range or not finite.
    #[error("Invalid coordinate ({latitude}, {longitude}): {reason}")]
    InvalidCoordinate {
        /// Latitude as supplied.
        latitude: f64,
        /// Longitude as supplied.
        longitude: f64,
        /// Which constraint was violated.
        reason: &'static str,
    },

    /// A progressive radius expansion policy is inconsistent.
    #[error("Invalid radius expansion policy: {0}")]
    InvalidExpansion(String),

    // =========================================================================
    // BIN ERRORS
    // =========================================================================
    /// No bin with the given id is registered.
    #[error("Bin not found: '{0}'")]
    BinNotFound(String),

    /// Two bins share the same id.
    #[error("Duplicate bin id: '{0}'. Bin ids must be unique.")]
    DuplicateBinId(String),

    /// Every numeric bin id is taken, so a dropped pin cannot be numbered.
    #[error("No free numeric bin id is left for a new pin")]
    BinIdsExhausted,

    // =========================================================================
    // CODE ERRORS
    // =========================================================================
    /// A code offered for registration is malformed.
    #[error("Invalid code '{code}': {reason}")]
    InvalidCode {
        /// The rejected code.
        code: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    // =========================================================================
    // DATA & CONFIGURATION ERRORS
    // =========================================================================
    /// Packaged bin or code data could not be parsed or validated.
    #[error("Bundled data '{source_name}' is invalid: {message}")]
    BundledDataInvalid {
        /// The data set that failed (file path or built-in name).
        source_name: String,
        /// Parse or validation message.
        message: String,
    },

    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // PERSISTENCE & I/O ERRORS
    // =========================================================================
    /// An error occurred while persisting or reading data.
    #[error("Persistence error: {0}")]
    PersistenceError(String),

    /// Stored data could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for binscan operations.
pub type Result<T> = std::result::Result<T, BinscanError>;

/// Short alias for [`BinscanError`].
pub type Error = BinscanError;

impl BinscanError {
    /// Returns `true` if this error came from a location or radius precondition.
    #[inline]
    #[must_use]
    pub const fn is_search_error(&self) -> bool {
        matches!(
            self,
            Self::LocationUnavailable
                | Self::InvalidRadius(_)
                | Self::InvalidCoordinate { .. }
                | Self::InvalidExpansion(_)
        )
    }

    /// Returns `true` if this error is related to configuration.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigNotFound(_) | Self::ConfigParseError(_) | Self::ConfigValidationError(_)
        )
    }

    /// Returns `true` if this error is related to I/O or persistence.
    #[inline]
    #[must_use]
    pub const fn is_io_error(&self) -> bool {
        matches!(
            self,
            Self::PersistenceError(_) | Self::SerializationError(_) | Self::IoError(_)
        )
    }

    /// Returns `true` if the operation could not run because an input
    /// collaborator (the location provider) has not delivered yet.
    ///
    /// Callers surface this differently from "nothing found".
    #[inline]
    #[must_use]
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::LocationUnavailable)
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - malformed input
            Self::InvalidRadius(_)
            | Self::InvalidCoordinate { .. }
            | Self::InvalidExpansion(_)
            | Self::InvalidCode { .. } => 400,

            // 404 Not Found
            Self::BinNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict
            Self::DuplicateBinId(_) | Self::BinIdsExhausted => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::ConfigParseError(_) | Self::ConfigValidationError(_) => 422,

            // 424 Failed Dependency - location provider has not delivered
            Self::LocationUnavailable => 424,

            // 500 Internal Server Error - server-side issues
            Self::BundledDataInvalid { .. }
            | Self::PersistenceError(_)
            | Self::SerializationError(_)
            | Self::IoError(_) => 500,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LocationUnavailable => "LOCATION_UNAVAILABLE",
            Self::InvalidRadius(_) => "INVALID_RADIUS",
            Self::InvalidCoordinate { .. } => "INVALID_COORDINATE",
            Self::InvalidExpansion(_) => "INVALID_EXPANSION",
            Self::BinNotFound(_) => "BIN_NOT_FOUND",
            Self::DuplicateBinId(_) => "DUPLICATE_BIN_ID",
            Self::BinIdsExhausted => "BIN_IDS_EXHAUSTED",
            Self::InvalidCode { .. } => "INVALID_CODE",
            Self::BundledDataInvalid { .. } => "BUNDLED_DATA_INVALID",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::PersistenceError(_) => "PERSISTENCE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for BinscanError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::LoadError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { path, source } => {
                Self::PersistenceError(format!("Failed to write {}: {}", path.display(), source))
            }
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_search_error_classification() {
        assert!(BinscanError::LocationUnavailable.is_search_error());
        assert!(BinscanError::InvalidRadius(-1.0).is_search_error());
        assert!(BinscanError::InvalidExpansion("step".into()).is_search_error());
        assert!(BinscanError::InvalidCoordinate {
            latitude: 91.0,
            longitude: 0.0,
            reason: "latitude out of range",
        }
        .is_search_error());

        assert!(!BinscanError::BinNotFound("1".into()).is_search_error());
    }

    #[test]
    fn test_not_ready_is_only_location() {
        assert!(BinscanError::LocationUnavailable.is_not_ready());
        assert!(!BinscanError::InvalidRadius(0.0).is_not_ready());
        assert!(!BinscanError::PersistenceError("x".into()).is_not_ready());
    }

    #[test]
    fn test_config_error_classification() {
        assert!(BinscanError::ConfigNotFound(PathBuf::from("/test")).is_config_error());
        assert!(BinscanError::ConfigParseError("syntax error".into()).is_config_error());
        assert!(BinscanError::ConfigValidationError("invalid value".into()).is_config_error());

        assert!(!BinscanError::LocationUnavailable.is_config_error());
    }

    #[test]
    fn test_io_error_classification() {
        assert!(BinscanError::PersistenceError("disk full".into()).is_io_error());
        assert!(BinscanError::IoError(IoErr::new(ErrorKind::NotFound, "test")).is_io_error());

        assert!(!BinscanError::LocationUnavailable.is_io_error());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(BinscanError::InvalidRadius(0.0).http_status_code(), 400);
        assert_eq!(
            BinscanError::InvalidCode {
                code: String::new(),
                reason: "empty",
            }
            .http_status_code(),
            400
        );
        assert_eq!(BinscanError::BinNotFound("7".into()).http_status_code(), 404);
        assert_eq!(BinscanError::DuplicateBinId("7".into()).http_status_code(), 409);
        assert_eq!(BinscanError::BinIdsExhausted.http_status_code(), 409);
        assert_eq!(BinscanError::LocationUnavailable.http_status_code(), 424);
        assert_eq!(
            BinscanError::PersistenceError("error".into()).http_status_code(),
            500
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            BinscanError::LocationUnavailable.error_code(),
            "LOCATION_UNAVAILABLE"
        );
        assert_eq!(BinscanError::InvalidRadius(0.0).error_code(), "INVALID_RADIUS");
        assert_eq!(
            BinscanError::ConfigNotFound(PathBuf::new()).error_code(),
            "CONFIG_NOT_FOUND"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err: BinscanError = io_err.into();
        assert!(matches!(err, BinscanError::IoError(_)));
        assert!(err.is_io_error());
    }

    #[test]
    fn test_error_display_messages() {
        let err = BinscanError::LocationUnavailable;
        assert!(err.to_string().contains("location is not available"));

        let err = BinscanError::BinNotFound("A-17".into());
        assert!(err.to_string().contains("A-17"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<BinscanError>();
        assert_sync::<BinscanError>();
    }
}
