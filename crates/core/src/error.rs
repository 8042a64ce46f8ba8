//! Error types for the data access layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`QueryError`] - Transport and backend errors from the query executor
//! - [`DomainError`] - Invalid input and normalization failures
//! - [`MetadataError`] - Runtime metadata decoding failures
//! - [`DataError`] - Top-level error returned by fetch functions
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

use crate::models::SpecVersion;

// =============================================================================
// Query Errors
// =============================================================================

/// Errors raised while talking to a backend endpoint.
///
/// `Network` and `Http` are transport failures; `Backend` means the
/// backend answered with a structured error list. Both are opaque from
/// this layer's point of view, but the raw messages are kept for display.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No response (connection refused, timeout, TLS failure...).
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response without a structured error body.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body (possibly truncated).
        body: String,
    },

    /// Backend returned a top-level `errors` list.
    #[error("Backend error: {}", messages.join("; "))]
    Backend {
        /// Messages reported by the backend, in order.
        messages: Vec<String>,
    },

    /// No endpoint configured for the requested backend.
    #[error("No endpoint configured for backend {0}")]
    EndpointMissing(String),

    /// Response body could not be parsed into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl QueryError {
    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Http { .. } => "http",
            Self::Backend { .. } => "backend",
            Self::EndpointMissing(_) => "config",
            Self::InvalidResponse(_) => "invalid_response",
        }
    }
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Invalid input and normalization failures.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Address failed SS58 or hex validation.
    #[error("Invalid account address: {0}")]
    InvalidAddress(String),

    /// Filter cannot be expressed for the selected backend.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    /// Pagination request is out of range.
    #[error("Invalid pagination: {0}")]
    InvalidPagination(String),

    /// Raw backend item could not be normalized.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Backend has no runtime spec for a requested version.
    #[error("Runtime spec not found: {0}")]
    SpecNotFound(SpecVersion),
}

// =============================================================================
// Metadata Errors
// =============================================================================

/// Runtime metadata could not be decoded.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Payload is not valid hex.
    #[error("Invalid metadata hex: {0}")]
    Hex(String),

    /// Payload is not valid SCALE-encoded metadata.
    #[error("Invalid metadata encoding: {0}")]
    Scale(String),
}

// =============================================================================
// Data Errors
// =============================================================================

/// Top-level error returned by every fetch function.
#[derive(Debug, Error)]
pub enum DataError {
    /// Executor failure.
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Invalid input or normalization failure.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Metadata decoding failure for a requested spec version.
    #[error("Metadata error for spec {version}: {source}")]
    Metadata {
        /// Spec version whose payload failed to decode.
        version: u32,
        /// Underlying decode error.
        #[source]
        source: MetadataError,
    },
}

impl DataError {
    /// Whether the failure was caused by caller input rather than I/O.
    ///
    /// Invalid input is reported to the user as such; everything else is
    /// presented as an unexpected error.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::Domain(
                DomainError::InvalidAddress(_)
                    | DomainError::InvalidFilter(_)
                    | DomainError::InvalidPagination(_)
            )
        )
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for fetch functions.
pub type DataResult<T> = Result<T, DataError>;

/// Result type for executor calls.
pub type QueryResult<T> = Result<T, QueryError>;

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for metadata decoding.
pub type MetadataResult<T> = Result<T, MetadataError>;

#[cfg(test)]
mod tests {
    use super::*;

    // Test critique: la chaîne de conversion d'erreurs fonctionne
    #[test]
    fn test_error_conversion_chain() {
        let query_err = QueryError::Network("connection refused".into());
        let data_err: DataError = query_err.into();
        assert!(data_err.to_string().contains("connection refused"));

        let domain_err = DomainError::SpecNotFound(SpecVersion::Version(42));
        let data_err: DataError = domain_err.into();
        assert!(data_err.to_string().contains("42"));
    }

    #[test]
    fn test_backend_error_keeps_all_messages() {
        let err = QueryError::Backend {
            messages: vec!["first".into(), "second".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("first") && msg.contains("second"));
        assert_eq!(err.kind(), "backend");
    }

    #[test]
    fn test_invalid_input_classification() {
        let invalid: DataError = DomainError::InvalidAddress("5xyz".into()).into();
        assert!(invalid.is_invalid_input());

        let network: DataError = QueryError::Network("down".into()).into();
        assert!(!network.is_invalid_input());

        let missing: DataError = DomainError::SpecNotFound(SpecVersion::Latest).into();
        assert!(!missing.is_invalid_input());
    }
}
