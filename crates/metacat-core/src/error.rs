//! Error types for `metacat`.
//!
//! Every operation in the crate reports one of these variants. Error codes
//! follow the pattern `CAT-XXX` so they can be matched in logs without
//! parsing the message.

use thiserror::Error;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Result type alias for `metacat` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in `metacat` operations.
///
/// None of these are retried inside the crate. Callers that want retries
/// wrap the calls themselves.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed predicate or query input (CAT-001).
    ///
    /// Missing attribute names, missing literals, unparsable geometry or
    /// XPath, bad start index, or a disabled feature.
    #[error("[CAT-001] Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The backend rejected or could not execute a compiled query (CAT-002).
    #[error("[CAT-002] Query failed: {message}")]
    QueryFailed {
        /// What went wrong.
        message: String,
        /// Backend failure behind it, if any.
        #[source]
        source: Option<BackendError>,
    },

    /// The backend rejected a write or the lookup before it (CAT-003).
    #[error("[CAT-003] Ingest failed: {message}")]
    IngestFailed {
        /// What went wrong.
        message: String,
        /// Backend failure behind it, if any.
        #[source]
        source: Option<BackendError>,
    },

    /// Caller or deployment misconfiguration (CAT-004).
    #[error("[CAT-004] Configuration error: {0}")]
    Configuration(String),

    /// A logical attribute has no physical field in the index (CAT-005).
    #[error("[CAT-005] Attribute '{0}' does not resolve to any index field")]
    UnresolvableAttribute(String),

    /// An update matched more stored records than entries supplied (CAT-006).
    #[error("[CAT-006] Update matched {found} existing records for {expected} update entries")]
    TooManyMatches {
        /// Number of update entries supplied.
        expected: usize,
        /// Number of stored records matched by the lookup.
        found: u64,
    },

    /// Raw backend failure (CAT-007).
    #[error("[CAT-007] Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Configuration loading failure (CAT-008).
    #[error("[CAT-008] {0}")]
    Config(#[from] ConfigError),
}

impl Error {
    /// Returns the error code (e.g., "CAT-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedOperation(_) => "CAT-001",
            Self::QueryFailed { .. } => "CAT-002",
            Self::IngestFailed { .. } => "CAT-003",
            Self::Configuration(_) => "CAT-004",
            Self::UnresolvableAttribute(_) => "CAT-005",
            Self::TooManyMatches { .. } => "CAT-006",
            Self::Backend(_) => "CAT-007",
            Self::Config(_) => "CAT-008",
        }
    }

    /// Returns true if a caller may reasonably retry the same call.
    ///
    /// Only transport-level backend failures qualify, whether raw or behind
    /// a failed query or write. Input and configuration errors fail the
    /// same way every time.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(BackendError::Transport(_))
                | Self::QueryFailed {
                    source: Some(BackendError::Transport(_)),
                    ..
                }
                | Self::IngestFailed {
                    source: Some(BackendError::Transport(_)),
                    ..
                }
        )
    }

    pub(crate) fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedOperation(message.into())
    }

    pub(crate) fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn ingest_failed(message: impl Into<String>) -> Self {
        Self::IngestFailed {
            message: message.into(),
            source: None,
        }
    }

    /// A query the backend failed, keeping the backend error as source.
    pub(crate) fn query_backend(message: impl Into<String>, source: BackendError) -> Self {
        Self::QueryFailed {
            message: message.into(),
            source: Some(source),
        }
    }

    /// A write or lookup the backend failed, keeping the backend error as
    /// source.
    pub(crate) fn ingest_backend(message: impl Into<String>, source: BackendError) -> Self {
        Self::IngestFailed {
            message: message.into(),
            source: Some(source),
        }
    }
}
