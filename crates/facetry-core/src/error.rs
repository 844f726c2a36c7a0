//! Error types for Facetry.

/// Errors that can occur while loading a catalog or serving a search.
///
/// Configuration-time variants (`DuplicateField`, `FieldRole`, `Config`,
/// `Parse`) are fatal at startup. Request-time variants are returned to the
/// caller unchanged; nothing here is ever silently replaced by a default.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A field key was registered twice.
    #[error("Duplicate field: {key}")]
    DuplicateField {
        /// The offending field key
        key: String,
    },

    /// A field key is not present in the registry.
    #[error("Unknown field: {key}")]
    UnknownField {
        /// The field key that was looked up
        key: String,
    },

    /// A field exists but lacks the role the caller needs.
    #[error("Field '{key}' is not {role}")]
    FieldRole {
        /// The field key
        key: String,
        /// The role that was required
        role: String,
    },

    /// A sort key is not on the configured allow-list.
    #[error("Unknown sort key: {key}")]
    UnknownSortKey {
        /// The requested sort key
        key: String,
    },

    /// Page or page size out of bounds.
    #[error("Invalid pagination: {message}")]
    InvalidPagination {
        /// What was wrong with the request
        message: String,
    },

    /// A selected facet value is not one of the facet's declared buckets.
    #[error("Invalid value '{value}' for facet '{facet}'")]
    InvalidFacetValue {
        /// Facet key
        facet: String,
        /// Rejected value
        value: String,
    },

    /// The index did not answer within the allotted time.
    #[error("Index timed out after {millis}ms")]
    IndexTimeout {
        /// Timeout in milliseconds
        millis: u64,
    },

    /// The index response contradicts the registry or the query.
    #[error("Inconsistent index response: {message}")]
    InconsistentResponse {
        /// Description of the inconsistency
        message: String,
    },

    /// A single-document lookup found nothing.
    #[error("Document not found: {id}")]
    DocumentNotFound {
        /// Requested document ID
        id: String,
    },

    /// Catalog configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// A filter expression or sort clause could not be parsed.
    #[error("Parse error: {message}")]
    Parse {
        /// Parser diagnostic
        message: String,
    },

    /// The index backend failed for a reason other than a timeout.
    #[error("Backend error: {message}")]
    Backend {
        /// Backend diagnostic
        message: String,
    },

    /// I/O error (reading configuration or documents)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience `Result` type alias for Facetry operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether a caller may reasonably retry the failed operation.
    ///
    /// The engine itself never retries; this only classifies.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::IndexTimeout { .. } => true,
            Error::Backend { .. } => true,
            Error::Io(_) => true,
            Error::DuplicateField { .. }
            | Error::UnknownField { .. }
            | Error::FieldRole { .. }
            | Error::UnknownSortKey { .. }
            | Error::InvalidPagination { .. }
            | Error::InvalidFacetValue { .. }
            | Error::InconsistentResponse { .. }
            | Error::DocumentNotFound { .. }
            | Error::Config { .. }
            | Error::Parse { .. }
            | Error::Json(_) => false,
        }
    }

    /// Creates an unknown-field error.
    pub fn unknown_field<S: Into<String>>(key: S) -> Self {
        Error::UnknownField { key: key.into() }
    }

    /// Creates a field-role error.
    pub fn field_role<K, R>(key: K, role: R) -> Self
    where
        K: Into<String>,
        R: Into<String>,
    {
        Error::FieldRole {
            key: key.into(),
            role: role.into(),
        }
    }

    /// Creates a pagination error.
    pub fn pagination<S: Into<String>>(message: S) -> Self {
        Error::InvalidPagination {
            message: message.into(),
        }
    }

    /// Creates an inconsistent-response error.
    pub fn inconsistent<S: Into<String>>(message: S) -> Self {
        Error::InconsistentResponse {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Creates a backend error.
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Error::Backend {
            message: message.into(),
        }
    }
}
