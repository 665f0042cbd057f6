//! Error types for Fondita.

use thiserror::Error;

/// A shared error type for the entire Fondita workspace.
///
/// Variants are grouped by the layer that raises them: the document and image
/// stores, the session registry, and the replication job. The HTTP layer maps
/// each variant onto a status code; nothing below it knows about HTTP.
#[derive(Error, Debug, Clone)]
pub enum FonditaError {
    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// The menu document exists but is not well-formed
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Caller-supplied data was rejected
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload with a disallowed extension or content type
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Upload above the configured size limit
    #[error("Payload too large: {size} bytes (limit {limit} bytes)")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// Missing, unknown or expired credentials
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The production working tree could not be acquired
    #[error("Replication unavailable: {0}")]
    ReplicationUnavailable(String),

    /// The menu snapshot could not be read for replication
    #[error("Source data unavailable: {0}")]
    SourceDataUnavailable(String),

    /// Commit or push of the production working tree failed
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FonditaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::CorruptDocument(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::CorruptDocument(_))
    }

    /// True for errors caused by the caller's input rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::UnsupportedMediaType(_)
                | Self::PayloadTooLarge { .. }
                | Self::Unauthorized(_)
                | Self::NotFound { .. }
        )
    }

    /// True for the three failure modes of a replication run.
    pub fn is_replication_failure(&self) -> bool {
        matches!(
            self,
            Self::ReplicationUnavailable(_)
                | Self::SourceDataUnavailable(_)
                | Self::PublishFailed(_)
        )
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for FonditaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for FonditaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FonditaError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error, used at the binary edge
impl From<anyhow::Error> for FonditaError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, FonditaError>`.
pub type Result<T> = std::result::Result<T, FonditaError>;
