//! Error types for dubflow.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubflowError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Blob store errors
    #[error("Object not found: {bucket}/{key}")]
    BlobNotFound { bucket: String, key: String },

    #[error("Blob store error: {message}")]
    Storage { message: String },

    // External capability errors
    #[error("{service} request failed: {message}")]
    Service { service: String, message: String },

    // Trigger errors
    #[error("Invalid notification: {message}")]
    Notification { message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DubflowError {
    /// Shorthand for a failed call to an external capability.
    pub fn service(service: &str, message: impl Into<String>) -> Self {
        DubflowError::Service {
            service: service.to_string(),
            message: message.into(),
        }
    }

    /// Returns true if this error means the object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DubflowError::BlobNotFound { .. })
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, DubflowError>;
