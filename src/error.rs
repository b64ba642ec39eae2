//! Diagram domain errors
//!
//! Domain lookups never fail loudly: operating on an unknown node or edge yields `None`/`false`.
//! The error types here cover the boundaries where input is validated, namely value object
//! construction, document (de)serialization and host configuration.

use thiserror::Error;

/// Errors raised when constructing value objects from untrusted input
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValueObjectError {
    /// Width or height was zero, negative or not finite
    #[error("Size dimensions must be positive, got {width}x{height}")]
    InvalidSize { width: f64, height: f64 },

    /// Color string could not be parsed as `#rgb`, `#rrggbb` or `#rrggbbaa`
    #[error("Invalid color: {0}")]
    InvalidColor(String),
}

/// Errors raised while loading or saving a document
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The payload was not valid JSON or did not match the document shape
    #[error("Malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document declares a major version this crate cannot read
    #[error("Unsupported document version: {0}")]
    UnsupportedVersion(String),
}

/// Result type for document operations
pub type DocumentResult<T> = Result<T, DocumentError>;

/// Errors raised while reading host configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration was not valid JSON or did not match the expected shape
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}
