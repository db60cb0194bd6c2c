//! Error types for MIME parsing.

use thiserror::Error;

/// Result type for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing a message.
#[derive(Debug, Error)]
pub enum Error {
    /// The message has no usable header block.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A Content-Type value without a `type/subtype` pair.
    #[error("Invalid content type: {0}")]
    InvalidContentType(String),

    /// A multipart entity that cannot be split into parts.
    #[error("Invalid multipart structure: {0}")]
    InvalidMultipart(String),

    /// A base64 body that does not decode.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}
