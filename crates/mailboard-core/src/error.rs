//! Error types for the core library.

use thiserror::Error;

/// Errors surfaced by mailbox operations.
#[derive(Debug, Error)]
pub enum MailError {
    /// Connecting, TLS or authentication failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server sent something the client cannot use.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A whole fetch operation failed.
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// A flag change was rejected or targeted an unknown message.
    #[error("Flag mutation error: {0}")]
    FlagMutation(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl MailError {
    /// Short machine-readable kind, used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection(_) => "connection",
            Self::Protocol(_) => "protocol",
            Self::Fetch(_) => "fetch",
            Self::FlagMutation(_) => "flag_mutation",
            Self::Config(_) => "config",
        }
    }
}

/// Why one FETCH response could not become a message.
///
/// Never surfaced as a [`MailError`]: the message is replaced by a
/// placeholder record and the cause is logged.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The response carried no message body.
    #[error("message payload missing")]
    MissingPayload,

    /// The server's FETCH line itself was malformed.
    #[error("malformed FETCH response: {0}")]
    MalformedResponse(String),

    /// The MIME structure could not be processed.
    #[error("MIME error: {0}")]
    Mime(#[from] mailboard_mime::Error),
}

/// Cache backend failures. The cache logs and swallows these.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem access failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type alias using [`MailError`].
pub type Result<T> = std::result::Result<T, MailError>;
