//! How the mailbox client obtains a byte stream to the server.

use std::future::Future;

use mailboard_imap::connection;
use mailboard_imap::{Config, ImapStream};
use tokio::io::{AsyncRead, AsyncWrite};

/// Opens transport streams to an IMAP server.
///
/// The client calls this once per session. Tests plug in in-memory
/// streams; production uses [`ImapConnector`].
pub trait Connect: Send + Sync {
    /// The stream type produced.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a fresh stream, positioned before the server greeting.
    fn connect(&self) -> impl Future<Output = mailboard_imap::Result<Self::Stream>> + Send;
}

/// TCP with optional TLS, per [`Config`].
#[derive(Debug, Clone)]
pub struct ImapConnector {
    config: Config,
}

impl ImapConnector {
    /// Creates a connector for the given settings.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }

    /// The settings in use.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }
}

impl Connect for ImapConnector {
    type Stream = ImapStream;

    async fn connect(&self) -> mailboard_imap::Result<ImapStream> {
        tracing::debug!(host = %self.config.host, port = self.config.port, "opening transport");
        connection::connect(&self.config).await
    }
}
