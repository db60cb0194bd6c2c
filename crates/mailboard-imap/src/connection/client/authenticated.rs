use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, OpenError};
use crate::types::ListResponse;
use crate::Result;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Lists mailboxes matching `pattern` under `reference`.
    ///
    /// A malformed LIST line fails the whole call with a parse error.
    pub async fn list(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        self.list_mailboxes(reference, pattern).await
    }

    /// Opens a mailbox read-write.
    pub async fn select(self, mailbox: &str) -> std::result::Result<Client<S, Selected>, OpenError<S>> {
        self.open_mailbox(mailbox, false).await
    }

    /// Opens a mailbox read-only.
    pub async fn examine(self, mailbox: &str) -> std::result::Result<Client<S, Selected>, OpenError<S>> {
        self.open_mailbox(mailbox, true).await
    }
}
