//! Type-state client.
//!
//! A connection moves through three states, each exposing only the commands
//! valid there:
//!
//! - [`NotAuthenticated`]: right after the greeting; only LOGIN.
//! - [`Authenticated`]: LIST, SELECT and EXAMINE.
//! - [`Selected`]: UID SEARCH, UID FETCH and UID STORE on the open mailbox,
//!   plus LIST.
//!
//! Opening a mailbox consumes the client. A NO or BAD reply hands the
//! authenticated client back inside [`OpenError::Rejected`] so the session
//! survives a bad folder name.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod not_authenticated;
mod selected;
mod states;

use std::fmt;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};

pub use self::selected::FetchOutcome;
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, UntaggedResponse, parse_response};
use crate::types::{ListResponse, MailboxStatus, ResponseCode, Status};
use crate::{Error, Result};

/// IMAP connection in state `State`.
pub struct Client<S, State> {
    stream: FramedStream<S>,
    tags: TagGenerator,
    capabilities: Vec<String>,
    io_timeout: Option<Duration>,
    state: State,
}

impl<S, State: fmt::Debug> fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("capabilities", &self.capabilities)
            .field("io_timeout", &self.io_timeout)
            .finish_non_exhaustive()
    }
}

/// Everything a command produced besides its OK.
struct Reply {
    untagged: Vec<UntaggedResponse>,
    code: Option<ResponseCode>,
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Limits every later command round-trip to `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = Some(timeout);
        self
    }

    /// The per-command timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.io_timeout
    }

    /// Capabilities advertised so far.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Returns true if the server advertised `name` (case-insensitive).
    #[must_use]
    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(name))
    }

    /// Sends NOOP.
    pub async fn noop(&mut self) -> Result<()> {
        self.run(&Command::Noop).await.map(drop)
    }

    /// Sends LOGOUT and closes the connection.
    pub async fn logout(mut self) -> Result<()> {
        self.run(&Command::Logout).await?;
        self.stream.shutdown().await
    }

    /// Issues a command and collects its untagged data.
    ///
    /// Fails with the server's NO, BAD or BYE text, and with a parse error if
    /// any frame is malformed. Either way the whole reply has been consumed,
    /// so the connection stays in sync. A command that cannot be serialized
    /// is never sent.
    async fn run(&mut self, command: &Command) -> Result<Reply> {
        let tag = self.tags.next_tag();
        tracing::trace!(%tag, command = command.name(), "sending");
        let wire = command.serialize(&tag)?;

        let frames = match self.io_timeout {
            Some(limit) => tokio::time::timeout(limit, self.exchange(&wire, &tag))
                .await
                .map_err(|_| Error::Timeout(limit))??,
            None => self.exchange(&wire, &tag).await?,
        };

        let Some((tagged, data)) = frames.split_last() else {
            return Err(Error::Protocol("missing tagged completion".to_string()));
        };

        let mut untagged = Vec::with_capacity(data.len());
        let mut first_error = None;
        for frame in data {
            match parse_response(frame) {
                Ok(Response::Untagged(UntaggedResponse::Bye { text, .. }))
                    if !matches!(command, Command::Logout) =>
                {
                    return Err(Error::Bye(text));
                }
                Ok(Response::Untagged(response)) => untagged.push(response),
                Ok(Response::Continuation(_)) => {
                    return Err(Error::Protocol("unexpected continuation request".to_string()));
                }
                Ok(Response::Tagged { tag, .. }) => {
                    tracing::warn!(%tag, "ignoring completion for unknown tag");
                }
                Err(e) => {
                    tracing::warn!(error = %e, command = command.name(), "unparseable response");
                    first_error.get_or_insert(e);
                }
            }
        }

        let Response::Tagged {
            status, code, text, ..
        } = parse_response(tagged)?
        else {
            return Err(Error::Protocol("expected tagged completion".to_string()));
        };

        match status {
            Status::Ok | Status::PreAuth => match first_error {
                Some(e) => Err(e),
                None => Ok(Reply { untagged, code }),
            },
            Status::No => Err(Error::No(text)),
            Status::Bad => Err(Error::Bad(text)),
            Status::Bye => Err(Error::Bye(text)),
        }
    }

    /// LIST is valid both before and after a mailbox is opened.
    async fn list_mailboxes(&mut self, reference: &str, pattern: &str) -> Result<Vec<ListResponse>> {
        let reply = self
            .run(&Command::List {
                reference: reference.to_string(),
                pattern: pattern.to_string(),
            })
            .await?;

        Ok(reply
            .untagged
            .into_iter()
            .filter_map(|response| match response {
                UntaggedResponse::List(list) => Some(list),
                _ => None,
            })
            .collect())
    }

    async fn exchange(&mut self, wire: &[u8], tag: &str) -> Result<Vec<Vec<u8>>> {
        self.stream.write_command(wire).await?;
        self.stream.read_until_tagged(tag).await
    }

    fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tags: self.tags,
            capabilities: self.capabilities,
            io_timeout: self.io_timeout,
            state,
        }
    }

    /// Shared by SELECT and EXAMINE from any post-login state.
    async fn open_mailbox(
        mut self,
        mailbox: &str,
        read_only: bool,
    ) -> std::result::Result<Client<S, Selected>, OpenError<S>> {
        let command = if read_only {
            Command::Examine {
                mailbox: mailbox.to_string(),
            }
        } else {
            Command::Select {
                mailbox: mailbox.to_string(),
            }
        };

        match self.run(&command).await {
            Ok(reply) => {
                let status = mailbox_status(&reply, read_only);
                tracing::debug!(mailbox, exists = status.exists, read_only, "mailbox opened");
                Ok(self.transition(Selected::new(mailbox, status)))
            }
            Err(error @ (Error::No(_) | Error::Bad(_) | Error::InvalidArgument(_))) => {
                Err(OpenError::Rejected {
                    client: self.transition(Authenticated),
                    error,
                })
            }
            Err(error) => Err(OpenError::Failed(error)),
        }
    }
}

fn mailbox_status(reply: &Reply, read_only: bool) -> MailboxStatus {
    let mut status = MailboxStatus {
        read_only: read_only || matches!(reply.code, Some(ResponseCode::ReadOnly)),
        ..MailboxStatus::default()
    };

    for response in &reply.untagged {
        match response {
            UntaggedResponse::Exists(n) => status.exists = *n,
            UntaggedResponse::Recent(n) => status.recent = *n,
            UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
            UntaggedResponse::Ok {
                code: Some(code), ..
            } => match code {
                ResponseCode::UidValidity(v) => status.uid_validity = Some(*v),
                ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
                _ => {}
            },
            _ => {}
        }
    }
    status
}

/// A failed SELECT or EXAMINE.
pub enum OpenError<S> {
    /// The server refused the mailbox, or the name cannot be sent; the
    /// session is still usable.
    Rejected {
        /// The connection, back in the authenticated state.
        client: Client<S, Authenticated>,
        /// The NO or BAD reply, or the refused argument.
        error: Error,
    },
    /// The connection failed along the way.
    Failed(Error),
}

impl<S> OpenError<S> {
    /// The underlying error.
    #[must_use]
    pub const fn error(&self) -> &Error {
        match self {
            Self::Rejected { error, .. } | Self::Failed(error) => error,
        }
    }

    /// Drops any recovered client and returns the error.
    #[must_use]
    pub fn into_error(self) -> Error {
        match self {
            Self::Rejected { error, .. } | Self::Failed(error) => error,
        }
    }
}

impl<S> fmt::Debug for OpenError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { error, .. } => f
                .debug_struct("Rejected")
                .field("error", error)
                .finish_non_exhaustive(),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

impl<S> fmt::Display for OpenError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.error(), f)
    }
}

impl<S> std::error::Error for OpenError<S> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error())
    }
}

impl<S> From<OpenError<S>> for Error {
    fn from(e: OpenError<S>) -> Self {
        e.into_error()
    }
}
