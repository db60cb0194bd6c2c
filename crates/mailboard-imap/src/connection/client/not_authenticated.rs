use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::{Command, Secret, TagGenerator};
use crate::connection::framed::FramedStream;
use crate::parser::{Response, UntaggedResponse, parse_response};
use crate::types::ResponseCode;
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a freshly opened stream and consumes the server greeting.
    ///
    /// Capabilities announced in the greeting are remembered. A `BYE`
    /// greeting fails with [`Error::Bye`].
    pub async fn from_stream(stream: S) -> Result<Self> {
        let mut stream = FramedStream::new(stream);
        let greeting = stream.read_frame().await?;

        let capabilities = match parse_response(&greeting)? {
            Response::Untagged(
                UntaggedResponse::Ok { code, .. } | UntaggedResponse::PreAuth { code, .. },
            ) => match code {
                Some(ResponseCode::Capability(caps)) => caps,
                _ => Vec::new(),
            },
            Response::Untagged(UntaggedResponse::Bye { text, .. }) => {
                return Err(Error::Bye(text));
            }
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        };

        Ok(Self {
            stream,
            tags: TagGenerator::default(),
            capabilities,
            io_timeout: None,
            state: NotAuthenticated,
        })
    }

    /// Logs in with LOGIN.
    ///
    /// A NO reply becomes [`Error::Auth`]; the connection is consumed either
    /// way since servers commonly drop it after repeated failures.
    pub async fn login(mut self, username: &str, password: &str) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: Secret::new(password),
        };

        let reply = match self.run(&command).await {
            Ok(reply) => reply,
            Err(Error::No(text)) => return Err(Error::Auth(text)),
            Err(e) => return Err(e),
        };

        if let Some(ResponseCode::Capability(caps)) = reply.code {
            self.capabilities = caps;
        }
        for response in reply.untagged {
            if let UntaggedResponse::Capability(caps) = response {
                self.capabilities = caps;
            }
        }

        tracing::debug!(username, "logged in");
        Ok(self.transition(Authenticated))
    }
}
