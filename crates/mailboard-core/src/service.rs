//! The mail service facade.
//!
//! Every operation answers with an [`Envelope`]: `success`, a payload that
//! is always structurally valid, and an error message on failure. Errors
//! never escape as `Err`.

use serde::{Deserialize, Serialize};

use crate::client::MailboxClient;
use crate::config::MailConfig;
use crate::connector::{Connect, ImapConnector};
use crate::error::MailError;
use crate::model::{FetchOptions, MailFolder, MailMessage, ServerInfo};

/// Uniform result of a service call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the operation succeeded.
    pub success: bool,
    /// Payload; a default value on failure.
    pub data: T,
    /// Failure message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful result.
    pub const fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    /// A failed result carrying `data` as the fallback payload.
    pub fn failed(data: T, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

impl<T: Default> Envelope<T> {
    fn from_result(result: Result<T, MailError>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => Self::failed(T::default(), e.to_string()),
        }
    }
}

/// Payload of [`MailService::get_emails`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailsPage {
    /// The requested page, newest first.
    pub emails: Vec<MailMessage>,
    /// Number of messages returned.
    pub total: usize,
}

impl EmailsPage {
    /// Wraps a page of messages.
    #[must_use]
    pub fn new(emails: Vec<MailMessage>) -> Self {
        Self {
            total: emails.len(),
            emails,
        }
    }
}

/// Payload of [`MailService::get_folders`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderList {
    /// Folders, parents before children.
    pub folders: Vec<MailFolder>,
}

/// Whether the session is up and where it points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    /// Logged in and not lost.
    pub connected: bool,
    /// Target server.
    pub server_info: ServerInfo,
}

/// Facade over a [`MailboxClient`].
///
/// Construct one per account and share it by reference. It owns the
/// client, so dropping the service drops the session.
#[derive(Debug)]
pub struct MailService<C: Connect> {
    client: MailboxClient<C>,
}

impl MailService<ImapConnector> {
    /// A service that reaches the server over TCP/TLS.
    #[must_use]
    pub fn from_config(config: &MailConfig) -> Self {
        Self::new(MailboxClient::new(
            ImapConnector::new(config.imap_config()),
            config,
        ))
    }
}

impl<C: Connect> MailService<C> {
    /// Wraps an existing client.
    pub const fn new(client: MailboxClient<C>) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub const fn client(&self) -> &MailboxClient<C> {
        &self.client
    }

    /// Opens the session if needed.
    pub async fn connect(&self) -> Envelope<()> {
        Envelope::from_result(self.client.connect().await)
    }

    /// Logs out. Always succeeds.
    pub async fn disconnect(&self) {
        self.client.disconnect().await;
    }

    /// Fetches a page of messages.
    pub async fn get_emails(&self, options: &FetchOptions) -> Envelope<EmailsPage> {
        let result = self.client.fetch_emails(options).await;
        if let Err(e) = &result {
            tracing::warn!(folder = %options.folder, kind = e.kind(), error = %e, "get_emails failed");
        }
        Envelope::from_result(result.map(EmailsPage::new))
    }

    /// Lists every folder.
    pub async fn get_folders(&self) -> Envelope<FolderList> {
        let result = self.client.list_folders().await;
        if let Err(e) = &result {
            tracing::warn!(kind = e.kind(), error = %e, "get_folders failed");
        }
        Envelope::from_result(result.map(|folders| FolderList { folders }))
    }

    /// Sets `\Seen` on a message of the current folder.
    pub async fn mark_email_as_read(&self, uid: u32) -> Envelope<()> {
        mutation("mark_email_as_read", uid, self.client.mark_as_read(uid).await)
    }

    /// Clears `\Seen` on a message of the current folder.
    pub async fn mark_email_as_unread(&self, uid: u32) -> Envelope<()> {
        mutation("mark_email_as_unread", uid, self.client.mark_as_unread(uid).await)
    }

    /// Sets `\Deleted` on a message of the current folder.
    pub async fn delete_email(&self, uid: u32) -> Envelope<()> {
        mutation("delete_email", uid, self.client.delete_email(uid).await)
    }

    /// Current status without touching the network.
    pub fn get_connection_status(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: self.client.is_connected(),
            server_info: self.client.server_info(),
        }
    }

    /// Connects if needed and reports whether that worked.
    pub async fn test_connection(&self) -> Envelope<()> {
        let outcome = self.connect().await;
        if outcome.success {
            tracing::info!("connection test passed");
        } else {
            tracing::warn!(error = ?outcome.error, "connection test failed");
        }
        outcome
    }

    /// Folder that flag changes apply to.
    pub async fn current_folder(&self) -> String {
        self.client.current_folder().await
    }
}

fn mutation(operation: &str, uid: u32, result: Result<(), MailError>) -> Envelope<()> {
    if let Err(e) = &result {
        tracing::warn!(operation, uid, kind = e.kind(), error = %e, "flag change failed");
    }
    Envelope::from_result(result)
}
