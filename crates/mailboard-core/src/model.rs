//! Domain models shared by the client, the service and the cache.
//!
//! Everything here serializes to camelCase JSON, the shape the dashboard
//! consumes and the cache stores.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Folder opened when the caller names none.
pub const DEFAULT_FOLDER: &str = "INBOX";

/// An address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    /// `local@domain`.
    pub address: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EmailAddress {
    /// Creates an address.
    #[must_use]
    pub fn new(address: impl Into<String>, name: Option<String>) -> Self {
        Self {
            address: address.into(),
            name,
        }
    }
}

/// Summary of an attached file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// File name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: usize,
}

/// A parsed message.
///
/// `uid` addresses the message for flag changes within its folder; `id`
/// stays stable for display keying even when the UID does not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    /// Message-ID without brackets, or a synthesized key.
    pub id: String,
    /// Server UID within the folder.
    pub uid: u32,
    /// Subject, `(No Subject)` when absent.
    pub subject: String,
    /// Sender.
    pub from: EmailAddress,
    /// Primary recipients.
    pub to: Vec<EmailAddress>,
    /// Carbon-copy recipients.
    pub cc: Vec<EmailAddress>,
    /// Blind carbon-copy recipients, when the server reveals them.
    pub bcc: Vec<EmailAddress>,
    /// Sent date.
    pub date: DateTime<Utc>,
    /// Plain-text body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// HTML body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Attached files.
    pub attachments: Vec<Attachment>,
    /// Raw server flags such as `\Seen`.
    pub flags: Vec<String>,
    /// `\Seen` is set.
    pub is_read: bool,
    /// `\Flagged` is set.
    pub is_flagged: bool,
    /// `\Answered` is set.
    pub is_answered: bool,
    /// `\Deleted` is set.
    pub is_deleted: bool,
}

/// One folder of the mailbox hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    /// Leaf name.
    pub name: String,
    /// Full path, ancestors joined by `delimiter`.
    pub path: String,
    /// Hierarchy delimiter.
    pub delimiter: String,
    /// Every LIST attribute, e.g. `\HasChildren`, `\Noselect`.
    pub attributes: Vec<String>,
    /// Special-use markers, e.g. `\Sent`, `\Trash`.
    pub flags: Vec<String>,
}

impl MailFolder {
    /// Whether the folder can be opened.
    #[must_use]
    pub fn is_selectable(&self) -> bool {
        !self
            .attributes
            .iter()
            .any(|a| a.eq_ignore_ascii_case("\\Noselect"))
    }
}

/// What to fetch.
///
/// `limit` and `offset` slice the matches after they are sorted newest
/// first. `since` is also accepted as `startDate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchOptions {
    /// Folder path.
    pub folder: String,
    /// Maximum number of messages; all when `None`.
    pub limit: Option<usize>,
    /// Messages to skip.
    pub offset: usize,
    /// Only messages without `\Seen`.
    pub unread_only: bool,
    /// Text matched against subject, sender and recipients.
    pub search: Option<String>,
    /// Only messages on or after this date.
    #[serde(alias = "startDate")]
    pub since: Option<NaiveDate>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            folder: DEFAULT_FOLDER.to_string(),
            limit: None,
            offset: 0,
            unread_only: false,
            search: None,
            since: None,
        }
    }
}

impl FetchOptions {
    /// Options for one folder with everything else defaulted.
    #[must_use]
    pub fn folder(folder: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            ..Self::default()
        }
    }

    /// The search text, if any is left after trimming.
    #[must_use]
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
    }

    /// Applies `offset` and `limit` to a sorted list.
    #[must_use]
    pub fn paginate<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if self.offset >= items.len() {
            return Vec::new();
        }
        let mut page = items.split_off(self.offset);
        if let Some(limit) = self.limit {
            page.truncate(limit);
        }
        page
    }
}

/// Where the client connects, without the secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Login name.
    pub username: String,
}

/// Lifecycle of the client's single session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No session.
    #[default]
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// Logged in.
    Connected,
}
