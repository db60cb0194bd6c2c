//! Connection state markers.

use crate::types::MailboxStatus;

/// Greeting received, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is open.
#[derive(Debug, Clone)]
pub struct Selected {
    mailbox: String,
    status: MailboxStatus,
}

impl Selected {
    pub(super) fn new(mailbox: &str, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.to_string(),
            status,
        }
    }

    /// Name of the open mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// True when opened with EXAMINE or the server forced `[READ-ONLY]`.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.status.read_only
    }

    /// Snapshot taken when the mailbox was opened.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }
}
