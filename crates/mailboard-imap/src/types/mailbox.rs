//! Mailbox listing and selection types.

use super::{Flags, Uid, UidValidity};

/// One `* LIST` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListResponse {
    /// Name attributes such as `\HasChildren` or `\Noselect`.
    pub attributes: Vec<MailboxAttribute>,
    /// Hierarchy delimiter; `None` when the server sent NIL (flat namespace).
    pub delimiter: Option<char>,
    /// Full mailbox name as sent by the server.
    pub name: String,
}

/// Mailbox name attribute from a LIST reply (RFC 3501, RFC 5258, RFC 6154).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MailboxAttribute {
    /// `\Noselect`
    NoSelect,
    /// `\Noinferiors`
    NoInferiors,
    /// `\HasChildren`
    HasChildren,
    /// `\HasNoChildren`
    HasNoChildren,
    /// `\Marked`
    Marked,
    /// `\Unmarked`
    Unmarked,
    /// `\All` special-use.
    All,
    /// `\Archive` special-use.
    Archive,
    /// `\Drafts` special-use.
    Drafts,
    /// `\Flagged` special-use.
    Flagged,
    /// `\Junk` special-use.
    Junk,
    /// `\Sent` special-use.
    Sent,
    /// `\Trash` special-use.
    Trash,
    /// Anything else, kept verbatim.
    Other(String),
}

impl MailboxAttribute {
    /// Parses an attribute case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "\\noselect" | "\\nonexistent" => Self::NoSelect,
            "\\noinferiors" => Self::NoInferiors,
            "\\haschildren" => Self::HasChildren,
            "\\hasnochildren" => Self::HasNoChildren,
            "\\marked" => Self::Marked,
            "\\unmarked" => Self::Unmarked,
            "\\all" => Self::All,
            "\\archive" => Self::Archive,
            "\\drafts" => Self::Drafts,
            "\\flagged" => Self::Flagged,
            "\\junk" => Self::Junk,
            "\\sent" => Self::Sent,
            "\\trash" => Self::Trash,
            _ => Self::Other(s.to_string()),
        }
    }

    /// Returns the canonical wire form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NoSelect => "\\Noselect",
            Self::NoInferiors => "\\Noinferiors",
            Self::HasChildren => "\\HasChildren",
            Self::HasNoChildren => "\\HasNoChildren",
            Self::Marked => "\\Marked",
            Self::Unmarked => "\\Unmarked",
            Self::All => "\\All",
            Self::Archive => "\\Archive",
            Self::Drafts => "\\Drafts",
            Self::Flagged => "\\Flagged",
            Self::Junk => "\\Junk",
            Self::Sent => "\\Sent",
            Self::Trash => "\\Trash",
            Self::Other(s) => s,
        }
    }

    /// Returns true for RFC 6154 special-use attributes.
    #[must_use]
    pub const fn is_special_use(&self) -> bool {
        matches!(
            self,
            Self::All
                | Self::Archive
                | Self::Drafts
                | Self::Flagged
                | Self::Junk
                | Self::Sent
                | Self::Trash
        )
    }
}

/// Mailbox state reported by SELECT/EXAMINE.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailboxStatus {
    /// Number of messages (`* n EXISTS`).
    pub exists: u32,
    /// Number of recent messages (`* n RECENT`).
    pub recent: u32,
    /// Flags applicable in this mailbox.
    pub flags: Flags,
    /// `[UIDVALIDITY n]`
    pub uid_validity: Option<UidValidity>,
    /// `[UIDNEXT n]`
    pub uid_next: Option<Uid>,
    /// Set when the server answered `[READ-ONLY]`.
    pub read_only: bool,
}
