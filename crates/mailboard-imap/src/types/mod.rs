//! Core IMAP types.
//!
//! Flags, identifiers, mailbox listings and status codes shared by the
//! command serializer, the response parser and the client.

mod flags;
mod identifiers;
mod mailbox;
mod response_code;
mod sequence;

pub use flags::{Flag, Flags};
pub use identifiers::{SeqNum, Tag, Uid, UidValidity};
pub use mailbox::{ListResponse, MailboxAttribute, MailboxStatus};
pub use response_code::{ResponseCode, Status};
pub use sequence::UidSet;
