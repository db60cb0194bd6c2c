//! # mailboard-imap
//!
//! Async IMAP4rev1 client covering what a read-mostly mail dashboard needs:
//! LOGIN, LIST, SELECT/EXAMINE, UID SEARCH, UID FETCH and UID STORE.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailboard_imap::{Client, Config, FetchAttribute, SearchCriteria, UidSet};
//!
//! #[tokio::main]
//! async fn main() -> mailboard_imap::Result<()> {
//!     let config = Config::new("imap.example.com");
//!     let stream = mailboard_imap::connection::connect(&config).await?;
//!     let client = Client::from_stream(stream)
//!         .await?
//!         .with_timeout(config.io_timeout);
//!
//!     let mut client = client.login("user@example.com", "password").await?;
//!     for folder in client.list("", "*").await? {
//!         println!("{}", folder.name);
//!     }
//!
//!     let mut inbox = client.examine("INBOX").await?;
//!     let uids = inbox.uid_search(SearchCriteria::Unseen).await?;
//!     let messages = inbox
//!         .uid_fetch(&UidSet::from_uids(uids), vec![FetchAttribute::Envelope])
//!         .await?;
//!     println!("{} unread", messages.len());
//!
//!     inbox.logout().await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! NotAuthenticated ── login() ──→ Authenticated ── select()/examine() ──→ Selected
//!                                       ↑                                    │
//!                                       └──── OpenError::Rejected ◄──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`]: command builders and serialization
//! - [`connection`]: transport, framing and the type-state client
//! - [`parser`]: sans-I/O response parser
//! - [`types`]: flags, UIDs, mailbox attributes and status codes

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use command::{Command, FetchAttribute, SearchCriteria, Secret, StoreAction, TagGenerator};
pub use connection::{
    Authenticated, Client, Config, ConfigBuilder, FetchOutcome, FramedStream, ImapStream,
    NotAuthenticated, OpenError, Security, Selected,
};
pub use error::{Error, Result};
pub use parser::{Address, Envelope, FetchItem, Response, UntaggedResponse};
pub use types::{
    Flag, Flags, ListResponse, MailboxAttribute, MailboxStatus, ResponseCode, SeqNum, Status, Tag,
    Uid, UidSet, UidValidity,
};
