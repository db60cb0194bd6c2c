//! # mailboard-core
//!
//! Mailbox access for the mailboard dashboard.
//!
//! This crate provides:
//! - [`MailboxClient`]: one lazily opened IMAP session with on-demand
//!   reconnection
//! - Message parsing from FETCH responses into [`MailMessage`] records
//! - [`MailService`]: a facade answering every call with an [`Envelope`]
//! - [`Cache`] and [`MailFeed`]: a TTL cache and the read-through layer
//!   that serves stale data when the server is unreachable
//! - [`assistant`]: important messages and next steps picked from subjects
//!
//! ```no_run
//! use mailboard_core::{Cache, FetchOptions, MailConfig, MailFeed, MailService};
//!
//! # async fn run() -> mailboard_core::Result<()> {
//! let config = MailConfig::from_env()?;
//! let feed = MailFeed::new(MailService::from_config(&config), Cache::in_memory());
//!
//! let page = feed.emails(&FetchOptions::default()).await;
//! println!("{} messages", page.data.total);
//!
//! feed.service().disconnect().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod assistant;
pub mod cache;
pub mod client;
pub mod config;
pub mod connector;
mod error;
pub mod feed;
pub mod folders;
pub mod model;
pub mod parser;
pub mod service;

pub use assistant::{ImportantEmail, SuggestedNextStep, Suggestions};
pub use cache::{Cache, CacheEntry, CacheStorage, Clock, FileStorage, ManualClock, MemoryStorage};
pub use client::MailboxClient;
pub use config::MailConfig;
pub use connector::{Connect, ImapConnector};
pub use error::{MailError, ParseError, Result, StorageError};
pub use feed::{FeedResponse, MailFeed, Origin};
pub use model::{
    Attachment, ConnectionState, EmailAddress, FetchOptions, MailFolder, MailMessage, ServerInfo,
};
pub use service::{ConnectionStatus, EmailsPage, Envelope, FolderList, MailService};
