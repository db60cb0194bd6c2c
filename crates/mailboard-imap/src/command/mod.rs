//! IMAP command builder.
//!
//! Only the commands mailboard issues are modelled. Every command serializes
//! to a single CRLF-terminated line; arguments that cannot be atoms are sent
//! as quoted strings, never as literals, so an argument with a line break or
//! NUL fails to serialize.

mod serialize;
mod tag_generator;
mod types;

use std::fmt;

use crate::error::{Error, Result};
use crate::types::UidSet;

pub use serialize::imap_date;
pub use tag_generator::TagGenerator;
pub use types::{FetchAttribute, SearchCriteria, StoreAction};

use serialize::{write_astring, write_fetch_attributes, write_search_criteria, write_store_action};

/// A secret command argument that is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wraps a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the secret text.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// IMAP command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `CAPABILITY`
    Capability,
    /// `NOOP`
    Noop,
    /// `LOGOUT`
    Logout,
    /// `LOGIN user password`
    Login {
        /// Account name.
        username: String,
        /// Account secret.
        password: Secret,
    },
    /// `LIST reference pattern`
    List {
        /// Reference name, usually empty.
        reference: String,
        /// Mailbox pattern with `*`/`%` wildcards.
        pattern: String,
    },
    /// `SELECT mailbox` (read-write).
    Select {
        /// Mailbox name.
        mailbox: String,
    },
    /// `EXAMINE mailbox` (read-only).
    Examine {
        /// Mailbox name.
        mailbox: String,
    },
    /// `UID SEARCH criteria`
    UidSearch {
        /// Search key.
        criteria: SearchCriteria,
    },
    /// `UID FETCH uids (items)`
    UidFetch {
        /// Target UIDs.
        uids: UidSet,
        /// Requested attributes.
        items: Vec<FetchAttribute>,
    },
    /// `UID STORE uids action`
    UidStore {
        /// Target UIDs.
        uids: UidSet,
        /// Flag change.
        action: StoreAction,
    },
}

impl Command {
    /// Returns the command keyword, for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Capability => "CAPABILITY",
            Self::Noop => "NOOP",
            Self::Logout => "LOGOUT",
            Self::Login { .. } => "LOGIN",
            Self::List { .. } => "LIST",
            Self::Select { .. } => "SELECT",
            Self::Examine { .. } => "EXAMINE",
            Self::UidSearch { .. } => "UID SEARCH",
            Self::UidFetch { .. } => "UID FETCH",
            Self::UidStore { .. } => "UID STORE",
        }
    }

    /// Serializes the command with the given tag, including the trailing CRLF.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if an argument contains CR, LF or NUL.
    pub fn serialize(&self, tag: &str) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(tag.as_bytes());
        buf.push(b' ');
        buf.extend_from_slice(self.name().as_bytes());

        match self {
            Self::Capability | Self::Noop | Self::Logout => {}
            Self::Login { username, password } => {
                buf.push(b' ');
                write_astring(&mut buf, username)?;
                buf.push(b' ');
                write_astring(&mut buf, password.expose())?;
            }
            Self::List { reference, pattern } => {
                buf.push(b' ');
                write_astring(&mut buf, reference)?;
                buf.push(b' ');
                // Wildcards must stay bare; only quote when whitespace forces it.
                if pattern.contains(' ') || pattern.is_empty() {
                    write_astring(&mut buf, pattern)?;
                } else if pattern.bytes().any(|b| b < 0x20) {
                    return Err(Error::InvalidArgument(
                        "LIST pattern contains a control character".to_string(),
                    ));
                } else {
                    buf.extend_from_slice(pattern.as_bytes());
                }
            }
            Self::Select { mailbox } | Self::Examine { mailbox } => {
                buf.push(b' ');
                write_astring(&mut buf, mailbox)?;
            }
            Self::UidSearch { criteria } => {
                buf.push(b' ');
                if criteria.needs_utf8() {
                    buf.extend_from_slice(b"CHARSET UTF-8 ");
                }
                write_search_criteria(&mut buf, criteria)?;
            }
            Self::UidFetch { uids, items } => {
                buf.push(b' ');
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_fetch_attributes(&mut buf, items);
            }
            Self::UidStore { uids, action } => {
                buf.push(b' ');
                buf.extend_from_slice(uids.to_string().as_bytes());
                buf.push(b' ');
                write_store_action(&mut buf, action);
            }
        }

        buf.extend_from_slice(b"\r\n");
        Ok(buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::types::{Flag, Uid};

    fn wire(cmd: &Command) -> String {
        String::from_utf8(cmd.serialize("A0001").unwrap()).unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(wire(&Command::Capability), "A0001 CAPABILITY\r\n");
        assert_eq!(wire(&Command::Noop), "A0001 NOOP\r\n");
        assert_eq!(wire(&Command::Logout), "A0001 LOGOUT\r\n");
    }

    #[test]
    fn test_login_quotes_password() {
        let cmd = Command::Login {
            username: "jane@example.com".into(),
            password: Secret::new("s3cret pass"),
        };
        assert_eq!(wire(&cmd), "A0001 LOGIN jane@example.com \"s3cret pass\"\r\n");
        assert!(!format!("{cmd:?}").contains("s3cret"));
    }

    #[test]
    fn test_list_keeps_wildcard_bare() {
        let cmd = Command::List {
            reference: String::new(),
            pattern: "*".into(),
        };
        assert_eq!(wire(&cmd), "A0001 LIST \"\" *\r\n");
    }

    #[test]
    fn test_examine_quotes_mailbox() {
        let cmd = Command::Examine {
            mailbox: "Sent Items".into(),
        };
        assert_eq!(wire(&cmd), "A0001 EXAMINE \"Sent Items\"\r\n");
    }

    #[test]
    fn test_uid_search_full_criteria() {
        let text = "invoice";
        let criteria = SearchCriteria::And(vec![
            SearchCriteria::All,
            SearchCriteria::Unseen,
            SearchCriteria::Since(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()),
            SearchCriteria::any_of(vec![
                SearchCriteria::Subject(text.into()),
                SearchCriteria::From(text.into()),
                SearchCriteria::To(text.into()),
            ])
            .unwrap(),
        ]);
        assert_eq!(
            wire(&Command::UidSearch { criteria }),
            "A0001 UID SEARCH ALL UNSEEN SINCE 15-Jan-2024 OR OR SUBJECT invoice FROM invoice TO invoice\r\n"
        );
    }

    #[test]
    fn test_uid_search_utf8_charset() {
        let cmd = Command::UidSearch {
            criteria: SearchCriteria::Subject("Grüße".into()),
        };
        assert!(wire(&cmd).starts_with("A0001 UID SEARCH CHARSET UTF-8 SUBJECT"));
    }

    #[test]
    fn test_line_break_in_argument_is_refused() {
        let search = Command::UidSearch {
            criteria: SearchCriteria::And(vec![
                SearchCriteria::All,
                SearchCriteria::Subject("x\r\nA0099 UID STORE 1:* +FLAGS (\\Deleted)".into()),
            ]),
        };
        assert!(matches!(
            search.serialize("A0003"),
            Err(Error::InvalidArgument(_))
        ));

        let select = Command::Select {
            mailbox: "INBOX\r\nA0099 LOGOUT".into(),
        };
        assert!(select.serialize("A0004").is_err());

        let login = Command::Login {
            username: "jane\n".into(),
            password: Secret::new("pw"),
        };
        assert!(login.serialize("A0005").is_err());
    }

    #[test]
    fn test_uid_fetch() {
        let uids = UidSet::from_uids([1, 2, 3, 9].map(|n| Uid::new(n).unwrap()));
        let cmd = Command::UidFetch {
            uids,
            items: vec![
                FetchAttribute::Uid,
                FetchAttribute::Flags,
                FetchAttribute::full_message(),
            ],
        };
        assert_eq!(
            wire(&cmd),
            "A0001 UID FETCH 1:3,9 (UID FLAGS BODY.PEEK[])\r\n"
        );
    }

    #[test]
    fn test_uid_store() {
        let cmd = Command::UidStore {
            uids: UidSet::single(Uid::new(42).unwrap()),
            action: StoreAction::Add(vec![Flag::Deleted]),
        };
        assert_eq!(wire(&cmd), "A0001 UID STORE 42 +FLAGS (\\Deleted)\r\n");
    }
}
