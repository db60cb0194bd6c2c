//! Command argument types.

use chrono::NaiveDate;

use crate::types::Flag;

/// A message attribute requested by UID FETCH.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchAttribute {
    /// `FLAGS`
    Flags,
    /// `UID`
    Uid,
    /// `INTERNALDATE`
    InternalDate,
    /// `RFC822.SIZE`
    Rfc822Size,
    /// `ENVELOPE`
    Envelope,
    /// `BODY[section]` or `BODY.PEEK[section]`; an empty section is the
    /// whole message.
    Body {
        /// Section specifier, e.g. `HEADER` or `1.2`.
        section: Option<String>,
        /// Use `.PEEK` so the fetch does not set `\Seen`.
        peek: bool,
    },
}

impl FetchAttribute {
    /// The full RFC 5322 message without touching `\Seen`.
    #[must_use]
    pub const fn full_message() -> Self {
        Self::Body {
            section: None,
            peek: true,
        }
    }
}

/// Flag modification performed by UID STORE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// `+FLAGS (...)`
    Add(Vec<Flag>),
    /// `-FLAGS (...)`
    Remove(Vec<Flag>),
    /// `FLAGS (...)`
    Replace(Vec<Flag>),
}

impl StoreAction {
    /// Returns the flags carried by the action.
    #[must_use]
    pub fn flags(&self) -> &[Flag] {
        match self {
            Self::Add(flags) | Self::Remove(flags) | Self::Replace(flags) => flags,
        }
    }
}

/// SEARCH criteria (RFC 3501 section 6.4.4).
///
/// `And` is the implicit conjunction of a space-separated key list; `Or`
/// takes exactly two operands, so wider disjunctions nest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchCriteria {
    /// `ALL`
    All,
    /// `UNSEEN`
    Unseen,
    /// `SEEN`
    Seen,
    /// `DELETED`
    Deleted,
    /// `SINCE d-Mon-yyyy` (internal date on or after).
    Since(NaiveDate),
    /// `BEFORE d-Mon-yyyy`
    Before(NaiveDate),
    /// `SUBJECT string`
    Subject(String),
    /// `FROM string`
    From(String),
    /// `TO string`
    To(String),
    /// `TEXT string`
    Text(String),
    /// `NOT key`
    Not(Box<Self>),
    /// `OR key1 key2`
    Or(Box<Self>, Box<Self>),
    /// Every key must match.
    And(Vec<Self>),
}

impl SearchCriteria {
    /// Builds a left-nested OR over all operands.
    ///
    /// Returns `None` for an empty input and the sole operand for a single one.
    #[must_use]
    pub fn any_of(operands: Vec<Self>) -> Option<Self> {
        operands
            .into_iter()
            .reduce(|acc, next| Self::Or(Box::new(acc), Box::new(next)))
    }

    /// Returns true if any string argument contains non-ASCII text.
    #[must_use]
    pub fn needs_utf8(&self) -> bool {
        match self {
            Self::Subject(s) | Self::From(s) | Self::To(s) | Self::Text(s) => !s.is_ascii(),
            Self::Not(inner) => inner.needs_utf8(),
            Self::Or(a, b) => a.needs_utf8() || b.needs_utf8(),
            Self::And(keys) => keys.iter().any(Self::needs_utf8),
            Self::All | Self::Unseen | Self::Seen | Self::Deleted | Self::Since(_) | Self::Before(_) => {
                false
            }
        }
    }
}
