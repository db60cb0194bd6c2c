//! Command serialization helpers.

use chrono::NaiveDate;

use super::types::{FetchAttribute, SearchCriteria, StoreAction};
use crate::error::{Error, Result};

/// Writes an astring, quoting it when it is empty or contains atom-specials.
///
/// CR, LF and NUL cannot appear in a quoted string; an argument holding one
/// is refused rather than allowed to end the command line early.
pub fn write_astring(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    if let Some(b) = s.bytes().find(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(Error::InvalidArgument(format!(
            "argument contains forbidden byte 0x{b:02X}"
        )));
    }

    if !s.is_empty() && !s.bytes().any(needs_quoting) {
        buf.extend_from_slice(s.as_bytes());
        return Ok(());
    }

    buf.push(b'"');
    for b in s.bytes() {
        if matches!(b, b'"' | b'\\') {
            buf.push(b'\\');
        }
        buf.push(b);
    }
    buf.push(b'"');
    Ok(())
}

/// Returns true if the byte cannot appear in an atom.
const fn needs_quoting(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'"' | b'\\' | b'(' | b')' | b'{' | b'}' | b'%' | b'*' | b']'
    ) || b < 0x20
        || b >= 0x7F
}

/// Formats a date as IMAP `date-text` (`d-Mon-yyyy`).
#[must_use]
pub fn imap_date(date: NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

/// Writes a parenthesized FETCH attribute list.
pub fn write_fetch_attributes(buf: &mut Vec<u8>, attrs: &[FetchAttribute]) {
    buf.push(b'(');
    for (i, attr) in attrs.iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        match attr {
            FetchAttribute::Flags => buf.extend_from_slice(b"FLAGS"),
            FetchAttribute::Uid => buf.extend_from_slice(b"UID"),
            FetchAttribute::InternalDate => buf.extend_from_slice(b"INTERNALDATE"),
            FetchAttribute::Rfc822Size => buf.extend_from_slice(b"RFC822.SIZE"),
            FetchAttribute::Envelope => buf.extend_from_slice(b"ENVELOPE"),
            FetchAttribute::Body { section, peek } => {
                buf.extend_from_slice(if *peek { b"BODY.PEEK[" } else { b"BODY[" });
                if let Some(section) = section {
                    buf.extend_from_slice(section.as_bytes());
                }
                buf.push(b']');
            }
        }
    }
    buf.push(b')');
}

/// Writes the data item and flag list of a STORE.
pub fn write_store_action(buf: &mut Vec<u8>, action: &StoreAction) {
    let item: &[u8] = match action {
        StoreAction::Add(_) => b"+FLAGS",
        StoreAction::Remove(_) => b"-FLAGS",
        StoreAction::Replace(_) => b"FLAGS",
    };
    buf.extend_from_slice(item);
    buf.extend_from_slice(b" (");
    for (i, flag) in action.flags().iter().enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(flag.as_str().as_bytes());
    }
    buf.push(b')');
}

/// Writes a search key.
pub fn write_search_criteria(buf: &mut Vec<u8>, criteria: &SearchCriteria) -> Result<()> {
    match criteria {
        SearchCriteria::All => buf.extend_from_slice(b"ALL"),
        SearchCriteria::Unseen => buf.extend_from_slice(b"UNSEEN"),
        SearchCriteria::Seen => buf.extend_from_slice(b"SEEN"),
        SearchCriteria::Deleted => buf.extend_from_slice(b"DELETED"),
        SearchCriteria::Since(date) => {
            buf.extend_from_slice(b"SINCE ");
            buf.extend_from_slice(imap_date(*date).as_bytes());
        }
        SearchCriteria::Before(date) => {
            buf.extend_from_slice(b"BEFORE ");
            buf.extend_from_slice(imap_date(*date).as_bytes());
        }
        SearchCriteria::Subject(s) => write_keyed(buf, b"SUBJECT ", s)?,
        SearchCriteria::From(s) => write_keyed(buf, b"FROM ", s)?,
        SearchCriteria::To(s) => write_keyed(buf, b"TO ", s)?,
        SearchCriteria::Text(s) => write_keyed(buf, b"TEXT ", s)?,
        SearchCriteria::Not(inner) => {
            buf.extend_from_slice(b"NOT ");
            write_search_criteria(buf, inner)?;
        }
        SearchCriteria::Or(a, b) => {
            buf.extend_from_slice(b"OR ");
            write_search_operand(buf, a)?;
            buf.push(b' ');
            write_search_operand(buf, b)?;
        }
        SearchCriteria::And(keys) => {
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    buf.push(b' ');
                }
                write_search_criteria(buf, key)?;
            }
        }
    }
    Ok(())
}

/// Writes an OR/NOT operand; a multi-key conjunction needs parentheses there.
fn write_search_operand(buf: &mut Vec<u8>, criteria: &SearchCriteria) -> Result<()> {
    if let SearchCriteria::And(keys) = criteria
        && keys.len() > 1
    {
        buf.push(b'(');
        write_search_criteria(buf, criteria)?;
        buf.push(b')');
        Ok(())
    } else {
        write_search_criteria(buf, criteria)
    }
}

fn write_keyed(buf: &mut Vec<u8>, key: &[u8], value: &str) -> Result<()> {
    buf.extend_from_slice(key);
    write_astring(buf, value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn astring(s: &str) -> String {
        let mut buf = Vec::new();
        write_astring(&mut buf, s).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_astring_atom() {
        assert_eq!(astring("INBOX"), "INBOX");
        assert_eq!(astring("user@example.com"), "user@example.com");
    }

    #[test]
    fn test_astring_quoted() {
        assert_eq!(astring(""), "\"\"");
        assert_eq!(astring("Sent Items"), "\"Sent Items\"");
        assert_eq!(astring("pa\"ss\\word"), "\"pa\\\"ss\\\\word\"");
    }

    #[test]
    fn test_imap_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(imap_date(date), "5-Mar-2024");
    }

    #[test]
    fn test_search_or_with_conjunction_operand() {
        let criteria = SearchCriteria::Or(
            Box::new(SearchCriteria::And(vec![
                SearchCriteria::Unseen,
                SearchCriteria::Subject("x".into()),
            ])),
            Box::new(SearchCriteria::To("y".into())),
        );
        let mut buf = Vec::new();
        write_search_criteria(&mut buf, &criteria).unwrap();
        assert_eq!(buf, b"OR (UNSEEN SUBJECT x) TO y");
    }

    #[test]
    fn test_astring_refuses_line_breaks() {
        for value in ["x\r\nA0099 LOGOUT", "line\nbreak", "nul\0byte"] {
            let mut buf = Vec::new();
            let err = write_astring(&mut buf, value).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)));
        }
    }

    #[test]
    fn test_search_refuses_nested_line_break() {
        let criteria = SearchCriteria::Or(
            Box::new(SearchCriteria::Subject("ok".into())),
            Box::new(SearchCriteria::Not(Box::new(SearchCriteria::From(
                "x\r\nA0099 UID STORE 1:* +FLAGS (\\Deleted)".into(),
            )))),
        );
        let mut buf = Vec::new();
        assert!(write_search_criteria(&mut buf, &criteria).is_err());
    }

    #[test]
    fn test_store_action() {
        let mut buf = Vec::new();
        write_store_action(
            &mut buf,
            &StoreAction::Remove(vec![crate::types::Flag::Seen]),
        );
        assert_eq!(buf, b"-FLAGS (\\Seen)");
    }

    proptest! {
        #[test]
        fn prop_quoted_astring_round_trips(s in "[ -~]{0,40}") {
            let written = astring(&s);
            let unquoted = if written.starts_with('"') {
                let inner = &written[1..written.len() - 1];
                inner.replace("\\\"", "\"").replace("\\\\", "\\")
            } else {
                written.clone()
            };
            prop_assert_eq!(unquoted, s);
        }
    }
}
