//! RFC 5322 address lists.

use std::fmt;

use crate::encoding::decode_rfc2047;

/// One mailbox from an address header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    /// Display name, decoded.
    pub name: Option<String>,
    /// `local@domain`.
    pub email: String,
}

impl Address {
    /// Local part of the address.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.email
            .split_once('@')
            .map_or(self.email.as_str(), |(local, _)| local)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{name} <{}>", self.email),
            None => f.write_str(&self.email),
        }
    }
}

/// Parses an address header value.
///
/// Handles `Name <a@b>`, `"Quoted, Name" <a@b>`, bare `a@b`, `a@b (Name)`
/// and groups (`Team: a@b, c@d;`), which are flattened into their members.
/// Entries without an address are dropped.
#[must_use]
pub fn parse_address_list(value: &str) -> Vec<Address> {
    split_top_level(value)
        .iter()
        .filter_map(|item| parse_mailbox(item))
        .collect()
}

/// Splits on `,` and `;` outside quotes, angle brackets and comments,
/// discarding group names.
fn split_top_level(value: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut in_angle = false;
    let mut comment_depth = 0_u32;
    let mut escaped = false;

    for ch in value.chars() {
        if escaped {
            current.push(ch);
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_quotes || comment_depth > 0 => {
                current.push(ch);
                escaped = true;
            }
            '"' if comment_depth == 0 => {
                in_quotes = !in_quotes;
                current.push(ch);
            }
            '(' if !in_quotes => {
                comment_depth += 1;
                current.push(ch);
            }
            ')' if !in_quotes && comment_depth > 0 => {
                comment_depth -= 1;
                current.push(ch);
            }
            '<' if !in_quotes && comment_depth == 0 => {
                in_angle = true;
                current.push(ch);
            }
            '>' if !in_quotes && comment_depth == 0 => {
                in_angle = false;
                current.push(ch);
            }
            // Group display name: everything so far in this item.
            ':' if !in_quotes && !in_angle && comment_depth == 0 => current.clear(),
            ',' | ';' if !in_quotes && !in_angle && comment_depth == 0 => {
                items.push(std::mem::take(&mut current));
            }
            _ => current.push(ch),
        }
    }
    items.push(current);

    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn parse_mailbox(item: &str) -> Option<Address> {
    if let Some(open) = item.rfind('<') {
        let close = item[open..].find('>').map_or(item.len(), |i| open + i);
        let email = item[open + 1..close].trim();
        if email.is_empty() {
            return None;
        }
        let name = clean_display_name(&item[..open]);
        return Some(Address {
            name,
            email: email.to_string(),
        });
    }

    let (bare, comment) = split_comment(item);
    let email = bare.trim().trim_matches('"');
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(Address {
        name: comment.and_then(|c| clean_display_name(&c)),
        email: email.to_string(),
    })
}

/// Splits `a@b (Name)` into the address and the comment text.
fn split_comment(item: &str) -> (String, Option<String>) {
    let Some(open) = item.find('(') else {
        return (item.to_string(), None);
    };
    let close = item.rfind(')').filter(|c| *c > open).unwrap_or(item.len());
    let comment = item[open + 1..close].to_string();
    let mut rest = item[..open].to_string();
    if close < item.len() {
        rest.push_str(&item[close + 1..]);
    }
    (rest, Some(comment))
}

fn clean_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        unescape(&trimmed[1..trimmed.len() - 1])
    } else {
        trimmed.to_string()
    };

    let decoded = decode_rfc2047(&unquoted);
    let decoded = decoded.trim();
    (!decoded.is_empty()).then(|| decoded.to_string())
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}
