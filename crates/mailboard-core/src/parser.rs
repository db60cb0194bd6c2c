//! Turns one FETCH response into a [`MailMessage`].
//!
//! Parsing is pure. Fields are taken from the server's ENVELOPE when
//! present and from the message headers otherwise; the body always comes
//! from the raw RFC 5322 payload. Only a missing payload or a broken MIME
//! structure fails. Everything else degrades to defaults.

use chrono::{DateTime, FixedOffset, Utc};
use mailboard_imap::{Envelope, FetchItem};
use mailboard_mime::{Message, Part, TransferEncoding, decode_charset, decode_rfc2047, parse_date};

use crate::error::ParseError;
use crate::model::{Attachment, EmailAddress, MailMessage};

/// Address used when a message names no usable sender.
pub const UNKNOWN_ADDRESS: &str = "unknown@example.com";
/// Display name used when nothing better is known.
pub const UNKNOWN_NAME: &str = "Unknown";
/// Subject for messages without one.
pub const NO_SUBJECT: &str = "(No Subject)";
/// Subject of the record that stands in for an unparseable message.
pub const PLACEHOLDER_SUBJECT: &str = "Error parsing email";

const PREVIEW_CHARS: usize = 200;

/// An address as it arrives from the server: either a bare string or a
/// structured ENVELOPE-style record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderValue {
    /// A bare `local@domain`.
    Text(String),
    /// Name plus either a full address or a mailbox/host pair.
    Structured {
        /// Display name.
        name: Option<String>,
        /// Full address.
        address: Option<String>,
        /// Local part.
        mailbox: Option<String>,
        /// Domain.
        host: Option<String>,
    },
}

impl HeaderValue {
    /// Resolves to an address and display name.
    ///
    /// The address is the explicit one, else `mailbox@host`, else
    /// [`UNKNOWN_ADDRESS`]. The name is the display name, else the mailbox,
    /// else the local part, else [`UNKNOWN_NAME`].
    #[must_use]
    pub fn to_email_address(&self) -> EmailAddress {
        match self {
            Self::Text(text) => {
                let address = text.trim();
                if address.is_empty() {
                    return EmailAddress::new(UNKNOWN_ADDRESS, Some(UNKNOWN_NAME.to_string()));
                }
                EmailAddress::new(address, Some(local_part(address).to_string()))
            }
            Self::Structured {
                name,
                address,
                mailbox,
                host,
            } => {
                let resolved = non_empty(address.as_deref()).map(String::from).or_else(|| {
                    match (non_empty(mailbox.as_deref()), non_empty(host.as_deref())) {
                        (Some(mailbox), Some(host)) => Some(format!("{mailbox}@{host}")),
                        _ => None,
                    }
                });

                let display = non_empty(name.as_deref())
                    .or_else(|| non_empty(mailbox.as_deref()))
                    .map(String::from)
                    .or_else(|| resolved.as_deref().map(|a| local_part(a).to_string()))
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string());

                EmailAddress::new(
                    resolved.unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
                    Some(display),
                )
            }
        }
    }
}

impl From<&mailboard_imap::Address> for HeaderValue {
    fn from(address: &mailboard_imap::Address) -> Self {
        Self::Structured {
            name: address.name.as_deref().map(decode_rfc2047),
            address: None,
            mailbox: address.mailbox.clone(),
            host: address.host.clone(),
        }
    }
}

impl From<&mailboard_mime::Address> for HeaderValue {
    fn from(address: &mailboard_mime::Address) -> Self {
        match &address.name {
            Some(name) => Self::Structured {
                name: Some(name.clone()),
                address: Some(address.email.clone()),
                mailbox: None,
                host: None,
            },
            None => Self::Text(address.email.clone()),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn local_part(address: &str) -> &str {
    address.split_once('@').map_or(address, |(local, _)| local)
}

/// Header fields needed for a message record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEnvelope {
    /// Raw `Date` value.
    pub date: Option<String>,
    /// Decoded subject.
    pub subject: Option<String>,
    /// Senders.
    pub from: Vec<HeaderValue>,
    /// Primary recipients.
    pub to: Vec<HeaderValue>,
    /// Carbon-copy recipients.
    pub cc: Vec<HeaderValue>,
    /// Blind carbon-copy recipients.
    pub bcc: Vec<HeaderValue>,
    /// `Message-ID` value.
    pub message_id: Option<String>,
}

impl From<&Envelope> for RawEnvelope {
    fn from(envelope: &Envelope) -> Self {
        // Group syntax shows up as entries without a host.
        let addresses = |list: &[mailboard_imap::Address]| -> Vec<HeaderValue> {
            list.iter()
                .filter(|a| a.host.is_some())
                .map(HeaderValue::from)
                .collect()
        };

        Self {
            date: envelope.date.clone(),
            subject: envelope.subject.as_deref().map(decode_rfc2047),
            from: addresses(&envelope.from),
            to: addresses(&envelope.to),
            cc: addresses(&envelope.cc),
            bcc: addresses(&envelope.bcc),
            message_id: envelope.message_id.clone(),
        }
    }
}

impl From<&Message> for RawEnvelope {
    fn from(message: &Message) -> Self {
        let addresses = |list: Vec<mailboard_mime::Address>| -> Vec<HeaderValue> {
            list.iter().map(HeaderValue::from).collect()
        };
        let bcc = message
            .headers()
            .get_all("bcc")
            .flat_map(mailboard_mime::parse_address_list)
            .collect();

        Self {
            date: message.headers().get("date").map(String::from),
            subject: message.subject(),
            from: addresses(message.from()),
            to: addresses(message.to()),
            cc: addresses(message.cc()),
            bcc: addresses(bcc),
            message_id: message.headers().get("message-id").map(String::from),
        }
    }
}

/// The parts of one FETCH response the parser uses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Message sequence number.
    pub seq: u32,
    /// UID, if the server sent one.
    pub uid: Option<u32>,
    /// Raw flags; `None` when the response carried no FLAGS item.
    pub flags: Option<Vec<String>>,
    /// Server arrival time.
    pub internal_date: Option<DateTime<FixedOffset>>,
    /// Size in octets.
    pub size: Option<u32>,
    /// ENVELOPE data.
    pub envelope: Option<RawEnvelope>,
    /// Full RFC 5322 message.
    pub body: Option<Vec<u8>>,
}

impl RawMessage {
    /// Collects the items of one FETCH response.
    #[must_use]
    pub fn from_items(seq: u32, items: &[FetchItem]) -> Self {
        let mut raw = Self {
            seq,
            ..Self::default()
        };

        for item in items {
            match item {
                FetchItem::Uid(uid) => raw.uid = Some(uid.get()),
                FetchItem::Flags(flags) => raw.flags = Some(flags.to_strings()),
                FetchItem::InternalDate(date) => {
                    raw.internal_date = mailboard_imap::parser::parse_internal_date(date);
                }
                FetchItem::Rfc822Size(size) => raw.size = Some(*size),
                FetchItem::Envelope(envelope) => raw.envelope = Some(envelope.as_ref().into()),
                FetchItem::Body {
                    section: None,
                    data,
                } => raw.body.clone_from(data),
                FetchItem::Body { .. } => {}
            }
        }

        raw
    }

    /// UID, falling back to the sequence number.
    #[must_use]
    pub fn uid_or_seq(&self) -> u32 {
        self.uid.unwrap_or(self.seq)
    }
}

/// Builds a message record.
///
/// # Errors
///
/// [`ParseError::MissingPayload`] without a body, [`ParseError::Mime`] when
/// the MIME structure cannot be processed.
pub fn parse_message(raw: &RawMessage) -> Result<MailMessage, ParseError> {
    let payload = raw.body.as_deref().ok_or(ParseError::MissingPayload)?;
    let message = Message::parse(payload)?;
    let envelope = raw
        .envelope
        .clone()
        .unwrap_or_else(|| RawEnvelope::from(&message));

    let subject = envelope
        .subject
        .clone()
        .or_else(|| message.subject())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| NO_SUBJECT.to_string());

    let from = envelope
        .from
        .first()
        .map_or_else(
            || EmailAddress::new(UNKNOWN_ADDRESS, Some(UNKNOWN_NAME.to_string())),
            HeaderValue::to_email_address,
        );

    let id = envelope
        .message_id
        .as_deref()
        .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').trim())
        .filter(|id| !id.is_empty())
        .map_or_else(|| format!("seq-{}", raw.seq), String::from);

    let date = resolve_date(envelope.date.as_deref(), raw.internal_date, raw.seq);
    let (text, html) = extract_bodies(&message);
    let flags = raw.flags.clone().unwrap_or_default();
    let has = |name: &str| flags.iter().any(|f| f.eq_ignore_ascii_case(name));

    Ok(MailMessage {
        id,
        uid: raw.uid_or_seq(),
        subject,
        from,
        to: addresses(&envelope.to),
        cc: addresses(&envelope.cc),
        bcc: addresses(&envelope.bcc),
        date,
        text,
        html,
        attachments: message
            .attachments()
            .into_iter()
            .map(|a| Attachment {
                filename: a.filename,
                content_type: a.content_type,
                size: a.size,
            })
            .collect(),
        is_read: has("\\Seen"),
        is_flagged: has("\\Flagged"),
        is_answered: has("\\Answered"),
        is_deleted: has("\\Deleted"),
        flags,
    })
}

fn addresses(values: &[HeaderValue]) -> Vec<EmailAddress> {
    values.iter().map(HeaderValue::to_email_address).collect()
}

/// Date header, then INTERNALDATE, then now.
fn resolve_date(header: Option<&str>, internal: Option<DateTime<FixedOffset>>, seq: u32) -> DateTime<Utc> {
    if let Some(date) = header.and_then(parse_date) {
        return date.with_timezone(&Utc);
    }
    if let Some(date) = internal {
        tracing::debug!(seq, header = ?header, "using INTERNALDATE for message date");
        return date.with_timezone(&Utc);
    }
    tracing::warn!(seq, header = ?header, "unparseable message date, using current time");
    Utc::now()
}

/// Text and HTML bodies.
///
/// Without an HTML part the text is scrubbed of MIME debris and markup
/// with [`clean_body`].
fn extract_bodies(message: &Message) -> (Option<String>, Option<String>) {
    let html = message
        .html_part()
        .map(Part::decoded_text)
        .filter(|h| !h.trim().is_empty());

    let text = message.text_part().map(|part| {
        let decoded = part_text(part);
        if html.is_some() {
            decoded.trim().to_string()
        } else {
            clean_body(&decoded)
        }
    });

    (text.filter(|t| !t.is_empty()), html)
}

/// Decoded part text, undoing quoted-printable the sender forgot to declare.
fn part_text(part: &Part) -> String {
    let text = part.decoded_text();
    if part.encoding != TransferEncoding::QuotedPrintable && looks_quoted_printable(&text) {
        let raw = part.decode().unwrap_or_else(|_| part.body.clone());
        let bytes = mailboard_mime::decode_quoted_printable(&raw);
        return decode_charset(&bytes, part.content_type.charset());
    }
    text
}

fn looks_quoted_printable(text: &str) -> bool {
    text.contains("=0A") || text.contains("=20")
}

/// Decodes quoted-printable escapes in already-textual content.
#[must_use]
pub fn decode_quoted_printable(text: &str) -> String {
    String::from_utf8_lossy(&mailboard_mime::decode_quoted_printable(text.as_bytes())).into_owned()
}

/// A record standing in for a message that could not be parsed.
#[must_use]
pub fn placeholder(seq: u32, uid: Option<u32>) -> MailMessage {
    MailMessage {
        id: format!("error_{seq}"),
        uid: uid.unwrap_or(seq),
        subject: PLACEHOLDER_SUBJECT.to_string(),
        from: EmailAddress::new("", None),
        to: Vec::new(),
        cc: Vec::new(),
        bcc: Vec::new(),
        date: Utc::now(),
        text: None,
        html: None,
        attachments: Vec::new(),
        flags: Vec::new(),
        is_read: false,
        is_flagged: false,
        is_answered: false,
        is_deleted: false,
    }
}

/// Strips MIME boundary lines, stray part headers and HTML tags, trims
/// every line and drops empty ones.
#[must_use]
pub fn clean_body(body: &str) -> String {
    strip_tags(body)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| !is_mime_debris(line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn is_mime_debris(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    is_boundary_line(line)
        || lower.starts_with("content-type:")
        || lower.starts_with("content-transfer-encoding:")
        || lower.starts_with("charset=")
        || lower.starts_with("meta http-equiv=")
}

fn is_boundary_line(line: &str) -> bool {
    let Some(rest) = line.strip_prefix("--") else {
        return false;
    };
    let rest = rest.strip_suffix("--").unwrap_or(rest);
    rest.chars().any(|c| c.is_ascii_alphanumeric())
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "'()+_,-./:=?".contains(c))
}

/// Removes `<...>` tags. An unclosed `<` and what follows are kept.
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open..].find('>') else {
            break;
        };
        out.push_str(&rest[..open]);
        rest = &rest[open + close + 1..];
    }
    out.push_str(rest);
    out
}

/// Plain text of a message: the text body, else the HTML body without
/// tags, else empty.
#[must_use]
pub fn extract_text_content(message: &MailMessage) -> String {
    if let Some(text) = message.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    message
        .html
        .as_deref()
        .map(|html| strip_tags(html).trim().to_string())
        .unwrap_or_default()
}

/// The first 200 characters of [`extract_text_content`], with `...`
/// appended when cut.
#[must_use]
pub fn preview(message: &MailMessage) -> String {
    let text = extract_text_content(message);
    if text.chars().count() > PREVIEW_CHARS {
        let mut cut: String = text.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        text
    }
}
