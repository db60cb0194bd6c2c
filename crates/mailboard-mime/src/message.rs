//! Message structure: header block plus a flattened list of leaf parts.

use chrono::{DateTime, FixedOffset};

use crate::address::{Address, parse_address_list};
use crate::content_type::{ContentDisposition, ContentType};
use crate::date::parse_date;
use crate::encoding::{decode_base64, decode_charset, decode_quoted_printable, decode_rfc2047};
use crate::header::Headers;
use crate::{Error, Result};

/// Nesting beyond this is kept as an opaque leaf.
const MAX_DEPTH: usize = 16;

/// Content-Transfer-Encoding of a part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    /// 7bit, the default.
    #[default]
    SevenBit,
    /// 8bit.
    EightBit,
    /// Binary.
    Binary,
    /// Base64.
    Base64,
    /// Quoted-printable.
    QuotedPrintable,
}

impl TransferEncoding {
    /// Parses a header value; unknown values are treated as 7bit.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "8bit" => Self::EightBit,
            "binary" => Self::Binary,
            "base64" => Self::Base64,
            "quoted-printable" => Self::QuotedPrintable,
            _ => Self::SevenBit,
        }
    }

    /// Header spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SevenBit => "7bit",
            Self::EightBit => "8bit",
            Self::Binary => "binary",
            Self::Base64 => "base64",
            Self::QuotedPrintable => "quoted-printable",
        }
    }
}

/// A leaf body part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// The part's own headers. For a single-part message these are the
    /// message headers.
    pub headers: Headers,
    /// Content type, `text/plain` when absent or unparseable.
    pub content_type: ContentType,
    /// Transfer encoding of `body`.
    pub encoding: TransferEncoding,
    /// Body bytes as transmitted.
    pub body: Vec<u8>,
}

impl Part {
    fn new(headers: Headers, body: &[u8]) -> Self {
        let content_type = content_type_of(&headers);
        let encoding = headers
            .get("content-transfer-encoding")
            .map(TransferEncoding::parse)
            .unwrap_or_default();
        Self {
            headers,
            content_type,
            encoding,
            body: body.to_vec(),
        }
    }

    /// Body with the transfer encoding removed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Base64`] for a base64 body that does not decode.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self.encoding {
            TransferEncoding::Base64 => decode_base64(&self.body),
            TransferEncoding::QuotedPrintable => Ok(decode_quoted_printable(&self.body)),
            TransferEncoding::SevenBit | TransferEncoding::EightBit | TransferEncoding::Binary => {
                Ok(self.body.clone())
            }
        }
    }

    /// Body decoded to text using the part's charset.
    ///
    /// A body that fails transfer decoding is used as transmitted.
    #[must_use]
    pub fn decoded_text(&self) -> String {
        let bytes = self.decode().unwrap_or_else(|_| self.body.clone());
        decode_charset(&bytes, self.content_type.charset())
    }

    /// Parsed `Content-Disposition`, if present.
    #[must_use]
    pub fn disposition(&self) -> Option<ContentDisposition> {
        self.headers
            .get("content-disposition")
            .map(ContentDisposition::parse)
    }

    /// Filename from the disposition or, failing that, the content type's
    /// `name` parameter.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        self.disposition()
            .and_then(|d| d.filename().map(String::from))
            .or_else(|| self.content_type.parameter("name").map(String::from))
            .filter(|name| !name.trim().is_empty())
    }

    /// Whether this part is an attachment rather than message text.
    #[must_use]
    pub fn is_attachment(&self) -> bool {
        self.disposition().is_some_and(|d| d.is_attachment()) || self.filename().is_some()
    }
}

/// Summary of an attached file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// File name, `unnamed` when the part gives none.
    pub filename: String,
    /// `type/subtype`.
    pub content_type: String,
    /// Decoded size in bytes.
    pub size: usize,
}

/// A parsed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    headers: Headers,
    content_type: ContentType,
    parts: Vec<Part>,
}

impl Message {
    /// Parses a complete RFC 5322 message.
    ///
    /// # Errors
    ///
    /// - [`Error::Parse`] for empty input or a header block with no fields.
    /// - [`Error::InvalidMultipart`] for a multipart entity without a
    ///   boundary or without any delimited part.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(Error::Parse("empty message".into()));
        }

        let (header_block, body) = split_entity(raw);
        let headers = Headers::parse(&String::from_utf8_lossy(header_block));
        if headers.is_empty() {
            return Err(Error::Parse("no header fields".into()));
        }

        let content_type = content_type_of(&headers);
        let mut parts = Vec::new();
        collect_parts(headers.clone(), body, 0, &mut parts)?;

        Ok(Self {
            headers,
            content_type,
            parts,
        })
    }

    /// Top-level headers.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Top-level content type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Leaf parts in document order.
    #[must_use]
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Decoded `Subject`.
    #[must_use]
    pub fn subject(&self) -> Option<String> {
        self.headers.get("subject").map(decode_rfc2047)
    }

    /// Addresses in `From`.
    #[must_use]
    pub fn from(&self) -> Vec<Address> {
        self.addresses("from")
    }

    /// Addresses in `To`.
    #[must_use]
    pub fn to(&self) -> Vec<Address> {
        self.addresses("to")
    }

    /// Addresses in `Cc`.
    #[must_use]
    pub fn cc(&self) -> Vec<Address> {
        self.addresses("cc")
    }

    /// Addresses in `Reply-To`.
    #[must_use]
    pub fn reply_to(&self) -> Vec<Address> {
        self.addresses("reply-to")
    }

    fn addresses(&self, name: &str) -> Vec<Address> {
        self.headers
            .get_all(name)
            .flat_map(parse_address_list)
            .collect()
    }

    /// Parsed `Date`.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<FixedOffset>> {
        self.headers.get("date").and_then(parse_date)
    }

    /// `Message-ID` without angle brackets.
    #[must_use]
    pub fn message_id(&self) -> Option<String> {
        self.headers
            .get("message-id")
            .map(|id| id.trim().trim_start_matches('<').trim_end_matches('>').trim().to_string())
            .filter(|id| !id.is_empty())
    }

    /// First non-attachment `text/plain` part.
    #[must_use]
    pub fn text_part(&self) -> Option<&Part> {
        self.first_inline("plain")
    }

    /// First non-attachment `text/html` part.
    #[must_use]
    pub fn html_part(&self) -> Option<&Part> {
        self.first_inline("html")
    }

    fn first_inline(&self, sub_type: &str) -> Option<&Part> {
        self.parts
            .iter()
            .find(|part| part.content_type.is("text", sub_type) && !part.is_attachment())
    }

    /// Decoded plain-text body.
    #[must_use]
    pub fn text_body(&self) -> Option<String> {
        self.text_part().map(Part::decoded_text)
    }

    /// Decoded HTML body.
    #[must_use]
    pub fn html_body(&self) -> Option<String> {
        self.html_part().map(Part::decoded_text)
    }

    /// Attached files.
    #[must_use]
    pub fn attachments(&self) -> Vec<Attachment> {
        self.parts
            .iter()
            .filter(|part| part.is_attachment())
            .map(|part| Attachment {
                filename: part.filename().unwrap_or_else(|| "unnamed".to_string()),
                content_type: part.content_type.mime_type(),
                size: part.decode().map_or(part.body.len(), |bytes| bytes.len()),
            })
            .collect()
    }
}

fn content_type_of(headers: &Headers) -> ContentType {
    headers
        .get("content-type")
        .and_then(|value| ContentType::parse(value).ok())
        .unwrap_or_default()
}

fn collect_parts(headers: Headers, body: &[u8], depth: usize, out: &mut Vec<Part>) -> Result<()> {
    let content_type = content_type_of(&headers);
    if !content_type.is_multipart() || depth >= MAX_DEPTH {
        out.push(Part::new(headers, body));
        return Ok(());
    }

    let boundary = content_type.boundary().ok_or_else(|| {
        Error::InvalidMultipart(format!("{} without boundary", content_type.mime_type()))
    })?;

    let sections = split_multipart(body, boundary);
    if sections.is_empty() {
        return Err(Error::InvalidMultipart(format!(
            "no parts delimited by boundary {boundary:?}"
        )));
    }

    for section in sections {
        let (header_block, part_body) = split_entity(section);
        let part_headers = Headers::parse(&String::from_utf8_lossy(header_block));
        collect_parts(part_headers, part_body, depth + 1, out)?;
    }
    Ok(())
}

/// Splits an entity at the first blank line, accepting CRLF or bare LF.
fn split_entity(raw: &[u8]) -> (&[u8], &[u8]) {
    if let Some(body) = raw.strip_prefix(b"\r\n").or_else(|| raw.strip_prefix(b"\n")) {
        return (&[], body);
    }

    let crlf = find(raw, b"\r\n\r\n").map(|i| (i, 4));
    let lf = find(raw, b"\n\n").map(|i| (i, 2));
    let split = match (crlf, lf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    };

    match split {
        Some((at, len)) => (&raw[..at], &raw[at + len..]),
        None => (raw, &[]),
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// Splits a multipart body into the sections between delimiter lines.
///
/// The line break before a delimiter belongs to the delimiter. An
/// unterminated final section is kept.
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{boundary}");
    let mut sections = Vec::new();
    let mut start: Option<usize> = None;
    let mut offset = 0;

    for line in body.split_inclusive(|b| *b == b'\n') {
        let content = line.trim_ascii_end();
        if let Some(rest) = content.strip_prefix(delimiter.as_bytes()) {
            let closing = rest == b"--";
            if rest.is_empty() || closing {
                if let Some(from) = start {
                    sections.push(&body[from..section_end(body, from, offset)]);
                }
                if closing {
                    return sections;
                }
                start = Some(offset + line.len());
            }
        }
        offset += line.len();
    }

    if let Some(from) = start
        && from < body.len()
    {
        sections.push(&body[from..]);
    }
    sections
}

fn section_end(body: &[u8], from: usize, delimiter_at: usize) -> usize {
    let before = &body[from..delimiter_at];
    if before.ends_with(b"\r\n") {
        delimiter_at - 2
    } else if before.ends_with(b"\n") {
        delimiter_at - 1
    } else {
        delimiter_at
    }
}
