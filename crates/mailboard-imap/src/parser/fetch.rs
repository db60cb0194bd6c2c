//! FETCH response data.

use chrono::{DateTime, FixedOffset};

use super::lexer::{Lexer, Token};
use super::response::parse_flag_list;
use crate::types::{Flags, Uid};
use crate::Result;

/// A single data item of a FETCH response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchItem {
    /// `FLAGS (...)`
    Flags(Flags),
    /// `UID n`
    Uid(Uid),
    /// `INTERNALDATE "..."`, kept as sent.
    InternalDate(String),
    /// `RFC822.SIZE n`
    Rfc822Size(u32),
    /// `ENVELOPE (...)`
    Envelope(Box<Envelope>),
    /// `BODY[section]`, `RFC822` and friends.
    Body {
        /// Section text between the brackets; `None` for the whole message.
        section: Option<String>,
        /// Payload, `None` if the server sent NIL.
        data: Option<Vec<u8>>,
    },
}

/// The ENVELOPE structure (RFC 3501 section 7.4.2).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
    /// Raw `Date` header.
    pub date: Option<String>,
    /// Raw `Subject` header (may still be RFC 2047 encoded).
    pub subject: Option<String>,
    /// `From` addresses.
    pub from: Vec<Address>,
    /// `Sender` addresses.
    pub sender: Vec<Address>,
    /// `Reply-To` addresses.
    pub reply_to: Vec<Address>,
    /// `To` addresses.
    pub to: Vec<Address>,
    /// `Cc` addresses.
    pub cc: Vec<Address>,
    /// `Bcc` addresses.
    pub bcc: Vec<Address>,
    /// `In-Reply-To` header.
    pub in_reply_to: Option<String>,
    /// `Message-ID` header.
    pub message_id: Option<String>,
}

/// One address of an envelope address list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    /// Display name.
    pub name: Option<String>,
    /// Source route, obsolete.
    pub adl: Option<String>,
    /// Local part. Group syntax uses a NIL host here.
    pub mailbox: Option<String>,
    /// Domain.
    pub host: Option<String>,
}

impl Address {
    /// Returns `mailbox@host` when both halves are present.
    #[must_use]
    pub fn email(&self) -> Option<String> {
        match (&self.mailbox, &self.host) {
            (Some(mailbox), Some(host)) => Some(format!("{mailbox}@{host}")),
            _ => None,
        }
    }
}

/// Parses an INTERNALDATE value such as `17-Jul-1996 02:44:25 -0700`.
#[must_use]
pub fn parse_internal_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), "%d-%b-%Y %H:%M:%S %z").ok()
}

/// Parses the parenthesized item list of a FETCH response.
pub fn parse_fetch_items(lexer: &mut Lexer<'_>) -> Result<Vec<FetchItem>> {
    lexer.expect(&Token::LParen)?;
    let mut items = Vec::new();

    loop {
        let name = match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => continue,
            Token::Atom(name) => name.to_ascii_uppercase(),
            token => return Err(lexer.error(format!("unexpected token in FETCH: {token:?}"))),
        };

        match name.as_str() {
            "FLAGS" => {
                lexer.expect_space()?;
                items.push(FetchItem::Flags(parse_flag_list(lexer)?));
            }
            "UID" => {
                lexer.expect_space()?;
                let n = lexer.read_number()?;
                let uid = Uid::new(n).ok_or_else(|| lexer.error("UID 0 in FETCH"))?;
                items.push(FetchItem::Uid(uid));
            }
            "INTERNALDATE" => {
                lexer.expect_space()?;
                let date = lexer.read_astring()?;
                items.push(FetchItem::InternalDate(date));
            }
            "RFC822.SIZE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Rfc822Size(lexer.read_number()?));
            }
            "ENVELOPE" => {
                lexer.expect_space()?;
                items.push(FetchItem::Envelope(Box::new(parse_envelope(lexer)?)));
            }
            "BODY" | "BODY.PEEK" if lexer.peek() == Some(b'[') => {
                let section = read_section(lexer)?;
                skip_origin(lexer);
                lexer.expect_space()?;
                let data = read_body_data(lexer)?;
                items.push(FetchItem::Body { section, data });
            }
            "RFC822" | "RFC822.HEADER" | "RFC822.TEXT" => {
                let section = name.strip_prefix("RFC822.").map(str::to_string);
                lexer.expect_space()?;
                let data = read_body_data(lexer)?;
                items.push(FetchItem::Body { section, data });
            }
            _ => {
                if lexer.peek() == Some(b'[') {
                    read_section(lexer)?;
                    skip_origin(lexer);
                }
                lexer.expect_space()?;
                lexer.skip_value()?;
            }
        }
    }

    Ok(items)
}

/// Reads `[section]`, returning `None` for an empty section.
fn read_section(lexer: &mut Lexer<'_>) -> Result<Option<String>> {
    lexer.advance();
    let mut section = String::new();
    loop {
        match lexer.advance() {
            Some(b']') => break,
            Some(b'\r' | b'\n') | None => return Err(lexer.error("unterminated section")),
            Some(b) => section.push(char::from(b)),
        }
    }
    Ok((!section.is_empty()).then_some(section))
}

/// Skips a partial-fetch origin such as `<0>`.
fn skip_origin(lexer: &mut Lexer<'_>) {
    if lexer.peek() == Some(b'<') {
        while let Some(b) = lexer.advance() {
            if b == b'>' {
                break;
            }
        }
    }
}

fn read_body_data(lexer: &mut Lexer<'_>) -> Result<Option<Vec<u8>>> {
    match lexer.next_token()? {
        Token::Nil => Ok(None),
        Token::Literal(data) => Ok(Some(data)),
        Token::Quoted(s) => Ok(Some(s.into_bytes())),
        token => Err(lexer.error(format!("expected body data, got {token:?}"))),
    }
}

/// Parses an ENVELOPE structure.
pub fn parse_envelope(lexer: &mut Lexer<'_>) -> Result<Envelope> {
    lexer.expect(&Token::LParen)?;

    let date = lexer.read_nstring()?;
    lexer.expect_space()?;
    let subject = lexer.read_nstring()?;
    lexer.expect_space()?;
    let from = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let sender = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let reply_to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let to = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let cc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let bcc = parse_address_list(lexer)?;
    lexer.expect_space()?;
    let in_reply_to = lexer.read_nstring()?;
    lexer.expect_space()?;
    let message_id = lexer.read_nstring()?;

    lexer.expect(&Token::RParen)?;

    Ok(Envelope {
        date,
        subject,
        from,
        sender,
        reply_to,
        to,
        cc,
        bcc,
        in_reply_to,
        message_id,
    })
}

fn parse_address_list(lexer: &mut Lexer<'_>) -> Result<Vec<Address>> {
    match lexer.next_token()? {
        Token::Nil => Ok(Vec::new()),
        Token::LParen => {
            let mut addresses = Vec::new();
            loop {
                match lexer.peek() {
                    Some(b')') => {
                        lexer.advance();
                        return Ok(addresses);
                    }
                    Some(b' ') => {
                        lexer.advance();
                    }
                    Some(b'(') => addresses.push(parse_address(lexer)?),
                    _ => return Err(lexer.error("malformed address list")),
                }
            }
        }
        token => Err(lexer.error(format!("expected address list, got {token:?}"))),
    }
}

fn parse_address(lexer: &mut Lexer<'_>) -> Result<Address> {
    lexer.expect(&Token::LParen)?;
    let name = lexer.read_nstring()?;
    lexer.expect_space()?;
    let adl = lexer.read_nstring()?;
    lexer.expect_space()?;
    let mailbox = lexer.read_nstring()?;
    lexer.expect_space()?;
    let host = lexer.read_nstring()?;
    lexer.expect(&Token::RParen)?;

    Ok(Address {
        name,
        adl,
        mailbox,
        host,
    })
}
