//! Response parsing.

use super::fetch::{FetchItem, parse_fetch_items};
use super::lexer::{Lexer, Token};
use crate::types::{
    Flag, Flags, ListResponse, MailboxAttribute, ResponseCode, SeqNum, Status, Tag, Uid,
    UidValidity,
};
use crate::Result;

/// A parsed server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completion.
    Tagged {
        /// Tag of the completed command.
        tag: Tag,
        /// Completion status.
        status: Status,
        /// Optional bracketed response code.
        code: Option<ResponseCode>,
        /// Human-readable text.
        text: String,
    },
    /// Server data.
    Untagged(UntaggedResponse),
    /// Continuation request (`+ ...`).
    Continuation(String),
}

/// Untagged server data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UntaggedResponse {
    /// `* OK`
    Ok {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* NO`
    No {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* BAD`
    Bad {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* PREAUTH`
    PreAuth {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* BYE`
    Bye {
        /// Response code.
        code: Option<ResponseCode>,
        /// Text.
        text: String,
    },
    /// `* CAPABILITY ...`
    Capability(Vec<String>),
    /// `* FLAGS (...)`
    Flags(Flags),
    /// `* LIST (...) "/" name`
    List(ListResponse),
    /// `* SEARCH n n n`, numbers as sent (UIDs for UID SEARCH).
    Search(Vec<u32>),
    /// `* n EXISTS`
    Exists(u32),
    /// `* n RECENT`
    Recent(u32),
    /// `* n EXPUNGE`
    Expunge(SeqNum),
    /// `* n FETCH (...)`
    Fetch {
        /// Message sequence number.
        seq: SeqNum,
        /// Data items.
        items: Vec<FetchItem>,
    },
    /// A FETCH whose items could not be parsed. The frame was complete, so
    /// the rest of the stream is still in sync.
    MalformedFetch {
        /// Message sequence number.
        seq: SeqNum,
        /// What went wrong.
        message: String,
    },
    /// Any other untagged data, as text.
    Other(String),
}

/// Parses one complete response frame (line plus any literals).
pub fn parse_response(input: &[u8]) -> Result<Response> {
    let mut lexer = Lexer::new(input);

    match lexer.next_token()? {
        Token::Asterisk => {
            lexer.expect_space()?;
            parse_untagged(&mut lexer).map(Response::Untagged)
        }
        Token::Plus => {
            if lexer.peek() == Some(b' ') {
                lexer.advance();
            }
            Ok(Response::Continuation(lexer.read_text_line()))
        }
        Token::Atom(tag) => {
            lexer.expect_space()?;
            let status = parse_status(&mut lexer)?;
            let (code, text) = parse_resp_text(&mut lexer)?;
            Ok(Response::Tagged {
                tag: Tag::new(tag),
                status,
                code,
                text,
            })
        }
        token => Err(lexer.error(format!("expected *, + or tag, got {token:?}"))),
    }
}

fn parse_untagged(lexer: &mut Lexer<'_>) -> Result<UntaggedResponse> {
    match lexer.next_token()? {
        Token::Number(n) => parse_message_data(lexer, n),
        Token::Atom(keyword) => {
            let keyword = keyword.to_ascii_uppercase();
            match keyword.as_str() {
                "OK" | "NO" | "BAD" | "PREAUTH" | "BYE" => {
                    let (code, text) = parse_resp_text(lexer)?;
                    Ok(match keyword.as_str() {
                        "OK" => UntaggedResponse::Ok { code, text },
                        "NO" => UntaggedResponse::No { code, text },
                        "BAD" => UntaggedResponse::Bad { code, text },
                        "PREAUTH" => UntaggedResponse::PreAuth { code, text },
                        _ => UntaggedResponse::Bye { code, text },
                    })
                }
                "CAPABILITY" => Ok(UntaggedResponse::Capability(parse_atoms(lexer)?)),
                "FLAGS" => {
                    lexer.expect_space()?;
                    Ok(UntaggedResponse::Flags(parse_flag_list(lexer)?))
                }
                "LIST" | "LSUB" => {
                    lexer.expect_space()?;
                    Ok(UntaggedResponse::List(parse_list(lexer)?))
                }
                "SEARCH" => Ok(UntaggedResponse::Search(parse_numbers(lexer)?)),
                _ => {
                    let rest = lexer.read_text_line();
                    Ok(UntaggedResponse::Other(format!("{keyword}{rest}")))
                }
            }
        }
        token => Err(lexer.error(format!("unexpected token after '*': {token:?}"))),
    }
}

fn parse_message_data(lexer: &mut Lexer<'_>, n: u32) -> Result<UntaggedResponse> {
    lexer.expect_space()?;
    let keyword = lexer.read_atom()?.to_ascii_uppercase();

    match keyword.as_str() {
        "EXISTS" => Ok(UntaggedResponse::Exists(n)),
        "RECENT" => Ok(UntaggedResponse::Recent(n)),
        "EXPUNGE" | "FETCH" => {
            let seq = SeqNum::new(n).ok_or_else(|| lexer.error("sequence number 0"))?;
            if keyword == "EXPUNGE" {
                return Ok(UntaggedResponse::Expunge(seq));
            }
            lexer.expect_space()?;
            match parse_fetch_items(lexer) {
                Ok(items) => Ok(UntaggedResponse::Fetch { seq, items }),
                Err(e) => Ok(UntaggedResponse::MalformedFetch {
                    seq,
                    message: e.to_string(),
                }),
            }
        }
        _ => {
            let rest = lexer.read_text_line();
            Ok(UntaggedResponse::Other(format!("{n} {keyword}{rest}")))
        }
    }
}

fn parse_status(lexer: &mut Lexer<'_>) -> Result<Status> {
    let atom = lexer.read_atom()?;
    match atom.to_ascii_uppercase().as_str() {
        "OK" => Ok(Status::Ok),
        "NO" => Ok(Status::No),
        "BAD" => Ok(Status::Bad),
        "PREAUTH" => Ok(Status::PreAuth),
        "BYE" => Ok(Status::Bye),
        _ => Err(lexer.error(format!("invalid status: {atom}"))),
    }
}

/// Parses `[code] text` after a status keyword. Both parts are optional.
fn parse_resp_text(lexer: &mut Lexer<'_>) -> Result<(Option<ResponseCode>, String)> {
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }
    let code = if lexer.peek() == Some(b'[') {
        Some(parse_response_code(lexer)?)
    } else {
        None
    };
    if lexer.peek() == Some(b' ') {
        lexer.advance();
    }
    Ok((code, lexer.read_text_line()))
}

fn parse_response_code(lexer: &mut Lexer<'_>) -> Result<ResponseCode> {
    lexer.expect(&Token::LBracket)?;
    let atom = lexer.read_atom()?;

    let code = match atom.to_ascii_uppercase().as_str() {
        "ALERT" => ResponseCode::Alert,
        "AUTHENTICATIONFAILED" => ResponseCode::AuthenticationFailed,
        "READ-ONLY" => ResponseCode::ReadOnly,
        "READ-WRITE" => ResponseCode::ReadWrite,
        "TRYCREATE" => ResponseCode::TryCreate,
        "CAPABILITY" => ResponseCode::Capability(parse_atoms(lexer)?),
        "PERMANENTFLAGS" => {
            lexer.expect_space()?;
            ResponseCode::PermanentFlags(parse_flag_list(lexer)?.into_iter().collect())
        }
        "UIDNEXT" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidNext(Uid::new(n).ok_or_else(|| lexer.error("UIDNEXT 0"))?)
        }
        "UIDVALIDITY" => {
            lexer.expect_space()?;
            let n = lexer.read_number()?;
            ResponseCode::UidValidity(
                UidValidity::new(n).ok_or_else(|| lexer.error("UIDVALIDITY 0"))?,
            )
        }
        "UNSEEN" => {
            lexer.expect_space()?;
            ResponseCode::Unseen(lexer.read_number()?)
        }
        _ => ResponseCode::Other(atom.to_string()),
    };

    while lexer.peek().is_some_and(|b| b != b']' && b != b'\r') {
        lexer.advance();
    }
    lexer.expect(&Token::RBracket)?;
    Ok(code)
}

/// Parses a parenthesized flag list.
pub fn parse_flag_list(lexer: &mut Lexer<'_>) -> Result<Flags> {
    lexer.expect(&Token::LParen)?;
    let mut flags = Flags::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => return Ok(flags),
            Token::Space => {}
            Token::Atom(s) => flags.insert(Flag::parse(s)),
            token => return Err(lexer.error(format!("unexpected token in flag list: {token:?}"))),
        }
    }
}

fn parse_list(lexer: &mut Lexer<'_>) -> Result<ListResponse> {
    lexer.expect(&Token::LParen)?;
    let mut attributes = Vec::new();
    loop {
        match lexer.next_token()? {
            Token::RParen => break,
            Token::Space => {}
            Token::Atom(s) => attributes.push(MailboxAttribute::parse(s)),
            token => return Err(lexer.error(format!("unexpected token in LIST attributes: {token:?}"))),
        }
    }

    lexer.expect_space()?;
    let delimiter = match lexer.next_token()? {
        Token::Nil => None,
        Token::Quoted(s) => s.chars().next(),
        token => return Err(lexer.error(format!("expected delimiter, got {token:?}"))),
    };

    lexer.expect_space()?;
    let name = lexer.read_astring()?;

    Ok(ListResponse {
        attributes,
        delimiter,
        name,
    })
}

fn parse_atoms(lexer: &mut Lexer<'_>) -> Result<Vec<String>> {
    let mut atoms = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        match lexer.next_token()? {
            Token::Atom(s) => atoms.push(s.to_string()),
            Token::Number(n) => atoms.push(n.to_string()),
            token => return Err(lexer.error(format!("unexpected token in atom list: {token:?}"))),
        }
    }
    Ok(atoms)
}

fn parse_numbers(lexer: &mut Lexer<'_>) -> Result<Vec<u32>> {
    let mut numbers = Vec::new();
    while lexer.peek() == Some(b' ') {
        lexer.advance();
        // Trailing whitespace before CRLF shows up in the wild.
        if lexer.peek() == Some(b'\r') {
            break;
        }
        numbers.push(lexer.read_number()?);
    }
    Ok(numbers)
}
