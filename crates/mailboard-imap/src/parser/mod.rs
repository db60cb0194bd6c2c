//! Sans-I/O parser for server responses.
//!
//! The connection layer hands the parser one complete frame at a time: a
//! response line together with every literal it announces. Parsing therefore
//! never blocks and never needs more input.
//!
//! ```
//! use mailboard_imap::parser::{parse_response, Response, UntaggedResponse};
//!
//! let response = parse_response(b"* 3 EXISTS\r\n").unwrap();
//! assert_eq!(response, Response::Untagged(UntaggedResponse::Exists(3)));
//! ```

mod fetch;
mod lexer;
mod response;

pub use fetch::{Address, Envelope, FetchItem, parse_internal_date};
pub use lexer::{Lexer, Token};
pub use response::{Response, UntaggedResponse, parse_response};
