//! # mailboard-mime
//!
//! Lenient MIME parsing for display purposes (RFC 5322, RFC 2045-2047).
//!
//! Header fields, addresses and transfer encodings are decoded on a
//! best-effort basis. Only structural failures are errors: input with no
//! header block, or a multipart entity that cannot be split.
//!
//! ## Example
//!
//! ```
//! use mailboard_mime::Message;
//!
//! let raw = b"From: Jane <jane@example.com>\r\n\
//!             Subject: =?UTF-8?Q?Caf=C3=A9?=\r\n\
//!             Content-Type: multipart/alternative; boundary=\"b\"\r\n\
//!             \r\n\
//!             --b\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             Hello\r\n\
//!             --b\r\n\
//!             Content-Type: text/html\r\n\
//!             \r\n\
//!             <p>Hello</p>\r\n\
//!             --b--\r\n";
//!
//! let message = Message::parse(raw).unwrap();
//! assert_eq!(message.subject().as_deref(), Some("Café"));
//! assert_eq!(message.from()[0].email, "jane@example.com");
//! assert_eq!(message.text_body().as_deref(), Some("Hello"));
//! assert_eq!(message.html_body().as_deref(), Some("<p>Hello</p>"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod address;
pub mod content_type;
pub mod date;
pub mod encoding;
mod error;
pub mod header;
pub mod message;

pub use address::{Address, parse_address_list};
pub use content_type::{ContentDisposition, ContentType};
pub use date::parse_date;
pub use encoding::{decode_base64, decode_charset, decode_quoted_printable, decode_rfc2047};
pub use error::{Error, Result};
pub use header::Headers;
pub use message::{Attachment, Message, Part, TransferEncoding};
