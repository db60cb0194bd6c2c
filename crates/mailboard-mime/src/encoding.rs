//! Transfer and header encodings.
//!
//! Base64 decoding is strict about the alphabet but tolerant of line breaks
//! and missing padding. Quoted-printable and RFC 2047 decoding never fail:
//! anything malformed is passed through as-is.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};

use crate::Result;

const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes base64, ignoring any whitespace in the input.
///
/// # Errors
///
/// Returns an error for characters outside the base64 alphabet.
pub fn decode_base64(input: &[u8]) -> Result<Vec<u8>> {
    let cleaned: Vec<u8> = input
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    Ok(LENIENT_BASE64.decode(cleaned)?)
}

/// Decodes quoted-printable (RFC 2045 §6.7).
///
/// Soft line breaks are removed and `=XX` escapes decoded. An `=` that does
/// not start a valid escape is kept literally.
#[must_use]
pub fn decode_quoted_printable(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        let byte = input[i];
        if byte != b'=' {
            out.push(byte);
            i += 1;
            continue;
        }

        if let Some(skip) = soft_break_len(&input[i + 1..]) {
            i += 1 + skip;
            continue;
        }

        match (
            input.get(i + 1).copied().and_then(hex_value),
            input.get(i + 2).copied().and_then(hex_value),
        ) {
            (Some(high), Some(low)) => {
                out.push((high << 4) | low);
                i += 3;
            }
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// Length of a soft line break following `=`: optional trailing blanks
/// then CRLF or LF.
fn soft_break_len(rest: &[u8]) -> Option<usize> {
    let blanks = rest
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    match &rest[blanks..] {
        [b'\r', b'\n', ..] => Some(blanks + 2),
        [b'\n', ..] => Some(blanks + 1),
        _ => None,
    }
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        _ => None,
    }
}

/// Converts bytes in the named charset to a string.
///
/// Charset labels are resolved the way browsers resolve them, so
/// `iso-8859-1` decodes as Windows-1252. Missing or unknown charsets fall
/// back to lossy UTF-8.
#[must_use]
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let Some(label) = charset.map(str::trim).filter(|c| !c.is_empty()) else {
        return String::from_utf8_lossy(bytes).into_owned();
    };

    if let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) {
        let (decoded, _, _) = encoding.decode(bytes);
        decoded.into_owned()
    } else {
        tracing::debug!(charset = label, "unknown charset, decoding as UTF-8");
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// Decodes RFC 2047 encoded words anywhere in a header value.
///
/// Whitespace between two adjacent encoded words is dropped. Words with an
/// unknown encoding or undecodable payload are left untouched.
#[must_use]
pub fn decode_rfc2047(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    let mut pending_space = String::new();
    let mut last_was_word = false;

    while !rest.is_empty() {
        if let Some((decoded, consumed)) = decode_encoded_word(rest) {
            // Whitespace separating two encoded words is not part of the text.
            if !last_was_word {
                out.push_str(&pending_space);
            }
            pending_space.clear();
            out.push_str(&decoded);
            rest = &rest[consumed..];
            last_was_word = true;
            continue;
        }

        let Some(ch) = rest.chars().next() else {
            break;
        };
        if ch.is_whitespace() && last_was_word {
            pending_space.push(ch);
        } else {
            out.push_str(&pending_space);
            pending_space.clear();
            out.push(ch);
            last_was_word = false;
        }
        rest = &rest[ch.len_utf8()..];
    }

    out.push_str(&pending_space);
    out
}

/// Decodes one `=?charset?enc?text?=` word at the start of `input`,
/// returning the text and the number of bytes consumed.
fn decode_encoded_word(input: &str) -> Option<(String, usize)> {
    let body = input.strip_prefix("=?")?;
    let (charset, body) = body.split_once('?')?;
    let (encoding, body) = body.split_once('?')?;
    let end = body.find("?=")?;
    let text = &body[..end];

    if charset.is_empty() || text.contains(char::is_whitespace) {
        return None;
    }

    let bytes = match encoding {
        "B" | "b" => decode_base64(text.as_bytes()).ok()?,
        "Q" | "q" => decode_quoted_printable(text.replace('_', " ").as_bytes()),
        _ => return None,
    };

    let consumed = 2 + charset.len() + 1 + encoding.len() + 1 + end + 2;
    // RFC 2231 language suffix: `utf-8*en`.
    let charset = charset.split('*').next().unwrap_or(charset);
    Some((decode_charset(&bytes, Some(charset)), consumed))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_base64_ignores_line_breaks() {
        assert_eq!(decode_base64(b"SGVs\r\nbG8=").unwrap(), b"Hello");
        assert_eq!(decode_base64(b"SGVsbG8").unwrap(), b"Hello");
        assert!(decode_base64(b"not base64!").is_err());
    }

    #[test]
    fn test_quoted_printable() {
        assert_eq!(decode_quoted_printable(b"A=0AB=20C"), b"A\nB C");
        assert_eq!(decode_quoted_printable(b"caf=C3=A9"), "café".as_bytes());
        assert_eq!(decode_quoted_printable(b"soft=\r\nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"soft= \nbreak"), b"softbreak");
        assert_eq!(decode_quoted_printable(b"lower=3d"), b"lower=");
    }

    #[test]
    fn test_quoted_printable_keeps_bad_escapes() {
        assert_eq!(decode_quoted_printable(b"1+1=2"), b"1+1=2");
        assert_eq!(decode_quoted_printable(b"ends="), b"ends=");
        assert_eq!(decode_quoted_printable(b"=ZZ"), b"=ZZ");
    }

    #[test]
    fn test_charset() {
        assert_eq!(decode_charset(&[0x63, 0x61, 0x66, 0xE9], Some("ISO-8859-1")), "café");
        assert_eq!(decode_charset("café".as_bytes(), Some("utf-8")), "café");
        assert_eq!(decode_charset(b"plain", None), "plain");
    }

    #[test]
    fn test_charset_windows_1252_punctuation() {
        let bytes = [0x80, b' ', 0x93, b'h', b'i', 0x94];
        assert_eq!(decode_charset(&bytes, Some("windows-1252")), "€ \u{201C}hi\u{201D}");
    }

    #[test]
    fn test_charset_single_byte_families() {
        assert_eq!(
            decode_charset(&[0x50, 0xF8, 0xED, 0x6C, 0x69, 0xB9], Some("iso-8859-2")),
            "Příliš"
        );
        assert_eq!(
            decode_charset(&[0xD0, 0xD2, 0xC9, 0xD7, 0xC5, 0xD4], Some("KOI8-R")),
            "привет"
        );
        assert_eq!(
            decode_charset(&[0xCF, 0xF0, 0xE8, 0xE2, 0xE5, 0xF2], Some("windows-1251")),
            "Привет"
        );
    }

    #[test]
    fn test_charset_multi_byte() {
        assert_eq!(decode_charset(&[0x82, 0xA0], Some("shift_jis")), "あ");
        assert_eq!(
            decode_charset(b"\x1b$B$\"\x1b(B", Some("iso-2022-jp")),
            "あ"
        );
    }

    #[test]
    fn test_charset_unknown_falls_back_to_utf8() {
        assert_eq!(decode_charset("café".as_bytes(), Some("x-made-up")), "café");
        assert_eq!(decode_charset("café".as_bytes(), Some("  ")), "café");
    }

    #[test]
    fn test_rfc2047_base64() {
        assert_eq!(decode_rfc2047("=?UTF-8?B?SGVsbG8gV29ybGQ=?="), "Hello World");
    }

    #[test]
    fn test_rfc2047_q() {
        assert_eq!(decode_rfc2047("=?iso-8859-1?Q?caf=E9_cr=E8me?="), "café crème");
        assert_eq!(decode_rfc2047("=?koi8-r?B?0NLJ18XU?="), "привет");
    }

    #[test]
    fn test_rfc2047_mixed_text() {
        assert_eq!(
            decode_rfc2047("Re: =?utf-8?q?caf=C3=A9?= meeting"),
            "Re: café meeting"
        );
    }

    #[test]
    fn test_rfc2047_adjacent_words_join() {
        assert_eq!(
            decode_rfc2047("=?utf-8?q?Hello?= =?utf-8?q?_World?="),
            "Hello World"
        );
    }

    #[test]
    fn test_rfc2047_leaves_invalid_words() {
        assert_eq!(decode_rfc2047("=?utf-8?x?abc?="), "=?utf-8?x?abc?=");
        assert_eq!(decode_rfc2047("plain = text"), "plain = text");
        assert_eq!(decode_rfc2047(""), "");
    }

    proptest! {
        #[test]
        fn quoted_printable_never_panics(input in proptest::collection::vec(any::<u8>(), 0..256)) {
            let decoded = decode_quoted_printable(&input);
            prop_assert!(decoded.len() <= input.len());
        }

        #[test]
        fn rfc2047_is_identity_without_encoded_words(input in "[a-zA-Z0-9 ,.:!]{0,64}") {
            prop_assert_eq!(decode_rfc2047(&input), input);
        }
    }
}
