//! Parsing of realistic messages.

#![allow(clippy::unwrap_used)]

use chrono::Datelike;
use mailboard_mime::{Message, TransferEncoding};

const NEWSLETTER: &str = "Return-Path: <news@shop.example>\r
From: \"Shop, Inc.\" <news@shop.example>\r
To: Jane Doe <jane@example.com>, bob@example.com\r
Cc: Team: carol@example.com, dave@example.com;\r
Subject: =?utf-8?q?Weekly_deals_=E2=80=93?= =?utf-8?q?_50=25_off?=\r
Date: Wed, 10 Jan 2024 09:15:00 +0000 (UTC)\r
Message-ID: <deal-42@shop.example>\r
MIME-Version: 1.0\r
Content-Type: multipart/mixed; boundary=\"outer\"\r
\r
This is a multi-part message in MIME format.\r
--outer\r
Content-Type: multipart/alternative; boundary=\"inner\"\r
\r
--inner\r
Content-Type: text/plain; charset=utf-8\r
Content-Transfer-Encoding: quoted-printable\r
\r
Caf=C3=A9 deals this week.=0A=\r
Shop now!\r
--inner\r
Content-Type: text/html; charset=utf-8\r
Content-Transfer-Encoding: base64\r
\r
PHA+Q2Fmw6kgZGVhbHM8L3A+\r
--inner--\r
--outer\r
Content-Type: application/pdf; name=\"catalog.pdf\"\r
Content-Disposition: attachment; filename=\"catalog.pdf\"\r
Content-Transfer-Encoding: base64\r
\r
JVBERi0xLjQK\r
--outer\r
Content-Type: text/plain\r
Content-Disposition: attachment\r
\r
notes\r
--outer--\r
";

#[test]
fn test_nested_multipart_is_flattened() {
    let msg = Message::parse(NEWSLETTER.as_bytes()).unwrap();

    assert!(msg.content_type().is_multipart());
    assert_eq!(msg.parts().len(), 4);
    assert_eq!(msg.parts()[0].encoding, TransferEncoding::QuotedPrintable);
    assert_eq!(msg.parts()[1].content_type.mime_type(), "text/html");
}

#[test]
fn test_headers_are_decoded() {
    let msg = Message::parse(NEWSLETTER.as_bytes()).unwrap();

    assert_eq!(msg.subject().as_deref(), Some("Weekly deals – 50% off"));
    assert_eq!(msg.message_id().as_deref(), Some("deal-42@shop.example"));
    assert_eq!(msg.date().unwrap().day(), 10);

    let from = msg.from();
    assert_eq!(from.len(), 1);
    assert_eq!(from[0].name.as_deref(), Some("Shop, Inc."));

    let to: Vec<_> = msg.to().into_iter().map(|a| a.email).collect();
    assert_eq!(to, vec!["jane@example.com", "bob@example.com"]);

    let cc: Vec<_> = msg.cc().into_iter().map(|a| a.email).collect();
    assert_eq!(cc, vec!["carol@example.com", "dave@example.com"]);
}

#[test]
fn test_bodies_are_decoded() {
    let msg = Message::parse(NEWSLETTER.as_bytes()).unwrap();

    assert_eq!(
        msg.text_body().as_deref(),
        Some("Café deals this week.\nShop now!")
    );
    assert_eq!(msg.html_body().as_deref(), Some("<p>Café deals</p>"));
}

#[test]
fn test_attachments() {
    let msg = Message::parse(NEWSLETTER.as_bytes()).unwrap();
    let attachments = msg.attachments();

    assert_eq!(attachments.len(), 2);
    assert_eq!(attachments[0].filename, "catalog.pdf");
    assert_eq!(attachments[0].content_type, "application/pdf");
    assert_eq!(attachments[0].size, 9);
    assert_eq!(attachments[1].filename, "unnamed");
    assert_eq!(attachments[1].content_type, "text/plain");
}

#[test]
fn test_lf_only_message() {
    let raw = "From: a@example.com\nSubject: plain\n\nline one\nline two\n";
    let msg = Message::parse(raw.as_bytes()).unwrap();
    assert_eq!(msg.subject().as_deref(), Some("plain"));
    assert_eq!(msg.text_body().as_deref(), Some("line one\nline two\n"));
}

#[test]
fn test_latin1_body() {
    let mut raw = b"Content-Type: text/plain; charset=iso-8859-1\r\n\r\n".to_vec();
    raw.extend_from_slice(&[b'n', 0xE9]);
    let msg = Message::parse(&raw).unwrap();
    assert_eq!(msg.text_body().as_deref(), Some("né"));
}

#[test]
fn test_html_only_message() {
    let raw = "Content-Type: text/html\r\n\r\n<b>hi</b>";
    let msg = Message::parse(raw.as_bytes()).unwrap();
    assert!(msg.text_body().is_none());
    assert_eq!(msg.html_body().as_deref(), Some("<b>hi</b>"));
}
