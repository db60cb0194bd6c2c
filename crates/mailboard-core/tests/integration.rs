//! End-to-end tests against an in-process IMAP server.

#![allow(clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use chrono::{DateTime, Duration};
use mailboard_core::{
    Cache, ConnectionState, FetchOptions, MailError, MailFeed, ManualClock, MemoryStorage, Origin,
};
use support::{FakeMessage, FakeServer};

fn uids(page: &mailboard_core::EmailsPage) -> Vec<u32> {
    page.emails.iter().map(|m| m.uid).collect()
}

#[tokio::test]
async fn test_concurrent_connects_authenticate_once() {
    let server = FakeServer::with_messages(1);
    let service = server.service();

    let (first, second) = tokio::join!(service.connect(), service.connect());
    assert!(first.success);
    assert!(second.success);
    assert_eq!(server.logins(), 1);
    assert_eq!(service.client().connection_attempts(), 1);
    assert!(service.get_connection_status().connected);

    service.disconnect().await;
    assert!(!service.get_connection_status().connected);
    service.disconnect().await;
}

#[tokio::test]
async fn test_operations_connect_on_demand() {
    let server = FakeServer::with_messages(3);
    let service = server.service();
    assert_eq!(service.client().state(), ConnectionState::Disconnected);

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success);
    assert_eq!(server.logins(), 1);
    assert_eq!(service.client().state(), ConnectionState::Connected);
}

#[tokio::test]
async fn test_fetch_sorts_newest_first() {
    let server = FakeServer::with_messages(5);
    let service = server.service();

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success, "{:?}", page.error);
    assert_eq!(page.data.total, 5);
    assert_eq!(uids(&page.data), vec![5, 4, 3, 2, 1]);

    let newest = &page.data.emails[0];
    assert_eq!(newest.id, "m5@example.com");
    assert_eq!(newest.subject, "Message 5");
    assert_eq!(newest.from.address, "alice@example.com");
    assert_eq!(newest.from.name.as_deref(), Some("Alice Example"));
    assert_eq!(newest.to[0].address, "jane@example.com");
    assert_eq!(newest.text.as_deref(), Some("Body of message 5."));
    assert!(!newest.is_read);
}

#[tokio::test]
async fn test_pagination_slices_sorted_results() {
    let server = FakeServer::with_messages(5);
    let service = server.service();

    let options = FetchOptions {
        limit: Some(2),
        offset: 1,
        ..FetchOptions::default()
    };
    let page = service.get_emails(&options).await;
    assert_eq!(uids(&page.data), vec![4, 3]);
    assert_eq!(page.data.total, 2);

    let options = FetchOptions {
        offset: 5,
        ..FetchOptions::default()
    };
    let page = service.get_emails(&options).await;
    assert!(page.success);
    assert!(page.data.emails.is_empty());
}

#[tokio::test]
async fn test_unread_only() {
    let server = FakeServer::with_messages(3);
    server.set_message(FakeMessage::numbered(2).seen());
    let service = server.service();

    let options = FetchOptions {
        unread_only: true,
        ..FetchOptions::default()
    };
    let page = service.get_emails(&options).await;
    assert_eq!(uids(&page.data), vec![3, 1]);
}

#[tokio::test]
async fn test_one_unparseable_message_becomes_placeholder() {
    let server = FakeServer::with_messages(5);
    server.set_message(FakeMessage::unparseable(3));
    let service = server.service();

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success);
    assert_eq!(page.data.total, 5);

    let placeholders: Vec<_> = page
        .data
        .emails
        .iter()
        .filter(|m| m.id.starts_with("error_"))
        .collect();
    assert_eq!(placeholders.len(), 1);
    assert_eq!(placeholders[0].id, "error_3");
    assert_eq!(placeholders[0].uid, 3);
    assert_eq!(placeholders[0].subject, "Error parsing email");
}

#[tokio::test]
async fn test_malformed_fetch_line_becomes_placeholder() {
    let server = FakeServer::with_messages(3);
    let mut broken = FakeMessage::numbered(2);
    broken.malformed_fetch = true;
    server.set_message(broken);
    let service = server.service();

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success);
    assert_eq!(page.data.total, 3);
    assert!(page.data.emails.iter().any(|m| m.id == "error_2"));
}

#[tokio::test]
async fn test_read_unread_round_trip() {
    let server = FakeServer::with_messages(3);
    let service = server.service();
    service.get_emails(&FetchOptions::default()).await;

    assert!(service.mark_email_as_read(2).await.success);
    assert!(server.flags(2).contains("\\Seen"));

    assert!(service.mark_email_as_unread(2).await.success);
    assert!(!server.flags(2).contains("\\Seen"));

    let page = service.get_emails(&FetchOptions::default()).await;
    let message = page.data.emails.iter().find(|m| m.uid == 2).unwrap();
    assert!(!message.is_read);
}

#[tokio::test]
async fn test_delete_is_soft() {
    let server = FakeServer::with_messages(3);
    let service = server.service();
    service.get_emails(&FetchOptions::default()).await;

    assert!(service.delete_email(1).await.success);
    assert!(server.flags(1).contains("\\Deleted"));

    let page = service.get_emails(&FetchOptions::default()).await;
    assert_eq!(page.data.total, 3);
    let deleted = page.data.emails.iter().find(|m| m.uid == 1).unwrap();
    assert!(deleted.is_deleted);
    assert!(deleted.flags.contains(&"\\Deleted".to_string()));
}

#[tokio::test]
async fn test_flag_change_on_unknown_uid_fails() {
    let server = FakeServer::with_messages(2);
    let service = server.service();

    let outcome = service.mark_email_as_read(99).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("not found"));

    let outcome = service.mark_email_as_read(0).await;
    assert!(!outcome.success);
}

#[tokio::test]
async fn test_flag_change_without_echo_confirms_message() {
    let server = FakeServer::with_messages(3);
    server.set_message(FakeMessage::numbered(2).seen());
    server.echo_changes_only();
    let service = server.service();
    service.get_emails(&FetchOptions::default()).await;

    assert!(service.mark_email_as_read(2).await.success);
    assert!(service.mark_email_as_unread(1).await.success);
    assert!(server.flags(2).contains("\\Seen"));

    let outcome = service.mark_email_as_read(99).await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("not found"));
}

#[tokio::test]
async fn test_search_with_line_break_is_refused() {
    let server = FakeServer::with_messages(3);
    let service = server.service();

    let options = FetchOptions {
        search: Some("x\r\nA0099 UID STORE 1:* +FLAGS (\\Deleted)".into()),
        ..FetchOptions::default()
    };
    let page = service.get_emails(&options).await;
    assert!(!page.success);
    assert!(page.error.unwrap().starts_with("Fetch error"));
    assert!(page.data.emails.is_empty());

    assert!(server.commands().iter().all(|c| !c.contains("STORE")));
    assert!(server.flags(1).is_empty());

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success);
    assert_eq!(page.data.total, 3);
    assert_eq!(server.logins(), 1);
}

#[tokio::test]
async fn test_folder_with_line_break_is_refused() {
    let server = FakeServer::with_messages(1);
    let service = server.service();

    let page = service
        .get_emails(&FetchOptions::folder("INBOX\r\nA0099 LOGOUT"))
        .await;
    assert!(!page.success);
    assert!(server.commands().iter().all(|c| !c.contains("LOGOUT")));
    assert!(service.get_connection_status().connected);
}

#[tokio::test(start_paused = true)]
async fn test_silent_greeting_times_out() {
    let server = FakeServer::with_messages(1);
    server.stall_next_greeting();
    let client = server.client();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, MailError::Connection(ref m) if m.contains("timed out")));
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(server.logins(), 0);

    client.connect().await.unwrap();
    assert!(client.is_connected());
    assert_eq!(client.connection_attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_login_times_out() {
    let server = FakeServer::with_messages(1);
    server.stall_next_login();
    let client = server.client();

    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, MailError::Connection(ref m) if m.contains("authentication timed out")));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let messages = client.fetch_emails(&FetchOptions::default()).await.unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(server.logins(), 1);
}

#[tokio::test]
async fn test_missing_folder_fails_fetch() {
    let server = FakeServer::with_messages(2);
    let service = server.service();

    let page = service.get_emails(&FetchOptions::folder("Nope")).await;
    assert!(!page.success);
    assert!(page.data.emails.is_empty());
    assert_eq!(page.data.total, 0);

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(page.success);
    assert_eq!(server.logins(), 1);
}

#[tokio::test]
async fn test_folders_are_flattened() {
    let server = FakeServer::with_messages(0);
    let service = server.service();

    let folders = service.get_folders().await;
    assert!(folders.success);
    let paths: Vec<&str> = folders.data.folders.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["INBOX", "INBOX/Receipts", "Sent", "Projects", "Projects/Alpha"]
    );
    let projects = &folders.data.folders[3];
    assert!(!projects.is_selectable());
    assert_eq!(folders.data.folders[2].flags, vec!["\\Sent"]);
}

#[tokio::test]
async fn test_rejected_login() {
    let server = FakeServer::with_messages(1);
    server.reject_login();
    let service = server.service();

    let outcome = service.test_connection().await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().contains("authentication failed"));
    assert!(!service.get_connection_status().connected);

    let page = service.get_emails(&FetchOptions::default()).await;
    assert!(!page.success);
    assert!(page.data.emails.is_empty());
}

#[tokio::test]
async fn test_lost_session_reconnects() {
    let server = FakeServer::with_messages(2);
    let service = server.service();
    assert!(service.get_folders().await.success);

    server.bye_next();
    let folders = service.get_folders().await;
    assert!(!folders.success);
    assert!(folders.data.folders.is_empty());
    assert!(!service.get_connection_status().connected);

    assert!(service.get_folders().await.success);
    assert_eq!(server.logins(), 2);
}

#[tokio::test]
async fn test_offline_server() {
    let server = FakeServer::with_messages(1);
    server.set_offline(true);
    let service = server.service();

    let outcome = service.connect().await;
    assert!(!outcome.success);
    assert!(outcome.error.unwrap().starts_with("Connection error"));
    let status = service.get_connection_status();
    assert!(!status.connected);
    assert_eq!(status.server_info.host, "imap.test");
}

fn feed_with_clock(server: &FakeServer) -> (MailFeed<FakeServer>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    ));
    let cache = Cache::with_clock(Arc::new(MemoryStorage::new()), clock.clone());
    (MailFeed::new(server.service(), cache), clock)
}

#[tokio::test]
async fn test_feed_serves_fresh_cache() {
    let server = FakeServer::with_messages(3);
    let (feed, clock) = feed_with_clock(&server);
    let options = FetchOptions::default();

    let first = feed.emails(&options).await;
    assert_eq!(first.origin, Origin::Network);
    assert_eq!(server.fetches(), 1);

    clock.advance(Duration::minutes(4));
    let second = feed.emails(&options).await;
    assert_eq!(second.origin, Origin::Cache);
    assert_eq!(second.data, first.data);
    assert_eq!(server.fetches(), 1);

    clock.advance(Duration::minutes(2));
    let third = feed.emails(&options).await;
    assert_eq!(third.origin, Origin::Network);
    assert_eq!(server.fetches(), 2);
}

#[tokio::test]
async fn test_feed_keys_entries_by_options() {
    let server = FakeServer::with_messages(3);
    let (feed, _) = feed_with_clock(&server);

    feed.emails(&FetchOptions::default()).await;
    let limited = FetchOptions {
        limit: Some(1),
        ..FetchOptions::default()
    };
    let response = feed.emails(&limited).await;
    assert_eq!(response.origin, Origin::Network);
    assert_eq!(response.data.total, 1);
}

#[tokio::test]
async fn test_feed_serves_stale_on_failure() {
    let server = FakeServer::with_messages(2);
    let (feed, clock) = feed_with_clock(&server);
    let options = FetchOptions::default();

    let fresh = feed.emails(&options).await;
    assert!(fresh.success);

    feed.service().disconnect().await;
    server.set_offline(true);
    clock.advance(Duration::minutes(10));

    let stale = feed.emails(&options).await;
    assert_eq!(stale.origin, Origin::Stale);
    assert!(!stale.success);
    assert!(stale.error.is_some());
    assert_eq!(stale.data, fresh.data);

    let gone = feed.emails(&options).await;
    assert_eq!(gone.origin, Origin::Network);
    assert!(gone.data.emails.is_empty());
}

#[tokio::test]
async fn test_feed_mutation_invalidates_folder() {
    let server = FakeServer::with_messages(2);
    let (feed, _) = feed_with_clock(&server);
    let options = FetchOptions::default();

    feed.emails(&options).await;
    assert!(feed.mark_as_read(1).await.success);

    let after = feed.emails(&options).await;
    assert_eq!(after.origin, Origin::Network);
    let message = after.data.emails.iter().find(|m| m.uid == 1).unwrap();
    assert!(message.is_read);
}

#[tokio::test]
async fn test_feed_folders_and_status() {
    let server = FakeServer::with_messages(0);
    let (feed, clock) = feed_with_clock(&server);

    assert_eq!(feed.folders().await.origin, Origin::Network);
    assert_eq!(feed.folders().await.origin, Origin::Cache);
    clock.advance(Duration::minutes(31));
    assert_eq!(feed.folders().await.origin, Origin::Network);

    let status = feed.connection_status();
    assert_eq!(status.origin, Origin::Network);
    assert!(status.data.connected);
    assert_eq!(feed.connection_status().origin, Origin::Cache);
}

#[tokio::test]
async fn test_check_connection_connects_and_refreshes_status() {
    let server = FakeServer::with_messages(0);
    let (feed, _) = feed_with_clock(&server);

    assert!(!feed.connection_status().data.connected);

    let checked = feed.check_connection().await;
    assert!(checked.success);
    assert!(checked.data.connected);
    assert_eq!(checked.origin, Origin::Network);

    let cached = feed.connection_status();
    assert_eq!(cached.origin, Origin::Cache);
    assert!(cached.data.connected);
}

#[tokio::test]
async fn test_check_connection_reports_failure() {
    let server = FakeServer::with_messages(0);
    server.set_offline(true);
    let (feed, _) = feed_with_clock(&server);

    let checked = feed.check_connection().await;
    assert!(!checked.success);
    assert!(!checked.data.connected);
    assert!(checked.error.unwrap().starts_with("Connection error"));
}

#[tokio::test]
async fn test_feed_suggestions_follow_subjects() {
    let server = FakeServer::with_messages(3);
    let mut urgent = FakeMessage::numbered(2);
    urgent.body = urgent.body.replace("Subject: Message 2", "Subject: URGENT: invoice overdue");
    server.set_message(urgent);
    let (feed, _) = feed_with_clock(&server);

    let response = feed.suggestions(&FetchOptions::default()).await;
    assert!(response.success);
    assert_eq!(response.origin, Origin::Network);
    assert_eq!(response.data.important_emails.len(), 1);
    assert_eq!(response.data.important_emails[0].id, "m2@example.com");
    assert_eq!(
        response.data.suggested_next_steps[0].related_email_id.as_deref(),
        Some("m2@example.com")
    );

    let again = feed.suggestions(&FetchOptions::default()).await;
    assert_eq!(again.origin, Origin::Cache);
    assert_eq!(again.data, response.data);
    assert_eq!(server.fetches(), 1);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let server = FakeServer::with_messages(1);
    let feed = MailFeed::new(server.service(), Cache::disabled());
    let options = FetchOptions::default();

    feed.emails(&options).await;
    let second = feed.emails(&options).await;
    assert_eq!(second.origin, Origin::Network);
    assert_eq!(server.fetches(), 2);
}
