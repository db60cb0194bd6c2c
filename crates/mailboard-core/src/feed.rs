//! Read-through cache in front of [`MailService`].
//!
//! Reads answer from the cache while an entry is fresh and go to the
//! server otherwise. When the server call fails and an expired entry for
//! the same request exists, that entry is served with the error attached
//! instead of an empty payload.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::assistant::{self, Suggestions};
use crate::cache::{Cache, Lookup};
use crate::connector::Connect;
use crate::model::FetchOptions;
use crate::service::{ConnectionStatus, EmailsPage, Envelope, FolderList, MailService};

/// Key holding the folder list.
pub const FOLDERS_KEY: &str = "folders";
/// Key holding the last connection status.
pub const CONNECTION_STATUS_KEY: &str = "connection-status";

const EMAILS_TTL_MINUTES: i64 = 5;
const FOLDERS_TTL_MINUTES: i64 = 30;
const CONNECTION_STATUS_TTL_MINUTES: i64 = 1;

/// Key holding the message page of `folder`.
#[must_use]
pub fn emails_key(folder: &str) -> String {
    format!("emails:{folder}")
}

/// Where a [`FeedResponse`] payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Fetched just now.
    Network,
    /// A cache entry within its TTL.
    Cache,
    /// An expired cache entry served because the fetch failed.
    Stale,
}

/// A service envelope plus its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedResponse<T> {
    /// Whether fresh data was obtained.
    pub success: bool,
    /// Payload.
    pub data: T,
    /// Failure message, also set when serving stale data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Payload source.
    pub origin: Origin,
}

impl<T> FeedResponse<T> {
    fn from_envelope(envelope: Envelope<T>, origin: Origin) -> Self {
        Self {
            success: envelope.success,
            data: envelope.data,
            error: envelope.error,
            origin,
        }
    }

    const fn cached(data: T) -> Self {
        Self {
            success: true,
            data,
            error: None,
            origin: Origin::Cache,
        }
    }
}

/// The message page cached for a folder, with the options it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct EmailsSnapshot {
    options: FetchOptions,
    page: EmailsPage,
}

/// Cached view of a mail service.
#[derive(Debug)]
pub struct MailFeed<C: Connect> {
    service: MailService<C>,
    cache: Cache,
}

impl<C: Connect> MailFeed<C> {
    /// Puts `cache` in front of `service`.
    pub const fn new(service: MailService<C>, cache: Cache) -> Self {
        Self { service, cache }
    }

    /// The wrapped service.
    pub const fn service(&self) -> &MailService<C> {
        &self.service
    }

    /// The cache in use.
    pub const fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Messages for `options`, from the cache when an entry for the same
    /// options is fresh.
    pub async fn emails(&self, options: &FetchOptions) -> FeedResponse<EmailsPage> {
        let key = emails_key(&options.folder);
        let ttl = Duration::minutes(EMAILS_TTL_MINUTES);

        let stale = match self.cache.lookup::<EmailsSnapshot>(&key, ttl) {
            Lookup::Fresh(snapshot) if snapshot.options == *options => {
                tracing::debug!(key, "serving messages from cache");
                return FeedResponse::cached(snapshot.page);
            }
            Lookup::Expired(entry) if entry.data.options == *options => Some(entry.data.page),
            _ => None,
        };

        self.fetch_emails(&key, options, stale).await
    }

    /// Messages for `options`, always from the server. The cache is
    /// updated on success.
    pub async fn refresh_emails(&self, options: &FetchOptions) -> FeedResponse<EmailsPage> {
        let key = emails_key(&options.folder);
        let stale = self
            .cache
            .get::<EmailsSnapshot>(&key, Duration::minutes(EMAILS_TTL_MINUTES))
            .filter(|snapshot| snapshot.options == *options)
            .map(|snapshot| snapshot.page);
        self.fetch_emails(&key, options, stale).await
    }

    async fn fetch_emails(
        &self,
        key: &str,
        options: &FetchOptions,
        stale: Option<EmailsPage>,
    ) -> FeedResponse<EmailsPage> {
        let envelope = self.service.get_emails(options).await;
        self.cache.invalidate(CONNECTION_STATUS_KEY);

        if envelope.success {
            self.cache.set(
                key,
                &EmailsSnapshot {
                    options: options.clone(),
                    page: envelope.data.clone(),
                },
            );
            return FeedResponse::from_envelope(envelope, Origin::Network);
        }

        match stale {
            Some(page) => {
                tracing::warn!(key, error = ?envelope.error, "fetch failed, serving stale messages");
                FeedResponse {
                    success: false,
                    data: page,
                    error: envelope.error,
                    origin: Origin::Stale,
                }
            }
            None => FeedResponse::from_envelope(envelope, Origin::Network),
        }
    }

    /// The folder list, from the cache while fresh.
    pub async fn folders(&self) -> FeedResponse<FolderList> {
        let stale = match self
            .cache
            .lookup::<FolderList>(FOLDERS_KEY, Duration::minutes(FOLDERS_TTL_MINUTES))
        {
            Lookup::Fresh(folders) => return FeedResponse::cached(folders),
            Lookup::Expired(entry) => Some(entry.data),
            Lookup::Missing => None,
        };

        let envelope = self.service.get_folders().await;
        self.cache.invalidate(CONNECTION_STATUS_KEY);

        // An empty list on success may be a swallowed LIST failure; keep it
        // out of the cache.
        if envelope.success && !envelope.data.folders.is_empty() {
            self.cache.set(FOLDERS_KEY, &envelope.data);
            return FeedResponse::from_envelope(envelope, Origin::Network);
        }

        match stale {
            Some(folders) if !envelope.success => {
                tracing::warn!(error = ?envelope.error, "folder listing failed, serving stale folders");
                FeedResponse {
                    success: false,
                    data: folders,
                    error: envelope.error,
                    origin: Origin::Stale,
                }
            }
            _ => FeedResponse::from_envelope(envelope, Origin::Network),
        }
    }

    /// Connection status, cached for a minute.
    pub fn connection_status(&self) -> FeedResponse<ConnectionStatus> {
        let ttl = Duration::minutes(CONNECTION_STATUS_TTL_MINUTES);
        if let Some(status) = self.cache.get(CONNECTION_STATUS_KEY, ttl) {
            return FeedResponse::cached(status);
        }

        let status = self.service.get_connection_status();
        self.cache.set(CONNECTION_STATUS_KEY, &status);
        FeedResponse::from_envelope(Envelope::ok(status), Origin::Network)
    }

    /// Suggestions for the messages [`emails`](Self::emails) returns for
    /// `options`, cached or stale pages included.
    pub async fn suggestions(&self, options: &FetchOptions) -> FeedResponse<Suggestions> {
        let page = self.emails(options).await;
        FeedResponse {
            success: page.success,
            data: assistant::suggestions(&page.data.emails),
            error: page.error,
            origin: page.origin,
        }
    }

    /// Connects, then records and returns the resulting status. A failed
    /// connection comes back unsuccessful with the disconnected status.
    pub async fn check_connection(&self) -> FeedResponse<ConnectionStatus> {
        let connected = self.service.connect().await;
        let status = self.service.get_connection_status();
        self.cache.set(CONNECTION_STATUS_KEY, &status);
        FeedResponse {
            success: connected.success,
            data: status,
            error: connected.error,
            origin: Origin::Network,
        }
    }

    /// Marks a message read and drops the cached page of its folder.
    pub async fn mark_as_read(&self, uid: u32) -> Envelope<()> {
        let envelope = self.service.mark_email_as_read(uid).await;
        self.after_mutation(&envelope).await;
        envelope
    }

    /// Marks a message unread and drops the cached page of its folder.
    pub async fn mark_as_unread(&self, uid: u32) -> Envelope<()> {
        let envelope = self.service.mark_email_as_unread(uid).await;
        self.after_mutation(&envelope).await;
        envelope
    }

    /// Flags a message deleted and drops the cached page of its folder.
    pub async fn delete(&self, uid: u32) -> Envelope<()> {
        let envelope = self.service.delete_email(uid).await;
        self.after_mutation(&envelope).await;
        envelope
    }

    async fn after_mutation(&self, envelope: &Envelope<()>) {
        self.cache.invalidate(CONNECTION_STATUS_KEY);
        if envelope.success {
            let folder = self.service.current_folder().await;
            self.cache.invalidate(&emails_key(&folder));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(emails_key("INBOX"), "emails:INBOX");
        assert_eq!(emails_key("Work/2024"), "emails:Work/2024");
    }

    #[test]
    fn test_origin_serializes_lowercase() {
        let response = FeedResponse::cached(FolderList::default());
        let json = serde_json::to_value(&response).unwrap_or_default();
        assert_eq!(json["origin"], "cache");
        assert_eq!(json["success"], true);
    }
}
