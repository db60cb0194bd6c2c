//! Client-side TTL cache.
//!
//! Entries are JSON documents stamped with the time they were written.
//! Expiry is lazy: a read that finds an entry older than the requested TTL
//! deletes it. There is no background sweep.
//!
//! Backend failures never reach the caller. They are logged and the
//! operation behaves as a miss (reads) or a no-op (writes). A cache built
//! with [`Cache::disabled`] has no backend at all.

mod clock;
mod storage;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{CacheStorage, FileStorage, MemoryStorage};

/// A stored value and when it was written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Write time.
    pub timestamp: DateTime<Utc>,
    /// The value.
    pub data: T,
}

/// Result of [`Cache::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    /// Within its TTL.
    Fresh(T),
    /// Past its TTL. Already removed from storage.
    Expired(CacheEntry<T>),
    /// Nothing stored, or the stored document was unreadable.
    Missing,
}

impl<T> Lookup<T> {
    /// The value if fresh.
    #[must_use]
    pub fn fresh(self) -> Option<T> {
        match self {
            Self::Fresh(data) => Some(data),
            Self::Expired(_) | Self::Missing => None,
        }
    }
}

/// TTL cache over a pluggable backend.
#[derive(Clone)]
pub struct Cache {
    storage: Option<Arc<dyn CacheStorage>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("enabled", &self.is_enabled())
            .field("now", &self.clock.now())
            .finish()
    }
}

impl Cache {
    /// A cache over `storage` using wall-clock time.
    pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
        Self::with_clock(storage, Arc::new(SystemClock))
    }

    /// A cache over `storage` using `clock`.
    pub fn with_clock(storage: Arc<dyn CacheStorage>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage: Some(storage),
            clock,
        }
    }

    /// A cache over a fresh [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// A cache with no backend: reads miss, writes do nothing.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            storage: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// False for [`Cache::disabled`].
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.storage.is_some()
    }

    /// Reads `key`, classifying it against `ttl`.
    ///
    /// An entry exactly `ttl` old is still fresh. Expired and unreadable
    /// entries are removed from storage.
    pub fn lookup<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Lookup<T> {
        let Some(storage) = &self.storage else {
            return Lookup::Missing;
        };

        let raw = match storage.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Lookup::Missing,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed");
                return Lookup::Missing;
            }
        };

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding unreadable cache entry");
                remove(storage.as_ref(), key);
                return Lookup::Missing;
            }
        };

        let age = self.clock.now() - entry.timestamp;
        if age <= ttl {
            tracing::trace!(key, age_secs = age.num_seconds(), "cache hit");
            Lookup::Fresh(entry.data)
        } else {
            tracing::debug!(key, age_secs = age.num_seconds(), "cache entry expired");
            remove(storage.as_ref(), key);
            Lookup::Expired(entry)
        }
    }

    /// The value under `key` if it is at most `ttl` old.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.lookup(key, ttl).fresh()
    }

    /// Stores `data` under `key` stamped with the current time.
    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let Some(storage) = &self.storage else {
            return;
        };

        let entry = CacheEntry {
            timestamp: self.clock.now(),
            data,
        };
        let written = serde_json::to_string(&entry)
            .map_err(crate::error::StorageError::from)
            .and_then(|raw| storage.write(key, &raw));
        if let Err(e) = written {
            tracing::warn!(key, error = %e, "cache write failed");
        }
    }

    /// Removes `key`.
    pub fn invalidate(&self, key: &str) {
        if let Some(storage) = &self.storage {
            remove(storage.as_ref(), key);
        }
    }
}

fn remove(storage: &dyn CacheStorage, key: &str) {
    if let Err(e) = storage.remove(key) {
        tracing::warn!(key, error = %e, "cache remove failed");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    fn manual_cache() -> (Cache, Arc<ManualClock>, Arc<MemoryStorage>) {
        let clock = Arc::new(ManualClock::new(
            DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        ));
        let storage = Arc::new(MemoryStorage::new());
        let cache = Cache::with_clock(storage.clone(), clock.clone());
        (cache, clock, storage)
    }

    #[test]
    fn test_ttl_expiry_is_permanent() {
        let (cache, clock, storage) = manual_cache();
        let ttl = Duration::minutes(5);

        cache.set("folders", &vec!["INBOX".to_string()]);
        assert_eq!(cache.get::<Vec<String>>("folders", ttl), Some(vec!["INBOX".into()]));

        clock.advance(Duration::minutes(5));
        assert!(cache.get::<Vec<String>>("folders", ttl).is_some());

        clock.advance(Duration::seconds(1));
        assert!(cache.get::<Vec<String>>("folders", ttl).is_none());
        assert!(storage.is_empty());

        clock.set(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        assert!(cache.get::<Vec<String>>("folders", ttl).is_none());
    }

    #[test]
    fn test_lookup_reports_expired_entry() {
        let (cache, clock, _) = manual_cache();
        cache.set("k", &42_u32);
        let written = clock.now();
        clock.advance(Duration::minutes(2));

        match cache.lookup::<u32>("k", Duration::minutes(1)) {
            Lookup::Expired(entry) => {
                assert_eq!(entry.data, 42);
                assert_eq!(entry.timestamp, written);
            }
            other => panic!("expected expired, got {other:?}"),
        }
        assert_eq!(cache.lookup::<u32>("k", Duration::minutes(1)), Lookup::Missing);
    }

    #[test]
    fn test_set_overwrites_and_restamps() {
        let (cache, clock, _) = manual_cache();
        cache.set("k", &1_u32);
        clock.advance(Duration::minutes(4));
        cache.set("k", &2_u32);
        clock.advance(Duration::minutes(4));
        assert_eq!(cache.get::<u32>("k", Duration::minutes(5)), Some(2));
    }

    #[test]
    fn test_invalidate() {
        let (cache, _, _) = manual_cache();
        cache.set("k", &1_u32);
        cache.invalidate("k");
        cache.invalidate("k");
        assert!(cache.get::<u32>("k", Duration::minutes(5)).is_none());
    }

    #[test]
    fn test_unreadable_entry_is_dropped() {
        let (cache, _, storage) = manual_cache();
        storage.write("k", "not json").unwrap();
        assert_eq!(cache.lookup::<u32>("k", Duration::minutes(5)), Lookup::Missing);
        assert!(storage.is_empty());
    }

    #[test]
    fn test_disabled_cache_is_noop() {
        let cache = Cache::disabled();
        assert!(!cache.is_enabled());
        cache.set("k", &1_u32);
        assert!(cache.get::<u32>("k", Duration::minutes(5)).is_none());
        cache.invalidate("k");
    }

    struct BrokenStorage;

    impl CacheStorage for BrokenStorage {
        fn read(&self, _: &str) -> Result<Option<String>, StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn write(&self, _: &str, _: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
        fn remove(&self, _: &str) -> Result<(), StorageError> {
            Err(std::io::Error::other("disk gone").into())
        }
    }

    #[test]
    fn test_backend_errors_are_swallowed() {
        let cache = Cache::new(Arc::new(BrokenStorage));
        cache.set("k", &1_u32);
        assert!(cache.get::<u32>("k", Duration::minutes(5)).is_none());
        cache.invalidate("k");
    }

    #[test]
    fn test_file_backed_cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Cache::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
        cache.set("emails:INBOX", &vec![1_u32, 2, 3]);

        let reopened = Cache::new(Arc::new(FileStorage::new(dir.path()).unwrap()));
        assert_eq!(
            reopened.get::<Vec<u32>>("emails:INBOX", Duration::minutes(5)),
            Some(vec![1, 2, 3])
        );
    }
}
