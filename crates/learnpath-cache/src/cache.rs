//! The cache: versioned entries, age expiry, tag invalidation and oldest-first
//! eviction over a shared [`KeyValueStore`].
//!
//! No operation here returns an error. Every failure degrades to a cache miss
//! or a lost write and is logged, because nothing downstream depends on the
//! cache being populated.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::entry::{CacheEntry, EntryHeader};
use crate::store::{item_size, KeyValueStore};

const DEFAULT_NAMESPACE: &str = "learnpath";
const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";
const DEFAULT_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Key prefix owned by this cache. Keys outside it are never touched.
    pub namespace: String,
    /// Current schema version; entries written under any other are stale.
    pub schema_version: String,
    /// Maximum entry age.
    pub expiry: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            expiry: DEFAULT_EXPIRY,
        }
    }
}

impl CacheConfig {
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_schema_version(mut self, version: impl Into<String>) -> Self {
        self.schema_version = version.into();
        self
    }

    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    fn expiry_ms(&self) -> i64 {
        i64::try_from(self.expiry.as_millis()).unwrap_or(i64::MAX)
    }
}

/// Per-write options.
#[derive(Debug, Clone, Default)]
pub struct SetOptions {
    /// Version to stamp; defaults to the cache's current schema version.
    pub version: Option<String>,
    /// Tags for group invalidation.
    pub tags: Vec<String>,
}

impl SetOptions {
    pub fn tagged<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            version: None,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// What happened to a write. Callers may ignore it; nothing assumes the value
/// was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// Written, after evicting `evicted` older entries.
    Stored { evicted: usize },
    /// The entry alone exceeds the store capacity.
    TooLarge { size: usize, capacity: usize },
    /// Every owned entry was evicted and there is still no room.
    NoSpace { size: usize },
    /// The value could not be serialized.
    SerializeFailed,
    /// The store rejected the write twice.
    StoreFailed,
}

impl SetOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, SetOutcome::Stored { .. })
    }
}

/// Aggregate view of the entries this cache owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_items: usize,
    /// Bytes, counting storage keys.
    pub total_size: usize,
    /// Timestamp (epoch ms) of the oldest entry.
    pub oldest_item: Option<i64>,
    /// Timestamp (epoch ms) of the newest entry.
    pub newest_item: Option<i64>,
    pub items_by_tag: BTreeMap<String, usize>,
    pub average_item_size: usize,
    /// Owned keys whose value could not be decoded.
    pub corrupt_items: usize,
}

/// Versioned, tagged cache over a capacity-bounded store.
///
/// Construct one per concern; several caches with different namespaces can
/// share one store.
pub struct AdvancedCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: CacheConfig,
    next_seq: AtomicU64,
}

impl AdvancedCache {
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), config)
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: CacheConfig,
    ) -> Self {
        let prefix = format!("{}:", config.namespace);
        let next_seq = store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .filter_map(|k| store.get_item(&k))
            .filter_map(|raw| EntryHeader::decode(&raw).ok())
            .map(|h| h.seq + 1)
            .max()
            .unwrap_or(0);
        Self {
            store,
            clock,
            config,
            next_seq: AtomicU64::new(next_seq),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// The underlying store, shared with any other holders.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    fn prefix(&self) -> String {
        format!("{}:", self.config.namespace)
    }

    fn storage_key(&self, key: &str) -> String {
        format!("{}:{key}", self.config.namespace)
    }

    fn owned_keys(&self) -> Vec<String> {
        let prefix = self.prefix();
        self.store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(&prefix))
            .collect()
    }

    /// Store `value` under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, options: SetOptions) -> SetOutcome {
        let version = options
            .version
            .unwrap_or_else(|| self.config.schema_version.clone());
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let entry = CacheEntry::new(value, self.clock.now_ms(), version)
            .with_tags(options.tags)
            .with_seq(seq);

        let raw = match entry.encode() {
            Ok(raw) => raw,
            Err(e) => {
                warn!("cache: failed to serialize {key}: {e}");
                return SetOutcome::SerializeFailed;
            }
        };

        let storage_key = self.storage_key(key);
        let size = item_size(&storage_key, &raw);
        let capacity = self.store.capacity_bytes();
        if size > capacity {
            warn!("cache: {key} is {size} bytes, larger than the {capacity} byte store; not cached");
            return SetOutcome::TooLarge { size, capacity };
        }

        let Some(mut evicted) = self.make_room(&storage_key, size) else {
            warn!("cache: no room for {key} ({size} bytes) after evicting every entry");
            return SetOutcome::NoSpace { size };
        };

        if let Err(e) = self.store.set_item(&storage_key, &raw) {
            warn!("cache: write of {key} failed ({e}), evicting and retrying once");
            if self.evict_oldest().is_some() {
                evicted += 1;
            }
            if let Err(e) = self.store.set_item(&storage_key, &raw) {
                warn!("cache: write of {key} failed again, continuing without it: {e}");
                return SetOutcome::StoreFailed;
            }
        }

        debug!("cache: stored {key} ({size} bytes, {evicted} evicted)");
        SetOutcome::Stored { evicted }
    }

    /// Read the value under `key`.
    ///
    /// Entries written under another schema version or older than the expiry
    /// window are removed and reported as absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let storage_key = self.storage_key(key);
        let Some(raw) = self.store.get_item(&storage_key) else {
            debug!("cache miss: {key}");
            return None;
        };

        let header = match EntryHeader::decode(&raw) {
            Ok(header) => header,
            Err(e) => {
                warn!("cache: unreadable entry {key}: {e}");
                return None;
            }
        };

        if header.version != self.config.schema_version {
            debug!(
                "cache: dropping {key}, version {} != {}",
                header.version, self.config.schema_version
            );
            self.store.remove_item(&storage_key);
            return None;
        }

        if header.is_expired(self.clock.now_ms(), self.config.expiry_ms()) {
            debug!("cache: dropping expired {key}");
            self.store.remove_item(&storage_key);
            return None;
        }

        match CacheEntry::<T>::decode(&raw) {
            Ok(entry) => {
                debug!("cache hit: {key}");
                Some(entry.value)
            }
            Err(e) => {
                warn!("cache: entry {key} does not match the requested type: {e}");
                None
            }
        }
    }

    /// Whether a live entry exists under `key`. Stale entries are removed.
    pub fn contains(&self, key: &str) -> bool {
        self.get::<serde_json::Value>(key).is_some()
    }

    /// Remove `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> bool {
        let storage_key = self.storage_key(key);
        let existed = self.store.get_item(&storage_key).is_some();
        self.store.remove_item(&storage_key);
        existed
    }

    /// Remove every entry carrying at least one of `tags`.
    ///
    /// Entries that cannot be decoded are skipped, not fatal.
    pub fn clear_by_tags<S: AsRef<str>>(&self, tags: &[S]) -> usize {
        let mut removed = 0;
        for storage_key in self.owned_keys() {
            let Some(raw) = self.store.get_item(&storage_key) else {
                continue;
            };
            let header = match EntryHeader::decode(&raw) {
                Ok(header) => header,
                Err(e) => {
                    debug!("cache: skipping unreadable {storage_key} during tag clear: {e}");
                    continue;
                }
            };
            if tags.iter().any(|t| header.tags.contains(t.as_ref())) {
                self.store.remove_item(&storage_key);
                removed += 1;
            }
        }

        let tag_list: Vec<&str> = tags.iter().map(AsRef::as_ref).collect();
        info!("cache: cleared {removed} entries tagged {tag_list:?}");
        removed
    }

    /// Remove every entry this cache owns.
    pub fn clear(&self) -> usize {
        let keys = self.owned_keys();
        for key in &keys {
            self.store.remove_item(key);
        }
        info!("cache: cleared {} entries", keys.len());
        keys.len()
    }

    /// Remove all expired and version-mismatched entries in one scan.
    /// Undecodable entries are left for eviction.
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now_ms();
        let expiry_ms = self.config.expiry_ms();
        let mut removed = 0;

        for storage_key in self.owned_keys() {
            let Some(raw) = self.store.get_item(&storage_key) else {
                continue;
            };
            let stale = match EntryHeader::decode(&raw) {
                Ok(header) => {
                    header.version != self.config.schema_version
                        || header.is_expired(now, expiry_ms)
                }
                Err(_) => false,
            };
            if stale {
                self.store.remove_item(&storage_key);
                removed += 1;
            }
        }

        if removed > 0 {
            info!("cache: purged {removed} stale entries");
        }
        removed
    }

    /// Aggregate statistics over owned entries.
    pub fn get_stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();

        for storage_key in self.owned_keys() {
            let Some(raw) = self.store.get_item(&storage_key) else {
                continue;
            };
            let Ok(header) = EntryHeader::decode(&raw) else {
                stats.corrupt_items += 1;
                continue;
            };

            stats.total_items += 1;
            stats.total_size += item_size(&storage_key, &raw);
            stats.oldest_item = Some(
                stats
                    .oldest_item
                    .map_or(header.timestamp, |t| t.min(header.timestamp)),
            );
            stats.newest_item = Some(
                stats
                    .newest_item
                    .map_or(header.timestamp, |t| t.max(header.timestamp)),
            );
            for tag in header.tags {
                *stats.items_by_tag.entry(tag).or_default() += 1;
            }
        }

        if stats.total_items > 0 {
            stats.average_item_size = stats.total_size / stats.total_items;
        }
        stats
    }

    /// Evict owned entries, oldest first, until `size` more bytes fit under
    /// `storage_key`. Returns the number evicted, or `None` if it never fits.
    fn make_room(&self, storage_key: &str, size: usize) -> Option<usize> {
        let capacity = self.store.capacity_bytes();
        let mut evicted = 0;
        loop {
            let existing = self
                .store
                .get_item(storage_key)
                .map(|v| item_size(storage_key, &v))
                .unwrap_or(0);
            let used = self.store.used_bytes().saturating_sub(existing);
            if used + size <= capacity {
                return Some(evicted);
            }
            self.evict_oldest()?;
            evicted += 1;
        }
    }

    /// Remove the single oldest owned entry. Undecodable entries go first.
    fn evict_oldest(&self) -> Option<String> {
        let oldest = self
            .owned_keys()
            .into_iter()
            .filter_map(|key| {
                let raw = self.store.get_item(&key)?;
                let rank = EntryHeader::decode(&raw)
                    .map(|h| h.age_rank())
                    .unwrap_or((i64::MIN, 0));
                Some((rank, key))
            })
            .min_by_key(|(rank, _)| *rank)
            .map(|(_, key)| key)?;

        debug!("cache: evicting {oldest}");
        self.store.remove_item(&oldest);
        Some(oldest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn cache_with(capacity: usize) -> (Arc<MemoryStore>, Arc<ManualClock>, AdvancedCache) {
        let store = Arc::new(MemoryStore::new(capacity));
        let clock = Arc::new(ManualClock::new(1_000_000));
        let cache = AdvancedCache::with_clock(store.clone(), clock.clone(), CacheConfig::default());
        (store, clock, cache)
    }

    #[test]
    fn round_trip() {
        let (_, _, cache) = cache_with(10_000);
        let outcome = cache.set("k", &vec!["a".to_string(), "b".to_string()], SetOptions::default());
        assert_eq!(outcome, SetOutcome::Stored { evicted: 0 });
        let value: Vec<String> = cache.get("k").unwrap();
        assert_eq!(value, vec!["a", "b"]);
    }

    #[test]
    fn keys_are_namespaced() {
        let (store, _, cache) = cache_with(10_000);
        cache.set("quiz-1", &1, SetOptions::default());
        assert!(store.get_item("learnpath:quiz-1").is_some());
        assert!(store.get_item("quiz-1").is_none());
    }

    #[test]
    fn miss_on_wrong_type() {
        let (_, _, cache) = cache_with(10_000);
        cache.set("k", &"text", SetOptions::default());
        assert!(cache.get::<u32>("k").is_none());
        assert_eq!(cache.get::<String>("k").as_deref(), Some("text"));
    }

    #[test]
    fn explicit_old_version_is_not_served() {
        let (store, _, cache) = cache_with(10_000);
        cache.set("k", &1, SetOptions::default().with_version("0.9.0"));
        assert!(cache.get::<u32>("k").is_none());
        assert!(store.get_item("learnpath:k").is_none());
    }

    #[test]
    fn too_large_fails_fast() {
        let (store, _, cache) = cache_with(64);
        let outcome = cache.set("big", &"x".repeat(200), SetOptions::default());
        assert!(matches!(outcome, SetOutcome::TooLarge { capacity: 64, .. }));
        assert!(store.keys().is_empty());
    }

    #[test]
    fn no_space_when_foreign_keys_fill_the_store() {
        let (store, _, cache) = cache_with(120);
        store.set_item("someone-else", &"x".repeat(90)).unwrap();
        let outcome = cache.set("k", &"y".repeat(20), SetOptions::default());
        assert!(matches!(outcome, SetOutcome::NoSpace { .. }));
        assert!(store.get_item("someone-else").is_some());
    }

    #[test]
    fn remove_and_contains() {
        let (_, _, cache) = cache_with(10_000);
        cache.set("k", &1, SetOptions::default());
        assert!(cache.contains("k"));
        assert!(cache.remove("k"));
        assert!(!cache.remove("k"));
        assert!(!cache.contains("k"));
    }

    #[test]
    fn purge_stale_drops_expired_and_old_versions() {
        let (_, clock, cache) = cache_with(10_000);
        cache.set("old", &1, SetOptions::default());
        cache.set("legacy", &1, SetOptions::default().with_version("0.1.0"));
        clock.advance_ms(60 * 60 * 1000);
        cache.set("fresh", &1, SetOptions::default());
        clock.advance_ms(23 * 60 * 60 * 1000 + 1);

        assert_eq!(cache.purge_stale(), 2);
        assert!(cache.contains("fresh"));
    }

    #[test]
    fn stats_summarize_owned_entries() {
        let (store, clock, cache) = cache_with(10_000);
        store.set_item("foreign", "ignored").unwrap();
        cache.set("a", &1, SetOptions::tagged(["quiz"]));
        clock.advance_ms(10);
        cache.set("b", &2, SetOptions::tagged(["quiz", "roadmap"]));
        store.set_item("learnpath:broken", "{").unwrap();

        let stats = cache.get_stats();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.corrupt_items, 1);
        assert_eq!(stats.oldest_item, Some(1_000_000));
        assert_eq!(stats.newest_item, Some(1_000_010));
        assert_eq!(stats.items_by_tag.get("quiz"), Some(&2));
        assert_eq!(stats.items_by_tag.get("roadmap"), Some(&1));
        assert_eq!(stats.average_item_size, stats.total_size / 2);
    }

    #[test]
    fn empty_stats() {
        let (_, _, cache) = cache_with(10_000);
        assert_eq!(cache.get_stats(), CacheStats::default());
    }

    #[test]
    fn clear_leaves_foreign_keys() {
        let (store, _, cache) = cache_with(10_000);
        store.set_item("theme", "dark").unwrap();
        cache.set("a", &1, SetOptions::default());
        cache.set("b", &2, SetOptions::default());
        assert_eq!(cache.clear(), 2);
        assert_eq!(store.keys(), vec!["theme".to_string()]);
    }

    #[test]
    fn extreme_timestamp_is_a_miss() {
        let (store, _, cache) = cache_with(10_000);
        store
            .set_item(
                "learnpath:k",
                r#"{"value":1,"timestamp":-9223372036854775808,"version":"1.0.0","tags":[]}"#,
            )
            .unwrap();
        assert!(cache.get::<u32>("k").is_none());
        assert!(store.get_item("learnpath:k").is_none());
        assert_eq!(cache.purge_stale(), 0);
    }

    #[test]
    fn same_millisecond_writes_evict_in_write_order() {
        let (store, _, cache) = cache_with(500);
        cache.set("zeta", &"x".repeat(60), SetOptions::default());
        cache.set("alpha", &"x".repeat(60), SetOptions::default());
        cache.set("mid", &"x".repeat(60), SetOptions::default());

        let outcome = cache.set("next", &"y".repeat(60), SetOptions::default());
        assert_eq!(outcome, SetOutcome::Stored { evicted: 1 });
        assert!(store.get_item("learnpath:zeta").is_none());
        assert!(cache.contains("alpha"));
        assert!(cache.contains("mid"));
    }

    #[test]
    fn write_order_survives_reopening_the_store() {
        let (store, clock, cache) = cache_with(500);
        cache.set("b", &"x".repeat(60), SetOptions::default());
        drop(cache);

        let reopened =
            AdvancedCache::with_clock(store.clone(), clock.clone(), CacheConfig::default());
        reopened.set("a", &"x".repeat(60), SetOptions::default());
        reopened.set("c", &"x".repeat(60), SetOptions::default());
        reopened.set("d", &"y".repeat(60), SetOptions::default());

        assert!(store.get_item("learnpath:b").is_none());
        assert!(reopened.contains("a"));
    }

    #[test]
    fn purge_leaves_corrupt_entries() {
        let (store, _, cache) = cache_with(10_000);
        store.set_item("learnpath:junk", "{").unwrap();
        assert_eq!(cache.purge_stale(), 0);
        assert!(store.get_item("learnpath:junk").is_some());
    }

    #[test]
    fn corrupt_entries_are_evicted_first() {
        let (store, clock, cache) = cache_with(420);
        cache.set("good", &"x".repeat(100), SetOptions::default());
        store.set_item("learnpath:junk", &"z".repeat(100)).unwrap();
        clock.advance_ms(1);

        let outcome = cache.set("next", &"y".repeat(150), SetOptions::default());
        assert_eq!(outcome, SetOutcome::Stored { evicted: 1 });
        assert!(store.get_item("learnpath:junk").is_none());
        assert!(cache.contains("good"));
    }
}
