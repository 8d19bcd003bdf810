//! Behavioral properties of the cache over shared stores.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use learnpath_cache::{
    AdvancedCache, CacheConfig, KeyValueStore, ManualClock, MemoryStore, SetOptions, SetOutcome,
    StoreError,
};
use serde::{Deserialize, Serialize};

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Lesson {
    title: String,
    minutes: u32,
    tags: Vec<String>,
}

fn lesson(title: &str) -> Lesson {
    Lesson {
        title: title.into(),
        minutes: 45,
        tags: vec!["intro".into(), "rust".into()],
    }
}

fn cache_on(store: Arc<dyn KeyValueStore>, clock: Arc<ManualClock>) -> AdvancedCache {
    AdvancedCache::with_clock(store, clock, CacheConfig::default())
}

/// Store that rejects the next `failures` writes, as if another tab had just
/// filled the quota.
struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicUsize,
}

impl KeyValueStore for FlakyStore {
    fn get_item(&self, key: &str) -> Option<String> {
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::QuotaExceeded {
                needed: value.len(),
                available: 0,
            });
        }
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) {
        self.inner.remove_item(key)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }

    fn used_bytes(&self) -> usize {
        self.inner.used_bytes()
    }

    fn capacity_bytes(&self) -> usize {
        self.inner.capacity_bytes()
    }
}

#[test]
fn set_then_get_returns_equal_value() {
    let store = Arc::new(MemoryStore::default());
    let cache = cache_on(store, Arc::new(ManualClock::new(0)));

    let value = lesson("Ownership");
    assert!(cache
        .set("lesson-1", &value, SetOptions::tagged(["lessons"]))
        .is_stored());
    assert_eq!(cache.get::<Lesson>("lesson-1"), Some(value));
}

#[test]
fn expired_entries_are_removed_on_read() {
    let store = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(5 * HOUR_MS));
    let cache = cache_on(store, clock.clone());

    cache.set("lesson", &lesson("Traits"), SetOptions::default());
    clock.advance_ms(24 * HOUR_MS);
    assert!(cache.get::<Lesson>("lesson").is_some(), "exactly 24h is still fresh");
    assert_eq!(cache.get_stats().total_items, 1);

    clock.advance_ms(1);
    assert!(cache.get::<Lesson>("lesson").is_none());
    assert_eq!(cache.get_stats().total_items, 0);
}

#[test]
fn bumping_the_schema_version_isolates_old_entries() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(0));

    let v1 = AdvancedCache::with_clock(
        store.clone(),
        clock.clone(),
        CacheConfig::default().with_schema_version("1.0.0"),
    );
    v1.set("lesson", &lesson("Lifetimes"), SetOptions::default());

    let v2 = AdvancedCache::with_clock(
        store.clone(),
        clock,
        CacheConfig::default().with_schema_version("1.0.1"),
    );
    assert!(v2.get::<Lesson>("lesson").is_none());
    assert!(store.keys().is_empty(), "stale entry is removed on read");
}

#[test]
fn eviction_is_strictly_oldest_first() {
    let clock = Arc::new(ManualClock::new(1_000_000));

    // Measure one entry so the real store holds exactly three.
    let sizing = Arc::new(MemoryStore::default());
    cache_on(sizing.clone(), clock.clone()).set("a", &"x".repeat(64), SetOptions::default());
    let entry_size = sizing.used_bytes();

    let store = Arc::new(MemoryStore::new(entry_size * 3 + entry_size / 2));
    let cache = cache_on(store.clone(), clock.clone());

    for key in ["a", "b", "c"] {
        assert_eq!(
            cache.set(key, &"x".repeat(64), SetOptions::default()),
            SetOutcome::Stored { evicted: 0 }
        );
        clock.advance_ms(1);
    }

    assert_eq!(
        cache.set("d", &"x".repeat(64), SetOptions::default()),
        SetOutcome::Stored { evicted: 1 }
    );
    assert!(!cache.contains("a"));
    assert!(cache.contains("b") && cache.contains("c") && cache.contains("d"));

    clock.advance_ms(1);
    cache.set("e", &"x".repeat(64), SetOptions::default());
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));

    clock.advance_ms(1);
    cache.set("f", &"x".repeat(64), SetOptions::default());
    assert!(!cache.contains("c"));
    assert!(cache.contains("d") && cache.contains("e") && cache.contains("f"));
}

#[test]
fn tag_clear_survives_corrupt_entries() {
    let store = Arc::new(MemoryStore::default());
    let cache = cache_on(store.clone(), Arc::new(ManualClock::new(0)));

    cache.set("roadmap-1", &1, SetOptions::tagged(["roadmap", "goal:rust"]));
    cache.set("roadmap-2", &2, SetOptions::tagged(["roadmap"]));
    cache.set("quiz-1", &3, SetOptions::tagged(["quiz"]));
    cache.set("plain", &4, SetOptions::default());
    store.set_item("learnpath:corrupt", "{not json").unwrap();
    store.set_item("unrelated", "value").unwrap();

    assert_eq!(cache.clear_by_tags(&["roadmap"]), 2);
    assert!(!cache.contains("roadmap-1"));
    assert!(!cache.contains("roadmap-2"));
    assert_eq!(cache.get::<u32>("quiz-1"), Some(3));
    assert_eq!(cache.get::<u32>("plain"), Some(4));
    assert!(store.get_item("learnpath:corrupt").is_some());
    assert!(store.get_item("unrelated").is_some());
}

#[test]
fn quota_error_triggers_one_eviction_and_retry() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::default(),
        failures: AtomicUsize::new(0),
    });
    let clock = Arc::new(ManualClock::new(0));
    let cache = cache_on(store.clone(), clock.clone());

    cache.set("old", &1, SetOptions::default());
    clock.advance_ms(1);
    cache.set("newer", &2, SetOptions::default());
    clock.advance_ms(1);

    store.failures.store(1, Ordering::SeqCst);
    assert_eq!(
        cache.set("incoming", &3, SetOptions::default()),
        SetOutcome::Stored { evicted: 1 }
    );
    assert!(!cache.contains("old"));
    assert_eq!(cache.get::<u32>("newer"), Some(2));
    assert_eq!(cache.get::<u32>("incoming"), Some(3));
}

#[test]
fn persistent_store_failure_is_swallowed() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::default(),
        failures: AtomicUsize::new(2),
    });
    let cache = cache_on(store.clone(), Arc::new(ManualClock::new(0)));

    assert_eq!(
        cache.set("k", &1, SetOptions::default()),
        SetOutcome::StoreFailed
    );
    assert!(cache.get::<u32>("k").is_none());
}

#[test]
fn namespaces_share_a_store_without_interfering() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::default());
    let clock = Arc::new(ManualClock::new(0));
    let quizzes = AdvancedCache::with_clock(
        store.clone(),
        clock.clone(),
        CacheConfig::default().with_namespace("quizzes"),
    );
    let courses = AdvancedCache::with_clock(
        store.clone(),
        clock,
        CacheConfig::default().with_namespace("courses"),
    );

    quizzes.set("rust", &"quiz", SetOptions::default());
    courses.set("rust", &"course", SetOptions::default());

    assert_eq!(quizzes.clear(), 1);
    assert_eq!(courses.get::<String>("rust").as_deref(), Some("course"));
    assert_eq!(courses.get_stats().total_items, 1);
}

#[test]
fn overwriting_a_key_reuses_its_space() {
    let clock = Arc::new(ManualClock::new(1_000_000));
    let sizing = Arc::new(MemoryStore::default());
    cache_on(sizing.clone(), clock.clone()).set("a", &"x".repeat(64), SetOptions::default());
    let entry_size = sizing.used_bytes();

    let store = Arc::new(MemoryStore::new(entry_size * 2));
    let cache = cache_on(store, clock.clone());
    cache.set("a", &"x".repeat(64), SetOptions::default());
    clock.advance_ms(1);
    cache.set("b", &"x".repeat(64), SetOptions::default());
    clock.advance_ms(1);

    assert_eq!(
        cache.set("b", &"y".repeat(64), SetOptions::default()),
        SetOutcome::Stored { evicted: 0 }
    );
    assert!(cache.contains("a"));
    assert_eq!(cache.get::<String>("b"), Some("y".repeat(64)));
}
