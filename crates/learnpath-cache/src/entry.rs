//! Versioned cache entry codec.

use std::collections::BTreeSet;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A stored value plus the metadata that drives expiry, version isolation and
/// tag-scoped eviction.
///
/// Serialized as `{"value": .., "timestamp": .., "version": "..", "tags": [..], "seq": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached payload.
    pub value: T,
    /// Creation time in epoch milliseconds.
    pub timestamp: i64,
    /// Schema version the payload was written under.
    pub version: String,
    /// Free-form labels for group invalidation.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Write order within one cache, breaking timestamp ties on eviction.
    #[serde(default)]
    pub seq: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T, timestamp: i64, version: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            version: version.into(),
            tags: BTreeSet::new(),
            seq: 0,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }
}

impl<T: Serialize> CacheEntry<T> {
    pub fn encode(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<T: DeserializeOwned> CacheEntry<T> {
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// Entry metadata without the payload, for scans that never need the value.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct EntryHeader {
    pub timestamp: i64,
    pub version: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub seq: u64,
}

impl EntryHeader {
    pub fn decode(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Strictly older than `expiry_ms`. Timestamps far outside the clock's
    /// range saturate instead of overflowing.
    pub fn is_expired(&self, now_ms: i64, expiry_ms: i64) -> bool {
        now_ms.saturating_sub(self.timestamp) > expiry_ms
    }

    /// Eviction order: oldest timestamp first, then earliest write.
    pub fn age_rank(&self) -> (i64, u64) {
        (self.timestamp, self.seq)
    }
}
