//! learnpath-cache: Versioned, tagged cache over a capacity-bounded store.
//!
//! The cache wraps every value with a timestamp, a schema version and a set of
//! tags, keeps all of its keys under a private namespace, and evicts the
//! oldest entries when the backing store runs out of room.

pub mod cache;
pub mod clock;
pub mod entry;
pub mod error;
pub mod store;

pub use cache::{AdvancedCache, CacheConfig, CacheStats, SetOptions, SetOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::CacheEntry;
pub use error::StoreError;
pub use store::{FileStore, KeyValueStore, MemoryStore, DEFAULT_CAPACITY_BYTES};
