//! Store error types.

use thiserror::Error;

/// Errors raised by a [`KeyValueStore`](crate::store::KeyValueStore) write.
///
/// The cache never propagates these; it logs them and degrades to a miss or
/// a lost write.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would push the store past its hard capacity.
    #[error("quota exceeded: need {needed} bytes, {available} available")]
    QuotaExceeded { needed: usize, available: usize },

    /// The backing file could not be read or written.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file held something other than a JSON object of strings.
    #[error("store file is corrupt: {0}")]
    Corrupt(String),
}
