//! learnpath-core: Data model, validators, quiz analysis and the generation
//! engine.
//!
//! The engine sits between an untrusted text generator and the rest of the
//! system: it checks the cache, asks the provider, strips and parses the
//! response, validates its structure, and only then caches and returns it.

pub mod analysis;
pub mod cache_key;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod model;
pub mod traits;
pub mod validate;
