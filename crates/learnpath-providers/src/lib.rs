//! learnpath-providers: Provider integrations and configuration.
//!
//! Implements `LlmProvider` for Gemini and a canned mock, and
//! `ResourceLookup` over the YouTube Data API, aggregated with URL checks.
//! Also loads `learnpath.toml` and builds providers and caches from it.

pub mod aggregate;
pub mod config;
pub mod gemini;
pub mod mock;
pub mod youtube;

pub use aggregate::AggregateLookup;

pub use config::{
    create_provider, load_config, load_config_from, CacheSettings, LearnpathConfig,
    ProviderConfig, ResourceSettings,
};
pub use learnpath_core::error::ProviderError;
