//! Configuration loading, provider factory and cache construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use learnpath_cache::{
    AdvancedCache, CacheConfig, FileStore, KeyValueStore, MemoryStore, DEFAULT_CAPACITY_BYTES,
};
use learnpath_core::engine::{EngineConfig, DEFAULT_MODEL};
use learnpath_core::traits::{LlmProvider, ResourceLookup};
use learnpath_core::validate::QuizPolicy;

use crate::aggregate::AggregateLookup;
use crate::gemini::GeminiProvider;
use crate::mock::MockProvider;
use crate::youtube::YouTubeLookup;

pub const CONFIG_FILE_NAME: &str = "learnpath.toml";

/// Configuration for a single provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        #[serde(default)]
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
    Mock {
        /// Prompt substring → response text, on top of the canned samples.
        #[serde(default)]
        responses: HashMap<String, String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .finish(),
            ProviderConfig::Mock { responses } => f
                .debug_struct("Mock")
                .field("responses", &responses.len())
                .finish(),
        }
    }
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// JSON file backing the store. `None` uses the per-user cache directory.
    pub path: Option<PathBuf>,
    /// Keep entries in memory only.
    pub in_memory: bool,
    /// Hard store capacity in bytes.
    pub capacity_bytes: usize,
    pub namespace: String,
    pub schema_version: String,
    pub expiry_hours: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        let defaults = CacheConfig::default();
        Self {
            path: None,
            in_memory: false,
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            namespace: defaults.namespace,
            schema_version: defaults.schema_version,
            expiry_hours: defaults.expiry.as_secs() / 3600,
        }
    }
}

impl CacheSettings {
    /// Where the file store lives, if it is file-backed.
    pub fn store_path(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        self.path.clone().or_else(|| {
            std::env::var("HOME").ok().map(|h| {
                PathBuf::from(h)
                    .join(".cache")
                    .join("learnpath")
                    .join("store.json")
            })
        })
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig::default()
            .with_namespace(self.namespace.clone())
            .with_schema_version(self.schema_version.clone())
            .with_expiry(Duration::from_secs(self.expiry_hours * 3600))
    }

    /// Open the configured store and wrap it in a cache.
    pub fn open(&self) -> Result<AdvancedCache> {
        let store: Arc<dyn KeyValueStore> = match self.store_path() {
            Some(path) => {
                debug!("opening cache store at {}", path.display());
                Arc::new(
                    FileStore::open(&path, self.capacity_bytes)
                        .with_context(|| format!("failed to open cache store: {}", path.display()))?,
                )
            }
            None => Arc::new(MemoryStore::new(self.capacity_bytes)),
        };
        Ok(AdvancedCache::new(store, self.cache_config()))
    }
}

/// `[resources]` section.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    /// YouTube Data API key; resource lookup is disabled without one.
    pub youtube_api_key: Option<String>,
    pub youtube_base_url: Option<String>,
    /// Drop resources whose URL does not answer a HEAD request.
    pub verify_urls: bool,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            youtube_base_url: None,
            verify_urls: true,
        }
    }
}

impl std::fmt::Debug for ResourceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceSettings")
            .field("youtube_api_key", &self.youtube_api_key.as_ref().map(|_| "***"))
            .field("youtube_base_url", &self.youtube_base_url)
            .field("verify_urls", &self.verify_urls)
            .finish()
    }
}

impl ResourceSettings {
    /// A lookup over every configured source, or `None` if there are none.
    pub fn lookup(&self) -> Option<Box<dyn ResourceLookup>> {
        let mut sources: Vec<Box<dyn ResourceLookup>> = Vec::new();
        if let Some(key) = self.youtube_api_key.as_deref().filter(|k| !k.is_empty()) {
            sources.push(Box::new(YouTubeLookup::new(
                key,
                self.youtube_base_url.clone(),
            )));
        }
        if sources.is_empty() {
            return None;
        }

        let lookup = AggregateLookup::new(sources);
        Some(Box::new(if self.verify_urls {
            lookup
        } else {
            lookup.without_url_check()
        }))
    }
}

/// Top-level learnpath configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearnpathConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Default provider to use.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Default model to use.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Overrides both the quiz and roadmap sampling temperatures.
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Retries after the first attempt on provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub quiz: QuizPolicy,
    #[serde(default)]
    pub resources: ResourceSettings,
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    2048
}
fn default_retries() -> u32 {
    2
}
fn default_retry_delay() -> u64 {
    1000
}

impl Default for LearnpathConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: None,
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            cache: CacheSettings::default(),
            quiz: QuizPolicy::default(),
            resources: ResourceSettings::default(),
        }
    }
}

impl LearnpathConfig {
    /// Engine settings, with an optional model override.
    pub fn engine_config(&self, model: Option<&str>) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            model: model.unwrap_or(&self.default_model).to_string(),
            quiz_temperature: self.temperature.unwrap_or(defaults.quiz_temperature),
            roadmap_temperature: self.temperature.unwrap_or(defaults.roadmap_temperature),
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            quiz_policy: self.quiz.clone(),
        }
    }

    /// Build the named provider, or the default one.
    ///
    /// `mock` works without a config entry; `gemini` needs a key.
    pub fn provider(&self, name: Option<&str>) -> Result<Box<dyn LlmProvider>> {
        let name = name.unwrap_or(&self.default_provider);
        match self.providers.get(name) {
            Some(config) => create_provider(name, config),
            None => match name {
                "mock" => create_provider(
                    name,
                    &ProviderConfig::Mock {
                        responses: HashMap::new(),
                    },
                ),
                "gemini" => anyhow::bail!(
                    "no API key for provider 'gemini'; set LEARNPATH_GEMINI_KEY or add \
                     [providers.gemini] to {CONFIG_FILE_NAME}"
                ),
                other => anyhow::bail!("provider '{other}' is not configured"),
            },
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => ProviderConfig::Gemini {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
        },
        ProviderConfig::Mock { responses } => ProviderConfig::Mock {
            responses: responses.clone(),
        },
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `learnpath.toml` in the current directory
/// 2. `~/.config/learnpath/config.toml`
///
/// Environment variable overrides: `LEARNPATH_GEMINI_KEY`, `LEARNPATH_YOUTUBE_KEY`.
pub fn load_config() -> Result<LearnpathConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<LearnpathConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            debug!("loading config from {}", path.display());
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<LearnpathConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => LearnpathConfig::default(),
    };

    // Apply env var overrides
    if let Ok(key) = std::env::var("LEARNPATH_GEMINI_KEY") {
        let entry = config
            .providers
            .entry("gemini".into())
            .or_insert(ProviderConfig::Gemini {
                api_key: String::new(),
                base_url: None,
            });
        if let ProviderConfig::Gemini { api_key, .. } = entry {
            *api_key = key;
        }
    }
    if let Ok(key) = std::env::var("LEARNPATH_YOUTUBE_KEY") {
        config.resources.youtube_api_key = Some(key);
    }

    // Resolve env vars in all provider configs
    config.providers = config
        .providers
        .iter()
        .map(|(k, v)| (k.clone(), resolve_provider_config(v)))
        .collect();
    config.resources.youtube_api_key = config
        .resources
        .youtube_api_key
        .as_deref()
        .map(resolve_env_vars);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("learnpath"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::Gemini { api_key, base_url } => {
            if api_key.trim().is_empty() {
                anyhow::bail!("provider '{name}' has an empty api_key");
            }
            Ok(Box::new(GeminiProvider::new(api_key, base_url.clone())))
        }
        ProviderConfig::Mock { responses } => {
            Ok(Box::new(MockProvider::canned(responses.clone())))
        }
    }
}

/// Starter configuration written by `learnpath init`.
pub const DEFAULT_CONFIG_TOML: &str = r#"# learnpath configuration
default_provider = "gemini"
default_model = "gemini-1.5-pro-latest"
max_retries = 2
retry_delay_ms = 1000

[providers.gemini]
type = "gemini"
api_key = "${GEMINI_API_KEY}"

[providers.mock]
type = "mock"

[cache]
capacity_bytes = 5242880
namespace = "learnpath"
schema_version = "1.0.0"
expiry_hours = 24

[quiz]
strict = true
multiple_choice_count = 3
open_ended_count = 2

[resources]
youtube_api_key = "${YOUTUBE_API_KEY}"
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_LEARNPATH_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_LEARNPATH_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_LEARNPATH_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("${_LEARNPATH_UNSET_VAR}"), "");
        assert_eq!(resolve_env_vars("no ${closing"), "no ${closing");
        std::env::remove_var("_LEARNPATH_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = LearnpathConfig::default();
        assert_eq!(config.default_provider, "gemini");
        assert_eq!(config.default_model, "gemini-1.5-pro-latest");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.cache.capacity_bytes, 5 * 1024 * 1024);
        assert_eq!(config.cache.expiry_hours, 24);
        assert!(config.quiz.strict);
    }

    #[test]
    fn starter_config_parses() {
        let config: LearnpathConfig = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        assert_eq!(config.providers.len(), 2);
        assert!(matches!(
            config.providers.get("gemini"),
            Some(ProviderConfig::Gemini { .. })
        ));
        assert_eq!(config.quiz.multiple_choice_count, Some(3));
        assert_eq!(config.cache.namespace, "learnpath");
    }

    #[test]
    fn engine_config_applies_overrides() {
        let toml_str = r#"
default_model = "gemini-1.5-flash-latest"
temperature = 0.5
max_retries = 0
retry_delay_ms = 250

[quiz]
strict = false
"#;
        let config: LearnpathConfig = toml::from_str(toml_str).unwrap();
        let engine = config.engine_config(None);
        assert_eq!(engine.model, "gemini-1.5-flash-latest");
        assert_eq!(engine.quiz_temperature, 0.5);
        assert_eq!(engine.roadmap_temperature, 0.5);
        assert_eq!(engine.max_retries, 0);
        assert_eq!(engine.retry_delay, Duration::from_millis(250));
        assert!(!engine.quiz_policy.strict);

        assert_eq!(config.engine_config(Some("other")).model, "other");
        assert_eq!(LearnpathConfig::default().engine_config(None).quiz_temperature, 0.3);
    }

    #[test]
    fn debug_masks_api_keys() {
        let config = ProviderConfig::Gemini {
            api_key: "super-secret".into(),
            base_url: None,
        };
        let resources = ResourceSettings {
            youtube_api_key: Some("also-secret".into()),
            ..ResourceSettings::default()
        };
        let rendered = format!("{config:?} {resources:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn builtin_providers_without_config() {
        let config = LearnpathConfig::default();
        assert_eq!(config.provider(Some("mock")).unwrap().name(), "mock");
        let err = config.provider(Some("gemini")).err().unwrap();
        assert!(err.to_string().contains("LEARNPATH_GEMINI_KEY"));
        assert!(config.provider(Some("nope")).is_err());
    }

    #[test]
    fn resource_lookup_needs_a_source() {
        assert!(ResourceSettings::default().lookup().is_none());
        let blank = ResourceSettings {
            youtube_api_key: Some(String::new()),
            ..ResourceSettings::default()
        };
        assert!(blank.lookup().is_none());

        let config: LearnpathConfig = toml::from_str(
            r#"
[resources]
youtube_api_key = "yt"
verify_urls = false
"#,
        )
        .unwrap();
        assert!(!config.resources.verify_urls);
        assert_eq!(config.resources.lookup().unwrap().name(), "aggregate");
        assert!(LearnpathConfig::default().resources.verify_urls);
    }

    #[test]
    fn load_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
default_provider = "mock"

[cache]
in_memory = true
capacity_bytes = 1024
"#,
        )
        .unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        assert_eq!(config.default_provider, "mock");
        assert!(config.cache.store_path().is_none());
        assert_eq!(config.cache.open().unwrap().store().capacity_bytes(), 1024);

        assert!(load_config_from(Some(&dir.path().join("missing.toml"))).is_err());
    }

    #[test]
    fn file_backed_cache_opens_at_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CacheSettings {
            path: Some(dir.path().join("nested").join("store.json")),
            ..CacheSettings::default()
        };
        let cache = settings.open().unwrap();
        cache.set("k", &1, learnpath_cache::SetOptions::default());
        assert!(dir.path().join("nested").join("store.json").exists());
    }
}
