pub mod analyze;
pub mod cache;
pub mod init;
pub mod models;
pub mod quiz;
pub mod roadmap;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

use learnpath_core::engine::LearningPathEngine;
use learnpath_core::traits::LlmProvider;
use learnpath_providers::LearnpathConfig;

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect()
    })
    .unwrap_or_default()
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Pretty-print `value` to `output`, or stdout.
pub fn write_json<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Saved to: {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// Provider, cache and engine settings resolved from the config.
pub fn build_engine(
    config: &LearnpathConfig,
    provider: Option<&str>,
    model: Option<&str>,
) -> Result<LearningPathEngine> {
    let provider: Arc<dyn LlmProvider> = Arc::from(config.provider(provider)?);
    let cache = config.cache.open()?;
    Ok(LearningPathEngine::new(
        provider,
        cache,
        config.engine_config(model),
    ))
}
