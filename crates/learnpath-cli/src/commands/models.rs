//! The `learnpath models` command.

use std::path::PathBuf;

use anyhow::Result;

use learnpath_providers::load_config_from;

pub fn execute(provider: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let provider = config.provider(provider.as_deref())?;
    let models = provider.available_models();

    println!("Provider: {}", provider.name());
    if models.is_empty() {
        println!("  (models depend on the server; pass --model explicitly)");
    }
    for model in &models {
        let marker = if model.id == config.default_model {
            " (default)"
        } else {
            ""
        };
        println!(
            "  {} - {} ({}K context){marker}",
            model.id,
            model.name,
            model.max_context / 1000,
        );
    }

    Ok(())
}
