//! The `learnpath init` command.

use anyhow::Result;

use learnpath_providers::config::{CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML};

pub fn execute() -> Result<()> {
    if std::path::Path::new(CONFIG_FILE_NAME).exists() {
        println!("{CONFIG_FILE_NAME} already exists, skipping.");
    } else {
        std::fs::write(CONFIG_FILE_NAME, DEFAULT_CONFIG_TOML)?;
        println!("Created {CONFIG_FILE_NAME}");
    }

    println!("\nNext steps:");
    println!("  1. Export GEMINI_API_KEY (and optionally YOUTUBE_API_KEY)");
    println!("  2. Run: learnpath quiz --goal \"Learn Rust\" --output quiz.json");
    println!("  3. Run: learnpath analyze --quiz quiz.json --responses answers.json");
    println!("  4. Run: learnpath roadmap --goal \"Learn Rust\" --analysis analysis.json");

    Ok(())
}
