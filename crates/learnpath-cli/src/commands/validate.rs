//! The `learnpath validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ValueEnum;

use learnpath_core::traits::extract_json_from_response;
use learnpath_core::validate::{quiz_issues, roadmap_issues, QuizPolicy};
use learnpath_providers::load_config_from;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DocumentKind {
    Quiz,
    Roadmap,
}

impl DocumentKind {
    fn label(self) -> &'static str {
        match self {
            DocumentKind::Quiz => "quiz",
            DocumentKind::Roadmap => "roadmap",
        }
    }
}

pub fn execute(
    kind: DocumentKind,
    path: PathBuf,
    lenient: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&extract_json_from_response(&content))
        .with_context(|| format!("{} is not valid JSON", path.display()))?;

    let issues = match kind {
        DocumentKind::Quiz => {
            let policy = if lenient {
                QuizPolicy::lenient()
            } else {
                load_config_from(config_path.as_deref())?.quiz
            };
            quiz_issues(&value, &policy)
        }
        DocumentKind::Roadmap => roadmap_issues(&value),
    };

    if issues.is_empty() {
        println!("{} is a valid {}.", path.display(), kind.label());
        return Ok(());
    }
    for issue in &issues {
        println!("  INVALID: {issue}");
    }
    anyhow::bail!("{} issue(s) found in {}", issues.len(), path.display())
}
