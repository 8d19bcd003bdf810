//! The `learnpath quiz` command.

use std::path::PathBuf;

use anyhow::Result;
use tracing::warn;

use learnpath_core::fallback::placeholder_quiz;
use learnpath_core::model::{QuestionType, QuizGenerationInput};
use learnpath_providers::load_config_from;

use super::{build_engine, parse_list, write_json};

pub struct QuizArgs {
    pub goal: String,
    pub skill_level: f64,
    pub hours: f64,
    pub focus: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub no_fallback: bool,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: QuizArgs) -> Result<()> {
    anyhow::ensure!(
        (1.0..=5.0).contains(&args.skill_level),
        "skill level must be between 1 and 5"
    );
    anyhow::ensure!(args.hours > 0.0, "hours per week must be positive");
    anyhow::ensure!(!args.goal.trim().is_empty(), "goal must not be empty");

    let config = load_config_from(args.config.as_deref())?;
    let engine = build_engine(&config, args.provider.as_deref(), args.model.as_deref())?;

    let input = QuizGenerationInput {
        goal: args.goal.trim().to_string(),
        skill_level: args.skill_level,
        focus_areas: parse_list(args.focus.as_deref()),
        time_commitment: args.hours,
    };

    let quiz = match engine.generate_quiz(&input).await {
        Ok(quiz) => quiz,
        Err(e) if !args.no_fallback => {
            warn!("quiz generation failed ({e}); using placeholder quiz");
            placeholder_quiz(&input)
        }
        Err(e) => return Err(e.into()),
    };

    eprintln!(
        "Quiz for '{}': {} questions ({} multiple choice, {} open ended)",
        input.goal,
        quiz.questions.len(),
        quiz.count_of(QuestionType::MultipleChoice),
        quiz.count_of(QuestionType::OpenEnded),
    );
    write_json(&quiz, args.output.as_ref())
}
