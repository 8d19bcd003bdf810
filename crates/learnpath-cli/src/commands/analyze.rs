//! The `learnpath analyze` command.

use std::path::PathBuf;

use anyhow::Result;

use learnpath_core::analysis::{analyze_quiz_responses, score_responses};
use learnpath_core::model::{QuizData, QuizResponse};

use super::{read_json, write_json};

pub fn execute(
    quiz_path: PathBuf,
    responses_path: PathBuf,
    skill_level: f64,
    output: Option<PathBuf>,
) -> Result<()> {
    anyhow::ensure!(
        (1.0..=5.0).contains(&skill_level),
        "skill level must be between 1 and 5"
    );

    let mut quiz: QuizData = read_json(&quiz_path)?;
    quiz.assign_missing_ids();
    let responses: Vec<QuizResponse> = read_json(&responses_path)?;

    let scored = score_responses(&quiz.questions, &responses);
    let unmatched = scored.iter().filter(|r| r.points.is_none()).count();
    if unmatched > 0 {
        eprintln!("Warning: {unmatched} response(s) do not match any question");
    }
    let correct = scored.iter().filter(|r| r.is_correct == Some(true)).count();

    let analysis = analyze_quiz_responses(&quiz.questions, &responses, skill_level);

    eprintln!(
        "Score: {:.1}/{:.1} ({correct} fully correct), adjusted level {:.1}",
        analysis.total_score, analysis.max_possible_score, analysis.adjusted_skill_level.overall
    );
    if !analysis.strength_areas.is_empty() {
        eprintln!("Strengths: {}", analysis.strength_areas.join(", "));
    }
    for gap in &analysis.knowledge_gaps {
        eprintln!(
            "Gap: {} (level {}/5) {}",
            gap.area,
            gap.current_level,
            gap.concepts.join(", ")
        );
    }

    write_json(&analysis, output.as_ref())
}
