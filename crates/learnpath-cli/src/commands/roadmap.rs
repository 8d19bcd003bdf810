//! The `learnpath roadmap` command.

use std::path::PathBuf;

use anyhow::Result;

use learnpath_core::model::{AssessmentData, QuizAnalysis, RoadmapData};
use learnpath_providers::load_config_from;

use super::{build_engine, parse_list, read_json, write_json};

pub struct RoadmapArgs {
    pub goal: String,
    pub skill_level: f64,
    pub hours: f64,
    pub focus: Option<String>,
    pub learning_style: Option<String>,
    pub weeks: Option<u32>,
    pub analysis: Option<PathBuf>,
    pub resources: bool,
    pub start: Option<u32>,
    pub end: Option<u32>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub async fn execute(args: RoadmapArgs) -> Result<()> {
    anyhow::ensure!(
        (1.0..=5.0).contains(&args.skill_level),
        "skill level must be between 1 and 5"
    );
    anyhow::ensure!(args.hours > 0.0, "hours per week must be positive");
    anyhow::ensure!(!args.goal.trim().is_empty(), "goal must not be empty");
    if let Some(weeks) = args.weeks {
        anyhow::ensure!((1..=52).contains(&weeks), "weeks must be between 1 and 52");
    }

    let config = load_config_from(args.config.as_deref())?;
    let engine = build_engine(&config, args.provider.as_deref(), args.model.as_deref())?;

    let quiz_analysis = match &args.analysis {
        Some(path) => Some(read_json::<QuizAnalysis>(path)?),
        None => None,
    };
    let assessment = AssessmentData {
        goal: args.goal.trim().to_string(),
        skill_level: args.skill_level,
        focus_areas: parse_list(args.focus.as_deref()),
        time_commitment: args.hours,
        learning_style: args
            .learning_style
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        total_weeks: args.weeks,
        quiz_analysis,
    };

    let mut roadmap = engine.generate_roadmap(&assessment).await?;

    if args.resources {
        match config.resources.lookup() {
            Some(lookup) => {
                let attached = engine.attach_resources(&mut roadmap, lookup.as_ref()).await;
                eprintln!("Attached {attached} resources");
            }
            None => eprintln!(
                "Warning: no YouTube API key configured; skipping resource lookup. \
                 Set LEARNPATH_YOUTUBE_KEY or [resources] youtube_api_key."
            ),
        }
    }

    eprintln!(
        "Roadmap for '{}': {} weeks ({} loaded), {}",
        assessment.goal,
        roadmap.weeks.len(),
        roadmap.loaded_weeks(),
        roadmap.metadata.difficulty,
    );

    let roadmap = select_weeks(roadmap, args.start, args.end)?;
    write_json(&roadmap, args.output.as_ref())
}

/// Keep weeks in `start..=end`. Metadata still describes the whole roadmap.
fn select_weeks(mut roadmap: RoadmapData, start: Option<u32>, end: Option<u32>) -> Result<RoadmapData> {
    let start = start.unwrap_or(1);
    let end = end.unwrap_or(u32::MAX);
    anyhow::ensure!(start >= 1 && start <= end, "invalid week range {start}..{end}");
    roadmap.weeks.retain(|w| (start..=end).contains(&w.week));
    Ok(roadmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnpath_core::model::RoadmapWeek;

    fn roadmap(weeks: u32) -> RoadmapData {
        RoadmapData {
            weeks: (1..=weeks).map(|w| RoadmapWeek::placeholder(w, 5.0)).collect(),
            metadata: Default::default(),
        }
    }

    #[test]
    fn week_range_is_inclusive() {
        let selected = select_weeks(roadmap(6), Some(2), Some(4)).unwrap();
        let numbers: Vec<u32> = selected.weeks.iter().map(|w| w.week).collect();
        assert_eq!(numbers, vec![2, 3, 4]);
    }

    #[test]
    fn open_ended_range_keeps_everything_after_start() {
        let selected = select_weeks(roadmap(3), Some(2), None).unwrap();
        assert_eq!(selected.weeks.len(), 2);
        assert_eq!(select_weeks(roadmap(3), None, None).unwrap().weeks.len(), 3);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(select_weeks(roadmap(3), Some(3), Some(1)).is_err());
        assert!(select_weeks(roadmap(3), Some(0), None).is_err());
    }
}
