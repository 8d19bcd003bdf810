//! Cache keys and tags for generated content.
//!
//! Keys are built from the request fields and settings that change the output,
//! so two requests that differ only in spelling or list order share an entry.

use std::collections::BTreeSet;

use crate::model::{AssessmentData, QuizGenerationInput, ResourceType};
use crate::validate::QuizPolicy;

pub const QUIZ_TAG: &str = "quiz";
pub const ROADMAP_TAG: &str = "roadmap";
pub const RESOURCES_TAG: &str = "resources";

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn list_segment(items: &[String]) -> String {
    let areas: BTreeSet<String> = items
        .iter()
        .map(|a| normalize(a))
        .filter(|a| !a.is_empty())
        .collect();
    areas.into_iter().collect::<Vec<_>>().join(",")
}

fn count_segment(count: Option<usize>) -> String {
    count.map_or_else(|| "n".to_string(), |n| n.to_string())
}

/// `<mc>x<oe>-strict|lenient`, with `n` for an unpinned count.
fn policy_segment(policy: &QuizPolicy) -> String {
    format!(
        "{}x{}-{}",
        count_segment(policy.multiple_choice_count),
        count_segment(policy.open_ended_count),
        if policy.strict { "strict" } else { "lenient" },
    )
}

/// `quiz-<goal>-<skill>-<hours>-<focus>-<policy>-<model>`
///
/// The policy is part of the key so a cached quiz is only served under the
/// rules it was validated against.
pub fn quiz_key(input: &QuizGenerationInput, policy: &QuizPolicy, model: &str) -> String {
    format!(
        "quiz-{}-{}-{}-{}-{}-{model}",
        normalize(&input.goal),
        input.skill_level,
        input.time_commitment,
        list_segment(&input.focus_areas),
        policy_segment(policy),
    )
}

/// `roadmap-<goal>-<skill>-<adjusted>-<hours>-<weeks>-<focus>-<gaps>-<style>-<model>`
///
/// Carries everything the roadmap prompt reads from the quiz analysis, so a
/// retaken quiz yields a new roadmap.
pub fn roadmap_key(assessment: &AssessmentData, model: &str) -> String {
    let weeks = assessment
        .total_weeks
        .map(|w| w.to_string())
        .unwrap_or_default();
    let gaps = assessment
        .quiz_analysis
        .as_ref()
        .map(|a| list_segment(&a.improvement_areas))
        .unwrap_or_default();
    let style = assessment
        .learning_style
        .as_deref()
        .map(normalize)
        .unwrap_or_default();
    format!(
        "roadmap-{}-{}-{}-{}-{weeks}-{}-{gaps}-{style}-{model}",
        normalize(&assessment.goal),
        assessment.skill_level,
        assessment.latest_skill_level(),
        assessment.time_commitment,
        list_segment(&assessment.focus_areas),
    )
}

/// `resource-<type>-<topic>`
pub fn resource_key(topic: &str, resource_type: ResourceType) -> String {
    format!("resource-{resource_type}-{}", normalize(topic))
}

/// Tag shared by every entry generated for one goal.
pub fn goal_tag(goal: &str) -> String {
    format!("goal:{}", normalize(goal))
}

/// Tag on every resource found for one topic.
pub fn topic_tag(topic: &str) -> String {
    format!("topic:{}", normalize(topic))
}
