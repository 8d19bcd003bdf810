//! Core data model types for learnpath.
//!
//! Field names serialize in camelCase, matching the JSON the generator is
//! asked to produce and the documents the CLI reads and writes.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// Content difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    /// Map a 1–5 skill level onto a difficulty band.
    pub fn from_skill_level(level: f64) -> Self {
        if level < 2.5 {
            Difficulty::Beginner
        } else if level < 4.0 {
            Difficulty::Intermediate
        } else {
            Difficulty::Advanced
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Beginner => write!(f, "beginner"),
            Difficulty::Intermediate => write!(f, "intermediate"),
            Difficulty::Advanced => write!(f, "advanced"),
        }
    }
}

/// Quiz question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    OpenEnded,
}

/// Learning resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Video,
    Article,
    Course,
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceType::Video => write!(f, "video"),
            ResourceType::Article => write!(f, "article"),
            ResourceType::Course => write!(f, "course"),
        }
    }
}

// ---------------------------------------------------------------------------
// Quiz
// ---------------------------------------------------------------------------

/// A single quiz question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    /// Identifier responses refer to.
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    /// Question text shown to the learner.
    pub text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    /// Concept category; missed categories become knowledge-gap concepts.
    #[serde(default = "default_category")]
    pub category: String,
    /// Skill area the question measures.
    #[serde(default = "default_category")]
    pub skill_area: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Exactly four choices for multiple-choice questions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Expected answer (multiple choice) or model answer (open ended).
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: String,
    /// Maximum points for this question.
    #[serde(default = "default_points")]
    pub points: f64,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_points() -> f64 {
    10.0
}

/// Accept both `"q1"` and `1` as an identifier.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

/// A generated quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizData {
    pub questions: Vec<QuizQuestion>,
}

impl QuizData {
    /// Give every question without an id a positional one (`q1`, `q2`, ...).
    pub fn assign_missing_ids(&mut self) {
        for (i, q) in self.questions.iter_mut().enumerate() {
            if q.id.trim().is_empty() {
                q.id = format!("q{}", i + 1);
            }
        }
    }

    pub fn count_of(&self, question_type: QuestionType) -> usize {
        self.questions
            .iter()
            .filter(|q| q.question_type == question_type)
            .count()
    }
}

/// A learner's answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResponse {
    pub question_id: String,
    pub answer: String,
    /// Derived by scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    /// Derived by scoring.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<f64>,
}

impl QuizResponse {
    pub fn new(question_id: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question_id: question_id.into(),
            answer: answer.into(),
            is_correct: None,
            points: None,
        }
    }
}

/// Result of analyzing a completed quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnalysis {
    pub total_score: f64,
    pub max_possible_score: f64,
    pub strength_areas: Vec<String>,
    pub improvement_areas: Vec<String>,
    pub adjusted_skill_level: AdjustedSkillLevel,
    pub knowledge_gaps: Vec<KnowledgeGap>,
}

/// Skill estimate after blending self-report with measured performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustedSkillLevel {
    /// 1–5 overall estimate.
    pub overall: f64,
    /// 0–5 per skill area.
    pub by_area: BTreeMap<String, u8>,
}

/// A skill area below the strength threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeGap {
    pub area: String,
    /// Categories of the questions missed in this area.
    pub concepts: Vec<String>,
    pub current_level: u8,
}

/// Quiz attached to a single roadmap week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyQuizData {
    pub week_number: u32,
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// 1–5 difficulty adjustment.
    #[serde(default)]
    pub adaptive_level: f64,
}

// ---------------------------------------------------------------------------
// Roadmap
// ---------------------------------------------------------------------------

/// A learning resource attached to a roadmap week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningResource {
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Hands-on project for a week.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    pub description: String,
    pub estimated_hours: f64,
}

/// One week of a roadmap: fully loaded, or a placeholder to fill in later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoadmapWeek {
    /// 1-based, contiguous.
    pub week: u32,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub resources: Vec<LearningResource>,
    #[serde(default)]
    pub project: Project,
    #[serde(default)]
    pub weekly_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz: Option<WeeklyQuizData>,
    #[serde(default = "default_true")]
    pub is_loaded: bool,
}

fn default_true() -> bool {
    true
}

impl RoadmapWeek {
    /// A lazy week with no content yet.
    pub fn placeholder(week: u32, weekly_hours: f64) -> Self {
        Self {
            week,
            theme: format!("Week {week}"),
            topics: Vec::new(),
            resources: Vec::new(),
            project: Project::default(),
            weekly_hours,
            quiz: None,
            is_loaded: false,
        }
    }
}

/// Roadmap-wide metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoadmapMetadata {
    pub total_weeks: u32,
    pub weekly_commitment: f64,
    pub difficulty: Difficulty,
    pub focus_areas: Vec<String>,
}

/// A generated multi-week roadmap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadmapData {
    pub weeks: Vec<RoadmapWeek>,
    #[serde(default)]
    pub metadata: RoadmapMetadata,
}

impl RoadmapData {
    /// Append placeholder weeks until there are `total_weeks`.
    pub fn pad_to(&mut self, total_weeks: u32, weekly_hours: f64) {
        let mut next = self.weeks.len() as u32 + 1;
        while next <= total_weeks {
            self.weeks.push(RoadmapWeek::placeholder(next, weekly_hours));
            next += 1;
        }
    }

    pub fn loaded_weeks(&self) -> usize {
        self.weeks.iter().filter(|w| w.is_loaded).count()
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// The fields that shape a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizGenerationInput {
    pub goal: String,
    /// Self-reported, 1–5.
    pub skill_level: f64,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Hours per week.
    pub time_commitment: f64,
}

/// Everything collected from the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentData {
    pub goal: String,
    /// Self-reported, 1–5.
    pub skill_level: f64,
    #[serde(default)]
    pub focus_areas: Vec<String>,
    /// Hours per week.
    pub time_commitment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_style: Option<String>,
    /// Requested roadmap length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_weeks: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_analysis: Option<QuizAnalysis>,
}

impl AssessmentData {
    /// The most recent skill estimate: the quiz-adjusted level if a quiz was
    /// analyzed, otherwise the self-report.
    pub fn latest_skill_level(&self) -> f64 {
        self.quiz_analysis
            .as_ref()
            .map(|a| a.adjusted_skill_level.overall)
            .unwrap_or(self.skill_level)
    }
}
