//! The generation engine.
//!
//! Cache first; on a miss, ask the provider, strip fences, parse, validate,
//! and only then cache. Provider failures and unparseable text are retried
//! with exponential backoff. Structurally invalid output is not retried.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use learnpath_cache::{AdvancedCache, SetOptions};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache_key::{
    goal_tag, quiz_key, resource_key, roadmap_key, topic_tag, QUIZ_TAG, RESOURCES_TAG,
    ROADMAP_TAG,
};
use crate::error::{GenerationError, ProviderError};
use crate::model::{
    AssessmentData, LearningResource, QuizData, QuizGenerationInput, ResourceType, RoadmapData,
};
use crate::traits::{
    extract_json_from_response, GenerateRequest, LlmProvider, ResourceLookup,
    DEFAULT_SYSTEM_PROMPT,
};
use crate::validate::{quiz_issues, roadmap_issues, QuizPolicy};

pub const DEFAULT_MODEL: &str = "gemini-1.5-pro-latest";
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);
const DEFAULT_TOTAL_WEEKS: u32 = 4;

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Model identifier passed to the provider and folded into cache keys.
    pub model: String,
    /// Sampling temperature for quizzes.
    pub quiz_temperature: f64,
    /// Sampling temperature for roadmaps.
    pub roadmap_temperature: f64,
    /// Max tokens for generation.
    pub max_tokens: u32,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles after each.
    pub retry_delay: Duration,
    pub quiz_policy: QuizPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            quiz_temperature: 0.3,
            roadmap_temperature: 0.7,
            max_tokens: 2048,
            max_retries: 2,
            retry_delay: Duration::from_secs(1),
            quiz_policy: QuizPolicy::default(),
        }
    }
}

/// What went wrong on the most recent attempt.
enum AttemptFailure {
    Provider(anyhow::Error),
    Malformed(String),
}

/// Produces quizzes and roadmaps through a provider and a cache.
pub struct LearningPathEngine {
    provider: Arc<dyn LlmProvider>,
    cache: AdvancedCache,
    config: EngineConfig,
}

impl LearningPathEngine {
    pub fn new(provider: Arc<dyn LlmProvider>, cache: AdvancedCache, config: EngineConfig) -> Self {
        Self {
            provider,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &AdvancedCache {
        &self.cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generate (or fetch from cache) a placement quiz.
    pub async fn generate_quiz(
        &self,
        input: &QuizGenerationInput,
    ) -> Result<QuizData, GenerationError> {
        let key = quiz_key(input, &self.config.quiz_policy, &self.config.model);
        if let Some(quiz) = self.cache.get::<QuizData>(&key) {
            info!("using cached quiz for '{}'", input.goal);
            return Ok(quiz);
        }

        let prompt = quiz_prompt(input, &self.config.quiz_policy);
        let value = self
            .request_json(prompt, self.config.quiz_temperature)
            .await?;

        let issues = quiz_issues(&value, &self.config.quiz_policy);
        if !issues.is_empty() {
            warn!("rejecting generated quiz: {}", issues.join("; "));
            return Err(GenerationError::InvalidQuiz(issues));
        }
        let mut quiz: QuizData = serde_json::from_value(value)
            .map_err(|e| GenerationError::InvalidQuiz(vec![e.to_string()]))?;
        quiz.assign_missing_ids();

        self.cache.set(
            &key,
            &quiz,
            SetOptions::tagged([QUIZ_TAG.to_string(), goal_tag(&input.goal)]),
        );
        Ok(quiz)
    }

    /// Generate (or fetch from cache) a roadmap. Weeks the provider did not
    /// fill in are padded with lazy placeholders.
    pub async fn generate_roadmap(
        &self,
        assessment: &AssessmentData,
    ) -> Result<RoadmapData, GenerationError> {
        let key = roadmap_key(assessment, &self.config.model);
        if let Some(roadmap) = self.cache.get::<RoadmapData>(&key) {
            info!("using cached roadmap for '{}'", assessment.goal);
            return Ok(roadmap);
        }

        let prompt = roadmap_prompt(assessment);
        let value = self
            .request_json(prompt, self.config.roadmap_temperature)
            .await?;

        let issues = roadmap_issues(&value);
        if !issues.is_empty() {
            warn!("rejecting generated roadmap: {}", issues.join("; "));
            return Err(GenerationError::InvalidRoadmap(issues));
        }
        let mut roadmap: RoadmapData = serde_json::from_value(value)
            .map_err(|e| GenerationError::InvalidRoadmap(vec![e.to_string()]))?;
        complete_roadmap(&mut roadmap, assessment);

        self.cache.set(
            &key,
            &roadmap,
            SetOptions::tagged([ROADMAP_TAG.to_string(), goal_tag(&assessment.goal)]),
        );
        Ok(roadmap)
    }

    /// Give every loaded week without resources one video per topic.
    ///
    /// Lookups for a week run concurrently. A failed or empty lookup just
    /// means no resource for that topic. Returns the number attached.
    pub async fn attach_resources(
        &self,
        roadmap: &mut RoadmapData,
        lookup: &dyn ResourceLookup,
    ) -> usize {
        let mut attached = 0;
        for week in roadmap
            .weeks
            .iter_mut()
            .filter(|w| w.is_loaded && w.resources.is_empty())
        {
            let found = join_all(
                week.topics
                    .iter()
                    .map(|topic| self.find_resource(topic, ResourceType::Video, lookup)),
            )
            .await;
            week.resources = found.into_iter().flatten().collect();
            attached += week.resources.len();
        }
        debug!("attached {attached} resources via {}", lookup.name());
        attached
    }

    async fn find_resource(
        &self,
        topic: &str,
        resource_type: ResourceType,
        lookup: &dyn ResourceLookup,
    ) -> Option<LearningResource> {
        let key = resource_key(topic, resource_type);
        if let Some(resource) = self.cache.get::<LearningResource>(&key) {
            return Some(resource);
        }

        match lookup.find(topic, resource_type).await {
            Ok(Some(resource)) => {
                self.cache.set(
                    &key,
                    &resource,
                    SetOptions::tagged([RESOURCES_TAG.to_string(), topic_tag(topic)]),
                );
                Some(resource)
            }
            Ok(None) => {
                debug!("no {resource_type} found for '{topic}'");
                None
            }
            Err(e) => {
                warn!("{} lookup for '{topic}' failed: {e:#}", lookup.name());
                None
            }
        }
    }

    /// Ask the provider for JSON, retrying transient failures.
    async fn request_json(&self, prompt: String, temperature: f64) -> Result<Value, GenerationError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt,
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            max_tokens: self.config.max_tokens,
            temperature,
        };

        let mut last_failure = None;
        let mut retry_delay = self.config.retry_delay;
        let mut attempts = 0;

        for retry in 0..=self.config.max_retries {
            if retry > 0 {
                debug!("retrying in {}ms", retry_delay.as_millis());
                tokio::time::sleep(retry_delay).await;
                retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
            }
            attempts += 1;

            match self.provider.generate(&request).await {
                Ok(response) => {
                    let body = extract_json_from_response(&response.content);
                    match serde_json::from_str::<Value>(&body) {
                        Ok(value) => {
                            debug!(
                                "{} answered in {}ms ({} tokens)",
                                self.provider.name(),
                                response.latency_ms,
                                response.token_usage.total_tokens
                            );
                            return Ok(value);
                        }
                        Err(e) => {
                            warn!("attempt {attempts}: response is not JSON: {e}");
                            last_failure = Some(AttemptFailure::Malformed(e.to_string()));
                        }
                    }
                }
                Err(e) => {
                    if let Some(provider_error) = e.downcast_ref::<ProviderError>() {
                        if provider_error.is_permanent() {
                            return Err(GenerationError::Provider {
                                attempts,
                                last_error: e,
                            });
                        }
                        if let Some(ms) = provider_error.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms).min(MAX_RETRY_DELAY);
                        }
                    }
                    warn!("attempt {attempts}: {} failed: {e:#}", self.provider.name());
                    last_failure = Some(AttemptFailure::Provider(e));
                }
            }
        }

        Err(match last_failure {
            Some(AttemptFailure::Malformed(message)) => GenerationError::MalformedResponse(message),
            Some(AttemptFailure::Provider(e)) => GenerationError::Provider {
                attempts,
                last_error: e,
            },
            None => GenerationError::Provider {
                attempts,
                last_error: anyhow::anyhow!("no attempts were made"),
            },
        })
    }
}

/// Fill metadata gaps from the assessment and pad to the requested length.
fn complete_roadmap(roadmap: &mut RoadmapData, assessment: &AssessmentData) {
    let requested = assessment
        .total_weeks
        .or(Some(roadmap.metadata.total_weeks).filter(|w| *w > 0))
        .unwrap_or(DEFAULT_TOTAL_WEEKS);
    let total = requested.max(roadmap.weeks.len() as u32);

    let metadata = &mut roadmap.metadata;
    metadata.total_weeks = total;
    if metadata.weekly_commitment <= 0.0 {
        metadata.weekly_commitment = assessment.time_commitment;
    }
    if metadata.focus_areas.is_empty() {
        metadata.focus_areas = assessment.focus_areas.clone();
    }

    for week in &mut roadmap.weeks {
        if week.weekly_hours <= 0.0 {
            week.weekly_hours = assessment.time_commitment;
        }
    }
    roadmap.pad_to(total, assessment.time_commitment);
}

fn quiz_prompt(input: &QuizGenerationInput, policy: &QuizPolicy) -> String {
    let counts = match (policy.multiple_choice_count, policy.open_ended_count) {
        (Some(mc), Some(oe)) => format!("{mc} multiple_choice and {oe} open_ended questions"),
        _ => "3 multiple_choice and 2 open_ended questions".to_string(),
    };
    format!(
        "Create a placement quiz for the goal \"{}\" at self-reported skill level {}/5, \
         focusing on: {}. Include {counts}. Multiple-choice questions have exactly 4 options \
         and a correctAnswer equal to one of them. Return JSON: {{\"questions\": [{{\"id\", \
         \"text\", \"type\", \"category\", \"skillArea\", \"difficulty\", \"options\", \
         \"correctAnswer\", \"explanation\", \"points\"}}]}}.",
        input.goal,
        input.skill_level,
        focus_list(&input.focus_areas),
    )
}

fn roadmap_prompt(assessment: &AssessmentData) -> String {
    let total = assessment.total_weeks.unwrap_or(DEFAULT_TOTAL_WEEKS);
    let mut prompt = format!(
        "Create a {total}-week learning roadmap for the goal \"{}\" at skill level {}/5 with \
         {} hours per week, focusing on: {}.",
        assessment.goal,
        assessment.latest_skill_level(),
        assessment.time_commitment,
        focus_list(&assessment.focus_areas),
    );
    if let Some(analysis) = &assessment.quiz_analysis {
        if !analysis.improvement_areas.is_empty() {
            prompt.push_str(&format!(
                " Prioritize these weaker areas: {}.",
                analysis.improvement_areas.join(", ")
            ));
        }
    }
    if let Some(style) = &assessment.learning_style {
        prompt.push_str(&format!(" Prefer {style} resources."));
    }
    prompt.push_str(
        " Return JSON: {\"weeks\": [{\"week\", \"theme\", \"topics\", \"resources\": [{\"type\", \
         \"title\", \"url\", \"difficulty\"}], \"project\": {\"title\", \"description\", \
         \"estimatedHours\"}, \"weeklyHours\"}], \"metadata\": {\"totalWeeks\", \
         \"weeklyCommitment\", \"difficulty\", \"focusAreas\"}}.",
    );
    prompt
}

fn focus_list(focus_areas: &[String]) -> String {
    if focus_areas.is_empty() {
        "general foundations".to_string()
    } else {
        focus_areas.join(", ")
    }
}
