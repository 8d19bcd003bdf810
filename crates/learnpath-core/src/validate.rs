//! Structural validation of generated quizzes and roadmaps.
//!
//! Runs on parsed JSON before anything is deserialized into typed structs or
//! written to the cache. Each `*_issues` function lists every problem found;
//! the `validate_*` predicates are true iff that list is empty. Nothing here
//! repairs or mutates the candidate.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const QUESTION_TYPES: &[&str] = &["multiple_choice", "open_ended"];
const DIFFICULTIES: &[&str] = &["beginner", "intermediate", "advanced"];
const RESOURCE_TYPES: &[&str] = &["video", "article", "course"];

/// How strictly a quiz is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPolicy {
    /// Require exactly four options and a `correctAnswer` among them.
    pub strict: bool,
    /// Exact number of multiple-choice questions. `None` means at least one.
    pub multiple_choice_count: Option<usize>,
    /// Exact number of open-ended questions. `None` means at least one.
    pub open_ended_count: Option<usize>,
}

impl Default for QuizPolicy {
    fn default() -> Self {
        Self {
            strict: true,
            multiple_choice_count: None,
            open_ended_count: None,
        }
    }
}

impl QuizPolicy {
    /// Only the baseline rules: non-empty options, one question of each type.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            ..Self::default()
        }
    }

    pub fn with_counts(mut self, multiple_choice: usize, open_ended: usize) -> Self {
        self.multiple_choice_count = Some(multiple_choice);
        self.open_ended_count = Some(open_ended);
        self
    }
}

/// The field's value, treating an explicit `null` like an absent field.
fn present<'a>(value: &'a Value, field: &str) -> Option<&'a Value> {
    value.get(field).filter(|v| !v.is_null())
}

fn non_empty_str(value: Option<&Value>) -> bool {
    value
        .and_then(Value::as_str)
        .is_some_and(|s| !s.trim().is_empty())
}

fn check_count(issues: &mut Vec<String>, kind: &str, found: usize, expected: Option<usize>) {
    match expected {
        Some(n) if found != n => {
            issues.push(format!("expected {n} {kind} question(s), found {found}"));
        }
        None if found == 0 => {
            issues.push(format!("at least one {kind} question is required"));
        }
        _ => {}
    }
}

/// Every structural problem in a candidate quiz.
pub fn quiz_issues(candidate: &Value, policy: &QuizPolicy) -> Vec<String> {
    let mut issues = Vec::new();

    let Some(questions) = candidate.get("questions").and_then(Value::as_array) else {
        issues.push("`questions` is missing or not an array".to_string());
        return issues;
    };

    let mut multiple_choice = 0;
    let mut open_ended = 0;

    for (i, question) in questions.iter().enumerate() {
        let label = format!("question {}", i + 1);

        if !question.is_object() {
            issues.push(format!("{label}: not an object"));
            continue;
        }

        if !non_empty_str(question.get("text")) {
            issues.push(format!("{label}: `text` is missing or empty"));
        }

        match question.get("type").and_then(Value::as_str) {
            Some("multiple_choice") => {
                multiple_choice += 1;
                check_options(&mut issues, &label, question, policy.strict);
            }
            Some("open_ended") => open_ended += 1,
            Some(other) => issues.push(format!(
                "{label}: unknown type `{other}` (expected one of {QUESTION_TYPES:?})"
            )),
            None => issues.push(format!("{label}: `type` is missing")),
        }

        if let Some(points) = present(question, "points") {
            if !points.as_f64().is_some_and(|p| p > 0.0) {
                issues.push(format!("{label}: `points` must be a positive number"));
            }
        }

        if let Some(difficulty) = present(question, "difficulty") {
            if !difficulty.as_str().is_some_and(|d| DIFFICULTIES.contains(&d)) {
                issues.push(format!("{label}: unrecognized difficulty {difficulty}"));
            }
        }
    }

    check_count(
        &mut issues,
        "multiple_choice",
        multiple_choice,
        policy.multiple_choice_count,
    );
    check_count(&mut issues, "open_ended", open_ended, policy.open_ended_count);

    issues
}

fn check_options(issues: &mut Vec<String>, label: &str, question: &Value, strict: bool) {
    let Some(options) = question.get("options").and_then(Value::as_array) else {
        issues.push(format!("{label}: multiple_choice question has no `options` array"));
        return;
    };
    if options.is_empty() {
        issues.push(format!("{label}: `options` is empty"));
        return;
    }
    if !strict {
        return;
    }

    if options.len() != 4 {
        issues.push(format!(
            "{label}: expected exactly 4 options, found {}",
            options.len()
        ));
    }
    let answer = question.get("correctAnswer").and_then(Value::as_str);
    let listed = answer.is_some_and(|a| options.iter().any(|o| o.as_str() == Some(a)));
    if !listed {
        issues.push(format!("{label}: `correctAnswer` is not one of the options"));
    }
}

/// Whether `candidate` is a structurally valid quiz under `policy`.
pub fn validate_quiz_structure(candidate: &Value, policy: &QuizPolicy) -> bool {
    quiz_issues(candidate, policy).is_empty()
}

/// Every structural problem in a candidate roadmap.
pub fn roadmap_issues(candidate: &Value) -> Vec<String> {
    let mut issues = Vec::new();

    let Some(weeks) = candidate.get("weeks").and_then(Value::as_array) else {
        issues.push("`weeks` is missing or not an array".to_string());
        return issues;
    };

    for (i, week) in weeks.iter().enumerate() {
        let position = i as u64 + 1;
        let label = format!("week entry {position}");

        match week.get("week").and_then(Value::as_u64) {
            Some(n) if n != position => issues.push(format!(
                "{label}: week numbers must run 1, 2, 3, ... (found {n})"
            )),
            Some(_) => {}
            None => issues.push(format!("{label}: `week` is missing or not a number")),
        }

        // Lazy placeholder weeks have no content until they are loaded.
        let placeholder = week.get("isLoaded").and_then(Value::as_bool) == Some(false);
        match week.get("topics").and_then(Value::as_array) {
            Some(topics) if !topics.is_empty() || placeholder => {}
            _ => issues.push(format!("{label}: `topics` is missing or empty")),
        }

        let Some(resources) = week.get("resources").and_then(Value::as_array) else {
            issues.push(format!("{label}: `resources` is missing or not an array"));
            continue;
        };
        for (j, resource) in resources.iter().enumerate() {
            check_resource(&mut issues, &format!("{label}, resource {}", j + 1), resource);
        }
    }

    issues
}

fn check_resource(issues: &mut Vec<String>, label: &str, resource: &Value) {
    if !resource
        .get("type")
        .and_then(Value::as_str)
        .is_some_and(|t| RESOURCE_TYPES.contains(&t))
    {
        issues.push(format!(
            "{label}: `type` must be one of {RESOURCE_TYPES:?}"
        ));
    }
    if !non_empty_str(resource.get("title")) {
        issues.push(format!("{label}: `title` is missing or empty"));
    }
    if !non_empty_str(resource.get("url")) {
        issues.push(format!("{label}: `url` is missing or empty"));
    }
    if let Some(difficulty) = present(resource, "difficulty") {
        if !difficulty.as_str().is_some_and(|d| DIFFICULTIES.contains(&d)) {
            issues.push(format!("{label}: unrecognized difficulty {difficulty}"));
        }
    }
}

/// Whether `candidate` is a structurally valid roadmap.
pub fn validate_roadmap_structure(candidate: &Value) -> bool {
    roadmap_issues(candidate).is_empty()
}
