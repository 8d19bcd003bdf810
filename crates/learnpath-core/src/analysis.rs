//! Quiz scoring and knowledge-gap analysis.
//!
//! Multiple-choice answers are exact matches. Open-ended answers get a
//! heuristic score averaging keyword coverage, structure and relevance to the
//! question. Per-area results feed strengths, improvement areas and an
//! adjusted overall skill level.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::model::{
    AdjustedSkillLevel, KnowledgeGap, QuestionType, QuizAnalysis, QuizQuestion, QuizResponse,
};

/// Answers shorter than this (in characters) score a flat fraction.
const SHORT_ANSWER_CHARS: usize = 50;
/// Fraction of points a short open-ended answer earns.
const SHORT_ANSWER_FRACTION: f64 = 0.3;
/// Area percentage at or above which the area counts as a strength.
const STRENGTH_THRESHOLD: f64 = 70.0;
/// At most this many topic keywords are checked.
const MAX_KEYWORDS: usize = 5;

const FUNDAMENTALS: &[&str] = &["concept", "basic", "principle", "foundation", "essential"];
const PRACTICAL: &[&str] = &[
    "implementation",
    "example",
    "use case",
    "application",
    "practice",
];
const ADVANCED: &[&str] = &["optimization", "architecture", "strategy", "complex", "advanced"];

/// Keywords an answer in `category` is expected to touch on.
///
/// Known categories map to fixed lists. Anything else falls back to the
/// significant words of the category and skill area themselves.
fn topic_keywords(category: &str, skill_area: &str) -> Vec<String> {
    let fixed = match category.trim().to_lowercase().as_str() {
        "fundamentals" => Some(FUNDAMENTALS),
        "practical" => Some(PRACTICAL),
        "advanced" => Some(ADVANCED),
        _ => None,
    };
    if let Some(list) = fixed {
        return list.iter().map(|k| k.to_string()).collect();
    }

    let mut seen = BTreeSet::new();
    significant_words(&format!("{category} {skill_area}"))
        .into_iter()
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Lowercased words longer than three characters, punctuation removed.
fn significant_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect::<String>()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .map(str::to_string)
        .collect()
}

fn keyword_score(answer: &str, category: &str, skill_area: &str) -> f64 {
    let keywords = topic_keywords(category, skill_area);
    let checked: Vec<&String> = keywords.iter().take(MAX_KEYWORDS).collect();
    if checked.is_empty() {
        return 0.0;
    }
    let matched = checked.iter().filter(|k| answer.contains(k.as_str())).count();
    matched as f64 / checked.len() as f64
}

fn structure_score(answer: &str) -> f64 {
    let sentences = answer
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();

    let mut score = 0.0;
    if sentences >= 2 {
        score += 0.4;
    }
    if answer.chars().count() >= 100 {
        score += 0.3;
    }
    if answer.contains('\n') {
        score += 0.3;
    }
    score
}

fn relevance_score(answer: &str, question_text: &str) -> f64 {
    let terms = significant_words(question_text);
    if terms.is_empty() {
        return 0.0;
    }
    let addressed = terms.iter().filter(|t| answer.contains(t.as_str())).count();
    addressed as f64 / terms.len() as f64
}

/// Points earned by `answer` on `question`.
pub fn score_answer(question: &QuizQuestion, answer: &str) -> f64 {
    match question.question_type {
        QuestionType::MultipleChoice => {
            let given = answer.trim().to_lowercase();
            let expected = question.correct_answer.trim().to_lowercase();
            if given == expected {
                question.points
            } else {
                0.0
            }
        }
        QuestionType::OpenEnded => {
            // Trailing whitespace is not part of the length.
            let answer = answer.trim().to_lowercase();
            if answer.chars().count() < SHORT_ANSWER_CHARS {
                return (question.points * SHORT_ANSWER_FRACTION).floor();
            }
            let composite = (keyword_score(&answer, &question.category, &question.skill_area)
                + structure_score(&answer)
                + relevance_score(&answer, &question.text))
                / 3.0;
            (question.points * composite).round()
        }
    }
}

fn index_questions(questions: &[QuizQuestion]) -> HashMap<&str, &QuizQuestion> {
    let mut by_id = HashMap::with_capacity(questions.len());
    for q in questions {
        // First question wins on duplicate ids.
        by_id.entry(q.id.as_str()).or_insert(q);
    }
    by_id
}

/// Fill in `is_correct` and `points` for every response that matches a
/// question. Unmatched responses are returned untouched.
pub fn score_responses(questions: &[QuizQuestion], responses: &[QuizResponse]) -> Vec<QuizResponse> {
    let by_id = index_questions(questions);
    responses
        .iter()
        .map(|r| {
            let mut scored = r.clone();
            if let Some(q) = by_id.get(r.question_id.as_str()) {
                let points = score_answer(q, &r.answer);
                scored.points = Some(points);
                scored.is_correct = Some(points >= q.points);
            }
            scored
        })
        .collect()
}

#[derive(Default)]
struct AreaTally {
    earned: f64,
    possible: f64,
    missed: BTreeSet<String>,
}

/// Analyze a completed quiz against the learner's self-reported level (1–5).
pub fn analyze_quiz_responses(
    questions: &[QuizQuestion],
    responses: &[QuizResponse],
    self_reported: f64,
) -> QuizAnalysis {
    let by_id = index_questions(questions);
    let mut areas: BTreeMap<String, AreaTally> = BTreeMap::new();
    let mut total = 0.0;
    let mut max = 0.0;

    for response in responses {
        let Some(question) = by_id.get(response.question_id.as_str()) else {
            continue;
        };
        let points = score_answer(question, &response.answer);
        total += points;
        max += question.points;

        let tally = areas.entry(question.skill_area.clone()).or_default();
        tally.earned += points;
        tally.possible += question.points;
        if points < question.points {
            tally.missed.insert(question.category.clone());
        }
    }

    let mut strength_areas = Vec::new();
    let mut improvement_areas = Vec::new();
    let mut knowledge_gaps = Vec::new();
    let mut by_area = BTreeMap::new();

    for (area, tally) in areas {
        let percentage = if tally.possible > 0.0 {
            tally.earned / tally.possible * 100.0
        } else {
            0.0
        };
        let level = (percentage / 100.0 * 5.0).round().clamp(0.0, 5.0) as u8;
        by_area.insert(area.clone(), level);

        if percentage >= STRENGTH_THRESHOLD {
            strength_areas.push(area);
        } else {
            improvement_areas.push(area.clone());
            knowledge_gaps.push(KnowledgeGap {
                area,
                concepts: tally.missed.into_iter().collect(),
                current_level: level,
            });
        }
    }

    QuizAnalysis {
        total_score: total,
        max_possible_score: max,
        strength_areas,
        improvement_areas,
        adjusted_skill_level: AdjustedSkillLevel {
            overall: adjusted_overall(total, max, self_reported),
            by_area,
        },
        knowledge_gaps,
    }
}

/// Blend the self-report with measured performance. A disagreement of more
/// than one level discards the self-report.
fn adjusted_overall(earned: f64, possible: f64, self_reported: f64) -> f64 {
    if possible <= 0.0 {
        return self_reported;
    }
    let measured = earned / possible * 5.0;
    if (self_reported - measured).abs() > 1.0 {
        measured
    } else {
        (0.3 * self_reported + 0.7 * measured).round()
    }
}
