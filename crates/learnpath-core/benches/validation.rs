use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};

use learnpath_core::traits::extract_json_from_response;
use learnpath_core::validate::{quiz_issues, roadmap_issues, QuizPolicy};

fn quiz(n: usize) -> Value {
    let questions: Vec<Value> = (0..n)
        .map(|i| {
            if i % 2 == 0 {
                json!({
                    "id": format!("q{i}"),
                    "text": "Which trait enables the ? operator on errors?",
                    "type": "multiple_choice",
                    "difficulty": "intermediate",
                    "options": ["From", "Into", "Display", "Debug"],
                    "correctAnswer": "From",
                    "points": 10
                })
            } else {
                json!({
                    "id": format!("q{i}"),
                    "text": "Describe when to reach for Box<dyn Error>.",
                    "type": "open_ended",
                    "points": 10
                })
            }
        })
        .collect();
    json!({ "questions": questions })
}

fn roadmap(weeks: usize) -> Value {
    let weeks: Vec<Value> = (1..=weeks)
        .map(|w| {
            json!({
                "week": w,
                "theme": "Week theme",
                "topics": ["one", "two", "three"],
                "resources": [
                    {"type": "video", "title": "Intro", "url": "https://v.test/1", "difficulty": "beginner"},
                    {"type": "article", "title": "Deep dive", "url": "https://a.test/2"}
                ]
            })
        })
        .collect();
    json!({ "weeks": weeks })
}

fn bench_validators(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let policy = QuizPolicy::default();
    let small_quiz = quiz(5);
    let large_quiz = quiz(100);
    let small_roadmap = roadmap(4);
    let large_roadmap = roadmap(52);

    group.bench_function("quiz_5", |b| {
        b.iter(|| quiz_issues(black_box(&small_quiz), black_box(&policy)))
    });
    group.bench_function("quiz_100", |b| {
        b.iter(|| quiz_issues(black_box(&large_quiz), black_box(&policy)))
    });
    group.bench_function("roadmap_4", |b| {
        b.iter(|| roadmap_issues(black_box(&small_roadmap)))
    });
    group.bench_function("roadmap_52", |b| {
        b.iter(|| roadmap_issues(black_box(&large_roadmap)))
    });

    group.finish();
}

fn bench_extract(c: &mut Criterion) {
    let fenced = format!(
        "Here is the quiz you asked for:\n\n```json\n{}\n```\n\nLet me know!",
        serde_json::to_string_pretty(&quiz(20)).unwrap_or_default()
    );

    c.bench_function("extract_json_fenced", |b| {
        b.iter(|| extract_json_from_response(black_box(&fenced)))
    });
}

criterion_group!(benches, bench_validators, bench_extract);
criterion_main!(benches);
