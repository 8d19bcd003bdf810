use criterion::{black_box, criterion_group, criterion_main, Criterion};

use learnpath_core::analysis::{analyze_quiz_responses, score_answer};
use learnpath_core::model::{Difficulty, QuestionType, QuizQuestion, QuizResponse};

const AREAS: &[&str] = &["ownership", "traits", "async", "macros"];

fn make_question(i: usize) -> QuizQuestion {
    let open = i % 3 == 0;
    QuizQuestion {
        id: format!("q{i}"),
        text: "Explain how the borrow checker enforces aliasing rules in practice".into(),
        question_type: if open {
            QuestionType::OpenEnded
        } else {
            QuestionType::MultipleChoice
        },
        category: (if i % 2 == 0 { "fundamentals" } else { "practical" }).into(),
        skill_area: AREAS[i % AREAS.len()].into(),
        difficulty: Difficulty::Intermediate,
        options: (!open).then(|| vec!["a".into(), "b".into(), "c".into(), "d".into()]),
        correct_answer: "b".into(),
        explanation: String::new(),
        points: 10.0,
    }
}

const LONG_ANSWER: &str = "The borrow checker tracks every reference. A basic principle is that \
    shared references are read-only while a mutable reference is exclusive.\nIn practice this \
    enforces aliasing rules at compile time, for example when iterating while pushing.";

fn make_response(i: usize) -> QuizResponse {
    let answer = if i % 3 == 0 {
        LONG_ANSWER
    } else if i % 2 == 0 {
        "b"
    } else {
        "c"
    };
    QuizResponse::new(format!("q{i}"), answer)
}

fn bench_score_answer(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_answer");
    let mc = make_question(1);
    let oe = make_question(0);

    group.bench_function("multiple_choice", |b| {
        b.iter(|| score_answer(black_box(&mc), black_box(" B ")))
    });

    group.bench_function("open_ended_long", |b| {
        b.iter(|| score_answer(black_box(&oe), black_box(LONG_ANSWER)))
    });

    group.bench_function("open_ended_short", |b| {
        b.iter(|| score_answer(black_box(&oe), black_box("too short")))
    });

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze_quiz_responses");

    for size in [5usize, 50, 500] {
        let questions: Vec<QuizQuestion> = (0..size).map(make_question).collect();
        let responses: Vec<QuizResponse> = (0..size).map(make_response).collect();
        group.bench_function(format!("{size}_questions"), |b| {
            b.iter(|| {
                analyze_quiz_responses(black_box(&questions), black_box(&responses), black_box(3.0))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_score_answer, bench_analyze);
criterion_main!(benches);
