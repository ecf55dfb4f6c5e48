use serde_json::Value;
use time::PrimitiveDateTime;

use crate::core::config::Settings;
use crate::db::models::{AnswerMap, TestQuestion, TestSettings};
use crate::db::types::{QuestionType, ResultStatus};

/// Pass rule inputs. A test's own `max_violations` wins over the configured
/// ceiling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Thresholds {
    pub(crate) pass_percentage: f64,
    pub(crate) max_violations: u32,
}

impl Thresholds {
    pub(crate) fn for_test(settings: &Settings, test: &TestSettings) -> Self {
        Self {
            pass_percentage: settings.exam().pass_percentage,
            max_violations: test.max_violations.unwrap_or(settings.exam().max_violations),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct GradedAnswer {
    pub(crate) question_id: String,
    pub(crate) response: Value,
    /// `None` for question types that are not machine graded.
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_awarded: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreSheet {
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) graded: Vec<GradedAnswer>,
}

/// Unwraps the object shapes stored by older clients
/// (`{"selected_option": 2}`, `{"answer_text": "..."}`) into the bare value.
pub(crate) fn normalize_answer(value: &Value) -> &Value {
    if let Value::Object(map) = value {
        for key in ["selected_option", "selected_options", "answer_text", "code"] {
            if let Some(inner) = map.get(key) {
                return inner;
            }
        }
    }
    value
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Option index of an answer or key. Integral floats (`1.0`) count.
pub(crate) fn as_index(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    }
}

fn index_set(value: &Value) -> Option<Vec<i64>> {
    let mut indices = match value {
        Value::Array(items) => items.iter().map(as_index).collect::<Option<Vec<_>>>()?,
        other => vec![as_index(other)?],
    };
    indices.sort_unstable();
    indices.dedup();
    Some(indices)
}

/// Correctness of a single answer, or `None` when the type is not graded or
/// the question carries no usable key.
pub(crate) fn check_answer(question: &TestQuestion, answer: &Value) -> Option<bool> {
    let key = question.correct_answer.as_ref()?;
    let answer = normalize_answer(answer);

    match question.question_type {
        QuestionType::Mcq => {
            let expected = as_index(key)?;
            Some(as_index(answer) == Some(expected))
        }
        QuestionType::MultipleSelect => {
            let expected = index_set(key)?;
            Some(index_set(answer).is_some_and(|selected| selected == expected))
        }
        QuestionType::Subjective | QuestionType::Coding => None,
    }
}

/// Grades one question. Unanswered questions yield `None`.
pub(crate) fn grade_question(
    question: &TestQuestion,
    answer: Option<&Value>,
    negative_marking: bool,
) -> Option<GradedAnswer> {
    let answer = answer.filter(|value| !is_blank(normalize_answer(value)))?;
    let is_correct = check_answer(question, answer);

    let marks_awarded = match is_correct {
        Some(true) => question.marks,
        Some(false) if negative_marking => -question.negative_marks.abs(),
        _ => 0.0,
    };

    Some(GradedAnswer {
        question_id: question.id.clone(),
        response: answer.clone(),
        is_correct,
        marks_awarded,
    })
}

pub(crate) fn score_answers(
    questions: &[TestQuestion],
    answers: &AnswerMap,
    negative_marking: bool,
) -> ScoreSheet {
    let mut total_marks = 0.0;
    let mut raw_score = 0.0;
    let mut graded = Vec::new();

    for question in questions {
        total_marks += question.marks;
        if let Some(answer) = grade_question(question, answers.get(&question.id), negative_marking) {
            raw_score += answer.marks_awarded;
            graded.push(answer);
        }
    }

    let score = raw_score.max(0.0);
    ScoreSheet { score, total_marks, percentage: percentage(score, total_marks), graded }
}

pub(crate) fn percentage(score: f64, total_marks: f64) -> f64 {
    if total_marks > 0.0 {
        score / total_marks * 100.0
    } else {
        0.0
    }
}

pub(crate) fn classify(percentage: f64, violation_count: u32, thresholds: Thresholds) -> ResultStatus {
    if percentage >= thresholds.pass_percentage && violation_count < thresholds.max_violations {
        ResultStatus::Pass
    } else {
        ResultStatus::Fail
    }
}

/// Violation count relative to the ceiling, as a 0-100 figure.
pub(crate) fn cheating_probability(violation_count: u32, max_violations: u32) -> f64 {
    if max_violations == 0 {
        return if violation_count > 0 { 100.0 } else { 0.0 };
    }
    (f64::from(violation_count) / f64::from(max_violations) * 100.0).min(100.0)
}

/// Whole minutes between start and end, rounded up.
pub(crate) fn time_taken_minutes(start: PrimitiveDateTime, end: PrimitiveDateTime) -> i32 {
    let seconds = (end - start).whole_seconds().max(0);
    let minutes = (seconds + 59) / 60;
    i32::try_from(minutes).unwrap_or(i32::MAX)
}
