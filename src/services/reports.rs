use std::fmt::Write;

use serde_json::Value;
use time::PrimitiveDateTime;

use crate::core::time::{format_date, format_report_timestamp};
use crate::db::models::{ExamResult, TestQuestion, ViolationRecord};
use crate::db::types::QuestionType;
use crate::repositories::results::ResultRow;
use crate::services::scoring::{as_index, check_answer, normalize_answer};

const RULE: &str = "==========================================";
const SEPARATOR: &str = "----------------------------------------";

/// Student and test details printed on the per-student report.
#[derive(Debug, Default, Clone)]
pub(crate) struct ReportSubject<'a> {
    pub(crate) student_name: Option<&'a str>,
    pub(crate) enrollment_number: Option<&'a str>,
    pub(crate) student_email: Option<&'a str>,
    pub(crate) test_title: Option<&'a str>,
    pub(crate) company_name: Option<&'a str>,
}

pub(crate) fn review_filename(now: PrimitiveDateTime) -> String {
    format!("exam-results-{}.txt", format_date(now))
}

pub(crate) fn all_results_filename(now: PrimitiveDateTime) -> String {
    format!("all-exam-results-{}.txt", format_date(now))
}

pub(crate) fn student_report_filename(enrollment_number: Option<&str>, now: PrimitiveDateTime) -> String {
    format!("exam-result-{}-{}.txt", enrollment_number.unwrap_or("unknown"), format_date(now))
}

fn option_text(question: &TestQuestion, index: &Value) -> Option<String> {
    let index = usize::try_from(as_index(index)?).ok()?;
    question.options.get(index).cloned()
}

fn options_text(question: &TestQuestion, value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let texts = items.iter().map(|item| option_text(question, item)).collect::<Option<Vec<_>>>()?;
            Some(texts.join(", "))
        }
        other => option_text(question, other),
    }
}

fn free_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Null => None,
        Value::String(_) => None,
        other => Some(other.to_string()),
    }
}

fn write_answer_review(output: &mut String, questions: &[TestQuestion], result: &ExamResult) {
    let _ = writeln!(output, "ANSWER REVIEW");
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    for (index, question) in questions.iter().enumerate() {
        let answer = result.answers.0.get(&question.id).map(normalize_answer);
        let verdict = answer.and_then(|value| check_answer(question, value));

        let _ = writeln!(output, "Question {}: {}", index + 1, question.question_text);
        let _ = writeln!(output, "Type: {}", question.question_type.as_str().to_uppercase());
        let _ = writeln!(output, "Difficulty: {}", question.difficulty_level.as_str());
        let _ = writeln!(output, "Topic: {}", question.topic);
        let _ = writeln!(output, "Marks: {}", question.marks);
        let _ = writeln!(output);

        match question.question_type {
            QuestionType::Mcq | QuestionType::MultipleSelect => {
                let given = answer.and_then(|value| options_text(question, value));
                let _ = writeln!(output, "Your Answer: {}", given.as_deref().unwrap_or("Not Answered"));
                if question.question_type == QuestionType::Mcq && verdict != Some(true) {
                    if let Some(correct) =
                        question.correct_answer.as_ref().and_then(|key| options_text(question, key))
                    {
                        let _ = writeln!(output, "Correct Answer: {correct}");
                    }
                }
            }
            QuestionType::Subjective | QuestionType::Coding => {
                let given = answer.and_then(free_text);
                let _ = writeln!(output, "Your Answer: \"{}\"", given.as_deref().unwrap_or("Not Answered"));
            }
        }

        let label = match verdict {
            Some(true) => "CORRECT",
            Some(false) => "INCORRECT",
            None if question.question_type.is_auto_graded() => "INCORRECT",
            None => "NOT GRADED",
        };
        let _ = writeln!(output, "Result: {label}");
        let _ = writeln!(output, "{SEPARATOR}");
        let _ = writeln!(output);
    }
}

fn write_violations(output: &mut String, violations: &[ViolationRecord]) {
    if violations.is_empty() {
        return;
    }

    let _ = writeln!(output, "VIOLATIONS RECORDED");
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    for (index, violation) in violations.iter().enumerate() {
        let _ = writeln!(output, "Violation {}:", index + 1);
        let _ = writeln!(output, "Type: {}", violation.kind);
        let _ = writeln!(output, "Description: {}", violation.description);
        let _ = writeln!(output, "Severity: {}", violation.severity.as_str());
        let _ = writeln!(output, "Timestamp: {}", violation.timestamp);
        let _ = writeln!(output, "{SEPARATOR}");
        let _ = writeln!(output);
    }
}

/// Score summary, per-question review and violations, as handed to the
/// student after an exam.
pub(crate) fn render_review(result: &ExamResult, generated_at: PrimitiveDateTime) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "EXAM RESULTS REPORT");
    let _ = writeln!(output, "Generated on: {}", format_report_timestamp(generated_at));
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    let _ = writeln!(output, "SCORE SUMMARY");
    let _ = writeln!(output, "Score: {}/{}", result.score, result.total_marks);
    let _ = writeln!(output, "Percentage: {:.2}%", result.percentage);
    let _ = writeln!(output, "Status: {}", result.status.as_str().to_uppercase());
    let _ = writeln!(output, "Time Taken: {} minutes", result.time_taken);
    let _ = writeln!(output, "Exam Date: {}", format_report_timestamp(result.created_at));
    let _ = writeln!(output);

    write_answer_review(&mut output, &result.questions.0, result);
    write_violations(&mut output, &result.violations.0);

    output
}

/// Administrator view of one result with student and test details.
pub(crate) fn render_student_report(
    result: &ExamResult,
    subject: &ReportSubject<'_>,
    generated_at: PrimitiveDateTime,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "EXAM RESULT REPORT");
    let _ = writeln!(output, "Generated on: {}", format_report_timestamp(generated_at));
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    let _ = writeln!(output, "STUDENT INFORMATION");
    let _ = writeln!(output, "Name: {}", subject.student_name.unwrap_or("Unknown"));
    let _ = writeln!(output, "Enrollment: {}", subject.enrollment_number.unwrap_or("N/A"));
    let _ = writeln!(output, "Email: {}", subject.student_email.unwrap_or("N/A"));
    let _ = writeln!(output);

    let _ = writeln!(output, "TEST INFORMATION");
    let _ = writeln!(output, "Test: {}", subject.test_title.unwrap_or("Unknown Test"));
    let _ = writeln!(output, "Company: {}", subject.company_name.unwrap_or("N/A"));
    let _ = writeln!(output);

    let _ = writeln!(output, "RESULT SUMMARY");
    let _ = writeln!(output, "Score: {}/{}", result.score, result.total_marks);
    let _ = writeln!(output, "Percentage: {:.2}%", result.percentage);
    let _ = writeln!(output, "Status: {}", result.status.as_str().to_uppercase());
    let _ = writeln!(output, "Time Taken: {} minutes", result.time_taken);
    let _ = writeln!(output, "Date: {}", format_report_timestamp(result.created_at));
    let _ = writeln!(output);

    write_violations(&mut output, &result.violations.0);

    output
}

pub(crate) fn render_all_results(rows: &[ResultRow], generated_at: PrimitiveDateTime) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "ALL EXAM RESULTS REPORT");
    let _ = writeln!(output, "Generated on: {}", format_report_timestamp(generated_at));
    let _ = writeln!(output, "Total Results: {}", rows.len());
    let _ = writeln!(output, "{RULE}");
    let _ = writeln!(output);

    for (index, row) in rows.iter().enumerate() {
        let result = &row.result;
        let _ = writeln!(output, "RESULT {}", index + 1);
        let _ = writeln!(output, "{RULE}");
        let _ = writeln!(
            output,
            "Student: {} ({})",
            row.student_name.as_deref().unwrap_or("Unknown"),
            row.enrollment_number.as_deref().unwrap_or("N/A")
        );
        let _ = writeln!(output, "Test: {}", row.test_title.as_deref().unwrap_or("Unknown Test"));
        let _ = writeln!(output, "Score: {}/{}", result.score, result.total_marks);
        let _ = writeln!(output, "Percentage: {:.2}%", result.percentage);
        let _ = writeln!(output, "Status: {}", result.status.as_str().to_uppercase());
        let _ = writeln!(output, "Time Taken: {} minutes", result.time_taken);
        let _ = writeln!(output, "Date: {}", format_report_timestamp(result.created_at));
        if !result.violations.0.is_empty() {
            let _ = writeln!(output, "Violations: {}", result.violations.0.len());
        }
        let _ = writeln!(output);
    }

    output
}
