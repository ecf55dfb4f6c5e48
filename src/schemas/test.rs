use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::{Test, TestQuestion, TestSettings};
use crate::db::types::{DifficultyLevel, QuestionType};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct TestCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default, alias = "companyName")]
    pub(crate) company_name: String,
    #[serde(default, alias = "organizationId")]
    pub(crate) organization_id: Option<String>,
    /// Zero falls back to the configured default duration.
    #[serde(default, alias = "duration", alias = "durationMinutes")]
    #[validate(range(min = 0, max = 600, message = "duration_minutes must be between 0 and 600"))]
    pub(crate) duration_minutes: i32,
    /// Questions written inline, in the camelCase shape browser clients send.
    #[serde(default)]
    pub(crate) questions: Vec<TestQuestion>,
    /// Questions copied from the bank, appended after the inline ones.
    #[serde(default, alias = "questionIds")]
    pub(crate) question_ids: Vec<String>,
    #[serde(default)]
    pub(crate) settings: TestSettings,
    #[serde(default, alias = "passingMarks")]
    pub(crate) passing_marks: Option<f64>,
    #[serde(default = "default_true", alias = "isActive")]
    pub(crate) is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct TestUpdate {
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub(crate) title: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(default, alias = "companyName")]
    pub(crate) company_name: Option<String>,
    #[serde(default, alias = "duration", alias = "durationMinutes")]
    #[validate(range(min = 0, max = 600, message = "duration_minutes must be between 0 and 600"))]
    pub(crate) duration_minutes: Option<i32>,
    #[serde(default)]
    pub(crate) questions: Option<Vec<TestQuestion>>,
    #[serde(default, alias = "questionIds")]
    pub(crate) question_ids: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) settings: Option<TestSettings>,
    #[serde(default, alias = "passingMarks")]
    pub(crate) passing_marks: Option<f64>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TestListQuery {
    /// Restricts recruiters to the tests they authored.
    #[serde(default)]
    pub(crate) mine: bool,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

/// A test question as shown to a client. The answer key is only present for
/// the test's author and administrators.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionView {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) correct_answer: Option<serde_json::Value>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) difficulty_level: DifficultyLevel,
    pub(crate) topic: String,
}

impl QuestionView {
    pub(crate) fn from_question(question: TestQuestion, reveal_answer: bool) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options,
            correct_answer: if reveal_answer { question.correct_answer } else { None },
            marks: question.marks,
            negative_marks: question.negative_marks,
            difficulty_level: question.difficulty_level,
            topic: question.topic,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct TestResponse {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) company_name: String,
    pub(crate) organization_id: Option<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) question_count: usize,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) settings: TestSettings,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl TestResponse {
    pub(crate) fn from_db(test: Test, reveal_answers: bool) -> Self {
        let questions: Vec<QuestionView> = test
            .questions
            .0
            .into_iter()
            .map(|question| QuestionView::from_question(question, reveal_answers))
            .collect();

        Self {
            id: test.id,
            title: test.title,
            description: test.description,
            company_name: test.company_name,
            organization_id: test.organization_id,
            created_by: test.created_by,
            duration_minutes: test.duration_minutes,
            total_marks: test.total_marks,
            passing_marks: test.passing_marks,
            question_count: questions.len(),
            questions,
            settings: test.settings.0,
            is_active: test.is_active,
            created_at: format_primitive(test.created_at),
            updated_at: format_primitive(test.updated_at),
        }
    }
}

fn default_true() -> bool {
    true
}
