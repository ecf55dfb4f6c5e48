use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::time::format_primitive;
use crate::db::models::Question;
use crate::db::types::{DifficultyLevel, QuestionType};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct QuestionCreate {
    #[serde(alias = "question")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: String,
    #[serde(alias = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<serde_json::Value>,
    #[serde(default = "default_marks")]
    pub(crate) marks: f64,
    #[serde(default, alias = "negativeMarks")]
    #[validate(range(min = 0.0, message = "negative_marks must not be negative"))]
    pub(crate) negative_marks: f64,
    #[serde(default, alias = "difficulty")]
    pub(crate) difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub(crate) topic: String,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) tags: Vec<String>,
    #[serde(default, alias = "organizationId")]
    pub(crate) organization_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub(crate) struct QuestionUpdate {
    #[serde(default, alias = "question")]
    #[validate(length(min = 1, message = "question_text must not be empty"))]
    pub(crate) question_text: Option<String>,
    #[serde(default)]
    pub(crate) options: Option<Vec<String>>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<serde_json::Value>,
    #[serde(default)]
    pub(crate) marks: Option<f64>,
    #[serde(default, alias = "negativeMarks")]
    #[validate(range(min = 0.0, message = "negative_marks must not be negative"))]
    pub(crate) negative_marks: Option<f64>,
    #[serde(default, alias = "difficulty")]
    pub(crate) difficulty_level: Option<DifficultyLevel>,
    #[serde(default)]
    pub(crate) topic: Option<String>,
    #[serde(default)]
    pub(crate) subject: Option<String>,
    #[serde(default)]
    pub(crate) tags: Option<Vec<String>>,
    #[serde(default, alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct QuestionListQuery {
    #[serde(default, alias = "type")]
    pub(crate) question_type: Option<QuestionType>,
    #[serde(default)]
    pub(crate) difficulty: Option<DifficultyLevel>,
    #[serde(default)]
    pub(crate) search: Option<String>,
    #[serde(default)]
    pub(crate) active: bool,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct QuestionResponse {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Vec<String>,
    pub(crate) correct_answer: Option<serde_json::Value>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) difficulty_level: DifficultyLevel,
    pub(crate) topic: String,
    pub(crate) subject: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) organization_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl QuestionResponse {
    pub(crate) fn from_db(question: Question) -> Self {
        Self {
            id: question.id,
            question_text: question.question_text,
            question_type: question.question_type,
            options: question.options.0,
            correct_answer: question.correct_answer.map(|value| value.0),
            marks: question.marks,
            negative_marks: question.negative_marks,
            difficulty_level: question.difficulty_level,
            topic: question.topic,
            subject: question.subject,
            tags: question.tags.0,
            created_by: question.created_by,
            organization_id: question.organization_id,
            is_active: question.is_active,
            created_at: format_primitive(question.created_at),
        }
    }
}

fn default_marks() -> f64 {
    1.0
}
