use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{
    DifficultyLevel, OrganizationType, ProctoringLevel, QuestionType, ResultStatus, SessionStatus,
    UserRole, ViolationSeverity,
};

/// Answers keyed by question id. Choice questions hold an index or a list of
/// indices, free-text questions hold a string.
pub(crate) type AnswerMap = HashMap<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Organization {
    pub(crate) id: String,
    pub(crate) name: String,
    #[sqlx(rename = "type")]
    pub(crate) org_type: OrganizationType,
    pub(crate) domain: Option<String>,
    pub(crate) contact_email: Option<String>,
    pub(crate) contact_phone: Option<String>,
    pub(crate) address: Json<serde_json::Value>,
    pub(crate) is_active: bool,
    pub(crate) settings: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Profile {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) organization_id: Option<String>,
    pub(crate) phone: Option<String>,
    #[serde(skip_serializing)]
    pub(crate) hashed_password: String,
    pub(crate) is_active: bool,
    pub(crate) preferences: Json<serde_json::Value>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Student {
    pub(crate) id: String,
    pub(crate) profile_id: Option<String>,
    pub(crate) enrollment_number: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: String,
    pub(crate) course: String,
    pub(crate) branch: String,
    pub(crate) year_of_study: Option<i32>,
    pub(crate) cgpa: Option<f64>,
    pub(crate) skills: Json<Vec<String>>,
    pub(crate) placement_status: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: String,
    pub(crate) question_text: String,
    pub(crate) question_type: QuestionType,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) correct_answer: Option<Json<serde_json::Value>>,
    pub(crate) marks: f64,
    pub(crate) negative_marks: f64,
    pub(crate) difficulty_level: DifficultyLevel,
    pub(crate) topic: String,
    pub(crate) subject: Option<String>,
    pub(crate) tags: Json<Vec<String>>,
    pub(crate) created_by: Option<String>,
    pub(crate) organization_id: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// Copy of a question frozen into a test (and later into a result). Accepts
/// the camelCase shape browser clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct TestQuestion {
    #[serde(default)]
    pub(crate) id: String,
    #[serde(alias = "question")]
    pub(crate) question_text: String,
    #[serde(alias = "type")]
    pub(crate) question_type: QuestionType,
    #[serde(default)]
    pub(crate) options: Vec<String>,
    #[serde(default, alias = "correctAnswer")]
    pub(crate) correct_answer: Option<serde_json::Value>,
    pub(crate) marks: f64,
    #[serde(default, alias = "negativeMarks")]
    pub(crate) negative_marks: f64,
    #[serde(default, alias = "difficulty")]
    pub(crate) difficulty_level: DifficultyLevel,
    #[serde(default)]
    pub(crate) topic: String,
}

impl From<&Question> for TestQuestion {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id.clone(),
            question_text: question.question_text.clone(),
            question_type: question.question_type,
            options: question.options.0.clone(),
            correct_answer: question.correct_answer.as_ref().map(|value| value.0.clone()),
            marks: question.marks,
            negative_marks: question.negative_marks,
            difficulty_level: question.difficulty_level,
            topic: question.topic.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct TestSettings {
    #[serde(alias = "proctoringLevel")]
    pub(crate) proctoring_level: ProctoringLevel,
    #[serde(alias = "shuffleQuestions")]
    pub(crate) shuffle_questions: bool,
    #[serde(alias = "negativeMarking")]
    pub(crate) negative_marking: bool,
    #[serde(alias = "allowTabSwitch")]
    pub(crate) allow_tab_switch: bool,
    #[serde(alias = "maxViolations")]
    pub(crate) max_violations: Option<u32>,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            proctoring_level: ProctoringLevel::Moderate,
            shuffle_questions: false,
            negative_marking: false,
            allow_tab_switch: false,
            max_violations: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) company_name: String,
    pub(crate) organization_id: Option<String>,
    pub(crate) created_by: Option<String>,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) passing_marks: f64,
    pub(crate) questions: Json<Vec<TestQuestion>>,
    pub(crate) settings: Json<TestSettings>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamSession {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) start_time: PrimitiveDateTime,
    pub(crate) end_time: Option<PrimitiveDateTime>,
    pub(crate) expires_at: PrimitiveDateTime,
    pub(crate) browser_info: Json<serde_json::Value>,
    pub(crate) device_info: Json<serde_json::Value>,
    pub(crate) ip_address: Option<String>,
    pub(crate) answers: Json<AnswerMap>,
    pub(crate) last_auto_save: Option<PrimitiveDateTime>,
    pub(crate) violation_count: i32,
    pub(crate) is_flagged: bool,
    pub(crate) termination_reason: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) question_id: String,
    pub(crate) response_data: Json<serde_json::Value>,
    pub(crate) is_correct: Option<bool>,
    pub(crate) marks_awarded: f64,
    pub(crate) created_at: PrimitiveDateTime,
}

/// Violation as frozen into a result row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ViolationRecord {
    #[serde(rename = "type")]
    pub(crate) kind: String,
    pub(crate) description: String,
    pub(crate) severity: ViolationSeverity,
    pub(crate) timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamResult {
    pub(crate) id: String,
    pub(crate) exam_session_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) test_id: Option<String>,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken: i32,
    pub(crate) status: ResultStatus,
    pub(crate) violations: Json<Vec<ViolationRecord>>,
    pub(crate) cheating_probability: f64,
    pub(crate) questions: Json<Vec<TestQuestion>>,
    pub(crate) answers: Json<AnswerMap>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ProctoringEvent {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) event_type: String,
    pub(crate) severity: ViolationSeverity,
    pub(crate) confidence_score: f64,
    pub(crate) description: String,
    pub(crate) occurred_at: PrimitiveDateTime,
}

impl ProctoringEvent {
    pub(crate) fn to_record(&self) -> ViolationRecord {
        ViolationRecord {
            kind: self.event_type.clone(),
            description: self.description.clone(),
            severity: self.severity,
            timestamp: crate::core::time::format_primitive(self.occurred_at),
        }
    }
}
