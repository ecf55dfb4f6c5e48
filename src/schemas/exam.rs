use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{AnswerMap, ExamSession, ProctoringEvent, Test};
use crate::db::types::{SessionStatus, ViolationSeverity};
use crate::schemas::result::ResultResponse;
use crate::schemas::test::QuestionView;
use crate::services::{exam_timer, question_order};

#[derive(Debug, Deserialize)]
pub(crate) struct StartExamRequest {
    #[serde(alias = "testId")]
    pub(crate) test_id: String,
    #[serde(default = "empty_object", alias = "browserInfo")]
    pub(crate) browser_info: serde_json::Value,
    #[serde(default = "empty_object", alias = "deviceInfo")]
    pub(crate) device_info: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SessionListQuery {
    #[serde(default, alias = "testId")]
    pub(crate) test_id: Option<String>,
    #[serde(default, alias = "studentId")]
    pub(crate) student_id: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<SessionStatus>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveAnswersRequest {
    pub(crate) answers: AnswerMap,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmitRequest {
    /// Final answers merged before scoring; the last auto-save is used
    /// otherwise.
    #[serde(default)]
    pub(crate) answers: Option<AnswerMap>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TerminateRequest {
    #[serde(default)]
    pub(crate) reason: Option<String>,
}

/// The test as a candidate sees it while taking it.
#[derive(Debug, Serialize)]
pub(crate) struct ExamTestView {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) company_name: String,
    pub(crate) duration_minutes: i32,
    pub(crate) total_marks: f64,
    pub(crate) allow_tab_switch: bool,
    pub(crate) questions: Vec<QuestionView>,
}

impl ExamTestView {
    pub(crate) fn for_session(test: Test, session_id: &str) -> Self {
        let settings = test.settings.0;
        let questions =
            question_order::for_session(test.questions.0, session_id, settings.shuffle_questions)
                .into_iter()
                .map(|question| QuestionView::from_question(question, false))
                .collect();

        Self {
            id: test.id,
            title: test.title,
            description: test.description,
            company_name: test.company_name,
            duration_minutes: test.duration_minutes,
            total_marks: test.total_marks,
            allow_tab_switch: settings.allow_tab_switch,
            questions,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SessionResponse {
    pub(crate) id: String,
    pub(crate) test_id: String,
    pub(crate) student_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) start_time: String,
    pub(crate) end_time: Option<String>,
    pub(crate) expires_at: String,
    pub(crate) remaining_seconds: i64,
    /// Countdown rendered as `HH:MM:SS`.
    pub(crate) time_remaining: String,
    pub(crate) answers: AnswerMap,
    pub(crate) last_auto_save: Option<String>,
    pub(crate) violation_count: i32,
    pub(crate) is_flagged: bool,
    pub(crate) termination_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) test: Option<ExamTestView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) result_id: Option<String>,
}

impl SessionResponse {
    pub(crate) fn from_db(session: ExamSession, now: time::PrimitiveDateTime) -> Self {
        let remaining_seconds = if session.status == SessionStatus::InProgress {
            exam_timer::remaining_seconds(now, session.expires_at)
        } else {
            0
        };

        Self {
            id: session.id,
            test_id: session.test_id,
            student_id: session.student_id,
            status: session.status,
            start_time: format_primitive(session.start_time),
            end_time: session.end_time.map(format_primitive),
            expires_at: format_primitive(session.expires_at),
            remaining_seconds,
            time_remaining: exam_timer::format_clock(remaining_seconds),
            answers: session.answers.0,
            last_auto_save: session.last_auto_save.map(format_primitive),
            violation_count: session.violation_count,
            is_flagged: session.is_flagged,
            termination_reason: session.termination_reason,
            test: None,
            result_id: None,
        }
    }

    pub(crate) fn with_test(mut self, test: Option<ExamTestView>) -> Self {
        self.test = test;
        self
    }

    pub(crate) fn with_result(mut self, result_id: Option<String>) -> Self {
        self.result_id = result_id;
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SaveAnswersResponse {
    pub(crate) session_id: String,
    pub(crate) saved_at: String,
    pub(crate) answered: usize,
    pub(crate) remaining_seconds: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SubmitResponse {
    pub(crate) session_id: String,
    pub(crate) status: SessionStatus,
    pub(crate) result: Option<ResultResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ViolationResponse {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) event_type: String,
    pub(crate) severity: ViolationSeverity,
    pub(crate) confidence_score: f64,
    pub(crate) description: String,
    pub(crate) occurred_at: String,
}

impl ViolationResponse {
    pub(crate) fn from_db(event: ProctoringEvent) -> Self {
        Self {
            id: event.id,
            session_id: event.session_id,
            event_type: event.event_type,
            severity: event.severity,
            confidence_score: event.confidence_score,
            description: event.description,
            occurred_at: format_primitive(event.occurred_at),
        }
    }
}

/// Outcome of a client-reported violation. `recorded` is false when the
/// test allows the reported behaviour.
#[derive(Debug, Serialize)]
pub(crate) struct ViolationReport {
    pub(crate) recorded: bool,
    pub(crate) violation_count: i32,
    pub(crate) is_flagged: bool,
    pub(crate) event: Option<ViolationResponse>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
