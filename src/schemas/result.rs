use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::{AnswerMap, ExamResult, ViolationRecord};
use crate::db::types::ResultStatus;
use crate::repositories::results::ResultRow;
use crate::schemas::test::QuestionView;

#[derive(Debug, Deserialize)]
pub(crate) struct ResultListQuery {
    #[serde(default)]
    pub(crate) search: Option<String>,
    /// `all`, `pass`, `fail` or `under-review`.
    #[serde(default)]
    pub(crate) status: Option<String>,
    /// `date`, `score` or `percentage`.
    #[serde(default, alias = "sortBy")]
    pub(crate) sort: Option<String>,
    #[serde(default, alias = "testId")]
    pub(crate) test_id: Option<String>,
    #[serde(default)]
    pub(crate) skip: i64,
    #[serde(default = "crate::api::pagination::default_limit")]
    pub(crate) limit: i64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusUpdateRequest {
    pub(crate) status: ResultStatus,
}

#[derive(Debug, Serialize)]
pub(crate) struct ResultResponse {
    pub(crate) id: String,
    pub(crate) exam_session_id: Option<String>,
    pub(crate) student_id: Option<String>,
    pub(crate) test_id: Option<String>,
    pub(crate) test_title: Option<String>,
    pub(crate) student_name: Option<String>,
    pub(crate) enrollment_number: Option<String>,
    pub(crate) score: f64,
    pub(crate) total_marks: f64,
    pub(crate) percentage: f64,
    pub(crate) time_taken: i32,
    pub(crate) status: ResultStatus,
    pub(crate) violations: Vec<ViolationRecord>,
    pub(crate) cheating_probability: f64,
    pub(crate) questions: Vec<QuestionView>,
    pub(crate) answers: AnswerMap,
    pub(crate) created_at: String,
}

impl ResultResponse {
    pub(crate) fn from_row(row: ResultRow) -> Self {
        let mut response = Self::from_result(row.result);
        response.test_title = row.test_title;
        response.student_name = row.student_name;
        response.enrollment_number = row.enrollment_number;
        response
    }

    /// Finished results carry the answer key so the review can show it.
    pub(crate) fn from_result(result: ExamResult) -> Self {
        Self {
            id: result.id,
            exam_session_id: result.exam_session_id,
            student_id: result.student_id,
            test_id: result.test_id,
            test_title: None,
            student_name: None,
            enrollment_number: None,
            score: result.score,
            total_marks: result.total_marks,
            percentage: result.percentage,
            time_taken: result.time_taken,
            status: result.status,
            violations: result.violations.0,
            cheating_probability: result.cheating_probability,
            questions: result
                .questions
                .0
                .into_iter()
                .map(|question| QuestionView::from_question(question, true))
                .collect(),
            answers: result.answers.0,
            created_at: format_primitive(result.created_at),
        }
    }
}
