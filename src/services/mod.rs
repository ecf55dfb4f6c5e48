pub(crate) mod analytics;
pub(crate) mod exam_finalize;
pub(crate) mod exam_timer;
pub(crate) mod proctoring;
pub(crate) mod question_order;
pub(crate) mod reports;
pub(crate) mod scoring;
pub(crate) mod seeding;
pub(crate) mod student_csv;
pub(crate) mod table_api;
pub(crate) mod violations;
