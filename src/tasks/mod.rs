pub(crate) mod exam_sessions;
pub(crate) mod scheduler;
