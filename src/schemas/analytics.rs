use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct ActivityItem {
    pub(crate) kind: &'static str,
    pub(crate) description: String,
    pub(crate) occurred_at: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct AdminDashboard {
    pub(crate) total_students: i64,
    pub(crate) active_tests: i64,
    pub(crate) total_results: i64,
    pub(crate) total_violations: i64,
    pub(crate) recent_activity: Vec<ActivityItem>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RecruiterDashboard {
    pub(crate) active_tests: i64,
    pub(crate) total_students: i64,
    pub(crate) total_results: i64,
    /// `None` until at least one result exists.
    pub(crate) average_percentage: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentDashboard {
    pub(crate) available_tests: i64,
    pub(crate) completed_tests: i64,
    pub(crate) total_violations: i64,
    pub(crate) average_percentage: Option<i64>,
    pub(crate) total_time_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct GrowthPoint {
    pub(crate) month: String,
    pub(crate) count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct PlatformAnalytics {
    pub(crate) total_students: i64,
    pub(crate) total_tests: i64,
    pub(crate) total_results: i64,
    pub(crate) total_violations: i64,
    pub(crate) participation_rate: f64,
    pub(crate) average_score: f64,
    pub(crate) pass_rate: f64,
    pub(crate) pass_percentage: f64,
    pub(crate) violations_per_result: f64,
    pub(crate) student_growth: Vec<GrowthPoint>,
}
