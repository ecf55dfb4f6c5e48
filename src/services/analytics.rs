use anyhow::{Context, Result};

use crate::core::state::AppState;
use crate::core::time::format_primitive;
use crate::repositories;
use crate::repositories::results::ResultFilter;
use crate::schemas::analytics::{
    ActivityItem, AdminDashboard, GrowthPoint, PlatformAnalytics, RecruiterDashboard,
    StudentDashboard,
};

/// Share of the possible (student, test) pairs that produced a result.
pub(crate) fn participation_rate(results: i64, students: i64, tests: i64) -> f64 {
    if students <= 0 || tests <= 0 {
        return 0.0;
    }
    results as f64 / (students as f64 * tests as f64) * 100.0
}

pub(crate) fn ratio_percent(part: i64, whole: i64) -> f64 {
    if whole <= 0 {
        return 0.0;
    }
    part as f64 / whole as f64 * 100.0
}

pub(crate) fn per_result(total: i64, results: i64) -> f64 {
    if results <= 0 {
        return 0.0;
    }
    total as f64 / results as f64
}

/// Rounds an average to a whole percent, or `None` when nothing was averaged.
pub(crate) fn rounded_average(average: f64, count: i64) -> Option<i64> {
    (count > 0).then(|| average.round() as i64)
}

pub(crate) fn minutes_to_hours(minutes: i64) -> f64 {
    round_to(minutes as f64 / 60.0, 1)
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Turns per-month registration counts into a running total.
pub(crate) fn cumulative_growth(monthly: &[(String, i64)]) -> Vec<GrowthPoint> {
    let mut running = 0;
    monthly
        .iter()
        .map(|(month, count)| {
            running += count;
            GrowthPoint { month: month.clone(), count: running }
        })
        .collect()
}

pub(crate) async fn admin_dashboard(state: &AppState) -> Result<AdminDashboard> {
    let pool = state.db();
    let pass_percentage = state.settings().exam().pass_percentage;

    let total_students =
        repositories::students::count_all(pool).await.context("Failed to count students")?;
    let active_tests =
        repositories::tests::count_active(pool, None).await.context("Failed to count tests")?;
    let stats = repositories::results::stats(pool, &ResultFilter::default(), pass_percentage)
        .await
        .context("Failed to aggregate results")?;
    let session_violations = repositories::sessions::total_violations(pool, None)
        .await
        .context("Failed to sum session violations")?;

    let mut recent_activity = Vec::new();
    if let Some(student) =
        repositories::students::latest(pool).await.context("Failed to load latest student")?
    {
        recent_activity.push(ActivityItem {
            kind: "student",
            description: format!("New student registered: {}", student.student_name),
            occurred_at: format_primitive(student.created_at),
        });
    }
    if let Some(row) =
        repositories::results::latest(pool).await.context("Failed to load latest result")?
    {
        let who = row.student_name.clone().unwrap_or_else(|| "a student".to_string());
        recent_activity.push(ActivityItem {
            kind: "result",
            description: format!("Test completed by {who}"),
            occurred_at: format_primitive(row.result.created_at),
        });
    }
    if let Some(event) = repositories::proctoring_events::latest(pool)
        .await
        .context("Failed to load latest proctoring event")?
    {
        recent_activity.push(ActivityItem {
            kind: "violation",
            description: event.description,
            occurred_at: format_primitive(event.occurred_at),
        });
    }
    if let Some(test) =
        repositories::tests::latest(pool).await.context("Failed to load latest test")?
    {
        let description = if test.company_name.is_empty() {
            "New test created".to_string()
        } else {
            format!("New test created by {}", test.company_name)
        };
        recent_activity.push(ActivityItem {
            kind: "test",
            description,
            occurred_at: format_primitive(test.created_at),
        });
    }
    recent_activity.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));

    Ok(AdminDashboard {
        total_students,
        active_tests,
        total_results: stats.total,
        total_violations: session_violations + stats.violations,
        recent_activity,
    })
}

pub(crate) async fn recruiter_dashboard(
    state: &AppState,
    recruiter_id: &str,
) -> Result<RecruiterDashboard> {
    let pool = state.db();
    let active_tests = repositories::tests::count_active(pool, Some(recruiter_id))
        .await
        .context("Failed to count authored tests")?;
    let total_students =
        repositories::students::count_all(pool).await.context("Failed to count students")?;
    let filter =
        ResultFilter { test_author: Some(recruiter_id.to_string()), ..ResultFilter::default() };
    let stats = repositories::results::stats(pool, &filter, state.settings().exam().pass_percentage)
        .await
        .context("Failed to aggregate results")?;

    Ok(RecruiterDashboard {
        active_tests,
        total_students,
        total_results: stats.total,
        average_percentage: rounded_average(stats.average_percentage, stats.total),
    })
}

pub(crate) async fn student_dashboard(
    state: &AppState,
    student_id: &str,
) -> Result<StudentDashboard> {
    let pool = state.db();
    let available_tests =
        repositories::tests::count_active(pool, None).await.context("Failed to count tests")?;
    let filter =
        ResultFilter { student_id: Some(student_id.to_string()), ..ResultFilter::default() };
    let stats = repositories::results::stats(pool, &filter, state.settings().exam().pass_percentage)
        .await
        .context("Failed to aggregate results")?;

    Ok(StudentDashboard {
        available_tests,
        completed_tests: stats.total,
        total_violations: stats.violations,
        average_percentage: rounded_average(stats.average_percentage, stats.total),
        total_time_hours: minutes_to_hours(stats.time_taken_minutes),
    })
}

pub(crate) async fn platform_analytics(state: &AppState) -> Result<PlatformAnalytics> {
    let pool = state.db();
    let pass_percentage = state.settings().exam().analytics_pass_percentage;

    let total_students =
        repositories::students::count_all(pool).await.context("Failed to count students")?;
    let total_tests =
        repositories::tests::count_all(pool).await.context("Failed to count tests")?;
    let stats = repositories::results::stats(pool, &ResultFilter::default(), pass_percentage)
        .await
        .context("Failed to aggregate results")?;
    let monthly = repositories::students::monthly_registrations(pool)
        .await
        .context("Failed to load registrations")?;

    Ok(PlatformAnalytics {
        total_students,
        total_tests,
        total_results: stats.total,
        total_violations: stats.violations,
        participation_rate: round_to(
            participation_rate(stats.total, total_students, total_tests),
            2,
        ),
        average_score: round_to(stats.average_score, 2),
        pass_rate: round_to(ratio_percent(stats.passed, stats.total), 2),
        pass_percentage,
        violations_per_result: round_to(per_result(stats.violations, stats.total), 2),
        student_growth: cumulative_growth(&monthly),
    })
}
