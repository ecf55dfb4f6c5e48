use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Profile, TestSettings};
use crate::db::types::UserRole;
use crate::repositories;
use crate::repositories::sessions::CreateSession;
use crate::test_support::{self, TestContext};

async fn recruiter_and_student(ctx: &TestContext) -> (Profile, Profile) {
    let recruiter = test_support::insert_profile(
        ctx.state.db(),
        "recruiter@techcorp.com",
        "Recruiter",
        "recruiter-pass",
        UserRole::Recruiter,
    )
    .await;
    let student = test_support::insert_profile(
        ctx.state.db(),
        "student@college.edu",
        "Asha Verma",
        "student-pass",
        UserRole::Student,
    )
    .await;
    (recruiter, student)
}

async fn start(ctx: &TestContext, token: &str, test_id: &str) -> (StatusCode, serde_json::Value) {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams/start",
            Some(token),
            Some(json!({ "testId": test_id, "browserInfo": { "userAgent": "test-agent" } })),
        ))
        .await
        .expect("start exam");
    let status = response.status();
    (status, test_support::read_json(response).await)
}

#[tokio::test]
async fn student_takes_and_submits_exam() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 1, 2.0), test_support::mcq("q2", 3, 3.0)],
        TestSettings::default(),
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (status, started) = start(&ctx, &token, &test.id).await;
    assert_eq!(status, StatusCode::CREATED, "response: {started}");
    assert_eq!(started["status"], "in_progress");
    assert_eq!(started["test"]["questions"].as_array().map(Vec::len), Some(2));
    assert!(started["test"]["questions"][0].get("correct_answer").is_none());
    let remaining = started["remaining_seconds"].as_i64().expect("remaining");
    assert!(remaining > 29 * 60 && remaining <= 30 * 60);
    let session_id = started["id"].as_str().expect("id").to_string();

    let (status, again) = start(&ctx, &token, &test.id).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], session_id.as_str());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/sessions/{session_id}/answers"),
            Some(&token),
            Some(json!({ "answers": { "q1": 1 } })),
        ))
        .await
        .expect("save answers");
    let status = response.status();
    let saved = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {saved}");
    assert_eq!(saved["answered"], 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/submit"),
            Some(&token),
            Some(json!({ "answers": { "q2": 3 } })),
        ))
        .await
        .expect("submit exam");
    let status = response.status();
    let submitted = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {submitted}");
    assert_eq!(submitted["status"], "completed");
    assert_eq!(submitted["result"]["score"], 5.0);
    assert_eq!(submitted["result"]["percentage"], 100.0);
    assert_eq!(submitted["result"]["status"], "pass");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/submit"),
            Some(&token),
            None,
        ))
        .await
        .expect("submit again");
    let resubmitted = test_support::read_json(response).await;
    assert_eq!(resubmitted["result"]["id"], submitted["result"]["id"]);
}

#[tokio::test]
async fn tab_switch_is_recorded_unless_allowed() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let strict = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Strict",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings { max_violations: Some(1), ..TestSettings::default() },
    )
    .await;
    let relaxed = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Relaxed",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings { allow_tab_switch: true, ..TestSettings::default() },
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());

    let (_, strict_session) = start(&ctx, &token, &strict.id).await;
    let (_, relaxed_session) = start(&ctx, &token, &relaxed.id).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{}/tab-switch", strict_session["id"].as_str().unwrap()),
            Some(&token),
            None,
        ))
        .await
        .expect("report tab switch");
    let report = test_support::read_json(response).await;
    assert_eq!(report["recorded"], true);
    assert_eq!(report["violation_count"], 1);
    assert_eq!(report["is_flagged"], true);
    assert_eq!(report["event"]["event_type"], "tab-switch");
    assert_eq!(report["event"]["description"], "Student switched tabs during exam");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{}/tab-switch", relaxed_session["id"].as_str().unwrap()),
            Some(&token),
            None,
        ))
        .await
        .expect("report tab switch");
    let report = test_support::read_json(response).await;
    assert_eq!(report["recorded"], false);
    assert_eq!(report["violation_count"], 0);

    let recruiter_token = test_support::bearer_token(&recruiter.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/sessions/{}/violations", strict_session["id"].as_str().unwrap()),
            Some(&recruiter_token),
            None,
        ))
        .await
        .expect("list violations");
    let events = test_support::read_json(response).await;
    assert_eq!(events.as_array().map(Vec::len), Some(1));
    assert_eq!(events[0]["severity"], "medium");
}

#[tokio::test]
async fn expired_session_is_submitted_on_read() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Timed",
        vec![test_support::mcq("q1", 2, 4.0)],
        TestSettings::default(),
    )
    .await;

    let now = primitive_now_utc();
    let session = repositories::sessions::create(
        ctx.state.db(),
        CreateSession {
            id: "expired-session",
            test_id: &test.id,
            student_id: &student.id,
            start_time: now - Duration::minutes(40),
            expires_at: now - Duration::minutes(10),
            browser_info: json!({}),
            device_info: json!({}),
            ip_address: None,
        },
    )
    .await
    .expect("create session");
    let mut answers = crate::db::models::AnswerMap::new();
    answers.insert("q1".to_string(), json!(2));
    repositories::sessions::save_answers(ctx.state.db(), &session.id, &answers, now)
        .await
        .expect("save answers");

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/sessions/{}", session.id),
            Some(&token),
            None,
        ))
        .await
        .expect("get session");
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "expired");
    assert_eq!(body["remaining_seconds"], 0);
    assert_eq!(body["time_remaining"], "00:00:00");
    assert!(body.get("test").is_none());

    let result = repositories::results::find_by_session(ctx.state.db(), &session.id)
        .await
        .expect("fetch result")
        .expect("result created");
    assert_eq!(body["result_id"], result.id.as_str());
    assert_eq!(result.score, 4.0);
    assert_eq!(result.time_taken, 30);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/sessions/{}/answers", session.id),
            Some(&token),
            Some(json!({ "answers": { "q1": 0 } })),
        ))
        .await
        .expect("save after expiry");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn other_students_cannot_touch_a_session() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let intruder = test_support::insert_profile(
        ctx.state.db(),
        "intruder@college.edu",
        "Intruder",
        "student-pass",
        UserRole::Student,
    )
    .await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings::default(),
    )
    .await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let (_, started) = start(&ctx, &token, &test.id).await;
    let session_id = started["id"].as_str().expect("id").to_string();

    let intruder_token = test_support::bearer_token(&intruder.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/submit"),
            Some(&intruder_token),
            None,
        ))
        .await
        .expect("foreign submit");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/sessions/{session_id}/answers"),
            Some(&token),
            Some(json!({ "answers": { "not-a-question": 1 } })),
        ))
        .await
        .expect("save unknown question");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_terminates_session_without_result() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let admin = test_support::insert_profile(
        ctx.state.db(),
        "admin@intellihire.com",
        "Admin",
        "admin-pass",
        UserRole::Admin,
    )
    .await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings::default(),
    )
    .await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let (_, started) = start(&ctx, &token, &test.id).await;
    let session_id = started["id"].as_str().expect("id").to_string();

    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/terminate"),
            Some(&admin_token),
            Some(json!({ "reason": "Impersonation suspected" })),
        ))
        .await
        .expect("terminate");
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "terminated");
    assert_eq!(body["termination_reason"], "Impersonation suspected");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/submit"),
            Some(&token),
            None,
        ))
        .await
        .expect("submit terminated");
    let body = test_support::read_json(response).await;
    assert_eq!(body["status"], "terminated");
    assert!(body["result"].is_null());
}

#[tokio::test]
async fn admin_terminates_session_without_a_body() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let admin = test_support::insert_profile(
        ctx.state.db(),
        "admin@intellihire.com",
        "Admin",
        "admin-pass",
        UserRole::Admin,
    )
    .await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings::default(),
    )
    .await;

    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let (_, started) = start(&ctx, &token, &test.id).await;
    let session_id = started["id"].as_str().expect("id").to_string();

    let admin_token = test_support::bearer_token(&admin.id, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/terminate"),
            Some(&admin_token),
            None,
        ))
        .await
        .expect("terminate");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "terminated");
    assert_eq!(body["termination_reason"], "Terminated by administrator");
}

#[tokio::test]
async fn autosave_is_limited_to_one_per_interval() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0), test_support::mcq("q2", 1, 1.0)],
        TestSettings::default(),
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let (_, started) = start(&ctx, &token, &test.id).await;
    let session_id = started["id"].as_str().expect("id").to_string();

    let save = |answers: serde_json::Value| {
        test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/sessions/{session_id}/answers"),
            Some(&token),
            Some(json!({ "answers": answers })),
        )
    };

    let response = ctx.app.clone().oneshot(save(json!({ "q1": 0 }))).await.expect("first save");
    assert_eq!(response.status(), StatusCode::OK);

    let response = ctx.app.clone().oneshot(save(json!({ "q2": 1 }))).await.expect("second save");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS, "response: {body}");

    let session = repositories::sessions::find_by_id(ctx.state.db(), &session_id)
        .await
        .expect("fetch")
        .expect("session");
    assert_eq!(session.answers.0.len(), 1);
    assert!(session.answers.0.contains_key("q1"));
}

#[tokio::test]
async fn start_is_refused_when_the_service_is_at_capacity() {
    let ctx = test_support::setup_test_context().await;
    std::env::set_var("MAX_CONCURRENT_EXAMS", "1");
    let settings = Settings::load().expect("settings");
    std::env::remove_var("MAX_CONCURRENT_EXAMS");
    let state = AppState::new(settings, ctx.state.db().clone(), ctx.state.redis().clone());
    let app = crate::api::router::router(state.clone());

    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let other = test_support::insert_profile(
        state.db(),
        "second@college.edu",
        "Rohan Iyer",
        "student-pass",
        UserRole::Student,
    )
    .await;
    let test = test_support::insert_test(
        state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings::default(),
    )
    .await;

    let start_request = |token: &str| {
        test_support::json_request(
            Method::POST,
            "/api/v1/exams/start",
            Some(token),
            Some(json!({ "testId": test.id })),
        )
    };

    let first = test_support::bearer_token(&student.id, state.settings());
    let response = app.clone().oneshot(start_request(&first)).await.expect("first start");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app.clone().oneshot(start_request(&first)).await.expect("resume");
    assert_eq!(response.status(), StatusCode::OK);

    let second = test_support::bearer_token(&other.id, state.settings());
    let response = app.oneshot(start_request(&second)).await.expect("second start");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "response: {body}");

    let open = repositories::sessions::count_in_progress(state.db()).await.expect("count");
    assert_eq!(open, 1);
}

#[tokio::test]
async fn camera_error_is_recorded_as_a_violation() {
    let ctx = test_support::setup_test_context().await;
    let (recruiter, student) = recruiter_and_student(&ctx).await;
    let test = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Aptitude",
        vec![test_support::mcq("q1", 0, 1.0)],
        TestSettings::default(),
    )
    .await;
    let token = test_support::bearer_token(&student.id, ctx.state.settings());
    let (_, started) = start(&ctx, &token, &test.id).await;
    let session_id = started["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/exams/sessions/{session_id}/camera-error"),
            Some(&token),
            None,
        ))
        .await
        .expect("camera error");
    let status = response.status();
    let report = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {report}");
    assert_eq!(report["recorded"], true);
    assert_eq!(report["violation_count"], 1);
    assert_eq!(report["event"]["event_type"], "camera-error");

    let events = repositories::proctoring_events::list_by_session(ctx.state.db(), &session_id)
        .await
        .expect("events");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "camera-error");
    assert_eq!(events[0].description, "Failed to access camera");
}
