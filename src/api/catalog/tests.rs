use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::models::TestSettings;
use crate::db::types::UserRole;
use crate::test_support;

#[tokio::test]
async fn recruiter_creates_test_from_inline_and_bank_questions() {
    let ctx = test_support::setup_test_context().await;
    let recruiter = test_support::insert_profile(
        ctx.state.db(),
        "recruiter@techcorp.com",
        "Recruiter",
        "recruiter-pass",
        UserRole::Recruiter,
    )
    .await;
    let token = test_support::bearer_token(&recruiter.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/questions",
            Some(&token),
            Some(json!({
                "question": "Which keyword declares an immutable binding?",
                "type": "mcq",
                "options": ["let", "mut", "var", "const fn"],
                "correctAnswer": 0,
                "marks": 3
            })),
        ))
        .await
        .expect("create bank question");
    let bank_question = test_support::read_json(response).await;
    let bank_id = bank_question["id"].as_str().expect("id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/tests",
            Some(&token),
            Some(json!({
                "title": "Rust Screening",
                "companyName": "TechCorp Solutions",
                "duration": 45,
                "questions": [{
                    "question": "Pick the even numbers",
                    "type": "multiple_select",
                    "options": ["1", "2", "3", "4"],
                    "correctAnswer": [1, 3],
                    "marks": 2
                }],
                "questionIds": [bank_id],
                "settings": { "proctoringLevel": "strict", "negativeMarking": true }
            })),
        ))
        .await
        .expect("create test");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    assert_eq!(created["question_count"], 2);
    assert_eq!(created["total_marks"], 5.0);
    assert_eq!(created["passing_marks"], 2.0);
    assert_eq!(created["settings"]["proctoring_level"], "strict");
    assert_eq!(created["questions"][1]["id"], bank_id);
    assert_eq!(created["questions"][0]["correct_answer"], json!([1, 3]));
}

#[tokio::test]
async fn students_see_only_active_tests_without_answer_keys() {
    let ctx = test_support::setup_test_context().await;
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
        "Student",
        "student-pass",
        UserRole::Student,
    )
    .await;

    let active = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Active Test",
        vec![test_support::mcq("q1", 1, 2.0)],
        TestSettings::default(),
    )
    .await;
    let hidden = test_support::insert_test(
        ctx.state.db(),
        &recruiter.id,
        "Hidden Test",
        vec![test_support::mcq("q1", 2, 2.0)],
        TestSettings::default(),
    )
    .await;

    let recruiter_token = test_support::bearer_token(&recruiter.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/tests/{}/toggle-active", hidden.id),
            Some(&recruiter_token),
            None,
        ))
        .await
        .expect("toggle test");
    let toggled = test_support::read_json(response).await;
    assert_eq!(toggled["is_active"], false);

    let student_token = test_support::bearer_token(&student.id, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/tests",
            Some(&student_token),
            None,
        ))
        .await
        .expect("list tests");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["id"], active.id.as_str());
    assert!(listed["items"][0]["questions"][0].get("correct_answer").is_none());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/tests/{}", hidden.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("get hidden test");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_without_questions_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let admin = test_support::insert_profile(
        ctx.state.db(),
        "admin@intellihire.com",
        "Admin",
        "admin-pass",
        UserRole::Admin,
    )
    .await;
    let token = test_support::bearer_token(&admin.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/tests",
            Some(&token),
            Some(json!({ "title": "Empty", "duration": 30 })),
        ))
        .await
        .expect("create test");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn updating_questions_recomputes_totals() {
    let ctx = test_support::setup_test_context().await;
    let recruiter = test_support::insert_profile(
        ctx.state.db(),
        "recruiter@techcorp.com",
        "Recruiter",
        "recruiter-pass",
        UserRole::Recruiter,
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
    let token = test_support::bearer_token(&recruiter.id, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/tests/{}", test.id),
            Some(&token),
            Some(json!({
                "questions": [
                    { "id": "a", "question": "First", "type": "mcq", "options": ["x", "y"], "correctAnswer": 1, "marks": 4 },
                    { "id": "b", "question": "Second", "type": "coding", "marks": 6 }
                ],
                "passingMarks": 5
            })),
        ))
        .await
        .expect("update test");

    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["total_marks"], 10.0);
    assert_eq!(updated["passing_marks"], 5.0);
    assert_eq!(updated["question_count"], 2);
}
