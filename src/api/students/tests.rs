use axum::http::{header, Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::UserRole;
use crate::test_support;

async fn admin_token(ctx: &test_support::TestContext) -> String {
    let admin = test_support::insert_profile(
        ctx.state.db(),
        "admin@intellihire.com",
        "Admin User",
        "admin-pass",
        UserRole::Admin,
    )
    .await;
    test_support::bearer_token(&admin.id, ctx.state.settings())
}

#[tokio::test]
async fn list_filters_by_search_and_course() {
    let ctx = test_support::setup_test_context().await;
    let token = admin_token(&ctx).await;

    for (enrollment, name, course) in [
        ("21CS001", "Aarav Mehta", "B.Tech"),
        ("21CS002", "Diya Patel", "MCA"),
        ("21CS003", "Arjun Rao", "B.Tech"),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/students",
                Some(&token),
                Some(json!({
                    "enrollmentNumber": enrollment,
                    "name": name,
                    "email": format!("{}@college.edu", enrollment.to_lowercase()),
                    "phone": "+919876543210",
                    "course": course,
                    "branch": "Computer Science"
                })),
            ))
            .await
            .expect("create student");
        let status = response.status();
        let body = test_support::read_json(response).await;
        assert_eq!(status, StatusCode::CREATED, "response: {body}");
    }

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students?course=B.Tech&search=ar",
            Some(&token),
            None,
        ))
        .await
        .expect("list students");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students?course=all&search=21cs002",
            Some(&token),
            None,
        ))
        .await
        .expect("list students");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["student_name"], "Diya Patel");

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/courses",
            Some(&token),
            None,
        ))
        .await
        .expect("list courses");
    let courses = test_support::read_json(response).await;
    assert_eq!(courses, json!(["B.Tech", "MCA"]));
}

#[tokio::test]
async fn duplicate_enrollment_number_conflicts() {
    let ctx = test_support::setup_test_context().await;
    let token = admin_token(&ctx).await;

    let payload = json!({
        "enrollment_number": "21CS001",
        "student_name": "Aarav Mehta",
        "student_email": "aarav@college.edu"
    });

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(payload.clone()),
        ))
        .await
        .expect("create student");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/students",
            Some(&token),
            Some(payload),
        ))
        .await
        .expect("create student again");
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn export_then_import_reproduces_students() {
    let ctx = test_support::setup_test_context().await;
    let token = admin_token(&ctx).await;

    let csv = "Enrollment Number,Name,Email,Phone,Course,Branch\n\
               21CS001,\"Mehta, Aarav\",aarav@college.edu,+91 98765,B.Tech,CSE\n\
               21CS002,Diya Patel,diya@college.edu,+91 91234,MCA,IT\n\
               ,Missing Enrollment,nobody@college.edu,,B.Tech,CSE\n";

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/students/import",
            &token,
            "students.csv",
            csv.as_bytes(),
        ))
        .await
        .expect("import students");
    let status = response.status();
    let summary = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {summary}");
    assert_eq!(summary["imported"], 2);
    assert_eq!(summary["skipped"], 0);
    assert_eq!(summary["invalid_rows"], 1);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/export",
            Some(&token),
            None,
        ))
        .await
        .expect("export students");
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert_eq!(disposition, "attachment; filename=\"students.csv\"");
    let exported = test_support::read_text(response).await;
    assert!(exported.starts_with(
        "\"Name\",\"Enrollment Number\",\"Email\",\"Phone\",\"Course\",\"Branch\",\"Registered\""
    ));
    assert!(exported.contains("\"Mehta, Aarav\",\"21CS001\""));

    test_support::reset_db(ctx.state.db()).await.expect("reset db");
    let token = admin_token(&ctx).await;

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/students/import",
            &token,
            "students.csv",
            exported.as_bytes(),
        ))
        .await
        .expect("re-import students");
    let summary = test_support::read_json(response).await;
    assert_eq!(summary["imported"], 2);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::multipart_request(
            "/api/v1/students/import",
            &token,
            "students.csv",
            exported.as_bytes(),
        ))
        .await
        .expect("import duplicates");
    let summary = test_support::read_json(response).await;
    assert_eq!(summary["imported"], 0);
    assert_eq!(summary["skipped"], 2);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students?search=21CS001",
            Some(&token),
            None,
        ))
        .await
        .expect("list students");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["items"][0]["student_name"], "Mehta, Aarav");
}

#[tokio::test]
async fn import_without_required_headers_is_rejected() {
    let ctx = test_support::setup_test_context().await;
    let token = admin_token(&ctx).await;

    let response = ctx
        .app
        .oneshot(test_support::multipart_request(
            "/api/v1/students/import",
            &token,
            "students.csv",
            b"Name,Email\nAarav,aarav@college.edu\n",
        ))
        .await
        .expect("import students");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
}

#[tokio::test]
async fn student_reads_own_record() {
    let ctx = test_support::setup_test_context().await;
    let profile = test_support::insert_profile(
        ctx.state.db(),
        "aarav@college.edu",
        "Aarav Mehta",
        "student-pass",
        UserRole::Student,
    )
    .await;
    test_support::insert_student_record(ctx.state.db(), &profile, "21CS001", "B.Tech").await;
    let token = test_support::bearer_token(&profile.id, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/students/me",
            Some(&token),
            None,
        ))
        .await
        .expect("my record");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["enrollment_number"], "21CS001");

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/students", Some(&token), None))
        .await
        .expect("list as student");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let ctx = test_support::setup_test_context().await;
    let token = admin_token(&ctx).await;

    for (enrollment, name) in [("21CS_01", "Kabir Shah"), ("21CSX01", "Meera Nair")] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/students",
                Some(&token),
                Some(json!({
                    "enrollmentNumber": enrollment,
                    "name": name,
                    "email": format!("{}@college.edu", name.split(' ').next().unwrap_or(name).to_lowercase()),
                    "phone": "+919876543210",
                    "course": "B.Tech",
                    "branch": "Computer Science"
                })),
            ))
            .await
            .expect("create student");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let list = |query: &str| {
        test_support::json_request(
            Method::GET,
            &format!("/api/v1/students?search={query}"),
            Some(&token),
            None,
        )
    };

    let response = ctx.app.clone().oneshot(list("cs_0")).await.expect("list students");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 1);
    assert_eq!(listed["items"][0]["student_name"], "Kabir Shah");

    let response = ctx.app.clone().oneshot(list("%25")).await.expect("list students");
    let listed = test_support::read_json(response).await;
    assert_eq!(listed["total_count"], 0);
}
