use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use crate::db::types::AssignmentStatus;
use crate::test_support::{self, AssignmentFixture};

#[tokio::test]
async fn teacher_creates_assignment() {
    let ctx = test_support::setup_test_context().await;

    let (teacher, _) =
        test_support::insert_teacher(ctx.state.db(), "asgteach1", "Assign Teacher", "teacher-pass")
            .await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assignments",
            Some(&token),
            Some(json!({
                "title": "Essay One",
                "description": "Write an essay",
                "status": "published",
                "deadline": "2030-06-01T12:00:00Z",
                "max_points": 50,
                "allow_late_submissions": true,
                "late_penalty_percentage": 10
            })),
        ))
        .await
        .expect("create assignment");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["title"], "Essay One");
    assert_eq!(body["max_points"], 50);
    assert_eq!(body["is_deadline_expired"], false);
    assert_eq!(body["submission_count"], 0);
}

#[tokio::test]
async fn student_cannot_create_assignment() {
    let ctx = test_support::setup_test_context().await;

    let (student, _) =
        test_support::insert_student(ctx.state.db(), "asgstud1", "Assign Student", "student-pass")
            .await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assignments",
            Some(&token),
            Some(json!({"title": "Nope", "deadline": "2030-06-01T12:00:00Z"})),
        ))
        .await
        .expect("create assignment as student");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn create_rejects_out_of_range_penalty() {
    let ctx = test_support::setup_test_context().await;

    let (teacher, _) =
        test_support::insert_teacher(ctx.state.db(), "asgteach2", "Assign Teacher", "teacher-pass")
            .await;
    let token = test_support::bearer_token(&teacher, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/assignments",
            Some(&token),
            Some(json!({
                "title": "Bad Penalty",
                "deadline": "2030-06-01T12:00:00Z",
                "late_penalty_percentage": 120
            })),
        ))
        .await
        .expect("create assignment");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn student_list_shows_only_published_targeted_assignments() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "asgteach3", "Assign Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "asgstud3", "Assign Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Cohort A", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;

    let published = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Published For Me"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &published.id, &group.id, None).await;

    let draft = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            status: AssignmentStatus::Draft,
            ..AssignmentFixture::published(&teacher_profile.id, "Draft For Me")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &draft.id, &group.id, None).await;

    // Published but targeting nobody the student knows.
    test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Unrelated"),
    )
    .await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/assignments", Some(&token), None))
        .await
        .expect("list assignments");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["title"], "Published For Me");
}

#[tokio::test]
async fn teacher_list_includes_taught_group_assignments() {
    let ctx = test_support::setup_test_context().await;

    let (_, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator4", "Creator Teacher", "teacher-pass")
            .await;
    let (colleague, colleague_profile) =
        test_support::insert_teacher(ctx.state.db(), "colleague4", "Colleague Teacher", "teacher-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Shared Group", &creator_profile.id).await;
    test_support::add_teacher_to_group(ctx.state.db(), &group.id, &colleague_profile.id).await;

    let taught = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Taught Assignment"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &taught.id, &group.id, None).await;

    test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Private Assignment"),
    )
    .await;

    let token = test_support::bearer_token(&colleague, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/assignments", Some(&token), None))
        .await
        .expect("list assignments");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["title"], "Taught Assignment");
}

#[tokio::test]
async fn only_creator_can_update_assignment() {
    let ctx = test_support::setup_test_context().await;

    let (creator, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator5", "Creator Teacher", "teacher-pass")
            .await;
    let (other, _) =
        test_support::insert_teacher(ctx.state.db(), "other5", "Other Teacher", "teacher-pass")
            .await;

    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Owned"),
    )
    .await;

    let other_token = test_support::bearer_token(&other, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/assignments/{}", assignment.id),
            Some(&other_token),
            Some(json!({"title": "Hijacked"})),
        ))
        .await
        .expect("update as non-creator");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let creator_token = test_support::bearer_token(&creator, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/assignments/{}", assignment.id),
            Some(&creator_token),
            Some(json!({"title": "Renamed", "status": "archived"})),
        ))
        .await
        .expect("update as creator");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["title"], "Renamed");
    assert_eq!(body["status"], "archived");
}

#[tokio::test]
async fn assign_group_requires_creator_or_group_teacher() {
    let ctx = test_support::setup_test_context().await;

    let (_, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator6", "Creator Teacher", "teacher-pass")
            .await;
    let (unrelated, _) =
        test_support::insert_teacher(ctx.state.db(), "unrelated6", "Unrelated Teacher", "teacher-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Target Group", &creator_profile.id).await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Assignable"),
    )
    .await;

    let token = test_support::bearer_token(&unrelated, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/assignments/{}/groups", assignment.id),
            Some(&token),
            Some(json!({"group_id": group.id})),
        ))
        .await
        .expect("assign group as unrelated teacher");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn assignment_groups_report_effective_deadline() {
    let ctx = test_support::setup_test_context().await;

    let (creator, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator7", "Creator Teacher", "teacher-pass")
            .await;

    let group_a = test_support::insert_group(ctx.state.db(), "Group A", &creator_profile.id).await;
    let group_b = test_support::insert_group(ctx.state.db(), "Group B", &creator_profile.id).await;

    // Whole-second timestamps survive the Postgres round-trip unchanged.
    let deadline = time::macros::datetime!(2030-06-01 12:00:00);
    let custom = time::macros::datetime!(2030-06-15 12:00:00);
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            deadline,
            ..AssignmentFixture::published(&creator_profile.id, "Two Deadlines")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group_a.id, None).await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group_b.id, Some(custom)).await;

    let token = test_support::bearer_token(&creator, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assignments/{}/groups", assignment.id),
            Some(&token),
            None,
        ))
        .await
        .expect("list assignment groups");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    let rows = body.as_array().expect("rows");
    assert_eq!(rows.len(), 2);

    let row_a = rows.iter().find(|row| row["group"] == group_a.id.as_str()).expect("group a row");
    assert!(row_a["custom_deadline"].is_null());
    assert_eq!(row_a["effective_deadline"], crate::core::time::format_primitive(deadline));

    let row_b = rows.iter().find(|row| row["group"] == group_b.id.as_str()).expect("group b row");
    assert_eq!(row_b["custom_deadline"], row_b["effective_deadline"]);
    assert_eq!(row_b["effective_deadline"], crate::core::time::format_primitive(custom));
}

#[tokio::test]
async fn submissions_listing_enforces_teacher_scope() {
    let ctx = test_support::setup_test_context().await;

    let (_, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator8", "Creator Teacher", "teacher-pass")
            .await;
    let (unrelated, _) =
        test_support::insert_teacher(ctx.state.db(), "unrelated8", "Unrelated Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "asgstud8", "Assign Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Scope Group", &creator_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Scoped"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let unrelated_token = test_support::bearer_token(&unrelated, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assignments/{}/submissions", assignment.id),
            Some(&unrelated_token),
            None,
        ))
        .await
        .expect("submissions as unrelated teacher");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // A student without a submission sees 404.
    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/assignments/{}/submissions", assignment.id),
            Some(&student_token),
            None,
        ))
        .await
        .expect("submissions as student without one");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
