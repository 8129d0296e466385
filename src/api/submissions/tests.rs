use axum::http::{Method, StatusCode};
use serde_json::json;
use time::Duration;
use tower::ServiceExt;

use crate::core::time::primitive_now_utc;
use crate::test_support::{self, AssignmentFixture};

#[tokio::test]
async fn late_submission_gets_penalized_provisional_points() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach1", "Sub Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud1", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Late Group", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;

    // Deadline passed an hour ago; 20% penalty on 100 points.
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            deadline: primitive_now_utc() - Duration::hours(1),
            max_points: 100,
            allow_late_submissions: true,
            late_penalty_percentage: 20,
            ..AssignmentFixture::published(&teacher_profile.id, "Late Essay")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id, "comment": "sorry, late"})),
        ))
        .await
        .expect("create submission");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_late"], true);
    assert_eq!(body["points"], 80);
    assert_eq!(body["status"], "submitted");
}

#[tokio::test]
async fn on_time_submission_has_no_points() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach2", "Sub Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud2", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "On Time", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;

    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            late_penalty_percentage: 20,
            ..AssignmentFixture::published(&teacher_profile.id, "Punctual Essay")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("create submission");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_late"], false);
    assert!(body["points"].is_null());
}

#[tokio::test]
async fn custom_deadline_overrides_assignment_deadline_per_group() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach3", "Sub Teacher", "teacher-pass")
            .await;
    let (early_student, early_profile) =
        test_support::insert_student(ctx.state.db(), "early3", "Early Student", "student-pass")
            .await;
    let (extended_student, extended_profile) =
        test_support::insert_student(ctx.state.db(), "extended3", "Extended Student", "student-pass")
            .await;

    let strict_group =
        test_support::insert_group(ctx.state.db(), "Strict", &teacher_profile.id).await;
    let extended_group =
        test_support::insert_group(ctx.state.db(), "Extended", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &strict_group.id, &early_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &extended_group.id, &extended_profile.id)
        .await;

    // The assignment deadline has passed, but the extended group got an
    // override that is still in the future.
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            deadline: primitive_now_utc() - Duration::hours(2),
            max_points: 100,
            allow_late_submissions: true,
            late_penalty_percentage: 50,
            ..AssignmentFixture::published(&teacher_profile.id, "Split Deadline")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &strict_group.id, None).await;
    test_support::assign_group(
        ctx.state.db(),
        &assignment.id,
        &extended_group.id,
        Some(primitive_now_utc() + Duration::days(1)),
    )
    .await;

    let early_token = test_support::bearer_token(&early_student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&early_token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("strict group submission");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_late"], true);
    assert_eq!(body["points"], 50);

    let extended_token = test_support::bearer_token(&extended_student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&extended_token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("extended group submission");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_late"], false);
    assert!(body["points"].is_null());
}

#[tokio::test]
async fn duplicate_submission_is_rejected() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach4", "Sub Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud4", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "One Shot", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Single Try"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("first submission");
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("second submission");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");
    assert_eq!(body["detail"], "You have already submitted a response to this assignment");
}

#[tokio::test]
async fn submission_requires_targeted_assignment() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach5", "Sub Teacher", "teacher-pass")
            .await;
    let (student, _) =
        test_support::insert_student(ctx.state.db(), "substud5", "Sub Student", "student-pass")
            .await;

    // Assignment exists but targets no group of the student's.
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Not For You"),
    )
    .await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("untargeted submission");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teachers_cannot_submit() {
    let ctx = test_support::setup_test_context().await;

    let (teacher, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach6", "Sub Teacher", "teacher-pass")
            .await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Teacher Try"),
    )
    .await;

    let token = test_support::bearer_token(&teacher, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("teacher submission");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn grading_rejected_for_unrelated_teacher() {
    let ctx = test_support::setup_test_context().await;

    let (_, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator7s", "Creator Teacher", "teacher-pass")
            .await;
    let (unrelated, _) =
        test_support::insert_teacher(ctx.state.db(), "unrelated7s", "Unrelated Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud7", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Grade Group", &creator_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;
    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "Gradable"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&student_token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("create submission");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    let submission_id = body["id"].as_str().expect("submission id").to_string();

    let unrelated_token = test_support::bearer_token(&unrelated, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/submissions/{submission_id}/grade"),
            Some(&unrelated_token),
            Some(json!({"status": "graded", "points": 90})),
        ))
        .await
        .expect("grade as unrelated teacher");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn group_teacher_can_grade_and_stamps_metadata() {
    let ctx = test_support::setup_test_context().await;

    let (_, creator_profile) =
        test_support::insert_teacher(ctx.state.db(), "creator8s", "Creator Teacher", "teacher-pass")
            .await;
    let (grader, grader_profile) =
        test_support::insert_teacher(ctx.state.db(), "grader8s", "Grader Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud8", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Graded Group", &creator_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;
    test_support::add_teacher_to_group(ctx.state.db(), &group.id, &grader_profile.id).await;

    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&creator_profile.id, "To Grade"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&student_token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("create submission");
    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    let submission_id = body["id"].as_str().expect("submission id").to_string();

    let grader_token = test_support::bearer_token(&grader, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PATCH,
            &format!("/api/v1/submissions/{submission_id}/grade"),
            Some(&grader_token),
            Some(json!({"status": "graded", "points": 87, "feedback": "Well done"})),
        ))
        .await
        .expect("grade submission");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["status"], "graded");
    assert_eq!(body["points"], 87);
    assert_eq!(body["feedback"], "Well done");
    assert_eq!(body["graded_by"], grader_profile.id);
    assert!(body["graded_at"].as_str().is_some());
}

#[tokio::test]
async fn student_sees_only_own_submissions() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach9", "Sub Teacher", "teacher-pass")
            .await;
    let (first, first_profile) =
        test_support::insert_student(ctx.state.db(), "first9", "First Student", "student-pass")
            .await;
    let (second, second_profile) =
        test_support::insert_student(ctx.state.db(), "second9", "Second Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "Listing", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &first_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &second_profile.id).await;

    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture::published(&teacher_profile.id, "Listed"),
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    for (user, _) in [(&first, &first_profile), (&second, &second_profile)] {
        let token = test_support::bearer_token(user, ctx.state.settings());
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/v1/submissions",
                Some(&token),
                Some(json!({"assignment_id": assignment.id})),
            ))
            .await
            .expect("create submission");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let token = test_support::bearer_token(&first, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::GET, "/api/v1/submissions", Some(&token), None))
        .await
        .expect("list submissions");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 1);
    assert_eq!(body["items"][0]["student"], first_profile.id);
}

#[tokio::test]
async fn late_submission_without_allowance_is_recorded_without_points() {
    let ctx = test_support::setup_test_context().await;

    let (_, teacher_profile) =
        test_support::insert_teacher(ctx.state.db(), "subteach10", "Sub Teacher", "teacher-pass")
            .await;
    let (student, student_profile) =
        test_support::insert_student(ctx.state.db(), "substud10", "Sub Student", "student-pass")
            .await;

    let group = test_support::insert_group(ctx.state.db(), "No Late", &teacher_profile.id).await;
    test_support::add_student_to_group(ctx.state.db(), &group.id, &student_profile.id).await;

    let assignment = test_support::insert_assignment(
        ctx.state.db(),
        AssignmentFixture {
            deadline: primitive_now_utc() - Duration::hours(1),
            allow_late_submissions: false,
            late_penalty_percentage: 20,
            ..AssignmentFixture::published(&teacher_profile.id, "Strictly On Time")
        },
    )
    .await;
    test_support::assign_group(ctx.state.db(), &assignment.id, &group.id, None).await;

    // The record is still created: rejection of late submissions is not a
    // concern of the save path.
    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/submissions",
            Some(&token),
            Some(json!({"assignment_id": assignment.id})),
        ))
        .await
        .expect("late submission without allowance");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {body}");
    assert_eq!(body["is_late"], true);
    assert!(body["points"].is_null());
}
