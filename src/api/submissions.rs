use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{is_unique_violation, ApiError};
use crate::api::guards::{require_student, require_teacher, resolve_identity, CurrentUser};
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::Identity;
use crate::repositories;
use crate::schemas::submission::{GradeRequest, SubmissionCreate, SubmissionResponse};
use crate::services::deadlines;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_submissions).post(create_submission))
        .route("/:submission_id", get(get_submission))
        .route("/:submission_id/grade", patch(grade_submission))
}

async fn list_submissions(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<SubmissionResponse>>, ApiError> {
    let (views, total_count) = match resolve_identity(&state, &user).await? {
        Identity::Teacher(profile) => {
            let views = repositories::submissions::list_views_for_teacher(
                state.db(),
                &profile.id,
                params.skip,
                params.limit,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
            let total = repositories::submissions::count_for_teacher(state.db(), &profile.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
            (views, total)
        }
        Identity::Student(profile) => {
            let views = repositories::submissions::list_views_for_student(
                state.db(),
                &profile.id,
                params.skip,
                params.limit,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
            let total = repositories::submissions::count_for_student(state.db(), &profile.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
            (views, total)
        }
    };

    let now = primitive_now_utc();
    Ok(Json(PaginatedResponse {
        items: views.into_iter().map(|view| SubmissionResponse::from_view(view, now)).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn create_submission(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<SubmissionCreate>,
) -> Result<(StatusCode, Json<SubmissionResponse>), ApiError> {
    let student = require_student(&state, &user).await?;

    let assignment = repositories::assignments::find_by_id(state.db(), &payload.assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))?;

    let targeted = repositories::assignment_groups::targets_student(
        state.db(),
        &assignment.id,
        &student.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check assignment groups"))?;
    if !targeted {
        return Err(ApiError::Forbidden("Assignment is not assigned to any of your groups"));
    }

    let already = repositories::submissions::exists_for_assignment_student(
        state.db(),
        &assignment.id,
        &student.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check existing submission"))?;
    if already {
        return Err(ApiError::BadRequest(
            "You have already submitted a response to this assignment".to_string(),
        ));
    }

    let now = primitive_now_utc();
    let outcome = deadlines::evaluate_new_submission(state.db(), &assignment, &student.id, now)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to resolve effective deadline"))?;

    let submission = repositories::submissions::create(
        state.db(),
        repositories::submissions::CreateSubmission {
            id: &Uuid::new_v4().to_string(),
            assignment_id: &assignment.id,
            student_id: &student.id,
            submitted_at: now,
            comment: &payload.comment,
            points: outcome.provisional_points,
            is_late: outcome.is_late,
        },
    )
    .await
    .map_err(|e| {
        // Two concurrent submissions can both pass the existence check; the
        // unique constraint decides the loser.
        if is_unique_violation(&e) {
            ApiError::Conflict(
                "You have already submitted a response to this assignment".to_string(),
            )
        } else {
            ApiError::internal(e, "Failed to create submission")
        }
    })?;

    if submission.is_late {
        tracing::info!(
            student_id = %student.id,
            assignment_id = %assignment.id,
            points = ?submission.points,
            action = "late_submission",
            "Late submission recorded"
        );
    }

    let view = repositories::submissions::find_view_by_id(state.db(), &submission.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch created submission"))?
        .ok_or_else(|| ApiError::Internal("Submission missing after creation".to_string()))?;

    Ok((StatusCode::CREATED, Json(SubmissionResponse::from_view(view, now))))
}

async fn get_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let view = repositories::submissions::find_view_by_id(state.db(), &submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let visible = match resolve_identity(&state, &user).await? {
        Identity::Student(profile) => view.student_id == profile.id,
        Identity::Teacher(profile) => {
            let assignment =
                repositories::assignments::fetch_one_by_id(state.db(), &view.assignment_id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;
            assignment.created_by == profile.id
                || repositories::assignment_groups::is_group_teacher_for_assignment(
                    state.db(),
                    &view.assignment_id,
                    &profile.id,
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check group teacher"))?
        }
    };

    if !visible {
        return Err(ApiError::NotFound("Submission not found".to_string()));
    }

    Ok(Json(SubmissionResponse::from_view(view, primitive_now_utc())))
}

async fn grade_submission(
    Path(submission_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GradeRequest>,
) -> Result<Json<SubmissionResponse>, ApiError> {
    let teacher = require_teacher(&state, &user).await?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let submission = repositories::submissions::find_by_id(state.db(), &submission_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
        .ok_or_else(|| ApiError::NotFound("Submission not found".to_string()))?;

    let assignment =
        repositories::assignments::fetch_one_by_id(state.db(), &submission.assignment_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?;

    let is_creator = assignment.created_by == teacher.id;
    let teaches_student = repositories::assignment_groups::may_grade_student(
        state.db(),
        &assignment.id,
        &teacher.id,
        &submission.student_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check grading authority"))?;

    if !(is_creator || teaches_student) {
        return Err(ApiError::Forbidden("No permission to grade this submission"));
    }

    let now = primitive_now_utc();
    let graded = repositories::submissions::grade(
        state.db(),
        &submission.id,
        repositories::submissions::GradeUpdate {
            status: payload.status,
            points: payload.points,
            feedback: payload.feedback,
            graded_by: teacher.id.clone(),
            graded_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grade submission"))?;

    tracing::info!(
        teacher_id = %teacher.id,
        submission_id = %graded.id,
        points = ?graded.points,
        action = "submission_grade",
        "Submission graded"
    );

    let view = repositories::submissions::find_view_by_id(state.db(), &graded.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch graded submission"))?
        .ok_or_else(|| ApiError::Internal("Submission missing after grading".to_string()))?;

    Ok(Json(SubmissionResponse::from_view(view, now)))
}

#[cfg(test)]
mod tests;
