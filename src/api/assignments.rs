use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::{is_unique_violation, ApiError};
use crate::api::guards::{require_teacher, resolve_identity, CurrentUser};
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::{primitive_now_utc, to_primitive_utc};
use crate::db::models::{Assignment, Identity, TeacherProfile};
use crate::db::types::AssignmentStatus;
use crate::repositories;
use crate::repositories::assignments::AssignmentOrdering;
use crate::schemas::assignment::{
    AssignGroupRequest, AssignmentCreate, AssignmentGroupResponse, AssignmentResponse,
    AssignmentUpdate,
};
use crate::schemas::submission::SubmissionResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_assignments).post(create_assignment))
        .route(
            "/:assignment_id",
            get(get_assignment).patch(update_assignment).delete(delete_assignment),
        )
        .route("/:assignment_id/groups", get(list_assignment_groups).post(assign_group))
        .route("/:assignment_id/submissions", get(list_assignment_submissions))
}

async fn list_assignments(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<AssignmentResponse>>, ApiError> {
    let search = params.search_term();
    let ordering =
        AssignmentOrdering::parse(params.ordering.as_deref()).unwrap_or_default();

    let (assignments, total_count) = match resolve_identity(&state, &user).await? {
        Identity::Teacher(profile) => {
            let items = repositories::assignments::list_for_teacher(
                state.db(),
                &profile.id,
                search,
                ordering,
                params.skip,
                params.limit,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;
            let total =
                repositories::assignments::count_for_teacher(state.db(), &profile.id, search)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to count assignments"))?;
            (items, total)
        }
        Identity::Student(profile) => {
            let items = repositories::assignments::list_published_for_student(
                state.db(),
                &profile.id,
                search,
                ordering,
                params.skip,
                params.limit,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list assignments"))?;
            let total = repositories::assignments::count_published_for_student(
                state.db(),
                &profile.id,
                search,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to count assignments"))?;
            (items, total)
        }
    };

    let now = primitive_now_utc();
    let mut items = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let submission_count =
            repositories::assignments::submission_count(state.db(), &assignment.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;
        items.push(AssignmentResponse::from_db(assignment, submission_count, now));
    }

    Ok(Json(PaginatedResponse { items, total_count, skip: params.skip, limit: params.limit }))
}

async fn create_assignment(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentCreate>,
) -> Result<(StatusCode, Json<AssignmentResponse>), ApiError> {
    let teacher = require_teacher(&state, &user).await?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let now = primitive_now_utc();
    let assignment = repositories::assignments::create(
        state.db(),
        repositories::assignments::CreateAssignment {
            id: &Uuid::new_v4().to_string(),
            title: payload.title.trim(),
            description: &payload.description,
            created_by: &teacher.id,
            status: payload.status,
            deadline: to_primitive_utc(payload.deadline),
            max_points: payload.max_points,
            allow_late_submissions: payload.allow_late_submissions,
            late_penalty_percentage: payload.late_penalty_percentage,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create assignment"))?;

    Ok((StatusCode::CREATED, Json(AssignmentResponse::from_db(assignment, 0, now))))
}

async fn get_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let identity = resolve_identity(&state, &user).await?;
    let assignment = fetch_visible_assignment(&state, &assignment_id, &identity).await?;

    let submission_count = repositories::assignments::submission_count(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    Ok(Json(AssignmentResponse::from_db(assignment, submission_count, primitive_now_utc())))
}

async fn update_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignmentUpdate>,
) -> Result<Json<AssignmentResponse>, ApiError> {
    let teacher = require_teacher(&state, &user).await?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let assignment = fetch_assignment(&state, &assignment_id).await?;
    require_creator(&assignment, &teacher)?;

    repositories::assignments::update(
        state.db(),
        &assignment.id,
        repositories::assignments::UpdateAssignment {
            title: payload.title,
            description: payload.description,
            status: payload.status,
            deadline: payload.deadline.map(to_primitive_utc),
            max_points: payload.max_points,
            allow_late_submissions: payload.allow_late_submissions,
            late_penalty_percentage: payload.late_penalty_percentage,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update assignment"))?;

    let updated = repositories::assignments::fetch_one_by_id(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated assignment"))?;
    let submission_count = repositories::assignments::submission_count(state.db(), &updated.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to count submissions"))?;

    Ok(Json(AssignmentResponse::from_db(updated, submission_count, primitive_now_utc())))
}

async fn delete_assignment(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let teacher = require_teacher(&state, &user).await?;

    let assignment = fetch_assignment(&state, &assignment_id).await?;
    require_creator(&assignment, &teacher)?;

    let deleted = repositories::assignments::delete(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete assignment"))?;

    if !deleted {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    tracing::info!(
        teacher_id = %teacher.id,
        assignment_id = %assignment_id,
        action = "assignment_delete",
        "Teacher deleted assignment"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn list_assignment_groups(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<AssignmentGroupResponse>>, ApiError> {
    let identity = resolve_identity(&state, &user).await?;
    fetch_visible_assignment(&state, &assignment_id, &identity).await?;

    let rows = repositories::assignment_groups::list_for_assignment(state.db(), &assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list assignment groups"))?;

    Ok(Json(rows.into_iter().map(AssignmentGroupResponse::from_row).collect()))
}

async fn assign_group(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AssignGroupRequest>,
) -> Result<(StatusCode, Json<AssignmentGroupResponse>), ApiError> {
    let teacher = require_teacher(&state, &user).await?;

    let assignment = fetch_assignment(&state, &assignment_id).await?;

    let group = repositories::groups::find_by_id(state.db(), &payload.group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    // Assigning requires owning the assignment or actively teaching the group.
    let is_creator = assignment.created_by == teacher.id;
    let teaches_group =
        repositories::group_teachers::find_for_group_teacher(state.db(), &group.id, &teacher.id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check group teacher"))?
            .map(|entry| entry.is_active)
            .unwrap_or(false);

    if !(is_creator || teaches_group) {
        return Err(ApiError::Forbidden("No permission to assign this assignment to the group"));
    }

    let already = repositories::assignment_groups::exists_pair(
        state.db(),
        &assignment.id,
        &group.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check assignment group"))?;
    if already {
        return Err(ApiError::BadRequest(
            "Assignment is already assigned to this group".to_string(),
        ));
    }

    let created = repositories::assignment_groups::create(
        state.db(),
        repositories::assignment_groups::CreateAssignmentGroup {
            id: &Uuid::new_v4().to_string(),
            assignment_id: &assignment.id,
            group_id: &group.id,
            assigned_at: primitive_now_utc(),
            custom_deadline: payload.custom_deadline.map(to_primitive_utc),
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("Assignment is already assigned to this group".to_string())
        } else {
            ApiError::internal(e, "Failed to assign group")
        }
    })?;

    let rows = repositories::assignment_groups::list_for_assignment(state.db(), &assignment.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment group"))?;
    let row = rows
        .into_iter()
        .find(|row| row.id == created.id)
        .ok_or_else(|| ApiError::Internal("Assignment group missing after creation".to_string()))?;

    Ok((StatusCode::CREATED, Json(AssignmentGroupResponse::from_row(row))))
}

async fn list_assignment_submissions(
    Path(assignment_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let assignment = fetch_assignment(&state, &assignment_id).await?;
    let now = primitive_now_utc();

    match resolve_identity(&state, &user).await? {
        Identity::Teacher(profile) => {
            let is_creator = assignment.created_by == profile.id;
            let is_group_teacher =
                repositories::assignment_groups::is_group_teacher_for_assignment(
                    state.db(),
                    &assignment.id,
                    &profile.id,
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check group teacher"))?;

            if !(is_creator || is_group_teacher) {
                return Err(ApiError::Forbidden(
                    "No permission to view submissions for this assignment",
                ));
            }

            let views =
                repositories::submissions::list_views_by_assignment(state.db(), &assignment.id)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list submissions"))?;
            let items: Vec<SubmissionResponse> =
                views.into_iter().map(|view| SubmissionResponse::from_view(view, now)).collect();
            Ok(Json(serde_json::to_value(items).unwrap_or_default()))
        }
        Identity::Student(profile) => {
            let view = repositories::submissions::find_view_for_assignment_student(
                state.db(),
                &assignment.id,
                &profile.id,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch submission"))?
            .ok_or_else(|| {
                ApiError::NotFound("You have not submitted a response to this assignment".to_string())
            })?;

            Ok(Json(
                serde_json::to_value(SubmissionResponse::from_view(view, now)).unwrap_or_default(),
            ))
        }
    }
}

/// Role-scoped lookup used by the read paths: teachers see assignments they
/// created or whose groups they actively teach; students see published
/// assignments targeting their active groups. Anything else reads as absent.
async fn fetch_visible_assignment(
    state: &AppState,
    assignment_id: &str,
    identity: &Identity,
) -> Result<Assignment, ApiError> {
    let assignment = fetch_assignment(state, assignment_id).await?;

    let visible = match identity {
        Identity::Teacher(profile) => {
            assignment.created_by == profile.id
                || repositories::assignment_groups::is_group_teacher_for_assignment(
                    state.db(),
                    &assignment.id,
                    &profile.id,
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check group teacher"))?
        }
        Identity::Student(profile) => {
            assignment.status == AssignmentStatus::Published
                && repositories::assignment_groups::targets_student(
                    state.db(),
                    &assignment.id,
                    &profile.id,
                )
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check assignment groups"))?
        }
    };

    if !visible {
        return Err(ApiError::NotFound("Assignment not found".to_string()));
    }

    Ok(assignment)
}

async fn fetch_assignment(state: &AppState, assignment_id: &str) -> Result<Assignment, ApiError> {
    repositories::assignments::find_by_id(state.db(), assignment_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch assignment"))?
        .ok_or_else(|| ApiError::NotFound("Assignment not found".to_string()))
}

fn require_creator(assignment: &Assignment, teacher: &TeacherProfile) -> Result<(), ApiError> {
    if assignment.created_by == teacher.id {
        Ok(())
    } else {
        Err(ApiError::Forbidden("Only the assignment creator can modify it"))
    }
}

#[cfg(test)]
mod tests;
