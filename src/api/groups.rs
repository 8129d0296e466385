use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;
use validator::Validate;

use crate::api::errors::ApiError;
use crate::api::guards::{require_teacher, resolve_identity, CurrentUser};
use crate::api::pagination::{PageParams, PaginatedResponse};
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Group, Identity};
use crate::repositories;
use crate::schemas::group::{
    AddStudentRequest, AddTeacherRequest, GroupCreate, GroupDetailResponse, GroupResponse,
    GroupTeacherResponse, GroupUpdate, MembershipResponse, RemoveStudentRequest,
    RemoveTeacherRequest,
};
use crate::services::group_codes;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_groups).post(create_group))
        .route("/:group_id", get(get_group).patch(update_group).delete(delete_group))
        .route("/:group_id/add_student", post(add_student))
        .route("/:group_id/remove_student", post(remove_student))
        .route("/:group_id/add_teacher", post(add_teacher))
        .route("/:group_id/remove_teacher", post(remove_teacher))
        .route("/:group_id/join_as_teacher", post(join_as_teacher))
}

async fn list_groups(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PaginatedResponse<GroupResponse>>, ApiError> {
    let search = params.search_term();

    // Teachers browse every group; students only the ones they belong to.
    let (views, total_count) = match resolve_identity(&state, &user).await? {
        Identity::Teacher(_) => {
            let views =
                repositories::groups::list_all(state.db(), search, params.skip, params.limit)
                    .await
                    .map_err(|e| ApiError::internal(e, "Failed to list groups"))?;
            let total = repositories::groups::count_all(state.db(), search)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count groups"))?;
            (views, total)
        }
        Identity::Student(profile) => {
            let views = repositories::groups::list_for_student(
                state.db(),
                &profile.id,
                search,
                params.skip,
                params.limit,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to list groups"))?;
            let total = repositories::groups::count_for_student(state.db(), &profile.id, search)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to count groups"))?;
            (views, total)
        }
    };

    Ok(Json(PaginatedResponse {
        items: views.into_iter().map(GroupResponse::from_view).collect(),
        total_count,
        skip: params.skip,
        limit: params.limit,
    }))
}

async fn create_group(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GroupCreate>,
) -> Result<(StatusCode, Json<GroupResponse>), ApiError> {
    let teacher = require_teacher(&state, &user).await?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let code = group_codes::generate_unique_code(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to generate group code"))?;

    let now = primitive_now_utc();
    let group = repositories::groups::create(
        state.db(),
        repositories::groups::CreateGroup {
            id: &Uuid::new_v4().to_string(),
            name: payload.name.trim(),
            code: &code,
            description: &payload.description,
            created_by: &teacher.id,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create group"))?;

    let view = repositories::groups::find_view_by_id(state.db(), &group.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch created group"))?
        .ok_or_else(|| ApiError::Internal("Group missing after creation".to_string()))?;

    Ok((StatusCode::CREATED, Json(GroupResponse::from_view(view))))
}

async fn get_group(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<GroupDetailResponse>, ApiError> {
    let view = repositories::groups::find_view_by_id(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))?;

    match resolve_identity(&state, &user).await? {
        Identity::Teacher(_) => {}
        Identity::Student(profile) => {
            let member = repositories::group_memberships::has_active_membership(
                state.db(),
                &group_id,
                &profile.id,
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check membership"))?;
            if !member {
                return Err(ApiError::Forbidden("Group membership required"));
            }
        }
    }

    let members = repositories::group_memberships::list_active_for_group(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list group members"))?;
    let teachers = repositories::group_teachers::list_active_for_group(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list group teachers"))?;

    Ok(Json(GroupDetailResponse::from_parts(view, members, teachers)))
}

async fn update_group(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<GroupUpdate>,
) -> Result<Json<GroupResponse>, ApiError> {
    require_teacher(&state, &user).await?;
    payload.validate().map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let group = fetch_group(&state, &group_id).await?;

    repositories::groups::update(
        state.db(),
        &group.id,
        repositories::groups::UpdateGroup {
            name: payload.name,
            description: payload.description,
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update group"))?;

    let view = repositories::groups::find_view_by_id(state.db(), &group.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated group"))?
        .ok_or_else(|| ApiError::Internal("Group missing after update".to_string()))?;

    Ok(Json(GroupResponse::from_view(view)))
}

async fn delete_group(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let teacher = require_teacher(&state, &user).await?;

    let deleted = repositories::groups::delete(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to delete group"))?;

    if !deleted {
        return Err(ApiError::NotFound("Group not found".to_string()));
    }

    tracing::info!(
        teacher_id = %teacher.id,
        group_id = %group_id,
        action = "group_delete",
        "Teacher deleted group"
    );

    Ok(StatusCode::NO_CONTENT)
}

async fn add_student(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddStudentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    require_teacher(&state, &user).await?;
    fetch_group(&state, &group_id).await?;

    let student = repositories::profiles::find_student_by_id(state.db(), &payload.student_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch student"))?
        .ok_or_else(|| ApiError::NotFound("Student not found".to_string()))?;

    let existing = repositories::group_memberships::find_for_group_student(
        state.db(),
        &group_id,
        &student.id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to check membership"))?;

    if let Some(membership) = existing {
        if membership.is_active {
            return Err(ApiError::BadRequest("Student is already in the group".to_string()));
        }
        repositories::group_memberships::set_active(state.db(), &membership.id, true)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to reactivate membership"))?;
        return Ok((
            StatusCode::OK,
            Json(serde_json::json!({"detail": "Student restored to the group"})),
        ));
    }

    let membership = repositories::group_memberships::create(
        state.db(),
        repositories::group_memberships::CreateMembership {
            id: &Uuid::new_v4().to_string(),
            group_id: &group_id,
            student_id: &student.id,
            role: payload.role,
            joined_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create membership"))?;

    let rows = repositories::group_memberships::list_active_for_group(state.db(), &group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch membership"))?;
    let row = rows
        .into_iter()
        .find(|row| row.id == membership.id)
        .ok_or_else(|| ApiError::Internal("Membership missing after creation".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(MembershipResponse::from_row(row)).unwrap_or_default()),
    ))
}

async fn remove_student(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<RemoveStudentRequest>,
) -> Result<StatusCode, ApiError> {
    require_teacher(&state, &user).await?;
    fetch_group(&state, &group_id).await?;

    let membership = repositories::group_memberships::find_in_group(
        state.db(),
        &payload.membership_id,
        &group_id,
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to fetch membership"))?
    .ok_or_else(|| ApiError::NotFound("Membership not found".to_string()))?;

    // Deactivated rather than deleted so the history survives.
    repositories::group_memberships::set_active(state.db(), &membership.id, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to deactivate membership"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn add_teacher(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<AddTeacherRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    require_teacher(&state, &user).await?;
    let group = fetch_group(&state, &group_id).await?;

    let teacher = repositories::profiles::find_teacher_by_id(state.db(), &payload.teacher_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch teacher"))?
        .ok_or_else(|| ApiError::NotFound("Teacher not found".to_string()))?;

    enroll_teacher(&state, &group, &teacher.id, "Teacher restored to the group").await
}

async fn remove_teacher(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<RemoveTeacherRequest>,
) -> Result<StatusCode, ApiError> {
    require_teacher(&state, &user).await?;
    fetch_group(&state, &group_id).await?;

    let roster_entry =
        repositories::group_teachers::find_in_group(state.db(), &payload.teacher_id, &group_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to fetch group teacher"))?
            .ok_or_else(|| ApiError::NotFound("Teacher not found in this group".to_string()))?;

    repositories::group_teachers::set_active(state.db(), &roster_entry.id, false)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to deactivate group teacher"))?;

    Ok(StatusCode::NO_CONTENT)
}

async fn join_as_teacher(
    Path(group_id): Path<String>,
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    let teacher = require_teacher(&state, &user).await?;
    let group = fetch_group(&state, &group_id).await?;

    enroll_teacher(&state, &group, &teacher.id, "Rejoined the group as a teacher").await
}

/// Shared by add_teacher and join_as_teacher: the creator is rejected, an
/// inactive roster entry is reactivated, otherwise a new one is created.
async fn enroll_teacher(
    state: &AppState,
    group: &Group,
    teacher_id: &str,
    restored_detail: &str,
) -> Result<(StatusCode, Json<serde_json::Value>), ApiError> {
    if teacher_id == group.created_by {
        return Err(ApiError::BadRequest(
            "The group creator is already a teacher of this group".to_string(),
        ));
    }

    let existing =
        repositories::group_teachers::find_for_group_teacher(state.db(), &group.id, teacher_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check group teacher"))?;

    if let Some(entry) = existing {
        if entry.is_active {
            return Err(ApiError::BadRequest(
                "Teacher is already added to the group".to_string(),
            ));
        }
        repositories::group_teachers::set_active(state.db(), &entry.id, true)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to reactivate group teacher"))?;
        return Ok((StatusCode::OK, Json(serde_json::json!({"detail": restored_detail}))));
    }

    let created = repositories::group_teachers::create(
        state.db(),
        repositories::group_teachers::CreateGroupTeacher {
            id: &Uuid::new_v4().to_string(),
            group_id: &group.id,
            teacher_id,
            joined_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create group teacher"))?;

    let rows = repositories::group_teachers::list_active_for_group(state.db(), &group.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group teacher"))?;
    let row = rows
        .into_iter()
        .find(|row| row.id == created.id)
        .ok_or_else(|| ApiError::Internal("Group teacher missing after creation".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::to_value(GroupTeacherResponse::from_row(row)).unwrap_or_default()),
    ))
}

async fn fetch_group(state: &AppState, group_id: &str) -> Result<Group, ApiError> {
    repositories::groups::find_by_id(state.db(), group_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch group"))?
        .ok_or_else(|| ApiError::NotFound("Group not found".to_string()))
}
