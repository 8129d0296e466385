use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::{Identity, StudentProfile, TeacherProfile, User};
use crate::db::types::UserRole;
use crate::repositories;

pub(crate) struct CurrentUser(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

/// Loads the role profile attached to the user. Every user is created with
/// its profile in one transaction, so a missing row is an integrity error.
pub(crate) async fn resolve_identity(
    state: &AppState,
    user: &User,
) -> Result<Identity, ApiError> {
    match user.role {
        UserRole::Student => {
            let profile = repositories::profiles::find_student_by_user_id(state.db(), &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load student profile"))?
                .ok_or_else(|| ApiError::Internal("Student profile is missing".to_string()))?;
            Ok(Identity::Student(profile))
        }
        UserRole::Teacher => {
            let profile = repositories::profiles::find_teacher_by_user_id(state.db(), &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load teacher profile"))?
                .ok_or_else(|| ApiError::Internal("Teacher profile is missing".to_string()))?;
            Ok(Identity::Teacher(profile))
        }
    }
}

pub(crate) async fn require_teacher(
    state: &AppState,
    user: &User,
) -> Result<TeacherProfile, ApiError> {
    match resolve_identity(state, user).await? {
        Identity::Teacher(profile) => Ok(profile),
        Identity::Student(_) => Err(ApiError::Forbidden("Teacher access required")),
    }
}

pub(crate) async fn require_student(
    state: &AppState,
    user: &User,
) -> Result<StudentProfile, ApiError> {
    match resolve_identity(state, user).await? {
        Identity::Student(profile) => Ok(profile),
        Identity::Teacher(_) => Err(ApiError::Forbidden("Student access required")),
    }
}
