use axum::{
    extract::{Form, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::errors::{is_unique_violation, ApiError};
use crate::api::guards::{resolve_identity, CurrentUser};
use crate::api::validation::{validate_email, validate_password_len, validate_username};
use crate::core::security;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::{Identity, User};
use crate::repositories;
use crate::schemas::auth::TokenResponse;
use crate::schemas::user::{ProfileUpdateRequest, RegisterRequest, UserResponse};

/// Max attempts per window for auth endpoints (register/token).
const AUTH_RATE_LIMIT: u64 = 10;
/// Rate limit window in seconds.
const AUTH_RATE_WINDOW_SECONDS: u64 = 60;

#[derive(Debug, Deserialize)]
struct OAuth2PasswordForm {
    username: String,
    password: String,
}

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/token", post(token))
        .route("/profile", get(profile).patch(update_profile))
}

async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), ApiError> {
    validate_username(&payload.username)?;
    validate_email(&payload.email)?;
    validate_password_len(&payload.password)?;

    if payload.password != payload.password_confirm {
        return Err(ApiError::BadRequest("Passwords do not match".to_string()));
    }

    let rate_key = format!("rl:register:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many registration attempts, try again later"));
    }

    let existing = repositories::users::exists_by_username(state.db(), &payload.username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing user"))?;

    if existing.is_some() {
        return Err(ApiError::Conflict("User with this username already exists".to_string()));
    }

    let hashed_password = security::hash_password(&payload.password)
        .map_err(|e| ApiError::internal(e, "Failed to hash password"))?;

    let now = primitive_now_utc();
    let user = repositories::users::create_with_profile(
        state.db(),
        repositories::users::CreateUser {
            id: &Uuid::new_v4().to_string(),
            profile_id: &Uuid::new_v4().to_string(),
            username: &payload.username,
            email: &payload.email,
            hashed_password,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            role: payload.role,
            is_active: true,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::Conflict("User with this username already exists".to_string())
        } else {
            ApiError::internal(e, "Failed to create user")
        }
    })?;

    let identity = resolve_identity(&state, &user).await?;
    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    let response = TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user, identity),
    };

    Ok((StatusCode::CREATED, Json(response)))
}

async fn token(
    State(state): State<AppState>,
    Form(payload): Form<OAuth2PasswordForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let rate_key = format!("rl:token:{}", payload.username);
    let allowed = state
        .redis()
        .rate_limit(&rate_key, AUTH_RATE_LIMIT, AUTH_RATE_WINDOW_SECONDS)
        .await
        .unwrap_or(true);
    if !allowed {
        return Err(ApiError::TooManyRequests("Too many token attempts, try again later"));
    }

    let user = fetch_user_by_username(&state, &payload.username).await?;

    let verified = security::verify_password(&payload.password, &user.hashed_password)
        .map_err(|_| ApiError::Unauthorized("Incorrect username or password"))?;

    if !verified {
        return Err(ApiError::Unauthorized("Incorrect username or password"));
    }

    if !user.is_active {
        return Err(ApiError::BadRequest("Inactive user".to_string()));
    }

    let identity = resolve_identity(&state, &user).await?;
    let token = security::create_access_token(&user.id, user.role, state.settings(), None)
        .map_err(|e| ApiError::internal(e, "Failed to create access token"))?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
        user: UserResponse::from_db(user, identity),
    }))
}

async fn profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let identity = resolve_identity(&state, &user).await?;
    Ok(Json(UserResponse::from_db(user, identity)))
}

async fn update_profile(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(payload): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(email) = payload.email.as_deref() {
        validate_email(email)?;
    }

    let now = primitive_now_utc();
    repositories::users::update(
        state.db(),
        &user.id,
        repositories::users::UpdateUser {
            email: payload.email,
            first_name: payload.first_name,
            last_name: payload.last_name,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update user"))?;

    // Role is fixed at registration; only the matching profile is writable.
    match resolve_identity(&state, &user).await? {
        Identity::Student(profile) => {
            repositories::profiles::update_student(
                state.db(),
                &profile.id,
                repositories::profiles::UpdateStudentProfile {
                    student_code: payload.student_code,
                    major: payload.major,
                    year_of_study: payload.year_of_study,
                    bio: payload.bio,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update student profile"))?;
        }
        Identity::Teacher(profile) => {
            repositories::profiles::update_teacher(
                state.db(),
                &profile.id,
                repositories::profiles::UpdateTeacherProfile {
                    department: payload.department,
                    position: payload.position,
                    academic_degree: payload.academic_degree,
                    bio: payload.bio,
                },
            )
            .await
            .map_err(|e| ApiError::internal(e, "Failed to update teacher profile"))?;
        }
    }

    let updated = repositories::users::fetch_one_by_id(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch updated user"))?;
    let identity = resolve_identity(&state, &updated).await?;

    Ok(Json(UserResponse::from_db(updated, identity)))
}

async fn fetch_user_by_username(state: &AppState, username: &str) -> Result<User, ApiError> {
    repositories::users::find_by_username(state.db(), username)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load user"))?
        .ok_or(ApiError::Unauthorized("Incorrect username or password"))
}
