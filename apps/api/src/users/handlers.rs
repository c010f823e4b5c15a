//! Axum route handlers for accounts.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::auth::{normalize_email, AuthUser};
use crate::errors::{AppError, AppJson};
use crate::state::AppState;
use crate::users::accounts::{create_user, get_user, update_profile, ProfileUpdate, UserView};
use crate::validation::{clean_optional, require_email};

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub message: &'static str,
    pub user: UserView,
}

/// POST /api/v1/users
///
/// Called by the identity gateway after it registers credentials.
pub async fn handle_create_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), AppError> {
    require_email("email", &request.email)?;
    let email = normalize_email(&request.email);
    let first_name = clean_optional(request.first_name);
    let last_name = clean_optional(request.last_name);

    let user = create_user(&state.db, &email, first_name.as_deref(), last_name.as_deref()).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            message: "User created successfully",
            user: user.into(),
        }),
    ))
}

/// GET /api/v1/users/me
pub async fn handle_get_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, AppError> {
    let user = get_user(&state.db, user_id).await?;
    Ok(Json(UserResponse {
        message: "Profile retrieved successfully",
        user: user.into(),
    }))
}

/// PUT /api/v1/users/me
pub async fn handle_update_profile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let profile = ProfileUpdate {
        first_name: clean_optional(request.first_name),
        last_name: clean_optional(request.last_name),
        phone: clean_optional(request.phone),
        linked_in: clean_optional(request.linked_in),
        portfolio: clean_optional(request.portfolio),
    };
    let user = update_profile(&state.db, user_id, &profile).await?;
    Ok(Json(UserResponse {
        message: "Profile updated successfully",
        user: user.into(),
    }))
}
