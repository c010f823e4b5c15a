//! Axum route handlers for the copilot configuration API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::copilot::wizard::{apply_step_data, upsert_configuration, ConfigPatch};
use crate::errors::{AppError, AppJson};
use crate::models::copilot::CopilotConfigRow;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub message: &'static str,
    pub config: CopilotConfigRow,
}

#[derive(Debug, Serialize)]
pub struct ConfigListResponse {
    pub copilots: Vec<CopilotConfigRow>,
}

#[derive(Debug, Deserialize)]
pub struct StepUpdateRequest {
    pub step: i64,
    pub data: Value,
}

fn parse_patch(body: Value) -> Result<ConfigPatch, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(format!("Invalid patch: {e}")))
}

async fn upsert(
    state: &AppState,
    owner_id: Uuid,
    target_id: Option<Uuid>,
    body: Value,
) -> Result<(StatusCode, Json<ConfigResponse>), AppError> {
    let patch = parse_patch(body)?;
    let outcome = upsert_configuration(state.configs.as_ref(), owner_id, target_id, patch).await?;

    let (status, message) = if outcome.created {
        (StatusCode::CREATED, "Copilot config created successfully")
    } else {
        (StatusCode::OK, "Copilot config updated successfully")
    };
    Ok((
        status,
        Json(ConfigResponse {
            message,
            config: outcome.config,
        }),
    ))
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/copilot
pub async fn handle_list_configs(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<ConfigListResponse>, AppError> {
    let copilots = state.configs.list(owner_id).await?;
    Ok(Json(ConfigListResponse { copilots }))
}

/// PATCH /api/v1/copilot
///
/// Updates the caller's in-progress configuration (or latest, or a new one).
pub async fn handle_upsert_config(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<ConfigResponse>), AppError> {
    upsert(&state, owner_id, None, body).await
}

/// PATCH /api/v1/copilot/:id
pub async fn handle_patch_config(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(body): AppJson<Value>,
) -> Result<(StatusCode, Json<ConfigResponse>), AppError> {
    upsert(&state, owner_id, Some(id), body).await
}

/// GET /api/v1/copilot/:id
pub async fn handle_get_config(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfigResponse>, AppError> {
    let config = state
        .configs
        .find_owned(id, owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Config {id} not found")))?;
    Ok(Json(ConfigResponse {
        message: "Config retrieved successfully",
        config,
    }))
}

/// PUT /api/v1/copilot/:id/step
pub async fn handle_update_step(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<StepUpdateRequest>,
) -> Result<Json<ConfigResponse>, AppError> {
    let config =
        apply_step_data(state.configs.as_ref(), id, owner_id, request.step, request.data).await?;
    Ok(Json(ConfigResponse {
        message: "Copilot config step updated successfully",
        config,
    }))
}

/// DELETE /api/v1/copilot/:id
///
/// Administrative; the wizard UI never deletes configurations.
pub async fn handle_delete_config(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.configs.delete(id, owner_id).await? {
        return Err(AppError::NotFound(format!("Config {id} not found")));
    }
    tracing::info!("Deleted copilot config {id} for user {owner_id}");
    Ok(StatusCode::NO_CONTENT)
}
