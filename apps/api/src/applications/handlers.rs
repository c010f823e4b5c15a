//! Axum route handlers for the Applications API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::applications::records::{
    delete_for_owner, get_for_owner, insert_application, list_for_owner, list_page,
    update_status, ApplicationFilter, ApplicationPage, NewApplication, Page,
};
use crate::auth::{normalize_email, resolve_owner, AuthUser, MaybeAuthUser, Submitter};
use crate::copilot::store::ConfigStore;
use crate::errors::{AppError, AppJson};
use crate::models::application::{
    ApplicationRow, ApplicationStatus, ApplicationWithConfig, CareerTrack, YesNo,
};
use crate::state::AppState;
use crate::validation::{clean_optional, require_email, require_non_empty};

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateApplicationRequest {
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub linkedin_url: Option<String>,
    pub is_in_us: YesNo,
    pub career_track: CareerTrack,
    pub is_currently_employed: YesNo,
    pub copilot_config_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedApplication {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub status: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct CreateApplicationResponse {
    pub message: &'static str,
    pub application: SubmittedApplication,
}

#[derive(Debug, Serialize)]
pub struct ApplicationListResponse {
    pub applications: Vec<ApplicationWithConfig>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationResponse<T> {
    pub message: &'static str,
    pub application: T,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: ApplicationStatus,
}

#[derive(Debug, Deserialize)]
pub struct AllApplicationsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<ApplicationStatus>,
    pub career_track: Option<CareerTrack>,
}

impl CreateApplicationRequest {
    fn into_new_application(self, owner_id: Option<Uuid>) -> Result<NewApplication, AppError> {
        let full_name = require_non_empty("full_name", &self.full_name)?;
        require_email("email", &self.email)?;
        Ok(NewApplication {
            owner_id,
            copilot_config_id: self.copilot_config_id,
            full_name,
            email: normalize_email(&self.email),
            phone_number: clean_optional(self.phone_number),
            linkedin_url: clean_optional(self.linkedin_url),
            is_in_us: self.is_in_us,
            career_track: self.career_track,
            is_currently_employed: self.is_currently_employed,
        })
    }
}

/// A linked copilot configuration must belong to the resolved owner.
async fn check_config_link(
    configs: &dyn ConfigStore,
    config_id: Option<Uuid>,
    owner_id: Option<Uuid>,
) -> Result<(), AppError> {
    let Some(config_id) = config_id else {
        return Ok(());
    };
    let owned = match owner_id {
        Some(owner_id) => configs.find_owned(config_id, owner_id).await?.is_some(),
        None => false,
    };
    if owned {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "copilot_config_id {config_id} is not one of your configurations"
        )))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/applications
///
/// Public. Linked to the caller's account when authenticated, otherwise to
/// the account registered under the submitted email, if there is one.
pub async fn handle_create_application(
    State(state): State<AppState>,
    identity: MaybeAuthUser,
    AppJson(request): AppJson<CreateApplicationRequest>,
) -> Result<(StatusCode, Json<CreateApplicationResponse>), AppError> {
    require_email("email", &request.email)?;
    let submitter = Submitter::new(identity, &request.email);
    let owner_id = resolve_owner(&state.db, &submitter).await?;

    let application = request.into_new_application(owner_id)?;
    check_config_link(state.configs.as_ref(), application.copilot_config_id, owner_id).await?;
    let row = insert_application(&state.db, &application).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApplicationResponse {
            message: "Application submitted successfully",
            application: SubmittedApplication {
                id: row.id,
                full_name: row.full_name,
                email: row.email,
                status: row.status,
                submitted_at: row.created_at,
            },
        }),
    ))
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
) -> Result<Json<ApplicationListResponse>, AppError> {
    let applications = list_for_owner(&state.db, owner_id).await?;
    Ok(Json(ApplicationListResponse { applications }))
}

/// GET /api/v1/applications/all
pub async fn handle_list_all_applications(
    State(state): State<AppState>,
    AuthUser(_): AuthUser,
    Query(query): Query<AllApplicationsQuery>,
) -> Result<Json<ApplicationPage>, AppError> {
    let filter = ApplicationFilter {
        status: query.status,
        career_track: query.career_track,
    };
    let page = Page::new(query.page, query.limit);
    Ok(Json(list_page(&state.db, &filter, page).await?))
}

/// GET /api/v1/applications/:id
pub async fn handle_get_application(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<ApplicationResponse<ApplicationWithConfig>>, AppError> {
    let application = get_for_owner(&state.db, id, owner_id).await?;
    Ok(Json(ApplicationResponse {
        message: "Application retrieved successfully",
        application,
    }))
}

/// PUT /api/v1/applications/:id/status
pub async fn handle_update_application_status(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
    AppJson(request): AppJson<StatusUpdateRequest>,
) -> Result<Json<ApplicationResponse<ApplicationRow>>, AppError> {
    let application = update_status(&state.db, id, owner_id, request.status).await?;
    Ok(Json(ApplicationResponse {
        message: "Application status updated successfully",
        application,
    }))
}

/// DELETE /api/v1/applications/:id
pub async fn handle_delete_application(
    State(state): State<AppState>,
    AuthUser(owner_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    delete_for_owner(&state.db, id, owner_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
