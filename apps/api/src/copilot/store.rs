//! Persistence seam for copilot configurations.
//!
//! `AppState` holds an `Arc<dyn ConfigStore>`; production uses `PgConfigStore`.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::errors::{map_foreign_key_violation, AppError};
use crate::models::copilot::{CopilotConfigRow, FINAL_STEP};

/// Storage operations the wizard manager and the copilot handlers need.
///
/// "Latest" always means greatest `updated_at`, then `created_at`, then `id`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Latest configuration of `owner_id` that has not reached the final step.
    async fn find_incomplete(&self, owner_id: Uuid) -> Result<Option<CopilotConfigRow>, AppError>;

    /// Latest configuration of `owner_id`, complete or not.
    async fn find_latest(&self, owner_id: Uuid) -> Result<Option<CopilotConfigRow>, AppError>;

    async fn find_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<CopilotConfigRow>, AppError>;

    /// All configurations of `owner_id`, latest first.
    async fn list(&self, owner_id: Uuid) -> Result<Vec<CopilotConfigRow>, AppError>;

    /// Inserts `config`; the store assigns `created_at`/`updated_at`.
    /// `NotFound` when the owner has no account.
    async fn insert(&self, config: &CopilotConfigRow) -> Result<CopilotConfigRow, AppError>;

    /// Overwrites every mutable column of the row keyed by `(id, user_id)`
    /// and refreshes `updated_at`.
    async fn update(&self, config: &CopilotConfigRow) -> Result<CopilotConfigRow, AppError>;

    /// Returns `false` when nothing matched.
    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AppError>;
}

pub struct PgConfigStore {
    pool: PgPool,
}

impl PgConfigStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigStore for PgConfigStore {
    async fn find_incomplete(&self, owner_id: Uuid) -> Result<Option<CopilotConfigRow>, AppError> {
        Ok(sqlx::query_as::<_, CopilotConfigRow>(
            r#"
            SELECT * FROM copilot_configs
            WHERE user_id = $1 AND step_completed < $2
            ORDER BY updated_at DESC, created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .bind(FINAL_STEP)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_latest(&self, owner_id: Uuid) -> Result<Option<CopilotConfigRow>, AppError> {
        Ok(sqlx::query_as::<_, CopilotConfigRow>(
            r#"
            SELECT * FROM copilot_configs
            WHERE user_id = $1
            ORDER BY updated_at DESC, created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_owned(
        &self,
        id: Uuid,
        owner_id: Uuid,
    ) -> Result<Option<CopilotConfigRow>, AppError> {
        Ok(sqlx::query_as::<_, CopilotConfigRow>(
            "SELECT * FROM copilot_configs WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn list(&self, owner_id: Uuid) -> Result<Vec<CopilotConfigRow>, AppError> {
        Ok(sqlx::query_as::<_, CopilotConfigRow>(
            r#"
            SELECT * FROM copilot_configs
            WHERE user_id = $1
            ORDER BY updated_at DESC, created_at DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn insert(&self, config: &CopilotConfigRow) -> Result<CopilotConfigRow, AppError> {
        let row = sqlx::query_as::<_, CopilotConfigRow>(
            r#"
            INSERT INTO copilot_configs
                (id, user_id, name, step_completed, job_setup, filters,
                 screening_data, final_config, is_completed, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(config.user_id)
        .bind(&config.name)
        .bind(config.step_completed)
        .bind(&config.job_setup)
        .bind(&config.filters)
        .bind(&config.screening_data)
        .bind(&config.final_config)
        .bind(config.is_completed)
        .bind(config.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            map_foreign_key_violation(e, |_| {
                AppError::NotFound(format!("User {} not found", config.user_id))
            })
        })?;

        debug!("Inserted copilot config {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn update(&self, config: &CopilotConfigRow) -> Result<CopilotConfigRow, AppError> {
        let row = sqlx::query_as::<_, CopilotConfigRow>(
            r#"
            UPDATE copilot_configs
            SET name = $3,
                step_completed = $4,
                job_setup = $5,
                filters = $6,
                screening_data = $7,
                final_config = $8,
                is_completed = $9,
                is_active = $10,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(config.id)
        .bind(config.user_id)
        .bind(&config.name)
        .bind(config.step_completed)
        .bind(&config.job_setup)
        .bind(&config.filters)
        .bind(&config.screening_data)
        .bind(&config.final_config)
        .bind(config.is_completed)
        .bind(config.is_active)
        .fetch_optional(&self.pool)
        .await?;

        // The row can vanish between resolution and write if it is deleted concurrently.
        row.ok_or_else(|| AppError::NotFound(format!("Config {} not found", config.id)))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM copilot_configs WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
