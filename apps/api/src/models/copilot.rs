use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Step value for a freshly created configuration.
pub const FIRST_STEP: i32 = 1;
/// Step value once every wizard slot has been submitted.
pub const FINAL_STEP: i32 = 4;

pub const DEFAULT_CONFIG_NAME: &str = "My Copilot Configuration";

/// A copilot configuration as stored in `copilot_configs`.
///
/// Slot columns hold already-validated payloads (see `copilot::steps`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CopilotConfigRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub step_completed: i32,
    pub job_setup: Option<Value>,
    pub filters: Option<Value>,
    pub screening_data: Option<Value>,
    pub final_config: Option<Value>,
    pub is_completed: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CopilotConfigRow {
    /// A new, empty configuration at step 1. Timestamps are placeholders
    /// until the store assigns its own on insert.
    pub fn new(user_id: Uuid, name: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            name,
            step_completed: FIRST_STEP,
            job_setup: None,
            filters: None,
            screening_data: None,
            final_config: None,
            is_completed: false,
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }
}
