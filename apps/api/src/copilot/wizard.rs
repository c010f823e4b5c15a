//! Configuration wizard manager.
//!
//! Decides which configuration a partial update lands on and applies it
//! without letting `step_completed` move backwards. Everything is validated
//! before storage is read, so a rejected update never writes.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::copilot::steps::WizardStep;
use crate::copilot::store::ConfigStore;
use crate::errors::AppError;
use crate::models::copilot::{CopilotConfigRow, DEFAULT_CONFIG_NAME, FINAL_STEP, FIRST_STEP};

/// Partial configuration update as sent by the client.
/// Absent (or `null`) fields leave the stored value untouched.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigPatch {
    pub name: Option<String>,
    pub step_completed: Option<i64>,
    pub job_setup: Option<Value>,
    pub filters: Option<Value>,
    pub screening_data: Option<Value>,
    pub final_config: Option<Value>,
    pub is_active: Option<bool>,
}

/// A patch whose every field has passed validation.
#[derive(Debug)]
struct ValidatedPatch {
    name: Option<String>,
    step_completed: Option<i32>,
    slots: Vec<(WizardStep, Value)>,
    is_active: Option<bool>,
}

impl ConfigPatch {
    fn validate(self) -> Result<ValidatedPatch, AppError> {
        let name = match self.name {
            Some(name) => {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    return Err(AppError::Validation("name cannot be empty".to_string()));
                }
                Some(trimmed.to_string())
            }
            None => None,
        };

        let step_completed = self.step_completed.map(check_step_range).transpose()?;

        let mut slots = Vec::new();
        for (step, payload) in [
            (WizardStep::JobSetup, self.job_setup),
            (WizardStep::Filters, self.filters),
            (WizardStep::Screening, self.screening_data),
            (WizardStep::FinalConfig, self.final_config),
        ] {
            if let Some(payload) = payload {
                slots.push((step, step.validate(payload)?));
            }
        }

        Ok(ValidatedPatch {
            name,
            step_completed,
            slots,
            is_active: self.is_active,
        })
    }
}

fn check_step_range(step: i64) -> Result<i32, AppError> {
    if (FIRST_STEP as i64..=FINAL_STEP as i64).contains(&step) {
        Ok(step as i32)
    } else {
        Err(AppError::Validation(format!(
            "step_completed must be between {FIRST_STEP} and {FINAL_STEP}, got {step}"
        )))
    }
}

impl ValidatedPatch {
    fn apply_to(self, config: &mut CopilotConfigRow) {
        if let Some(name) = self.name {
            config.name = name;
        }
        if let Some(step) = self.step_completed {
            advance_step(config, step);
        }
        for (step, payload) in self.slots {
            write_slot(config, step, payload);
        }
        if let Some(is_active) = self.is_active {
            config.is_active = is_active;
        }
    }
}

/// Raises `step_completed` to `step` if that is further along; never lowers it.
fn advance_step(config: &mut CopilotConfigRow, step: i32) {
    config.step_completed = config.step_completed.max(step);
}

fn write_slot(config: &mut CopilotConfigRow, step: WizardStep, payload: Value) {
    match step {
        WizardStep::JobSetup => config.job_setup = Some(payload),
        WizardStep::Filters => config.filters = Some(payload),
        WizardStep::Screening => config.screening_data = Some(payload),
        WizardStep::FinalConfig => {
            config.final_config = Some(payload);
            config.is_completed = true;
        }
    }
}

/// Result of an upsert: the persisted row and whether it was newly created.
#[derive(Debug)]
pub struct UpsertOutcome {
    pub config: CopilotConfigRow,
    pub created: bool,
}

/// Creates or updates a configuration for `owner_id`.
///
/// With `target_id`, only that configuration (if owned by the caller) is
/// eligible. Without it, the latest unfinished configuration is preferred,
/// then the latest of any kind, and a new one is created only when the
/// owner has none.
pub async fn upsert_configuration(
    store: &dyn ConfigStore,
    owner_id: Uuid,
    target_id: Option<Uuid>,
    patch: ConfigPatch,
) -> Result<UpsertOutcome, AppError> {
    let patch = patch.validate()?;

    let existing = match target_id {
        Some(id) => Some(
            store
                .find_owned(id, owner_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Config {id} not found")))?,
        ),
        None => match store.find_incomplete(owner_id).await? {
            Some(config) => Some(config),
            None => store.find_latest(owner_id).await?,
        },
    };

    match existing {
        Some(mut config) => {
            patch.apply_to(&mut config);
            let config = store.update(&config).await?;
            info!(
                "Updated copilot config {} for user {} (step {})",
                config.id, owner_id, config.step_completed
            );
            Ok(UpsertOutcome {
                config,
                created: false,
            })
        }
        None => {
            let mut config = CopilotConfigRow::new(owner_id, DEFAULT_CONFIG_NAME.to_string());
            patch.apply_to(&mut config);
            let config = store.insert(&config).await?;
            info!("Created copilot config {} for user {}", config.id, owner_id);
            Ok(UpsertOutcome {
                config,
                created: true,
            })
        }
    }
}

/// Writes one wizard step's payload into its slot on an existing configuration.
///
/// The step counter is compared against the stored row, so replaying an
/// earlier step never rewinds progress. Step 4 marks the configuration complete.
pub async fn apply_step_data(
    store: &dyn ConfigStore,
    record_id: Uuid,
    owner_id: Uuid,
    step_number: i64,
    payload: Value,
) -> Result<CopilotConfigRow, AppError> {
    let step = WizardStep::from_number(step_number)?;
    let payload = step.validate(payload)?;

    let mut config = store
        .find_owned(record_id, owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Config {record_id} not found")))?;

    write_slot(&mut config, step, payload);
    advance_step(&mut config, step.number());

    let config = store.update(&config).await?;
    info!(
        "Applied step {} to copilot config {} for user {}",
        step.number(),
        config.id,
        owner_id
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use serde_json::json;

    use super::*;
    use crate::copilot::store::memory::MemoryConfigStore;

    fn seeded(owner: Uuid, step: i32, minutes_ago: i64) -> CopilotConfigRow {
        let mut row = CopilotConfigRow::new(owner, format!("config at step {step}"));
        row.step_completed = step;
        row.is_completed = step == FINAL_STEP;
        row.updated_at = Utc::now() - Duration::minutes(minutes_ago);
        row.created_at = row.updated_at - Duration::hours(1);
        row
    }

    fn step_patch(step: i64) -> ConfigPatch {
        ConfigPatch {
            step_completed: Some(step),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_step_never_decreases_on_upsert() {
        let owner = Uuid::new_v4();
        for stored in 1..=4 {
            for incoming in 1..=4 {
                let row = seeded(owner, stored, 0);
                let id = row.id;
                let store = MemoryConfigStore::with_rows(vec![row]);

                let outcome = upsert_configuration(&store, owner, Some(id), step_patch(incoming))
                    .await
                    .unwrap();

                assert_eq!(
                    outcome.config.step_completed,
                    stored.max(incoming as i32),
                    "stored={stored} incoming={incoming}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_prefers_incomplete_over_completed() {
        let owner = Uuid::new_v4();
        let in_progress = seeded(owner, 2, 30);
        // The completed one is more recent, but still loses to the unfinished one.
        let finished = seeded(owner, 4, 1);
        let in_progress_id = in_progress.id;
        let store = MemoryConfigStore::with_rows(vec![finished, in_progress]);

        let outcome = upsert_configuration(&store, owner, None, step_patch(3))
            .await
            .unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.config.id, in_progress_id);
        assert_eq!(outcome.config.step_completed, 3);
    }

    #[tokio::test]
    async fn test_falls_back_to_latest_completed() {
        let owner = Uuid::new_v4();
        let older = seeded(owner, 4, 60);
        let newer = seeded(owner, 4, 5);
        let newer_id = newer.id;
        let store = MemoryConfigStore::with_rows(vec![older, newer]);

        let patch = ConfigPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };
        let outcome = upsert_configuration(&store, owner, None, patch).await.unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.config.id, newer_id);
        assert_eq!(outcome.config.name, "Renamed");
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_creates_single_record_when_owner_has_none() {
        let owner = Uuid::new_v4();
        let store = MemoryConfigStore::default();

        let outcome = upsert_configuration(&store, owner, None, ConfigPatch::default())
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.config.step_completed, FIRST_STEP);
        assert_eq!(outcome.config.name, DEFAULT_CONFIG_NAME);
        assert!(!outcome.config.is_completed);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_created_record_reads_back_identically() {
        let owner = Uuid::new_v4();
        let store = MemoryConfigStore::default();
        let job_setup = json!({ "job_titles": ["Backend Engineer"], "job_types": ["fulltime"] });
        let screening = json!({ "first_name": "Ada", "email": "ada@example.com" });
        let patch = ConfigPatch {
            name: Some("Backend roles".to_string()),
            step_completed: Some(2),
            job_setup: Some(job_setup.clone()),
            screening_data: Some(screening.clone()),
            is_active: Some(true),
            ..Default::default()
        };

        let created = upsert_configuration(&store, owner, None, patch)
            .await
            .unwrap()
            .config;
        let fetched = store.find_owned(created.id, owner).await.unwrap().unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.name, "Backend roles");
        assert_eq!(fetched.step_completed, 2);
        assert_eq!(fetched.job_setup, Some(job_setup));
        assert_eq!(fetched.screening_data, Some(screening));
        assert!(fetched.is_active);
    }

    #[tokio::test]
    async fn test_explicit_target_of_other_owner_is_not_found() {
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let row = seeded(owner, 1, 0);
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row.clone()]);

        let result = upsert_configuration(&store, intruder, Some(id), step_patch(4)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));

        let step_result = apply_step_data(&store, id, intruder, 2, json!({})).await;
        assert!(matches!(step_result, Err(AppError::NotFound(_))));

        assert_eq!(store.snapshot(), vec![row]);
    }

    #[tokio::test]
    async fn test_explicit_missing_target_does_not_create() {
        let owner = Uuid::new_v4();
        let store = MemoryConfigStore::default();

        let result =
            upsert_configuration(&store, owner, Some(Uuid::new_v4()), ConfigPatch::default()).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_step_rejected_without_write() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 2, 0);
        let store = MemoryConfigStore::with_rows(vec![row.clone()]);

        for bad in [0, 5] {
            let result = upsert_configuration(&store, owner, None, step_patch(bad)).await;
            assert!(matches!(result, Err(AppError::Validation(_))));
        }
        assert_eq!(store.snapshot(), vec![row]);
    }

    #[tokio::test]
    async fn test_malformed_slot_rejects_whole_patch() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 1, 0);
        let store = MemoryConfigStore::with_rows(vec![row.clone()]);

        let patch = ConfigPatch {
            name: Some("Should not stick".to_string()),
            step_completed: Some(3),
            job_setup: Some(json!({ "job_titles": ["Engineer"] })),
            final_config: Some(json!({ "tone": "shouty" })),
            ..Default::default()
        };
        let result = upsert_configuration(&store, owner, None, patch).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.snapshot(), vec![row]);
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let store = MemoryConfigStore::default();
        let patch = ConfigPatch {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        let result = upsert_configuration(&store, Uuid::new_v4(), None, patch).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_patch_leaves_unsupplied_fields_alone() {
        let owner = Uuid::new_v4();
        let mut row = seeded(owner, 2, 0);
        row.job_setup = Some(json!({ "job_titles": ["Data Scientist"] }));
        row.is_active = true;
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row]);

        let patch = ConfigPatch {
            filters: Some(json!({ "industry": "Fintech" })),
            ..Default::default()
        };
        let config = upsert_configuration(&store, owner, Some(id), patch)
            .await
            .unwrap()
            .config;

        assert_eq!(config.job_setup, Some(json!({ "job_titles": ["Data Scientist"] })));
        assert_eq!(config.filters.as_ref().unwrap()["industry"], json!("Fintech"));
        assert_eq!(config.step_completed, 2);
        assert!(config.is_active);
    }

    #[tokio::test]
    async fn test_step_four_marks_completed() {
        let owner = Uuid::new_v4();
        let mut row = seeded(owner, 4, 0);
        // Completion is forced on even if the stored flag disagrees.
        row.is_completed = false;
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row]);

        let config = apply_step_data(&store, id, owner, 4, json!({ "selected_mode": "review-first" }))
            .await
            .unwrap();

        assert!(config.is_completed);
        assert_eq!(config.step_completed, 4);
        assert_eq!(config.final_config.as_ref().unwrap()["selected_mode"], json!("review-first"));
    }

    #[tokio::test]
    async fn test_earlier_steps_never_mark_completed() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 1, 0);
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row]);

        for step in 1..=3 {
            let config = apply_step_data(&store, id, owner, step, json!({}))
                .await
                .unwrap();
            assert!(!config.is_completed, "step {step} must not complete the wizard");
            assert_eq!(config.step_completed, step as i32);
        }
    }

    #[tokio::test]
    async fn test_replayed_step_does_not_rewind_progress() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 3, 0);
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row]);

        let config = apply_step_data(
            &store,
            id,
            owner,
            1,
            json!({ "job_titles": ["Platform Engineer"] }),
        )
        .await
        .unwrap();

        assert_eq!(config.step_completed, 3);
        assert_eq!(config.job_setup.as_ref().unwrap()["job_titles"], json!(["Platform Engineer"]));
    }

    #[tokio::test]
    async fn test_completion_survives_later_updates() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 3, 0);
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row]);

        apply_step_data(&store, id, owner, 4, json!({})).await.unwrap();
        let config = apply_step_data(&store, id, owner, 2, json!({ "industry": "Health" }))
            .await
            .unwrap();

        assert!(config.is_completed);
        assert_eq!(config.step_completed, 4);
    }

    #[tokio::test]
    async fn test_invalid_step_leaves_record_unchanged() {
        let owner = Uuid::new_v4();
        let row = seeded(owner, 2, 0);
        let id = row.id;
        let store = MemoryConfigStore::with_rows(vec![row.clone()]);

        let result = apply_step_data(&store, id, owner, 5, json!({})).await;

        assert!(matches!(result, Err(AppError::InvalidStep(5))));
        assert_eq!(store.snapshot(), vec![row]);
    }

    #[tokio::test]
    async fn test_upsert_with_final_config_completes() {
        let owner = Uuid::new_v4();
        let store = MemoryConfigStore::default();
        let patch = ConfigPatch {
            step_completed: Some(4),
            final_config: Some(json!({ "tone": "enthusiastic-energetic" })),
            ..Default::default()
        };

        let config = upsert_configuration(&store, owner, None, patch)
            .await
            .unwrap()
            .config;

        assert!(config.is_completed);
        assert_eq!(config.step_completed, 4);
    }

    #[test]
    fn test_patch_rejects_unknown_fields() {
        let result: Result<ConfigPatch, _> =
            serde_json::from_value(json!({ "user_id": Uuid::new_v4(), "name": "x" }));
        assert!(result.is_err());
    }

    #[test]
    fn test_null_slot_treated_as_absent() {
        let patch: ConfigPatch = serde_json::from_value(json!({ "filters": null })).unwrap();
        assert!(patch.filters.is_none());
    }
}
