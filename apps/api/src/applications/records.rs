use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;
use uuid::Uuid;

use crate::errors::{map_foreign_key_violation, AppError};
use crate::models::application::{
    ApplicationRow, ApplicationStatus, ApplicationWithConfig, CareerTrack, YesNo,
};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

const SELECT_WITH_CONFIG: &str = r#"
    SELECT a.*, c.name AS copilot_config_name
    FROM applications a
    LEFT JOIN copilot_configs c ON c.id = a.copilot_config_id
"#;

/// A validated application ready to insert.
#[derive(Debug)]
pub struct NewApplication {
    pub owner_id: Option<Uuid>,
    pub copilot_config_id: Option<Uuid>,
    pub full_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub linkedin_url: Option<String>,
    pub is_in_us: YesNo,
    pub career_track: CareerTrack,
    pub is_currently_employed: YesNo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    /// Clamps client paging input: page ≥ 1, 1 ≤ limit ≤ 100.
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    pub fn total_pages(&self, total: i64) -> i64 {
        let limit = self.limit as i64;
        (total + limit - 1) / limit
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApplicationFilter {
    pub status: Option<ApplicationStatus>,
    pub career_track: Option<CareerTrack>,
}

#[derive(Debug, Serialize)]
pub struct ApplicationPage {
    pub applications: Vec<ApplicationWithConfig>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: u32,
}

pub async fn insert_application(
    pool: &PgPool,
    application: &NewApplication,
) -> Result<ApplicationRow, AppError> {
    let row = sqlx::query_as::<_, ApplicationRow>(
        r#"
        INSERT INTO applications
            (id, user_id, copilot_config_id, full_name, email, phone_number,
             linkedin_url, is_in_us, career_track, is_currently_employed, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(application.owner_id)
    .bind(application.copilot_config_id)
    .bind(&application.full_name)
    .bind(&application.email)
    .bind(&application.phone_number)
    .bind(&application.linkedin_url)
    .bind(application.is_in_us.as_str())
    .bind(application.career_track.as_str())
    .bind(application.is_currently_employed.as_str())
    .bind(ApplicationStatus::default().as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| {
        map_foreign_key_violation(e, |constraint| match constraint {
            Some("applications_user_id_fkey") => AppError::NotFound(format!(
                "User {} not found",
                application.owner_id.unwrap_or_default()
            )),
            _ => AppError::Validation("copilot_config_id does not exist".to_string()),
        })
    })?;

    info!(
        "Stored application {} (owner: {:?})",
        row.id, application.owner_id
    );
    Ok(row)
}

pub async fn list_for_owner(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<ApplicationWithConfig>, AppError> {
    Ok(sqlx::query_as::<_, ApplicationWithConfig>(&format!(
        "{SELECT_WITH_CONFIG} WHERE a.user_id = $1 ORDER BY a.created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(pool)
    .await?)
}

pub async fn get_for_owner(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
) -> Result<ApplicationWithConfig, AppError> {
    sqlx::query_as::<_, ApplicationWithConfig>(&format!(
        "{SELECT_WITH_CONFIG} WHERE a.id = $1 AND a.user_id = $2"
    ))
    .bind(id)
    .bind(owner_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

pub async fn update_status(
    pool: &PgPool,
    id: Uuid,
    owner_id: Uuid,
    status: ApplicationStatus,
) -> Result<ApplicationRow, AppError> {
    sqlx::query_as::<_, ApplicationRow>(
        r#"
        UPDATE applications SET status = $3, updated_at = NOW()
        WHERE id = $1 AND user_id = $2
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(owner_id)
    .bind(status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Application {id} not found")))
}

pub async fn delete_for_owner(pool: &PgPool, id: Uuid, owner_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(owner_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Application {id} not found")));
    }
    Ok(())
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &ApplicationFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND a.status = ").push_bind(status.as_str());
    }
    if let Some(track) = filter.career_track {
        builder.push(" AND a.career_track = ").push_bind(track.as_str());
    }
}

/// Paginated listing across all owners, newest first.
pub async fn list_page(
    pool: &PgPool,
    filter: &ApplicationFilter,
    page: Page,
) -> Result<ApplicationPage, AppError> {
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM applications a");
    push_filter(&mut count, filter);
    let total: i64 = count
        .build_query_scalar::<i64>()
        .fetch_one(pool)
        .await?;

    let mut select = QueryBuilder::<Postgres>::new(SELECT_WITH_CONFIG);
    push_filter(&mut select, filter);
    select
        .push(" ORDER BY a.created_at DESC LIMIT ")
        .push_bind(page.limit as i64)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let applications = select
        .build_query_as::<ApplicationWithConfig>()
        .fetch_all(pool)
        .await?;

    Ok(ApplicationPage {
        applications,
        total,
        total_pages: page.total_pages(total),
        current_page: page.page,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_defaults() {
        assert_eq!(Page::new(None, None), Page { page: 1, limit: 10 });
    }

    #[test]
    fn test_page_clamps_input() {
        assert_eq!(Page::new(Some(0), Some(0)), Page { page: 1, limit: 1 });
        assert_eq!(Page::new(Some(3), Some(500)), Page { page: 3, limit: 100 });
    }

    #[test]
    fn test_offset_and_total_pages() {
        let page = Page::new(Some(3), Some(10));
        assert_eq!(page.offset(), 20);
        assert_eq!(page.total_pages(0), 0);
        assert_eq!(page.total_pages(10), 1);
        assert_eq!(page.total_pages(21), 3);
    }

    #[test]
    fn test_filter_sql_binds_only_supplied_fields() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM applications a");
        push_filter(
            &mut builder,
            &ApplicationFilter {
                status: Some(ApplicationStatus::Approved),
                career_track: None,
            },
        );
        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM applications a WHERE TRUE AND a.status = $1"
        );
    }
}
