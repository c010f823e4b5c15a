use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::user::User;

pub const FREE_PLAN: &str = "free";
pub const FREE_MAX_COPILOTS: i32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub is_subscribed: bool,
    pub plan_type: String,
    pub max_copilots: i32,
    pub subscription_id: Option<Uuid>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub customer_id: Option<String>,
}

/// Public shape of an account.
#[derive(Debug, Clone, Serialize)]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub profile: ProfileView,
    pub subscription: SubscriptionView,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            profile: ProfileView {
                first_name: user.first_name,
                last_name: user.last_name,
                phone: user.phone,
                linked_in: user.linked_in,
                portfolio: user.portfolio,
            },
            subscription: SubscriptionView {
                is_subscribed: user.is_subscribed,
                plan_type: user.plan_type,
                max_copilots: user.max_copilots,
                subscription_id: user.subscription_id,
                current_period_end: user.current_period_end,
                customer_id: user.customer_id,
            },
        }
    }
}

/// Profile fields as written by `PUT /users/me`; `None` clears the field.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub linked_in: Option<String>,
    pub portfolio: Option<String>,
}

/// Inserts a new account. `email` must already be normalized.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<User, AppError> {
    let result = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, first_name, last_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(email)
    .bind(first_name)
    .bind(last_name)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => {
            info!("Created account {} ({})", user.id, user.email);
            Ok(user)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(AppError::Conflict("User already exists".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn get_user(pool: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: Uuid,
    profile: &ProfileUpdate,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = $2, last_name = $3, phone = $4, linked_in = $5, portfolio = $6,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(&profile.first_name)
    .bind(&profile.last_name)
    .bind(&profile.phone)
    .bind(&profile.linked_in)
    .bind(&profile.portfolio)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))
}

pub async fn set_customer_id(pool: &PgPool, user_id: Uuid, customer_id: &str) -> Result<(), AppError> {
    sqlx::query("UPDATE users SET customer_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(user_id)
        .bind(customer_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks the account subscribed to `plan_type` until `period_end`.
pub async fn activate_subscription(
    pool: &PgPool,
    user_id: Uuid,
    plan_type: &str,
    max_copilots: i32,
    subscription_id: Uuid,
    period_end: Option<DateTime<Utc>>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE users
        SET is_subscribed = TRUE, plan_type = $2, max_copilots = $3,
            subscription_id = $4, current_period_end = $5, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(plan_type)
    .bind(max_copilots)
    .bind(subscription_id)
    .bind(period_end)
    .execute(pool)
    .await?;

    info!("Activated {plan_type} subscription for user {user_id}");
    Ok(())
}

/// Drops the account back to the free plan.
pub async fn cancel_subscription(pool: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE users
        SET is_subscribed = FALSE, plan_type = $2, max_copilots = $3, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(FREE_PLAN)
    .bind(FREE_MAX_COPILOTS)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("User {user_id} not found")));
    }
    info!("Cancelled subscription for user {user_id}");
    Ok(())
}
