use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::billing::pricing::{BillingPeriod, PlanType, CURRENCY};
use crate::errors::AppError;
use crate::models::payment::PaymentRow;

pub const PENDING: &str = "pending";
pub const SUCCEEDED: &str = "succeeded";

/// A checkout just opened with the gateway.
pub struct NewPayment<'a> {
    pub user_id: Uuid,
    pub payment_intent_id: &'a str,
    pub customer_id: &'a str,
    pub amount: i32,
    pub plan: PlanType,
    pub period: BillingPeriod,
}

/// Subscription window starting at `start` for one billing period.
pub fn subscription_window(
    start: DateTime<Utc>,
    period: BillingPeriod,
) -> (DateTime<Utc>, DateTime<Utc>) {
    (start, start + Duration::days(period.days()))
}

pub async fn insert_payment(pool: &PgPool, payment: &NewPayment<'_>) -> Result<PaymentRow, AppError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        INSERT INTO payments
            (id, user_id, stripe_payment_intent_id, stripe_customer_id, amount,
             currency, status, plan_type, billing_period)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(payment.user_id)
    .bind(payment.payment_intent_id)
    .bind(payment.customer_id)
    .bind(payment.amount)
    .bind(CURRENCY)
    .bind(PENDING)
    .bind(payment.plan.as_str())
    .bind(payment.period.as_str())
    .fetch_one(pool)
    .await?;

    info!(
        "Recorded pending payment {} ({} {}) for user {}",
        row.id, row.plan_type, row.billing_period, row.user_id
    );
    Ok(row)
}

pub async fn find_for_user(
    pool: &PgPool,
    payment_intent_id: &str,
    user_id: Uuid,
) -> Result<PaymentRow, AppError> {
    sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE stripe_payment_intent_id = $1 AND user_id = $2",
    )
    .bind(payment_intent_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payment {payment_intent_id} not found")))
}

/// Stores the gateway status verbatim along with the subscription window.
pub async fn record_outcome(
    pool: &PgPool,
    payment_id: Uuid,
    status: &str,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<PaymentRow, AppError> {
    let row = sqlx::query_as::<_, PaymentRow>(
        r#"
        UPDATE payments
        SET status = $2, subscription_start_date = $3, subscription_end_date = $4,
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(payment_id)
    .bind(status)
    .bind(window.0)
    .bind(window.1)
    .fetch_one(pool)
    .await?;

    info!("Payment {} is now {}", row.id, row.status);
    Ok(row)
}

pub async fn history(pool: &PgPool, user_id: Uuid) -> Result<Vec<PaymentRow>, AppError> {
    Ok(sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}
