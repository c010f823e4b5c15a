use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PaymentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stripe_payment_intent_id: String,
    pub stripe_customer_id: Option<String>,
    /// Whole currency units (not cents).
    pub amount: i32,
    pub currency: String,
    pub status: String,
    pub plan_type: String,
    pub billing_period: String,
    pub subscription_start_date: Option<DateTime<Utc>>,
    pub subscription_end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
