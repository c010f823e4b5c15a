//! Axum route handlers for the Payments API.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::billing::gateway::NewPaymentIntent;
use crate::billing::payments::{
    find_for_user, history, insert_payment, record_outcome, subscription_window, NewPayment,
    SUCCEEDED,
};
use crate::billing::pricing::{price, to_cents, BillingPeriod, PlanType, CURRENCY};
use crate::errors::{AppError, AppJson};
use crate::models::payment::PaymentRow;
use crate::models::user::User;
use crate::state::AppState;
use crate::users::accounts::{activate_subscription, cancel_subscription, get_user, set_customer_id};

#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub plan_type: String,
    pub billing_period: String,
}

#[derive(Debug, Serialize)]
pub struct CreateIntentResponse {
    pub client_secret: Option<String>,
    pub payment_intent_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub message: &'static str,
    pub payment: PaymentRow,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentHistoryResponse {
    pub payments: Vec<PaymentRow>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// Returns the account's billing customer, creating one on first checkout.
async fn ensure_customer(state: &AppState, user: &User) -> Result<String, AppError> {
    if let Some(customer_id) = &user.customer_id {
        return Ok(state.billing.retrieve_customer(customer_id).await?.id);
    }

    let customer = state
        .billing
        .create_customer(&user.email, &user.display_name())
        .await?;
    set_customer_id(&state.db, user.id, &customer.id).await?;
    Ok(customer.id)
}

/// POST /api/v1/payments/create-payment-intent
pub async fn handle_create_payment_intent(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(request): AppJson<CreateIntentRequest>,
) -> Result<Json<CreateIntentResponse>, AppError> {
    let plan = PlanType::parse(&request.plan_type)?;
    let period = BillingPeriod::parse(&request.billing_period)?;
    let amount = price(plan, period);

    let user = get_user(&state.db, user_id).await?;
    let customer_id = ensure_customer(&state, &user).await?;

    let metadata = [
        ("user_id", user_id.to_string()),
        ("plan_type", plan.as_str().to_string()),
        ("billing_period", period.as_str().to_string()),
    ];
    let intent = state
        .billing
        .create_payment_intent(&NewPaymentIntent {
            amount_cents: to_cents(amount),
            currency: CURRENCY,
            customer_id: &customer_id,
            metadata: &metadata,
        })
        .await?;

    insert_payment(
        &state.db,
        &NewPayment {
            user_id,
            payment_intent_id: &intent.id,
            customer_id: &customer_id,
            amount,
            plan,
            period,
        },
    )
    .await?;

    Ok(Json(CreateIntentResponse {
        client_secret: intent.client_secret,
        payment_intent_id: intent.id,
    }))
}

/// POST /api/v1/payments/confirm-payment
///
/// Syncs the gateway status onto the caller's payment and, on success,
/// upgrades the account's subscription.
pub async fn handle_confirm_payment(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(request): AppJson<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    let payment = find_for_user(&state.db, &request.payment_intent_id, user_id).await?;
    let intent = state
        .billing
        .retrieve_payment_intent(&request.payment_intent_id)
        .await?;

    if let Some(owner) = intent.metadata.get("user_id") {
        if owner.parse::<Uuid>().ok() != Some(user_id) {
            warn!(
                "Payment intent {} metadata names a different user than the caller",
                intent.id
            );
            return Err(AppError::NotFound(format!(
                "Payment {} not found",
                request.payment_intent_id
            )));
        }
    }

    let period = BillingPeriod::parse(&payment.billing_period)?;
    let window = subscription_window(Utc::now(), period);
    let payment = record_outcome(&state.db, payment.id, &intent.status, window).await?;

    if intent.status == SUCCEEDED {
        let plan = PlanType::parse(&payment.plan_type)?;
        activate_subscription(
            &state.db,
            user_id,
            plan.as_str(),
            plan.max_copilots(),
            payment.id,
            payment.subscription_end_date,
        )
        .await?;
    }

    Ok(Json(ConfirmPaymentResponse {
        message: "Payment confirmed",
        payment,
        status: intent.status,
    }))
}

/// GET /api/v1/payments/history
pub async fn handle_payment_history(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PaymentHistoryResponse>, AppError> {
    let payments = history(&state.db, user_id).await?;
    Ok(Json(PaymentHistoryResponse { payments }))
}

/// POST /api/v1/payments/cancel-subscription
pub async fn handle_cancel_subscription(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    cancel_subscription(&state.db, user_id).await?;
    Ok(Json(MessageResponse {
        message: "Subscription cancelled successfully",
    }))
}
