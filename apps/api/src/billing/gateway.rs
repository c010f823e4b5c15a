//! Stripe client. All payment-processor calls go through here.
//!
//! Speaks the form-encoded REST API directly; only the customer and
//! payment-intent calls the billing flow needs are wrapped.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::debug;

use crate::config::Config;
use crate::errors::AppError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

impl From<BillingError> for AppError {
    fn from(e: BillingError) -> Self {
        AppError::Billing(e.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Customer {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    message: String,
}

/// Payment-intent creation parameters.
pub struct NewPaymentIntent<'a> {
    pub amount_cents: i64,
    pub currency: &'a str,
    pub customer_id: &'a str,
    pub metadata: &'a [(&'a str, String)],
}

impl NewPaymentIntent<'_> {
    fn form(&self) -> Vec<(String, String)> {
        let mut form = vec![
            ("amount".to_string(), self.amount_cents.to_string()),
            ("currency".to_string(), self.currency.to_lowercase()),
            ("customer".to_string(), self.customer_id.to_string()),
        ];
        for (key, value) in self.metadata {
            form.push((format!("metadata[{key}]"), value.clone()));
        }
        form
    }
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    api_base: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(config: &Config) -> Result<Self, BillingError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_base: config.stripe_api_base.trim_end_matches('/').to_string(),
            secret_key: config.stripe_secret_key.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/v1/{}", self.api_base, path))
            .bearer_auth(&self.secret_key)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BillingError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<StripeError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(BillingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }

    pub async fn retrieve_customer(&self, customer_id: &str) -> Result<Customer, BillingError> {
        self.send(self.request(Method::GET, &format!("customers/{customer_id}")))
            .await
    }

    pub async fn create_customer(&self, email: &str, name: &str) -> Result<Customer, BillingError> {
        let customer: Customer = self
            .send(
                self.request(Method::POST, "customers")
                    .form(&[("email", email), ("name", name)]),
            )
            .await?;
        debug!("Created billing customer {}", customer.id);
        Ok(customer)
    }

    pub async fn create_payment_intent(
        &self,
        params: &NewPaymentIntent<'_>,
    ) -> Result<PaymentIntent, BillingError> {
        let intent: PaymentIntent = self
            .send(self.request(Method::POST, "payment_intents").form(&params.form()))
            .await?;
        debug!(
            "Created payment intent {} for {} {}",
            intent.id, intent.amount, intent.currency
        );
        Ok(intent)
    }

    pub async fn retrieve_payment_intent(
        &self,
        intent_id: &str,
    ) -> Result<PaymentIntent, BillingError> {
        self.send(self.request(Method::GET, &format!("payment_intents/{intent_id}")))
            .await
    }
}
