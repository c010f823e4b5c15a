pub mod health;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::billing::handlers as payments;
use crate::copilot::handlers as copilot;
use crate::state::AppState;
use crate::users::handlers as users;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/v1/users", post(users::handle_create_user))
        .route(
            "/api/v1/users/me",
            get(users::handle_get_profile).put(users::handle_update_profile),
        )
        // Copilot configuration wizard
        .route(
            "/api/v1/copilot",
            get(copilot::handle_list_configs).patch(copilot::handle_upsert_config),
        )
        .route(
            "/api/v1/copilot/:id",
            get(copilot::handle_get_config)
                .patch(copilot::handle_patch_config)
                .delete(copilot::handle_delete_config),
        )
        .route("/api/v1/copilot/:id/step", put(copilot::handle_update_step))
        // Applications
        .route(
            "/api/v1/applications",
            post(applications::handle_create_application)
                .get(applications::handle_list_applications),
        )
        .route(
            "/api/v1/applications/all",
            get(applications::handle_list_all_applications),
        )
        .route(
            "/api/v1/applications/:id",
            get(applications::handle_get_application)
                .delete(applications::handle_delete_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            put(applications::handle_update_application_status),
        )
        // Payments
        .route(
            "/api/v1/payments/create-payment-intent",
            post(payments::handle_create_payment_intent),
        )
        .route(
            "/api/v1/payments/confirm-payment",
            post(payments::handle_confirm_payment),
        )
        .route("/api/v1/payments/history", get(payments::handle_payment_history))
        .route(
            "/api/v1/payments/cancel-subscription",
            post(payments::handle_cancel_subscription),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::auth::{GATEWAY_SECRET_HEADER, USER_ID_HEADER};
    use crate::billing::gateway::StripeClient;
    use crate::config::Config;
    use crate::copilot::store::memory::MemoryConfigStore;

    /// Router over an in-memory config store. The pool never connects, so
    /// only routes that stay off Postgres can be exercised.
    fn test_router(gateway_secret: Option<&str>) -> Router {
        let config = Config {
            database_url: "postgres://localhost/copilot_test".to_string(),
            database_max_connections: 1,
            stripe_secret_key: "sk_test".to_string(),
            stripe_api_base: "http://localhost:12111".to_string(),
            gateway_secret: gateway_secret.map(str::to_string),
            port: 0,
            rust_log: "info".to_string(),
        };
        let state = AppState {
            db: PgPoolOptions::new()
                .connect_lazy(&config.database_url)
                .unwrap(),
            configs: Arc::new(MemoryConfigStore::default()),
            billing: StripeClient::new(&config).unwrap(),
            config,
        };
        build_router(state)
    }

    fn json_request(method: &str, uri: &str, user: Option<Uuid>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(user) = user {
            builder = builder.header(USER_ID_HEADER, user.to_string());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router(None);
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "copilot-api");
    }

    #[tokio::test]
    async fn test_copilot_requires_identity() {
        let router = test_router(None);
        let request = Request::builder()
            .uri("/api/v1/copilot")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    #[tokio::test]
    async fn test_gateway_secret_enforced() {
        let router = test_router(Some("s3cret"));
        let owner = Uuid::new_v4();

        let (status, _) = send(
            &router,
            json_request("GET", "/api/v1/copilot", Some(owner), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let request = Request::builder()
            .uri("/api/v1/copilot")
            .header(USER_ID_HEADER, owner.to_string())
            .header(GATEWAY_SECRET_HEADER, "s3cret")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["copilots"], json!([]));
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (status, body) = send(
            &router,
            json_request(
                "PATCH",
                "/api/v1/copilot",
                Some(owner),
                json!({ "job_setup": { "job_titles": ["SRE"] } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["config"]["step_completed"], 1);
        assert_eq!(body["config"]["name"], "My Copilot Configuration");
        let id = body["config"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            json_request(
                "PATCH",
                "/api/v1/copilot",
                Some(owner),
                json!({ "step_completed": 2, "filters": { "industry": "Energy" } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["id"], id.as_str());
        assert_eq!(body["config"]["step_completed"], 2);
        assert_eq!(body["config"]["job_setup"]["job_titles"], json!(["SRE"]));
    }

    #[tokio::test]
    async fn test_step_endpoint_flow() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (_, body) = send(
            &router,
            json_request("PATCH", "/api/v1/copilot", Some(owner), json!({})),
        )
        .await;
        let id = body["config"]["id"].as_str().unwrap().to_string();
        let step_uri = format!("/api/v1/copilot/{id}/step");

        let (status, body) = send(
            &router,
            json_request("PUT", &step_uri, Some(owner), json!({ "step": 5, "data": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "INVALID_STEP");

        let (status, body) = send(
            &router,
            json_request(
                "PUT",
                &step_uri,
                Some(owner),
                json!({ "step": 4, "data": { "selected_mode": "auto-apply" } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["is_completed"], true);
        assert_eq!(body["config"]["step_completed"], 4);
    }

    #[tokio::test]
    async fn test_other_owner_gets_not_found() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (_, body) = send(
            &router,
            json_request("PATCH", "/api/v1/copilot", Some(owner), json!({ "name": "Mine" })),
        )
        .await;
        let id = body["config"]["id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/copilot/{id}");

        for method in ["GET", "PATCH", "DELETE"] {
            let (status, body) = send(
                &router,
                json_request(method, &uri, Some(Uuid::new_v4()), json!({ "name": "Stolen" })),
            )
            .await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{method}");
            assert_eq!(body["error"]["code"], "NOT_FOUND");
        }

        let (status, body) = send(&router, json_request("GET", &uri, Some(owner), Value::Null)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["config"]["name"], "Mine");
    }

    #[tokio::test]
    async fn test_invalid_patch_is_validation_error() {
        let router = test_router(None);
        let (status, body) = send(
            &router,
            json_request(
                "PATCH",
                "/api/v1/copilot",
                Some(Uuid::new_v4()),
                json!({ "step_completed": 9 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_malformed_bodies_use_error_envelope() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (_, body) = send(
            &router,
            json_request("PATCH", "/api/v1/copilot", Some(owner), json!({})),
        )
        .await;
        let id = body["config"]["id"].as_str().unwrap().to_string();
        let step_uri = format!("/api/v1/copilot/{id}/step");

        let cases = [
            ("PUT", step_uri.as_str(), json!({ "step": "two", "data": {} })),
            ("PUT", step_uri.as_str(), json!({ "step": 2 })),
            (
                "POST",
                "/api/v1/applications",
                json!({
                    "full_name": "Grace Hopper",
                    "email": "grace@navy.mil",
                    "is_in_us": "yes",
                    "career_track": "astronaut",
                    "is_currently_employed": "no"
                }),
            ),
        ];
        for (method, uri, payload) in cases {
            let (status, body) = send(&router, json_request(method, uri, Some(owner), payload)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
            assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{method} {uri}");
        }

        let request = Request::builder()
            .method("PATCH")
            .uri("/api/v1/copilot")
            .header("content-type", "application/json")
            .header(USER_ID_HEADER, owner.to_string())
            .body(Body::from("{not json"))
            .unwrap();
        let (status, body) = send(&router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_application_cannot_link_foreign_config() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (_, body) = send(
            &router,
            json_request("PATCH", "/api/v1/copilot", Some(owner), json!({ "name": "Private" })),
        )
        .await;
        let config_id = body["config"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &router,
            json_request(
                "POST",
                "/api/v1/applications",
                Some(Uuid::new_v4()),
                json!({
                    "full_name": "Mallory",
                    "email": "mallory@example.com",
                    "is_in_us": "no",
                    "career_track": "other",
                    "is_currently_employed": "yes",
                    "copilot_config_id": config_id
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_delete_then_list_is_empty() {
        let router = test_router(None);
        let owner = Uuid::new_v4();

        let (_, body) = send(
            &router,
            json_request("PATCH", "/api/v1/copilot", Some(owner), json!({})),
        )
        .await;
        let id = body["config"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &router,
            json_request("DELETE", &format!("/api/v1/copilot/{id}"), Some(owner), Value::Null),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(
            &router,
            json_request("GET", "/api/v1/copilot", Some(owner), Value::Null),
        )
        .await;
        assert_eq!(body["copilots"], json!([]));
    }
}
