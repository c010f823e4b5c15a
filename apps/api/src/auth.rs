//! Identity boundary.
//!
//! Credentials are checked by the upstream identity gateway, which forwards
//! the account id in `X-User-Id`. When `GATEWAY_SECRET` is configured the
//! gateway must also send `X-Gateway-Secret`; anything else is treated as
//! unauthenticated.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use sqlx::PgPool;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const GATEWAY_SECRET_HEADER: &str = "x-gateway-secret";

/// Authenticated account id. Rejects with 401 when absent.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

/// Account id if the request carries one; used by public endpoints.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthUser(pub Option<Uuid>);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        identity_from_headers(&parts.headers, state.config.gateway_secret.as_deref())?
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!(
                    event = "auth_failure",
                    reason = "missing_identity",
                    "Request without forwarded identity"
                );
                AppError::Unauthorized
            })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        identity_from_headers(&parts.headers, state.config.gateway_secret.as_deref())
            .map(MaybeAuthUser)
    }
}

/// Reads the forwarded identity.
///
/// `Ok(None)` means the request is anonymous. A present but unverifiable
/// identity (bad secret, malformed id) is an error rather than anonymous.
pub fn identity_from_headers(
    headers: &HeaderMap,
    gateway_secret: Option<&str>,
) -> Result<Option<Uuid>, AppError> {
    let Some(raw_id) = headers.get(USER_ID_HEADER) else {
        return Ok(None);
    };

    if let Some(expected) = gateway_secret {
        let provided = headers
            .get(GATEWAY_SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !secrets_match(provided, expected) {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_gateway_secret",
                "Forwarded identity without a valid gateway secret"
            );
            return Err(AppError::Unauthorized);
        }
    }

    let id = raw_id
        .to_str()
        .ok()
        .and_then(|s| Uuid::parse_str(s.trim()).ok())
        .ok_or_else(|| {
            tracing::warn!(
                event = "auth_failure",
                reason = "malformed_user_id",
                "Forwarded user id is not a UUID"
            );
            AppError::Unauthorized
        })?;

    Ok(Some(id))
}

/// Constant-time comparison over equal-length padded buffers, so neither
/// content nor length leaks through timing.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// Who is submitting a public form.
#[derive(Debug, Clone)]
pub enum Submitter {
    AuthenticatedOwner(Uuid),
    UnauthenticatedEmail(String),
}

impl Submitter {
    pub fn new(identity: MaybeAuthUser, email: &str) -> Self {
        match identity.0 {
            Some(id) => Submitter::AuthenticatedOwner(id),
            None => Submitter::UnauthenticatedEmail(email.to_string()),
        }
    }
}

/// Resolves a submitter to an account id: the authenticated id as-is,
/// otherwise the account registered under the email, if any.
pub async fn resolve_owner(pool: &PgPool, submitter: &Submitter) -> Result<Option<Uuid>, AppError> {
    match submitter {
        Submitter::AuthenticatedOwner(id) => Ok(Some(*id)),
        Submitter::UnauthenticatedEmail(email) => Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM users WHERE email = $1",
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?),
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
