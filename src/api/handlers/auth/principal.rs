//! Authenticated principal resolution for every inbound request.
//!
//! Flow Overview: read the bearer token from the authorization header,
//! resolve it to a stored identity, and attach an optional principal to the
//! request before any business handler runs. Resolution never aborts the
//! pipeline; role-gated handlers decide whether to reject.

use axum::{
    extract::{Extension, Request},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error};

use super::models::Role;
use super::storage;
use super::token::TokenService;

/// Authenticated user context derived from the bearer token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub username: String,
    pub roles: Vec<Role>,
}

/// Middleware resolving `Authorization: Bearer` into an optional
/// [`Principal`] in the request extensions.
///
/// Token parse/signature/expiry failures and unknown subjects all fold into
/// "unauthenticated": the request continues and downstream authorization
/// returns 401/403 where a principal is required. An already-established
/// principal is never overwritten.
pub async fn authenticate(
    Extension(pool): Extension<PgPool>,
    Extension(tokens): Extension<Arc<TokenService>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<Principal>().is_none() {
        if let Some(token) = extract_bearer_token(request.headers()) {
            match tokens.parse_subject(&token) {
                Ok(subject) => match storage::lookup_user_roles(&pool, &subject).await {
                    Ok(Some(roles)) => {
                        if tokens.validate(&token) {
                            request.extensions_mut().insert(Principal {
                                username: subject,
                                roles,
                            });
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        // Lookup faults leave the request unauthenticated
                        // instead of failing it here.
                        error!("Failed to resolve principal: {err}");
                    }
                },
                Err(err) => {
                    debug!("Bearer token rejected: {err}");
                }
            }
        }
    }

    next.run(request).await
}

/// Require an authenticated principal, or 401.
pub(super) fn require_user(principal: Option<&Principal>) -> Result<&Principal, StatusCode> {
    principal.ok_or(StatusCode::UNAUTHORIZED)
}

/// Require the ADMIN role: 401 when unauthenticated, 403 when
/// under-privileged.
pub(super) fn require_admin(principal: Option<&Principal>) -> Result<&Principal, StatusCode> {
    let principal = require_user(principal)?;
    if principal.roles.contains(&Role::Admin) {
        Ok(principal)
    } else {
        Err(StatusCode::FORBIDDEN)
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
