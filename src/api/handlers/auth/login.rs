//! Login endpoint issuing bearer tokens.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;

use super::password;
use super::storage;
use super::token::TokenService;
use super::types::{LoginRequest, TokenResponse};

/// One fixed message for unknown usernames and wrong passwords alike, so the
/// response never discloses which of the two failed.
const GENERIC_LOGIN_FAILURE: &str = "Invalid username or password";

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Credentials accepted", body = TokenResponse),
        (status = 401, description = "Invalid username or password", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    pool: Extension<PgPool>,
    tokens: Extension<Arc<TokenService>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim();

    let user = match storage::lookup_user(&pool, username).await {
        Ok(user) => user,
        Err(err) => {
            error!("Failed to lookup user for login: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response();
        }
    };

    let Some(user) = user else {
        return (
            StatusCode::UNAUTHORIZED,
            GENERIC_LOGIN_FAILURE.to_string(),
        )
            .into_response();
    };

    if !password::verify_password(&request.password, &user.password_hash) {
        return (
            StatusCode::UNAUTHORIZED,
            GENERIC_LOGIN_FAILURE.to_string(),
        )
            .into_response();
    }

    match tokens.issue(&user.username, &user.roles) {
        Ok(token) => (StatusCode::OK, Json(TokenResponse { token })).into_response(),
        Err(err) => {
            error!("Failed to issue token: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Login failed".to_string(),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use axum::response::IntoResponse;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;

    fn token_service() -> Arc<TokenService> {
        Arc::new(TokenService::new(
            &SecretString::from("0123456789abcdef0123456789abcdef".to_string()),
            86_400,
        ))
    }

    #[tokio::test]
    async fn login_missing_payload() -> Result<()> {
        let pool = PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?;
        let response = login(Extension(pool), Extension(token_service()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
