//! Password reset endpoint chaining code verification and credential update.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use tracing::error;

use super::error::VerifyCodeError;
use super::models::Scene;
use super::password;
use super::register::MIN_PASSWORD_LENGTH;
use super::storage;
use super::types::ResetPasswordRequest;
use super::utils::normalize_email;
use super::verification;

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = String),
        (status = 400, description = "Verification failure or weak password", body = String)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> impl IntoResponse {
    let request: ResetPasswordRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let Some(email) = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            "Email address is required".to_string(),
        )
            .into_response();
    };
    let Some(code) = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
    else {
        return (
            StatusCode::BAD_REQUEST,
            "Verification code is required".to_string(),
        )
            .into_response();
    };
    let new_password = match request.new_password {
        Some(password) if password.len() >= MIN_PASSWORD_LENGTH => password,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "Password needs at least 6 characters".to_string(),
            )
                .into_response();
        }
    };

    let email = normalize_email(email);

    if let Err(err) = verification::verify_code(&pool, &email, code, Scene::ResetPassword).await {
        return match err {
            VerifyCodeError::Storage(err) => {
                error!("Failed to verify reset code: {err:#}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Password reset failed, try again later".to_string(),
                )
                    .into_response()
            }
            err => (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
        };
    }

    let password_hash = match password::hash_password(&new_password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password reset failed, try again later".to_string(),
            )
                .into_response();
        }
    };

    match storage::update_password_by_email(&pool, &email, &password_hash).await {
        Ok(true) => (
            StatusCode::OK,
            "Password reset, sign in with your new password".to_string(),
        )
            .into_response(),
        Ok(false) => (
            StatusCode::BAD_REQUEST,
            "Email is not registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to update password: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Password reset failed, try again later".to_string(),
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
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn reset_password_missing_payload() -> Result<()> {
        let response = reset_password(Extension(lazy_pool()?), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_rejects_short_password() -> Result<()> {
        let response = reset_password(
            Extension(lazy_pool()?),
            Some(Json(ResetPasswordRequest {
                email: Some("alice@example.com".to_string()),
                code: Some("123456".to_string()),
                new_password: Some("12345".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_requires_code() -> Result<()> {
        let response = reset_password(
            Extension(lazy_pool()?),
            Some(Json(ResetPasswordRequest {
                email: Some("alice@example.com".to_string()),
                code: None,
                new_password: Some("hunter22".to_string()),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
