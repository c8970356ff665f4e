//! Registration endpoint.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use tracing::error;

use super::password;
use super::storage::{self, RegisterOutcome};
use super::types::RegisterRequest;
use super::utils::{normalize_email, valid_email};

/// Minimum accepted password length.
pub(super) const MIN_PASSWORD_LENGTH: usize = 6;

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created"),
        (status = 400, description = "Validation failure or username/email taken", body = String)
    ),
    tag = "auth"
)]
pub async fn register(
    pool: Extension<PgPool>,
    payload: Option<Json<RegisterRequest>>,
) -> impl IntoResponse {
    let request: RegisterRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let username = request.username.trim();
    if username.is_empty() {
        return (StatusCode::BAD_REQUEST, "Username is required".to_string()).into_response();
    }
    if request.password.len() < MIN_PASSWORD_LENGTH {
        return (
            StatusCode::BAD_REQUEST,
            "Password needs at least 6 characters".to_string(),
        )
            .into_response();
    }

    let email = match &request.email {
        Some(email) => {
            let email = normalize_email(email);
            if email.is_empty() {
                None
            } else if valid_email(&email) {
                Some(email)
            } else {
                return (
                    StatusCode::BAD_REQUEST,
                    "Invalid email address".to_string(),
                )
                    .into_response();
            }
        }
        None => None,
    };

    let password_hash = match password::hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response();
        }
    };

    match storage::insert_user(&pool, username, &password_hash, email.as_deref()).await {
        Ok(RegisterOutcome::Created) => StatusCode::OK.into_response(),
        Ok(RegisterOutcome::DuplicateUsername) => (
            StatusCode::BAD_REQUEST,
            "Username already taken".to_string(),
        )
            .into_response(),
        Ok(RegisterOutcome::DuplicateEmail) => (
            StatusCode::BAD_REQUEST,
            "Email already registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Failed to register user: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Registration failed".to_string(),
            )
                .into_response()
        }
    }
}
