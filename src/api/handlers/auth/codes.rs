//! Email verification-code endpoints.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use tracing::error;

use super::error::{SendCodeError, VerifyCodeError};
use super::models::Scene;
use super::types::{CodeResponse, SendCodeRequest, VerifyCodeRequest};
use super::verification;
use crate::api::email::SharedEmailSender;

fn envelope(status: StatusCode, code: u16, message: impl Into<String>) -> Response {
    (
        status,
        Json(CodeResponse {
            code,
            message: message.into(),
        }),
    )
        .into_response()
}

#[utoipa::path(
    post,
    path = "/api/auth/email/code/send",
    request_body = SendCodeRequest,
    responses(
        (status = 200, description = "Verification code sent", body = CodeResponse),
        (status = 400, description = "Business rejection, code 1001..1500", body = CodeResponse),
        (status = 500, description = "Unexpected failure", body = CodeResponse)
    ),
    tag = "auth"
)]
pub async fn send_code(
    pool: Extension<PgPool>,
    mailer: Extension<SharedEmailSender>,
    payload: Option<Json<SendCodeRequest>>,
) -> impl IntoResponse {
    let request: SendCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return envelope(StatusCode::BAD_REQUEST, 1001, "Email address is required");
        }
    };

    let Some(email) = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return envelope(StatusCode::BAD_REQUEST, 1001, "Email address is required");
    };
    let scene = Scene::from_request(request.scene.as_deref());

    match verification::send_code(&pool, &**mailer, email, scene).await {
        Ok(()) => envelope(StatusCode::OK, 0, "Verification code sent"),
        Err(err) => {
            if matches!(
                err,
                SendCodeError::Delivery(_) | SendCodeError::Storage(_)
            ) {
                error!("Failed to send verification code: {err:#}");
            }
            envelope(err.status(), err.business_code(), err.to_string())
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/auth/email/code/verify",
    request_body = VerifyCodeRequest,
    responses(
        (status = 200, description = "Code accepted", body = CodeResponse),
        (status = 400, description = "Business rejection, code 2001..2004", body = CodeResponse),
        (status = 500, description = "Unexpected failure", body = CodeResponse)
    ),
    tag = "auth"
)]
pub async fn verify_code(
    pool: Extension<PgPool>,
    payload: Option<Json<VerifyCodeRequest>>,
) -> impl IntoResponse {
    let request: VerifyCodeRequest = match payload {
        Some(Json(payload)) => payload,
        None => {
            return envelope(StatusCode::BAD_REQUEST, 2001, "Email address is required");
        }
    };

    let Some(email) = request
        .email
        .as_deref()
        .map(str::trim)
        .filter(|email| !email.is_empty())
    else {
        return envelope(StatusCode::BAD_REQUEST, 2001, "Email address is required");
    };
    let Some(code) = request
        .code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
    else {
        return envelope(
            StatusCode::BAD_REQUEST,
            2001,
            "Verification code is required",
        );
    };
    let scene = Scene::from_request(request.scene.as_deref());

    match verification::verify_code(&pool, email, code, scene).await {
        Ok(()) => envelope(StatusCode::OK, 0, "Verified"),
        Err(err) => {
            if matches!(err, VerifyCodeError::Storage(_)) {
                error!("Failed to verify code: {err:#}");
            }
            envelope(err.status(), err.business_code(), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::{LogEmailSender, SharedEmailSender};
    use anyhow::Result;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;
    use std::sync::Arc;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    fn mailer() -> SharedEmailSender {
        Arc::new(LogEmailSender)
    }

    #[tokio::test]
    async fn send_code_missing_payload() -> Result<()> {
        let response = send_code(Extension(lazy_pool()?), Extension(mailer()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn send_code_missing_email() -> Result<()> {
        let response = send_code(
            Extension(lazy_pool()?),
            Extension(mailer()),
            Some(Json(SendCodeRequest {
                email: Some("   ".to_string()),
                scene: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn verify_code_missing_code() -> Result<()> {
        let response = verify_code(
            Extension(lazy_pool()?),
            Some(Json(VerifyCodeRequest {
                email: Some("alice@example.com".to_string()),
                code: None,
                scene: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }
}
