//! OpenAPI document wiring and the `/openapi.json` handler.

use axum::{response::IntoResponse, Json};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::api::handlers::auth::types::{
    CodeResponse, LoginRequest, MeResponse, RegisterRequest, ResetPasswordRequest,
    SendCodeRequest, TokenResponse, UserSummary, VerifyCodeRequest,
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    paths(
        crate::api::handlers::health::health,
        crate::api::handlers::auth::register::register,
        crate::api::handlers::auth::login::login,
        crate::api::handlers::auth::codes::send_code,
        crate::api::handlers::auth::codes::verify_code,
        crate::api::handlers::auth::reset::reset_password,
        crate::api::handlers::auth::me::me,
        crate::api::handlers::auth::users::list_users,
    ),
    components(schemas(
        RegisterRequest,
        LoginRequest,
        TokenResponse,
        SendCodeRequest,
        VerifyCodeRequest,
        ResetPasswordRequest,
        CodeResponse,
        MeResponse,
        UserSummary,
    )),
    tags(
        (name = "auth", description = "Authentication and email verification"),
        (name = "admin", description = "Administrative endpoints"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

pub async fn openapi() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let document = ApiDoc::openapi();
        let paths = &document.paths.paths;
        for route in [
            "/health",
            "/api/auth/register",
            "/api/auth/login",
            "/api/auth/email/code/send",
            "/api/auth/email/code/verify",
            "/api/auth/reset-password",
            "/api/auth/me",
            "/api/admin/users",
        ] {
            assert!(paths.contains_key(route), "missing route: {route}");
        }
    }
}
