//! Authenticated identity echo.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use super::models::role_names;
use super::principal::Principal;
use super::types::MeResponse;

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current principal", body = MeResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn me(principal: Option<Extension<Principal>>) -> impl IntoResponse {
    match principal {
        Some(Extension(principal)) => (
            StatusCode::OK,
            Json(MeResponse {
                roles: role_names(&principal.roles),
                username: principal.username,
            }),
        )
            .into_response(),
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::models::Role;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn me_unauthenticated_is_401() {
        let response = me(None).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_echoes_principal() {
        let principal = Principal {
            username: "alice".to_string(),
            roles: vec![Role::User],
        };
        let response = me(Some(Extension(principal))).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
