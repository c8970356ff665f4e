//! Administrative user listing.

use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};
use sqlx::PgPool;
use tracing::error;

use super::principal::{require_admin, Principal};
use super::storage;
use super::types::UserSummary;

#[utoipa::path(
    get,
    path = "/api/admin/users",
    responses(
        (status = 200, description = "All accounts", body = [UserSummary]),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an administrator")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn list_users(
    principal: Option<Extension<Principal>>,
    pool: Extension<PgPool>,
) -> impl IntoResponse {
    let principal = principal.as_ref().map(|extension| &extension.0);
    if let Err(status) = require_admin(principal) {
        return status.into_response();
    }

    match storage::list_users(&pool).await {
        Ok(users) => (StatusCode::OK, Json(users)).into_response(),
        Err(err) => {
            error!("Failed to list users: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::models::Role;
    use anyhow::Result;
    use axum::response::IntoResponse;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> Result<PgPool> {
        Ok(PgPoolOptions::new().connect_lazy("postgres://postgres@localhost/postgres")?)
    }

    #[tokio::test]
    async fn list_users_unauthenticated_is_401() -> Result<()> {
        let response = list_users(None, Extension(lazy_pool()?)).await.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn list_users_requires_admin_role() -> Result<()> {
        let principal = Principal {
            username: "alice".to_string(),
            roles: vec![Role::User],
        };
        let response = list_users(Some(Extension(principal)), Extension(lazy_pool()?))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
