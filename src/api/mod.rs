use crate::{
    api::handlers::{auth, health},
    cli::globals::GlobalArgs,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post},
    Extension, Router,
};
use secrecy::ExposeSecret;
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub(crate) mod email;
pub(crate) mod handlers;
// OpenAPI wiring and the /openapi.json handler live in openapi.rs.
mod openapi;

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, dsn: String, globals: &GlobalArgs) -> Result<()> {
    // Connect to database
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    let tokens = Arc::new(auth::TokenService::new(
        &globals.jwt_secret,
        globals.token_ttl_seconds,
    ));

    // Exactly one bootstrap ADMIN identity is guaranteed to exist; an already
    // present account is never overwritten.
    let admin_hash = auth::password::hash_password(globals.admin_password.expose_secret())?;
    if auth::storage::ensure_admin_user(&pool, &globals.admin_username, &admin_hash).await? {
        info!(username = %globals.admin_username, "bootstrap admin account created");
    }

    let mailer = email::build_sender(globals)?;

    let app = router().layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span))
            .layer(Extension(pool))
            .layer(Extension(tokens))
            .layer(Extension(mailer))
            // Principal resolution happens-before every handler; it never
            // short-circuits the pipeline itself.
            .layer(middleware::from_fn(auth::principal::authenticate)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Gracefully shutdown");
        })
        .await?;

    Ok(())
}

/// Build the route table; layers are attached by [`new`].
#[must_use]
pub fn router() -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/openapi.json", get(openapi::openapi))
        .route("/api/auth/register", post(auth::register::register))
        .route("/api/auth/login", post(auth::login::login))
        .route("/api/auth/email/code/send", post(auth::codes::send_code))
        .route(
            "/api/auth/email/code/verify",
            post(auth::codes::verify_code),
        )
        .route("/api/auth/reset-password", post(auth::reset::reset_password))
        .route("/api/auth/me", get(auth::me::me))
        .route("/api/admin/users", get(auth::users::list_users))
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds() {
        let _ = router();
    }

    #[test]
    fn make_span_handles_missing_request_id() {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("request");
        let _span = make_span(&request);
    }
}
