//! Database helpers for identities and verification-code state.
//!
//! The verification service is the only writer of
//! `email_verification_codes`; records are never deleted so the issuance
//! history can back the rate limits across restarts.

use anyhow::{Context, Result};
use sqlx::{PgPool, Row};
use tracing::Instrument;

use super::models::{roles_from_names, CodeStatus, Role, Scene};
use super::types::UserSummary;
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new account.
#[derive(Debug)]
pub(super) enum RegisterOutcome {
    Created,
    DuplicateUsername,
    DuplicateEmail,
}

/// Fields needed to check credentials and issue a token.
pub(super) struct UserRecord {
    pub(super) username: String,
    pub(super) password_hash: String,
    pub(super) roles: Vec<Role>,
}

/// Immutable snapshot of the newest verification code for an (email, scene)
/// pair. Expiry is evaluated by the database clock at fetch time.
pub(super) struct CodeRecord {
    pub(super) id: i64,
    pub(super) code: String,
    pub(super) try_count: i32,
    pub(super) status: CodeStatus,
    pub(super) expired: bool,
}

pub(super) async fn lookup_user(pool: &PgPool, username: &str) -> Result<Option<UserRecord>> {
    let query = "SELECT username, password_hash, roles FROM users WHERE username = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user")?;

    Ok(row.map(|row| {
        let names: Vec<String> = row.get("roles");
        UserRecord {
            username: row.get("username"),
            password_hash: row.get("password_hash"),
            roles: roles_from_names(&names),
        }
    }))
}

pub(super) async fn lookup_user_roles(
    pool: &PgPool,
    username: &str,
) -> Result<Option<Vec<Role>>> {
    let query = "SELECT roles FROM users WHERE username = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(username)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user roles")?;

    Ok(row.map(|row| {
        let names: Vec<String> = row.get("roles");
        roles_from_names(&names)
    }))
}

pub(super) async fn email_exists(pool: &PgPool, email: &str) -> Result<bool> {
    let query = "SELECT 1 FROM users WHERE email = $1 LIMIT 1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check email existence")?;
    Ok(row.is_some())
}

pub(super) async fn insert_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
    email: Option<&str>,
) -> Result<RegisterOutcome> {
    let query = r"
        INSERT INTO users (username, password_hash, email)
        VALUES ($1, $2, $3)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(username)
        .bind(password_hash)
        .bind(email)
        .execute(pool)
        .instrument(span)
        .await;

    match result {
        Ok(_) => Ok(RegisterOutcome::Created),
        Err(err) if is_unique_violation(&err) => {
            let constraint = match &err {
                sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_string),
                _ => None,
            };
            if constraint.as_deref() == Some("users_email_key") {
                Ok(RegisterOutcome::DuplicateEmail)
            } else {
                Ok(RegisterOutcome::DuplicateUsername)
            }
        }
        Err(err) => Err(err).context("failed to insert user"),
    }
}

/// Create the bootstrap ADMIN account if it is absent; never overwrites an
/// existing one. Returns true when the row was created.
pub(crate) async fn ensure_admin_user(
    pool: &PgPool,
    username: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        INSERT INTO users (username, password_hash, roles)
        VALUES ($1, $2, '{ADMIN}')
        ON CONFLICT (username) DO NOTHING
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(username)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to ensure admin user")?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn update_password_by_email(
    pool: &PgPool,
    email: &str,
    password_hash: &str,
) -> Result<bool> {
    let query = r"
        UPDATE users
        SET password_hash = $2,
            updated_at = NOW()
        WHERE email = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(email)
        .bind(password_hash)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update password")?;
    Ok(result.rows_affected() > 0)
}

pub(super) async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>> {
    let query = "SELECT id, username, email, roles FROM users ORDER BY username";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    Ok(rows
        .into_iter()
        .map(|row| UserSummary {
            id: row.get::<uuid::Uuid, _>("id").to_string(),
            username: row.get("username"),
            email: row.get("email"),
            roles: row.get("roles"),
        })
        .collect())
}

/// Newest code record for (email, scene), regardless of status.
pub(super) async fn latest_code(
    pool: &PgPool,
    email: &str,
    scene: Scene,
) -> Result<Option<CodeRecord>> {
    let query = r"
        SELECT id, code, try_count, status, (expires_at <= NOW()) AS expired
        FROM email_verification_codes
        WHERE email = $1
          AND scene = $2
        ORDER BY created_at DESC, id DESC
        LIMIT 1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(scene.as_str())
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup verification code")?;

    Ok(row.map(|row| CodeRecord {
        id: row.get("id"),
        code: row.get("code"),
        try_count: row.get("try_count"),
        status: CodeStatus::from_i16(row.get("status")),
        expired: row.get("expired"),
    }))
}

/// Issuance count for (email, scene) within the last `seconds`.
pub(super) async fn count_codes_since(
    pool: &PgPool,
    email: &str,
    scene: Scene,
    seconds: i64,
) -> Result<i64> {
    let query = r"
        SELECT COUNT(*) AS count
        FROM email_verification_codes
        WHERE email = $1
          AND scene = $2
          AND created_at > NOW() - ($3 * INTERVAL '1 second')
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(scene.as_str())
        .bind(seconds)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count recent verification codes")?;
    Ok(row.get("count"))
}

/// Issuance count for (email, scene) since local midnight of the database
/// server; the daily ceiling resets at that boundary.
pub(super) async fn count_codes_today(pool: &PgPool, email: &str, scene: Scene) -> Result<i64> {
    let query = r"
        SELECT COUNT(*) AS count
        FROM email_verification_codes
        WHERE email = $1
          AND scene = $2
          AND created_at >= date_trunc('day', NOW())
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(scene.as_str())
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to count daily verification codes")?;
    Ok(row.get("count"))
}

/// Invalidate any pending code for (email, scene) and insert the replacement
/// in the same transaction, keeping at most one PENDING record per pair.
pub(super) async fn replace_pending_code(
    pool: &PgPool,
    email: &str,
    scene: Scene,
    code: &str,
    ttl_seconds: i64,
) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .context("failed to begin verification code transaction")?;

    let query = r"
        UPDATE email_verification_codes
        SET status = $3,
            updated_at = NOW()
        WHERE email = $1
          AND scene = $2
          AND status = $4
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(scene.as_str())
        .bind(CodeStatus::Invalidated.as_i16())
        .bind(CodeStatus::Pending.as_i16())
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to invalidate previous verification code")?;

    let query = r"
        INSERT INTO email_verification_codes (email, code, scene, expires_at)
        VALUES ($1, $2, $3, NOW() + ($4 * INTERVAL '1 second'))
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(email)
        .bind(code)
        .bind(scene.as_str())
        .bind(ttl_seconds)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to insert verification code")?;

    tx.commit()
        .await
        .context("failed to commit verification code transaction")?;

    Ok(())
}

/// Explicit status transition for a single code record.
pub(super) async fn set_code_status(pool: &PgPool, id: i64, status: CodeStatus) -> Result<()> {
    let query = r"
        UPDATE email_verification_codes
        SET status = $2,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .bind(status.as_i16())
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update verification code status")?;
    Ok(())
}

pub(super) async fn increment_code_tries(pool: &PgPool, id: i64) -> Result<()> {
    let query = r"
        UPDATE email_verification_codes
        SET try_count = try_count + 1,
            updated_at = NOW()
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to increment verification code tries")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{CodeRecord, RegisterOutcome, UserRecord};
    use crate::api::handlers::auth::models::{CodeStatus, Role};

    #[test]
    fn register_outcome_debug_names() {
        assert_eq!(format!("{:?}", RegisterOutcome::Created), "Created");
        assert_eq!(
            format!("{:?}", RegisterOutcome::DuplicateUsername),
            "DuplicateUsername"
        );
        assert_eq!(
            format!("{:?}", RegisterOutcome::DuplicateEmail),
            "DuplicateEmail"
        );
    }

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            username: "alice".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            roles: vec![Role::User],
        };
        assert_eq!(record.username, "alice");
        assert_eq!(record.roles, vec![Role::User]);
    }

    #[test]
    fn code_record_holds_values() {
        let record = CodeRecord {
            id: 7,
            code: "123456".to_string(),
            try_count: 0,
            status: CodeStatus::Pending,
            expired: false,
        };
        assert_eq!(record.id, 7);
        assert_eq!(record.status, CodeStatus::Pending);
        assert!(!record.expired);
    }
}
