//! Verification-code lifecycle: issuance, rate limiting, and checking.
//!
//! State machine per (email, scene): a new code starts PENDING and any prior
//! PENDING record is invalidated in the same transaction, so at most one
//! PENDING record exists per pair. A record becomes CONSUMED on a successful
//! check and INVALIDATED on expiry, on too many wrong attempts, or on
//! replacement. Records are never deleted; the issuance history backs the
//! rate limits so they survive restarts.
//!
//! The frequency check and the subsequent insert are separate statements, so
//! concurrent sends for the same (email, scene) can race past the
//! one-per-60-seconds limit. The window is accepted as-is: request rates are
//! human-driven and the daily ceiling still bounds abuse.

use sqlx::PgPool;
use tracing::info;

use super::error::{SendCodeError, VerifyCodeError};
use super::models::{CodeStatus, Scene};
use super::storage;
use super::utils::{generate_code, normalize_email, valid_email};
use crate::api::email::{verification_email, EmailSender};

/// Verification codes expire five minutes after issuance.
pub const CODE_TTL_SECONDS: i64 = 5 * 60;
/// A code is invalidated after this many wrong attempts.
pub const MAX_TRIES: i32 = 5;
/// Minimum interval between two sends for the same (email, scene).
pub const SEND_INTERVAL_SECONDS: i64 = 60;
/// Ceiling on sends per (email, scene) per calendar day.
pub const DAILY_SEND_LIMIT: i64 = 10;

/// Issue a fresh code for (email, scene) and dispatch it by mail.
///
/// # Errors
///
/// Returns the typed failure kind: format, registration-state, rate-limit,
/// delivery, or storage. On a delivery failure the freshly committed PENDING
/// record is left in place; retrying after the rate-limit window replaces it.
pub async fn send_code(
    pool: &PgPool,
    mailer: &dyn EmailSender,
    email: &str,
    scene: Scene,
) -> Result<(), SendCodeError> {
    let email = normalize_email(email);
    if !valid_email(&email) {
        return Err(SendCodeError::InvalidFormat);
    }

    let registered = storage::email_exists(pool, &email).await?;
    match scene {
        Scene::Register if registered => return Err(SendCodeError::AlreadyRegistered),
        Scene::ResetPassword if !registered => return Err(SendCodeError::NotRegistered),
        _ => {}
    }

    if storage::count_codes_since(pool, &email, scene, SEND_INTERVAL_SECONDS).await? > 0 {
        return Err(SendCodeError::RateLimited(SEND_INTERVAL_SECONDS));
    }
    if storage::count_codes_today(pool, &email, scene).await? >= DAILY_SEND_LIMIT {
        return Err(SendCodeError::DailyLimitExceeded);
    }

    let code = generate_code();
    storage::replace_pending_code(pool, &email, scene, &code, CODE_TTL_SECONDS).await?;

    let message = verification_email(&email, &code, scene);
    mailer.send(&message).map_err(SendCodeError::Delivery)?;

    info!(email = %email, scene = scene.as_str(), "verification code sent");
    Ok(())
}

/// Check a submitted code against the newest record for (email, scene).
///
/// # Errors
///
/// Returns the typed failure kind; expiry and exhausted attempts transition
/// the record to INVALIDATED, a wrong code increments the attempt counter.
pub async fn verify_code(
    pool: &PgPool,
    email: &str,
    code: &str,
    scene: Scene,
) -> Result<(), VerifyCodeError> {
    let email = normalize_email(email);
    let code = code.trim();

    let Some(record) = storage::latest_code(pool, &email, scene).await? else {
        return Err(VerifyCodeError::NotFound);
    };

    // Anything but PENDING on the newest record means the code was already
    // consumed or replaced; a consumed code can never succeed twice.
    if record.status != CodeStatus::Pending {
        return Err(VerifyCodeError::Invalidated);
    }

    if record.expired {
        storage::set_code_status(pool, record.id, CodeStatus::Invalidated).await?;
        return Err(VerifyCodeError::Expired);
    }

    if record.try_count >= MAX_TRIES {
        storage::set_code_status(pool, record.id, CodeStatus::Invalidated).await?;
        return Err(VerifyCodeError::MaxTriesExceeded);
    }

    if record.code != code {
        storage::increment_code_tries(pool, record.id).await?;
        return Err(VerifyCodeError::Mismatch {
            remaining: MAX_TRIES - (record.try_count + 1),
        });
    }

    storage::set_code_status(pool, record.id, CodeStatus::Consumed).await?;

    info!(email = %email, scene = scene.as_str(), "verification code consumed");
    Ok(())
}
