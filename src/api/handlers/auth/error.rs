//! Typed failure kinds for the verification flows.
//!
//! Each kind carries a stable business code so clients can branch without
//! sniffing messages; the HTTP layer maps them onto the `{code, message}`
//! envelope.

use axum::http::StatusCode;
use thiserror::Error;

/// Failure kinds for code issuance, mapped into the 1001..=1500 range.
#[derive(Debug, Error)]
pub enum SendCodeError {
    #[error("invalid email address format")]
    InvalidFormat,
    #[error("this email is already registered")]
    AlreadyRegistered,
    #[error("this email is not registered")]
    NotRegistered,
    #[error("too frequent, retry after {0} seconds")]
    RateLimited(i64),
    #[error("daily send limit reached for this email")]
    DailyLimitExceeded,
    #[error("verification email could not be delivered")]
    Delivery(#[source] anyhow::Error),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl SendCodeError {
    /// Business code carried in the response envelope.
    #[must_use]
    pub fn business_code(&self) -> u16 {
        match self {
            Self::InvalidFormat => 1001,
            Self::AlreadyRegistered => 1002,
            Self::NotRegistered => 1003,
            Self::RateLimited(_) => 1004,
            Self::DailyLimitExceeded => 1005,
            Self::Delivery(_) | Self::Storage(_) => 1500,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            // Unexpected storage faults are server errors; everything else is
            // a business rejection, delivery failures included.
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Failure kinds for code checking, mapped into the 2001..=2004 range.
#[derive(Debug, Error)]
pub enum VerifyCodeError {
    #[error("verification code not found, request one first")]
    NotFound,
    #[error("verification code is no longer valid")]
    Invalidated,
    #[error("verification code expired, request a new one")]
    Expired,
    #[error("too many wrong attempts, request a new code")]
    MaxTriesExceeded,
    #[error("wrong verification code, {remaining} attempts left")]
    Mismatch { remaining: i32 },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl VerifyCodeError {
    /// Business code carried in the response envelope.
    #[must_use]
    pub fn business_code(&self) -> u16 {
        match self {
            Self::Mismatch { .. } => 2001,
            Self::NotFound | Self::Expired => 2002,
            Self::Invalidated | Self::MaxTriesExceeded => 2003,
            Self::Storage(_) => 2004,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}
