//! Authentication and verification core.
//!
//! This module coordinates stateless bearer tokens, per-request principal
//! resolution, and the email verification-code lifecycle.
//!
//! ## Tokens
//!
//! Login issues an HMAC-SHA256 signed token carrying the subject and a role
//! snapshot; every request passes through [`principal::authenticate`], which
//! resolves the token into an optional principal without ever aborting the
//! pipeline. Role-gated handlers reject unauthenticated or under-privileged
//! calls with 401/403.
//!
//! ## Verification codes
//!
//! [`verification`] owns all writes to the code table. Issuance is limited to
//! one per 60 seconds and ten per day per (email, scene), counted over the
//! persisted history. Codes expire after five minutes and are invalidated
//! after five wrong attempts.

pub(crate) mod codes;
pub(crate) mod error;
pub(crate) mod login;
pub(crate) mod me;
pub(crate) mod models;
pub(crate) mod password;
pub(crate) mod principal;
pub(crate) mod register;
pub(crate) mod reset;
pub(crate) mod storage;
pub(crate) mod token;
pub(crate) mod types;
pub(crate) mod users;
pub(crate) mod utils;
pub(crate) mod verification;

pub use principal::Principal;
pub use token::TokenService;
