//! # Registro (Student Records Backend)
//!
//! `registro` is the authentication and verification core of a student-record
//! backend. It issues and validates stateless bearer tokens, authenticates
//! every inbound request, and drives the email verification-code lifecycle
//! that gates registration and password reset.
//!
//! ## Tokens
//!
//! Tokens are compact, self-verifying HMAC-SHA256 credentials carrying the
//! subject (username), issuance and expiry instants, and a snapshot of the
//! subject's role names. There is no refresh and no revocation list; expiry
//! is the only termination mechanism.
//!
//! > **Warning:** when no signing secret is configured (or the configured one
//! > is too weak for HMAC-SHA256) an ephemeral key is generated at startup.
//! > Tokens issued before a restart then become unverifiable. This is an
//! > accepted development-mode behavior, not an error.
//!
//! ## Verification codes
//!
//! One-time 6-digit codes are scoped per (email, scene) with scene being
//! `register` or `reset_password`. At most one pending code exists per pair;
//! issuing a new code invalidates the previous one in the same transaction.
//! Codes expire after five minutes and tolerate at most five failed attempts.
//! Issuance is rate limited to one per 60 seconds and ten per day, counted
//! over the persisted code history so the limits survive restarts.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }
}
