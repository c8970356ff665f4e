//! API handlers for the student records backend.
//!
//! This module organizes the service's route handlers: the health endpoint
//! and the authentication/verification core under [`auth`].

pub(crate) mod auth;
pub(crate) mod health;
