// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, access control, security headers).

pub mod access;
pub mod auth;
pub mod security;

pub use access::{require_admin, require_approved, require_moderator};
pub use auth::require_auth;
