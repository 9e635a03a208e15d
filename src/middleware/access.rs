// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile-based access control.
//!
//! Runs after [`super::auth::require_auth`]. Loads the caller's profile,
//! applies the approval gate and inserts the [`UserProfile`] into request
//! extensions for handlers.

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::models::{AppSettings, UserProfile, VerificationStatus};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Decide whether a profile may use the app.
///
/// Blocked accounts are rejected first, then maintenance mode (admins
/// bypass it), then unverified accounts.
pub fn check_access(profile: &UserProfile, settings: &AppSettings) -> Result<(), AppError> {
    if profile.is_blocked {
        return Err(AppError::AccountBlocked);
    }
    if !settings.app_enabled && !profile.role.is_admin() {
        return Err(AppError::Maintenance(settings.maintenance_text()));
    }
    if profile.verification_status != VerificationStatus::Approved {
        return Err(AppError::VerificationPending);
    }
    Ok(())
}

/// The authenticated caller, cloned so no borrow of the request is held
/// across an await.
fn caller_id(request: &Request) -> Result<String, AppError> {
    request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.user_id.clone())
        .ok_or(AppError::Unauthorized)
}

async fn load_profile(state: &AppState, user_id: &str) -> Result<UserProfile, AppError> {
    state
        .db
        .get_profile(user_id)
        .await?
        .ok_or(AppError::ProfileRequired)
}

/// Require an approved, unblocked profile (and the app not in maintenance).
pub async fn require_approved(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = caller_id(&request)?;
    let profile = load_profile(&state, &user_id).await?;
    let settings = state.db.get_app_settings().await?.unwrap_or_default();

    check_access(&profile, &settings)?;

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}

/// Require the admin or super_admin role.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = caller_id(&request)?;
    let profile = load_profile(&state, &user_id).await?;

    if profile.is_blocked {
        return Err(AppError::AccountBlocked);
    }
    if !profile.role.is_admin() {
        tracing::warn!(user_id = %profile.user_id, role = %profile.role, "Admin access denied");
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}

/// Require moderator or above.
pub async fn require_moderator(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = caller_id(&request)?;
    let profile = load_profile(&state, &user_id).await?;

    if profile.is_blocked {
        return Err(AppError::AccountBlocked);
    }
    if !profile.role.is_moderator() {
        return Err(AppError::Forbidden("Moderator access required".to_string()));
    }

    request.extensions_mut().insert(profile);
    Ok(next.run(request).await)
}
