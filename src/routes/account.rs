// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account routes: profile creation after sign-up, profile lookup and the
//! public app status.
//!
//! These need a valid JWT but not an approved profile; the auth middleware
//! is applied in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    AppSettings, Badge, PlanQuotas, PlanTable, SubscriptionPlan, UserProfile, UserRole,
    VerificationStatus,
};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/profile", post(create_profile).put(update_profile))
        .route("/api/app-status", get(get_app_status))
}

// ─── Profile ─────────────────────────────────────────────────

/// Sign-up details submitted once the auth account exists.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateProfileRequest {
    /// Used when the token carries no email claim
    #[validate(email)]
    #[serde(default)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub real_name: String,
    #[validate(length(min = 1, max = 100))]
    pub father_name: String,
    #[validate(length(min = 7, max = 20))]
    pub whatsapp_number: String,
    #[validate(length(min = 4, max = 10))]
    pub batch_year: String,
    #[validate(length(min = 1, max = 100))]
    pub class_or_degree: String,
    #[validate(url)]
    #[serde(default)]
    pub medical_id_card_url: Option<String>,
}

/// Get the caller's profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<UserProfile>> {
    let profile = state
        .db
        .get_profile(&user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".to_string()))?;

    Ok(Json(profile))
}

/// Create the caller's profile. New accounts wait for admin approval.
async fn create_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<CreateProfileRequest>,
) -> Result<(StatusCode, Json<UserProfile>)> {
    request.validate()?;

    if state.db.get_profile(&user.user_id).await?.is_some() {
        return Err(AppError::Conflict("Profile already exists".to_string()));
    }

    let email = user
        .email
        .clone()
        .or(request.email)
        .ok_or_else(|| AppError::BadRequest("Email is required".to_string()))?;

    let now = now_rfc3339();
    let profile = UserProfile {
        user_id: user.user_id.clone(),
        email,
        real_name: request.real_name.trim().to_string(),
        father_name: request.father_name.trim().to_string(),
        whatsapp_number: request.whatsapp_number.trim().to_string(),
        batch_year: request.batch_year.trim().to_string(),
        class_or_degree: request.class_or_degree.trim().to_string(),
        medical_id_card_url: request.medical_id_card_url,
        profile_photo: None,
        bio: None,
        role: UserRole::User,
        plan: SubscriptionPlan::Free,
        badge: Badge::Bronze,
        verification_status: VerificationStatus::Pending,
        is_blocked: false,
        custom_daily_mcqs: None,
        custom_daily_flashcards: None,
        custom_daily_definitions: None,
        custom_daily_pdfs: None,
        created_at: now.clone(),
        updated_at: now,
        approved_at: None,
        approved_by: None,
    };

    state.db.upsert_profile(&profile).await?;

    tracing::info!(user_id = %profile.user_id, "Profile created, awaiting verification");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Fields a user may change on their own profile.
#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 500))]
    pub bio: Option<String>,
    #[validate(url)]
    pub profile_photo: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub whatsapp_number: Option<String>,
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>> {
    request.validate()?;

    let mut profile = state
        .db
        .get_profile(&user.user_id)
        .await?
        .ok_or(AppError::ProfileRequired)?;

    if let Some(bio) = request.bio {
        profile.bio = Some(bio.trim().to_string()).filter(|b| !b.is_empty());
    }
    if let Some(photo) = request.profile_photo {
        profile.profile_photo = Some(photo);
    }
    if let Some(number) = request.whatsapp_number {
        profile.whatsapp_number = number.trim().to_string();
    }
    profile.updated_at = now_rfc3339();

    state.db.upsert_profile(&profile).await?;

    Ok(Json(profile))
}

// ─── App Status ──────────────────────────────────────────────

/// Global availability and plan catalogue shown on the pricing page.
#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AppStatusResponse {
    pub app_enabled: bool,
    pub maintenance_message: Option<String>,
    pub plan_quotas: PlanTable<PlanQuotas>,
    pub plan_prices: PlanTable<u32>,
}

impl From<AppSettings> for AppStatusResponse {
    fn from(settings: AppSettings) -> Self {
        let maintenance_message = (!settings.app_enabled).then(|| settings.maintenance_text());
        Self {
            app_enabled: settings.app_enabled,
            maintenance_message,
            plan_quotas: settings.plan_quotas,
            plan_prices: settings.plan_prices,
        }
    }
}

async fn get_app_status(State(state): State<Arc<AppState>>) -> Result<Json<AppStatusResponse>> {
    let settings = state.db.get_app_settings().await?.unwrap_or_default();
    Ok(Json(settings.into()))
}
