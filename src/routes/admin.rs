// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin console routes.
//!
//! [`routes`] require admin or super_admin, [`moderation_routes`] moderator
//! or above; the middleware is applied in routes/mod.rs. Every mutation is
//! recorded in the audit log.

use crate::error::{AppError, Result};
use crate::models::{
    AdminAction, AdminActionType, AppSettings, MessageReport, PlanQuotas, PlanTable,
    ReportStatus, SubscriptionPlan, UserProfile, UserRole, VerificationStatus,
};
use crate::time_utils::now_rfc3339;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

const DEFAULT_LIST_LIMIT: u32 = 100;
const MAX_LIST_LIMIT: u32 = 500;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/verifications", get(list_verifications))
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/{id}/approve", post(approve_user))
        .route("/api/admin/users/{id}/reject", post(reject_user))
        .route("/api/admin/users/{id}/block", post(block_user))
        .route("/api/admin/users/{id}/role", put(set_role))
        .route("/api/admin/users/{id}/plan", put(set_plan))
        .route("/api/admin/users/{id}/quotas", put(set_quotas))
        .route("/api/admin/actions", get(list_actions))
        .route("/api/admin/settings", get(get_settings).put(update_settings))
}

pub fn moderation_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/admin/reports", get(list_reports))
        .route("/api/admin/reports/{id}", put(update_report))
}

// ─── Helpers ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct LimitQuery {
    limit: Option<u32>,
}

fn list_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Granting or revoking admin rights is reserved to super admins, and
/// nobody changes their own role.
pub fn check_role_change(
    actor: &UserProfile,
    target: &UserProfile,
    new_role: UserRole,
) -> Result<()> {
    if actor.user_id == target.user_id {
        return Err(AppError::BadRequest(
            "You cannot change your own role".to_string(),
        ));
    }
    if (new_role.is_admin() || target.role.is_admin()) && actor.role != UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Only a super admin can grant or revoke admin roles".to_string(),
        ));
    }
    Ok(())
}

/// Admins may not act on themselves or on other admins unless they are
/// a super admin.
pub fn check_can_manage(actor: &UserProfile, target: &UserProfile) -> Result<()> {
    if actor.user_id == target.user_id {
        return Err(AppError::BadRequest(
            "You cannot perform this action on your own account".to_string(),
        ));
    }
    if target.role.is_admin() && actor.role != UserRole::SuperAdmin {
        return Err(AppError::Forbidden(
            "Only a super admin can manage admin accounts".to_string(),
        ));
    }
    Ok(())
}

async fn load_user(state: &AppState, user_id: &str) -> Result<UserProfile> {
    state
        .db
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Audit entry for a change made by `admin`.
fn admin_action(
    admin: &UserProfile,
    action_type: AdminActionType,
    target_user_id: Option<&str>,
    details: serde_json::Value,
) -> AdminAction {
    AdminAction {
        id: uuid::Uuid::new_v4().to_string(),
        admin_id: admin.user_id.clone(),
        admin_email: admin.email.clone(),
        action_type,
        target_user_id: target_user_id.map(str::to_string),
        details,
        timestamp: now_rfc3339(),
    }
}

fn log_action(action: &AdminAction) {
    tracing::info!(
        admin_id = %action.admin_id,
        action = %action.action_type,
        target = ?action.target_user_id,
        "Admin action"
    );
}

/// Save a changed profile and its audit entry together.
async fn save_profile(
    state: &AppState,
    admin: &UserProfile,
    user: &UserProfile,
    action_type: AdminActionType,
    details: serde_json::Value,
) -> Result<()> {
    let action = admin_action(admin, action_type, Some(&user.user_id), details);
    state.db.upsert_profile_audited(user, &action).await?;
    log_action(&action);
    Ok(())
}

// ─── Verification ────────────────────────────────────────────

/// Pending sign-ups, oldest first.
async fn list_verifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(Json(
        state
            .db
            .list_profiles_by_status(VerificationStatus::Pending, list_limit(query.limit))
            .await?,
    ))
}

async fn approve_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>> {
    let mut user = load_user(&state, &user_id).await?;
    let previous = user.verification_status;

    let now = now_rfc3339();
    user.verification_status = VerificationStatus::Approved;
    user.approved_at = Some(now.clone());
    user.approved_by = Some(admin.user_id.clone());
    user.updated_at = now;

    save_profile(
        &state,
        &admin,
        &user,
        AdminActionType::UserApproved,
        json!({ "previous_status": previous.as_str() }),
    )
    .await?;

    Ok(Json(user))
}

async fn reject_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>> {
    let mut user = load_user(&state, &user_id).await?;
    check_can_manage(&admin, &user)?;
    let previous = user.verification_status;

    user.verification_status = VerificationStatus::Rejected;
    user.approved_at = None;
    user.approved_by = None;
    user.updated_at = now_rfc3339();

    save_profile(
        &state,
        &admin,
        &user,
        AdminActionType::UserRejected,
        json!({ "previous_status": previous.as_str() }),
    )
    .await?;

    Ok(Json(user))
}

// ─── User Management ─────────────────────────────────────────

/// All profiles, newest first.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<UserProfile>>> {
    Ok(Json(state.db.list_profiles(list_limit(query.limit)).await?))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BlockRequest {
    pub blocked: bool,
}

async fn block_user(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
    Json(request): Json<BlockRequest>,
) -> Result<Json<UserProfile>> {
    let mut user = load_user(&state, &user_id).await?;
    check_can_manage(&admin, &user)?;

    user.is_blocked = request.blocked;
    user.updated_at = now_rfc3339();

    let action_type = if request.blocked {
        AdminActionType::UserBlocked
    } else {
        AdminActionType::UserUnblocked
    };

    save_profile(&state, &admin, &user, action_type, json!({})).await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RoleRequest {
    pub role: UserRole,
}

async fn set_role(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
    Json(request): Json<RoleRequest>,
) -> Result<Json<UserProfile>> {
    let mut user = load_user(&state, &user_id).await?;
    check_role_change(&admin, &user, request.role)?;

    let previous = user.role;
    user.role = request.role;
    user.updated_at = now_rfc3339();

    save_profile(
        &state,
        &admin,
        &user,
        AdminActionType::RoleChanged,
        json!({ "from": previous, "to": request.role }),
    )
    .await?;

    Ok(Json(user))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanRequest {
    pub plan: SubscriptionPlan,
}

/// Change a user's plan; the badge follows.
async fn set_plan(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<UserProfile>> {
    let mut user = load_user(&state, &user_id).await?;

    let previous = user.plan;
    user.set_plan(request.plan);
    user.updated_at = now_rfc3339();

    save_profile(
        &state,
        &admin,
        &user,
        AdminActionType::PlanChanged,
        json!({ "from": previous, "to": request.plan, "badge": user.badge }),
    )
    .await?;

    Ok(Json(user))
}

/// Per-user daily limits. `null` or a missing field clears that override.
#[derive(Debug, Default, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuotaOverrideRequest {
    #[validate(range(max = 100_000))]
    #[serde(default)]
    pub mcqs: Option<u32>,
    #[validate(range(max = 100_000))]
    #[serde(default)]
    pub flashcards: Option<u32>,
    #[validate(range(max = 100_000))]
    #[serde(default)]
    pub definitions: Option<u32>,
    #[validate(range(max = 100_000))]
    #[serde(default)]
    pub pdfs: Option<u32>,
}

async fn set_quotas(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Path(user_id): Path<String>,
    Json(request): Json<QuotaOverrideRequest>,
) -> Result<Json<UserProfile>> {
    request.validate()?;
    let mut user = load_user(&state, &user_id).await?;

    user.custom_daily_mcqs = request.mcqs;
    user.custom_daily_flashcards = request.flashcards;
    user.custom_daily_definitions = request.definitions;
    user.custom_daily_pdfs = request.pdfs;
    user.updated_at = now_rfc3339();

    save_profile(
        &state,
        &admin,
        &user,
        AdminActionType::QuotasChanged,
        json!({
            "mcqs": request.mcqs,
            "flashcards": request.flashcards,
            "definitions": request.definitions,
            "pdfs": request.pdfs,
        }),
    )
    .await?;

    Ok(Json(user))
}

// ─── Audit Log ───────────────────────────────────────────────

async fn list_actions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<AdminAction>>> {
    Ok(Json(
        state
            .db
            .list_admin_actions(list_limit(query.limit))
            .await?,
    ))
}

// ─── Settings ────────────────────────────────────────────────

async fn get_settings(State(state): State<Arc<AppState>>) -> Result<Json<AppSettings>> {
    Ok(Json(state.db.get_app_settings().await?.unwrap_or_default()))
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UpdateSettingsRequest {
    pub app_enabled: bool,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub maintenance_message: Option<String>,
    pub plan_quotas: PlanTable<PlanQuotas>,
    pub plan_prices: PlanTable<u32>,
}

/// Replace the global settings document.
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(admin): Extension<UserProfile>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<AppSettings>> {
    request.validate()?;

    let previous = state.db.get_app_settings().await?.unwrap_or_default();
    let settings = AppSettings {
        app_enabled: request.app_enabled,
        maintenance_message: request
            .maintenance_message
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty()),
        plan_quotas: request.plan_quotas,
        plan_prices: request.plan_prices,
        updated_at: Some(now_rfc3339()),
        updated_by: Some(admin.user_id.clone()),
    };

    let action = admin_action(
        &admin,
        AdminActionType::SettingsChanged,
        None,
        json!({
            "app_enabled": settings.app_enabled,
            "plan_quotas": settings.plan_quotas,
            "plan_prices": settings.plan_prices,
        }),
    );
    state.db.set_app_settings_audited(&settings, &action).await?;
    log_action(&action);

    if previous.app_enabled != settings.app_enabled {
        tracing::warn!(
            app_enabled = settings.app_enabled,
            admin_id = %admin.user_id,
            "Maintenance mode toggled"
        );
    }

    Ok(Json(settings))
}

// ─── Reports ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ReportsQuery {
    status: Option<ReportStatus>,
    limit: Option<u32>,
}

async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReportsQuery>,
) -> Result<Json<Vec<MessageReport>>> {
    Ok(Json(
        state
            .db
            .list_reports(query.status, list_limit(query.limit))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReportStatusRequest {
    pub status: ReportStatus,
}

async fn update_report(
    State(state): State<Arc<AppState>>,
    Extension(moderator): Extension<UserProfile>,
    Path(report_id): Path<String>,
    Json(request): Json<ReportStatusRequest>,
) -> Result<Json<MessageReport>> {
    let mut report = state
        .db
        .get_report(&report_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Report {} not found", report_id)))?;

    let previous = report.status;
    report.status = request.status;

    let action = admin_action(
        &moderator,
        AdminActionType::ReportUpdated,
        None,
        json!({
            "report_id": report.id,
            "message_id": report.message_id,
            "from": previous.as_str(),
            "to": request.status.as_str(),
        }),
    );
    state.db.upsert_report_audited(&report, &action).await?;
    log_action(&action);

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user_id: &str, role: UserRole) -> UserProfile {
        let mut profile: UserProfile = serde_json::from_value(json!({
            "user_id": user_id,
            "email": format!("{}@example.com", user_id),
            "real_name": "Test",
            "father_name": "Parent",
            "whatsapp_number": "0300",
            "batch_year": "2024",
            "class_or_degree": "MBBS",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        }))
        .unwrap();
        profile.role = role;
        profile
    }

    #[test]
    fn test_only_super_admin_grants_admin() {
        let admin = profile("a", UserRole::Admin);
        let super_admin = profile("s", UserRole::SuperAdmin);
        let user = profile("u", UserRole::User);

        assert!(check_role_change(&admin, &user, UserRole::Moderator).is_ok());
        assert!(matches!(
            check_role_change(&admin, &user, UserRole::Admin),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            check_role_change(&admin, &user, UserRole::SuperAdmin),
            Err(AppError::Forbidden(_))
        ));
        assert!(check_role_change(&super_admin, &user, UserRole::Admin).is_ok());
    }

    #[test]
    fn test_only_super_admin_revokes_admin() {
        let admin = profile("a", UserRole::Admin);
        let other_admin = profile("b", UserRole::Admin);
        let super_admin = profile("s", UserRole::SuperAdmin);

        assert!(check_role_change(&admin, &other_admin, UserRole::User).is_err());
        assert!(check_role_change(&super_admin, &other_admin, UserRole::User).is_ok());
    }

    #[test]
    fn test_no_self_role_change() {
        let super_admin = profile("s", UserRole::SuperAdmin);
        assert!(matches!(
            check_role_change(&super_admin, &super_admin, UserRole::User),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn test_manage_permissions() {
        let admin = profile("a", UserRole::Admin);
        let other_admin = profile("b", UserRole::Admin);
        let super_admin = profile("s", UserRole::SuperAdmin);
        let user = profile("u", UserRole::User);

        assert!(check_can_manage(&admin, &user).is_ok());
        assert!(check_can_manage(&admin, &admin).is_err());
        assert!(check_can_manage(&admin, &other_admin).is_err());
        assert!(check_can_manage(&super_admin, &other_admin).is_ok());
    }

    #[test]
    fn test_admin_action_records_actor_and_target() {
        let admin = profile("a", UserRole::Admin);
        let action = admin_action(
            &admin,
            AdminActionType::PlanChanged,
            Some("u"),
            json!({ "to": "premium" }),
        );

        assert_eq!(action.admin_id, "a");
        assert_eq!(action.admin_email, "a@example.com");
        assert_eq!(action.target_user_id.as_deref(), Some("u"));
        assert_eq!(action.details["to"], "premium");
        assert!(uuid::Uuid::parse_str(&action.id).is_ok());

        let other = admin_action(&admin, AdminActionType::PlanChanged, None, json!({}));
        assert_ne!(action.id, other.id);
        assert!(other.target_user_id.is_none());
    }

    #[test]
    fn test_list_limit_bounds() {
        assert_eq!(list_limit(None), DEFAULT_LIST_LIMIT);
        assert_eq!(list_limit(Some(0)), 1);
        assert_eq!(list_limit(Some(5_000)), MAX_LIST_LIMIT);
    }

    #[test]
    fn test_quota_override_validation() {
        let ok = QuotaOverrideRequest {
            mcqs: Some(500),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let too_big = QuotaOverrideRequest {
            pdfs: Some(1_000_000),
            ..Default::default()
        };
        assert!(too_big.validate().is_err());
    }
}
