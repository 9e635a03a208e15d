// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Community chat routes: rooms, membership, messages, reports and bans.
//!
//! Clients receive live updates from the datastore directly; the message
//! list supports `since` so they can also poll.

use crate::error::{AppError, Result};
use crate::models::{
    Community, CommunityBan, CommunityMember, CommunityMessage, CommunityRole, CommunityType,
    MessageReport, MessageType, ReportStatus, UserProfile, UserRole,
};
use crate::time_utils::{format_utc_rfc3339, normalize_rfc3339, now_rfc3339};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Extension, Json, Router,
};
use futures_util::future::try_join_all;
use serde::Deserialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub const DEFAULT_MESSAGE_LIMIT: u32 = 100;
pub const MAX_MESSAGE_LIMIT: u32 = 200;
pub const MAX_MESSAGE_CHARS: usize = 2000;
const COMMUNITY_LIST_LIMIT: u32 = 100;
const DEFAULT_REPORT_REASON: &str = "Reported by user";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/communities",
            get(list_communities).post(create_community),
        )
        .route("/api/communities/{id}/join", post(join_community))
        .route("/api/communities/{id}/leave", post(leave_community))
        .route("/api/communities/{id}/members", post(add_member))
        .route(
            "/api/communities/{id}/messages",
            get(list_messages).post(post_message),
        )
        .route("/api/communities/{id}/bans", post(ban_member))
        .route("/api/messages/{id}", delete(delete_message))
        .route("/api/messages/{id}/report", post(report_message))
}

// ─── Permissions ─────────────────────────────────────────────

/// Community admins, mini admins and app moderators manage a room.
pub fn can_moderate_community(profile: &UserProfile, membership: Option<&CommunityMember>) -> bool {
    profile.role.is_moderator() || membership.is_some_and(|m| m.role.can_moderate())
}

/// Authors may delete their own messages; moderators any message.
pub fn can_delete_message(
    message: &CommunityMessage,
    profile: &UserProfile,
    membership: Option<&CommunityMember>,
) -> bool {
    message.user_id == profile.user_id || can_moderate_community(profile, membership)
}

/// Private rooms are readable by members and app moderators only.
pub fn can_read(
    community: &Community,
    profile: &UserProfile,
    membership: Option<&CommunityMember>,
) -> bool {
    community.community_type == CommunityType::Public
        || membership.is_some()
        || profile.role.is_moderator()
}

pub fn clamp_limit(limit: Option<u32>) -> u32 {
    limit
        .unwrap_or(DEFAULT_MESSAGE_LIMIT)
        .clamp(1, MAX_MESSAGE_LIMIT)
}

async fn load_community(state: &AppState, community_id: &str) -> Result<Community> {
    state
        .db
        .get_community(community_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Community {} not found", community_id)))
}

async fn ensure_not_banned(state: &AppState, community_id: &str, user_id: &str) -> Result<()> {
    let Some(ban) = state.db.get_ban(community_id, user_id).await? else {
        return Ok(());
    };

    if ban.has_unreadable_expiry() {
        tracing::warn!(
            community_id,
            user_id,
            expires_at = ?ban.expires_at,
            "Ban expiry unreadable, enforcing ban"
        );
    }
    if ban.is_active(chrono::Utc::now()) {
        return Err(AppError::Forbidden(
            "You are banned from this community".to_string(),
        ));
    }
    Ok(())
}

/// Bans only reach people ranked below the moderator: app staff by app
/// role, everyone else by their role in the room.
pub fn check_can_ban(
    actor: &UserProfile,
    actor_membership: Option<&CommunityMember>,
    target_role: UserRole,
    target_membership: Option<&CommunityMember>,
) -> Result<()> {
    let outranked = if target_role.is_moderator() {
        actor.role > target_role
    } else if actor.role.is_moderator() {
        true
    } else {
        let actor_rank = actor_membership.map(|m| m.role).unwrap_or_default();
        let target_rank = target_membership.map(|m| m.role).unwrap_or_default();
        actor_rank > target_rank
    };

    if !outranked {
        return Err(AppError::Forbidden(
            "You cannot ban someone of equal or higher rank".to_string(),
        ));
    }
    Ok(())
}

// ─── Communities ─────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum ListScope {
    #[default]
    All,
    Joined,
}

#[derive(Debug, Deserialize)]
struct ListCommunitiesQuery {
    #[serde(default)]
    scope: ListScope,
}

/// Public rooms (newest first), or the rooms the caller belongs to.
async fn list_communities(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Query(query): Query<ListCommunitiesQuery>,
) -> Result<Json<Vec<Community>>> {
    match query.scope {
        ListScope::All => Ok(Json(
            state.db.list_public_communities(COMMUNITY_LIST_LIMIT).await?,
        )),
        ListScope::Joined => {
            let memberships = state.db.list_memberships_for_user(&profile.user_id).await?;
            let found = try_join_all(
                memberships
                    .iter()
                    .map(|m| state.db.get_community(&m.community_id)),
            )
            .await?;

            // Memberships of deleted rooms are skipped
            let mut communities: Vec<Community> = found.into_iter().flatten().collect();
            communities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(Json(communities))
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateCommunityRequest {
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub community_type: CommunityType,
}

/// Create a room; the creator becomes its admin.
async fn create_community(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(request): Json<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<Community>)> {
    request.validate()?;

    let name = request.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Community name is required".to_string()));
    }

    let now = now_rfc3339();
    let community = Community {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        description: request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        community_type: request.community_type,
        created_by: profile.user_id.clone(),
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    let creator = CommunityMember {
        community_id: community.id.clone(),
        user_id: profile.user_id.clone(),
        role: CommunityRole::Admin,
        joined_at: now,
    };

    state
        .db
        .create_community_atomic(&community, &creator)
        .await?;

    Ok((StatusCode::CREATED, Json(community)))
}

/// Join a public room.
async fn join_community(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
) -> Result<(StatusCode, Json<CommunityMember>)> {
    let community = load_community(&state, &community_id).await?;

    if community.community_type != CommunityType::Public {
        return Err(AppError::Forbidden(
            "Private communities can only be joined by invitation".to_string(),
        ));
    }
    ensure_not_banned(&state, &community_id, &profile.user_id).await?;

    if state
        .db
        .get_member(&community_id, &profile.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Already a member".to_string()));
    }

    let member = CommunityMember {
        community_id,
        user_id: profile.user_id.clone(),
        role: CommunityRole::Member,
        joined_at: now_rfc3339(),
    };
    state.db.upsert_member(&member).await?;

    Ok((StatusCode::CREATED, Json(member)))
}

async fn leave_community(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
) -> Result<StatusCode> {
    if state
        .db
        .get_member(&community_id, &profile.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("Not a member".to_string()));
    }

    state
        .db
        .remove_member(&community_id, &profile.user_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AddMemberRequest {
    pub user_id: String,
}

/// Add someone to a room. This is the only way into private rooms.
async fn add_member(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
    Json(request): Json<AddMemberRequest>,
) -> Result<(StatusCode, Json<CommunityMember>)> {
    load_community(&state, &community_id).await?;

    let membership = state.db.get_member(&community_id, &profile.user_id).await?;
    if !can_moderate_community(&profile, membership.as_ref()) {
        return Err(AppError::Forbidden(
            "Only community admins can add members".to_string(),
        ));
    }

    if state.db.get_profile(&request.user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", request.user_id)));
    }
    ensure_not_banned(&state, &community_id, &request.user_id).await?;

    if state
        .db
        .get_member(&community_id, &request.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Already a member".to_string()));
    }

    let member = CommunityMember {
        community_id,
        user_id: request.user_id,
        role: CommunityRole::Member,
        joined_at: now_rfc3339(),
    };
    state.db.upsert_member(&member).await?;

    tracing::info!(
        community_id = %member.community_id,
        user_id = %member.user_id,
        added_by = %profile.user_id,
        "Member added"
    );

    Ok((StatusCode::CREATED, Json(member)))
}

// ─── Messages ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessagesQuery {
    /// Only messages created after this RFC3339 time
    since: Option<String>,
    limit: Option<u32>,
}

/// Messages in chronological order.
async fn list_messages(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<CommunityMessage>>> {
    let community = load_community(&state, &community_id).await?;
    let membership = state.db.get_member(&community_id, &profile.user_id).await?;

    if !can_read(&community, &profile, membership.as_ref()) {
        return Err(AppError::Forbidden(
            "Only members can read this community".to_string(),
        ));
    }

    let since = match query.since.as_deref() {
        Some(raw) => Some(normalize_rfc3339(raw).ok_or_else(|| {
            AppError::BadRequest(format!("Invalid 'since' timestamp: {}", raw))
        })?),
        None => None,
    };

    let messages = state
        .db
        .list_messages(&community_id, since.as_deref(), clamp_limit(query.limit))
        .await?;

    Ok(Json(messages))
}

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PostMessageRequest {
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    #[validate(url)]
    #[serde(default)]
    pub voice_url: Option<String>,
}

impl PostMessageRequest {
    /// Normalized `(content, voice_url)` for the message type.
    pub fn into_body(self) -> Result<(MessageType, Option<String>, Option<String>)> {
        self.validate()?;

        match self.message_type {
            MessageType::Text => {
                let content = self.content.as_deref().map(str::trim).unwrap_or_default();
                let chars = content.chars().count();
                if chars == 0 {
                    return Err(AppError::BadRequest("Message cannot be empty".to_string()));
                }
                if chars > MAX_MESSAGE_CHARS {
                    return Err(AppError::BadRequest(format!(
                        "Message is too long (max {} characters)",
                        MAX_MESSAGE_CHARS
                    )));
                }
                Ok((MessageType::Text, Some(content.to_string()), None))
            }
            MessageType::Voice => {
                let url = self
                    .voice_url
                    .filter(|u| !u.trim().is_empty())
                    .ok_or_else(|| {
                        AppError::BadRequest("Voice messages need a voice_url".to_string())
                    })?;
                Ok((MessageType::Voice, None, Some(url)))
            }
        }
    }
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<(StatusCode, Json<CommunityMessage>)> {
    let (message_type, content, voice_url) = request.into_body()?;

    load_community(&state, &community_id).await?;
    ensure_not_banned(&state, &community_id, &profile.user_id).await?;

    if state
        .db
        .get_member(&community_id, &profile.user_id)
        .await?
        .is_none()
    {
        return Err(AppError::Forbidden(
            "Join the community to post messages".to_string(),
        ));
    }

    let message = CommunityMessage {
        id: uuid::Uuid::new_v4().to_string(),
        community_id,
        user_id: profile.user_id.clone(),
        message_type,
        content,
        voice_url,
        created_at: now_rfc3339(),
    };
    state.db.add_message(&message).await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(message_id): Path<String>,
) -> Result<StatusCode> {
    let message = state
        .db
        .get_message(&message_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

    let membership = state
        .db
        .get_member(&message.community_id, &profile.user_id)
        .await?;
    if !can_delete_message(&message, &profile, membership.as_ref()) {
        return Err(AppError::Forbidden(
            "You cannot delete this message".to_string(),
        ));
    }

    state.db.delete_message(&message_id).await?;

    if message.user_id != profile.user_id {
        tracing::info!(
            message_id = %message_id,
            community_id = %message.community_id,
            deleted_by = %profile.user_id,
            "Message removed by moderator"
        );
    }

    Ok(StatusCode::NO_CONTENT)
}

// ─── Reports ─────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ReportMessageRequest {
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: Option<String>,
}

async fn report_message(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(message_id): Path<String>,
    Json(request): Json<ReportMessageRequest>,
) -> Result<(StatusCode, Json<MessageReport>)> {
    request.validate()?;

    let message = state
        .db
        .get_message(&message_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message_id)))?;

    let report = MessageReport {
        id: uuid::Uuid::new_v4().to_string(),
        message_id,
        community_id: message.community_id,
        reported_by: profile.user_id.clone(),
        reason: request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_REPORT_REASON.to_string()),
        status: ReportStatus::Pending,
        created_at: now_rfc3339(),
    };
    state.db.upsert_report(&report).await?;

    tracing::info!(
        report_id = %report.id,
        message_id = %report.message_id,
        "Message reported"
    );

    Ok((StatusCode::CREATED, Json(report)))
}

// ─── Bans ────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Validate)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct BanRequest {
    pub user_id: String,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub reason: Option<String>,
    /// Omit for a permanent ban
    #[validate(range(min = 1, max = 8760))]
    #[serde(default)]
    pub duration_hours: Option<u32>,
}

/// Ban a user from a room; their membership is removed.
async fn ban_member(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Path(community_id): Path<String>,
    Json(request): Json<BanRequest>,
) -> Result<(StatusCode, Json<CommunityBan>)> {
    request.validate()?;
    load_community(&state, &community_id).await?;

    let membership = state.db.get_member(&community_id, &profile.user_id).await?;
    if !can_moderate_community(&profile, membership.as_ref()) {
        return Err(AppError::Forbidden(
            "Only community admins can ban members".to_string(),
        ));
    }
    if request.user_id == profile.user_id {
        return Err(AppError::BadRequest("You cannot ban yourself".to_string()));
    }

    let target_role = state
        .db
        .get_profile(&request.user_id)
        .await?
        .map(|p| p.role)
        .unwrap_or_default();
    let target_membership = state.db.get_member(&community_id, &request.user_id).await?;
    check_can_ban(
        &profile,
        membership.as_ref(),
        target_role,
        target_membership.as_ref(),
    )?;

    let now = chrono::Utc::now();
    let ban = CommunityBan {
        community_id,
        user_id: request.user_id,
        banned_by: profile.user_id.clone(),
        reason: request
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty()),
        banned_at: format_utc_rfc3339(now),
        expires_at: request
            .duration_hours
            .map(|h| format_utc_rfc3339(now + chrono::Duration::hours(i64::from(h)))),
    };
    state.db.ban_member_atomic(&ban).await?;

    tracing::info!(
        community_id = %ban.community_id,
        user_id = %ban.user_id,
        banned_by = %ban.banned_by,
        expires_at = ?ban.expires_at,
        "Member banned"
    );

    Ok((StatusCode::CREATED, Json(ban)))
}
