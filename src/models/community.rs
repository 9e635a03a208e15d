//! Community chat models: rooms, memberships, messages, reports and bans.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CommunityType {
    #[default]
    Public,
    Private,
}

/// Role inside a single community.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum CommunityRole {
    #[default]
    Member,
    MiniAdmin,
    Admin,
}

impl CommunityRole {
    /// Can manage members, bans and other people's messages.
    pub fn can_moderate(self) -> bool {
        self >= CommunityRole::MiniAdmin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum MessageType {
    #[default]
    Text,
    Voice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ReportStatus {
    #[default]
    Pending,
    Reviewed,
    Resolved,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Reviewed => "reviewed",
            ReportStatus::Resolved => "resolved",
        }
    }
}

/// Chat room stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Community {
    /// Document ID
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub community_type: CommunityType,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Membership record, keyed `{community_id}_{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommunityMember {
    pub community_id: String,
    pub user_id: String,
    #[serde(default)]
    pub role: CommunityRole,
    pub joined_at: String,
}

impl CommunityMember {
    pub fn document_id(community_id: &str, user_id: &str) -> String {
        format!(
            "{}_{}",
            urlencoding::encode(community_id),
            urlencoding::encode(user_id)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommunityMessage {
    pub id: String,
    pub community_id: String,
    pub user_id: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub content: Option<String>,
    /// Public URL of a voice note in file storage
    #[serde(default)]
    pub voice_url: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct MessageReport {
    pub id: String,
    pub message_id: String,
    pub community_id: String,
    pub reported_by: String,
    pub reason: String,
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: String,
}

/// Ban record, keyed `{community_id}_{user_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CommunityBan {
    pub community_id: String,
    pub user_id: String,
    pub banned_by: String,
    #[serde(default)]
    pub reason: Option<String>,
    pub banned_at: String,
    /// None means permanent
    #[serde(default)]
    pub expires_at: Option<String>,
}

impl CommunityBan {
    /// Parsed expiry. None for permanent bans and for unreadable values.
    pub fn expiry(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.expires_at
            .as_deref()
            .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
            .map(|expiry| expiry.with_timezone(&chrono::Utc))
    }

    /// A stored expiry that cannot be parsed.
    pub fn has_unreadable_expiry(&self) -> bool {
        self.expires_at.is_some() && self.expiry().is_none()
    }

    /// Whether the ban still applies at `now`. Bans with an unreadable
    /// expiry stay in force.
    pub fn is_active(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.expiry().map_or(true, |expiry| expiry > now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ban(expires_at: Option<&str>) -> CommunityBan {
        CommunityBan {
            community_id: "c1".to_string(),
            user_id: "u1".to_string(),
            banned_by: "mod".to_string(),
            reason: None,
            banned_at: "2026-10-01T00:00:00Z".to_string(),
            expires_at: expires_at.map(str::to_string),
        }
    }

    #[test]
    fn test_ban_expiry() {
        let now = chrono::Utc.with_ymd_and_hms(2026, 10, 19, 12, 0, 0).unwrap();
        assert!(ban(None).is_active(now));
        assert!(ban(Some("2026-10-20T00:00:00Z")).is_active(now));
        assert!(!ban(Some("2026-10-19T11:59:59Z")).is_active(now));
        assert!(ban(Some("garbage")).is_active(now));
    }

    #[test]
    fn test_unreadable_expiry_detected() {
        assert!(ban(Some("next tuesday")).has_unreadable_expiry());
        assert!(!ban(Some("2026-10-20T00:00:00Z")).has_unreadable_expiry());
        assert!(!ban(None).has_unreadable_expiry());
    }

    #[test]
    fn test_community_roles() {
        assert!(CommunityRole::Admin.can_moderate());
        assert!(CommunityRole::MiniAdmin.can_moderate());
        assert!(!CommunityRole::Member.can_moderate());
    }

    #[test]
    fn test_community_type_field_name() {
        let community = Community {
            id: "c1".to_string(),
            name: "Anatomy".to_string(),
            description: None,
            community_type: CommunityType::Private,
            created_by: "u1".to_string(),
            created_at: "2026-10-19T00:00:00Z".to_string(),
            updated_at: "2026-10-19T00:00:00Z".to_string(),
        };
        let value = serde_json::to_value(&community).unwrap();
        assert_eq!(value["type"], "private");
    }
}
