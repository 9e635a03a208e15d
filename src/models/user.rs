//! User profile model for storage and API.

use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Application-wide role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Admin console access.
    pub fn is_admin(self) -> bool {
        matches!(self, UserRole::Admin | UserRole::SuperAdmin)
    }

    /// Moderation of community content.
    pub fn is_moderator(self) -> bool {
        self >= UserRole::Moderator
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserRole::User => "user",
            UserRole::Moderator => "moderator",
            UserRole::Admin => "admin",
            UserRole::SuperAdmin => "super_admin",
        };
        f.write_str(s)
    }
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SubscriptionPlan {
    #[default]
    Free,
    Basic,
    Premium,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Free,
        SubscriptionPlan::Basic,
        SubscriptionPlan::Premium,
    ];

    /// Badge shown next to users on this plan.
    pub fn badge(self) -> Badge {
        match self {
            SubscriptionPlan::Free => Badge::Bronze,
            SubscriptionPlan::Basic => Badge::Diamond,
            SubscriptionPlan::Premium => Badge::GoldStar,
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Basic => "basic",
            SubscriptionPlan::Premium => "premium",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum Badge {
    #[default]
    Bronze,
    Diamond,
    GoldStar,
}

/// Admin approval state of a signed-up user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum VerificationStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    /// Auth provider user ID (also used as document ID)
    pub user_id: String,
    pub email: String,
    pub real_name: String,
    pub father_name: String,
    pub whatsapp_number: String,
    pub batch_year: String,
    pub class_or_degree: String,
    /// Public URL of the uploaded ID card (file storage is external)
    #[serde(default)]
    pub medical_id_card_url: Option<String>,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,

    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub plan: SubscriptionPlan,
    #[serde(default)]
    pub badge: Badge,

    #[serde(default)]
    pub verification_status: VerificationStatus,
    #[serde(default)]
    pub is_blocked: bool,

    // Per-user quota overrides set by admins
    #[serde(default)]
    pub custom_daily_mcqs: Option<u32>,
    #[serde(default)]
    pub custom_daily_flashcards: Option<u32>,
    #[serde(default)]
    pub custom_daily_definitions: Option<u32>,
    #[serde(default)]
    pub custom_daily_pdfs: Option<u32>,

    /// When the profile was created (RFC3339)
    pub created_at: String,
    /// Last modification (RFC3339)
    pub updated_at: String,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub approved_by: Option<String>,
}

impl UserProfile {
    /// Approved and not blocked.
    pub fn can_use_app(&self) -> bool {
        self.verification_status == VerificationStatus::Approved && !self.is_blocked
    }

    /// Switch plan and keep the badge in sync.
    pub fn set_plan(&mut self, plan: SubscriptionPlan) {
        self.plan = plan;
        self.badge = plan.badge();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(UserRole::SuperAdmin.is_admin());
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::Moderator.is_admin());
        assert!(UserRole::Moderator.is_moderator());
        assert!(UserRole::Admin.is_moderator());
        assert!(!UserRole::User.is_moderator());
    }

    #[test]
    fn test_plan_badges() {
        assert_eq!(SubscriptionPlan::Free.badge(), Badge::Bronze);
        assert_eq!(SubscriptionPlan::Basic.badge(), Badge::Diamond);
        assert_eq!(SubscriptionPlan::Premium.badge(), Badge::GoldStar);
    }

    #[test]
    fn test_role_wire_format() {
        let json = serde_json::to_string(&UserRole::SuperAdmin).unwrap();
        assert_eq!(json, "\"super_admin\"");
        let badge: Badge = serde_json::from_str("\"gold_star\"").unwrap();
        assert_eq!(badge, Badge::GoldStar);
    }
}
