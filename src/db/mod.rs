//! Database layer (Firestore).

pub mod firestore;

pub use firestore::FirestoreDb;

/// Collection names as constants.
pub mod collections {
    pub const PROFILES: &str = "profiles";
    /// Per-user per-day counters (keyed `{user_id}_{date}`)
    pub const DAILY_USAGE: &str = "daily_usage";
    pub const APP_SETTINGS: &str = "app_settings";
    pub const ADMIN_ACTIONS: &str = "admin_actions";
    pub const COMMUNITIES: &str = "communities";
    /// Membership join collection (keyed `{community_id}_{user_id}`)
    pub const COMMUNITY_MEMBERS: &str = "community_members";
    pub const COMMUNITY_MESSAGES: &str = "community_messages";
    pub const COMMUNITY_BANS: &str = "community_bans";
    pub const MESSAGE_REPORTS: &str = "message_reports";

    /// Single document holding the global settings.
    pub const SETTINGS_DOC_ID: &str = "global";
}
