//! Admin audit log and global application settings.

use crate::models::quota::{PlanQuotas, PlanTable};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Kinds of audited admin operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum AdminActionType {
    UserApproved,
    UserRejected,
    UserBlocked,
    UserUnblocked,
    RoleChanged,
    PlanChanged,
    QuotasChanged,
    SettingsChanged,
    ReportUpdated,
}

impl fmt::Display for AdminActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdminActionType::UserApproved => "user_approved",
            AdminActionType::UserRejected => "user_rejected",
            AdminActionType::UserBlocked => "user_blocked",
            AdminActionType::UserUnblocked => "user_unblocked",
            AdminActionType::RoleChanged => "role_changed",
            AdminActionType::PlanChanged => "plan_changed",
            AdminActionType::QuotasChanged => "quotas_changed",
            AdminActionType::SettingsChanged => "settings_changed",
            AdminActionType::ReportUpdated => "report_updated",
        };
        f.write_str(s)
    }
}

/// Audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AdminAction {
    pub id: String,
    pub admin_id: String,
    pub admin_email: String,
    pub action_type: AdminActionType,
    #[serde(default)]
    pub target_user_id: Option<String>,
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    #[serde(default)]
    pub details: serde_json::Value,
    /// RFC3339
    pub timestamp: String,
}

/// Global settings document (`app_settings/global`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AppSettings {
    /// When false, non-admins get a maintenance response on gated routes
    pub app_enabled: bool,
    #[serde(default)]
    pub maintenance_message: Option<String>,
    pub plan_quotas: PlanTable<PlanQuotas>,
    /// Monthly price per plan, in the local currency's minor unit
    pub plan_prices: PlanTable<u32>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            app_enabled: true,
            maintenance_message: None,
            plan_quotas: PlanQuotas::default_table(),
            plan_prices: PlanTable {
                free: 0,
                basic: 500,
                premium: 1500,
            },
            updated_at: None,
            updated_by: None,
        }
    }
}

impl AppSettings {
    /// Message shown while the app is disabled.
    pub fn maintenance_text(&self) -> String {
        self.maintenance_message
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| {
                "The app is under maintenance. Please try again later.".to_string()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_enabled() {
        let settings = AppSettings::default();
        assert!(settings.app_enabled);
        assert_eq!(settings.plan_quotas.free.pdfs, 2);
    }

    #[test]
    fn test_maintenance_text_fallback() {
        let mut settings = AppSettings::default();
        assert!(settings.maintenance_text().contains("maintenance"));
        settings.maintenance_message = Some("Back at 5pm".to_string());
        assert_eq!(settings.maintenance_text(), "Back at 5pm");
    }

    #[test]
    fn test_action_type_wire_format() {
        let json = serde_json::to_string(&AdminActionType::PlanChanged).unwrap();
        assert_eq!(json, "\"plan_changed\"");
        assert_eq!(AdminActionType::UserUnblocked.to_string(), "user_unblocked");
    }
}
