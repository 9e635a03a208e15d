//! Daily usage counters and plan quota limits.
//!
//! One `daily_usage` document per user per UTC day, keyed
//! `{user_id}_{YYYY-MM-DD}`. Limits come from the plan table in
//! [`crate::models::AppSettings`] unless an admin set a per-user override.

use crate::models::user::{SubscriptionPlan, UserProfile};
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Quota-tracked content kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum QuotaKind {
    Mcqs,
    Flashcards,
    Definitions,
    Pdfs,
    TrueFalse,
}

impl QuotaKind {
    pub const ALL: [QuotaKind; 5] = [
        QuotaKind::Mcqs,
        QuotaKind::Flashcards,
        QuotaKind::Definitions,
        QuotaKind::Pdfs,
        QuotaKind::TrueFalse,
    ];
}

impl fmt::Display for QuotaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuotaKind::Mcqs => "mcqs",
            QuotaKind::Flashcards => "flashcards",
            QuotaKind::Definitions => "definitions",
            QuotaKind::Pdfs => "pdfs",
            QuotaKind::TrueFalse => "true_false",
        };
        f.write_str(s)
    }
}

/// Daily limits for one plan (or one user after overrides).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanQuotas {
    pub mcqs: u32,
    pub flashcards: u32,
    pub definitions: u32,
    pub pdfs: u32,
    pub true_false: u32,
}

impl PlanQuotas {
    /// Built-in limits used until an admin edits the settings.
    pub fn default_for(plan: SubscriptionPlan) -> Self {
        match plan {
            SubscriptionPlan::Free => Self {
                mcqs: 30,
                flashcards: 30,
                definitions: 30,
                pdfs: 2,
                true_false: 30,
            },
            SubscriptionPlan::Basic => Self {
                mcqs: 60,
                flashcards: 60,
                definitions: 60,
                pdfs: 10,
                true_false: 60,
            },
            SubscriptionPlan::Premium => Self {
                mcqs: 200,
                flashcards: 200,
                definitions: 200,
                pdfs: 999,
                true_false: 200,
            },
        }
    }

    /// Default table for all plans.
    pub fn default_table() -> PlanTable<PlanQuotas> {
        PlanTable {
            free: Self::default_for(SubscriptionPlan::Free),
            basic: Self::default_for(SubscriptionPlan::Basic),
            premium: Self::default_for(SubscriptionPlan::Premium),
        }
    }

    /// Effective limits for a user: custom overrides win over the plan table.
    ///
    /// True/false has no per-user override.
    pub fn for_profile(profile: &UserProfile, table: &PlanTable<PlanQuotas>) -> Self {
        let base = *table.get(profile.plan);

        Self {
            mcqs: profile.custom_daily_mcqs.unwrap_or(base.mcqs),
            flashcards: profile.custom_daily_flashcards.unwrap_or(base.flashcards),
            definitions: profile.custom_daily_definitions.unwrap_or(base.definitions),
            pdfs: profile.custom_daily_pdfs.unwrap_or(base.pdfs),
            true_false: base.true_false,
        }
    }

    pub fn limit(&self, kind: QuotaKind) -> u32 {
        match kind {
            QuotaKind::Mcqs => self.mcqs,
            QuotaKind::Flashcards => self.flashcards,
            QuotaKind::Definitions => self.definitions,
            QuotaKind::Pdfs => self.pdfs,
            QuotaKind::TrueFalse => self.true_false,
        }
    }
}

/// One value per subscription plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct PlanTable<T> {
    pub free: T,
    pub basic: T,
    pub premium: T,
}

impl<T> PlanTable<T> {
    pub fn get(&self, plan: SubscriptionPlan) -> &T {
        match plan {
            SubscriptionPlan::Free => &self.free,
            SubscriptionPlan::Basic => &self.basic,
            SubscriptionPlan::Premium => &self.premium,
        }
    }
}

/// Per-day usage counters stored in Firestore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DailyUsage {
    pub user_id: String,
    /// UTC calendar day ("YYYY-MM-DD")
    pub date: String,
    #[serde(default)]
    pub mcqs_used: u32,
    #[serde(default)]
    pub flashcards_used: u32,
    #[serde(default)]
    pub definitions_used: u32,
    #[serde(default)]
    pub pdfs_generated: u32,
    #[serde(default)]
    pub true_false_used: u32,
}

impl DailyUsage {
    /// Fresh zeroed counters for a day.
    pub fn empty(user_id: &str, date: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            date: date.to_string(),
            mcqs_used: 0,
            flashcards_used: 0,
            definitions_used: 0,
            pdfs_generated: 0,
            true_false_used: 0,
        }
    }

    /// Firestore document ID for a user/day pair.
    pub fn document_id(user_id: &str, date: &str) -> String {
        format!("{}_{}", urlencoding::encode(user_id), date)
    }

    pub fn used(&self, kind: QuotaKind) -> u32 {
        match kind {
            QuotaKind::Mcqs => self.mcqs_used,
            QuotaKind::Flashcards => self.flashcards_used,
            QuotaKind::Definitions => self.definitions_used,
            QuotaKind::Pdfs => self.pdfs_generated,
            QuotaKind::TrueFalse => self.true_false_used,
        }
    }

    fn used_mut(&mut self, kind: QuotaKind) -> &mut u32 {
        match kind {
            QuotaKind::Mcqs => &mut self.mcqs_used,
            QuotaKind::Flashcards => &mut self.flashcards_used,
            QuotaKind::Definitions => &mut self.definitions_used,
            QuotaKind::Pdfs => &mut self.pdfs_generated,
            QuotaKind::TrueFalse => &mut self.true_false_used,
        }
    }

    /// Items still available today (never negative).
    pub fn remaining(&self, kind: QuotaKind, quotas: &PlanQuotas) -> u32 {
        quotas.limit(kind).saturating_sub(self.used(kind))
    }

    /// Whether `amount` more items fit under the limit.
    pub fn can_consume(&self, kind: QuotaKind, amount: u32, quotas: &PlanQuotas) -> bool {
        self.used(kind).saturating_add(amount) <= quotas.limit(kind)
    }

    /// Add `amount`, capped at the remaining allowance. Returns what was granted.
    pub fn consume_capped(&mut self, kind: QuotaKind, amount: u32, quotas: &PlanQuotas) -> u32 {
        let granted = amount.min(self.remaining(kind, quotas));
        let counter = self.used_mut(kind);
        *counter = counter.saturating_add(granted);
        granted
    }
}
