// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod admin;
pub mod community;
pub mod quota;
pub mod study;
pub mod user;

pub use admin::{AdminAction, AdminActionType, AppSettings};
pub use community::{
    Community, CommunityBan, CommunityMember, CommunityMessage, CommunityRole, CommunityType,
    MessageReport, MessageType, ReportStatus,
};
pub use quota::{DailyUsage, PlanQuotas, PlanTable, QuotaKind};
pub use study::{ContentType, Difficulty, GeneratedContent};
pub use user::{Badge, SubscriptionPlan, UserProfile, UserRole, VerificationStatus};
