// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily quota checks and accounting.

use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::{DailyUsage, PlanQuotas, QuotaKind, SubscriptionPlan, UserProfile};
use crate::time_utils;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Per-user locks serializing usage updates within this instance.
pub type UsageLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

/// Today's quota state for one user.
#[derive(Debug, Clone, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct QuotaSnapshot {
    pub date: String,
    pub plan: SubscriptionPlan,
    pub limits: PlanQuotas,
    pub used: PlanQuotas,
    pub remaining: PlanQuotas,
}

impl QuotaSnapshot {
    pub fn new(plan: SubscriptionPlan, limits: PlanQuotas, usage: &DailyUsage) -> Self {
        let per_kind = |f: &dyn Fn(QuotaKind) -> u32| PlanQuotas {
            mcqs: f(QuotaKind::Mcqs),
            flashcards: f(QuotaKind::Flashcards),
            definitions: f(QuotaKind::Definitions),
            pdfs: f(QuotaKind::Pdfs),
            true_false: f(QuotaKind::TrueFalse),
        };

        Self {
            date: usage.date.clone(),
            plan,
            limits,
            used: per_kind(&|k| usage.used(k)),
            remaining: per_kind(&|k| usage.remaining(k, &limits)),
        }
    }
}

/// Quota service backed by the `daily_usage` collection.
#[derive(Clone)]
pub struct QuotaService {
    db: FirestoreDb,
    locks: UsageLocks,
}

impl QuotaService {
    pub fn new(db: FirestoreDb) -> Self {
        Self {
            db,
            locks: Arc::new(DashMap::new()),
        }
    }

    /// Effective limits for a user (overrides, then the current plan table).
    pub async fn limits_for(&self, profile: &UserProfile) -> Result<PlanQuotas, AppError> {
        let settings = self.db.get_app_settings().await?.unwrap_or_default();
        Ok(PlanQuotas::for_profile(profile, &settings.plan_quotas))
    }

    async fn usage_today(&self, user_id: &str) -> Result<DailyUsage, AppError> {
        let date = time_utils::utc_date(chrono::Utc::now());
        Ok(self
            .db
            .get_daily_usage(user_id, &date)
            .await?
            .unwrap_or_else(|| DailyUsage::empty(user_id, &date)))
    }

    /// Limits, usage and remaining allowance for today.
    pub async fn snapshot(&self, profile: &UserProfile) -> Result<QuotaSnapshot, AppError> {
        let limits = self.limits_for(profile).await?;
        let usage = self.usage_today(&profile.user_id).await?;
        Ok(QuotaSnapshot::new(profile.plan, limits, &usage))
    }

    /// Fail with `QuotaExceeded` unless every kind has at least one item
    /// left today. Returns the snapshot the check was made against.
    pub async fn ensure_available(
        &self,
        profile: &UserProfile,
        kinds: &[QuotaKind],
    ) -> Result<QuotaSnapshot, AppError> {
        let limits = self.limits_for(profile).await?;
        let usage = self.usage_today(&profile.user_id).await?;
        check_available(&usage, &limits, kinds)?;
        Ok(QuotaSnapshot::new(profile.plan, limits, &usage))
    }

    /// Record usage, capped per kind at the remaining allowance.
    ///
    /// Returns the amount actually granted for each requested kind.
    pub async fn consume(
        &self,
        profile: &UserProfile,
        requests: &[(QuotaKind, u32)],
    ) -> Result<Vec<(QuotaKind, u32)>, AppError> {
        let requests: Vec<(QuotaKind, u32)> =
            requests.iter().copied().filter(|&(_, n)| n > 0).collect();
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let limits = self.limits_for(profile).await?;
        let date = time_utils::utc_date(chrono::Utc::now());

        let result = {
            let lock = self
                .locks
                .entry(profile.user_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone();
            let _guard = lock.lock().await;

            self.db
                .consume_usage_atomic(&profile.user_id, &date, &requests, &limits)
                .await
        };
        self.release_lock(&profile.user_id);

        let (_, granted) = result?;
        Ok(granted)
    }

    /// Drop the user's lock once no other request holds or awaits it.
    fn release_lock(&self, user_id: &str) {
        self.locks
            .remove_if(user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Consume exactly one unit of `kind` or fail with `QuotaExceeded`.
    pub async fn consume_one(&self, profile: &UserProfile, kind: QuotaKind) -> Result<(), AppError> {
        let granted = self.consume(profile, &[(kind, 1)]).await?;
        if granted.iter().any(|&(k, n)| k == kind && n == 1) {
            return Ok(());
        }

        let limits = self.limits_for(profile).await?;
        let usage = self.usage_today(&profile.user_id).await?;
        Err(AppError::QuotaExceeded {
            kind,
            used: usage.used(kind),
            limit: limits.limit(kind),
        })
    }
}

/// Every kind needs at least one remaining item.
pub fn check_available(
    usage: &DailyUsage,
    limits: &PlanQuotas,
    kinds: &[QuotaKind],
) -> Result<(), AppError> {
    for &kind in kinds {
        if usage.remaining(kind, limits) == 0 {
            return Err(AppError::QuotaExceeded {
                kind,
                used: usage.used(kind),
                limit: limits.limit(kind),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_available_names_exhausted_kind() {
        let limits = PlanQuotas::default_for(SubscriptionPlan::Free);
        let mut usage = DailyUsage::empty("u1", "2026-10-19");
        usage.flashcards_used = 30;

        assert!(check_available(&usage, &limits, &[QuotaKind::Mcqs]).is_ok());

        let err = check_available(&usage, &limits, &[QuotaKind::Mcqs, QuotaKind::Flashcards])
            .unwrap_err();
        match err {
            AppError::QuotaExceeded { kind, used, limit } => {
                assert_eq!(kind, QuotaKind::Flashcards);
                assert_eq!(used, 30);
                assert_eq!(limit, 30);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_remaining() {
        let limits = PlanQuotas::default_for(SubscriptionPlan::Basic);
        let mut usage = DailyUsage::empty("u1", "2026-10-19");
        usage.mcqs_used = 15;
        usage.pdfs_generated = 12;

        let snapshot = QuotaSnapshot::new(SubscriptionPlan::Basic, limits, &usage);
        assert_eq!(snapshot.used.mcqs, 15);
        assert_eq!(snapshot.remaining.mcqs, 45);
        assert_eq!(snapshot.remaining.pdfs, 0);
        assert_eq!(snapshot.date, "2026-10-19");
    }

    #[tokio::test]
    async fn test_consume_nothing_skips_database() {
        let service = QuotaService::new(FirestoreDb::new_mock());
        let profile_json = serde_json::json!({
            "user_id": "u1",
            "email": "u1@example.com",
            "real_name": "Test",
            "father_name": "Parent",
            "whatsapp_number": "0300",
            "batch_year": "2024",
            "class_or_degree": "MBBS",
            "created_at": "2026-01-01T00:00:00Z",
            "updated_at": "2026-01-01T00:00:00Z"
        });
        let profile: UserProfile = serde_json::from_value(profile_json).unwrap();

        let granted = service
            .consume(&profile, &[(QuotaKind::Mcqs, 0)])
            .await
            .unwrap();
        assert!(granted.is_empty());

        // Anything real hits the (offline) database
        assert!(service
            .consume(&profile, &[(QuotaKind::Mcqs, 1)])
            .await
            .is_err());
        assert!(service.locks.is_empty());
    }

    #[tokio::test]
    async fn test_lock_kept_while_contended() {
        let service = QuotaService::new(FirestoreDb::new_mock());
        let waiting = service
            .locks
            .entry("u1".to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        service.release_lock("u1");
        assert!(service.locks.contains_key("u1"));

        drop(waiting);
        service.release_lock("u1");
        assert!(service.locks.is_empty());
    }
}
