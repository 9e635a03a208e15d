// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Firestore client wrapper with typed operations.
//!
//! Provides high-level operations for:
//! - Profiles (user records and verification state)
//! - Daily usage (quota counters, updated transactionally)
//! - App settings and the admin audit log
//! - Communities, memberships, messages, reports and bans

use crate::db::collections;
use crate::error::AppError;
use crate::models::{
    AdminAction, AppSettings, Community, CommunityBan, CommunityMember, CommunityMessage,
    DailyUsage, MessageReport, PlanQuotas, QuotaKind, ReportStatus, UserProfile,
    VerificationStatus,
};
use firestore::errors::{BackoffError, FirestoreError};
use firestore::FirestoreQueryDirection;
use futures_util::FutureExt;

/// Contention and unavailability retry the transaction; anything else fails it.
fn transaction_error(err: FirestoreError) -> BackoffError<FirestoreError> {
    match err {
        FirestoreError::DatabaseError(ref db_err) if db_err.retry_possible => {
            BackoffError::transient(err)
        }
        other => BackoffError::permanent(other),
    }
}

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        // Emulator: use an unauthenticated connection to avoid picking up
        // local credentials.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
        })
    }

    /// Create a mock Firestore client for testing (offline mode).
    ///
    /// All database operations will return an error if called.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Fetch one document by ID.
    async fn get_doc<T>(&self, collection: &str, id: &str) -> Result<Option<T>, AppError>
    where
        T: for<'de> serde::Deserialize<'de> + Send,
    {
        self.get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create or replace one document.
    async fn set_doc<T>(&self, collection: &str, id: &str, object: &T) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let _: () = self
            .get_client()?
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    // ─── Profile Operations ──────────────────────────────────────

    /// Get a profile by auth user ID.
    pub async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, AppError> {
        self.get_doc(collections::PROFILES, user_id).await
    }

    /// Create or update a profile.
    pub async fn upsert_profile(&self, profile: &UserProfile) -> Result<(), AppError> {
        self.set_doc(collections::PROFILES, &profile.user_id, profile)
            .await
    }

    /// Profiles with a given verification status, oldest first.
    pub async fn list_profiles_by_status(
        &self,
        status: VerificationStatus,
        limit: u32,
    ) -> Result<Vec<UserProfile>, AppError> {
        let status = status.as_str();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .filter(move |q| q.for_all([q.field("verification_status").eq(status)]))
            .order_by([("created_at", FirestoreQueryDirection::Ascending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// All profiles, newest first.
    pub async fn list_profiles(&self, limit: u32) -> Result<Vec<UserProfile>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::PROFILES)
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Daily Usage Operations ──────────────────────────────────

    /// Get the usage document for a user and UTC day.
    pub async fn get_daily_usage(
        &self,
        user_id: &str,
        date: &str,
    ) -> Result<Option<DailyUsage>, AppError> {
        self.get_doc(
            collections::DAILY_USAGE,
            &DailyUsage::document_id(user_id, date),
        )
        .await
    }

    /// Atomically add usage, capping every counter at its limit.
    ///
    /// The read and the write run in one Firestore transaction, retried on
    /// contention, so concurrent requests from any instance cannot push a
    /// counter past its limit. Returns the updated usage and the amount
    /// granted per requested kind.
    pub async fn consume_usage_atomic(
        &self,
        user_id: &str,
        date: &str,
        requests: &[(QuotaKind, u32)],
        quotas: &PlanQuotas,
    ) -> Result<(DailyUsage, Vec<(QuotaKind, u32)>), AppError> {
        let doc_id = DailyUsage::document_id(user_id, date);

        let (usage, granted) = self
            .get_client()?
            .run_transaction(|db, transaction| {
                let doc_id = doc_id.clone();
                let user_id = user_id.to_string();
                let date = date.to_string();
                let requests = requests.to_vec();
                let quotas = *quotas;

                async move {
                    // `db` reads through the transaction
                    let current: Option<DailyUsage> = db
                        .fluent()
                        .select()
                        .by_id_in(collections::DAILY_USAGE)
                        .obj()
                        .one(&doc_id)
                        .await
                        .map_err(transaction_error)?;

                    let mut usage =
                        current.unwrap_or_else(|| DailyUsage::empty(&user_id, &date));

                    let granted: Vec<(QuotaKind, u32)> = requests
                        .iter()
                        .map(|&(kind, amount)| {
                            (kind, usage.consume_capped(kind, amount, &quotas))
                        })
                        .collect();

                    if granted.iter().any(|&(_, n)| n > 0) {
                        db.fluent()
                            .update()
                            .in_col(collections::DAILY_USAGE)
                            .document_id(&doc_id)
                            .object(&usage)
                            .add_to_transaction(transaction)
                            .map_err(transaction_error)?;
                    }

                    Ok::<_, BackoffError<FirestoreError>>((usage, granted))
                }
                .boxed()
            })
            .await
            .map_err(|e| AppError::Database(format!("Usage transaction failed: {}", e)))?;

        tracing::debug!(user_id, date, ?granted, "Usage recorded");

        Ok((usage, granted))
    }

    // ─── Settings & Audit Log ────────────────────────────────────

    /// Global settings, or None if never saved.
    pub async fn get_app_settings(&self) -> Result<Option<AppSettings>, AppError> {
        self.get_doc(collections::APP_SETTINGS, collections::SETTINGS_DOC_ID)
            .await
    }

    /// Write one document and its audit log entry in one transaction.
    async fn set_doc_with_action<T>(
        &self,
        collection: &str,
        id: &str,
        object: &T,
        action: &AdminAction,
    ) -> Result<(), AppError>
    where
        T: serde::Serialize + for<'de> serde::Deserialize<'de> + Send + Sync,
    {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collection)
            .document_id(id)
            .object(object)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add {} to transaction: {}", collection, e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::ADMIN_ACTIONS)
            .document_id(&action.id)
            .object(action)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add audit entry to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;
        Ok(())
    }

    /// Save an admin change to a profile together with its audit entry.
    pub async fn upsert_profile_audited(
        &self,
        profile: &UserProfile,
        action: &AdminAction,
    ) -> Result<(), AppError> {
        self.set_doc_with_action(collections::PROFILES, &profile.user_id, profile, action)
            .await
    }

    pub async fn set_app_settings_audited(
        &self,
        settings: &AppSettings,
        action: &AdminAction,
    ) -> Result<(), AppError> {
        self.set_doc_with_action(
            collections::APP_SETTINGS,
            collections::SETTINGS_DOC_ID,
            settings,
            action,
        )
        .await
    }

    pub async fn upsert_report_audited(
        &self,
        report: &MessageReport,
        action: &AdminAction,
    ) -> Result<(), AppError> {
        self.set_doc_with_action(collections::MESSAGE_REPORTS, &report.id, report, action)
            .await
    }

    /// Audit log, newest first.
    pub async fn list_admin_actions(&self, limit: u32) -> Result<Vec<AdminAction>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::ADMIN_ACTIONS)
            .order_by([("timestamp", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Community Operations ────────────────────────────────────

    /// Create a community and its creator membership in one transaction.
    pub async fn create_community_atomic(
        &self,
        community: &Community,
        creator: &CommunityMember,
    ) -> Result<(), AppError> {
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::COMMUNITIES)
            .document_id(&community.id)
            .object(community)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add community to transaction: {}", e))
            })?;

        client
            .fluent()
            .update()
            .in_col(collections::COMMUNITY_MEMBERS)
            .document_id(CommunityMember::document_id(
                &creator.community_id,
                &creator.user_id,
            ))
            .object(creator)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add member to transaction: {}", e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            community_id = %community.id,
            created_by = %community.created_by,
            "Community created"
        );
        Ok(())
    }

    pub async fn get_community(&self, community_id: &str) -> Result<Option<Community>, AppError> {
        self.get_doc(collections::COMMUNITIES, community_id).await
    }

    /// Public communities, newest first.
    pub async fn list_public_communities(&self, limit: u32) -> Result<Vec<Community>, AppError> {
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMUNITIES)
            .filter(|q| q.for_all([q.field("type").eq("public")]))
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    pub async fn get_member(
        &self,
        community_id: &str,
        user_id: &str,
    ) -> Result<Option<CommunityMember>, AppError> {
        self.get_doc(
            collections::COMMUNITY_MEMBERS,
            &CommunityMember::document_id(community_id, user_id),
        )
        .await
    }

    pub async fn upsert_member(&self, member: &CommunityMember) -> Result<(), AppError> {
        self.set_doc(
            collections::COMMUNITY_MEMBERS,
            &CommunityMember::document_id(&member.community_id, &member.user_id),
            member,
        )
        .await
    }

    pub async fn remove_member(&self, community_id: &str, user_id: &str) -> Result<(), AppError> {
        self.delete_doc(
            collections::COMMUNITY_MEMBERS,
            &CommunityMember::document_id(community_id, user_id),
        )
        .await
    }

    /// Memberships of one user.
    pub async fn list_memberships_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<CommunityMember>, AppError> {
        let user_id = user_id.to_string();
        self.get_client()?
            .fluent()
            .select()
            .from(collections::COMMUNITY_MEMBERS)
            .filter(move |q| q.for_all([q.field("user_id").eq(user_id.clone())]))
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Message Operations ──────────────────────────────────────

    pub async fn add_message(&self, message: &CommunityMessage) -> Result<(), AppError> {
        self.set_doc(collections::COMMUNITY_MESSAGES, &message.id, message)
            .await
    }

    pub async fn get_message(
        &self,
        message_id: &str,
    ) -> Result<Option<CommunityMessage>, AppError> {
        self.get_doc(collections::COMMUNITY_MESSAGES, message_id)
            .await
    }

    pub async fn delete_message(&self, message_id: &str) -> Result<(), AppError> {
        self.delete_doc(collections::COMMUNITY_MESSAGES, message_id)
            .await
    }

    /// Messages of a community in chronological order.
    ///
    /// Without `since`, returns the newest `limit` messages. With `since`
    /// (RFC3339), returns the oldest `limit` messages created strictly after
    /// it, which clients use to poll for new messages.
    pub async fn list_messages(
        &self,
        community_id: &str,
        since: Option<&str>,
        limit: u32,
    ) -> Result<Vec<CommunityMessage>, AppError> {
        let community_id = community_id.to_string();
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::COMMUNITY_MESSAGES);

        match since {
            Some(since) => {
                let since = since.to_string();
                query
                    .filter(move |q| {
                        q.for_all([
                            q.field("community_id").eq(community_id.clone()),
                            q.field("created_at").greater_than(since.clone()),
                        ])
                    })
                    .order_by([("created_at", FirestoreQueryDirection::Ascending)])
                    .limit(limit)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))
            }
            None => {
                let mut latest: Vec<CommunityMessage> = query
                    .filter(move |q| {
                        q.for_all([q.field("community_id").eq(community_id.clone())])
                    })
                    .order_by([("created_at", FirestoreQueryDirection::Descending)])
                    .limit(limit)
                    .obj()
                    .query()
                    .await
                    .map_err(|e| AppError::Database(e.to_string()))?;
                latest.reverse();
                Ok(latest)
            }
        }
    }

    // ─── Report Operations ───────────────────────────────────────

    pub async fn upsert_report(&self, report: &MessageReport) -> Result<(), AppError> {
        self.set_doc(collections::MESSAGE_REPORTS, &report.id, report)
            .await
    }

    pub async fn get_report(&self, report_id: &str) -> Result<Option<MessageReport>, AppError> {
        self.get_doc(collections::MESSAGE_REPORTS, report_id).await
    }

    /// Reports, newest first, optionally filtered by status.
    pub async fn list_reports(
        &self,
        status: Option<ReportStatus>,
        limit: u32,
    ) -> Result<Vec<MessageReport>, AppError> {
        let query = self
            .get_client()?
            .fluent()
            .select()
            .from(collections::MESSAGE_REPORTS);

        let query = match status {
            Some(status) => {
                let status = status.as_str();
                query.filter(move |q| q.for_all([q.field("status").eq(status)]))
            }
            None => query,
        };

        query
            .order_by([("created_at", FirestoreQueryDirection::Descending)])
            .limit(limit)
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ─── Ban Operations ──────────────────────────────────────────

    pub async fn get_ban(
        &self,
        community_id: &str,
        user_id: &str,
    ) -> Result<Option<CommunityBan>, AppError> {
        self.get_doc(
            collections::COMMUNITY_BANS,
            &CommunityMember::document_id(community_id, user_id),
        )
        .await
    }

    /// Store a ban and drop the membership in one transaction.
    pub async fn ban_member_atomic(&self, ban: &CommunityBan) -> Result<(), AppError> {
        let client = self.get_client()?;
        let doc_id = CommunityMember::document_id(&ban.community_id, &ban.user_id);

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collections::COMMUNITY_BANS)
            .document_id(&doc_id)
            .object(ban)
            .add_to_transaction(&mut transaction)
            .map_err(|e| AppError::Database(format!("Failed to add ban to transaction: {}", e)))?;

        client
            .fluent()
            .delete()
            .from(collections::COMMUNITY_MEMBERS)
            .document_id(&doc_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!(
                    "Failed to add membership deletion to transaction: {}",
                    e
                ))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::info!(
            community_id = %ban.community_id,
            user_id = %ban.user_id,
            banned_by = %ban.banned_by,
            "Member banned"
        );
        Ok(())
    }
}
