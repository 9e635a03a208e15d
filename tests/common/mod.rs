// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use study_forge::config::Config;
use study_forge::db::FirestoreDb;
use study_forge::middleware::auth::create_jwt;
use study_forge::models::{UserProfile, UserRole, VerificationStatus};
use study_forge::routes::create_router;
use study_forge::time_utils::now_rfc3339;
use study_forge::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a mock database connection (offline).
#[allow(dead_code)]
pub fn test_db_offline() -> FirestoreDb {
    FirestoreDb::new_mock()
}

/// Build an app around the given config and database.
#[allow(dead_code)]
pub fn create_app_with(config: Config, db: FirestoreDb) -> (axum::Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, db).expect("Failed to build app state"));
    (create_router(state.clone()), state)
}

/// Create a test app with offline mock dependencies.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>) {
    create_app_with(Config::test_default(), test_db_offline())
}

/// Token for `user_id` accepted by the test config.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str) -> String {
    let config = Config::test_default();
    create_jwt(
        user_id,
        Some(&format!("{}@example.com", user_id)),
        config.jwt_audience.as_deref(),
        &config.jwt_signing_key,
    )
    .expect("Failed to create test JWT")
}

/// A unique ID so emulator tests do not collide.
#[allow(dead_code)]
pub fn unique_id(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4())
}

/// Profile with the given state.
#[allow(dead_code)]
pub fn test_profile(user_id: &str, status: VerificationStatus, role: UserRole) -> UserProfile {
    let now = now_rfc3339();
    UserProfile {
        user_id: user_id.to_string(),
        email: format!("{}@example.com", user_id),
        real_name: "Test Student".to_string(),
        father_name: "Test Parent".to_string(),
        whatsapp_number: "+923001234567".to_string(),
        batch_year: "2024".to_string(),
        class_or_degree: "MBBS".to_string(),
        medical_id_card_url: None,
        profile_photo: None,
        bio: None,
        role,
        plan: Default::default(),
        badge: Default::default(),
        verification_status: status,
        is_blocked: false,
        custom_daily_mcqs: None,
        custom_daily_flashcards: None,
        custom_daily_definitions: None,
        custom_daily_pdfs: None,
        created_at: now.clone(),
        updated_at: now,
        approved_at: None,
        approved_by: None,
    }
}
