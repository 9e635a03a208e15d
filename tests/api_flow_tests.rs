// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! End-to-end API flows through the full router.
//!
//! These tests require the Firestore emulator (`FIRESTORE_EMULATOR_HOST`);
//! the AI gateway is an in-process stub.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use study_forge::config::Config;
use study_forge::models::{UserProfile, UserRole, VerificationStatus};
use tower::ServiceExt;

mod common;
use common::{create_app_with, create_test_jwt, test_db, test_profile, unique_id};

const BOUNDARY: &str = "study-forge-test-boundary";

/// Stub gateway returning three MCQs and a summary for every call.
async fn spawn_gateway() -> String {
    let arguments = json!({
        "summary": "Cells are the basic unit of life.",
        "mcqs": [
            { "question": "Q1", "options": ["a", "b", "c", "d"], "correctAnswer": 0 },
            { "question": "Q2", "options": ["a", "b", "c", "d"], "correctAnswer": 1 },
            { "question": "Q3", "options": ["a", "b", "c", "d"], "correctAnswer": 2 }
        ]
    });
    let app = Router::new().route(
        "/chat/completions",
        post(move |Json(_): Json<Value>| {
            let arguments = arguments.clone();
            async move {
                Json(json!({
                    "choices": [{
                        "message": {
                            "tool_calls": [{
                                "function": {
                                    "name": "generate_study_materials",
                                    "arguments": arguments.to_string()
                                }
                            }]
                        }
                    }]
                }))
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn test_app() -> Router {
    let mut config = Config::test_default();
    config.ai_gateway_url = spawn_gateway().await;
    create_app_with(config, test_db().await).0
}

async fn store(profile: &UserProfile) {
    test_db().await.upsert_profile(profile).await.unwrap();
}

async fn approved_user(prefix: &str) -> UserProfile {
    let profile = test_profile(&unique_id(prefix), VerificationStatus::Approved, UserRole::User);
    store(&profile).await;
    profile
}

fn request(method: &str, uri: &str, user_id: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user_id)),
        );
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn multipart_upload(user_id: &str, filename: &str, mime: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {mime}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/extract-text")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", create_test_jwt(user_id)),
        )
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

// ═══════════════════════════════════════════════════════════════════════════
// APPROVAL GATE
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_gate_codes() {
    require_emulator!();

    let app = test_app().await;

    let response = send(&app, request("GET", "/api/quota", &unique_id("ghost"), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "profile_required");

    let pending = test_profile(&unique_id("pending"), VerificationStatus::Pending, UserRole::User);
    store(&pending).await;
    let response = send(&app, request("GET", "/api/quota", &pending.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "verification_pending");

    let mut blocked = test_profile(&unique_id("blocked"), VerificationStatus::Approved, UserRole::User);
    blocked.is_blocked = true;
    store(&blocked).await;
    let response = send(&app, request("GET", "/api/quota", &blocked.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["error"], "account_blocked");

    let approved = approved_user("approved").await;
    let response = send(&app, request("GET", "/api/quota", &approved.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let quota = json_body(response).await;
    assert_eq!(quota["plan"], "free");
    assert_eq!(quota["remaining"]["pdfs"], quota["limits"]["pdfs"]);
}

#[tokio::test]
async fn test_profile_signup_flow() {
    require_emulator!();

    let app = test_app().await;
    let user_id = unique_id("signup");

    let response = send(&app, request("GET", "/api/me", &user_id, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = json!({
        "real_name": "Ayesha Khan",
        "father_name": "Imran Khan",
        "whatsapp_number": "+923001234567",
        "batch_year": "2024",
        "class_or_degree": "MBBS"
    });
    let response = send(&app, request("POST", "/api/profile", &user_id, Some(body.clone()))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile = json_body(response).await;
    assert_eq!(profile["verification_status"], "pending");
    assert_eq!(profile["badge"], "bronze");
    assert_eq!(profile["email"], format!("{}@example.com", user_id));

    let response = send(&app, request("POST", "/api/profile", &user_id, Some(body))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = send(&app, request("GET", "/api/me", &user_id, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

// ═══════════════════════════════════════════════════════════════════════════
// GENERATION & QUOTA
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_generation_truncated_to_quota() {
    require_emulator!();

    let app = test_app().await;
    let mut profile = test_profile(&unique_id("gen"), VerificationStatus::Approved, UserRole::User);
    profile.custom_daily_mcqs = Some(2);
    store(&profile).await;

    let body = json!({
        "text": "Cells are the basic structural and functional unit of all living organisms.",
        "difficulty": "university",
        "options": ["summary", "mcqs"]
    });

    let response = send(
        &app,
        request("POST", "/api/generate", &profile.user_id, Some(body.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let content = json_body(response).await;
    assert_eq!(content["mcqs"].as_array().unwrap().len(), 2);
    assert!(content["summary"].is_string());
    assert!(content.get("flashcards").is_none());

    let response = send(&app, request("GET", "/api/quota", &profile.user_id, None)).await;
    let quota = json_body(response).await;
    assert_eq!(quota["used"]["mcqs"], 2);
    assert_eq!(quota["remaining"]["mcqs"], 0);

    // MCQs exhausted: the pre-check blocks the next request
    let response = send(
        &app,
        request("POST", "/api/generate", &profile.user_id, Some(body)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json_body(response).await["error"], "quota_exceeded");

    // Untracked content types are still available
    let response = send(
        &app,
        request(
            "POST",
            "/api/generate",
            &profile.user_id,
            Some(json!({ "text": "Cells divide by mitosis.", "options": ["summary"] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_generation_validation() {
    require_emulator!();

    let app = test_app().await;
    let profile = approved_user("genval").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/generate",
            &profile.user_id,
            Some(json!({ "text": "   ", "options": ["summary"] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["details"].as_str().unwrap().contains("Text Required"));

    let response = send(
        &app,
        request(
            "POST",
            "/api/generate",
            &profile.user_id,
            Some(json!({ "text": "Some notes here", "options": ["poems"] })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ═══════════════════════════════════════════════════════════════════════════
// UPLOADS & EXPORT
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_upload_plain_text() {
    require_emulator!();

    let app = test_app().await;
    let profile = approved_user("upload").await;
    let text = "Chapter 1\n\n  The Krebs cycle happens in the mitochondria.\n";

    let response = send(
        &app,
        multipart_upload(&profile.user_id, "notes.txt", "text/plain", text.as_bytes()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["text"], text);

    let response = send(
        &app,
        multipart_upload(&profile.user_id, "notes.zip", "application/zip", b"PK\x03\x04"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn test_pdf_export_consumes_quota() {
    require_emulator!();

    let app = test_app().await;
    let mut profile = test_profile(&unique_id("export"), VerificationStatus::Approved, UserRole::User);
    profile.custom_daily_pdfs = Some(1);
    store(&profile).await;

    let body = json!({
        "section": "flashcards",
        "difficulty": "kids",
        "content": {
            "flashcards": [
                { "question": "What is ATP?", "answer": "The cell's energy currency" }
            ]
        }
    });

    let response = send(
        &app,
        request("POST", "/api/export/pdf", &profile.user_id, Some(body.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/pdf"
    );
    assert!(response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .contains("flashcards.pdf"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let response = send(
        &app,
        request("POST", "/api/export/pdf", &profile.user_id, Some(body)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_pdf_export_missing_section() {
    require_emulator!();

    let app = test_app().await;
    let profile = approved_user("export-missing").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/export/pdf",
            &profile.user_id,
            Some(json!({ "section": "mcqs", "content": { "summary": "Only a summary" } })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Failed exports are not charged
    let response = send(&app, request("GET", "/api/quota", &profile.user_id, None)).await;
    assert_eq!(json_body(response).await["used"]["pdfs"], 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// COMMUNITY
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_community_flow() {
    require_emulator!();

    let app = test_app().await;
    let owner = approved_user("owner").await;
    let member = approved_user("member").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/communities",
            &owner.user_id,
            Some(json!({ "name": "Anatomy 2026", "type": "public" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let community_id = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let join_uri = format!("/api/communities/{}/join", community_id);
    let response = send(&app, request("POST", &join_uri, &member.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let response = send(&app, request("POST", &join_uri, &member.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let messages_uri = format!("/api/communities/{}/messages", community_id);
    let response = send(
        &app,
        request(
            "POST",
            &messages_uri,
            &member.user_id,
            Some(json!({ "message_type": "text", "content": "Hi all" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let message_id = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(&app, request("GET", &messages_uri, &owner.user_id, None)).await;
    let messages = json_body(response).await;
    assert_eq!(messages.as_array().unwrap().len(), 1);

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/messages/{}/report", message_id),
            &owner.user_id,
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(json_body(response).await["reason"], "Reported by user");

    // Ban: membership removed and posting refused
    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/communities/{}/bans", community_id),
            &owner.user_id,
            Some(json!({ "user_id": member.user_id, "duration_hours": 24 })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &app,
        request(
            "POST",
            &messages_uri,
            &member.user_id,
            Some(json!({ "content": "Still here?" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, request("POST", &join_uri, &member.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Owner moderates the room and may delete the message
    let response = send(
        &app,
        request(
            "DELETE",
            &format!("/api/messages/{}", message_id),
            &owner.user_id,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_private_community_requires_invite() {
    require_emulator!();

    let app = test_app().await;
    let owner = approved_user("powner").await;
    let outsider = approved_user("outsider").await;

    let response = send(
        &app,
        request(
            "POST",
            "/api/communities",
            &owner.user_id,
            Some(json!({ "name": "Study group", "type": "private" })),
        ),
    )
    .await;
    let community_id = json_body(response).await["id"]
        .as_str()
        .unwrap()
        .to_string();

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/communities/{}/join", community_id),
            &outsider.user_id,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let messages_uri = format!("/api/communities/{}/messages", community_id);
    let response = send(&app, request("GET", &messages_uri, &outsider.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/communities/{}/members", community_id),
            &owner.user_id,
            Some(json!({ "user_id": outsider.user_id })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(&app, request("GET", &messages_uri, &outsider.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request("GET", "/api/communities?scope=joined", &outsider.user_id, None),
    )
    .await;
    let joined = json_body(response).await;
    assert!(joined
        .as_array()
        .unwrap()
        .iter()
        .any(|c| c["id"] == community_id.as_str()));
}

// ═══════════════════════════════════════════════════════════════════════════
// ADMIN
// ═══════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_admin_approval_flow() {
    require_emulator!();

    let app = test_app().await;
    let admin = test_profile(&unique_id("admin"), VerificationStatus::Approved, UserRole::Admin);
    store(&admin).await;
    let pending = test_profile(&unique_id("applicant"), VerificationStatus::Pending, UserRole::User);
    store(&pending).await;

    let response = send(
        &app,
        request("GET", "/api/admin/verifications?limit=500", &admin.user_id, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let listed = json_body(response).await;
    assert!(listed
        .as_array()
        .unwrap()
        .iter()
        .any(|p| p["user_id"] == pending.user_id.as_str()));

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/admin/users/{}/approve", pending.user_id),
            &admin.user_id,
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["approved_by"], admin.user_id.as_str());

    let response = send(&app, request("GET", "/api/quota", &pending.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/users/{}/plan", pending.user_id),
            &admin.user_id,
            Some(json!({ "plan": "premium" })),
        ),
    )
    .await;
    assert_eq!(json_body(response).await["badge"], "gold_star");

    // Only super admins hand out admin rights
    let response = send(
        &app,
        request(
            "PUT",
            &format!("/api/admin/users/{}/role", pending.user_id),
            &admin.user_id,
            Some(json!({ "role": "admin" })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &app,
        request("GET", "/api/admin/actions?limit=500", &admin.user_id, None),
    )
    .await;
    let actions = json_body(response).await;
    let mine: Vec<&Value> = actions
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["admin_id"] == admin.user_id.as_str())
        .collect();
    assert_eq!(mine.len(), 2);
}

#[tokio::test]
async fn test_admin_routes_forbidden_for_users() {
    require_emulator!();

    let app = test_app().await;
    let user = approved_user("plain").await;

    let response = send(&app, request("GET", "/api/admin/users", &user.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, request("GET", "/api/admin/reports", &user.user_id, None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let moderator = test_profile(&unique_id("mod"), VerificationStatus::Approved, UserRole::Moderator);
    store(&moderator).await;
    let response = send(
        &app,
        request("GET", "/api/admin/reports", &moderator.user_id, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = send(
        &app,
        request("GET", "/api/admin/settings", &moderator.user_id, None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
