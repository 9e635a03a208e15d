// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use study_forge::error::AppError;
use study_forge::models::QuotaKind;

async fn body(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_quota_exceeded_body() {
    let (status, json) = body(AppError::QuotaExceeded {
        kind: QuotaKind::Mcqs,
        used: 30,
        limit: 30,
    })
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "quota_exceeded");
    assert_eq!(json["details"], "Daily mcqs quota exceeded (30/30)");
}

#[tokio::test]
async fn test_gateway_error_bodies() {
    let (status, json) = body(AppError::AiRateLimited).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(json["error"], "rate_limited");
    assert_eq!(
        json["details"],
        "Rate limit exceeded. Please try again in a moment."
    );

    let (status, json) = body(AppError::AiCreditsDepleted).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(
        json["details"],
        "AI credits depleted. Please add credits to continue."
    );

    let (status, json) = body(AppError::AiGateway("AI generation failed".to_string())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["details"], "AI generation failed");
}

#[tokio::test]
async fn test_gate_codes_are_forbidden() {
    for (err, code) in [
        (AppError::ProfileRequired, "profile_required"),
        (AppError::VerificationPending, "verification_pending"),
        (AppError::AccountBlocked, "account_blocked"),
    ] {
        let (status, json) = body(err).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(json["error"], code);
    }
}

#[tokio::test]
async fn test_internal_details_hidden() {
    let (status, json) = body(AppError::Database("connection refused to 10.0.0.1".into())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "database_error");
    assert!(json.get("details").is_none());

    let (_, json) = body(AppError::Internal(anyhow::anyhow!("secret detail"))).await;
    assert!(json.get("details").is_none());
}

#[tokio::test]
async fn test_upload_errors() {
    let (status, json) = body(AppError::UnsupportedMediaType(
        "Unsupported file type. Please upload PDF, TXT or image files.".into(),
    ))
    .await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(json["error"], "unsupported_media_type");

    let (status, _) = body(AppError::PayloadTooLarge("File is too large".into())).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_maintenance_message_exposed() {
    let (status, json) = body(AppError::Maintenance("Back at 5pm".into())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "maintenance");
    assert_eq!(json["details"], "Back at 5pm");
}
