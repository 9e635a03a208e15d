// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study material routes: generation, text extraction, PDF export, quota.
//!
//! Auth and the approval gate are applied in routes/mod.rs.

use crate::error::{AppError, Result};
use crate::models::{Difficulty, GeneratedContent, QuotaKind, UserProfile};
use crate::services::generation::{self, GenerationInput};
use crate::services::pdf::{self, ExportSection, PdfOptions};
use crate::services::QuotaSnapshot;
use crate::AppState;
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/extract-text", post(extract_text))
        .route("/api/export/pdf", post(export_pdf))
        .route("/api/quota", get(get_quota))
}

// ─── Generation ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GenerateRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Generate study materials for the requested content types.
///
/// Tracked lists are cut to what is left of today's allowance and the
/// delivered counts are charged.
async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GeneratedContent>> {
    let input = GenerationInput::parse(
        &request.text,
        request.difficulty.as_deref(),
        &request.options,
    )?;

    let tracked: Vec<QuotaKind> = input.options.iter().filter_map(|o| o.quota_kind()).collect();
    state.quota.ensure_available(&profile, &tracked).await?;

    let mut content = generation::generate(&state.ai_gateway, &input).await?;

    let requested: Vec<(QuotaKind, u32)> = input
        .options
        .iter()
        .filter_map(|&o| {
            o.quota_kind()
                .map(|kind| (kind, content.item_count(o) as u32))
        })
        .collect();
    let granted = state.quota.consume(&profile, &requested).await?;

    for &option in &input.options {
        if let Some(kind) = option.quota_kind() {
            let allowed = granted
                .iter()
                .find(|(k, _)| *k == kind)
                .map_or(0, |&(_, n)| n);
            content.truncate(option, allowed as usize);
        }
    }

    tracing::info!(
        user_id = %profile.user_id,
        ?granted,
        "Study materials generated"
    );

    Ok(Json(content))
}

// ─── Text Extraction ─────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ExtractTextResponse {
    pub text: String,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File is too large".to_string())
    } else {
        AppError::BadRequest(format!("Invalid upload: {}", e.body_text()))
    }
}

/// Extract text from the uploaded `file` part.
async fn extract_text(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    mut multipart: Multipart,
) -> Result<Json<ExtractTextResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field.content_type().map(str::to_string);
        let filename = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        tracing::info!(
            user_id = %profile.user_id,
            content_type = ?content_type,
            size = bytes.len(),
            "Processing upload"
        );

        let text = state
            .extractor
            .extract(content_type.as_deref(), filename.as_deref(), bytes.to_vec())
            .await?;

        return Ok(Json(ExtractTextResponse { text }));
    }

    Err(AppError::BadRequest("No file provided".to_string()))
}

// ─── PDF Export ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ExportPdfRequest {
    /// Content type identifier or `all`
    pub section: String,
    pub content: GeneratedContent,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Render content to PDF. Costs one `pdfs` quota unit, charged after the
/// document rendered.
async fn export_pdf(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
    Json(request): Json<ExportPdfRequest>,
) -> Result<Response> {
    let section = ExportSection::parse(&request.section)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown section: {}", request.section)))?;

    state
        .quota
        .ensure_available(&profile, &[QuotaKind::Pdfs])
        .await?;

    let options = PdfOptions {
        title: request
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| section.default_title().to_string()),
        difficulty: request
            .difficulty
            .as_deref()
            .map(|d| pdf::display_difficulty(Difficulty::from_label(d).label())),
        watermark: Some(profile.real_name.clone()),
        generated_on: chrono::Utc::now().date_naive(),
    };

    let mut content = request.content;
    content.drop_malformed_mcqs();

    let bytes = tokio::task::spawn_blocking(move || pdf::render(section, &content, &options))
        .await
        .map_err(|e| AppError::Pdf(format!("Renderer task failed: {}", e)))??;

    state.quota.consume_one(&profile, QuotaKind::Pdfs).await?;

    tracing::info!(
        user_id = %profile.user_id,
        section = ?section,
        size = bytes.len(),
        "PDF exported"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", section.default_filename()),
            ),
        ],
        bytes,
    )
        .into_response())
}

// ─── Quota ───────────────────────────────────────────────────

/// Today's limits, usage and remaining allowance.
async fn get_quota(
    State(state): State<Arc<AppState>>,
    Extension(profile): Extension<UserProfile>,
) -> Result<Json<QuotaSnapshot>> {
    Ok(Json(state.quota.snapshot(&profile).await?))
}
