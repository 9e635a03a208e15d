// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Secrets (the auth JWT secret and the AI gateway key) are read once at
//! startup; on Cloud Run they arrive as environment variables through secret
//! bindings.

use std::env;

/// Default OpenAI-compatible gateway base URL.
pub const DEFAULT_AI_GATEWAY_URL: &str = "https://ai.gateway.lovable.dev/v1";
/// Default chat model used for generation.
pub const DEFAULT_AI_MODEL: &str = "google/gemini-2.5-flash";
/// Default upload limit for text extraction (20 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Expected `aud` claim on auth tokens (None disables the check)
    pub jwt_audience: Option<String>,
    /// Base URL of the chat-completions gateway
    pub ai_gateway_url: String,
    /// Model used for study material generation
    pub ai_model: String,
    /// Model used for image OCR
    pub ai_vision_model: String,
    /// Timeout for a single gateway call
    pub ai_timeout_secs: u64,
    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: usize,

    // --- Secrets ---
    /// HS256 secret of the auth provider (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    /// Gateway API key; generation is disabled when absent
    pub ai_api_key: Option<String>,
}

impl Config {
    /// Config for tests only.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            jwt_audience: Some("authenticated".to_string()),
            ai_gateway_url: "http://127.0.0.1:9".to_string(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            ai_vision_model: DEFAULT_AI_MODEL.to_string(),
            ai_timeout_secs: 5,
            max_upload_bytes: 1024 * 1024,
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            ai_api_key: Some("test_ai_key".to_string()),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let ai_model = env::var("AI_MODEL").unwrap_or_else(|_| DEFAULT_AI_MODEL.to_string());

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            jwt_audience: match env::var("AUTH_JWT_AUDIENCE") {
                Ok(aud) if aud.trim().is_empty() => None,
                Ok(aud) => Some(aud.trim().to_string()),
                Err(_) => Some("authenticated".to_string()),
            },
            ai_gateway_url: env::var("AI_GATEWAY_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_AI_GATEWAY_URL.to_string()),
            ai_vision_model: env::var("AI_VISION_MODEL").unwrap_or_else(|_| ai_model.clone()),
            ai_model,
            ai_timeout_secs: parse_or("AI_TIMEOUT_SECS", 120)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,

            jwt_signing_key: env::var("AUTH_JWT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("AUTH_JWT_SECRET"))?
                .into_bytes(),
            ai_api_key: env::var("AI_GATEWAY_API_KEY")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        })
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
