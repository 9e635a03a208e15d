// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the OpenAI-compatible AI gateway.
//!
//! Only `chat/completions` is used, in two shapes:
//! - A forced function tool call whose arguments carry the study materials
//! - A vision request that reads the text out of an uploaded image
//!
//! Calls log model, status and latency. Prompts, uploaded content and the
//! API key are never logged.

use crate::config::Config;
use crate::error::AppError;
use crate::services::prompts;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::instrument;

const USER_AGENT: &str = concat!("study-forge/", env!("CARGO_PKG_VERSION"));

/// Message for a malformed or missing tool call.
pub const INVALID_RESPONSE: &str = "Invalid AI response format";

/// AI gateway client.
#[derive(Clone)]
pub struct AiGatewayClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<Value>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Deserialize)]
struct Usage {
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
}

impl AiGatewayClient {
    /// Create a client from configuration.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.ai_gateway_url.trim_end_matches('/').to_string(),
            api_key: config.ai_api_key.clone(),
            model: config.ai_model.clone(),
            vision_model: config.ai_vision_model.clone(),
        })
    }

    /// Whether an API key is available.
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, AppError> {
        self.api_key.as_deref().ok_or_else(|| {
            tracing::error!("AI_GATEWAY_API_KEY is not configured");
            AppError::ServiceUnavailable("AI service not configured".to_string())
        })
    }

    /// Run the forced `generate_study_materials` tool call.
    ///
    /// Returns the parsed tool arguments as raw JSON; reshaping into typed
    /// content is left to the caller.
    #[instrument(skip(self, system, text, schema), fields(model = %self.model, text_len = text.len()))]
    pub async fn generate_study_materials(
        &self,
        system: &str,
        text: &str,
        schema: Value,
    ) -> Result<Value, AppError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: Value::String(system.to_string()),
                },
                ChatMessage {
                    role: "user",
                    content: Value::String(text.to_string()),
                },
            ],
            tools: Some(json!([{
                "type": "function",
                "function": {
                    "name": prompts::TOOL_NAME,
                    "description": prompts::TOOL_DESCRIPTION,
                    "parameters": schema,
                },
            }])),
            tool_choice: Some(json!({
                "type": "function",
                "function": { "name": prompts::TOOL_NAME },
            })),
        };

        let response = self.post_chat(&request).await?;

        let arguments = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.tool_calls.into_iter().next())
            .and_then(|call| call.function.arguments)
            .ok_or_else(|| {
                tracing::error!("AI response has no tool call");
                AppError::AiGateway(INVALID_RESPONSE.to_string())
            })?;

        parse_tool_arguments(arguments)
    }

    /// Read the text out of an image with the vision model.
    #[instrument(skip(self, bytes), fields(model = %self.vision_model, size = bytes.len()))]
    pub async fn extract_image_text(&self, mime: &str, bytes: &[u8]) -> Result<String, AppError> {
        use base64::Engine;

        let data_url = format!(
            "data:{};base64,{}",
            mime,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );

        let request = ChatRequest {
            model: &self.vision_model,
            messages: vec![ChatMessage {
                role: "user",
                content: json!([
                    { "type": "text", "text": prompts::OCR_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } },
                ]),
            }],
            tools: None,
            tool_choice: None,
        };

        let response = self.post_chat(&request).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    /// POST a chat completion and map gateway failures to API errors.
    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let started = Instant::now();

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.api_key()?)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "AI gateway request failed");
                AppError::AiGateway("AI generation failed".to_string())
            })?;

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                elapsed_ms,
                body_len = body.len(),
                "AI gateway returned an error"
            );
            return Err(map_gateway_status(status));
        }

        let body: ChatResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "AI gateway response is not valid JSON");
            AppError::AiGateway(INVALID_RESPONSE.to_string())
        })?;

        if let Some(usage) = &body.usage {
            tracing::info!(
                elapsed_ms,
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                "AI gateway call completed"
            );
        } else {
            tracing::info!(elapsed_ms, "AI gateway call completed");
        }

        Ok(body)
    }
}

/// Map a non-success gateway status to the client-facing error.
pub fn map_gateway_status(status: StatusCode) -> AppError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => AppError::AiRateLimited,
        StatusCode::PAYMENT_REQUIRED => AppError::AiCreditsDepleted,
        _ => AppError::AiGateway("AI generation failed".to_string()),
    }
}

/// Tool arguments arrive as a JSON-encoded string; some gateways send the
/// object directly.
fn parse_tool_arguments(arguments: Value) -> Result<Value, AppError> {
    let parsed = match arguments {
        Value::String(raw) => serde_json::from_str::<Value>(&raw).map_err(|e| {
            tracing::error!(error = %e, "Tool arguments are not valid JSON");
            AppError::AiGateway(INVALID_RESPONSE.to_string())
        })?,
        other => other,
    };

    if !parsed.is_object() {
        return Err(AppError::AiGateway(INVALID_RESPONSE.to_string()));
    }
    Ok(parsed)
}
