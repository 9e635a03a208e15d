// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Study material generation: input validation, the gateway call and
//! reshaping of the tool output into [`GeneratedContent`].

use crate::error::AppError;
use crate::models::study::{Definition, Flashcard, Mcq, TrueFalseItem};
use crate::models::{ContentType, Difficulty, GeneratedContent};
use crate::services::ai_gateway::{AiGatewayClient, INVALID_RESPONSE};
use crate::services::prompts;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Longest accepted input, in characters.
pub const MAX_INPUT_CHARS: usize = 100_000;

/// A validated generation request.
#[derive(Debug, Clone)]
pub struct GenerationInput {
    pub text: String,
    pub difficulty: Difficulty,
    pub options: Vec<ContentType>,
}

impl GenerationInput {
    /// Validate raw request fields.
    pub fn parse(text: &str, difficulty: Option<&str>, options: &[String]) -> Result<Self, AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::BadRequest(
                "Text Required: please enter or upload some text".to_string(),
            ));
        }

        let chars = text.chars().count();
        if chars > MAX_INPUT_CHARS {
            return Err(AppError::BadRequest(format!(
                "Text is too long ({} characters, max {})",
                chars, MAX_INPUT_CHARS
            )));
        }

        if options.is_empty() {
            return Err(AppError::BadRequest(
                "Select at least one content type".to_string(),
            ));
        }
        let options = ContentType::parse_list(options).map_err(AppError::BadRequest)?;

        Ok(Self {
            text: text.to_string(),
            difficulty: difficulty.map(Difficulty::from_label).unwrap_or_default(),
            options,
        })
    }
}

/// Call the gateway and reshape its output.
pub async fn generate(
    gateway: &AiGatewayClient,
    input: &GenerationInput,
) -> Result<GeneratedContent, AppError> {
    let system = prompts::system_prompt(input.difficulty, &input.options);
    let schema = prompts::parameters_schema(&input.options);

    tracing::info!(
        difficulty = input.difficulty.label(),
        options = ?input.options,
        text_len = input.text.len(),
        "Generating study materials"
    );

    let raw = gateway
        .generate_study_materials(&system, &input.text, schema)
        .await?;

    reshape(raw, &input.options)
}

/// Turn raw tool arguments into content holding exactly the requested keys.
///
/// List entries that do not match their item shape are dropped, as are
/// MCQs without exactly four options and an answer index in `[0, 3]`.
/// A requested key missing from the output is an error.
pub fn reshape(raw: Value, requested: &[ContentType]) -> Result<GeneratedContent, AppError> {
    let Value::Object(mut object) = raw else {
        return Err(AppError::AiGateway(INVALID_RESPONSE.to_string()));
    };

    if let Some(missing) = requested.iter().find(|t| !object.contains_key(t.id())) {
        tracing::error!(missing = missing.id(), "AI response is missing a requested section");
        return Err(AppError::AiGateway(INVALID_RESPONSE.to_string()));
    }

    normalize_mcq_answers(&mut object);

    let mut content = GeneratedContent::default();
    for &content_type in requested {
        let value = object.remove(content_type.id()).unwrap_or(Value::Null);
        match content_type {
            ContentType::Summary => content.summary = Some(text_section(value)?),
            ContentType::KidsExplanation => content.kids_explanation = Some(text_section(value)?),
            ContentType::ProfessionalExplanation => {
                content.professional_explanation = Some(text_section(value)?)
            }
            ContentType::Flashcards => content.flashcards = Some(list_section::<Flashcard>(value)?),
            ContentType::Mcqs => content.mcqs = Some(list_section::<Mcq>(value)?),
            ContentType::TrueFalse => {
                content.true_false = Some(list_section::<TrueFalseItem>(value)?)
            }
            ContentType::Definitions => {
                content.definitions = Some(list_section::<Definition>(value)?)
            }
        }
    }

    let dropped = content.drop_malformed_mcqs();
    if dropped > 0 {
        tracing::warn!(dropped, "Dropped malformed MCQs");
    }

    content.retain_requested(requested);
    Ok(content)
}

fn text_section(value: Value) -> Result<String, AppError> {
    match value {
        Value::String(s) => Ok(s),
        _ => Err(AppError::AiGateway(INVALID_RESPONSE.to_string())),
    }
}

fn list_section<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, AppError> {
    let Value::Array(items) = value else {
        return Err(AppError::AiGateway(INVALID_RESPONSE.to_string()));
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if parsed.len() < total {
        tracing::warn!(dropped = total - parsed.len(), "Dropped malformed list entries");
    }
    Ok(parsed)
}

/// Models sometimes return `1.0` (or `"1"`) for the answer index.
/// Integral values are rewritten as integers; anything else becomes `-1`
/// so the entry is discarded as malformed.
fn normalize_mcq_answers(object: &mut Map<String, Value>) {
    let Some(Value::Array(mcqs)) = object.get_mut(ContentType::Mcqs.id()) else {
        return;
    };

    for mcq in mcqs.iter_mut() {
        let Some(answer) = mcq.get_mut("correctAnswer") else {
            continue;
        };
        if answer.is_i64() {
            continue;
        }
        let as_float = match answer {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        *answer = match as_float {
            Some(f) if f.fract() == 0.0 && f.is_finite() => Value::from(f as i64),
            _ => Value::from(-1),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn opts(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_rejects_blank_text() {
        let err = GenerationInput::parse("   \n", None, &opts(&["summary"])).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg.contains("Text Required")));
    }

    #[test]
    fn test_parse_rejects_too_long() {
        let text = "a".repeat(MAX_INPUT_CHARS + 1);
        assert!(GenerationInput::parse(&text, None, &opts(&["summary"])).is_err());

        let text = "a".repeat(MAX_INPUT_CHARS);
        assert!(GenerationInput::parse(&text, None, &opts(&["summary"])).is_ok());
    }

    #[test]
    fn test_parse_requires_options() {
        assert!(GenerationInput::parse("Photosynthesis", None, &[]).is_err());
        assert!(GenerationInput::parse("Photosynthesis", None, &opts(&["essay"])).is_err());
    }

    #[test]
    fn test_parse_defaults_difficulty() {
        let input =
            GenerationInput::parse(" Photosynthesis ", Some("galaxy-brain"), &opts(&["mcqs"]))
                .unwrap();
        assert_eq!(input.text, "Photosynthesis");
        assert_eq!(input.difficulty, Difficulty::University);
        assert_eq!(input.options, vec![ContentType::Mcqs]);
    }

    #[test]
    fn test_reshape_keeps_only_requested_keys() {
        let raw = json!({
            "summary": "Plants make sugar.",
            "flashcards": [{"question": "Q", "answer": "A"}],
            "kidsExplanation": "Plants eat sunlight."
        });
        let content = reshape(raw, &[ContentType::Summary, ContentType::Flashcards]).unwrap();

        let value = serde_json::to_value(&content).unwrap();
        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["flashcards", "summary"]);
    }

    #[test]
    fn test_reshape_missing_requested_key_is_error() {
        let raw = json!({ "summary": "S" });
        let err = reshape(raw, &[ContentType::Summary, ContentType::Mcqs]).unwrap_err();
        assert!(matches!(err, AppError::AiGateway(_)));
    }

    #[test]
    fn test_reshape_filters_mcqs() {
        let raw = json!({
            "mcqs": [
                {"question": "ok", "options": ["a", "b", "c", "d"], "correctAnswer": 2},
                {"question": "float", "options": ["a", "b", "c", "d"], "correctAnswer": 1.0},
                {"question": "three", "options": ["a", "b", "c"], "correctAnswer": 0},
                {"question": "range", "options": ["a", "b", "c", "d"], "correctAnswer": 4},
                {"question": "fraction", "options": ["a", "b", "c", "d"], "correctAnswer": 1.5},
                {"question": "missing", "options": ["a", "b", "c", "d"]}
            ]
        });
        let content = reshape(raw, &[ContentType::Mcqs]).unwrap();
        let mcqs = content.mcqs.unwrap();

        assert_eq!(mcqs.len(), 2);
        assert_eq!(mcqs[0].question, "ok");
        assert_eq!(mcqs[1].correct_answer, 1);
        assert!(mcqs.iter().all(|m| m.options.len() == 4));
        assert!(mcqs.iter().all(|m| (0..4).contains(&m.correct_answer)));
    }

    #[test]
    fn test_reshape_wrong_section_type_is_error() {
        let raw = json!({ "summary": ["not", "a", "string"] });
        assert!(reshape(raw, &[ContentType::Summary]).is_err());

        let raw = json!({ "definitions": "not a list" });
        assert!(reshape(raw, &[ContentType::Definitions]).is_err());
    }

    #[test]
    fn test_reshape_drops_malformed_entries() {
        let raw = json!({
            "trueFalse": [
                {"statement": "Water boils at 100C at sea level", "answer": true},
                {"statement": "no answer"}
            ]
        });
        let content = reshape(raw, &[ContentType::TrueFalse]).unwrap();
        assert_eq!(content.true_false.unwrap().len(), 1);
    }
}
