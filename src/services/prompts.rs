// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt text and tool schema for study material generation.

use crate::models::{ContentType, Difficulty};
use serde_json::{json, Map, Value};

/// Name of the forced tool call.
pub const TOOL_NAME: &str = "generate_study_materials";

pub const TOOL_DESCRIPTION: &str = "Generate comprehensive study materials from the provided text";

/// System prompt for a generation request.
pub fn system_prompt(difficulty: Difficulty, options: &[ContentType]) -> String {
    let requested = options
        .iter()
        .map(|o| o.id())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are an expert educational content generator. Your task is to analyze the provided \
         text and generate high-quality study materials.\n\
         \n\
         Difficulty level: {level}\n\
         {guidance}\n\
         \n\
         Generate ONLY the requested content types from this list: {requested}\n\
         \n\
         Guidelines:\n\
         - Be accurate and comprehensive\n\
         - Extract key concepts and important information\n\
         - Make content engaging and easy to understand\n\
         - For MCQs: provide 4 options with exactly one correct answer\n\
         - For flashcards: create clear questions with concise answers\n\
         - For definitions: identify the most important terms\n\
         - Adapt language complexity to the difficulty level",
        level = difficulty.label().to_uppercase(),
        guidance = difficulty.guidance(),
    )
}

/// JSON schema for one content type's property.
fn property_schema(content_type: ContentType) -> Value {
    match content_type {
        ContentType::Summary => json!({
            "type": "string",
            "description": "A concise summary (150-200 words) capturing the main ideas",
        }),
        ContentType::Flashcards => json!({
            "type": "array",
            "description": "10-15 flashcards for active recall",
            "items": {
                "type": "object",
                "properties": {
                    "question": { "type": "string" },
                    "answer": { "type": "string" },
                },
                "required": ["question", "answer"],
            },
        }),
        ContentType::Mcqs => json!({
            "type": "array",
            "description": "10-15 multiple choice questions with 4 options each",
            "items": {
                "type": "object",
                "properties": {
                    "question": { "type": "string" },
                    "options": {
                        "type": "array",
                        "items": { "type": "string" },
                        "minItems": 4,
                        "maxItems": 4,
                    },
                    "correctAnswer": {
                        "type": "number",
                        "description": "Index of the correct answer (0-3)",
                        "minimum": 0,
                        "maximum": 3,
                    },
                },
                "required": ["question", "options", "correctAnswer"],
            },
        }),
        ContentType::TrueFalse => json!({
            "type": "array",
            "description": "10 true/false statements",
            "items": {
                "type": "object",
                "properties": {
                    "statement": { "type": "string" },
                    "answer": { "type": "boolean" },
                },
                "required": ["statement", "answer"],
            },
        }),
        ContentType::Definitions => json!({
            "type": "array",
            "description": "10 important terms with definitions",
            "items": {
                "type": "object",
                "properties": {
                    "term": { "type": "string" },
                    "definition": { "type": "string" },
                },
                "required": ["term", "definition"],
            },
        }),
        ContentType::KidsExplanation => json!({
            "type": "string",
            "description": "A simple, child-friendly explanation (100-150 words)",
        }),
        ContentType::ProfessionalExplanation => json!({
            "type": "string",
            "description": "A detailed, professional explanation (150-200 words)",
        }),
    }
}

/// Tool parameter schema: only the requested properties, all required.
pub fn parameters_schema(options: &[ContentType]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::with_capacity(options.len());

    for &option in options {
        properties.insert(option.id().to_string(), property_schema(option));
        required.push(Value::String(option.id().to_string()));
    }

    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// Instruction for image text extraction.
pub const OCR_PROMPT: &str = "Extract all readable text from this image. Return only the text \
     exactly as it appears, preserving the reading order. If there is no readable text, return \
     an empty response.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_only_requested_properties() {
        let schema = parameters_schema(&[ContentType::Summary, ContentType::Mcqs]);

        let props = schema["properties"].as_object().unwrap();
        assert_eq!(props.len(), 2);
        assert!(props.contains_key("summary"));
        assert!(props.contains_key("mcqs"));
        assert_eq!(schema["required"], json!(["summary", "mcqs"]));
        assert_eq!(schema["additionalProperties"], false);
    }

    #[test]
    fn test_schema_uses_wire_keys() {
        let schema =
            parameters_schema(&[ContentType::TrueFalse, ContentType::ProfessionalExplanation]);
        assert!(schema["properties"]["trueFalse"].is_object());
        assert!(schema["properties"]["professionalExplanation"].is_object());
        assert_eq!(
            schema["properties"]["trueFalse"]["items"]["properties"]["answer"]["type"],
            "boolean"
        );
    }

    #[test]
    fn test_mcq_schema_constraints() {
        let schema = parameters_schema(&[ContentType::Mcqs]);
        let item = &schema["properties"]["mcqs"]["items"];
        assert_eq!(item["properties"]["options"]["minItems"], 4);
        assert_eq!(item["properties"]["options"]["maxItems"], 4);
        assert_eq!(item["properties"]["correctAnswer"]["maximum"], 3);
    }

    #[test]
    fn test_system_prompt_mentions_level_and_options() {
        let prompt = system_prompt(
            Difficulty::Kids,
            &[ContentType::Flashcards, ContentType::KidsExplanation],
        );
        assert!(prompt.contains("Difficulty level: KIDS"));
        assert!(prompt.contains("children aged 8-12"));
        assert!(prompt.contains("flashcards, kidsExplanation"));
    }
}
