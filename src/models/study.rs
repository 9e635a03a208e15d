//! Study content types and the generated content shape.
//!
//! JSON keys match the option identifiers the client sends (`summary`,
//! `flashcards`, `mcqs`, `trueFalse`, `definitions`, `kidsExplanation`,
//! `professionalExplanation`).

use crate::models::quota::QuotaKind;
use serde::{Deserialize, Serialize};
use std::fmt;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Number of options every multiple-choice question carries.
pub const MCQ_OPTION_COUNT: usize = 4;

/// A content type the user can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum ContentType {
    Summary,
    Flashcards,
    Mcqs,
    TrueFalse,
    Definitions,
    KidsExplanation,
    ProfessionalExplanation,
}

impl ContentType {
    pub const ALL: [ContentType; 7] = [
        ContentType::Summary,
        ContentType::Flashcards,
        ContentType::Mcqs,
        ContentType::TrueFalse,
        ContentType::Definitions,
        ContentType::KidsExplanation,
        ContentType::ProfessionalExplanation,
    ];

    /// Wire identifier (also the JSON key in [`GeneratedContent`]).
    pub fn id(self) -> &'static str {
        match self {
            ContentType::Summary => "summary",
            ContentType::Flashcards => "flashcards",
            ContentType::Mcqs => "mcqs",
            ContentType::TrueFalse => "trueFalse",
            ContentType::Definitions => "definitions",
            ContentType::KidsExplanation => "kidsExplanation",
            ContentType::ProfessionalExplanation => "professionalExplanation",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.id() == id)
    }

    /// Quota counter charged per generated item, if any.
    pub fn quota_kind(self) -> Option<QuotaKind> {
        match self {
            ContentType::Flashcards => Some(QuotaKind::Flashcards),
            ContentType::Mcqs => Some(QuotaKind::Mcqs),
            ContentType::TrueFalse => Some(QuotaKind::TrueFalse),
            ContentType::Definitions => Some(QuotaKind::Definitions),
            ContentType::Summary
            | ContentType::KidsExplanation
            | ContentType::ProfessionalExplanation => None,
        }
    }

    /// Human-readable section title.
    pub fn title(self) -> &'static str {
        match self {
            ContentType::Summary => "Summary",
            ContentType::Flashcards => "Flashcards",
            ContentType::Mcqs => "Multiple Choice Questions",
            ContentType::TrueFalse => "True/False Questions",
            ContentType::Definitions => "Key Definitions",
            ContentType::KidsExplanation => "Kids Mode Explanation",
            ContentType::ProfessionalExplanation => "Professional Explanation",
        }
    }

    /// Parse and deduplicate client option identifiers, preserving order.
    pub fn parse_list(ids: &[String]) -> Result<Vec<ContentType>, String> {
        let mut out = Vec::with_capacity(ids.len());
        for raw in ids {
            let content_type = Self::from_id(raw.trim())
                .ok_or_else(|| format!("Unknown content type: {}", raw))?;
            if !out.contains(&content_type) {
                out.push(content_type);
            }
        }
        Ok(out)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Reading level for generated content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Kids,
    Highschool,
    #[default]
    University,
    Professional,
}

impl Difficulty {
    /// Unknown labels fall back to university level.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "kids" => Difficulty::Kids,
            "highschool" | "high_school" | "high school" => Difficulty::Highschool,
            "professional" => Difficulty::Professional,
            _ => Difficulty::University,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Difficulty::Kids => "kids",
            Difficulty::Highschool => "highschool",
            Difficulty::University => "university",
            Difficulty::Professional => "professional",
        }
    }

    /// Language guidance given to the model.
    pub fn guidance(self) -> &'static str {
        match self {
            Difficulty::Kids => "Use simple words and short sentences suitable for children aged 8-12.",
            Difficulty::Highschool => "Use clear language appropriate for high school students.",
            Difficulty::University => "Use academic language suitable for university-level students.",
            Difficulty::Professional => {
                "Use sophisticated, professional terminology for advanced learners."
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Flashcard {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Mcq {
    pub question: String,
    pub options: Vec<String>,
    /// Zero-based index into `options`
    pub correct_answer: i64,
}

impl Mcq {
    /// Exactly four options and an answer index in `[0, 3]`.
    pub fn is_well_formed(&self) -> bool {
        self.options.len() == MCQ_OPTION_COUNT
            && (0..MCQ_OPTION_COUNT as i64).contains(&self.correct_answer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TrueFalseItem {
    pub statement: String,
    pub answer: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Definition {
    pub term: String,
    pub definition: String,
}

/// Generated study content. Absent sections are omitted from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct GeneratedContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flashcards: Option<Vec<Flashcard>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcqs: Option<Vec<Mcq>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_false: Option<Vec<TrueFalseItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<Vec<Definition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kids_explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professional_explanation: Option<String>,
}

impl GeneratedContent {
    /// Whether the section is present (lists may be empty).
    pub fn has(&self, content_type: ContentType) -> bool {
        match content_type {
            ContentType::Summary => self.summary.is_some(),
            ContentType::Flashcards => self.flashcards.is_some(),
            ContentType::Mcqs => self.mcqs.is_some(),
            ContentType::TrueFalse => self.true_false.is_some(),
            ContentType::Definitions => self.definitions.is_some(),
            ContentType::KidsExplanation => self.kids_explanation.is_some(),
            ContentType::ProfessionalExplanation => self.professional_explanation.is_some(),
        }
    }

    /// Whether the section is present and has something to show.
    pub fn has_content(&self, content_type: ContentType) -> bool {
        fn text(s: &Option<String>) -> bool {
            s.as_deref().is_some_and(|t| !t.trim().is_empty())
        }
        fn list<T>(v: &Option<Vec<T>>) -> bool {
            v.as_ref().is_some_and(|l| !l.is_empty())
        }
        match content_type {
            ContentType::Summary => text(&self.summary),
            ContentType::Flashcards => list(&self.flashcards),
            ContentType::Mcqs => list(&self.mcqs),
            ContentType::TrueFalse => list(&self.true_false),
            ContentType::Definitions => list(&self.definitions),
            ContentType::KidsExplanation => text(&self.kids_explanation),
            ContentType::ProfessionalExplanation => text(&self.professional_explanation),
        }
    }

    /// Drop every section that was not requested.
    pub fn retain_requested(&mut self, requested: &[ContentType]) {
        let keep = |t: ContentType| requested.contains(&t);
        if !keep(ContentType::Summary) {
            self.summary = None;
        }
        if !keep(ContentType::Flashcards) {
            self.flashcards = None;
        }
        if !keep(ContentType::Mcqs) {
            self.mcqs = None;
        }
        if !keep(ContentType::TrueFalse) {
            self.true_false = None;
        }
        if !keep(ContentType::Definitions) {
            self.definitions = None;
        }
        if !keep(ContentType::KidsExplanation) {
            self.kids_explanation = None;
        }
        if !keep(ContentType::ProfessionalExplanation) {
            self.professional_explanation = None;
        }
    }

    /// Remove malformed MCQs. Returns how many were dropped.
    pub fn drop_malformed_mcqs(&mut self) -> usize {
        match self.mcqs.as_mut() {
            Some(mcqs) => {
                let before = mcqs.len();
                mcqs.retain(Mcq::is_well_formed);
                before - mcqs.len()
            }
            None => 0,
        }
    }

    /// Number of items in a list section (0 for text sections or absent ones).
    pub fn item_count(&self, content_type: ContentType) -> usize {
        match content_type {
            ContentType::Flashcards => self.flashcards.as_ref().map_or(0, Vec::len),
            ContentType::Mcqs => self.mcqs.as_ref().map_or(0, Vec::len),
            ContentType::TrueFalse => self.true_false.as_ref().map_or(0, Vec::len),
            ContentType::Definitions => self.definitions.as_ref().map_or(0, Vec::len),
            _ => 0,
        }
    }

    /// Truncate a list section to at most `max` items.
    pub fn truncate(&mut self, content_type: ContentType, max: usize) {
        match content_type {
            ContentType::Flashcards => {
                if let Some(v) = self.flashcards.as_mut() {
                    v.truncate(max)
                }
            }
            ContentType::Mcqs => {
                if let Some(v) = self.mcqs.as_mut() {
                    v.truncate(max)
                }
            }
            ContentType::TrueFalse => {
                if let Some(v) = self.true_false.as_mut() {
                    v.truncate(max)
                }
            }
            ContentType::Definitions => {
                if let Some(v) = self.definitions.as_mut() {
                    v.truncate(max)
                }
            }
            _ => {}
        }
    }

    /// Content types present in this value, in canonical order.
    pub fn present_types(&self) -> Vec<ContentType> {
        ContentType::ALL
            .into_iter()
            .filter(|t| self.has(*t))
            .collect()
    }
}
