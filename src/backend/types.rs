//! Wire types for the Rig Veda backend.
//!
//! These mirror the JSON the backend returns. Unknown fields are ignored so
//! the explorer keeps working when the backend grows new attributes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Verses
// =============================================================================

/// A single verse (sloka) as returned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    /// Reference in `mandala.hymn.stanza` form, e.g. `1.1.1`.
    #[serde(default)]
    pub location: String,
    /// Devanagari text.
    #[serde(default)]
    pub sanskrit: String,
    /// Roman transliteration.
    #[serde(default)]
    pub transliteration: String,
    /// Primary English translation.
    #[serde(default)]
    pub translation: String,
    /// Translations keyed by translator.
    #[serde(default)]
    pub translations: BTreeMap<String, String>,
    /// Word-by-word analysis.
    #[serde(default)]
    pub padas: Vec<Pada>,
    /// Raw score from semantic search, when the verse came from a search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity_score: Option<f64>,
    /// Confidence computed locally from `similarity_score`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Verse {
    /// Translations other than Griffith's, which is already shown as the
    /// primary translation.
    pub fn alternative_translations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.translations
            .iter()
            .filter(|(translator, _)| !translator.eq_ignore_ascii_case("griffith"))
            .map(|(translator, text)| (translator.as_str(), text.as_str()))
    }
}

/// Grammatical analysis of one word of a verse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pada {
    /// Surface form as it appears in the verse.
    #[serde(default)]
    pub form: String,
    /// Dictionary form.
    #[serde(default)]
    pub lemma: String,
    /// Remaining grammatical tags (case, number, gender, ...).
    #[serde(flatten)]
    pub features: BTreeMap<String, serde_json::Value>,
}

// =============================================================================
// Search
// =============================================================================

/// Body of `POST /semantic/search`.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub top_k: usize,
}

/// Response of `POST /semantic/search`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<Verse>,
}

/// Response of `GET /semantic/random`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RandomResponse {
    #[serde(default)]
    pub total_results: usize,
    #[serde(default)]
    pub results: Vec<Verse>,
}

// =============================================================================
// Index
// =============================================================================

/// Hymn index of one mandala (`GET /index/{mandala}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MandalaIndex {
    #[serde(default)]
    pub total_hymns: u32,
    #[serde(default)]
    pub hymns: Vec<HymnEntry>,
}

impl MandalaIndex {
    /// Look up a hymn by its number.
    pub fn hymn(&self, hymn_number: u32) -> Option<&HymnEntry> {
        self.hymns.iter().find(|h| h.hymn_number == hymn_number)
    }
}

/// One hymn (sukta) in a mandala index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HymnEntry {
    pub hymn_number: u32,
    pub total_stanzas: u32,
}

// =============================================================================
// Chat
// =============================================================================

/// Body of `POST /chat/intent`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatIntentRequest {
    pub query: String,
}

/// Response of `POST /chat/intent`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatIntentResponse {
    #[serde(default)]
    pub answer: IntentAnswer,
    #[serde(default)]
    pub slokas: Vec<Verse>,
}

/// The textual part of a chat answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntentAnswer {
    #[serde(default)]
    pub intent_used: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub interpretation: Option<String>,
    #[serde(default)]
    pub reflection: Option<String>,
}

// =============================================================================
// Audio
// =============================================================================

/// A recitation clip fetched from `GET /audio/{m}/{h}/{s}`.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Content type reported by the backend (defaults to `audio/mpeg`).
    pub content_type: String,
    /// Raw audio bytes.
    pub data: axum::body::Bytes,
}
