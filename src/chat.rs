//! Intent chat with the Rig Veda backend.
//!
//! The backend classifies each question, picks matching slokas and writes a
//! summary, interpretation and reflection. This module keeps the transcript
//! on the visitor's session and decides how replies are presented.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendError, ChatIntentResponse, VedaBackend, Verse};
use crate::session::Session;

/// Slokas rendered inline under an assistant reply.
pub const INLINE_SLOKAS: usize = 2;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Please enter a message")]
    EmptyMessage,

    /// The backend reported a problem in its own words.
    #[error("{0}")]
    Remote(String),

    #[error("Failed to get response from chat API. Please try again.")]
    Failed(#[source] BackendError),
}

/// One entry of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ChatMessage {
    User { text: String },
    Assistant { reply: ChatIntentResponse },
}

/// Intent classification reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    SemanticSearch,
    VerseLookup,
    Explanation,
    General,
}

impl IntentKind {
    /// Unknown or missing labels count as general conversation.
    pub fn from_label(label: Option<&str>) -> Self {
        match label.map(str::trim) {
            Some("semantic_search") => Self::SemanticSearch,
            Some("verse_lookup") => Self::VerseLookup,
            Some("explanation") => Self::Explanation,
            _ => Self::General,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::SemanticSearch => "Cosmic Search",
            Self::VerseLookup => "Sacred Verse",
            Self::Explanation => "Divine Wisdom",
            Self::General => "Sacred Dialogue",
        }
    }
}

/// How an assistant reply is laid out on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplyView<'a> {
    pub intent: IntentKind,
    pub title: &'static str,
    pub inline: &'a [Verse],
    pub hidden: usize,
}

impl<'a> ReplyView<'a> {
    pub fn new(reply: &'a ChatIntentResponse) -> Self {
        let intent = IntentKind::from_label(reply.answer.intent_used.as_deref());
        let shown = reply.slokas.len().min(INLINE_SLOKAS);
        Self {
            intent,
            title: intent.title(),
            inline: &reply.slokas[..shown],
            hidden: reply.slokas.len() - shown,
        }
    }

    /// Footer counting the slokas not shown inline.
    pub fn more_note(&self) -> Option<String> {
        (self.hidden > 0).then(|| format!("... and {} more sacred verses await", self.hidden))
    }
}

/// Sends chat turns and records them on the session.
#[derive(Debug, Clone)]
pub struct ChatService {
    backend: Arc<dyn VedaBackend>,
}

impl ChatService {
    pub fn new(backend: Arc<dyn VedaBackend>) -> Self {
        Self { backend }
    }

    /// One chat turn.
    ///
    /// The user message is recorded before the backend is called and stays
    /// in the transcript even when the call fails.
    pub async fn send(
        &self,
        session: &Session,
        text: &str,
    ) -> Result<ChatIntentResponse, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        session.push_chat(ChatMessage::User {
            text: text.to_string(),
        });

        let reply = self.backend.chat_intent(text).await.map_err(|e| {
            tracing::error!(session_id = %session.id(), error = %e, "Chat request failed");
            match e {
                BackendError::Remote(message) => ChatError::Remote(message),
                other => ChatError::Failed(other),
            }
        })?;

        tracing::info!(
            session_id = %session.id(),
            intent = ?IntentKind::from_label(reply.answer.intent_used.as_deref()),
            slokas = reply.slokas.len(),
            "Chat reply received"
        );
        session.push_chat(ChatMessage::Assistant {
            reply: reply.clone(),
        });
        Ok(reply)
    }
}
