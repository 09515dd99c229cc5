//! Canned backend for tests and local development without `API_BASE`.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use super::VedaBackend;
use super::error::{BackendError, Result};
use super::types::{
    AudioClip, ChatIntentResponse, HymnEntry, MandalaIndex, RandomResponse, SearchResponse, Verse,
};
use crate::reference::VerseRef;

#[derive(Debug, Clone)]
enum Failure {
    Remote(String),
    Status(u16, String),
}

/// In-memory [`VedaBackend`] with call counters.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    search_results: RwLock<Vec<Verse>>,
    random_results: RwLock<Vec<Verse>>,
    indexes: RwLock<HashMap<u32, MandalaIndex>>,
    verses: RwLock<HashMap<VerseRef, Verse>>,
    audio: RwLock<HashSet<VerseRef>>,
    chat_reply: RwLock<Option<ChatIntentResponse>>,
    failure: RwLock<Option<Failure>>,
    index_calls: AtomicUsize,
    audio_calls: AtomicUsize,
    search_calls: AtomicUsize,
}

impl InMemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Results returned by every semantic search.
    #[must_use]
    pub fn with_search_results(self, results: Vec<Verse>) -> Self {
        *self.search_results.write().unwrap() = results;
        self
    }

    /// Results returned by "Surprise Me".
    #[must_use]
    pub fn with_random_results(self, results: Vec<Verse>) -> Self {
        *self.random_results.write().unwrap() = results;
        self
    }

    /// Register a mandala whose hymns have the given stanza counts
    /// (hymn numbers start at 1).
    #[must_use]
    pub fn with_mandala(self, mandala: u32, stanza_counts: &[u32]) -> Self {
        let hymns: Vec<HymnEntry> = stanza_counts
            .iter()
            .zip(1u32..)
            .map(|(&total_stanzas, hymn_number)| HymnEntry {
                hymn_number,
                total_stanzas,
            })
            .collect();
        let index = MandalaIndex {
            total_hymns: u32::try_from(hymns.len()).unwrap_or(u32::MAX),
            hymns,
        };
        self.indexes.write().unwrap().insert(mandala, index);
        self
    }

    /// Register a verse; its text is derived from the reference.
    #[must_use]
    pub fn with_verse(self, reference: VerseRef) -> Self {
        let verse = Verse {
            location: reference.to_string(),
            sanskrit: format!("मन्त्र {reference}"),
            transliteration: format!("mantra {reference}"),
            translation: format!("Translation of {reference}"),
            ..Verse::default()
        };
        self.verses.write().unwrap().insert(reference, verse);
        self
    }

    /// Make a recitation available.
    #[must_use]
    pub fn with_audio(self, reference: VerseRef) -> Self {
        self.audio.write().unwrap().insert(reference);
        self
    }

    /// Reply returned by every chat request.
    #[must_use]
    pub fn with_chat_reply(self, reply: ChatIntentResponse) -> Self {
        *self.chat_reply.write().unwrap() = Some(reply);
        self
    }

    /// Make every call fail with a backend-reported `error` field.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.write().unwrap() = Some(Failure::Remote(message.into()));
    }

    /// Make every call fail with a non-2xx status.
    pub fn fail_with_status(&self, status: u16, message: impl Into<String>) {
        *self.failure.write().unwrap() = Some(Failure::Status(status, message.into()));
    }

    /// Number of index fetches served.
    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }

    /// Number of audio fetches served.
    pub fn audio_calls(&self) -> usize {
        self.audio_calls.load(Ordering::SeqCst)
    }

    /// Number of semantic searches served.
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        match self.failure.read().unwrap().clone() {
            Some(Failure::Remote(message)) => Err(BackendError::Remote(message)),
            Some(Failure::Status(status, message)) => Err(BackendError::Api { status, message }),
            None => Ok(()),
        }
    }
}

fn not_found(message: String) -> BackendError {
    BackendError::Api {
        status: 404,
        message,
    }
}

#[async_trait]
impl VedaBackend for InMemoryBackend {
    async fn semantic_search(&self, query: &str, top_k: usize) -> Result<SearchResponse> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let results = self
            .search_results
            .read()
            .unwrap()
            .iter()
            .take(top_k)
            .cloned()
            .collect();
        Ok(SearchResponse {
            query: query.to_string(),
            results,
        })
    }

    async fn random_verses(&self) -> Result<RandomResponse> {
        self.check()?;
        let results = self.random_results.read().unwrap().clone();
        Ok(RandomResponse {
            total_results: results.len(),
            results,
        })
    }

    async fn mandala_index(&self, mandala: u32) -> Result<MandalaIndex> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.indexes
            .read()
            .unwrap()
            .get(&mandala)
            .cloned()
            .ok_or_else(|| not_found(format!("Mandala {mandala} not found")))
    }

    async fn verse(&self, verse: VerseRef) -> Result<Verse> {
        self.check()?;
        self.verses
            .read()
            .unwrap()
            .get(&verse)
            .cloned()
            .ok_or_else(|| not_found(format!("Sloka {verse} not found")))
    }

    async fn audio(&self, verse: VerseRef) -> Result<AudioClip> {
        self.audio_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        if self.audio.read().unwrap().contains(&verse) {
            Ok(AudioClip {
                content_type: "audio/mpeg".to_string(),
                data: axum::body::Bytes::from(format!("ID3 {verse}")),
            })
        } else {
            Err(not_found(format!("Audio not available for {verse}")))
        }
    }

    async fn chat_intent(&self, query: &str) -> Result<ChatIntentResponse> {
        self.check()?;
        let reply = self.chat_reply.read().unwrap().clone();
        Ok(reply.unwrap_or_else(|| {
            let mut reply = ChatIntentResponse::default();
            reply.answer.intent_used = Some("general".to_string());
            reply.answer.summary = Some(format!("You asked: {query}"));
            reply
        }))
    }
}
