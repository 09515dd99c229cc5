//! Client side of the Rig Veda backend.
//!
//! The explorer owns no scripture data: semantic search, intent
//! classification and the verse database all live behind `API_BASE`.
//!
//! - [`VedaBackend`]: the operations the explorer needs
//! - [`HttpBackend`]: `reqwest` implementation with optional `X-API-Key`
//! - [`types`]: wire DTOs

pub mod client;
pub mod error;
pub mod memory;
pub mod types;

pub use client::HttpBackend;
pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use types::{
    AudioClip, ChatIntentResponse, HymnEntry, IntentAnswer, MandalaIndex, Pada, RandomResponse,
    SearchResponse, Verse,
};

use async_trait::async_trait;

use crate::reference::VerseRef;

/// Operations exposed by the Rig Veda backend.
#[async_trait]
pub trait VedaBackend: Send + Sync + std::fmt::Debug {
    /// `POST /semantic/search`.
    async fn semantic_search(&self, query: &str, top_k: usize) -> error::Result<SearchResponse>;

    /// `GET /semantic/random`.
    async fn random_verses(&self) -> error::Result<RandomResponse>;

    /// `GET /index/{mandala}`.
    async fn mandala_index(&self, mandala: u32) -> error::Result<MandalaIndex>;

    /// `GET /sloka/{m}/{h}/{s}`.
    async fn verse(&self, verse: VerseRef) -> error::Result<Verse>;

    /// `GET /audio/{m}/{h}/{s}`.
    async fn audio(&self, verse: VerseRef) -> error::Result<AudioClip>;

    /// `POST /chat/intent`.
    async fn chat_intent(&self, query: &str) -> error::Result<ChatIntentResponse>;
}
