//! Rig Veda Explorer
//!
//! A web front end for exploring the Rig Veda: semantic search with
//! confidence filtering, an intent-driven chat guide, and navigation by
//! mandala, sukta and mantra with recitation playback. Scripture data, search
//! and intent classification live in a separate backend reached over REST.
//!
//! # Architecture
//!
//! - **Server**: Axum HTTP server rendering HTML pages plus a JSON API
//! - **Backend client**: `reqwest` client for the verse service
//! - **UI**: server-rendered HTML with HTMX-boosted navigation
//!
//! # Modules
//!
//! - [`backend`]: REST client trait, implementation and wire types
//! - [`reference`]: `Mandala.Sukta.Mantra` references
//! - [`search`]: semantic search and the confidence filter
//! - [`explorer`]: reference navigation and the hymn index cache
//! - [`audio`]: per-visitor playback registry
//! - [`chat`]: intent chat
//! - [`session`]: per-visitor state

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::implicit_hasher)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod audio;
pub mod backend;
pub mod chat;
pub mod config;
pub mod content;
pub mod error;
pub mod explorer;
pub mod reference;
pub mod search;
pub mod security;
pub mod server;
pub mod session;
pub mod ui;

use std::sync::Arc;

use crate::audio::{AudioLoader, BackendAudioLoader};
use crate::backend::VedaBackend;
use crate::chat::ChatService;
use crate::config::AppConfig;
use crate::explorer::{HymnIndexCache, Navigator};
use crate::search::{ConfidenceFilter, SearchService};
use crate::security::RateLimiter;
use crate::session::SessionStore;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Verse service client.
    pub backend: Arc<dyn VedaBackend>,
    pub search: SearchService,
    pub navigator: Navigator,
    pub chat: ChatService,
    /// Acquires recitation clips for playback registries.
    pub audio_loader: Arc<dyn AudioLoader>,
    /// Session store for per-visitor state.
    pub sessions: SessionStore,
    /// Global Rate Limiter
    pub rate_limiter: Arc<RateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Wire every service to one backend.
    pub fn new(config: Arc<AppConfig>, backend: Arc<dyn VedaBackend>) -> Self {
        let filter = ConfidenceFilter::new(config.search.score_polarity);
        Self {
            search: SearchService::new(Arc::clone(&backend), filter, config.search.top_k),
            navigator: Navigator::new(Arc::clone(&backend), HymnIndexCache::new()),
            chat: ChatService::new(Arc::clone(&backend)),
            audio_loader: Arc::new(BackendAudioLoader::new(Arc::clone(&backend))),
            sessions: SessionStore::new(),
            rate_limiter: Arc::new(RateLimiter::new(
                config.resilience.requests_per_second,
                config.resilience.burst_size,
            )),
            backend,
            config,
        }
    }
}
