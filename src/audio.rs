//! Recitation playback bookkeeping.
//!
//! Each visitor owns one [`PlaybackRegistry`]. Clips are loaded lazily on
//! first play, kept for the rest of the session, and at most one of them is
//! playing at any time.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{AudioClip, BackendError, VedaBackend};
use crate::reference::VerseRef;

/// Playback failures, phrased for the page.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("Audio not available for {0}")]
    Unavailable(String),

    #[error("Failed to load audio for {location}")]
    LoadFailed {
        location: String,
        #[source]
        source: BackendError,
    },
}

/// Acquires a playable clip for a verse.
#[async_trait]
pub trait AudioLoader: Send + Sync + std::fmt::Debug {
    async fn load(&self, verse: VerseRef) -> Result<AudioClip, BackendError>;
}

/// Loads clips from `GET /audio/{m}/{h}/{s}`.
#[derive(Debug, Clone)]
pub struct BackendAudioLoader {
    backend: Arc<dyn VedaBackend>,
}

impl BackendAudioLoader {
    pub fn new(backend: Arc<dyn VedaBackend>) -> Self {
        Self { backend }
    }
}

#[async_trait]
impl AudioLoader for BackendAudioLoader {
    async fn load(&self, verse: VerseRef) -> Result<AudioClip, BackendError> {
        self.backend.audio(verse).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Result of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Playing,
    Paused,
}

/// A loaded clip and whether it is currently playing.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    pub verse: VerseRef,
    pub clip: AudioClip,
    pub state: PlaybackState,
}

/// Per-visitor playback state.
#[derive(Debug, Default)]
pub struct PlaybackRegistry {
    handles: HashMap<VerseRef, PlaybackHandle>,
    playing: Option<VerseRef>,
}

impl PlaybackRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verse currently playing, if any.
    pub fn playing(&self) -> Option<VerseRef> {
        self.playing
    }

    /// Loaded clip for a verse.
    pub fn handle(&self, verse: VerseRef) -> Option<&PlaybackHandle> {
        self.handles.get(&verse)
    }

    /// Number of clips loaded so far.
    pub fn loaded(&self) -> usize {
        self.handles.len()
    }

    /// Play `location`, or pause it when it is the one already playing.
    ///
    /// Any other playing clip is paused first. A clip that fails to load
    /// leaves nothing playing and is not retried by this call.
    pub async fn toggle(
        &mut self,
        location: &str,
        loader: &dyn AudioLoader,
    ) -> Result<ToggleOutcome, AudioError> {
        let verse = VerseRef::from_location(location)
            .ok_or_else(|| AudioError::Unavailable(location.to_string()))?;

        if self.playing == Some(verse) {
            self.pause(verse);
            self.playing = None;
            return Ok(ToggleOutcome::Paused);
        }

        if let Some(current) = self.playing.take() {
            self.pause(current);
        }

        if !self.handles.contains_key(&verse) {
            let clip = loader.load(verse).await.map_err(|source| {
                tracing::warn!(location, error = %source, "Audio load failed");
                AudioError::LoadFailed {
                    location: location.to_string(),
                    source,
                }
            })?;
            self.handles.insert(
                verse,
                PlaybackHandle {
                    verse,
                    clip,
                    state: PlaybackState::Paused,
                },
            );
        }

        if let Some(handle) = self.handles.get_mut(&verse) {
            handle.state = PlaybackState::Playing;
        }
        self.playing = Some(verse);
        tracing::debug!(name: "audio.playing", location, "Playback started");
        Ok(ToggleOutcome::Playing)
    }

    /// The clip for `location` ran to its end.
    pub fn finished(&mut self, location: &str) {
        let Some(verse) = VerseRef::from_location(location) else {
            return;
        };
        self.pause(verse);
        if self.playing == Some(verse) {
            self.playing = None;
        }
    }

    /// Pause everything.
    pub fn stop_all(&mut self) {
        for handle in self.handles.values_mut() {
            handle.state = PlaybackState::Paused;
        }
        self.playing = None;
    }

    fn pause(&mut self, verse: VerseRef) {
        if let Some(handle) = self.handles.get_mut(&verse) {
            handle.state = PlaybackState::Paused;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingLoader {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AudioLoader for CountingLoader {
        async fn load(&self, verse: VerseRef) -> Result<AudioClip, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::Api {
                    status: 404,
                    message: "Not Found".to_string(),
                });
            }
            Ok(AudioClip {
                content_type: "audio/mpeg".to_string(),
                data: axum::body::Bytes::from(verse.to_string()),
            })
        }
    }

    fn playing_count(registry: &PlaybackRegistry) -> usize {
        registry
            .handles
            .values()
            .filter(|h| h.state == PlaybackState::Playing)
            .count()
    }

    #[tokio::test]
    async fn test_toggle_plays_then_pauses() {
        let loader = CountingLoader::default();
        let mut registry = PlaybackRegistry::new();

        let first = registry.toggle("1.1.1", &loader).await.unwrap();
        assert_eq!(first, ToggleOutcome::Playing);
        assert_eq!(registry.playing(), Some(VerseRef::new(1, 1, 1)));

        let second = registry.toggle("1.1.1", &loader).await.unwrap();
        assert_eq!(second, ToggleOutcome::Paused);
        assert_eq!(registry.playing(), None);
    }

    #[tokio::test]
    async fn test_switching_pauses_previous_clip() {
        let loader = CountingLoader::default();
        let mut registry = PlaybackRegistry::new();

        registry.toggle("1.1.1", &loader).await.unwrap();
        registry.toggle("1.1.2", &loader).await.unwrap();

        assert_eq!(registry.playing(), Some(VerseRef::new(1, 1, 2)));
        assert_eq!(
            registry.handle(VerseRef::new(1, 1, 1)).unwrap().state,
            PlaybackState::Paused
        );
        assert_eq!(playing_count(&registry), 1);
    }

    #[tokio::test]
    async fn test_clip_is_loaded_once() {
        let loader = CountingLoader::default();
        let mut registry = PlaybackRegistry::new();

        registry.toggle("2.3.4", &loader).await.unwrap();
        registry.toggle("2.3.4", &loader).await.unwrap();
        registry.toggle("2.3.4", &loader).await.unwrap();

        assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.loaded(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_nothing_playing() {
        let good = CountingLoader::default();
        let bad = CountingLoader {
            fail: true,
            ..CountingLoader::default()
        };
        let mut registry = PlaybackRegistry::new();

        registry.toggle("1.1.1", &good).await.unwrap();
        let err = registry.toggle("1.1.2", &bad).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to load audio for 1.1.2");
        assert_eq!(registry.playing(), None);
        assert_eq!(playing_count(&registry), 0);
        assert_eq!(bad.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unparseable_location() {
        let loader = CountingLoader::default();
        let mut registry = PlaybackRegistry::new();

        let err = registry.toggle("unknown", &loader).await.unwrap_err();
        assert_eq!(err.to_string(), "Audio not available for unknown");
        assert_eq!(loader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_finished_and_stop_all() {
        let loader = CountingLoader::default();
        let mut registry = PlaybackRegistry::new();

        registry.toggle("1.1.1", &loader).await.unwrap();
        registry.finished("1.1.2");
        assert_eq!(registry.playing(), Some(VerseRef::new(1, 1, 1)));

        registry.finished("1.1.1");
        assert_eq!(registry.playing(), None);

        registry.toggle("1.1.1", &loader).await.unwrap();
        registry.stop_all();
        assert_eq!(playing_count(&registry), 0);
        assert_eq!(registry.playing(), None);
    }
}
