//! Reference navigation: mandala → sukta → mantra → verse.
//!
//! The explorer walks the user through four steps (pick a mandala, a hymn,
//! a stanza, then read the verse) or accepts `M.H.S` shorthand directly.
//! Hymn indexes are cached for the life of the process.

mod cache;

pub use cache::HymnIndexCache;

use std::ops::RangeInclusive;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backend::{BackendError, MandalaIndex, VedaBackend, Verse};
use crate::reference::{ReferenceError, VerseRef, is_valid_mandala};

/// Longest option list a searchable dropdown renders.
pub const MAX_OPTIONS: usize = 100;

/// Navigation failures, phrased for the page.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Mandala must be between 1-10")]
    InvalidMandala(u32),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("Sukta {hymn} not found in Mandala {mandala}")]
    UnknownHymn { mandala: u32, hymn: u32 },

    #[error("Please fill all fields")]
    IncompleteSelection,

    #[error("Unknown direction: {0}")]
    UnknownDirection(String),

    #[error("This is the last mantra in this sukta")]
    LastMantra,

    #[error("This is the first mantra in this sukta")]
    FirstMantra,

    /// The backend reported a problem in its own words.
    #[error("{0}")]
    Remote(String),

    #[error("Could not load data")]
    IndexUnavailable(#[source] BackendError),

    #[error("Failed to fetch")]
    FetchFailed(#[source] BackendError),
}

impl NavigationError {
    /// Whether the failure came from user input rather than the backend.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            Self::Remote(_) | Self::IndexUnavailable(_) | Self::FetchFailed(_)
        )
    }
}

/// Which neighbour [`Navigator::step`] moves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "next")]
    Next,
    #[serde(rename = "prev", alias = "previous")]
    Previous,
}

impl std::str::FromStr for Direction {
    type Err = NavigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "next" => Ok(Self::Next),
            "prev" | "previous" => Ok(Self::Previous),
            other => Err(NavigationError::UnknownDirection(other.to_string())),
        }
    }
}

/// A verse together with the reference it was fetched for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocatedVerse {
    pub reference: VerseRef,
    pub verse: Verse,
}

/// Wizard position derived from what has been chosen so far.
///
/// 1 = choose mandala, 2 = choose sukta, 3 = choose mantra, 4 = read.
pub fn current_step(mandala: Option<u32>, hymn: Option<u32>, stanza: Option<u32>) -> u8 {
    match (mandala, hymn, stanza) {
        (None, _, _) => 1,
        (Some(_), None, _) => 2,
        (Some(_), Some(_), None) => 3,
        (Some(_), Some(_), Some(_)) => 4,
    }
}

/// Hymn numbers whose decimal form contains `text`, capped at [`MAX_OPTIONS`].
pub fn filter_hymns(index: &MandalaIndex, text: &str) -> Vec<u32> {
    filter_numbers(index.hymns.iter().map(|h| h.hymn_number), text)
}

/// Stanza numbers `1..=count` whose decimal form contains `text`, capped at
/// [`MAX_OPTIONS`].
pub fn filter_stanzas(count: u32, text: &str) -> Vec<u32> {
    filter_numbers(1..=count, text)
}

fn filter_numbers(numbers: impl Iterator<Item = u32>, text: &str) -> Vec<u32> {
    let needle = text.trim();
    numbers
        .filter(|n| needle.is_empty() || n.to_string().contains(needle))
        .take(MAX_OPTIONS)
        .collect()
}

/// Drives the explorer against the backend.
#[derive(Debug, Clone)]
pub struct Navigator {
    backend: Arc<dyn VedaBackend>,
    cache: HymnIndexCache,
}

impl Navigator {
    pub fn new(backend: Arc<dyn VedaBackend>, cache: HymnIndexCache) -> Self {
        Self { backend, cache }
    }

    /// Hymn index of a mandala, from cache when possible.
    pub async fn select_mandala(&self, mandala: u32) -> Result<MandalaIndex, NavigationError> {
        if !is_valid_mandala(mandala) {
            return Err(NavigationError::InvalidMandala(mandala));
        }
        self.cache
            .get_or_fetch(self.backend.as_ref(), mandala)
            .await
            .map_err(|e| {
                tracing::warn!(mandala, error = %e, "Hymn index unavailable");
                match e {
                    BackendError::Remote(message) => NavigationError::Remote(message),
                    other => NavigationError::IndexUnavailable(other),
                }
            })
    }

    /// Number of stanzas in a hymn.
    pub async fn stanza_count(&self, mandala: u32, hymn: u32) -> Result<u32, NavigationError> {
        let index = self.select_mandala(mandala).await?;
        index
            .hymn(hymn)
            .map(|entry| entry.total_stanzas)
            .ok_or(NavigationError::UnknownHymn { mandala, hymn })
    }

    /// Valid mantra numbers of a hymn.
    pub async fn mantra_range(
        &self,
        mandala: u32,
        hymn: u32,
    ) -> Result<RangeInclusive<u32>, NavigationError> {
        Ok(1..=self.stanza_count(mandala, hymn).await?)
    }

    /// Fetch one verse.
    pub async fn lookup(&self, reference: VerseRef) -> Result<LocatedVerse, NavigationError> {
        reference.validate()?;
        let verse = self.backend.verse(reference).await.map_err(|e| {
            tracing::warn!(reference = %reference, error = %e, "Verse lookup failed");
            match e {
                BackendError::Remote(message) => NavigationError::Remote(message),
                other => NavigationError::FetchFailed(other),
            }
        })?;
        Ok(LocatedVerse { reference, verse })
    }

    /// Look up a partially filled selection; every part is required.
    pub async fn lookup_selection(
        &self,
        mandala: Option<u32>,
        hymn: Option<u32>,
        stanza: Option<u32>,
    ) -> Result<LocatedVerse, NavigationError> {
        match (mandala, hymn, stanza) {
            (Some(m), Some(h), Some(s)) => self.lookup(VerseRef::new(m, h, s)).await,
            _ => Err(NavigationError::IncompleteSelection),
        }
    }

    /// Parse `M.H.S` shorthand and fetch the verse.
    pub async fn quick_lookup(&self, input: &str) -> Result<LocatedVerse, NavigationError> {
        let reference = VerseRef::parse(input)?;
        self.lookup(reference).await
    }

    /// Move to the neighbouring mantra within the same sukta.
    pub async fn step(
        &self,
        reference: VerseRef,
        direction: Direction,
    ) -> Result<LocatedVerse, NavigationError> {
        let target = match direction {
            Direction::Next => {
                let total = self.stanza_count(reference.mandala, reference.hymn).await?;
                if reference.stanza >= total {
                    return Err(NavigationError::LastMantra);
                }
                reference.with_stanza(reference.stanza + 1)
            }
            Direction::Previous => {
                if reference.stanza <= 1 {
                    return Err(NavigationError::FirstMantra);
                }
                reference.with_stanza(reference.stanza - 1)
            }
        };
        tracing::debug!(from = %reference, to = %target, "Explorer step");
        self.lookup(target).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{HymnEntry, InMemoryBackend};

    fn navigator(backend: InMemoryBackend) -> (Navigator, Arc<InMemoryBackend>) {
        let backend = Arc::new(backend);
        let nav = Navigator::new(Arc::clone(&backend) as Arc<dyn VedaBackend>, HymnIndexCache::new());
        (nav, backend)
    }

    fn hymn_index(count: u32) -> MandalaIndex {
        MandalaIndex {
            total_hymns: count,
            hymns: (1..=count)
                .map(|hymn_number| HymnEntry {
                    hymn_number,
                    total_stanzas: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn test_current_step() {
        assert_eq!(current_step(None, None, None), 1);
        assert_eq!(current_step(Some(1), None, None), 2);
        assert_eq!(current_step(Some(1), Some(2), None), 3);
        assert_eq!(current_step(Some(1), Some(2), Some(3)), 4);
        assert_eq!(current_step(None, Some(2), Some(3)), 1);
    }

    #[test]
    fn test_filter_hymns_by_substring() {
        let index = hymn_index(25);
        assert_eq!(filter_hymns(&index, "2"), vec![2, 12, 20, 21, 22, 23, 24, 25]);
        assert_eq!(filter_hymns(&index, "").len(), 25);
        assert!(filter_hymns(&index, "99").is_empty());
    }

    #[test]
    fn test_filter_stanzas_caps_options() {
        assert_eq!(filter_stanzas(250, "").len(), MAX_OPTIONS);
        assert_eq!(filter_stanzas(12, " 1 "), vec![1, 10, 11, 12]);
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("next".parse::<Direction>().unwrap(), Direction::Next);
        assert_eq!("Prev".parse::<Direction>().unwrap(), Direction::Previous);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[tokio::test]
    async fn test_select_mandala_rejects_out_of_range() {
        let (nav, backend) = navigator(InMemoryBackend::new());
        let err = nav.select_mandala(11).await.unwrap_err();
        assert_eq!(err.to_string(), "Mandala must be between 1-10");
        assert_eq!(backend.index_calls(), 0);
    }

    #[tokio::test]
    async fn test_index_is_fetched_once() {
        let (nav, backend) = navigator(InMemoryBackend::new().with_mandala(3, &[4, 6]));
        assert_eq!(nav.stanza_count(3, 2).await.unwrap(), 6);
        assert_eq!(nav.mantra_range(3, 1).await.unwrap(), 1..=4);
        assert_eq!(backend.index_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_hymn() {
        let (nav, _) = navigator(InMemoryBackend::new().with_mandala(3, &[4]));
        let err = nav.stanza_count(3, 9).await.unwrap_err();
        assert!(matches!(
            err,
            NavigationError::UnknownHymn {
                mandala: 3,
                hymn: 9
            }
        ));
    }

    #[tokio::test]
    async fn test_quick_lookup() {
        let (nav, _) = navigator(InMemoryBackend::new().with_verse(VerseRef::new(1, 10, 3)));
        let found = nav.quick_lookup("1.10.3").await.unwrap();
        assert_eq!(found.reference, VerseRef::new(1, 10, 3));
        assert_eq!(found.verse.translation, "Translation of 1.10.3");

        let err = nav.quick_lookup("1.10").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid format. Use: Mandala.Sukta.Mantra (e.g., 1.10.129)"
        );
        assert!(err.is_user_error());
    }

    #[tokio::test]
    async fn test_lookup_selection_requires_all_fields() {
        let (nav, _) = navigator(InMemoryBackend::new());
        let err = nav.lookup_selection(Some(1), None, Some(2)).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill all fields");
    }

    #[tokio::test]
    async fn test_step_within_hymn() {
        let backend = InMemoryBackend::new()
            .with_mandala(1, &[3])
            .with_verse(VerseRef::new(1, 1, 2))
            .with_verse(VerseRef::new(1, 1, 3));
        let (nav, _) = navigator(backend);

        let next = nav
            .step(VerseRef::new(1, 1, 2), Direction::Next)
            .await
            .unwrap();
        assert_eq!(next.reference, VerseRef::new(1, 1, 3));

        let prev = nav
            .step(VerseRef::new(1, 1, 3), Direction::Previous)
            .await
            .unwrap();
        assert_eq!(prev.reference, VerseRef::new(1, 1, 2));
    }

    #[tokio::test]
    async fn test_step_stops_at_bounds() {
        let (nav, _) = navigator(InMemoryBackend::new().with_mandala(1, &[3]));

        let last = nav
            .step(VerseRef::new(1, 1, 3), Direction::Next)
            .await
            .unwrap_err();
        assert_eq!(last.to_string(), "This is the last mantra in this sukta");

        let first = nav
            .step(VerseRef::new(1, 1, 1), Direction::Previous)
            .await
            .unwrap_err();
        assert_eq!(first.to_string(), "This is the first mantra in this sukta");
    }

    #[tokio::test]
    async fn test_backend_error_field_is_surfaced() {
        let (nav, backend) = navigator(InMemoryBackend::new());
        backend.fail_with("Sloka not found");
        let err = nav.lookup(VerseRef::new(2, 2, 2)).await.unwrap_err();
        assert_eq!(err.to_string(), "Sloka not found");
        assert!(!err.is_user_error());
    }

    #[tokio::test]
    async fn test_missing_verse_is_fetch_failure() {
        let (nav, _) = navigator(InMemoryBackend::new());
        let err = nav.lookup(VerseRef::new(2, 2, 2)).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to fetch");
    }
}
