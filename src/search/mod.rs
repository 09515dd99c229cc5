//! Semantic search over the backend, with local confidence filtering.
//!
//! - [`confidence`]: the distribution-based cutoff heuristic
//! - [`SearchService`]: query → backend → filter → [`SearchSession`]

pub mod confidence;

pub use confidence::{ConfidenceFilter, CutoffRule, FilterOutcome, ScorePolarity};

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::{BackendError, VedaBackend, Verse};

/// Intent label of a query-driven search.
pub const SEMANTIC_SEARCH_INTENT: &str = "semantic_search";
/// Intent label of a "Surprise Me" draw.
pub const RANDOM_INTENT: &str = "random_exploration";
/// Query shown for a "Surprise Me" draw.
pub const RANDOM_QUERY: &str = "Random Vedic Wisdom";

/// Search failures, phrased for the page.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Please enter a search query")]
    EmptyQuery,

    /// The backend reported a problem in its own words.
    #[error("{0}")]
    Remote(String),

    #[error("Failed to search. Please try again.")]
    SearchFailed(#[source] BackendError),

    #[error("Failed to fetch random verses. Please try again.")]
    RandomFailed(#[source] BackendError),
}

/// Numbers about how the displayed list was chosen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub total_fetched: usize,
    pub display_count: usize,
    pub high_confidence_count: usize,
    pub average_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<CutoffRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

/// One search and what it produced. Replaced wholesale by the next search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchSession {
    pub intent: String,
    pub query: String,
    pub summary: String,
    pub verses: Vec<Verse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<SearchMetadata>,
}

/// Runs searches against the backend.
#[derive(Debug, Clone)]
pub struct SearchService {
    backend: Arc<dyn VedaBackend>,
    filter: ConfidenceFilter,
    top_k: usize,
}

impl SearchService {
    pub fn new(backend: Arc<dyn VedaBackend>, filter: ConfidenceFilter, top_k: usize) -> Self {
        Self {
            backend,
            filter,
            top_k,
        }
    }

    /// Semantic search followed by confidence filtering.
    pub async fn search(&self, query: &str) -> Result<SearchSession, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let response = self
            .backend
            .semantic_search(query, self.top_k)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, query = %query, "Semantic search failed");
                match e {
                    BackendError::Remote(message) => SearchError::Remote(message),
                    other => SearchError::SearchFailed(other),
                }
            })?;

        let outcome = self.filter.apply(response.results, query);
        tracing::info!(
            query = %query,
            total_fetched = outcome.total_fetched,
            displayed = outcome.results.len(),
            rule = ?outcome.analysis.rule,
            "Search completed"
        );

        let metadata = SearchMetadata {
            total_fetched: outcome.total_fetched,
            display_count: outcome.results.len(),
            high_confidence_count: outcome.high_confidence_count,
            average_confidence: outcome.average_confidence,
            rule: Some(outcome.analysis.rule),
            threshold: Some(outcome.fallback_threshold.unwrap_or(outcome.threshold)),
        };

        let echoed = if response.query.trim().is_empty() {
            query.to_string()
        } else {
            response.query
        };

        Ok(SearchSession {
            intent: SEMANTIC_SEARCH_INTENT.to_string(),
            query: echoed,
            summary: format!(
                "Found {} relevant verses related to \"{query}\"",
                outcome.results.len()
            ),
            verses: outcome.results,
            metadata: Some(metadata),
        })
    }

    /// "Surprise Me": random verses, shown unfiltered at full confidence.
    pub async fn surprise_me(&self) -> Result<SearchSession, SearchError> {
        let response = self.backend.random_verses().await.map_err(|e| {
            tracing::error!(error = %e, "Random verse fetch failed");
            match e {
                BackendError::Remote(message) => SearchError::Remote(message),
                other => SearchError::RandomFailed(other),
            }
        })?;

        let total = if response.total_results == 0 {
            response.results.len()
        } else {
            response.total_results
        };
        let verses = response
            .results
            .into_iter()
            .map(|mut v| {
                v.confidence = Some(1.0);
                v
            })
            .collect();

        Ok(SearchSession {
            intent: RANDOM_INTENT.to_string(),
            query: RANDOM_QUERY.to_string(),
            summary: format!("Discover {total} randomly selected verses from the Rig Veda"),
            verses,
            metadata: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::InMemoryBackend;

    fn scored(location: &str, score: f64) -> Verse {
        Verse {
            location: location.to_string(),
            similarity_score: Some(score),
            ..Verse::default()
        }
    }

    fn service(backend: InMemoryBackend) -> (SearchService, Arc<InMemoryBackend>) {
        let backend = Arc::new(backend);
        let service = SearchService::new(
            Arc::clone(&backend) as Arc<dyn VedaBackend>,
            ConfidenceFilter::default(),
            50,
        );
        (service, backend)
    }

    #[tokio::test]
    async fn test_empty_query_never_reaches_backend() {
        let (svc, backend) = service(InMemoryBackend::new());
        let err = svc.search("   ").await.unwrap_err();
        assert_eq!(err.to_string(), "Please enter a search query");
        assert_eq!(backend.search_calls(), 0);
    }

    #[tokio::test]
    async fn test_search_filters_and_summarizes() {
        let results = vec![
            scored("1.1.1", 0.95),
            scored("1.1.2", 0.93),
            scored("1.1.3", 0.60),
            scored("1.1.4", 0.58),
            scored("1.1.5", 0.55),
            scored("1.1.6", 0.50),
        ];
        let (svc, _) = service(InMemoryBackend::new().with_search_results(results));

        let session = svc.search("hymns to the dawn").await.unwrap();
        assert_eq!(session.intent, SEMANTIC_SEARCH_INTENT);
        assert_eq!(session.query, "hymns to the dawn");
        assert!(session.verses.len() >= confidence::MIN_RESULTS);
        assert_eq!(
            session.summary,
            format!(
                "Found {} relevant verses related to \"hymns to the dawn\"",
                session.verses.len()
            )
        );
        let meta = session.metadata.unwrap();
        assert_eq!(meta.total_fetched, 6);
        assert_eq!(meta.display_count, session.verses.len());
        assert_eq!(session.verses[0].location, "1.1.1");
    }

    #[tokio::test]
    async fn test_backend_error_field_is_shown_verbatim() {
        let (svc, backend) = service(InMemoryBackend::new());
        backend.fail_with("Invalid API key");
        let err = svc.search("agni").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[tokio::test]
    async fn test_surprise_me_marks_full_confidence() {
        let random = vec![scored("3.62.10", 0.2), scored("10.129.1", 0.1)];
        let (svc, _) = service(InMemoryBackend::new().with_random_results(random));

        let session = svc.surprise_me().await.unwrap();
        assert_eq!(session.intent, RANDOM_INTENT);
        assert_eq!(session.query, RANDOM_QUERY);
        assert_eq!(
            session.summary,
            "Discover 2 randomly selected verses from the Rig Veda"
        );
        assert!(session.verses.iter().all(|v| v.confidence == Some(1.0)));
        assert!(session.metadata.is_none());
    }
}
