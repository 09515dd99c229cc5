//! Confidence-based filtering of semantic search results.
//!
//! The backend returns up to `top_k` verses with a raw similarity score.
//! Showing all of them buries the useful hits, so the explorer looks at the
//! shape of the score distribution and decides a cutoff and a result count:
//!
//! 1. Map each score to a confidence and sort descending (stable).
//! 2. Compute quartiles and the largest adjacent gap ("elbow") near the top.
//! 3. Pick a `(threshold, max_results)` pair from a fixed rule cascade.
//! 4. Nudge both by query length: short queries are stricter.
//! 5. Filter and truncate; relax once when too little survives.
//!
//! There is no ground truth behind these numbers. The rule order and the
//! quartile positions are kept stable so results do not shift between
//! releases.

use serde::{Deserialize, Serialize};

use crate::backend::Verse;

// =============================================================================
// Tuning
// =============================================================================

/// Confidence used when the backend omits a score.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;
/// Confidences at or above this count as "high confidence".
pub const HIGH_CONFIDENCE: f64 = 0.75;
/// Below this many survivors the filter relaxes once.
pub const MIN_RESULTS: usize = 5;

/// Number of leading adjacent pairs inspected for the elbow.
const GAP_WINDOW: usize = 20;
/// The early-elbow rule only fires for elbows before this position.
const ELBOW_MAX_POSITION: usize = 25;

const EMPTY_THRESHOLD: f64 = 0.65;
const EMPTY_MAX_RESULTS: usize = 15;

const THRESHOLD_FLOOR: f64 = 0.1;
const THRESHOLD_CEILING: f64 = 0.5;
const MAX_RESULTS_FLOOR: usize = 8;
const MAX_RESULTS_CEILING: usize = 30;

const FALLBACK_STEP: f64 = 0.1;
const FALLBACK_FLOOR: f64 = 0.08;

// =============================================================================
// Types
// =============================================================================

/// Orientation of the backend's `similarity_score`.
///
/// Some backend builds report a similarity (higher is better), others a
/// distance (lower is better).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScorePolarity {
    /// `confidence = score`
    #[default]
    Similarity,
    /// `confidence = 1 - score`
    Distance,
}

impl ScorePolarity {
    /// Map a raw score to a confidence in `[0, 1]`.
    #[must_use]
    pub fn confidence(self, score: Option<f64>) -> f64 {
        let Some(score) = score.filter(|s| s.is_finite()) else {
            return DEFAULT_CONFIDENCE;
        };
        let confidence = match self {
            Self::Similarity => score,
            Self::Distance => 1.0 - score,
        };
        confidence.clamp(0.0, 1.0)
    }
}

/// Which branch of the cascade chose the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CutoffRule {
    /// No scores at all.
    Empty,
    /// A strong leader followed by a clear drop.
    LeaderGap,
    /// A clear drop early in the list.
    EarlyElbow,
    /// The top quartile is tightly packed.
    TightTopQuartile,
    /// Scores are widely spread; cut at the median.
    WideSpread,
    /// Flat distribution; cut leniently at the lower quartile.
    LenientFallback,
}

/// Quartiles over the descending list, so `q1 >= q2 >= q3`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quartiles {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

/// The largest adjacent drop among the leading scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Elbow {
    /// Index of the score just above the drop.
    pub position: usize,
    /// Size of the drop.
    pub gap: f64,
    /// Score just above the drop.
    pub above: f64,
    /// Score just below the drop.
    pub below: f64,
}

/// Result of looking at a score distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionAnalysis {
    pub rule: CutoffRule,
    pub threshold: f64,
    pub max_results: usize,
    pub quartiles: Option<Quartiles>,
    pub elbow: Option<Elbow>,
}

/// Output of [`ConfidenceFilter::apply`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOutcome {
    /// Retained verses, highest confidence first, each with `confidence` set.
    pub results: Vec<Verse>,
    /// Number of verses the backend returned.
    pub total_fetched: usize,
    /// Retained verses with confidence of at least [`HIGH_CONFIDENCE`].
    pub high_confidence_count: usize,
    /// Mean confidence of the retained verses (0 when none).
    pub average_confidence: f64,
    /// How the cutoff was derived.
    pub analysis: DistributionAnalysis,
    /// Threshold after the query-length adjustment.
    pub threshold: f64,
    /// Result cap after the query-length adjustment.
    pub max_results: usize,
    /// How many verses passed `threshold` before any relaxation.
    pub primary_count: usize,
    /// Threshold used by the relaxation pass, when it ran.
    pub fallback_threshold: Option<f64>,
}

impl FilterOutcome {
    /// Whether the one-shot relaxation produced the results.
    pub fn fallback_applied(&self) -> bool {
        self.fallback_threshold.is_some()
    }
}

// =============================================================================
// Distribution analysis
// =============================================================================

/// Choose a cutoff for a list of confidences.
///
/// The input does not need to be sorted.
#[must_use]
pub fn analyze_distribution(scores: &[f64]) -> DistributionAnalysis {
    if scores.is_empty() {
        return DistributionAnalysis {
            rule: CutoffRule::Empty,
            threshold: EMPTY_THRESHOLD,
            max_results: EMPTY_MAX_RESULTS,
            quartiles: None,
            elbow: None,
        };
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let n = sorted.len();

    let quartiles = Quartiles {
        q1: sorted[n / 4],
        q2: sorted[n / 2],
        q3: sorted[n * 3 / 4],
    };
    let elbow = find_elbow(&sorted);
    let top = sorted[0];
    let range = top - sorted[n - 1];

    let (rule, threshold, max_results) = match elbow {
        Some(e) if top >= 0.5 && e.gap > 0.05 => (
            CutoffRule::LeaderGap,
            e.below.max(0.2),
            (e.position + 5).min(15),
        ),
        Some(e) if e.gap > 0.04 && e.position < ELBOW_MAX_POSITION => (
            CutoffRule::EarlyElbow,
            e.below.max(0.15),
            (e.position + 8).min(20),
        ),
        _ if quartiles.q1 >= 0.35 && quartiles.q1 - quartiles.q3 < 0.15 => (
            CutoffRule::TightTopQuartile,
            (quartiles.q3 - 0.02).max(0.18),
            (n * 3 / 4 + 5).min(18),
        ),
        _ if range > 0.15 => (
            CutoffRule::WideSpread,
            quartiles.q2.max(0.15),
            (n / 2 + 10).min(25),
        ),
        _ => (
            CutoffRule::LenientFallback,
            quartiles.q3.max(0.1),
            n.min(30),
        ),
    };

    DistributionAnalysis {
        rule,
        threshold,
        max_results,
        quartiles: Some(quartiles),
        elbow,
    }
}

/// Largest drop among the first [`GAP_WINDOW`] adjacent pairs of a
/// descending list. Ties go to the earliest position.
fn find_elbow(sorted: &[f64]) -> Option<Elbow> {
    let pairs = GAP_WINDOW.min(sorted.len().saturating_sub(1));
    let mut best: Option<Elbow> = None;
    for position in 0..pairs {
        let gap = sorted[position] - sorted[position + 1];
        if best.is_none_or(|b| gap > b.gap) {
            best = Some(Elbow {
                position,
                gap,
                above: sorted[position],
                below: sorted[position + 1],
            });
        }
    }
    best
}

/// Threshold and count adjustment for the query's word count.
///
/// One- and two-word queries are vague and get a stricter cut; queries of
/// six words or more are specific enough to show more.
#[must_use]
pub fn query_adjustment(query: &str) -> (f64, isize) {
    match query.split_whitespace().count() {
        0..=2 => (0.02, -3),
        6.. => (-0.02, 5),
        _ => (0.0, 0),
    }
}

// =============================================================================
// Filter
// =============================================================================

/// Filters and ranks backend results by confidence.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceFilter {
    polarity: ScorePolarity,
}

impl ConfidenceFilter {
    #[must_use]
    pub fn new(polarity: ScorePolarity) -> Self {
        Self { polarity }
    }

    #[must_use]
    pub fn polarity(&self) -> ScorePolarity {
        self.polarity
    }

    /// Score, sort, cut and (if needed) relax.
    pub fn apply(&self, results: Vec<Verse>, query: &str) -> FilterOutcome {
        let total_fetched = results.len();

        let mut ranked: Vec<Verse> = results
            .into_iter()
            .map(|mut verse| {
                verse.confidence = Some(self.polarity.confidence(verse.similarity_score));
                verse
            })
            .collect();
        // `sort_by` is stable: equal confidences keep the backend's order.
        ranked.sort_by(|a, b| confidence(b).total_cmp(&confidence(a)));

        let scores: Vec<f64> = ranked.iter().map(confidence).collect();
        let analysis = analyze_distribution(&scores);

        let (threshold_delta, max_delta) = query_adjustment(query);
        let threshold =
            (analysis.threshold + threshold_delta).clamp(THRESHOLD_FLOOR, THRESHOLD_CEILING);
        let max_results = analysis
            .max_results
            .saturating_add_signed(max_delta)
            .clamp(MAX_RESULTS_FLOOR, MAX_RESULTS_CEILING);

        let primary_count = scores
            .iter()
            .take(max_results)
            .take_while(|&&c| c >= threshold)
            .count();

        let (keep, fallback_threshold) = if primary_count < MIN_RESULTS && total_fetched >= MIN_RESULTS
        {
            // Never relax less than what it takes to reach MIN_RESULTS.
            let relaxed = (threshold - FALLBACK_STEP)
                .max(FALLBACK_FLOOR)
                .min(scores[MIN_RESULTS - 1]);
            let cap = max_results.max(MAX_RESULTS_FLOOR);
            let kept = scores.iter().take(cap).take_while(|&&c| c >= relaxed).count();
            (kept, Some(relaxed))
        } else {
            (primary_count, None)
        };

        ranked.truncate(keep);

        let high_confidence_count = ranked
            .iter()
            .filter(|v| confidence(v) >= HIGH_CONFIDENCE)
            .count();
        let average_confidence = if ranked.is_empty() {
            0.0
        } else {
            ranked.iter().map(confidence).sum::<f64>() / ranked.len() as f64
        };

        tracing::debug!(
            name: "search.filtered",
            rule = ?analysis.rule,
            threshold,
            max_results,
            primary_count,
            retained = ranked.len(),
            total_fetched,
            fallback = fallback_threshold.is_some(),
            "Confidence filter applied"
        );

        FilterOutcome {
            results: ranked,
            total_fetched,
            high_confidence_count,
            average_confidence,
            analysis,
            threshold,
            max_results,
            primary_count,
            fallback_threshold,
        }
    }
}

fn confidence(verse: &Verse) -> f64 {
    verse.confidence.unwrap_or(DEFAULT_CONFIDENCE)
}
