//! Lexical text sentiment estimator.
//!
//! Maps free text to one of the five [`Mood`]s with a confidence score. Two
//! layers contribute to each mood's score:
//!
//! 1. **Keyword table** — one point per characteristic keyword present as a
//!    substring of the lower-cased text.
//! 2. **Marker adjustments** — negation markers add half a point to
//!    `stressed`, positive markers add a point to `energized`, fatigue markers
//!    add a point to `stressed`. Each adjustment applies at most once.
//!
//! The strictly highest score wins. Ties at the top and the all-zero case
//! resolve to `neutral`. Confidence reflects keyword density: the same score
//! in shorter text yields a higher confidence.

use crate::config::SentimentConfig;
use crate::error::{MoodError, Result};
use crate::mood::{Mood, MoodEstimate, clamp_confidence};

// ── Keyword tables ──────────────────────────────────────────────────────

/// (mood, keywords) in scan order.
const MOOD_TABLE: &[(Mood, &[&str])] = &[
    (
        Mood::Calm,
        &[
            "calm", "peaceful", "relaxed", "serene", "tranquil", "quiet", "still", "gentle",
            "content", "restful",
        ],
    ),
    (
        Mood::Energized,
        &[
            "energized",
            "excited",
            "motivated",
            "active",
            "enthusiastic",
            "pumped",
            "hyper",
            "driven",
            "dynamic",
            "vigorous",
        ],
    ),
    (
        Mood::Stressed,
        &[
            "stressed",
            "anxious",
            "worried",
            "overwhelmed",
            "tense",
            "nervous",
            "frantic",
            "uneasy",
            "pressured",
            "strained",
        ],
    ),
    (
        Mood::Focused,
        &[
            "focused",
            "concentrated",
            "determined",
            "attentive",
            "sharp",
            "clear",
            "engaged",
            "mindful",
            "intent",
            "absorbed",
        ],
    ),
    (
        Mood::Neutral,
        &[
            "okay", "fine", "normal", "alright", "regular", "steady", "balanced", "moderate",
            "even",
        ],
    ),
];

const NEGATION_MARKERS: &[&str] = &["not", "don't", "can't"];
const POSITIVE_MARKERS: &[&str] = &["great", "awesome", "happy"];
const FATIGUE_MARKERS: &[&str] = &["tired", "exhausted", "bad"];

/// Scores are kept in half points so ties compare exactly.
const KEYWORD_HALF_POINTS: u32 = 2;
const NEGATION_HALF_POINTS: u32 = 1;
const POSITIVE_HALF_POINTS: u32 = 2;
const FATIGUE_HALF_POINTS: u32 = 2;

/// Per-mood scores for one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoodScores {
    half_points: [u32; 5],
}

impl MoodScores {
    /// Score for `mood` in points (0.5 granularity).
    #[must_use]
    pub fn get(&self, mood: Mood) -> f64 {
        f64::from(self.half_points[index_of(mood)]) / 2.0
    }

    fn add(&mut self, mood: Mood, half_points: u32) {
        self.half_points[index_of(mood)] += half_points;
    }

    /// The winning mood and its score. Ties at the top resolve to neutral.
    #[must_use]
    pub fn winner(&self) -> (Mood, f64) {
        let max = self.half_points.iter().copied().max().unwrap_or(0);
        if max == 0 {
            return (Mood::Neutral, 0.0);
        }
        let leaders: Vec<Mood> = Mood::ALL
            .iter()
            .copied()
            .filter(|m| self.half_points[index_of(*m)] == max)
            .collect();
        let mood = match leaders.as_slice() {
            [only] => *only,
            _ => Mood::Neutral,
        };
        (mood, f64::from(max) / 2.0)
    }
}

fn index_of(mood: Mood) -> usize {
    match mood {
        Mood::Calm => 0,
        Mood::Energized => 1,
        Mood::Stressed => 2,
        Mood::Focused => 3,
        Mood::Neutral => 4,
    }
}

/// Keyword-density text sentiment estimator.
#[derive(Debug, Clone, Default)]
pub struct TextSentimentEstimator {
    config: SentimentConfig,
}

impl TextSentimentEstimator {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    /// Estimate the mood expressed by `text`.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::EmptyInput`] for empty or whitespace-only text.
    pub fn estimate(&self, text: &str) -> Result<MoodEstimate> {
        if text.trim().is_empty() {
            return Err(MoodError::EmptyInput);
        }

        let scores = score(text);
        let (mood, max_score) = scores.winner();

        let word_count = text.split_whitespace().count();
        let density_units = (word_count as f64
            / f64::from(self.config.words_per_density_unit.max(1)))
        .max(1.0);
        let raw = (max_score / density_units * 100.0).clamp(
            f64::from(self.config.min_confidence),
            f64::from(self.config.max_confidence),
        );

        let estimate = MoodEstimate::new(mood, clamp_confidence(raw));
        tracing::debug!(
            mood = %estimate.mood,
            confidence = estimate.confidence,
            word_count,
            "text sentiment estimated"
        );
        Ok(estimate)
    }
}

/// Score every mood for `text`. Empty text scores zero everywhere.
#[must_use]
pub fn score(text: &str) -> MoodScores {
    let lower = text.to_lowercase();
    let mut scores = MoodScores::default();

    for &(mood, keywords) in MOOD_TABLE {
        let hits = keywords.iter().filter(|kw| lower.contains(*kw)).count() as u32;
        scores.add(mood, hits * KEYWORD_HALF_POINTS);
    }

    if contains_any(&lower, NEGATION_MARKERS) {
        scores.add(Mood::Stressed, NEGATION_HALF_POINTS);
    }
    if contains_any(&lower, POSITIVE_MARKERS) {
        scores.add(Mood::Energized, POSITIVE_HALF_POINTS);
    }
    if contains_any(&lower, FATIGUE_MARKERS) {
        scores.add(Mood::Stressed, FATIGUE_HALF_POINTS);
    }

    scores
}

fn contains_any(lower: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| lower.contains(m))
}

// ── Tests ───────────────────────────────────────────────────────────────
