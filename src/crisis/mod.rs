//! Crisis escalation.
//!
//! Every detection recomputes a [`CrisisSummary`] from scratch out of the
//! current text, the fused mood and the user's recent history. Nothing is
//! cached between calls.

pub mod helpline;
pub mod lexicon;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::CrisisConfig;
use crate::mood::{FusedMood, Mood};
use crate::storage::MoodEntry;
pub use helpline::{HelplineDirectory, HelplineInfo};

/// Why a crisis flag was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisReason {
    /// Crisis vocabulary appeared in the text.
    Keywords,
    /// Sustained high-confidence stressed entries within the window.
    Streak,
}

impl CrisisReason {
    /// Human-readable explanation for peer-support and UI messaging.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::Keywords => "crisis language detected in the message",
            Self::Streak => "sustained high-stress pattern",
        }
    }
}

/// Outcome of one crisis evaluation.
///
/// When `triggered` is false, `reasons` and `keywords` are empty and
/// `helpline` is `None`. When true, `helpline` is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisSummary {
    pub triggered: bool,
    pub reasons: Vec<CrisisReason>,
    pub keywords: Vec<String>,
    pub negative_mood_streak: u32,
    pub helpline: Option<HelplineInfo>,
}

impl CrisisSummary {
    /// A summary with no escalation, carrying the observed streak.
    #[must_use]
    pub fn not_triggered(negative_mood_streak: u32) -> Self {
        Self {
            triggered: false,
            reasons: Vec::new(),
            keywords: Vec::new(),
            negative_mood_streak,
            helpline: None,
        }
    }
}

/// Decides whether a detection warrants helpline escalation.
#[derive(Debug, Clone, Default)]
pub struct CrisisEvaluator {
    config: CrisisConfig,
    directory: HelplineDirectory,
}

impl CrisisEvaluator {
    pub fn new(config: CrisisConfig, directory: HelplineDirectory) -> Self {
        Self { config, directory }
    }

    pub fn config(&self) -> &CrisisConfig {
        &self.config
    }

    /// Evaluate `current_text` against the fused mood and recent history.
    #[must_use]
    pub fn evaluate(
        &self,
        current_text: &str,
        fused: &FusedMood,
        recent_entries: &[MoodEntry],
        language: Option<&str>,
    ) -> CrisisSummary {
        self.evaluate_at(&[current_text], fused, recent_entries, language, Utc::now())
    }

    /// Evaluate several renditions of the same message (for example the
    /// analysed translation and the raw text) at an explicit instant.
    #[must_use]
    pub fn evaluate_at(
        &self,
        texts: &[&str],
        fused: &FusedMood,
        recent_entries: &[MoodEntry],
        language: Option<&str>,
        now: DateTime<Utc>,
    ) -> CrisisSummary {
        let keywords = lexicon::scan_all(texts);
        let streak = self.negative_streak(fused, recent_entries, now);

        let mut reasons = Vec::new();
        if !keywords.is_empty() {
            reasons.push(CrisisReason::Keywords);
        }
        if streak >= self.config.streak_threshold {
            reasons.push(CrisisReason::Streak);
        }

        if reasons.is_empty() {
            return CrisisSummary::not_triggered(streak);
        }

        let helpline = self.directory.lookup(language);
        tracing::info!(
            reasons = ?reasons,
            keyword_count = keywords.len(),
            streak,
            helpline = %helpline.code,
            "crisis escalation triggered"
        );

        CrisisSummary {
            triggered: true,
            reasons,
            keywords,
            negative_mood_streak: streak,
            helpline: Some(helpline),
        }
    }

    /// Stressed entries at or above the confidence floor inside the window,
    /// plus the current fused mood when it qualifies.
    fn negative_streak(
        &self,
        fused: &FusedMood,
        recent_entries: &[MoodEntry],
        now: DateTime<Utc>,
    ) -> u32 {
        let since = now - Duration::days(i64::from(self.config.window_days));
        let historical = recent_entries
            .iter()
            .filter(|e| {
                e.timestamp >= since && e.timestamp <= now && self.counts(e.mood, e.confidence)
            })
            .count() as u32;
        let current = u32::from(self.counts(fused.mood, fused.confidence));
        historical + current
    }

    fn counts(&self, mood: Mood, confidence: u8) -> bool {
        mood == Mood::Stressed && confidence >= self.config.streak_min_confidence
    }
}
