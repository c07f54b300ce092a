//! Core mood vocabulary shared by every estimator and consumer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for any reported confidence.
pub const MAX_CONFIDENCE: u8 = 100;

/// One of the five moods the engine reasons about.
///
/// Declaration order is also the scan order used for deterministic
/// tie-breaking in the text estimator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Calm,
    Energized,
    Stressed,
    Focused,
    Neutral,
}

impl Mood {
    /// All moods in scan order.
    pub const ALL: [Mood; 5] = [
        Mood::Calm,
        Mood::Energized,
        Mood::Stressed,
        Mood::Focused,
        Mood::Neutral,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Energized => "energized",
            Self::Stressed => "stressed",
            Self::Focused => "focused",
            Self::Neutral => "neutral",
        }
    }

    /// Case-insensitive parse from the wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "calm" => Some(Self::Calm),
            "energized" => Some(Self::Energized),
            "stressed" => Some(Self::Stressed),
            "focused" => Some(Self::Focused),
            "neutral" => Some(Self::Neutral),
            _ => None,
        }
    }

    /// Capitalised label for user-facing summaries ("Stressed").
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Calm => "Calm",
            Self::Energized => "Energized",
            Self::Stressed => "Stressed",
            Self::Focused => "Focused",
            Self::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Round a raw confidence to the nearest integer and clamp it to `0..=100`.
///
/// Non-finite input maps to 0.
#[must_use]
pub fn clamp_confidence(raw: f64) -> u8 {
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, f64::from(MAX_CONFIDENCE)) as u8
}

/// A single estimator's opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodEstimate {
    pub mood: Mood,
    pub confidence: u8,
}

impl MoodEstimate {
    /// Build an estimate, clamping confidence to 100.
    #[must_use]
    pub fn new(mood: Mood, confidence: u8) -> Self {
        Self {
            mood,
            confidence: confidence.min(MAX_CONFIDENCE),
        }
    }
}

/// Which estimates fed a fusion result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodSources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<MoodEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub face: Option<MoodEstimate>,
}

/// The reconciled mood for one detection event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FusedMood {
    pub mood: Mood,
    pub confidence: u8,
    pub sources: MoodSources,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn scan_order_is_fixed() {
        let names: Vec<&str> = Mood::ALL.iter().map(|m| m.as_str()).collect();
        assert_eq!(
            names,
            vec!["calm", "energized", "stressed", "focused", "neutral"]
        );
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Mood::parse(" Stressed "), Some(Mood::Stressed));
        assert_eq!(Mood::parse("FOCUSED"), Some(Mood::Focused));
        assert_eq!(Mood::parse("angry"), None);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Mood::Energized).unwrap();
        assert_eq!(json, "\"energized\"");
        let back: Mood = serde_json::from_str("\"calm\"").unwrap();
        assert_eq!(back, Mood::Calm);
    }

    #[test]
    fn clamp_confidence_rounds_and_bounds() {
        assert_eq!(clamp_confidence(71.5), 72);
        assert_eq!(clamp_confidence(71.49), 71);
        assert_eq!(clamp_confidence(-12.0), 0);
        assert_eq!(clamp_confidence(240.0), 100);
        assert_eq!(clamp_confidence(f64::NAN), 0);
        assert_eq!(clamp_confidence(f64::INFINITY), 0);
    }

    #[test]
    fn estimate_new_caps_at_hundred() {
        assert_eq!(MoodEstimate::new(Mood::Calm, 250).confidence, 100);
        assert_eq!(MoodEstimate::new(Mood::Calm, 42).confidence, 42);
    }

    #[test]
    fn sources_omit_missing_estimates() {
        let sources = MoodSources {
            text: Some(MoodEstimate::new(Mood::Calm, 80)),
            face: None,
        };
        let value = serde_json::to_value(sources).unwrap();
        assert!(value.get("text").is_some());
        assert!(value.get("face").is_none());
    }
}
