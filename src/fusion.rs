//! Text/face mood fusion.
//!
//! Agreement boosts a weighted average; disagreement is winner-take-all on
//! weighted score with a penalty on the winner. Weighted scores are compared
//! as integer products so text wins exact ties reproducibly.

use crate::config::FusionConfig;
use crate::mood::{FusedMood, MoodEstimate, MoodSources, clamp_confidence};

#[derive(Debug, Clone, Default)]
pub struct MoodFusionEngine {
    config: FusionConfig,
}

impl MoodFusionEngine {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Fuse a text estimate with an optional face estimate.
    #[must_use]
    pub fn fuse(&self, text: MoodEstimate, face: Option<MoodEstimate>) -> FusedMood {
        let text = MoodEstimate::new(text.mood, text.confidence);
        let Some(face) = face.map(|f| MoodEstimate::new(f.mood, f.confidence)) else {
            return FusedMood {
                mood: text.mood,
                confidence: text.confidence,
                sources: MoodSources {
                    text: Some(text),
                    face: None,
                },
            };
        };

        let text_weight = self.config.text_weight_percent;
        let face_weight = self.config.face_weight_percent;
        let text_score = u32::from(text.confidence) * text_weight;
        let face_score = u32::from(face.confidence) * face_weight;

        let (mood, confidence) = if text.mood == face.mood {
            let average = f64::from(text_score + face_score) / 100.0;
            let boosted = (average * self.config.agreement_boost)
                .min(f64::from(self.config.max_confidence));
            (text.mood, clamp_confidence(boosted))
        } else {
            let winner = if text_score >= face_score { text } else { face };
            let penalized = f64::from(winner.confidence) * self.config.disagreement_penalty;
            (winner.mood, clamp_confidence(penalized))
        };

        tracing::debug!(
            text_mood = %text.mood,
            face_mood = %face.mood,
            fused_mood = %mood,
            confidence,
            "fused mood estimates"
        );

        FusedMood {
            mood,
            confidence,
            sources: MoodSources {
                text: Some(text),
                face: Some(face),
            },
        }
    }
}
