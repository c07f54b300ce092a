//! Records exchanged with the persistence collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crisis::CrisisSummary;
use crate::mood::{Mood, MoodEstimate};

/// One persisted detection event. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: String,
    pub user_id: String,
    pub mood: Mood,
    pub confidence: u8,
    /// The text the estimator actually analysed.
    pub text_input: Option<String>,
    pub original_text: Option<String>,
    pub original_language: Option<String>,
    pub translated_text: Option<String>,
    pub translated_language: Option<String>,
    /// Set when a translator rewrote the text before analysis.
    pub translation_provider: Option<String>,
    pub face_analysis: Option<MoodEstimate>,
    pub timestamp: DateTime<Utc>,
    pub crisis: CrisisSummary,
}

/// Fields the caller supplies when recording a detection event.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMoodEntry {
    pub user_id: String,
    pub mood: Mood,
    pub confidence: u8,
    pub text_input: Option<String>,
    pub original_text: Option<String>,
    pub original_language: Option<String>,
    pub translated_text: Option<String>,
    pub translated_language: Option<String>,
    pub translation_provider: Option<String>,
    pub face_analysis: Option<MoodEstimate>,
    /// `None` stamps the entry with the current time.
    pub timestamp: Option<DateTime<Utc>>,
    pub crisis: CrisisSummary,
}

impl NewMoodEntry {
    /// Minimal entry with no text, face or crisis data.
    pub fn new(user_id: impl Into<String>, mood: Mood, confidence: u8) -> Self {
        Self {
            user_id: user_id.into(),
            mood,
            confidence: confidence.min(100),
            text_input: None,
            original_text: None,
            original_language: None,
            translated_text: None,
            translated_language: None,
            translation_provider: None,
            face_analysis: None,
            timestamp: None,
            crisis: CrisisSummary::not_triggered(0),
        }
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A suggested activity, tagged with the mood it suits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Expected duration in minutes.
    pub duration: u32,
    pub difficulty: Difficulty,
    pub mood: Mood,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    #[serde(default = "default_user")]
    pub user_id: String,
    pub title: String,
    pub duration: u32,
    pub difficulty: Difficulty,
    pub mood: Mood,
    #[serde(default)]
    pub completed: bool,
}

fn default_user() -> String {
    "default".to_owned()
}

/// Per-user privacy and language settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSettings {
    pub user_id: String,
    pub webcam_consent: bool,
    pub local_only_processing: bool,
    pub data_logging: bool,
    pub preferred_language: Option<String>,
}

impl UserSettings {
    /// Defaults for a user seen for the first time.
    pub fn defaults_for(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            webcam_consent: false,
            local_only_processing: true,
            data_logging: true,
            preferred_language: Some("en".to_owned()),
        }
    }

    /// Apply the fields present in `patch`.
    pub fn apply(&mut self, patch: &SettingsPatch) {
        if let Some(v) = patch.webcam_consent {
            self.webcam_consent = v;
        }
        if let Some(v) = patch.local_only_processing {
            self.local_only_processing = v;
        }
        if let Some(v) = patch.data_logging {
            self.data_logging = v;
        }
        if let Some(v) = &patch.preferred_language {
            self.preferred_language = Some(v.clone());
        }
    }
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsPatch {
    pub webcam_consent: Option<bool>,
    pub local_only_processing: Option<bool>,
    pub data_logging: Option<bool>,
    pub preferred_language: Option<String>,
}

impl SettingsPatch {
    /// Patch that only changes the preferred language.
    pub fn language(code: impl Into<String>) -> Self {
        Self {
            preferred_language: Some(code.into()),
            ..Self::default()
        }
    }
}
