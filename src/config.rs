//! Configuration types for the mood engine.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{MoodError, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodFlowConfig {
    /// Text sentiment scoring.
    pub sentiment: SentimentConfig,
    /// Text/face fusion weights and adjustments.
    pub fusion: FusionConfig,
    /// Face estimator stub and timeout.
    pub face: FaceConfig,
    /// Crisis escalation thresholds.
    pub crisis: CrisisConfig,
    /// Supported languages and resolution timeouts.
    pub language: LanguageConfig,
    /// Persistence collaborator settings.
    pub storage: StorageConfig,
}

/// Text sentiment estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    /// Floor for any reported text confidence.
    pub min_confidence: u8,
    /// Ceiling for text confidence, leaving headroom for fusion boosts.
    pub max_confidence: u8,
    /// Words per density unit. A 30-word text with 3 hits scores like a
    /// 10-word text with 1 hit.
    pub words_per_density_unit: u32,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            min_confidence: 60,
            max_confidence: 95,
            words_per_density_unit: 10,
        }
    }
}

/// Mood fusion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Text weight in percent. Integer so weighted comparisons are exact.
    pub text_weight_percent: u32,
    /// Face weight in percent.
    pub face_weight_percent: u32,
    /// Multiplier applied when both sources agree.
    pub agreement_boost: f64,
    /// Multiplier applied to the winner when sources disagree.
    pub disagreement_penalty: f64,
    /// Cap for fused confidence.
    pub max_confidence: u8,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            text_weight_percent: 60,
            face_weight_percent: 40,
            agreement_boost: 1.1,
            disagreement_penalty: 0.9,
            max_confidence: 95,
        }
    }
}

/// Face estimator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Lowest confidence the random stub reports.
    pub min_confidence: u8,
    /// Highest confidence the random stub reports.
    pub max_confidence: u8,
    /// Fixed RNG seed for reproducible runs (None = entropy).
    pub seed: Option<u64>,
    /// Upper bound on one face estimate, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 70,
            max_confidence: 90,
            seed: None,
            timeout_ms: 1_500,
        }
    }
}

/// Crisis evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrisisConfig {
    /// Look-back window for the negative-mood streak, in days.
    pub window_days: u32,
    /// Streak length at which escalation fires.
    pub streak_threshold: u32,
    /// Minimum confidence for a stressed entry to count toward the streak.
    pub streak_min_confidence: u8,
    /// Maximum number of recent entries fetched for evaluation.
    pub history_limit: usize,
}

impl Default for CrisisConfig {
    fn default() -> Self {
        Self {
            window_days: 3,
            streak_threshold: 3,
            streak_min_confidence: 80,
            history_limit: 50,
        }
    }
}

/// Language resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    /// Supported language codes.
    pub supported: Vec<String>,
    /// Hard default when nothing else resolves.
    pub default_language: String,
    /// Language the text estimator understands; other text is translated first.
    pub analysis_language: String,
    /// Whether the geolocation rung is attempted at all.
    pub geo_enabled: bool,
    /// Upper bound on the geolocation rung, in milliseconds.
    pub geo_timeout_ms: u64,
    /// Upper bound on backend preference reads and writes, in milliseconds.
    pub backend_timeout_ms: u64,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            supported: ["en", "hi", "es", "zh", "ar"]
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
            default_language: "en".to_owned(),
            analysis_language: "en".to_owned(),
            geo_enabled: true,
            geo_timeout_ms: 3_000,
            backend_timeout_ms: 2_000,
        }
    }
}

/// Persistence collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Upper bound on one repository call, in milliseconds.
    pub timeout_ms: u64,
    /// Seed the in-memory task catalog at startup.
    pub seed_tasks: bool,
    /// Default page size for history queries.
    pub history_page_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 2_000,
            seed_tasks: true,
            history_page_size: 10,
        }
    }
}

impl MoodFlowConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| MoodError::Config(e.to_string()))
    }

    /// Save configuration to a TOML file, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written or the config cannot be serialized.
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| MoodError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Returns the default config file path: `~/.config/moodflow/config.toml`.
    pub fn default_config_path() -> PathBuf {
        if let Some(config) = std::env::var_os("XDG_CONFIG_HOME") {
            PathBuf::from(config).join("moodflow").join("config.toml")
        } else if let Some(home) = std::env::var_os("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join("moodflow")
                .join("config.toml")
        } else {
            PathBuf::from("/tmp/moodflow-config/config.toml")
        }
    }

    /// Reject internally inconsistent values.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let s = &self.sentiment;
        if s.min_confidence > s.max_confidence || s.max_confidence > 100 {
            return Err(MoodError::Config(
                "sentiment.min_confidence must not exceed sentiment.max_confidence (max 100)"
                    .into(),
            ));
        }
        if s.words_per_density_unit == 0 {
            return Err(MoodError::Config(
                "sentiment.words_per_density_unit must be greater than 0".into(),
            ));
        }

        let f = &self.fusion;
        if f.text_weight_percent == 0 || f.face_weight_percent == 0 {
            return Err(MoodError::Config(
                "fusion weights must be greater than 0".into(),
            ));
        }
        if !(f.agreement_boost.is_finite() && f.agreement_boost > 0.0) {
            return Err(MoodError::Config(
                "fusion.agreement_boost must be a positive number".into(),
            ));
        }
        if !(f.disagreement_penalty.is_finite() && f.disagreement_penalty > 0.0) {
            return Err(MoodError::Config(
                "fusion.disagreement_penalty must be a positive number".into(),
            ));
        }
        if f.max_confidence > 100 {
            return Err(MoodError::Config(
                "fusion.max_confidence must not exceed 100".into(),
            ));
        }

        let face = &self.face;
        if face.min_confidence > face.max_confidence || face.max_confidence > 100 {
            return Err(MoodError::Config(
                "face.min_confidence must not exceed face.max_confidence (max 100)".into(),
            ));
        }
        if face.timeout_ms == 0 {
            return Err(MoodError::Config(
                "face.timeout_ms must be greater than 0".into(),
            ));
        }

        let c = &self.crisis;
        if c.window_days == 0 {
            return Err(MoodError::Config(
                "crisis.window_days must be greater than 0".into(),
            ));
        }
        if c.streak_threshold == 0 {
            return Err(MoodError::Config(
                "crisis.streak_threshold must be greater than 0".into(),
            ));
        }

        let l = &self.language;
        if l.supported.is_empty() {
            return Err(MoodError::Config(
                "language.supported must not be empty".into(),
            ));
        }
        if !l
            .supported
            .iter()
            .any(|code| code.eq_ignore_ascii_case(&l.default_language))
        {
            return Err(MoodError::Config(format!(
                "language.default_language `{}` is not in language.supported",
                l.default_language
            )));
        }
        if l.geo_timeout_ms == 0 || l.backend_timeout_ms == 0 {
            return Err(MoodError::Config(
                "language timeouts must be greater than 0".into(),
            ));
        }

        if self.storage.timeout_ms == 0 {
            return Err(MoodError::Config(
                "storage.timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
