//! MoodFlow: mood signal fusion and crisis escalation engine.
//!
//! This crate turns a user's free text (and optionally a camera frame) into a
//! single mood reading, decides whether that reading warrants helpline
//! escalation, and resolves the language downstream messaging should use.
//!
//! ```text
//! Text → Sentiment ─┐
//!                   ├→ Fusion → Crisis → Entry
//! Frame → Face ─────┘
//! ```
//!
//! # Architecture
//!
//! - **Sentiment**: keyword-density text estimator
//! - **Face**: pluggable frame estimator (seeded random stub by default)
//! - **Fusion**: agreement boost or winner-take-all with penalty
//! - **Crisis**: lexicon scan plus negative-mood streak over recent history
//! - **Language**: explicit → backend → local → geolocation → device → default
//! - **Tasks**: mood-keyed activity lookup with a fair shuffle
//! - **Host**: newline-delimited JSON bridge for native shells

pub mod config;
pub mod crisis;
pub mod detector;
pub mod error;
pub mod face;
pub mod fusion;
pub mod host;
pub mod language;
pub mod mood;
pub mod peer;
pub mod sentiment;
pub mod storage;
pub mod tasks;
pub mod translation;

pub use config::MoodFlowConfig;
pub use crisis::{CrisisEvaluator, CrisisReason, CrisisSummary, HelplineInfo};
pub use detector::{DetectionOutcome, DetectionRequest, MoodDetector};
pub use error::{MoodError, Result};
pub use fusion::MoodFusionEngine;
pub use language::{LanguagePreferenceResolver, ResolvedLanguage};
pub use mood::{FusedMood, Mood, MoodEstimate, MoodSources};
pub use sentiment::TextSentimentEstimator;
pub use storage::{MemoryRepository, MoodRepository};
pub use tasks::TaskSelector;
