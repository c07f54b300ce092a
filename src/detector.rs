//! End-to-end mood detection.
//!
//! One [`MoodDetector::detect`] call translates, estimates and fuses, then
//! resolves the user's language so the helpline and the result message
//! follow it. Crisis evaluation against fresh history and entry creation
//! for the same user are serialized so a concurrent call never sees a
//! half-written window.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::MoodFlowConfig;
use crate::crisis::{CrisisEvaluator, CrisisSummary, HelplineDirectory};
use crate::error::{MoodError, Result};
use crate::face::{FaceFrame, FaceSentimentEstimator};
use crate::fusion::MoodFusionEngine;
use crate::language::codes::primary_subtag;
use crate::language::{LanguagePreferenceResolver, LanguageSource, ResolvedLanguage};
use crate::mood::{FusedMood, Mood, MoodEstimate, MoodSources};
use crate::peer::peer_support_suggested;
use crate::sentiment::TextSentimentEstimator;
use crate::storage::{MoodEntry, MoodRepository, NewMoodEntry};
use crate::translation::{PassthroughTranslator, Translator};

/// Input to one detection call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionRequest {
    pub user_id: String,
    pub text: String,
    /// Base64 or data-URL camera frame.
    pub image_data: Option<String>,
    pub use_webcam: bool,
    pub preferred_language: Option<String>,
}

impl DetectionRequest {
    pub fn text(user_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_frame(mut self, image_data: impl Into<String>) -> Self {
        self.image_data = Some(image_data.into());
        self.use_webcam = true;
        self
    }

    #[must_use]
    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.preferred_language = Some(code.into());
        self
    }
}

/// Everything a presentation layer needs to render one detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub mood: Mood,
    pub confidence: u8,
    pub sources: MoodSources,
    pub crisis: CrisisSummary,
    pub resolved_language: ResolvedLanguage,
    pub entry: MoodEntry,
    pub original_language: Option<String>,
    pub translation_applied: bool,
    pub localized_message: String,
    pub localized_language: String,
    pub peer_support_suggested: bool,
}

/// Text chosen for analysis after the translation step.
struct PreparedText {
    analysis: String,
    detected_language: Option<String>,
    translated: bool,
}

pub struct MoodDetector {
    config: MoodFlowConfig,
    text: TextSentimentEstimator,
    fusion: MoodFusionEngine,
    crisis: CrisisEvaluator,
    face: Option<Arc<dyn FaceSentimentEstimator>>,
    translator: Arc<dyn Translator>,
    repo: Arc<dyn MoodRepository>,
    resolver: Arc<LanguagePreferenceResolver>,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MoodDetector {
    pub fn new(
        config: MoodFlowConfig,
        repo: Arc<dyn MoodRepository>,
        resolver: Arc<LanguagePreferenceResolver>,
    ) -> Self {
        Self {
            text: TextSentimentEstimator::new(config.sentiment.clone()),
            fusion: MoodFusionEngine::new(config.fusion.clone()),
            crisis: CrisisEvaluator::new(config.crisis.clone(), HelplineDirectory::builtin()),
            face: None,
            translator: Arc::new(PassthroughTranslator),
            repo,
            resolver,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn with_face_estimator(mut self, face: Arc<dyn FaceSentimentEstimator>) -> Self {
        self.face = Some(face);
        self
    }

    #[must_use]
    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    #[must_use]
    pub fn with_helplines(mut self, directory: HelplineDirectory) -> Self {
        self.crisis = CrisisEvaluator::new(self.config.crisis.clone(), directory);
        self
    }

    pub fn repository(&self) -> &Arc<dyn MoodRepository> {
        &self.repo
    }

    pub fn resolver(&self) -> &Arc<LanguagePreferenceResolver> {
        &self.resolver
    }

    /// Run one detection.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::EmptyInput`] for blank text, and storage errors
    /// or [`MoodError::Timeout`] when the entry cannot be recorded. Face,
    /// translation, history and language failures degrade instead.
    pub async fn detect(&self, request: DetectionRequest) -> Result<DetectionOutcome> {
        let raw = request.text.trim();
        if raw.is_empty() {
            return Err(MoodError::EmptyInput);
        }
        tracing::trace!(user_id = %request.user_id, text = %raw, "detection requested");

        let prepared = self.prepare_text(raw).await;
        let text_estimate = self.text.estimate(&prepared.analysis)?;
        let face_estimate = self.estimate_face(&request).await;
        let fused = self.fusion.fuse(text_estimate, face_estimate);

        let resolved_language = self
            .resolver
            .resolve(&request.user_id, request.preferred_language.as_deref())
            .await;
        let user_language = user_facing_language(&resolved_language, &prepared);

        let lock = self.user_lock(&request.user_id).await;
        let recorded = {
            let _guard = lock.lock().await;
            let history = self.recent_history(&request.user_id).await;
            let now = Utc::now();
            let mut texts = vec![prepared.analysis.as_str()];
            if prepared.analysis != raw {
                texts.push(raw);
            }
            let crisis = self.crisis.evaluate_at(
                &texts,
                &fused,
                &history,
                Some(user_language.as_str()),
                now,
            );
            self.record(&request.user_id, raw, &prepared, &fused, &crisis, now)
                .await
                .map(|entry| (crisis, entry))
        };
        self.release_user_lock(&request.user_id, lock).await;
        let (crisis, entry) = recorded?;

        let (localized_message, localized_language) =
            self.localize(&fused, Some(user_language.as_str())).await;

        tracing::info!(
            user_id = %request.user_id,
            mood = %fused.mood,
            confidence = fused.confidence,
            face = fused.sources.face.is_some(),
            crisis = crisis.triggered,
            language = %resolved_language.code,
            "mood detected"
        );

        Ok(DetectionOutcome {
            mood: fused.mood,
            confidence: fused.confidence,
            peer_support_suggested: peer_support_suggested(
                crisis.negative_mood_streak,
                &crisis.keywords,
            ),
            sources: fused.sources,
            crisis,
            resolved_language,
            entry,
            original_language: prepared.detected_language,
            translation_applied: prepared.translated,
            localized_message,
            localized_language,
        })
    }

    async fn prepare_text(&self, raw: &str) -> PreparedText {
        let analysis_language = self.config.language.analysis_language.as_str();
        let detected_language = match self.translator.detect_language(raw).await {
            Ok(language) => language.filter(|l| !l.trim().is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "language detection failed; analysing raw text");
                None
            }
        };

        let needs_translation = detected_language
            .as_deref()
            .is_some_and(|lang| primary_subtag(lang) != primary_subtag(analysis_language));
        let mut prepared = PreparedText {
            analysis: raw.to_owned(),
            detected_language,
            translated: false,
        };
        if !needs_translation {
            return prepared;
        }

        let from = prepared.detected_language.as_deref().unwrap_or(analysis_language);
        match self.translator.translate(raw, from, analysis_language).await {
            Ok(text) if !text.trim().is_empty() => {
                prepared.analysis = text.trim().to_owned();
                prepared.translated = true;
            }
            Ok(_) => tracing::warn!("translation returned empty text; analysing raw text"),
            Err(e) => tracing::warn!(error = %e, "translation failed; analysing raw text"),
        }
        prepared
    }

    async fn estimate_face(&self, request: &DetectionRequest) -> Option<MoodEstimate> {
        if !request.use_webcam {
            return None;
        }
        let (estimator, data) = (self.face.as_ref()?, request.image_data.as_deref()?);
        let frame = match FaceFrame::from_data_url(data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "face frame rejected; using text only");
                return None;
            }
        };
        let timeout = Duration::from_millis(self.config.face.timeout_ms);
        match tokio::time::timeout(timeout, estimator.estimate(&frame)).await {
            Ok(Ok(estimate)) => Some(estimate),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "face estimator failed; using text only");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.face.timeout_ms,
                    "face estimator timed out; using text only"
                );
                None
            }
        }
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id.to_owned()).or_default())
    }

    /// Drop the caller's handle and forget the lock once nobody else holds it.
    async fn release_user_lock(&self, user_id: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.user_locks.lock().await;
        drop(lock);
        if locks
            .get(user_id)
            .is_some_and(|held| Arc::strong_count(held) == 1)
        {
            locks.remove(user_id);
        }
    }

    /// Entries inside the crisis window. Failures degrade to an empty history.
    async fn recent_history(&self, user_id: &str) -> Vec<MoodEntry> {
        let since = Utc::now() - chrono::Duration::days(i64::from(self.config.crisis.window_days));
        let fetch = self.repo.get_mood_entries_since(user_id, since);
        match tokio::time::timeout(self.storage_timeout(), fetch).await {
            Ok(Ok(mut entries)) => {
                entries.truncate(self.config.crisis.history_limit);
                entries
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "mood history unavailable; assuming no streak");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("mood history fetch timed out; assuming no streak");
                Vec::new()
            }
        }
    }

    async fn record(
        &self,
        user_id: &str,
        raw: &str,
        prepared: &PreparedText,
        fused: &FusedMood,
        crisis: &CrisisSummary,
        now: chrono::DateTime<Utc>,
    ) -> Result<MoodEntry> {
        let translated = prepared.translated;
        let entry = NewMoodEntry {
            text_input: Some(prepared.analysis.clone()),
            original_text: Some(raw.to_owned()),
            original_language: prepared.detected_language.clone(),
            translated_text: translated.then(|| prepared.analysis.clone()),
            translated_language: translated
                .then(|| self.config.language.analysis_language.clone()),
            translation_provider: translated.then(|| self.translator.name().to_owned()),
            face_analysis: fused.sources.face,
            crisis: crisis.clone(),
            ..NewMoodEntry::new(user_id, fused.mood, fused.confidence).at(now)
        };
        tokio::time::timeout(self.storage_timeout(), self.repo.create_mood_entry(entry))
            .await
            .map_err(|_| MoodError::Timeout("recording mood entry".into()))?
    }

    /// The result sentence, translated into `target` when it differs from
    /// the analysis language.
    async fn localize(&self, fused: &FusedMood, target: Option<&str>) -> (String, String) {
        let analysis_language = self.config.language.analysis_language.as_str();
        let message = format!(
            "Your mood: {} ({}% confidence)",
            fused.mood.label(),
            fused.confidence
        );
        let Some(target) = target.filter(|t| primary_subtag(t) != primary_subtag(analysis_language))
        else {
            return (message, analysis_language.to_owned());
        };
        match self
            .translator
            .translate(&message, analysis_language, target)
            .await
        {
            Ok(text) if !text.trim().is_empty() => (text, target.to_owned()),
            Ok(_) => (message, analysis_language.to_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "result translation failed");
                (message, analysis_language.to_owned())
            }
        }
    }

    fn storage_timeout(&self) -> Duration {
        Duration::from_millis(self.config.storage.timeout_ms)
    }
}

/// Language for the helpline and the result message.
///
/// Any rung above the hard default wins. When only the default answered,
/// the language the text was written in is the better signal.
fn user_facing_language(resolved: &ResolvedLanguage, prepared: &PreparedText) -> String {
    if resolved.source == LanguageSource::Default {
        if let Some(detected) = prepared.detected_language.as_deref() {
            return detected.to_owned();
        }
    }
    resolved.code.clone()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::crisis::CrisisReason;
    use crate::face::FixedSequenceFaceEstimator;
    use crate::face::test_frames::tiny_png_data_url;
    use crate::language::{FixedLocale, MemoryPreferenceStore, RepositoryPreferenceBackend};
    use crate::storage::SettingsPatch;
    use crate::storage::MemoryRepository;
    use crate::translation::doubles::DictionaryTranslator;

    fn detector_with(repo: Arc<MemoryRepository>) -> MoodDetector {
        let config = MoodFlowConfig::default();
        let resolver = LanguagePreferenceResolver::new(
            &config.language,
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(FixedLocale(None)),
        );
        MoodDetector::new(config, repo, Arc::new(resolver))
    }

    fn detector() -> MoodDetector {
        detector_with(Arc::new(MemoryRepository::new()))
    }

    #[tokio::test]
    async fn blank_text_rejected_before_estimation() {
        let err = detector()
            .detect(DetectionRequest::text("u1", "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, MoodError::EmptyInput));
    }

    #[tokio::test]
    async fn stressed_example_is_recorded() {
        let repo = Arc::new(MemoryRepository::new());
        let detector = detector_with(repo.clone());
        let outcome = detector
            .detect(DetectionRequest::text(
                "u1",
                "I am so stressed and exhausted, nothing is working",
            ))
            .await
            .unwrap();

        assert_eq!(outcome.mood, Mood::Stressed);
        assert!((60..=95).contains(&outcome.confidence));
        assert!(outcome.sources.face.is_none());
        assert!(outcome.crisis.keywords.is_empty());
        assert_eq!(outcome.resolved_language.code, "en");
        assert_eq!(outcome.resolved_language.source, LanguageSource::Default);
        assert!(outcome.localized_message.starts_with("Your mood: Stressed ("));

        let latest = repo.get_latest_mood("u1").await.unwrap().unwrap();
        assert_eq!(latest, outcome.entry);
        assert!(latest.translation_provider.is_none());
    }

    #[tokio::test]
    async fn face_estimate_is_fused() {
        let detector = detector().with_face_estimator(Arc::new(
            FixedSequenceFaceEstimator::always(MoodEstimate::new(Mood::Calm, 80)),
        ));
        let outcome = detector
            .detect(DetectionRequest::text("u1", "feeling calm").with_frame(tiny_png_data_url()))
            .await
            .unwrap();
        // text calm 95, face calm 80: (57 + 32) * 1.1 = 97.9 → capped 95.
        assert_eq!(outcome.mood, Mood::Calm);
        assert_eq!(outcome.confidence, 95);
        assert_eq!(outcome.sources.face, Some(MoodEstimate::new(Mood::Calm, 80)));
        assert_eq!(outcome.entry.face_analysis, outcome.sources.face);
    }

    #[tokio::test]
    async fn face_failures_degrade_to_text_only() {
        let detector = detector()
            .with_face_estimator(Arc::new(FixedSequenceFaceEstimator::new(vec![None])));
        let failed = detector
            .detect(DetectionRequest::text("u1", "feeling calm").with_frame(tiny_png_data_url()))
            .await
            .unwrap();
        assert!(failed.sources.face.is_none());
        assert_eq!(failed.confidence, 95);

        let garbage = detector
            .detect(DetectionRequest::text("u1", "feeling calm").with_frame("data:image/png;base64,@@"))
            .await
            .unwrap();
        assert!(garbage.sources.face.is_none());
    }

    #[tokio::test]
    async fn frame_ignored_without_webcam_flag() {
        let detector = detector().with_face_estimator(Arc::new(
            FixedSequenceFaceEstimator::always(MoodEstimate::new(Mood::Energized, 90)),
        ));
        let mut request = DetectionRequest::text("u1", "feeling calm").with_frame(tiny_png_data_url());
        request.use_webcam = false;
        let outcome = detector.detect(request).await.unwrap();
        assert!(outcome.sources.face.is_none());
    }

    #[tokio::test]
    async fn streak_crisis_uses_stored_history() {
        let repo = Arc::new(MemoryRepository::new());
        let now = Utc::now();
        for h in 1..=2 {
            repo.create_mood_entry(
                NewMoodEntry::new("u1", Mood::Stressed, 90).at(now - chrono::Duration::hours(h)),
            )
            .await
            .unwrap();
        }
        let detector = detector_with(repo);
        // "stressed anxious worried" in three words: 3 / 1 * 100 → 95.
        let outcome = detector
            .detect(DetectionRequest::text("u1", "stressed anxious worried"))
            .await
            .unwrap();
        assert_eq!(outcome.mood, Mood::Stressed);
        assert!(outcome.crisis.triggered);
        assert_eq!(outcome.crisis.negative_mood_streak, 3);
        assert_eq!(outcome.crisis.reasons, vec![CrisisReason::Streak]);
        assert!(outcome.peer_support_suggested);
        assert!(outcome.entry.crisis.triggered);
    }

    #[tokio::test]
    async fn other_users_history_is_ignored() {
        let repo = Arc::new(MemoryRepository::new());
        for _ in 0..3 {
            repo.create_mood_entry(NewMoodEntry::new("someone-else", Mood::Stressed, 95))
                .await
                .unwrap();
        }
        let outcome = detector_with(repo)
            .detect(DetectionRequest::text("u1", "stressed anxious worried"))
            .await
            .unwrap();
        assert!(!outcome.crisis.triggered);
        assert_eq!(outcome.crisis.negative_mood_streak, 1);
    }

    #[tokio::test]
    async fn translated_text_is_analysed_and_raw_text_scanned() {
        let detector = detector().with_translator(Arc::new(DictionaryTranslator {
            language: Some("es"),
            pairs: vec![
                ("me siento sin esperanza, hopeless", "I feel calm"),
                ("Your mood: Calm (95% confidence)", "Tu estado: Calma (95% confianza)"),
            ],
            fail: false,
        }));
        let outcome = detector
            .detect(DetectionRequest::text("u1", "me siento sin esperanza, hopeless"))
            .await
            .unwrap();

        assert!(outcome.translation_applied);
        assert_eq!(outcome.original_language.as_deref(), Some("es"));
        assert_eq!(outcome.mood, Mood::Calm);
        assert_eq!(outcome.crisis.keywords, vec!["hopeless"]);
        assert_eq!(outcome.crisis.helpline.as_ref().unwrap().code, "ES");
        assert_eq!(outcome.entry.translation_provider.as_deref(), Some("dictionary"));
        assert_eq!(outcome.entry.translated_text.as_deref(), Some("I feel calm"));
        assert_eq!(
            outcome.entry.original_text.as_deref(),
            Some("me siento sin esperanza, hopeless")
        );
        assert_eq!(outcome.localized_message, "Tu estado: Calma (95% confianza)");
        assert_eq!(outcome.localized_language, "es");
    }

    #[tokio::test]
    async fn translation_failure_analyses_raw_text() {
        let detector = detector().with_translator(Arc::new(DictionaryTranslator {
            language: Some("hi"),
            pairs: vec![],
            fail: true,
        }));
        let outcome = detector
            .detect(DetectionRequest::text("u1", "so anxious"))
            .await
            .unwrap();
        assert!(!outcome.translation_applied);
        assert_eq!(outcome.mood, Mood::Stressed);
        assert!(outcome.entry.translation_provider.is_none());
        assert_eq!(outcome.localized_language, "en");
        assert!(outcome.localized_message.starts_with("Your mood: Stressed"));
    }

    #[tokio::test]
    async fn stored_preference_picks_helpline_and_message_language() {
        let repo = Arc::new(MemoryRepository::new());
        repo.update_user_settings("u1", SettingsPatch::language("hi"))
            .await
            .unwrap();
        let config = MoodFlowConfig::default();
        let resolver = LanguagePreferenceResolver::new(
            &config.language,
            Arc::new(MemoryPreferenceStore::new()),
            Arc::new(FixedLocale(None)),
        )
        .with_backend(Arc::new(RepositoryPreferenceBackend::new(repo.clone())));
        let detector = MoodDetector::new(config, repo, Arc::new(resolver)).with_translator(
            Arc::new(DictionaryTranslator {
                language: None,
                pairs: vec![(
                    "Your mood: Neutral (60% confidence)",
                    "आपका मूड: तटस्थ (60% विश्वास)",
                )],
                fail: false,
            }),
        );

        let outcome = detector
            .detect(DetectionRequest::text("u1", "I feel hopeless"))
            .await
            .unwrap();
        assert_eq!(outcome.resolved_language.code, "hi");
        assert_eq!(outcome.resolved_language.source, LanguageSource::Backend);
        assert!(outcome.crisis.triggered);
        assert_eq!(outcome.crisis.helpline.as_ref().unwrap().code, "IN");
        assert_eq!(outcome.localized_language, "hi");
        assert_eq!(outcome.localized_message, "आपका मूड: तटस्थ (60% विश्वास)");
    }

    #[tokio::test]
    async fn default_rung_defers_to_detected_language() {
        let detector = detector().with_translator(Arc::new(DictionaryTranslator {
            language: Some("zh"),
            pairs: vec![("我很好 hopeless", "I am fine, hopeless")],
            fail: false,
        }));
        let outcome = detector
            .detect(DetectionRequest::text("u1", "我很好 hopeless"))
            .await
            .unwrap();
        assert_eq!(outcome.resolved_language.source, LanguageSource::Default);
        assert_eq!(outcome.crisis.helpline.as_ref().unwrap().code, "CN");
    }

    #[tokio::test]
    async fn user_locks_are_released_after_detection() {
        let detector = detector();
        for user in ["u1", "u2", "u3"] {
            detector
                .detect(DetectionRequest::text(user, "okay"))
                .await
                .unwrap();
        }
        assert!(detector.user_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn explicit_language_flows_into_resolution() {
        let outcome = detector()
            .detect(DetectionRequest::text("u1", "okay").with_language("ar"))
            .await
            .unwrap();
        assert_eq!(outcome.resolved_language.code, "ar");
        assert!(outcome.resolved_language.rtl);
        assert_eq!(outcome.resolved_language.source, LanguageSource::Explicit);
    }

    #[tokio::test]
    async fn concurrent_detections_for_one_user_all_recorded() {
        let repo = Arc::new(MemoryRepository::new());
        let detector = Arc::new(detector_with(repo.clone()));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = Arc::clone(&detector);
                tokio::spawn(async move {
                    detector
                        .detect(DetectionRequest::text("u1", "stressed anxious worried"))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut streaks = Vec::new();
        for handle in handles {
            streaks.push(handle.await.unwrap().crisis.negative_mood_streak);
        }
        streaks.sort_unstable();
        assert_eq!(streaks, (1..=8).collect::<Vec<u32>>());
        assert_eq!(repo.get_mood_history("u1", 100).await.unwrap().len(), 8);
        assert!(detector.user_locks.lock().await.is_empty());
    }
}
