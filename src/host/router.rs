//! Host command channel and router.
//!
//! [`MoodFlowServices`] owns every engine component for the lifetime of the
//! host process. [`HostCommandServer`] routes validated envelopes to it one
//! at a time and broadcasts [`EventEnvelope`]s for detections, crisis
//! escalations and language changes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::MoodFlowConfig;
use crate::detector::{DetectionOutcome, DetectionRequest, MoodDetector};
use crate::error::{MoodError, Result};
use crate::face::{FaceSentimentEstimator, RandomFaceEstimator};
use crate::host::contract::{
    CommandEnvelope, CommandName, EVENT_CRISIS_ESCALATED, EVENT_LANGUAGE_CHANGED,
    EVENT_MOOD_DETECTED, EVENT_VERSION, EventEnvelope, ResponseEnvelope,
};
use crate::language::{
    DeviceLocaleProvider, EnvLocaleProvider, GeoLookup, LanguagePreferenceResolver,
    MemoryPreferenceStore, RepositoryPreferenceBackend,
};
use crate::mood::Mood;
use crate::peer::{PeerMatcher, PeerSessions, moderate};
use crate::storage::{MemoryRepository, MoodRepository, SettingsPatch, UserSettings};
use crate::tasks::TaskSelector;
use crate::translation::{PassthroughTranslator, Translator};

/// User assumed when a payload omits `user_id`.
pub const DEFAULT_USER: &str = "default";

/// Pluggable collaborators injected into [`MoodFlowServices`].
pub struct ServiceParts {
    pub repo: Arc<dyn MoodRepository>,
    pub device: Arc<dyn DeviceLocaleProvider>,
    pub geo: Option<Arc<dyn GeoLookup>>,
    pub face: Option<Arc<dyn FaceSentimentEstimator>>,
    pub translator: Arc<dyn Translator>,
}

impl ServiceParts {
    /// In-process defaults: memory repository, environment locale, the
    /// randomized face stub, no geolocation and no translation.
    pub fn in_memory(config: &MoodFlowConfig) -> Self {
        let repo = if config.storage.seed_tasks {
            MemoryRepository::with_seed_tasks()
        } else {
            MemoryRepository::new()
        };
        Self {
            repo: Arc::new(repo),
            device: Arc::new(EnvLocaleProvider),
            geo: None,
            face: Some(Arc::new(RandomFaceEstimator::new(&config.face))),
            translator: Arc::new(PassthroughTranslator),
        }
    }

    #[must_use]
    pub fn with_geo(mut self, geo: Arc<dyn GeoLookup>) -> Self {
        self.geo = Some(geo);
        self
    }
}

/// Every engine component, constructed once at host start.
pub struct MoodFlowServices {
    config: MoodFlowConfig,
    repo: Arc<dyn MoodRepository>,
    resolver: Arc<LanguagePreferenceResolver>,
    detector: MoodDetector,
    tasks: TaskSelector,
    peers: PeerSessions,
}

impl MoodFlowServices {
    pub fn new(config: MoodFlowConfig, parts: ServiceParts) -> Self {
        let mut resolver = LanguagePreferenceResolver::new(
            &config.language,
            Arc::new(MemoryPreferenceStore::new()),
            parts.device,
        )
        .with_backend(Arc::new(RepositoryPreferenceBackend::new(Arc::clone(
            &parts.repo,
        ))));
        if let Some(geo) = parts.geo {
            resolver = resolver.with_geo(geo);
        }
        let resolver = Arc::new(resolver);

        let peers = PeerSessions::new(PeerMatcher::builtin(), Arc::clone(&parts.translator));
        let mut detector =
            MoodDetector::new(config.clone(), Arc::clone(&parts.repo), Arc::clone(&resolver))
                .with_translator(parts.translator);
        if let Some(face) = parts.face {
            detector = detector.with_face_estimator(face);
        }

        Self {
            config,
            repo: parts.repo,
            resolver,
            detector,
            tasks: TaskSelector::default(),
            peers,
        }
    }

    pub fn config(&self) -> &MoodFlowConfig {
        &self.config
    }

    pub fn detector(&self) -> &MoodDetector {
        &self.detector
    }

    pub fn repository(&self) -> &Arc<dyn MoodRepository> {
        &self.repo
    }

    /// Bound one repository call by the configured storage timeout.
    async fn bounded<T>(&self, what: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        let limit = Duration::from_millis(self.config.storage.timeout_ms);
        tokio::time::timeout(limit, call)
            .await
            .map_err(|_| MoodError::Timeout(format!("{what} exceeded {}ms", limit.as_millis())))?
    }
}

struct HostCommandRequest {
    envelope: CommandEnvelope,
    response_tx: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Clone)]
pub struct HostCommandClient {
    request_tx: mpsc::Sender<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
}

impl HostCommandClient {
    /// Validate and dispatch one command, waiting for its response.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::Host`] for invalid envelopes or when the server
    /// has shut down. Command failures come back as error envelopes.
    pub async fn send(&self, envelope: CommandEnvelope) -> Result<ResponseEnvelope> {
        envelope.validate().map_err(|e| {
            MoodError::Host(format!(
                "invalid host command envelope {}: {}",
                envelope.request_id, e
            ))
        })?;

        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(HostCommandRequest {
                envelope,
                response_tx,
            })
            .await
            .map_err(|e| MoodError::Host(format!("failed to send host command request: {e}")))?;

        response_rx
            .await
            .map_err(|e| MoodError::Host(format!("host command response dropped: {e}")))
    }

    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<EventEnvelope> {
        self.event_tx.subscribe()
    }
}

pub struct HostCommandServer {
    request_rx: mpsc::Receiver<HostCommandRequest>,
    event_tx: broadcast::Sender<EventEnvelope>,
    services: Arc<MoodFlowServices>,
}

#[must_use]
pub fn command_channel(
    request_capacity: usize,
    event_capacity: usize,
    services: Arc<MoodFlowServices>,
) -> (HostCommandClient, HostCommandServer) {
    let (event_tx, _event_rx) = broadcast::channel(event_capacity.max(1));
    let (request_tx, request_rx) = mpsc::channel(request_capacity.max(1));

    (
        HostCommandClient {
            request_tx,
            event_tx: event_tx.clone(),
        },
        HostCommandServer {
            request_rx,
            event_tx,
            services,
        },
    )
}

impl HostCommandServer {
    pub async fn run(mut self) {
        while let Some(request) = self.request_rx.recv().await {
            let response = self.dispatch(&request.envelope).await;
            let _ = request.response_tx.send(response);
        }
        tracing::debug!("host command channel closed; router exiting");
    }

    /// Route one envelope, folding failures into an error envelope that
    /// carries the original request ID.
    pub async fn dispatch(&self, envelope: &CommandEnvelope) -> ResponseEnvelope {
        match self.route(envelope).await {
            Ok(payload) => ResponseEnvelope::ok(envelope.request_id.clone(), payload),
            Err(e) => {
                tracing::warn!(
                    command = envelope.command.as_str(),
                    request_id = %envelope.request_id,
                    error = %e,
                    "host command failed"
                );
                ResponseEnvelope::error(envelope.request_id.clone(), e.to_string())
            }
        }
    }

    /// Route a command envelope to the appropriate handler.
    pub async fn route(&self, envelope: &CommandEnvelope) -> Result<Value> {
        let payload = &envelope.payload;
        match envelope.command {
            CommandName::HostPing => Ok(serde_json::json!({"pong": true})),
            CommandName::HostVersion => Ok(serde_json::json!({
                "contract_version": EVENT_VERSION,
                "channel": "moodflow_host_v1",
                "version": env!("CARGO_PKG_VERSION"),
            })),
            CommandName::MoodDetect => self.handle_mood_detect(payload).await,
            CommandName::MoodLatest => self.handle_mood_latest(payload).await,
            CommandName::MoodHistory => self.handle_mood_history(payload).await,
            CommandName::TasksList => self.handle_tasks(payload, false).await,
            CommandName::TasksShuffle => self.handle_tasks(payload, true).await,
            CommandName::TasksComplete => self.handle_tasks_complete(payload).await,
            CommandName::LanguageResolve => self.handle_language_resolve(payload).await,
            CommandName::LanguageSet => self.handle_language_set(envelope).await,
            CommandName::SettingsGet => self.handle_settings_get(payload).await,
            CommandName::SettingsPatch => self.handle_settings_patch(payload).await,
            CommandName::PeerMatch => self.handle_peer_match(payload),
            CommandName::PeerSession => self.handle_peer_session(payload).await,
            CommandName::PeerChat => self.handle_peer_chat(payload).await,
            CommandName::PeerModerate => {
                let message = parse_required_str(payload, "message", "peer.moderate")?;
                to_payload("moderation", &moderate(&message))
            }
            CommandName::RuntimeStop => {
                tracing::info!("runtime.stop requested");
                Ok(serde_json::json!({"stopping": true}))
            }
        }
    }

    async fn handle_mood_detect(&self, payload: &Value) -> Result<Value> {
        let mut request: DetectionRequest = serde_json::from_value(payload.clone())
            .map_err(|e| MoodError::Host(format!("mood.detect payload invalid: {e}")))?;
        if request.user_id.trim().is_empty() {
            request.user_id = DEFAULT_USER.to_owned();
        }
        let user_id = request.user_id.clone();

        let outcome = self.services.detector.detect(request).await?;
        self.emit_detection_events(&user_id, &outcome);
        to_payload("detection outcome", &outcome)
    }

    fn emit_detection_events(&self, user_id: &str, outcome: &DetectionOutcome) {
        self.emit_event(
            EVENT_MOOD_DETECTED,
            serde_json::json!({
                "user_id": user_id,
                "entry_id": outcome.entry.id,
                "mood": outcome.mood,
                "confidence": outcome.confidence,
            }),
        );
        if outcome.crisis.triggered {
            self.emit_event(
                EVENT_CRISIS_ESCALATED,
                serde_json::json!({
                    "user_id": user_id,
                    "entry_id": outcome.entry.id,
                    "reasons": outcome.crisis.reasons,
                    "keywords": outcome.crisis.keywords,
                    "negative_mood_streak": outcome.crisis.negative_mood_streak,
                    "helpline": outcome.crisis.helpline,
                }),
            );
        }
    }

    async fn handle_mood_latest(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let repo = &self.services.repo;
        let entry = self
            .services
            .bounded("mood.latest", repo.get_latest_mood(&user_id))
            .await?;
        Ok(serde_json::json!({"entry": entry}))
    }

    async fn handle_mood_history(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let limit = match payload.get("limit") {
            None | Some(Value::Null) => self.services.config.storage.history_page_size,
            Some(raw) => raw
                .as_u64()
                .filter(|n| *n > 0)
                .map(|n| n as usize)
                .ok_or_else(|| {
                    MoodError::Host("mood.history payload.limit must be a positive integer".into())
                })?,
        };
        let repo = &self.services.repo;
        let entries = self
            .services
            .bounded("mood.history", repo.get_mood_history(&user_id, limit))
            .await?;
        Ok(serde_json::json!({"entries": entries}))
    }

    async fn handle_tasks(&self, payload: &Value, shuffle: bool) -> Result<Value> {
        let command = if shuffle { "tasks.shuffle" } else { "tasks.list" };
        let mood = parse_optional_mood(payload, command)?;
        let repo = &self.services.repo;
        let all = self.services.bounded(command, repo.list_tasks()).await?;

        let selector = &self.services.tasks;
        let mut tasks = match mood {
            Some(mood) => selector.select_by_mood(&all, mood),
            None => all,
        };
        if shuffle {
            tasks = selector.shuffle(&tasks);
        }
        Ok(serde_json::json!({"tasks": tasks}))
    }

    async fn handle_tasks_complete(&self, payload: &Value) -> Result<Value> {
        let task_id = parse_required_str(payload, "task_id", "tasks.complete")?;
        let completed = match payload.get("completed") {
            None | Some(Value::Null) => true,
            Some(raw) => raw.as_bool().ok_or_else(|| {
                MoodError::Host("tasks.complete payload.completed must be a boolean".into())
            })?,
        };
        let repo = &self.services.repo;
        let task = self
            .services
            .bounded(
                "tasks.complete",
                repo.update_task_completion(&task_id, completed),
            )
            .await?;
        Ok(serde_json::json!({"task": task}))
    }

    async fn handle_language_resolve(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let explicit = parse_optional_str(payload, "explicit");
        let resolved = self
            .services
            .resolver
            .resolve(&user_id, explicit.as_deref())
            .await;
        to_payload("resolved language", &resolved)
    }

    async fn handle_language_set(&self, envelope: &CommandEnvelope) -> Result<Value> {
        let payload = &envelope.payload;
        let user_id = parse_user_id(payload);
        let language = parse_required_str(payload, "language", "language.set")?;
        let resolved = self
            .services
            .resolver
            .resolve(&user_id, Some(&language))
            .await;

        self.emit_event(
            EVENT_LANGUAGE_CHANGED,
            serde_json::json!({
                "request_id": envelope.request_id,
                "user_id": user_id,
                "code": resolved.code,
                "rtl": resolved.rtl,
            }),
        );
        to_payload("resolved language", &resolved)
    }

    async fn handle_settings_get(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let repo = &self.services.repo;
        let settings = self
            .services
            .bounded("settings.get", repo.get_user_settings(&user_id))
            .await?
            .unwrap_or_else(|| UserSettings::defaults_for(&user_id));
        Ok(serde_json::json!({"settings": settings}))
    }

    async fn handle_settings_patch(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let Some(raw_patch) = payload.get("patch").filter(|p| p.is_object()) else {
            return Err(MoodError::Host(
                "settings.patch requires payload.patch object".to_owned(),
            ));
        };
        let mut patch: SettingsPatch = serde_json::from_value(raw_patch.clone())
            .map_err(|e| MoodError::Host(format!("settings.patch payload invalid: {e}")))?;

        // Language changes go through the resolver so the stored code is
        // normalised and the local cache stays in step.
        let language = patch.preferred_language.take();
        let repo = &self.services.repo;
        let mut settings = self
            .services
            .bounded("settings.patch", repo.update_user_settings(&user_id, patch))
            .await?;
        if let Some(language) = language {
            let resolved = self
                .services
                .resolver
                .resolve(&user_id, Some(&language))
                .await;
            settings.preferred_language = Some(resolved.code);
        }
        Ok(serde_json::json!({"settings": settings}))
    }

    fn handle_peer_match(&self, payload: &Value) -> Result<Value> {
        let language = parse_optional_str(payload, "language");
        let profile = self
            .services
            .peers
            .matcher()
            .match_for(language.as_deref())
            .ok_or_else(|| MoodError::NotFound("peer profile".into()))?;
        Ok(serde_json::json!({"match": profile}))
    }

    /// Fetch `session_id` when given, otherwise open a session in the
    /// payload language or the user's resolved language.
    async fn handle_peer_session(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let peers = &self.services.peers;
        let session = match parse_optional_str(payload, "session_id") {
            Some(session_id) => peers.get(&session_id, &user_id).await?,
            None => {
                let language = match parse_optional_str(payload, "language") {
                    Some(language) => language,
                    None => self.services.resolver.resolve(&user_id, None).await.code,
                };
                peers.start(&user_id, &language).await?
            }
        };
        Ok(serde_json::json!({"session": session}))
    }

    async fn handle_peer_chat(&self, payload: &Value) -> Result<Value> {
        let user_id = parse_user_id(payload);
        let session_id = parse_required_str(payload, "session_id", "peer.chat")?;
        let message = parse_required_str(payload, "message", "peer.chat")?;
        let language = parse_optional_str(payload, "language");
        let reply = self
            .services
            .peers
            .chat(&session_id, &user_id, &message, language.as_deref())
            .await?;
        to_payload("peer chat reply", &reply)
    }

    fn emit_event(&self, event: &str, payload: Value) {
        let envelope =
            EventEnvelope::new(uuid::Uuid::new_v4().to_string(), event.to_owned(), payload);
        let _ = self.event_tx.send(envelope);
    }
}

fn to_payload<T: Serialize>(what: &str, value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| MoodError::Host(format!("failed to serialize {what}: {e}")))
}

fn parse_user_id(payload: &Value) -> String {
    parse_optional_str(payload, "user_id").unwrap_or_else(|| DEFAULT_USER.to_owned())
}

fn parse_optional_str(payload: &Value, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
}

fn parse_required_str(payload: &Value, key: &str, command: &str) -> Result<String> {
    let Some(raw) = payload.get(key).and_then(Value::as_str) else {
        return Err(MoodError::Host(format!("{command} requires payload.{key}")));
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MoodError::Host(format!(
            "{command} requires a non-empty {key} value"
        )));
    }
    Ok(trimmed.to_owned())
}

fn parse_optional_mood(payload: &Value, command: &str) -> Result<Option<Mood>> {
    let Some(raw) = parse_optional_str(payload, "mood") else {
        return Ok(None);
    };
    Mood::parse(&raw).map(Some).ok_or_else(|| {
        MoodError::Host(format!(
            "{command}: unsupported mood `{raw}` (expected calm/energized/stressed/focused/neutral)"
        ))
    })
}
