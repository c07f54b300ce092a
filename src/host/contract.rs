//! Versioned host command/event envelopes for the moodflow host bridge.

use serde::{Deserialize, Serialize};

/// Contract version for host command/event envelopes.
pub const EVENT_VERSION: u32 = 1;

/// Event emitted after every successful detection.
pub const EVENT_MOOD_DETECTED: &str = "mood.detected";
/// Event emitted when a detection raised the crisis flag.
pub const EVENT_CRISIS_ESCALATED: &str = "crisis.escalated";
/// Event emitted when a user explicitly changes language.
pub const EVENT_LANGUAGE_CHANGED: &str = "language.changed";

/// V1 command set for host integrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandName {
    #[serde(rename = "host.ping")]
    HostPing,
    #[serde(rename = "host.version")]
    HostVersion,
    #[serde(rename = "mood.detect")]
    MoodDetect,
    #[serde(rename = "mood.latest")]
    MoodLatest,
    #[serde(rename = "mood.history")]
    MoodHistory,
    #[serde(rename = "tasks.list")]
    TasksList,
    #[serde(rename = "tasks.shuffle")]
    TasksShuffle,
    #[serde(rename = "tasks.complete")]
    TasksComplete,
    #[serde(rename = "language.resolve")]
    LanguageResolve,
    #[serde(rename = "language.set")]
    LanguageSet,
    #[serde(rename = "settings.get")]
    SettingsGet,
    #[serde(rename = "settings.patch")]
    SettingsPatch,
    #[serde(rename = "peer.match")]
    PeerMatch,
    #[serde(rename = "peer.moderate")]
    PeerModerate,
    #[serde(rename = "peer.session")]
    PeerSession,
    #[serde(rename = "peer.chat")]
    PeerChat,
    #[serde(rename = "runtime.stop")]
    RuntimeStop,
}

impl CommandName {
    /// Every command, in wire-documentation order.
    pub const ALL: [CommandName; 17] = [
        Self::HostPing,
        Self::HostVersion,
        Self::MoodDetect,
        Self::MoodLatest,
        Self::MoodHistory,
        Self::TasksList,
        Self::TasksShuffle,
        Self::TasksComplete,
        Self::LanguageResolve,
        Self::LanguageSet,
        Self::SettingsGet,
        Self::SettingsPatch,
        Self::PeerMatch,
        Self::PeerModerate,
        Self::PeerSession,
        Self::PeerChat,
        Self::RuntimeStop,
    ];

    /// Render command name to wire format.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostPing => "host.ping",
            Self::HostVersion => "host.version",
            Self::MoodDetect => "mood.detect",
            Self::MoodLatest => "mood.latest",
            Self::MoodHistory => "mood.history",
            Self::TasksList => "tasks.list",
            Self::TasksShuffle => "tasks.shuffle",
            Self::TasksComplete => "tasks.complete",
            Self::LanguageResolve => "language.resolve",
            Self::LanguageSet => "language.set",
            Self::SettingsGet => "settings.get",
            Self::SettingsPatch => "settings.patch",
            Self::PeerMatch => "peer.match",
            Self::PeerModerate => "peer.moderate",
            Self::PeerSession => "peer.session",
            Self::PeerChat => "peer.chat",
            Self::RuntimeStop => "runtime.stop",
        }
    }

    /// Parse a command name from wire format.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == raw)
    }
}

/// A versioned response envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub v: u32,
    pub request_id: String,
    pub ok: bool,
    pub payload: serde_json::Value,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a successful response envelope.
    #[must_use]
    pub fn ok(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: true,
            payload,
            error: None,
        }
    }

    /// Build an error response envelope.
    #[must_use]
    pub fn error(request_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            ok: false,
            payload: serde_json::Value::Null,
            error: Some(message.into()),
        }
    }
}

/// A versioned command envelope from frontend -> backend host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEnvelope {
    pub v: u32,
    pub request_id: String,
    pub command: CommandName,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl CommandEnvelope {
    /// Build a v1 command envelope.
    #[must_use]
    pub fn new(
        request_id: impl Into<String>,
        command: CommandName,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            request_id: request_id.into(),
            command,
            payload,
        }
    }

    /// Validate envelope version and required identifiers.
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.v != EVENT_VERSION {
            return Err(ContractError::new(
                ContractErrorKind::UnsupportedVersion,
                format!(
                    "unsupported contract version {}; expected {}",
                    self.v, EVENT_VERSION
                ),
            ));
        }
        if self.request_id.trim().is_empty() {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                "request_id cannot be empty".to_owned(),
            ));
        }
        if !(self.payload.is_object() || self.payload.is_null()) {
            return Err(ContractError::new(
                ContractErrorKind::InvalidEnvelope,
                format!("{} payload must be a JSON object", self.command.as_str()),
            ));
        }
        Ok(())
    }
}

/// A versioned event envelope from backend host -> frontend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub v: u32,
    pub event_id: String,
    pub event: String,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    /// Build a v1 event envelope.
    #[must_use]
    pub fn new(
        event_id: impl Into<String>,
        event: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            v: EVENT_VERSION,
            event_id: event_id.into(),
            event: event.into(),
            payload,
        }
    }
}

/// Contract validation error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractErrorKind {
    UnsupportedVersion,
    InvalidEnvelope,
}

/// Contract validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractError {
    pub kind: ContractErrorKind,
    pub message: String,
}

impl ContractError {
    #[must_use]
    pub fn new(kind: ContractErrorKind, message: String) -> Self {
        Self { kind, message }
    }
}

impl std::fmt::Display for ContractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ContractError {}
