//! Peer-support matching, message moderation and chat sessions.

mod session;

pub use session::{PeerChatReply, PeerMessage, PeerSender, PeerSession, PeerSessions};

use serde::{Deserialize, Serialize};

use crate::language::codes::primary_subtag;

/// Recent negative entries at which peer support is offered.
pub const PEER_SUGGESTION_THRESHOLD: u32 = 3;

const MODERATION_BLOCKLIST: &[&str] = &["hate", "kill", "violence", "abuse", "threat"];

const MODERATION_NOTICE: &str =
    "A moderator has flagged parts of this message. Please keep the space compassionate.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerProfile {
    pub match_id: String,
    pub display_name: String,
    pub language: String,
    pub availability: String,
    pub shared_experiences: Vec<String>,
    pub time_zone: String,
    pub introduction: String,
}

/// Result of screening one peer-chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModerationResult {
    pub flagged: bool,
    /// Blocklisted terms found, in blocklist order.
    pub terms: Vec<String>,
    pub notice: Option<String>,
}

/// Screen `text` against the moderation blocklist (case-insensitive substring).
#[must_use]
pub fn moderate(text: &str) -> ModerationResult {
    let lower = text.to_lowercase();
    let terms: Vec<String> = MODERATION_BLOCKLIST
        .iter()
        .filter(|term| lower.contains(*term))
        .map(|term| (*term).to_owned())
        .collect();
    let flagged = !terms.is_empty();
    if flagged {
        tracing::debug!(term_count = terms.len(), "peer message flagged by moderation");
    }
    ModerationResult {
        flagged,
        terms,
        notice: flagged.then(|| MODERATION_NOTICE.to_owned()),
    }
}

/// Whether to surface peer support after a detection.
#[must_use]
pub fn peer_support_suggested(negative_count: u32, keywords: &[String]) -> bool {
    !keywords.is_empty() || negative_count >= PEER_SUGGESTION_THRESHOLD
}

#[derive(Debug, Clone)]
pub struct PeerMatcher {
    profiles: Vec<PeerProfile>,
}

impl Default for PeerMatcher {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PeerMatcher {
    /// The three seeded volunteer profiles (English, Hindi, Spanish).
    pub fn builtin() -> Self {
        Self::with_profiles(vec![
            profile(
                "peer-ava",
                "Ava",
                "en",
                "Online now",
                &["burnout recovery", "tech industry", "mindfulness"],
                "UTC-5",
                "Hey there! I've been through burnout while working in tech. \
                 Happy to share what helped me bounce back.",
            ),
            profile(
                "peer-raj",
                "Raj",
                "hi",
                "Available in evenings",
                &["family stress", "meditation", "career transition"],
                "UTC+5:30",
                "नमस्ते! मैंने करियर बदलते समय बहुत तनाव झेला है। अगर आप बात करना चाहें तो मैं यहाँ हूँ।",
            ),
            profile(
                "peer-lucia",
                "Lucía",
                "es",
                "Usually online weekends",
                &["anxiety management", "creative pursuits", "community volunteering"],
                "UTC+1",
                "¡Hola! Compartir con otras personas creativas me ayudó muchísimo a manejar \
                 la ansiedad. Te escucho.",
            ),
        ])
    }

    pub fn with_profiles(profiles: Vec<PeerProfile>) -> Self {
        Self { profiles }
    }

    pub fn profiles(&self) -> &[PeerProfile] {
        &self.profiles
    }

    /// First profile sharing the primary subtag of `language`, else the
    /// first profile. `None` only when no profiles are configured.
    #[must_use]
    pub fn match_for(&self, language: Option<&str>) -> Option<&PeerProfile> {
        let wanted = language
            .map(primary_subtag)
            .filter(|code| !code.is_empty());
        wanted
            .and_then(|code| {
                self.profiles
                    .iter()
                    .find(|p| primary_subtag(&p.language) == code)
            })
            .or_else(|| self.profiles.first())
    }
}

fn profile(
    match_id: &str,
    display_name: &str,
    language: &str,
    availability: &str,
    shared: &[&str],
    time_zone: &str,
    introduction: &str,
) -> PeerProfile {
    PeerProfile {
        match_id: match_id.to_owned(),
        display_name: display_name.to_owned(),
        language: language.to_owned(),
        availability: availability.to_owned(),
        shared_experiences: shared.iter().map(|s| (*s).to_owned()).collect(),
        time_zone: time_zone.to_owned(),
        introduction: introduction.to_owned(),
    }
}
