//! Peer chat sessions.
//!
//! A session pairs one user with the matched volunteer profile. Opening it
//! records the volunteer's introduction, translated into the user's
//! language when the primary subtags differ. Each chat turn is moderated,
//! recorded, and answered with a canned volunteer reply. Translation
//! failures never fail a turn: the untranslated text is kept instead.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::{PeerMatcher, PeerProfile, moderate};
use crate::error::{MoodError, Result};
use crate::language::codes::primary_subtag;
use crate::translation::Translator;

const REPLY_LANGUAGE: &str = "en";

const REPLY_TEMPLATES: &[&str] = &[
    "Thank you for sharing that with me. I've felt something similar, and taking things one moment at a time helped.",
    "You're doing really well by opening up. Would you like to try a grounding exercise together?",
    "I hear you. It can be heavy, but you don't have to carry it alone. I'm right here with you.",
    "That sounds challenging. What's one small kindness you could offer yourself today?",
];

const FLAGGED_REPLY: &str =
    "I hear that you're going through a lot. Let's focus on keeping this conversation safe and kind.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerSender {
    User,
    Peer,
}

/// One recorded chat line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMessage {
    pub id: String,
    pub sender: PeerSender,
    /// Text as shown to the user.
    pub text: String,
    pub language: String,
    /// Source language when `text` (or `peer_text`) is a translation.
    pub translated_from: Option<String>,
    /// For user messages, the translation delivered to the volunteer.
    pub peer_text: Option<String>,
    pub flagged: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerSession {
    pub id: String,
    pub user_id: String,
    pub language: String,
    #[serde(rename = "match")]
    pub peer: PeerProfile,
    pub original_intro: String,
    /// Present only when translation changed the introduction.
    pub translated_intro: Option<String>,
    pub messages: Vec<PeerMessage>,
}

/// Outcome of one [`PeerSessions::chat`] turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerChatReply {
    pub session_id: String,
    pub user_message: PeerMessage,
    pub peer_message: PeerMessage,
    /// Moderator notice when the user's message was flagged.
    pub moderation: Option<String>,
}

/// Open peer sessions, keyed by session ID.
pub struct PeerSessions {
    matcher: PeerMatcher,
    translator: Arc<dyn Translator>,
    sessions: RwLock<HashMap<String, PeerSession>>,
}

impl PeerSessions {
    pub fn new(matcher: PeerMatcher, translator: Arc<dyn Translator>) -> Self {
        Self {
            matcher,
            translator,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn matcher(&self) -> &PeerMatcher {
        &self.matcher
    }

    /// Match `user_id` with a volunteer and open a session in `language`.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::NotFound`] when no volunteer profiles exist.
    pub async fn start(&self, user_id: &str, language: &str) -> Result<PeerSession> {
        let peer = self
            .matcher
            .match_for(Some(language))
            .cloned()
            .ok_or_else(|| MoodError::NotFound("peer profile".into()))?;

        let original_intro = peer.introduction.clone();
        let (intro_text, translated_from) = self
            .translate_or_keep(&original_intro, &peer.language, language, "peer introduction")
            .await;
        let translated_intro = (intro_text != original_intro).then(|| intro_text.clone());

        let intro = message(PeerSender::Peer, intro_text, language, translated_from);
        let session = PeerSession {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_owned(),
            language: language.to_owned(),
            peer,
            original_intro,
            translated_intro,
            messages: vec![intro],
        };

        tracing::info!(
            session_id = %session.id,
            user_id,
            match_id = %session.peer.match_id,
            translated = session.translated_intro.is_some(),
            "peer session opened"
        );
        self.sessions
            .write()
            .await
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    /// Snapshot of a session owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::NotFound`] for unknown sessions and for sessions
    /// owned by another user.
    pub async fn get(&self, session_id: &str, user_id: &str) -> Result<PeerSession> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| s.user_id == user_id)
            .cloned()
            .ok_or_else(|| not_found(session_id))
    }

    /// Moderate and record one user message, then record the volunteer's reply.
    ///
    /// `language` overrides the session language for this turn.
    ///
    /// # Errors
    ///
    /// Returns [`MoodError::EmptyInput`] for blank messages and
    /// [`MoodError::NotFound`] as [`get`](Self::get) does.
    pub async fn chat(
        &self,
        session_id: &str,
        user_id: &str,
        text: &str,
        language: Option<&str>,
    ) -> Result<PeerChatReply> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MoodError::EmptyInput);
        }
        let session = self.get(session_id, user_id).await?;
        let user_language = language.unwrap_or(&session.language).to_owned();
        let peer_language = session.peer.language.clone();

        let moderation = moderate(text);

        let written_in = match self.translator.detect_language(text).await {
            Ok(Some(code)) if !code.trim().is_empty() => code,
            Ok(_) => user_language.clone(),
            Err(e) => {
                tracing::warn!(error = %e, "peer chat language detection failed");
                user_language.clone()
            }
        };
        let (peer_text, peer_translated_from) = self
            .translate_or_keep(text, &written_in, &peer_language, "peer chat message")
            .await;
        let mut user_message = message(
            PeerSender::User,
            text.to_owned(),
            &user_language,
            peer_translated_from,
        );
        user_message.peer_text = user_message.translated_from.is_some().then_some(peer_text);
        user_message.flagged = moderation.flagged;

        let turn = session
            .messages
            .iter()
            .filter(|m| m.sender == PeerSender::User)
            .count();
        let reply = if moderation.flagged {
            FLAGGED_REPLY
        } else {
            REPLY_TEMPLATES[turn % REPLY_TEMPLATES.len()]
        };
        let (reply_text, reply_translated_from) = self
            .translate_or_keep(reply, REPLY_LANGUAGE, &user_language, "peer reply")
            .await;
        let mut peer_message = message(
            PeerSender::Peer,
            reply_text,
            &user_language,
            reply_translated_from,
        );
        peer_message.flagged = moderation.flagged;

        {
            let mut sessions = self.sessions.write().await;
            let stored = sessions
                .get_mut(session_id)
                .ok_or_else(|| not_found(session_id))?;
            stored.messages.push(user_message.clone());
            stored.messages.push(peer_message.clone());
        }
        tracing::debug!(
            session_id,
            flagged = moderation.flagged,
            "peer chat turn recorded"
        );

        Ok(PeerChatReply {
            session_id: session_id.to_owned(),
            user_message,
            peer_message,
            moderation: moderation.notice,
        })
    }

    /// `text` in `to`, plus the source language when a translation was used.
    async fn translate_or_keep(
        &self,
        text: &str,
        from: &str,
        to: &str,
        what: &str,
    ) -> (String, Option<String>) {
        if primary_subtag(from) == primary_subtag(to) {
            return (text.to_owned(), None);
        }
        match self.translator.translate(text, from, to).await {
            Ok(out) if !out.trim().is_empty() => (out, Some(from.to_owned())),
            Ok(_) => (text.to_owned(), None),
            Err(e) => {
                tracing::warn!(error = %e, what, from, to, "translation failed; keeping original");
                (text.to_owned(), None)
            }
        }
    }
}

fn message(
    sender: PeerSender,
    text: String,
    language: &str,
    translated_from: Option<String>,
) -> PeerMessage {
    PeerMessage {
        id: uuid::Uuid::new_v4().to_string(),
        sender,
        text,
        language: language.to_owned(),
        translated_from,
        peer_text: None,
        flagged: false,
        timestamp: Utc::now(),
    }
}

fn not_found(session_id: &str) -> MoodError {
    MoodError::NotFound(format!("peer session {session_id}"))
}
