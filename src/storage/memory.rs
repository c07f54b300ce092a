//! In-memory repository for single-process hosts and tests.
//!
//! State lives behind `Arc<RwLock<..>>` and is lost when the last clone is
//! dropped. Cheaply cloneable.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::MoodRepository;
use super::types::{MoodEntry, NewMoodEntry, NewTask, SettingsPatch, Task, UserSettings};
use crate::error::{MoodError, Result};
use crate::tasks::seed_catalog;

#[derive(Debug, Default)]
struct State {
    entries: Vec<MoodEntry>,
    tasks: Vec<Task>,
    settings: HashMap<String, UserSettings>,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<RwLock<State>>,
}

impl MemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with the built-in task catalog.
    pub fn with_seed_tasks() -> Self {
        let tasks = seed_catalog()
            .into_iter()
            .map(|t| into_task(new_id(), t))
            .collect();
        Self {
            state: Arc::new(RwLock::new(State {
                tasks,
                ..State::default()
            })),
        }
    }
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn into_task(id: String, t: NewTask) -> Task {
    Task {
        id,
        user_id: t.user_id,
        title: t.title,
        duration: t.duration,
        difficulty: t.difficulty,
        mood: t.mood,
        completed: t.completed,
    }
}

/// Newest first; entries recorded in the same instant keep reverse insertion order.
fn newest_first<'a>(entries: impl DoubleEndedIterator<Item = &'a MoodEntry>) -> Vec<MoodEntry> {
    let mut out: Vec<MoodEntry> = entries.rev().cloned().collect();
    out.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    out
}

#[async_trait]
impl MoodRepository for MemoryRepository {
    async fn create_mood_entry(&self, entry: NewMoodEntry) -> Result<MoodEntry> {
        let record = MoodEntry {
            id: new_id(),
            user_id: entry.user_id,
            mood: entry.mood,
            confidence: entry.confidence.min(100),
            text_input: entry.text_input,
            original_text: entry.original_text,
            original_language: entry.original_language,
            translated_text: entry.translated_text,
            translated_language: entry.translated_language,
            translation_provider: entry.translation_provider,
            face_analysis: entry.face_analysis,
            timestamp: entry.timestamp.unwrap_or_else(Utc::now),
            crisis: entry.crisis,
        };
        self.state.write().await.entries.push(record.clone());
        Ok(record)
    }

    async fn get_mood_history(&self, user_id: &str, limit: usize) -> Result<Vec<MoodEntry>> {
        let state = self.state.read().await;
        let mut history = newest_first(state.entries.iter().filter(|e| e.user_id == user_id));
        history.truncate(limit);
        Ok(history)
    }

    async fn get_latest_mood(&self, user_id: &str) -> Result<Option<MoodEntry>> {
        Ok(self.get_mood_history(user_id, 1).await?.into_iter().next())
    }

    async fn get_mood_entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>> {
        let state = self.state.read().await;
        Ok(newest_first(
            state
                .entries
                .iter()
                .filter(|e| e.user_id == user_id && e.timestamp >= since),
        ))
    }

    async fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>> {
        Ok(self.state.read().await.settings.get(user_id).cloned())
    }

    async fn update_user_settings(
        &self,
        user_id: &str,
        patch: SettingsPatch,
    ) -> Result<UserSettings> {
        let mut state = self.state.write().await;
        let settings = state
            .settings
            .entry(user_id.to_owned())
            .or_insert_with(|| UserSettings::defaults_for(user_id));
        settings.apply(&patch);
        Ok(settings.clone())
    }

    async fn list_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.state.read().await.tasks.clone())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task> {
        if task.title.trim().is_empty() {
            return Err(MoodError::Storage("task title must not be empty".into()));
        }
        if task.duration == 0 {
            return Err(MoodError::Storage(
                "task duration must be greater than 0".into(),
            ));
        }
        let record = into_task(new_id(), task);
        self.state.write().await.tasks.push(record.clone());
        Ok(record)
    }

    async fn update_task_completion(&self, task_id: &str, completed: bool) -> Result<Task> {
        let mut state = self.state.write().await;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| MoodError::NotFound(format!("task {task_id}")))?;
        task.completed = completed;
        Ok(task.clone())
    }
}
