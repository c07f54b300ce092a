//! Persistence boundary.
//!
//! The engine only calls [`MoodRepository`]; it does not own durability or
//! schema. [`memory::MemoryRepository`] is the in-process implementation
//! constructed at host start and dropped at shutdown.

pub mod memory;
pub mod types;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
pub use memory::MemoryRepository;
pub use types::{
    Difficulty, MoodEntry, NewMoodEntry, NewTask, SettingsPatch, Task, UserSettings,
};

/// Async storage collaborator for mood history, tasks and settings.
#[async_trait]
pub trait MoodRepository: Send + Sync {
    /// Persist a detection event, assigning its ID (and timestamp if unset).
    async fn create_mood_entry(&self, entry: NewMoodEntry) -> Result<MoodEntry>;

    /// Most recent entries for `user_id`, newest first, at most `limit`.
    async fn get_mood_history(&self, user_id: &str, limit: usize) -> Result<Vec<MoodEntry>>;

    /// The newest entry for `user_id`, if any.
    async fn get_latest_mood(&self, user_id: &str) -> Result<Option<MoodEntry>>;

    /// Entries for `user_id` stamped at or after `since`, newest first.
    async fn get_mood_entries_since(
        &self,
        user_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodEntry>>;

    async fn get_user_settings(&self, user_id: &str) -> Result<Option<UserSettings>>;

    /// Apply `patch`, creating default settings first for unknown users.
    async fn update_user_settings(
        &self,
        user_id: &str,
        patch: SettingsPatch,
    ) -> Result<UserSettings>;

    /// Every stored task in insertion order.
    async fn list_tasks(&self) -> Result<Vec<Task>>;

    async fn create_task(&self, task: NewTask) -> Result<Task>;

    /// Set a task's completion flag.
    ///
    /// Returns [`crate::MoodError::NotFound`] for unknown IDs.
    async fn update_task_completion(&self, task_id: &str, completed: bool) -> Result<Task>;
}
