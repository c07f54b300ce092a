//! Mood-matched task suggestions.
//!
//! Selection filters the catalog by mood and falls back to the whole catalog
//! when nothing matches. Shuffling is a uniform Fisher–Yates permutation with
//! an injectable random source.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::mood::Mood;
use crate::storage::{Difficulty, NewTask, Task};

/// (title, minutes, difficulty, mood) for the built-in catalog.
const SEED_TASKS: &[(&str, u32, Difficulty, Mood)] = &[
    ("Morning meditation and journaling", 15, Difficulty::Easy, Mood::Calm),
    ("Review project documentation", 30, Difficulty::Medium, Mood::Calm),
    ("Email responses and admin tasks", 20, Difficulty::Easy, Mood::Calm),
    ("Organize workspace and files", 25, Difficulty::Easy, Mood::Calm),
    ("Light reading and research", 40, Difficulty::Medium, Mood::Calm),
    ("Tackle challenging coding problem", 90, Difficulty::Hard, Mood::Energized),
    ("Brainstorm new project ideas", 45, Difficulty::Medium, Mood::Energized),
    ("Team collaboration meeting", 60, Difficulty::Medium, Mood::Energized),
    ("Learn new technology or framework", 75, Difficulty::Hard, Mood::Energized),
    ("Creative design work", 50, Difficulty::Medium, Mood::Energized),
    ("Simple file organization", 15, Difficulty::Easy, Mood::Stressed),
    ("Take a short walk outside", 10, Difficulty::Easy, Mood::Stressed),
    ("Listen to calming music", 20, Difficulty::Easy, Mood::Stressed),
    ("Gentle stretching exercises", 15, Difficulty::Easy, Mood::Stressed),
    ("Clear inbox - simple replies only", 25, Difficulty::Easy, Mood::Stressed),
    ("Deep work: Write comprehensive report", 120, Difficulty::Hard, Mood::Focused),
    ("Code review and refactoring", 60, Difficulty::Medium, Mood::Focused),
    ("Strategic planning session", 90, Difficulty::Hard, Mood::Focused),
    ("Complex problem-solving task", 75, Difficulty::Hard, Mood::Focused),
    ("Detailed analysis and research", 80, Difficulty::Medium, Mood::Focused),
    ("Routine tasks and follow-ups", 30, Difficulty::Medium, Mood::Neutral),
    ("Read industry articles", 25, Difficulty::Easy, Mood::Neutral),
    ("Update project tracker", 15, Difficulty::Easy, Mood::Neutral),
    ("Review meeting notes", 20, Difficulty::Easy, Mood::Neutral),
    ("Plan tomorrow's schedule", 30, Difficulty::Medium, Mood::Neutral),
];

/// The built-in task catalog, five tasks per mood, owned by `"default"`.
pub fn seed_catalog() -> Vec<NewTask> {
    SEED_TASKS
        .iter()
        .map(|&(title, duration, difficulty, mood)| NewTask {
            user_id: "default".to_owned(),
            title: title.to_owned(),
            duration,
            difficulty,
            mood,
            completed: false,
        })
        .collect()
}

/// Tasks suited to `mood`, or every task when none match.
#[must_use]
pub fn select_by_mood(tasks: &[Task], mood: Mood) -> Vec<Task> {
    let matching: Vec<Task> = tasks.iter().filter(|t| t.mood == mood).cloned().collect();
    if matching.is_empty() {
        tasks.to_vec()
    } else {
        matching
    }
}

/// In-place uniform shuffle driven by `rng`.
pub fn shuffle_with<R: Rng + ?Sized>(tasks: &mut [Task], rng: &mut R) {
    tasks.shuffle(rng);
}

/// Owns the random source used for task shuffles.
pub struct TaskSelector {
    rng: Mutex<StdRng>,
}

impl Default for TaskSelector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TaskSelector {
    /// `seed` pins the shuffle sequence; `None` seeds from entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Filter `tasks` by mood, falling back to the full list.
    #[must_use]
    pub fn select_by_mood(&self, tasks: &[Task], mood: Mood) -> Vec<Task> {
        select_by_mood(tasks, mood)
    }

    /// A shuffled copy of `tasks`.
    #[must_use]
    pub fn shuffle(&self, tasks: &[Task]) -> Vec<Task> {
        let mut out = tasks.to_vec();
        match self.rng.lock() {
            Ok(mut rng) => shuffle_with(&mut out, &mut *rng),
            Err(poisoned) => shuffle_with(&mut out, &mut *poisoned.into_inner()),
        }
        out
    }
}
