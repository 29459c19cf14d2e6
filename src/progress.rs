//! Per-user lesson progress

use crate::storage::collection::Record;
use crate::storage::schema::{self, CollectionSchema};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Build the deterministic progress id for a (user, lesson) pair.
///
/// Writing through this id is what makes repeated progress updates
/// overwrite a single record instead of appending new ones.
///
/// The id is ambiguous when ids contain `-`: `("u1-a", "b")` and
/// `("u1", "a-b")` both map to `"u1-a-b"`, and the later write replaces
/// the earlier pair's record.
pub fn progress_id(user_id: &str, lesson_id: &str) -> String {
    format!("{}-{}", user_id, lesson_id)
}

/// Progress of one user on one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    /// `"{userId}-{lessonId}"` by convention
    pub id: String,
    pub user_id: String,
    pub lesson_id: String,
    pub completed: bool,
    /// Percentage, 0-100
    pub progress: u8,
    /// Whole minutes spent on the lesson
    pub time_spent: u32,
    pub last_accessed: DateTime<Utc>,
    /// Only present once a quiz lesson has been attempted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiz_score: Option<u8>,
}

impl UserProgress {
    /// Fresh, untouched progress for a lesson, accessed now
    pub fn new(user_id: impl Into<String>, lesson_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        let lesson_id = lesson_id.into();
        Self {
            id: progress_id(&user_id, &lesson_id),
            user_id,
            lesson_id,
            completed: false,
            progress: 0,
            time_spent: 0,
            last_accessed: Utc::now(),
            quiz_score: None,
        }
    }

    /// Set the completion percentage, clamped to 100
    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_time_spent(mut self, minutes: u32) -> Self {
        self.time_spent = minutes;
        self
    }

    /// Record time spent from a seconds counter, rounding up to whole minutes
    pub fn with_seconds_spent(mut self, seconds: u64) -> Self {
        self.time_spent = seconds.div_ceil(60).min(u32::MAX as u64) as u32;
        self
    }

    pub fn accessed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_accessed = at;
        self
    }

    /// Mark the lesson as finished. Progress is forced to 100.
    pub fn completed(mut self, quiz_score: Option<u8>) -> Self {
        self.completed = true;
        self.progress = 100;
        if quiz_score.is_some() {
            self.quiz_score = quiz_score;
        }
        self
    }

    /// Whether the record's id follows the `"{userId}-{lessonId}"` convention
    pub fn has_conventional_id(&self) -> bool {
        self.id == progress_id(&self.user_id, &self.lesson_id)
    }

    /// Whether both records track the same (user, lesson) pair
    pub fn same_pair(&self, other: &UserProgress) -> bool {
        self.user_id == other.user_id && self.lesson_id == other.lesson_id
    }

    /// Started but not yet completed
    pub fn is_in_progress(&self) -> bool {
        !self.completed
    }
}

impl Record for UserProgress {
    fn schema() -> &'static CollectionSchema {
        &schema::PROGRESS
    }

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() || self.user_id.is_empty() || self.lesson_id.is_empty() {
            return Err(Error::InvalidRecord(
                "progress id, userId and lessonId must not be empty".into(),
            ));
        }
        if self.progress > 100 {
            return Err(Error::InvalidRecord(format!(
                "progress '{}' out of range: {}",
                self.id, self.progress
            )));
        }
        if let Some(score) = self.quiz_score {
            if score > 100 {
                return Err(Error::InvalidRecord(format!(
                    "quiz score for '{}' out of range: {}",
                    self.id, score
                )));
            }
        }
        Ok(())
    }
}
