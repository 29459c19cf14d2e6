//! Lesson records - the learning units of the catalog
//!
//! Every lesson carries one of four content kinds:
//! - `Video` / `Audio`: `content` is a URL to the media asset
//! - `Text`: `content` is the inline lesson text
//! - `Quiz`: `content` is the id of the quiz record for this lesson

use crate::storage::collection::Record;
use crate::storage::schema::{self, CollectionSchema};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lesson content kind. The lowercase spellings are part of the stored format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LessonType {
    Video,
    Audio,
    Text,
    Quiz,
}

impl LessonType {
    /// Get the string representation of the lesson type
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonType::Video => "video",
            LessonType::Audio => "audio",
            LessonType::Text => "text",
            LessonType::Quiz => "quiz",
        }
    }

    /// Get all lesson types
    pub fn all() -> &'static [LessonType] {
        &[LessonType::Video, LessonType::Audio, LessonType::Text, LessonType::Quiz]
    }
}

impl FromStr for LessonType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "video" => Ok(LessonType::Video),
            "audio" => Ok(LessonType::Audio),
            "text" => Ok(LessonType::Text),
            "quiz" => Ok(LessonType::Quiz),
            _ => Err(Error::InvalidRecord(format!("Unknown lesson type: {}", s))),
        }
    }
}

impl std::fmt::Display for LessonType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Difficulty level of a lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Beginner => "beginner",
            Level::Intermediate => "intermediate",
            Level::Advanced => "advanced",
        }
    }

    pub fn all() -> &'static [Level] {
        &[Level::Beginner, Level::Intermediate, Level::Advanced]
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "beginner" => Ok(Level::Beginner),
            "intermediate" => Ok(Level::Intermediate),
            "advanced" => Ok(Level::Advanced),
            _ => Err(Error::InvalidRecord(format!("Unknown level: {}", s))),
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A learning unit in the catalog.
///
/// Lessons are written once when the catalog is seeded and are read-only
/// afterwards. The id is supplied by the catalog, not generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: LessonType,
    /// Media URL, inline text or quiz id depending on `kind`
    pub content: String,
    /// Expected duration in minutes
    pub duration: u32,
    /// Free-form category, e.g. "Mathematics"
    pub subject: String,
    pub level: Level,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Lesson {
    /// Create a lesson with the required fields; description, language and
    /// thumbnail can be filled in with the builder methods.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        kind: LessonType,
        content: impl Into<String>,
        duration: u32,
        subject: impl Into<String>,
        level: Level,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            kind,
            content: content.into(),
            duration,
            subject: subject.into(),
            level,
            language: "English".to_string(),
            thumbnail: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    /// The quiz id referenced by a quiz lesson
    pub fn quiz_id(&self) -> Option<&str> {
        match self.kind {
            LessonType::Quiz => Some(&self.content),
            _ => None,
        }
    }
}

impl Record for Lesson {
    fn schema() -> &'static CollectionSchema {
        &schema::LESSONS
    }

    fn primary_key(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::InvalidRecord("lesson id must not be empty".into()));
        }
        if self.duration == 0 {
            return Err(Error::InvalidRecord(format!(
                "lesson '{}' must have a positive duration",
                self.id
            )));
        }
        Ok(())
    }
}
