//! Catalog seeding
//!
//! Seeding is orchestration on top of the store, not part of it: the store
//! never inserts anything by itself. Two protocols live here:
//! - first run: when no lessons exist, insert the catalog's lessons
//! - quiz fallback: read a lesson's quiz; on a miss insert the catalog
//!   default for that lesson and read again

use std::path::Path;
use serde::{Deserialize, Serialize};
use crate::Result;
use crate::lesson::{Lesson, LessonType, Level};
use crate::quiz::{Quiz, QuizQuestion};
use crate::store::LocalStore;

/// Initial content shipped with the client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub lessons: Vec<Lesson>,
    #[serde(default)]
    pub quizzes: Vec<Quiz>,
}

impl Catalog {
    /// Load a catalog from a JSON file `{"lessons": [...], "quizzes": [...]}`
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// The default quiz for a lesson, if the catalog has one
    pub fn quiz_for_lesson(&self, lesson_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.lesson_id == lesson_id)
    }

    /// The built-in demo catalog
    pub fn sample() -> Self {
        Self {
            lessons: sample_lessons(),
            quizzes: sample_quizzes(),
        }
    }
}

/// Outcome of a seeding pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub lessons_added: usize,
    pub quizzes_added: usize,
    pub skipped: usize,
}

impl std::fmt::Display for SeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} lesson(s), {} quiz(zes) added, {} already present",
            self.lessons_added, self.quizzes_added, self.skipped
        )
    }
}

/// Insert the catalog's lessons if the lessons collection is empty.
///
/// Quizzes are not inserted here; they arrive through `load_quiz` the
/// first time a quiz lesson is opened.
pub async fn seed_catalog_if_empty(store: &LocalStore, catalog: &Catalog) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    if !store.get_all_lessons().await?.is_empty() {
        tracing::debug!("Lessons already present, skipping catalog seed");
        return Ok(report);
    }

    for lesson in &catalog.lessons {
        store.add_lesson(lesson).await?;
        report.lessons_added += 1;
    }
    tracing::info!("Seeded {} lesson(s)", report.lessons_added);
    Ok(report)
}

/// Insert every catalog lesson and quiz that is not stored yet.
///
/// Records already present are left untouched and counted as skipped.
pub async fn seed_catalog(store: &LocalStore, catalog: &Catalog) -> Result<SeedReport> {
    let mut report = SeedReport::default();

    for lesson in &catalog.lessons {
        match store.add_lesson(lesson).await {
            Ok(()) => report.lessons_added += 1,
            Err(e) if e.is_duplicate_key() => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }
    for quiz in &catalog.quizzes {
        match store.add_quiz(quiz).await {
            Ok(()) => report.quizzes_added += 1,
            Err(e) if e.is_duplicate_key() => report.skipped += 1,
            Err(e) => return Err(e),
        }
    }

    tracing::info!("Catalog seed: {}", report);
    Ok(report)
}

/// Read the quiz for a lesson, seeding the catalog default on a miss.
///
/// Returns `None` when neither the store nor the catalog has a quiz.
pub async fn load_quiz(store: &LocalStore, catalog: &Catalog, lesson_id: &str) -> Result<Option<Quiz>> {
    if let Some(quiz) = store.get_quiz_by_lesson(lesson_id).await? {
        return Ok(Some(quiz));
    }

    let Some(default) = catalog.quiz_for_lesson(lesson_id) else {
        tracing::debug!("No quiz stored or in catalog for lesson {}", lesson_id);
        return Ok(None);
    };

    match store.add_quiz(default).await {
        Ok(()) => tracing::info!("Seeded quiz {} for lesson {}", default.id, lesson_id),
        // another caller seeded it first
        Err(e) if e.is_duplicate_key() => {}
        Err(e) => return Err(e),
    }

    store.get_quiz_by_lesson(lesson_id).await
}

fn sample_lessons() -> Vec<Lesson> {
    vec![
        Lesson::new("1", "Basic Mathematics - Addition", LessonType::Video, "https://example.com/math-addition.mp4", 15, "Mathematics", Level::Beginner)
            .with_description("Learn the fundamentals of addition with interactive examples")
            .with_thumbnail("/placeholder-math.jpg"),
        Lesson::new("2", "English Alphabet Sounds", LessonType::Audio, "https://example.com/alphabet-sounds.mp3", 10, "English", Level::Beginner)
            .with_description("Practice pronunciation of English alphabet letters")
            .with_thumbnail("/placeholder-english.jpg"),
        Lesson::new("3", "Introduction to Science", LessonType::Video, "https://example.com/intro-science.mp4", 20, "Science", Level::Beginner)
            .with_description("Discover the world of science through simple experiments")
            .with_thumbnail("/placeholder-science.jpg"),
        Lesson::new("4", "Mathematical Quiz - Basic Operations", LessonType::Quiz, "quiz-4", 10, "Mathematics", Level::Beginner)
            .with_description("Test your knowledge of basic mathematical operations")
            .with_thumbnail("/placeholder-quiz.jpg"),
        Lesson::new("5", "Hindi Varnamala (हिंदी वर्णमाला)", LessonType::Audio, "https://example.com/hindi-varnamala.mp3", 12, "Hindi", Level::Beginner)
            .with_description("Hindi alphabet learning with pronunciation guide")
            .with_language("Hindi")
            .with_thumbnail("/placeholder-hindi.jpg"),
        Lesson::new("6", "Digital Literacy - Using a Computer", LessonType::Video, "https://example.com/computer-basics.mp4", 25, "Digital Literacy", Level::Beginner)
            .with_description("Learn basic computer operations and digital skills")
            .with_thumbnail("/placeholder-computer.jpg"),
    ]
}

fn sample_quizzes() -> Vec<Quiz> {
    vec![Quiz::new(
        "quiz-4",
        "4",
        vec![
            QuizQuestion::new("q1", "What is 5 + 3?", &["6", "7", "8", "9"], 2)
                .with_explanation("5 + 3 = 8. When we add 5 and 3 together, we get 8."),
            QuizQuestion::new("q2", "What is 10 - 4?", &["5", "6", "7", "8"], 1)
                .with_explanation("10 - 4 = 6. When we subtract 4 from 10, we get 6."),
            QuizQuestion::new("q3", "What is 2 × 3?", &["4", "5", "6", "7"], 2)
                .with_explanation("2 × 3 = 6. When we multiply 2 by 3, we get 6."),
        ],
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    async fn open() -> LocalStore {
        let store = LocalStore::in_memory();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_seed_only_when_empty() {
        let store = open().await;
        let catalog = Catalog::sample();

        let first = seed_catalog_if_empty(&store, &catalog).await.unwrap();
        assert_eq!(first.lessons_added, 6);

        let second = seed_catalog_if_empty(&store, &catalog).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.get_all_lessons().await.unwrap().len(), 6);
        assert!(store.get_quiz_by_lesson("4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_full_seed_skips_existing() {
        let store = open().await;
        let catalog = Catalog::sample();
        seed_catalog_if_empty(&store, &catalog).await.unwrap();

        let report = seed_catalog(&store, &catalog).await.unwrap();
        assert_eq!(report.lessons_added, 0);
        assert_eq!(report.quizzes_added, 1);
        assert_eq!(report.skipped, 6);
    }

    #[tokio::test]
    async fn test_quiz_fallback_seeds_once() {
        let store = open().await;
        let catalog = Catalog::sample();

        let quiz = load_quiz(&store, &catalog, "4").await.unwrap().unwrap();
        assert_eq!(quiz.id, "quiz-4");
        assert_eq!(quiz.questions.len(), 3);

        // second open reads the stored copy instead of inserting again
        let again = load_quiz(&store, &catalog, "4").await.unwrap().unwrap();
        assert_eq!(again, quiz);
        let stored: Vec<Quiz> = store.get_all().await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_quiz_fallback_miss_everywhere() {
        let store = open().await;
        assert!(load_quiz(&store, &Catalog::sample(), "1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sample_quiz_scores_as_expected() {
        let store = open().await;
        let quiz = load_quiz(&store, &Catalog::sample(), "4").await.unwrap().unwrap();
        let correct: Vec<usize> = quiz.questions.iter().map(|q| q.correct_answer).collect();
        assert_eq!(correct, vec![2, 1, 2]);
        assert_eq!(quiz.score(&[Some(2), Some(1), Some(0)]), 67);
    }

    #[tokio::test]
    async fn test_catalog_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, serde_json::to_string(&Catalog::sample()).unwrap()).unwrap();

        let catalog = Catalog::from_json_file(&path).unwrap();
        assert_eq!(catalog.lessons.len(), 6);
        assert_eq!(catalog.quiz_for_lesson("4").map(|q| q.id.as_str()), Some("quiz-4"));

        let missing = Catalog::from_json_file(&dir.path().join("missing.json"));
        assert!(matches!(missing, Err(Error::Io(_))));
    }
}
