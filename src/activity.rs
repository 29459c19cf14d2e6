//! Recording what a learner did in a lesson
//!
//! These helpers turn viewer events (time on a lesson, a finished quiz)
//! into progress upserts keyed by the deterministic progress id.

use serde::Serialize;
use crate::Result;
use crate::progress::UserProgress;
use crate::quiz::{Quiz, ScoreBand};
use crate::store::LocalStore;

/// A snapshot of a learner's session on one lesson
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LessonSession {
    /// Completion percentage reached so far
    pub progress: u8,
    /// Total seconds spent on the lesson, including earlier sessions
    pub seconds_spent: u64,
    pub completed: bool,
}

/// Save a viewer session.
///
/// Earlier quiz scores are kept, stored minutes never go down, and a
/// completed lesson stays completed.
pub async fn record_session(
    store: &LocalStore,
    user_id: &str,
    lesson_id: &str,
    session: LessonSession,
) -> Result<UserProgress> {
    let previous = store.get_progress_by_lesson(lesson_id, user_id).await?;

    let mut progress = UserProgress::new(user_id, lesson_id)
        .with_progress(session.progress)
        .with_seconds_spent(session.seconds_spent);
    let mut completed = session.completed;
    if let Some(previous) = previous {
        progress.time_spent = progress.time_spent.max(previous.time_spent);
        progress.quiz_score = previous.quiz_score;
        completed |= previous.completed;
    }
    if completed {
        progress = progress.completed(None);
    }

    store.update_progress(&progress).await?;
    Ok(progress)
}

/// Result of a submitted quiz
#[derive(Debug, Clone, Serialize)]
pub struct QuizOutcome {
    pub quiz_id: String,
    pub correct: usize,
    pub total: usize,
    pub score: u8,
    pub band: ScoreBand,
    pub progress: UserProgress,
}

/// Score a quiz attempt and mark the lesson completed with that score.
/// `seconds_spent` covers this attempt only and is added to earlier time.
pub async fn record_quiz_attempt(
    store: &LocalStore,
    user_id: &str,
    quiz: &Quiz,
    answers: &[Option<usize>],
    seconds_spent: u64,
) -> Result<QuizOutcome> {
    let score = quiz.score(answers);
    let earlier = store
        .get_progress_by_lesson(&quiz.lesson_id, user_id)
        .await?
        .map_or(0, |p| p.time_spent);

    let mut progress = UserProgress::new(user_id, quiz.lesson_id.as_str())
        .with_seconds_spent(seconds_spent)
        .completed(Some(score));
    progress.time_spent = progress.time_spent.saturating_add(earlier);

    store.update_progress(&progress).await?;
    tracing::info!("User {} scored {} on quiz {}", user_id, score, quiz.id);

    Ok(QuizOutcome {
        quiz_id: quiz.id.clone(),
        correct: quiz.correct_count(answers),
        total: quiz.questions.len(),
        score,
        band: ScoreBand::for_score(score),
        progress,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{Catalog, load_quiz};

    async fn open() -> LocalStore {
        let store = LocalStore::in_memory();
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_quiz_attempt_records_score() {
        let store = open().await;
        let quiz = load_quiz(&store, &Catalog::sample(), "4").await.unwrap().unwrap();

        let outcome = record_quiz_attempt(&store, "u1", &quiz, &[Some(2), Some(1), Some(0)], 95)
            .await
            .unwrap();
        assert_eq!(outcome.score, 67);
        assert_eq!(outcome.correct, 2);
        assert_eq!(outcome.band, ScoreBand::Good);

        let stored = store.get_progress_by_lesson("4", "u1").await.unwrap().unwrap();
        assert!(stored.completed);
        assert_eq!(stored.progress, 100);
        assert_eq!(stored.time_spent, 2);
        assert_eq!(stored.quiz_score, Some(67));
    }

    #[tokio::test]
    async fn test_session_keeps_earlier_quiz_score() {
        let store = open().await;
        let quiz = load_quiz(&store, &Catalog::sample(), "4").await.unwrap().unwrap();
        record_quiz_attempt(&store, "u1", &quiz, &[Some(2), Some(1), Some(2)], 60)
            .await
            .unwrap();

        let session = LessonSession { progress: 100, seconds_spent: 300, completed: true };
        let saved = record_session(&store, "u1", "4", session).await.unwrap();
        assert_eq!(saved.quiz_score, Some(100));
        assert_eq!(saved.time_spent, 5);
    }

    #[tokio::test]
    async fn test_session_upserts_single_record() {
        let store = open().await;
        let first = LessonSession { progress: 30, seconds_spent: 90, completed: false };
        let second = LessonSession { progress: 70, seconds_spent: 400, completed: false };

        record_session(&store, "u1", "1", first).await.unwrap();
        record_session(&store, "u1", "1", second).await.unwrap();

        let all = store.get_progress_by_user("u1").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].progress, 70);
        assert_eq!(all[0].time_spent, 7);
        assert!(!all[0].completed);
    }

    #[tokio::test]
    async fn test_quiz_attempt_adds_to_session_time() {
        let store = open().await;
        let quiz = load_quiz(&store, &Catalog::sample(), "4").await.unwrap().unwrap();

        let session = LessonSession { progress: 50, seconds_spent: 600, completed: false };
        record_session(&store, "u1", "4", session).await.unwrap();
        let outcome = record_quiz_attempt(&store, "u1", &quiz, &[Some(2), Some(1), Some(2)], 30)
            .await
            .unwrap();

        assert_eq!(outcome.progress.time_spent, 11);
        let stored = store.get_progress_by_lesson("4", "u1").await.unwrap().unwrap();
        assert_eq!(stored.time_spent, 11);
        assert_eq!(stored.quiz_score, Some(100));
    }

    #[tokio::test]
    async fn test_completed_lesson_stays_completed() {
        let store = open().await;
        let done = LessonSession { progress: 100, seconds_spent: 900, completed: true };
        let revisit = LessonSession { progress: 10, seconds_spent: 60, completed: false };

        record_session(&store, "u1", "1", done).await.unwrap();
        let saved = record_session(&store, "u1", "1", revisit).await.unwrap();

        assert!(saved.completed);
        assert_eq!(saved.progress, 100);
        assert_eq!(saved.time_spent, 15);
        assert_eq!(store.get_progress_by_lesson("1", "u1").await.unwrap().unwrap(), saved);
    }
}
