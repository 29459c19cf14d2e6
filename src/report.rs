//! Reports over stored progress
//!
//! - `StudentSummary`: one learner's dashboard numbers
//! - `ClassReport`: every cached student profile, for teachers
//! - `LessonReport`: how all learners did on one lesson

use std::collections::HashMap;
use serde::Serialize;
use crate::Result;
use crate::lesson::Lesson;
use crate::progress::UserProgress;
use crate::store::LocalStore;

/// Lessons shown under "continue learning"
const IN_PROGRESS_LIMIT: usize = 3;
/// Lessons shown under "recommended"
const RECOMMENDED_LIMIT: usize = 4;

/// Mean quiz score over records that have one
fn average_score<'a>(progress: impl IntoIterator<Item = &'a UserProgress>) -> Option<f64> {
    let scores: Vec<f64> = progress
        .into_iter()
        .filter_map(|p| p.quiz_score.map(f64::from))
        .collect();
    if scores.is_empty() {
        None
    } else {
        Some(scores.iter().sum::<f64>() / scores.len() as f64)
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Lesson reference used in report listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonRef {
    pub id: String,
    pub title: String,
}

impl From<&Lesson> for LessonRef {
    fn from(lesson: &Lesson) -> Self {
        Self {
            id: lesson.id.clone(),
            title: lesson.title.clone(),
        }
    }
}

/// Dashboard numbers for one learner
#[derive(Debug, Clone, Serialize)]
pub struct StudentSummary {
    pub user_id: String,
    pub total_lessons: usize,
    pub completed_lessons: usize,
    /// Minutes across all lessons
    pub total_time_spent: u64,
    /// Over attempted quizzes only; `None` before the first attempt
    pub average_score: Option<f64>,
    /// Started but unfinished, in catalog order
    pub in_progress: Vec<LessonRef>,
    /// Never opened, in catalog order
    pub recommended: Vec<LessonRef>,
}

impl StudentSummary {
    pub fn build(user_id: &str, lessons: &[Lesson], progress: &[UserProgress]) -> Self {
        let by_lesson: HashMap<&str, &UserProgress> =
            progress.iter().map(|p| (p.lesson_id.as_str(), p)).collect();

        let in_progress = lessons
            .iter()
            .filter(|l| by_lesson.get(l.id.as_str()).is_some_and(|p| p.is_in_progress()))
            .take(IN_PROGRESS_LIMIT)
            .map(LessonRef::from)
            .collect();

        let recommended = lessons
            .iter()
            .filter(|l| !by_lesson.contains_key(l.id.as_str()))
            .take(RECOMMENDED_LIMIT)
            .map(LessonRef::from)
            .collect();

        Self {
            user_id: user_id.to_string(),
            total_lessons: lessons.len(),
            completed_lessons: progress.iter().filter(|p| p.completed).count(),
            total_time_spent: progress.iter().map(|p| u64::from(p.time_spent)).sum(),
            average_score: average_score(progress),
            in_progress,
            recommended,
        }
    }

    pub fn completion_percent(&self) -> f64 {
        percent(self.completed_lessons, self.total_lessons)
    }
}

/// Load and summarize one learner's progress
pub async fn student_summary(store: &LocalStore, user_id: &str) -> Result<StudentSummary> {
    let lessons = store.get_all_lessons().await?;
    let progress = store.get_progress_by_user(user_id).await?;
    Ok(StudentSummary::build(user_id, &lessons, &progress))
}

/// One row of the class report
#[derive(Debug, Clone, Serialize)]
pub struct StudentRow {
    pub user_id: String,
    pub name: String,
    pub grade: Option<String>,
    pub completed_lessons: usize,
    pub total_lessons: usize,
    pub time_spent: u64,
    pub average_score: Option<f64>,
}

impl StudentRow {
    pub fn completion_percent(&self) -> f64 {
        percent(self.completed_lessons, self.total_lessons)
    }
}

/// Aggregate view over every cached student profile
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub students: Vec<StudentRow>,
    /// Mean of per-student completion percentages
    pub average_completion: f64,
    pub total_time_spent: u64,
    /// Mean of per-student average scores, over students with one
    pub average_score: Option<f64>,
}

impl ClassReport {
    pub fn build(students: Vec<StudentRow>) -> Self {
        let average_completion = if students.is_empty() {
            0.0
        } else {
            students.iter().map(StudentRow::completion_percent).sum::<f64>() / students.len() as f64
        };
        let scores: Vec<f64> = students.iter().filter_map(|s| s.average_score).collect();

        Self {
            average_completion,
            total_time_spent: students.iter().map(|s| s.time_spent).sum(),
            average_score: if scores.is_empty() {
                None
            } else {
                Some(scores.iter().sum::<f64>() / scores.len() as f64)
            },
            students,
        }
    }
}

/// Build the class report from users with the student role
pub async fn class_report(store: &LocalStore) -> Result<ClassReport> {
    let total_lessons = store.get_all_lessons().await?.len();
    let users = store.get_all_users().await?;

    let mut by_user: HashMap<String, Vec<UserProgress>> = HashMap::new();
    for p in store.get_all_progress().await? {
        by_user.entry(p.user_id.clone()).or_default().push(p);
    }

    let rows = users
        .iter()
        .filter(|u| u.is_student())
        .map(|u| {
            let progress = by_user.get(&u.id).map(Vec::as_slice).unwrap_or(&[]);
            StudentRow {
                user_id: u.id.clone(),
                name: u.display_name().to_string(),
                grade: u.grade.clone(),
                completed_lessons: progress.iter().filter(|p| p.completed).count(),
                total_lessons,
                time_spent: progress.iter().map(|p| u64::from(p.time_spent)).sum(),
                average_score: average_score(progress),
            }
        })
        .collect();

    Ok(ClassReport::build(rows))
}

/// How all learners did on one lesson
#[derive(Debug, Clone, Serialize)]
pub struct LessonReport {
    pub lesson: Option<LessonRef>,
    pub lesson_id: String,
    pub learners: usize,
    pub completions: usize,
    pub average_score: Option<f64>,
    pub total_time_spent: u64,
}

pub async fn lesson_report(store: &LocalStore, lesson_id: &str) -> Result<LessonReport> {
    let lesson = store.get_lesson(lesson_id).await?;
    let progress = store.get_progress_for_lesson(lesson_id).await?;

    Ok(LessonReport {
        lesson: lesson.as_ref().map(LessonRef::from),
        lesson_id: lesson_id.to_string(),
        learners: progress.len(),
        completions: progress.iter().filter(|p| p.completed).count(),
        average_score: average_score(&progress),
        total_time_spent: progress.iter().map(|p| u64::from(p.time_spent)).sum(),
    })
}
