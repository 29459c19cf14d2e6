//! Async local store - the object the application owns and passes around
//!
//! A `LocalStore` is constructed explicitly at startup, initialized once
//! with `init()`, and closed at shutdown. Engine work runs on tokio's
//! blocking pool; the single connection is serialized behind a mutex, so
//! calls from one caller are applied in program order.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use crate::{Error, Result};
use crate::lesson::{Lesson, LessonType, Level};
use crate::progress::UserProgress;
use crate::quiz::Quiz;
use crate::storage::{DbStats, Handle, Record, StoreLocation};
use crate::user::User;

type SharedHandle = Arc<Mutex<Handle>>;

/// Offline store for lessons, progress, users and quizzes
pub struct LocalStore {
    location: StoreLocation,
    busy_timeout: Option<Duration>,
    handle: tokio::sync::Mutex<Option<SharedHandle>>,
}

impl LocalStore {
    /// Create a store for `location`. Nothing is opened until `init()`.
    pub fn new(location: StoreLocation) -> Self {
        Self {
            location,
            busy_timeout: None,
            handle: tokio::sync::Mutex::new(None),
        }
    }

    /// A fresh private in-memory store (for testing)
    pub fn in_memory() -> Self {
        Self::new(StoreLocation::InMemory)
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Open the database and bring its schema up to date.
    ///
    /// Safe to call repeatedly and concurrently; only the first call opens.
    pub async fn init(&self) -> Result<()> {
        let mut slot = self.handle.lock().await;
        if slot.is_some() {
            return Ok(());
        }

        let location = self.location.clone();
        let busy_timeout = self.busy_timeout;
        let handle = tokio::task::spawn_blocking(move || {
            let handle = Handle::open(&location)?;
            if let Some(timeout) = busy_timeout {
                handle.set_busy_timeout(timeout)?;
            }
            Ok::<_, Error>(handle)
        })
        .await
        .map_err(|e| Error::Background(e.to_string()))??;

        tracing::info!("Local store ready at {}", self.location);
        *slot = Some(Arc::new(Mutex::new(handle)));
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Drop this store's connection. The connection closes once in-flight
    /// operations finish; new calls fail with `NotInitialized`.
    pub async fn close(&self) {
        if self.handle.lock().await.take().is_some() {
            tracing::info!("Local store at {} closed", self.location);
        }
    }

    /// Run `op` against the open handle on the blocking pool
    async fn run<R, F>(&self, op: F) -> Result<R>
    where
        F: FnOnce(&Handle) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let shared = self.handle.lock().await.clone().ok_or(Error::NotInitialized)?;
        tokio::task::spawn_blocking(move || {
            let handle = shared
                .lock()
                .map_err(|_| Error::Background("connection lock poisoned".into()))?;
            op(&handle)
        })
        .await
        .map_err(|e| Error::Background(e.to_string()))?
    }

    // ========== Generic Operations ==========

    /// Add a record; `DuplicateKey` if its key or a unique index is taken
    pub async fn insert<T: Record + Clone>(&self, record: &T) -> Result<()> {
        let record = record.clone();
        self.run(move |h| h.collection::<T>().insert(&record)).await
    }

    /// Insert or overwrite a record by primary key
    pub async fn put<T: Record + Clone>(&self, record: &T) -> Result<()> {
        let record = record.clone();
        self.run(move |h| h.collection::<T>().put(&record)).await
    }

    pub async fn get_by_id<T: Record>(&self, key: &str) -> Result<Option<T>> {
        let key = key.to_string();
        self.run(move |h| h.collection::<T>().get(&key)).await
    }

    pub async fn get_all<T: Record>(&self) -> Result<Vec<T>> {
        self.run(|h| h.collection::<T>().get_all()).await
    }

    /// Snapshot of every record in one index bucket, in insertion order
    pub async fn get_all_by_index<T: Record>(&self, index: &str, key: &[&str]) -> Result<Vec<T>> {
        let index = index.to_string();
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        self.run(move |h| {
            let key: Vec<&str> = key.iter().map(String::as_str).collect();
            h.collection::<T>().get_all_by_index(&index, &key)
        })
        .await
    }

    /// First record in an index bucket, if any
    pub async fn get_one_by_index<T: Record>(&self, index: &str, key: &[&str]) -> Result<Option<T>> {
        let index = index.to_string();
        let key: Vec<String> = key.iter().map(|k| k.to_string()).collect();
        self.run(move |h| {
            let key: Vec<&str> = key.iter().map(String::as_str).collect();
            h.collection::<T>().get_one_by_index(&index, &key)
        })
        .await
    }

    pub async fn stats(&self) -> Result<DbStats> {
        self.run(|h| h.stats()).await
    }

    // ========== Lesson Operations ==========

    pub async fn add_lesson(&self, lesson: &Lesson) -> Result<()> {
        self.insert(lesson).await
    }

    pub async fn get_lesson(&self, id: &str) -> Result<Option<Lesson>> {
        self.get_by_id(id).await
    }

    pub async fn get_all_lessons(&self) -> Result<Vec<Lesson>> {
        self.get_all().await
    }

    pub async fn get_lessons_by_subject(&self, subject: &str) -> Result<Vec<Lesson>> {
        self.get_all_by_index("subject", &[subject]).await
    }

    pub async fn get_lessons_by_type(&self, kind: LessonType) -> Result<Vec<Lesson>> {
        self.get_all_by_index("type", &[kind.as_str()]).await
    }

    pub async fn get_lessons_by_level(&self, level: Level) -> Result<Vec<Lesson>> {
        self.get_all_by_index("level", &[level.as_str()]).await
    }

    // ========== Progress Operations ==========

    /// Upsert a progress record by its id
    pub async fn update_progress(&self, progress: &UserProgress) -> Result<()> {
        if !progress.has_conventional_id() {
            tracing::warn!(
                "Progress id {} does not follow the userId-lessonId convention",
                progress.id
            );
        }
        if let Ok(Some(stored)) = self.get_by_id::<UserProgress>(&progress.id).await {
            if !stored.same_pair(progress) {
                tracing::warn!(
                    "Progress id {} already holds user {} on lesson {}; overwriting with user {} on lesson {}",
                    progress.id,
                    stored.user_id,
                    stored.lesson_id,
                    progress.user_id,
                    progress.lesson_id
                );
            }
        }
        self.put(progress).await
    }

    pub async fn get_progress_by_user(&self, user_id: &str) -> Result<Vec<UserProgress>> {
        self.get_all_by_index("userId", &[user_id]).await
    }

    /// The progress of one user on one lesson; `None` if never started
    pub async fn get_progress_by_lesson(&self, lesson_id: &str, user_id: &str) -> Result<Option<UserProgress>> {
        self.get_one_by_index("userId_lessonId", &[user_id, lesson_id]).await
    }

    /// Every learner's progress on one lesson
    pub async fn get_progress_for_lesson(&self, lesson_id: &str) -> Result<Vec<UserProgress>> {
        self.get_all_by_index("lessonId", &[lesson_id]).await
    }

    pub async fn get_all_progress(&self) -> Result<Vec<UserProgress>> {
        self.get_all().await
    }

    // ========== User Operations ==========

    pub async fn save_user(&self, user: &User) -> Result<()> {
        self.put(user).await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        self.get_by_id(user_id).await
    }

    pub async fn get_all_users(&self) -> Result<Vec<User>> {
        self.get_all().await
    }

    // ========== Quiz Operations ==========

    /// Add a quiz; a second quiz with the same id fails with `DuplicateKey`
    pub async fn add_quiz(&self, quiz: &Quiz) -> Result<()> {
        self.insert(quiz).await
    }

    /// The first quiz stored for a lesson
    pub async fn get_quiz_by_lesson(&self, lesson_id: &str) -> Result<Option<Quiz>> {
        self.get_one_by_index("lessonId", &[lesson_id]).await
    }
}
