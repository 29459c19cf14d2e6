//! # Eguru Store - offline-first persistence for the Eguru learning client
//!
//! Students consume lessons (video, audio, text, quiz) and track their
//! progress; teachers read aggregate reports. Everything lives in a local
//! SQLite database so the client keeps working without a network.
//!
//! Eguru Store provides:
//! - Typed records for lessons, progress, user profiles and quizzes
//! - A versioned schema with an explicit, additive migration table
//! - Generic collection accessors with primary-key and secondary-index lookups
//! - An async `LocalStore` facade that the UI owns and passes around
//! - Catalog seeding and student/teacher reports built on top of the store

pub mod lesson;
pub mod progress;
pub mod user;
pub mod quiz;
pub mod storage;
pub mod store;
pub mod seed;
pub mod activity;
pub mod report;
pub mod config;
pub mod ui;


// Re-exports for convenient access
pub use lesson::{Lesson, LessonType, Level};
pub use progress::UserProgress;
pub use user::{Role, User};
pub use quiz::{Quiz, QuizQuestion, ScoreBand};
pub use storage::{Handle, StoreLocation};
pub use store::LocalStore;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for store operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Persistent storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Store not initialized: call init() before using it")]
    NotInitialized,

    #[error("Duplicate key '{key}' in {collection}")]
    DuplicateKey { collection: String, key: String },

    #[error("Schema upgrade from version {from} to {to} failed: {reason}")]
    SchemaUpgradeFailed { from: u32, to: u32, reason: String },

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Unknown index '{index}' on {collection}")]
    UnknownIndex { collection: String, index: String },

    #[error("Index '{index}' expects {expected} key part(s), got {got}")]
    InvalidIndexKey { index: String, expected: usize, got: usize },

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Background task failed: {0}")]
    Background(String),
}

impl Error {
    /// True for `DuplicateKey`, the one failure callers routinely recover from
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, Error::DuplicateKey { .. })
    }
}
