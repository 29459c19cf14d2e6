//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with one table per collection:
//! - lessons(id, data)   indexed by subject, type, level
//! - progress(id, data)  indexed by userId, lessonId, unique (userId, lessonId)
//! - users(id, data)
//! - quizzes(id, data)   indexed by lessonId

pub mod schema;
pub mod migrate;
pub mod collection;
pub mod engine;

pub use collection::{Collection, Record};
pub use engine::{DbStats, Handle, StoreLocation};
pub use migrate::Migration;
