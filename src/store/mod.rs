//! Persistent storage backends.
//!
//! Currently a single backend: SQLite via `rusqlite`, matching the logical
//! schema (three tables, four derived views) one to one.

pub mod sqlite;

pub use sqlite::{CreateMode, SqliteStore, StoreError, DEFAULT_WRITE_THRESHOLD};
