//! Storage Layer - SQLite-backed persistence
//!
//! A `Database` owns one SQLite connection and the `Registry` of tables
//! materialized in it. Foreign keys are enforced by SQLite
//! (`PRAGMA foreign_keys = ON`).

pub mod sqlite;

pub use sqlite::{Database, TableStats};
