//! # Ormlet - Minimal object-relational mapping over SQLite
//!
//! Ormlet maps plain Rust structs to SQLite tables:
//! - Static table definitions collected in a schema registry
//! - An entity mapper converting structs to and from rows
//! - A session (unit of work) that batches inserts into one transaction
//! - Typed relationship descriptors for 1:1 and 1:N lookups
//! - Unsalted SHA-256 password digests for the demo auth model

pub mod schema;
pub mod entity;
pub mod password;
pub mod storage;
pub mod session;
pub mod query;
pub mod relation;
pub mod models;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use entity::{Committed, Entity, Key, KeyMap, Ref};
pub use password::PasswordHash;
pub use query::Query;
pub use relation::{Cardinality, Relation};
pub use schema::{ColumnDef, Registry, SqlType, TableDef};
pub use session::Session;
pub use storage::{Database, TableStats};

/// Result type alias for Ormlet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Ormlet operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Constraint violated on {table}: {message}")]
    Constraint { table: &'static str, message: String },

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Table registered twice: {0}")]
    DuplicateTable(&'static str),

    #[error("Unknown column {column} on table {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("Reference to {0} has not been inserted yet")]
    UnresolvedReference(&'static str),

    #[error("Key for {0} belongs to a finished transaction")]
    StaleKey(&'static str),

    #[error("Missing foreign key {column} on {table}")]
    MissingForeignKey { table: &'static str, column: &'static str },

    #[error("Relation {relation} expected at most one row, found {found}")]
    Cardinality { relation: &'static str, found: usize },

    #[error("Schema error: {0}")]
    Schema(String),
}
