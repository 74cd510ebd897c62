//! Schema Registry - static table definitions and DDL generation
//!
//! Every entity declares a `TableDef`:
//! - columns with type, nullability, uniqueness and index flags
//! - a primary key (integer keys are assigned by SQLite on insert)
//! - foreign keys referencing another table's primary key
//!
//! A `Registry` collects the tables of one database and creates them.

pub mod registry;
pub mod table;

pub use registry::Registry;
pub use table::{ColumnDef, SqlType, TableDef};
