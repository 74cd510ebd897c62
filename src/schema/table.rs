//! Table and column definitions

use std::fmt;

/// Storage class of a mapped column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Integer,
    Text,
    /// Stored as INTEGER 0/1
    Boolean,
}

impl SqlType {
    /// Get the SQL type name used in DDL
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Integer => "INTEGER",
            SqlType::Text => "TEXT",
            SqlType::Boolean => "BOOLEAN",
        }
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single mapped column.
///
/// Built with `const` builders so whole tables can live in a `static`:
///
/// ```
/// use ormlet::{ColumnDef, SqlType};
///
/// const EMAIL: ColumnDef = ColumnDef::new("email", SqlType::Text).not_null().unique();
/// assert!(EMAIL.unique);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub primary_key: bool,
    pub nullable: bool,
    pub unique: bool,
    pub indexed: bool,
    /// Raw SQL default expression
    pub default: Option<&'static str>,
    /// Table whose primary key this column references
    pub references: Option<&'static str>,
}

impl ColumnDef {
    pub const fn new(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            primary_key: false,
            nullable: true,
            unique: false,
            indexed: false,
            default: None,
            references: None,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, SqlType::Integer)
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, SqlType::Text)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, SqlType::Boolean)
    }

    /// Mark as the primary key. Integer keys are assigned by SQLite when
    /// inserted as NULL.
    pub const fn primary_key(self) -> Self {
        Self { primary_key: true, nullable: false, ..self }
    }

    pub const fn not_null(self) -> Self {
        Self { nullable: false, ..self }
    }

    pub const fn unique(self) -> Self {
        Self { unique: true, ..self }
    }

    pub const fn indexed(self) -> Self {
        Self { indexed: true, ..self }
    }

    pub const fn default_sql(self, expr: &'static str) -> Self {
        Self { default: Some(expr), ..self }
    }

    pub const fn references(self, table: &'static str) -> Self {
        Self { references: Some(table), ..self }
    }

    /// Render the column clause of a CREATE TABLE statement
    pub fn ddl(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
        } else if !self.nullable {
            sql.push_str(" NOT NULL");
        }
        if self.unique && !self.primary_key {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }
        sql
    }
}

/// A mapped table: name plus ordered columns.
///
/// Column order is the order used by the entity mapper for both inserted
/// values and selected rows.
#[derive(Debug, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub columns: &'static [ColumnDef],
}

impl TableDef {
    /// The primary key column (first column flagged `primary_key`).
    /// `Registry::register_table` rejects tables without one.
    pub fn primary_key(&self) -> &ColumnDef {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .unwrap_or(&self.columns[0])
    }

    /// Index of the primary key within `columns`
    pub fn primary_key_index(&self) -> usize {
        self.columns.iter().position(|c| c.primary_key).unwrap_or(0)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Comma separated list of all column names
    pub fn column_list(&self) -> String {
        self.columns
            .iter()
            .map(|c| c.name)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Columns holding a foreign key
    pub fn foreign_keys(&self) -> impl Iterator<Item = &ColumnDef> {
        self.columns.iter().filter(|c| c.references.is_some())
    }

    /// SQL to create this table
    pub fn create_sql(&self) -> String {
        let mut clauses: Vec<String> = self.columns.iter().map(ColumnDef::ddl).collect();
        for fk in self.foreign_keys() {
            if let Some(target) = fk.references {
                // Target primary key column is resolved by SQLite when omitted
                clauses.push(format!("FOREIGN KEY ({}) REFERENCES {}", fk.name, target));
            }
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
            self.name,
            clauses.join(",\n    ")
        )
    }

    /// SQL to create indexes on indexed, non primary key columns
    pub fn index_sql(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.indexed && !c.primary_key)
            .map(|c| {
                format!(
                    "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table}({col})",
                    table = self.name,
                    col = c.name
                )
            })
            .collect()
    }
}
