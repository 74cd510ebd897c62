//! SQLite storage implementation

use std::path::Path;
use rusqlite::Connection;
use crate::schema::Registry;
use crate::session::Session;
use crate::Result;

/// SQLite database with its registered schema
pub struct Database {
    conn: Connection,
    registry: Registry,
}

impl Database {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, registry: Registry) -> Result<Self> {
        let conn = Connection::open(path)?;
        tracing::info!("Opened database {}", path.display());
        Self::with_connection(conn, registry)
    }

    /// Open a fresh in-memory database
    pub fn open_in_memory(registry: Registry) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, registry)
    }

    fn with_connection(conn: Connection, registry: Registry) -> Result<Self> {
        let db = Self { conn, registry };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Enable foreign keys and create all registered tables
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON")?;
        self.registry.create_all(&self.conn)
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Open a unit of work on this database
    pub fn session(&mut self) -> Session<'_> {
        Session::new(self)
    }

    /// Run `f` in a session that commits when `f` succeeds and rolls back
    /// when it fails.
    pub fn transaction<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session<'_>) -> Result<R>,
    {
        let mut session = self.session();
        match f(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = session.rollback() {
                    tracing::error!("Rollback failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }

    // ========== Transaction Primitives ==========

    pub(crate) fn begin_transaction(&self) -> Result<()> {
        tracing::debug!(target: "ormlet::sql", "BEGIN");
        self.conn.execute("BEGIN TRANSACTION", [])?;
        Ok(())
    }

    pub(crate) fn commit(&self) -> Result<()> {
        tracing::debug!(target: "ormlet::sql", "COMMIT");
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }

    pub(crate) fn rollback(&self) -> Result<()> {
        tracing::debug!(target: "ormlet::sql", "ROLLBACK");
        self.conn.execute("ROLLBACK", [])?;
        Ok(())
    }

    // ========== Introspection ==========

    /// DDL for every registered table and index
    pub fn schema_statements(&self) -> Result<Vec<String>> {
        self.registry.schema_statements()
    }

    /// Count rows in one table
    pub fn count_rows(&self, table: &str) -> Result<usize> {
        let table = self
            .registry
            .table(table)
            .ok_or_else(|| crate::Error::UnknownTable(table.to_string()))?;
        let sql = format!("SELECT COUNT(*) FROM {}", table.name);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Row counts for every registered table
    pub fn stats(&self) -> Result<Vec<TableStats>> {
        self.registry
            .tables()
            .iter()
            .map(|t| {
                Ok(TableStats {
                    table: t.name,
                    rows: self.count_rows(t.name)?,
                })
            })
            .collect()
    }
}

/// Row count of one table
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct TableStats {
    pub table: &'static str,
    pub rows: usize,
}

impl std::fmt::Display for TableStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.table, self.rows)
    }
}
