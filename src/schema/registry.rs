//! Schema registry - the set of tables materialized in a database

use rusqlite::Connection;
use crate::entity::Entity;
use crate::{Error, Result};
use super::TableDef;

/// Collection of table definitions for one database.
///
/// Tables are registered per entity type. `create_all` materializes them
/// with referenced tables created before the tables pointing at them.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    tables: Vec<&'static TableDef>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the table of an entity type
    pub fn register<T: Entity>(self) -> Result<Self> {
        self.register_table(T::table())
    }

    /// Register a raw table definition
    pub fn register_table(mut self, table: &'static TableDef) -> Result<Self> {
        if self.contains(table.name) {
            return Err(Error::DuplicateTable(table.name));
        }
        if !table.columns.iter().any(|c| c.primary_key) {
            return Err(Error::Schema(format!("table {} has no primary key column", table.name)));
        }
        self.tables.push(table);
        Ok(self)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&'static TableDef> {
        self.tables.iter().copied().find(|t| t.name == name)
    }

    /// Registered tables in registration order
    pub fn tables(&self) -> &[&'static TableDef] {
        &self.tables
    }

    /// Check that every foreign key targets a registered table
    pub fn validate(&self) -> Result<()> {
        for table in &self.tables {
            for fk in table.foreign_keys() {
                if let Some(target) = fk.references {
                    if !self.contains(target) {
                        return Err(Error::UnknownTable(format!(
                            "{} (referenced by {}.{})",
                            target, table.name, fk.name
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Tables ordered so that every referenced table precedes its dependents.
    ///
    /// Self references are allowed; longer cycles are rejected.
    pub fn creation_order(&self) -> Result<Vec<&'static TableDef>> {
        self.validate()?;

        let mut ordered: Vec<&'static TableDef> = Vec::with_capacity(self.tables.len());
        let mut remaining: Vec<&'static TableDef> = self.tables.clone();

        while !remaining.is_empty() {
            let before = remaining.len();
            remaining.retain(|table| {
                let ready = table.foreign_keys().all(|fk| {
                    fk.references
                        .map(|target| target == table.name || ordered.iter().any(|t| t.name == target))
                        .unwrap_or(true)
                });
                if ready {
                    ordered.push(*table);
                }
                !ready
            });

            if remaining.len() == before {
                let names: Vec<&str> = remaining.iter().map(|t| t.name).collect();
                return Err(Error::Schema(format!(
                    "foreign key cycle between tables: {}",
                    names.join(", ")
                )));
            }
        }

        Ok(ordered)
    }

    /// All schema creation statements, tables first then indexes
    pub fn schema_statements(&self) -> Result<Vec<String>> {
        let order = self.creation_order()?;
        let mut stmts: Vec<String> = order.iter().map(|t| t.create_sql()).collect();
        stmts.extend(order.iter().flat_map(|t| t.index_sql()));
        Ok(stmts)
    }

    /// Materialize every registered table
    pub fn create_all(&self, conn: &Connection) -> Result<()> {
        for stmt in self.schema_statements()? {
            tracing::debug!(target: "ormlet::sql", "{}", stmt);
            conn.execute(&stmt, [])?;
        }
        tracing::info!("Created schema for {} tables", self.tables.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnDef;

    static PARENTS: TableDef = TableDef {
        name: "parents",
        columns: &[ColumnDef::integer("id").primary_key()],
    };

    static CHILDREN: TableDef = TableDef {
        name: "children",
        columns: &[
            ColumnDef::integer("id").primary_key(),
            ColumnDef::integer("parent_id").not_null().indexed().references("parents"),
        ],
    };

    static LOOP_A: TableDef = TableDef {
        name: "loop_a",
        columns: &[
            ColumnDef::integer("id").primary_key(),
            ColumnDef::integer("b_id").references("loop_b"),
        ],
    };

    static LOOP_B: TableDef = TableDef {
        name: "loop_b",
        columns: &[
            ColumnDef::integer("id").primary_key(),
            ColumnDef::integer("a_id").references("loop_a"),
        ],
    };

    #[test]
    fn test_referenced_tables_created_first() {
        let registry = Registry::new()
            .register_table(&CHILDREN)
            .unwrap()
            .register_table(&PARENTS)
            .unwrap();

        let order: Vec<&str> = registry.creation_order().unwrap().iter().map(|t| t.name).collect();
        assert_eq!(order, vec!["parents", "children"]);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let result = Registry::new()
            .register_table(&PARENTS)
            .unwrap()
            .register_table(&PARENTS);
        assert!(matches!(result, Err(Error::DuplicateTable("parents"))));
    }

    static NO_KEY: TableDef = TableDef {
        name: "no_key",
        columns: &[ColumnDef::text("label")],
    };

    static EMPTY: TableDef = TableDef {
        name: "empty",
        columns: &[],
    };

    #[test]
    fn test_table_without_primary_key_rejected() {
        assert!(matches!(Registry::new().register_table(&NO_KEY), Err(Error::Schema(_))));
        assert!(matches!(Registry::new().register_table(&EMPTY), Err(Error::Schema(_))));
    }

    #[test]
    fn test_missing_reference_target() {
        let registry = Registry::new().register_table(&CHILDREN).unwrap();
        assert!(matches!(registry.validate(), Err(Error::UnknownTable(_))));
    }

    #[test]
    fn test_cycle_rejected() {
        let registry = Registry::new()
            .register_table(&LOOP_A)
            .unwrap()
            .register_table(&LOOP_B)
            .unwrap();
        assert!(matches!(registry.creation_order(), Err(Error::Schema(_))));
    }

    #[test]
    fn test_create_all_materializes_tables() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = Registry::new()
            .register_table(&PARENTS)
            .unwrap()
            .register_table(&CHILDREN)
            .unwrap();
        registry.create_all(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_children_parent_id'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
