//! Query builder over one entity type
//!
//! `session.query::<T>()` selects every column of `T`'s table, optionally
//! filtered by column equality, in primary key (insertion) order.

use std::marker::PhantomData;

use rusqlite::{ToSql, params_from_iter};

use crate::entity::Entity;
use crate::session::Session;
use crate::{Error, Result};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Projection {
    Rows,
    Count,
}

/// Pending SELECT over entities of type `T`
pub struct Query<'s, 'db, T> {
    session: &'s mut Session<'db>,
    filters: Vec<(String, Box<dyn ToSql>)>,
    _entity: PhantomData<fn() -> T>,
}

impl<'s, 'db, T: Entity> Query<'s, 'db, T> {
    pub(crate) fn new(session: &'s mut Session<'db>) -> Self {
        Self {
            session,
            filters: Vec::new(),
            _entity: PhantomData,
        }
    }

    /// Keep rows where `column = value`. Repeated filters are ANDed.
    pub fn filter_eq<V>(mut self, column: &str, value: V) -> Self
    where
        V: ToSql + 'static,
    {
        self.filters.push((column.to_string(), Box::new(value)));
        self
    }

    /// SQL text of this query, with `?N` placeholders for the filters
    pub fn to_sql(&self) -> Result<String> {
        self.build(Projection::Rows)
    }

    fn build(&self, projection: Projection) -> Result<String> {
        let table = T::table();
        let columns = match projection {
            Projection::Rows => table.column_list(),
            Projection::Count => "COUNT(*)".to_string(),
        };

        let mut sql = format!("SELECT {} FROM {}", columns, table.name);
        if !self.filters.is_empty() {
            let mut clauses = Vec::with_capacity(self.filters.len());
            for (i, (column, _)) in self.filters.iter().enumerate() {
                if !table.has_column(column) {
                    return Err(Error::UnknownColumn {
                        table: table.name,
                        column: column.clone(),
                    });
                }
                clauses.push(format!("{} = ?{}", column, i + 1));
            }
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if projection == Projection::Rows {
            sql.push_str(&format!(" ORDER BY {}", table.primary_key().name));
        }
        Ok(sql)
    }

    fn run(self, sql: String) -> Result<Vec<T>> {
        self.session.flush()?;
        tracing::debug!(target: "ormlet::sql", "{}", sql);

        let conn = self.session.connection();
        let mut stmt = conn.prepare(&sql)?;
        let params = self.filters.iter().map(|(_, value)| value);
        let rows = stmt.query_map(params_from_iter(params), |row| T::from_row(row))?;

        let mut entities = Vec::new();
        for row in rows {
            entities.push(row?);
        }
        Ok(entities)
    }

    /// Every matching entity
    pub fn all(self) -> Result<Vec<T>> {
        let sql = self.build(Projection::Rows)?;
        self.run(sql)
    }

    /// The first matching entity
    pub fn first(self) -> Result<Option<T>> {
        let sql = format!("{} LIMIT 1", self.build(Projection::Rows)?);
        Ok(self.run(sql)?.into_iter().next())
    }

    /// Number of matching rows
    pub fn count(self) -> Result<usize> {
        let sql = self.build(Projection::Count)?;
        self.session.flush()?;
        tracing::debug!(target: "ormlet::sql", "{}", sql);

        let params = self.filters.iter().map(|(_, value)| value);
        let count: i64 = self
            .session
            .connection()
            .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::KeyMap;
    use crate::schema::{ColumnDef, Registry, TableDef};
    use crate::storage::Database;
    use rusqlite::Row;
    use rusqlite::types::Value;

    static CITIES: TableDef = TableDef {
        name: "cities",
        columns: &[
            ColumnDef::integer("id").primary_key(),
            ColumnDef::text("name").not_null(),
            ColumnDef::text("country").not_null(),
        ],
    };

    #[derive(Debug)]
    struct City {
        id: Option<i64>,
        name: String,
        country: String,
    }

    impl City {
        fn new(name: &str, country: &str) -> Self {
            Self { id: None, name: name.into(), country: country.into() }
        }
    }

    impl Entity for City {
        fn table() -> &'static TableDef {
            &CITIES
        }

        fn id(&self) -> Option<i64> {
            self.id
        }

        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }

        fn values(&self, _keys: &KeyMap) -> Result<Vec<Value>> {
            Ok(vec![self.id.into(), self.name.clone().into(), self.country.clone().into()])
        }

        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self {
                id: row.get("id")?,
                name: row.get("name")?,
                country: row.get("country")?,
            })
        }
    }

    fn atlas() -> Database {
        let registry = Registry::new().register::<City>().unwrap();
        let mut db = Database::open_in_memory(registry).unwrap();
        db.transaction(|s| {
            s.add_all([
                City::new("Lyon", "FR"),
                City::new("Porto", "PT"),
                City::new("Nantes", "FR"),
            ]);
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_all_in_insertion_order() {
        let mut db = atlas();
        let mut session = db.session();
        let names: Vec<String> = session
            .query::<City>()
            .all()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Lyon", "Porto", "Nantes"]);
    }

    #[test]
    fn test_filter_eq() {
        let mut db = atlas();
        let mut session = db.session();
        let french = session.query::<City>().filter_eq("country", "FR").all().unwrap();
        assert_eq!(french.len(), 2);
        assert!(french.iter().all(|c| c.country == "FR"));

        let none = session.query::<City>().filter_eq("country", "DE").all().unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_combined_filters_and_count() {
        let mut db = atlas();
        let mut session = db.session();
        let count = session
            .query::<City>()
            .filter_eq("country", "FR")
            .filter_eq("name", "Nantes")
            .count()
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(session.query::<City>().count().unwrap(), 3);
    }

    #[test]
    fn test_first() {
        let mut db = atlas();
        let mut session = db.session();
        let first = session.query::<City>().first().unwrap().unwrap();
        assert_eq!(first.name, "Lyon");
        assert_eq!(first.id, Some(1));

        let missing = session.query::<City>().filter_eq("name", "Oslo").first().unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_unknown_column() {
        let mut db = atlas();
        let mut session = db.session();
        let result = session.query::<City>().filter_eq("population", 5).all();
        assert!(matches!(result, Err(Error::UnknownColumn { table: "cities", .. })));
    }

    #[test]
    fn test_query_sees_staged_rows() {
        let mut db = atlas();
        let mut session = db.session();
        session.add(City::new("Braga", "PT"));
        let portuguese = session.query::<City>().filter_eq("country", "PT").all().unwrap();
        assert_eq!(portuguese.len(), 2);
        session.rollback().unwrap();

        assert_eq!(session.query::<City>().count().unwrap(), 3);
    }

    #[test]
    fn test_generated_sql() {
        let mut db = atlas();
        let mut session = db.session();
        let sql = session.query::<City>().filter_eq("name", "Lyon").to_sql().unwrap();
        assert_eq!(sql, "SELECT id, name, country FROM cities WHERE name = ?1 ORDER BY id");
    }
}
