//! Relationship Resolver - explicit lookups across foreign keys
//!
//! A relation is declared once as a `const` on the parent side and names
//! the child's foreign key column. The "other side" is fetched with an
//! explicit call rather than loaded implicitly:
//!
//! - `children` / `child` go parent → child through the indexed fk column
//! - `parent` goes child → parent by primary key

use std::fmt;
use std::marker::PhantomData;

use crate::entity::Entity;
use crate::session::Session;
use crate::{Error, Result};

/// How many children a parent may own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
}

impl Cardinality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cardinality::OneToOne => "1:1",
            Cardinality::OneToMany => "1:N",
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Link from parent `P` to children `C` through `C.<foreign_key>`
pub struct Relation<P, C> {
    pub name: &'static str,
    pub foreign_key: &'static str,
    pub cardinality: Cardinality,
    _types: PhantomData<fn() -> (P, C)>,
}

impl<P, C> Relation<P, C> {
    pub const fn one_to_one(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            foreign_key,
            cardinality: Cardinality::OneToOne,
            _types: PhantomData,
        }
    }

    pub const fn one_to_many(name: &'static str, foreign_key: &'static str) -> Self {
        Self {
            name,
            foreign_key,
            cardinality: Cardinality::OneToMany,
            _types: PhantomData,
        }
    }
}

impl<P: Entity, C: Entity> Relation<P, C> {
    /// All children of `parent_id`, in insertion order
    pub fn children(&self, session: &mut Session<'_>, parent_id: i64) -> Result<Vec<C>> {
        session.query::<C>().filter_eq(self.foreign_key, parent_id).all()
    }

    /// The single child of `parent_id`, if any.
    ///
    /// Errors when a one-to-one relation finds more than one row.
    pub fn child(&self, session: &mut Session<'_>, parent_id: i64) -> Result<Option<C>> {
        let mut children = self.children(session, parent_id)?;
        if self.cardinality == Cardinality::OneToOne && children.len() > 1 {
            return Err(Error::Cardinality {
                relation: self.name,
                found: children.len(),
            });
        }
        Ok(if children.is_empty() { None } else { Some(children.remove(0)) })
    }

    /// The parent a child's foreign key points at
    pub fn parent(&self, session: &mut Session<'_>, foreign_id: i64) -> Result<Option<P>> {
        session.get::<P>(foreign_id)
    }
}

impl<P, C> fmt::Debug for Relation<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("name", &self.name)
            .field("foreign_key", &self.foreign_key)
            .field("cardinality", &self.cardinality)
            .finish()
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

    static TEAMS: TableDef = TableDef {
        name: "teams",
        columns: &[ColumnDef::integer("id").primary_key(), ColumnDef::text("name").not_null()],
    };

    static PLAYERS: TableDef = TableDef {
        name: "players",
        columns: &[
            ColumnDef::integer("id").primary_key(),
            ColumnDef::integer("team_id").not_null().indexed().references("teams"),
            ColumnDef::text("name").not_null(),
        ],
    };

    #[derive(Debug)]
    struct Team {
        id: Option<i64>,
        name: String,
    }

    #[derive(Debug)]
    struct Player {
        id: Option<i64>,
        team_id: i64,
        name: String,
    }

    impl Entity for Team {
        fn table() -> &'static TableDef {
            &TEAMS
        }
        fn id(&self) -> Option<i64> {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
        fn values(&self, _keys: &KeyMap) -> Result<Vec<Value>> {
            Ok(vec![self.id.into(), self.name.clone().into()])
        }
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { id: row.get("id")?, name: row.get("name")? })
        }
    }

    impl Entity for Player {
        fn table() -> &'static TableDef {
            &PLAYERS
        }
        fn id(&self) -> Option<i64> {
            self.id
        }
        fn set_id(&mut self, id: i64) {
            self.id = Some(id);
        }
        fn values(&self, _keys: &KeyMap) -> Result<Vec<Value>> {
            Ok(vec![self.id.into(), self.team_id.into(), self.name.clone().into()])
        }
        fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
            Ok(Self { id: row.get("id")?, team_id: row.get("team_id")?, name: row.get("name")? })
        }
    }

    const ROSTER: Relation<Team, Player> = Relation::one_to_many("roster", "team_id");
    const CAPTAIN: Relation<Team, Player> = Relation::one_to_one("captain", "team_id");

    fn league() -> Database {
        let registry = Registry::new()
            .register::<Team>()
            .unwrap()
            .register::<Player>()
            .unwrap();
        let mut db = Database::open_in_memory(registry).unwrap();
        db.transaction(|s| {
            s.add(Team { id: None, name: "Owls".into() });
            s.add(Team { id: None, name: "Hawks".into() });
            s.flush()?;
            s.add(Player { id: None, team_id: 1, name: "Ada".into() });
            s.add(Player { id: None, team_id: 1, name: "Grace".into() });
            s.add(Player { id: None, team_id: 2, name: "Linus".into() });
            Ok(())
        })
        .unwrap();
        db
    }

    #[test]
    fn test_children() {
        let mut db = league();
        let mut session = db.session();
        let owls: Vec<String> = ROSTER
            .children(&mut session, 1)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(owls, vec!["Ada", "Grace"]);
        assert!(ROSTER.children(&mut session, 3).unwrap().is_empty());
    }

    #[test]
    fn test_one_to_one_cardinality_enforced() {
        let mut db = league();
        let mut session = db.session();
        let err = CAPTAIN.child(&mut session, 1).unwrap_err();
        assert!(matches!(err, Error::Cardinality { relation: "captain", found: 2 }));

        let hawks = CAPTAIN.child(&mut session, 2).unwrap().unwrap();
        assert_eq!(hawks.name, "Linus");
    }

    #[test]
    fn test_parent() {
        let mut db = league();
        let mut session = db.session();
        let team = ROSTER.parent(&mut session, 2).unwrap().unwrap();
        assert_eq!(team.name, "Hawks");
        assert!(ROSTER.parent(&mut session, 9).unwrap().is_none());
    }

    #[test]
    fn test_foreign_key_enforced() {
        let mut db = league();
        let result = db.transaction(|s| {
            s.add(Player { id: None, team_id: 42, name: "Nobody".into() });
            Ok(())
        });
        assert!(matches!(result, Err(Error::Constraint { table: "players", .. })));
    }
}
