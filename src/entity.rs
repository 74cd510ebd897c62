//! Entity Mapper - converts between structs and table rows
//!
//! An entity exposes its `TableDef`, produces one SQL value per column for
//! inserts and rebuilds itself from a selected row. Foreign keys are held as
//! `Ref<T>`, which is either a known id or the `Key<T>` of an entity staged
//! in the same transaction.

use std::fmt;
use std::marker::PhantomData;

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use serde::{Serialize, Serializer};

use crate::schema::TableDef;
use crate::{Error, Result};

/// A struct mapped to a table.
pub trait Entity: Sized + 'static {
    /// Table this entity is stored in
    fn table() -> &'static TableDef;

    /// Primary key, `None` until assigned by storage
    fn id(&self) -> Option<i64>;

    /// Record the primary key assigned at insert
    fn set_id(&mut self, id: i64);

    /// One value per column of `table()`, in column order.
    ///
    /// A `Value::Null` primary key is left for SQLite to assign.
    fn values(&self, keys: &KeyMap) -> Result<Vec<Value>>;

    /// Rebuild the entity from a row selected with `TableDef::column_list`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Entities owned by this one, inserted right after it in the same
    /// transaction. `key` is this entity's staging key.
    fn stage_related(&mut self, _key: Key<Self>) -> Vec<Box<dyn Staged>> {
        Vec::new()
    }
}

/// Type-erased pending insert held by a session
pub trait Staged {
    fn table_def(&self) -> &'static TableDef;

    /// Insert the row and return the id it was stored under
    fn insert(&mut self, conn: &Connection, keys: &KeyMap) -> Result<i64>;
}

impl<T: Entity> Staged for T {
    fn table_def(&self) -> &'static TableDef {
        T::table()
    }

    fn insert(&mut self, conn: &Connection, keys: &KeyMap) -> Result<i64> {
        let table = T::table();
        let values = self.values(keys)?;
        let (sql, params) = insert_statement(table, values);

        tracing::debug!(target: "ormlet::sql", "{}", sql);
        conn.execute(&sql, params_from_iter(params.iter()))
            .map_err(|e| constraint_error(table, e))?;

        let id = conn.last_insert_rowid();
        self.set_id(id);
        Ok(id)
    }
}

/// Build an INSERT for `table`, dropping a NULL primary key so SQLite
/// assigns it. A row with no other values uses `DEFAULT VALUES`.
pub fn insert_statement(table: &TableDef, values: Vec<Value>) -> (String, Vec<Value>) {
    let pk_index = table.primary_key_index();
    let mut columns = Vec::with_capacity(values.len());
    let mut params = Vec::with_capacity(values.len());

    for (i, (column, value)) in table.columns.iter().zip(values).enumerate() {
        if i == pk_index && value == Value::Null {
            continue;
        }
        columns.push(column.name);
        params.push(value);
    }

    if columns.is_empty() {
        return (format!("INSERT INTO {} DEFAULT VALUES", table.name), params);
    }

    let placeholders: Vec<String> = (1..=params.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        columns.join(", "),
        placeholders.join(", ")
    );
    (sql, params)
}

/// Map constraint failures to `Error::Constraint`, keep anything else as a
/// storage error.
pub(crate) fn constraint_error(table: &'static TableDef, err: rusqlite::Error) -> Error {
    match err {
        rusqlite::Error::SqliteFailure(code, message)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Error::Constraint {
                table: table.name,
                message: message.unwrap_or_else(|| code.to_string()),
            }
        }
        other => Error::Storage(other),
    }
}

/// Handle to an entity staged in a session.
///
/// Keys are only meaningful inside the transaction that produced them.
pub struct Key<T> {
    generation: u64,
    index: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T> Key<T> {
    pub(crate) fn new(generation: u64, index: usize) -> Self {
        Self { generation, index, _entity: PhantomData }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.generation == other.generation && self.index == other.index
    }
}

impl<T> Eq for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}#{})", self.generation, self.index)
    }
}

/// Ids assigned to staged entities, indexed by staging order
#[derive(Debug, Clone, Default)]
pub struct KeyMap {
    generation: u64,
    ids: Vec<i64>,
}

impl KeyMap {
    pub(crate) fn new(generation: u64) -> Self {
        Self { generation, ids: Vec::new() }
    }

    pub(crate) fn push(&mut self, id: i64) {
        self.ids.push(id);
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of entities inserted so far
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Id assigned to `key`, if it has been inserted
    pub fn id<T>(&self, key: Key<T>) -> Option<i64> {
        if key.generation != self.generation {
            return None;
        }
        self.ids.get(key.index).copied()
    }

    /// Resolve `key` or report why it cannot be
    pub fn resolve<T: Entity>(&self, key: Key<T>) -> Result<i64> {
        if key.generation != self.generation {
            return Err(Error::StaleKey(T::table().name));
        }
        self.ids
            .get(key.index)
            .copied()
            .ok_or(Error::UnresolvedReference(T::table().name))
    }
}

/// Ids handed back by a successful commit
pub type Committed = KeyMap;

/// Foreign key value pointing at an entity of type `T`
pub enum Ref<T> {
    /// Already stored under this id
    Id(i64),
    /// Staged in the current transaction
    Pending(Key<T>),
}

impl<T: Entity> Ref<T> {
    /// The referenced id, resolving pending keys through `keys`
    pub fn resolve(&self, keys: &KeyMap) -> Result<i64> {
        match self {
            Ref::Id(id) => Ok(*id),
            Ref::Pending(key) => keys.resolve(*key),
        }
    }
}

impl<T> Ref<T> {
    /// The id, if already known without a key map
    pub fn id(&self) -> Option<i64> {
        match self {
            Ref::Id(id) => Some(*id),
            Ref::Pending(_) => None,
        }
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Ref<T> {}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ref::Id(a), Ref::Id(b)) => a == b,
            (Ref::Pending(a), Ref::Pending(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ref::Id(id) => write!(f, "Ref::Id({})", id),
            Ref::Pending(key) => write!(f, "Ref::Pending({:?})", key),
        }
    }
}

impl<T> From<i64> for Ref<T> {
    fn from(id: i64) -> Self {
        Ref::Id(id)
    }
}

impl<T> From<Key<T>> for Ref<T> {
    fn from(key: Key<T>) -> Self {
        Ref::Pending(key)
    }
}

// Pending references serialize as null
impl<T> Serialize for Ref<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.id().serialize(serializer)
    }
}
