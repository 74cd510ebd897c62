//! Session - unit of work over a `Database`
//!
//! Entities added to a session are staged in memory. `flush` opens a
//! transaction (if none is open) and inserts staged rows in staging order;
//! `commit` flushes and commits; `rollback` discards everything since the
//! last commit. A failed flush rolls the whole transaction back, so no
//! partial write survives.

use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::Connection;

use crate::entity::{Committed, Entity, Key, KeyMap, Staged};
use crate::query::Query;
use crate::storage::Database;
use crate::{Error, Result};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Unit of work holding staged inserts and the open transaction
pub struct Session<'db> {
    db: &'db mut Database,
    /// Staged but not yet flushed
    pending: Vec<Box<dyn Staged>>,
    /// Ids of rows flushed in the current transaction
    keys: KeyMap,
    in_transaction: bool,
}

impl<'db> Session<'db> {
    pub(crate) fn new(db: &'db mut Database) -> Self {
        Self {
            db,
            pending: Vec::new(),
            keys: KeyMap::new(next_generation()),
            in_transaction: false,
        }
    }

    pub(crate) fn connection(&self) -> &Connection {
        self.db.connection()
    }

    pub fn database(&self) -> &Database {
        &*self.db
    }

    /// Stage an entity (and the entities it owns) for insertion
    pub fn add<T: Entity>(&mut self, mut entity: T) -> Key<T> {
        let key = Key::new(self.keys.generation(), self.keys.len() + self.pending.len());
        let related = entity.stage_related(key);
        self.pending.push(Box::new(entity));
        self.pending.extend(related);
        key
    }

    /// Stage several entities of the same type
    pub fn add_all<T, I>(&mut self, entities: I) -> Vec<Key<T>>
    where
        T: Entity,
        I: IntoIterator<Item = T>,
    {
        entities.into_iter().map(|e| self.add(e)).collect()
    }

    /// Number of staged rows not yet written
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Ids assigned so far in the current transaction
    pub fn keys(&self) -> &KeyMap {
        &self.keys
    }

    /// Write staged rows inside the current transaction
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        if !self.in_transaction {
            self.db.begin_transaction()?;
            self.in_transaction = true;
        }

        let pending = std::mem::take(&mut self.pending);
        let count = pending.len();
        for mut staged in pending {
            if let Err(e) = self.insert_one(staged.as_mut()) {
                tracing::warn!("Insert into {} failed, rolling back: {}", staged.table_def().name, e);
                return Err(self.abort(e));
            }
        }

        tracing::debug!("Flushed {} rows", count);
        Ok(())
    }

    fn insert_one(&mut self, staged: &mut dyn Staged) -> Result<()> {
        let table = staged.table_def();
        if !self.db.registry().contains(table.name) {
            return Err(Error::UnknownTable(table.name.to_string()));
        }
        let id = staged.insert(self.db.connection(), &self.keys)?;
        self.keys.push(id);
        Ok(())
    }

    /// Roll back after `err`, keeping `err` as the reported failure
    fn abort(&mut self, err: Error) -> Error {
        if let Err(rollback_err) = self.rollback() {
            tracing::error!("Rollback failed: {}", rollback_err);
        }
        err
    }

    /// Flush and commit. Returns the ids assigned to every key staged since
    /// the previous commit.
    pub fn commit(&mut self) -> Result<Committed> {
        self.flush()?;

        if self.in_transaction {
            if let Err(e) = self.db.commit() {
                return Err(self.abort(e));
            }
            self.in_transaction = false;
        }

        let committed = std::mem::replace(&mut self.keys, KeyMap::new(next_generation()));
        tracing::info!("Committed {} rows", committed.len());
        Ok(committed)
    }

    /// Discard staged rows and undo everything flushed since the last commit
    pub fn rollback(&mut self) -> Result<()> {
        let discarded = self.pending.len();
        self.pending.clear();
        self.keys = KeyMap::new(next_generation());

        if self.in_transaction {
            self.in_transaction = false;
            self.db.rollback()?;
        }

        tracing::debug!("Rolled back session ({} staged rows discarded)", discarded);
        Ok(())
    }

    /// Start a query over `T`. Staged rows are flushed before it runs.
    pub fn query<T: Entity>(&mut self) -> Query<'_, 'db, T> {
        Query::new(self)
    }

    /// Load one entity by primary key
    pub fn get<T: Entity>(&mut self, id: i64) -> Result<Option<T>> {
        let pk = T::table().primary_key().name;
        self.query::<T>().filter_eq(pk, id).first()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if self.in_transaction || !self.pending.is_empty() {
            tracing::warn!(
                "Session dropped with uncommitted work ({} staged rows), rolling back",
                self.pending.len()
            );
            if let Err(e) = self.rollback() {
                tracing::error!("Rollback on drop failed: {}", e);
            }
        }
    }
}
