//! Single-table user model

use std::fmt;

use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use crate::entity::{Entity, KeyMap};
use crate::schema::{ColumnDef, Registry, TableDef};
use crate::Result;

static USERS: TableDef = TableDef {
    name: "users",
    columns: &[
        ColumnDef::integer("id").primary_key().indexed().unique(),
        ColumnDef::text("username").not_null(),
        ColumnDef::text("email").not_null(),
        ColumnDef::boolean("is_admin").not_null().default_sql("0"),
    ],
};

/// A user stored in a single `users` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl User {
    /// Create a non-admin user
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            email: email.into(),
            is_admin: false,
        }
    }

    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }
}

impl Entity for User {
    fn table() -> &'static TableDef {
        &USERS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self, _keys: &KeyMap) -> Result<Vec<Value>> {
        Ok(vec![
            self.id.into(),
            self.username.clone().into(),
            self.email.clone().into(),
            self.is_admin.into(),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            username: row.get("username")?,
            email: row.get("email")?,
            is_admin: row.get("is_admin")?,
        })
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.id.map(|id| id.to_string()).unwrap_or_else(|| "None".to_string());
        write!(f, "<User(id={}, username={}, email={})>", id, self.username, self.email)
    }
}

/// Registry holding the single `users` table
pub fn registry() -> Result<Registry> {
    Registry::new().register::<User>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;

    fn database() -> Database {
        Database::open_in_memory(registry().unwrap()).unwrap()
    }

    #[test]
    fn test_two_users_committed_and_listed() {
        let mut db = database();
        let mut session = db.session();
        session.add(User::new("Shubham", "shubham@gmail.com"));
        session.add(User::new("sawant", "sawant@gmail.com"));
        session.commit().unwrap();

        let users = session.query::<User>().all().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "Shubham");
        assert_eq!(users[0].email, "shubham@gmail.com");
        assert_eq!(users[1].username, "sawant");
        assert_eq!(users[1].email, "sawant@gmail.com");
        assert!(users.iter().all(|u| !u.is_admin));
    }

    #[test]
    fn test_admin_flag_round_trips() {
        let mut db = database();
        let mut session = db.session();
        let key = session.add(User::new("root", "root@example.com").with_admin(true));
        let committed = session.commit().unwrap();

        let root: User = session.get(committed.id(key).unwrap()).unwrap().unwrap();
        assert!(root.is_admin);
    }

    #[test]
    fn test_is_admin_defaults_to_false_in_storage() {
        let mut db = database();
        {
            let session = db.session();
            session
                .database()
                .connection()
                .execute("INSERT INTO users (username, email) VALUES ('raw', 'raw@example.com')", [])
                .unwrap();
        }
        let mut session = db.session();
        let raw = session.query::<User>().first().unwrap().unwrap();
        assert!(!raw.is_admin);
    }

    #[test]
    fn test_display() {
        let mut user = User::new("Shubham", "shubham@gmail.com");
        assert_eq!(user.to_string(), "<User(id=None, username=Shubham, email=shubham@gmail.com)>");
        user.set_id(1);
        assert_eq!(user.to_string(), "<User(id=1, username=Shubham, email=shubham@gmail.com)>");
    }
}
