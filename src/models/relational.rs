//! User model split across three tables
//!
//! - `users`: identity only
//! - `user_auth`: 1:1 with `users`, sharing its primary key
//! - `user_posts`: 1:N, each post carries a required `user_id`

use std::fmt;

use rusqlite::Row;
use rusqlite::types::Value;
use serde::Serialize;

use crate::entity::{Entity, Key, KeyMap, Ref, Staged};
use crate::password::PasswordHash;
use crate::relation::Relation;
use crate::schema::{ColumnDef, Registry, TableDef};
use crate::session::Session;
use crate::{Error, Result};

static USERS: TableDef = TableDef {
    name: "users",
    columns: &[ColumnDef::integer("id").primary_key()],
};

static USER_AUTH: TableDef = TableDef {
    name: "user_auth",
    columns: &[
        ColumnDef::integer("id").primary_key().indexed().unique().references("users"),
        ColumnDef::text("username").not_null(),
        ColumnDef::text("email").not_null().unique(),
        ColumnDef::text("password_hash"),
    ],
};

static USER_POSTS: TableDef = TableDef {
    name: "user_posts",
    columns: &[
        ColumnDef::integer("id").primary_key(),
        ColumnDef::integer("user_id").not_null().indexed().references("users"),
        ColumnDef::text("content"),
    ],
};

/// users.id ↔ user_auth.id
pub const AUTH: Relation<User, UserAuth> = Relation::one_to_one("auth", "id");

/// users.id → user_posts.user_id
pub const POSTS: Relation<User, UserPost> = Relation::one_to_many("posts", "user_id");

/// Registry with `users`, `user_auth` and `user_posts`
pub fn registry() -> Result<Registry> {
    Registry::new()
        .register::<User>()?
        .register::<UserAuth>()?
        .register::<UserPost>()
}

// ========== User ==========

/// A user identity owning one auth record and any number of posts
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Option<i64>,
    /// Staged auth before insert, loaded auth after `load_auth`
    #[serde(skip_serializing_if = "Option::is_none")]
    auth: Option<UserAuth>,
}

impl User {
    /// Create a user together with its auth record. Only the password
    /// digest is kept.
    pub fn new(username: impl Into<String>, email: impl Into<String>, password: &str) -> Self {
        let mut auth = UserAuth::new(username, email);
        auth.set_password(password);
        Self { id: None, auth: Some(auth) }
    }

    /// The auth record, if staged or loaded
    pub fn auth(&self) -> Option<&UserAuth> {
        self.auth.as_ref()
    }

    fn require_id(&self) -> Result<i64> {
        self.id.ok_or(Error::UnresolvedReference(USERS.name))
    }

    /// Fetch and cache the auth record
    pub fn load_auth(&mut self, session: &mut Session<'_>) -> Result<Option<&UserAuth>> {
        let id = self.require_id()?;
        self.auth = AUTH.child(session, id)?;
        Ok(self.auth.as_ref())
    }

    /// Fetch this user's posts in insertion order
    pub fn posts(&self, session: &mut Session<'_>) -> Result<Vec<UserPost>> {
        POSTS.children(session, self.require_id()?)
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
        Ok(vec![self.id.into()])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self { id: row.get("id")?, auth: None })
    }

    fn stage_related(&mut self, key: Key<Self>) -> Vec<Box<dyn Staged>> {
        match self.auth.take() {
            Some(auth) => vec![Box::new(auth.for_user(key)) as Box<dyn Staged>],
            None => Vec::new(),
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.auth, self.id) {
            (Some(auth), _) => write!(f, "<User(username={}, email={})>", auth.username, auth.email),
            (None, Some(id)) => write!(f, "<User(id={})>", id),
            (None, None) => write!(f, "<User(id=None)>"),
        }
    }
}

// ========== UserAuth ==========

/// Credentials of a user, keyed by the owning user's id
#[derive(Debug, Clone, Serialize)]
pub struct UserAuth {
    #[serde(rename = "id")]
    user: Option<Ref<User>>,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    password_hash: Option<PasswordHash>,
}

impl UserAuth {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user: None,
            username: username.into(),
            email: email.into(),
            password_hash: None,
        }
    }

    /// Attach to the owning user
    pub fn for_user(mut self, user: impl Into<Ref<User>>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Replace the stored digest with the digest of `password`
    pub fn set_password(&mut self, password: &str) {
        self.password_hash = Some(PasswordHash::digest(password));
    }

    /// True when `candidate` digests to the stored hash
    pub fn check_password(&self, candidate: &str) -> bool {
        self.password_hash
            .as_ref()
            .is_some_and(|hash| hash.verify(candidate))
    }

    pub fn password_hash(&self) -> Option<&PasswordHash> {
        self.password_hash.as_ref()
    }
}

impl Entity for UserAuth {
    fn table() -> &'static TableDef {
        &USER_AUTH
    }

    fn id(&self) -> Option<i64> {
        self.user.and_then(|user| user.id())
    }

    fn set_id(&mut self, id: i64) {
        self.user = Some(Ref::Id(id));
    }

    fn values(&self, keys: &KeyMap) -> Result<Vec<Value>> {
        let user = self.user.ok_or(Error::MissingForeignKey {
            table: USER_AUTH.name,
            column: "id",
        })?;
        let password_hash = match &self.password_hash {
            Some(hash) => Value::Text(hash.as_str().to_string()),
            None => Value::Null,
        };

        Ok(vec![
            user.resolve(keys)?.into(),
            self.username.clone().into(),
            self.email.clone().into(),
            password_hash,
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            user: Some(Ref::Id(row.get("id")?)),
            username: row.get("username")?,
            email: row.get("email")?,
            password_hash: row.get("password_hash")?,
        })
    }
}

impl fmt::Display for UserAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<UserAuth(username={}, email={})>", self.username, self.email)
    }
}

// ========== UserPost ==========

/// A free-text post owned by one user
#[derive(Debug, Clone, Serialize)]
pub struct UserPost {
    pub id: Option<i64>,
    #[serde(rename = "user_id")]
    user: Ref<User>,
    pub content: String,
}

impl UserPost {
    pub fn new(user: impl Into<Ref<User>>, content: impl Into<String>) -> Self {
        Self {
            id: None,
            user: user.into(),
            content: content.into(),
        }
    }

    /// Owner id, once the owner has been stored
    pub fn user_id(&self) -> Option<i64> {
        self.user.id()
    }

    /// Fetch the owning user
    pub fn user(&self, session: &mut Session<'_>) -> Result<Option<User>> {
        let user_id = self.user_id().ok_or(Error::UnresolvedReference(USERS.name))?;
        POSTS.parent(session, user_id)
    }

    /// Render with the owner resolved, e.g.
    /// `<UserPost(user=<User(username=..., email=...)>, content=...)>`
    pub fn describe(&self, owner: &User) -> String {
        format!("<UserPost(user={}, content={})>", owner, self.content)
    }
}

impl Entity for UserPost {
    fn table() -> &'static TableDef {
        &USER_POSTS
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn values(&self, keys: &KeyMap) -> Result<Vec<Value>> {
        Ok(vec![
            self.id.into(),
            self.user.resolve(keys)?.into(),
            self.content.clone().into(),
        ])
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            user: Ref::Id(row.get("user_id")?),
            content: row.get("content")?,
        })
    }
}

impl fmt::Display for UserPost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_id() {
            Some(id) => write!(f, "<UserPost(user_id={}, content={})>", id, self.content),
            None => write!(f, "<UserPost(user_id=None, content={})>", self.content),
        }
    }
}
