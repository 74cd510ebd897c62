//! Password digests
//!
//! Passwords are stored as the lowercase hex SHA-256 of their UTF-8 bytes,
//! unsalted, so digests stay compatible with existing `user_auth` rows.
//! The plaintext is never kept.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use sha2::{Digest, Sha256};

/// One-way digest of a password
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Digest a plaintext password
    pub fn digest(password: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(password.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    /// Wrap a digest read back from storage
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check a candidate password against this digest.
    ///
    /// Plain string equality on the hex digests; no salt, no constant-time
    /// comparison.
    pub fn verify(&self, candidate: &str) -> bool {
        *self == Self::digest(candidate)
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "PasswordHash({}…)", prefix)
    }
}

impl ToSql for PasswordHash {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        self.0.to_sql()
    }
}

impl FromSql for PasswordHash {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        String::column_result(value).map(PasswordHash::from_hex)
    }
}
