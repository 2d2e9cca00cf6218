//! Database row types. These map directly to SQLite rows.

use std::fmt;

#[derive(Clone)]
pub struct UserRow {
    pub id: i64,
    pub username: String,
    /// PHC-formatted password hash.
    pub password: String,
}

impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserRow")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A post joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRow {
    pub id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub title: String,
    pub body: String,
    /// SQLite `CURRENT_TIMESTAMP` text, UTC: `YYYY-MM-DD HH:MM:SS`.
    pub created: String,
}

/// Outcome of inserting a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NewUser {
    Created(i64),
    UsernameTaken,
}
