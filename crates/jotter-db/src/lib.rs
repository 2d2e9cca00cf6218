pub mod migrations;
pub mod models;
pub mod queries;
pub mod session_store;

pub use session_store::SqliteStore;

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the blog database.
///
/// Only the path is held. Each unit of work opens its own connection through
/// [`Database::with_conn`] and the connection is closed when the closure
/// returns, whether it succeeded or not. Writes commit statement by statement.
#[derive(Debug, Clone)]
pub struct Database {
    path: PathBuf,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let db = Self {
            path: path.to_path_buf(),
        };

        let conn = db.connect()?;
        // WAL mode so concurrent request connections don't block readers
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrations::run(&conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    /// Drop every table and apply the schema from scratch.
    pub fn reset(&self) -> Result<()> {
        self.with_conn(migrations::reset)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Database;
    use tempfile::TempDir;

    /// A fresh database in its own temporary directory. Keep the `TempDir`
    /// alive for as long as the database is used.
    pub fn temp_db() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("jotter.db")).unwrap();
        (dir, db)
    }
}
