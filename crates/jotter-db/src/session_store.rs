use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use time::OffsetDateTime;
use tower_sessions::{ExpiredDeletion, SessionStore, session::Id, session::Record, session_store};

use crate::Database;

/// `tower-sessions` store backed by the `session` table.
///
/// Records are MessagePack-encoded. Expiry is kept as a unix timestamp so
/// expired rows can be skipped on load and pruned with one range delete.
/// Every call opens its own connection on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Remove expired sessions, returning how many were deleted.
    pub async fn prune_expired(&self) -> session_store::Result<usize> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.blocking(move |conn| {
            let removed = conn.execute("DELETE FROM session WHERE expiry_date <= ?1", [now])?;
            Ok(removed)
        })
        .await
    }

    async fn blocking<F, T>(&self, f: F) -> session_store::Result<T>
    where
        F: FnOnce(&Connection) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| session_store::Error::Backend(e.to_string()))?
            .map_err(|e| session_store::Error::Backend(e.to_string()))
    }
}

fn encode(record: &Record) -> session_store::Result<Vec<u8>> {
    rmp_serde::to_vec(record).map_err(|e| session_store::Error::Encode(e.to_string()))
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn create(&self, record: &mut Record) -> session_store::Result<()> {
        loop {
            let data = encode(record)?;
            let id = record.id.to_string();
            let expiry = record.expiry_date.unix_timestamp();

            let inserted = self
                .blocking(move |conn| {
                    let changed = conn.execute(
                        "INSERT INTO session (id, data, expiry_date) VALUES (?1, ?2, ?3)
                         ON CONFLICT(id) DO NOTHING",
                        params![id, data, expiry],
                    )?;
                    Ok(changed == 1)
                })
                .await?;

            if inserted {
                return Ok(());
            }

            // Id collision: draw a new one and re-encode
            record.id = Id::default();
        }
    }

    async fn save(&self, record: &Record) -> session_store::Result<()> {
        let data = encode(record)?;
        let id = record.id.to_string();
        let expiry = record.expiry_date.unix_timestamp();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO session (id, data, expiry_date) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data, expiry_date = excluded.expiry_date",
                params![id, data, expiry],
            )?;
            Ok(())
        })
        .await
    }

    async fn load(&self, session_id: &Id) -> session_store::Result<Option<Record>> {
        let id = session_id.to_string();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        let data: Option<Vec<u8>> = self
            .blocking(move |conn| {
                let data = conn
                    .query_row(
                        "SELECT data FROM session WHERE id = ?1 AND expiry_date > ?2",
                        params![id, now],
                        |row| row.get(0),
                    )
                    .optional()?;
                Ok(data)
            })
            .await?;

        data.map(|bytes| {
            rmp_serde::from_slice(&bytes).map_err(|e| session_store::Error::Decode(e.to_string()))
        })
        .transpose()
    }

    async fn delete(&self, session_id: &Id) -> session_store::Result<()> {
        let id = session_id.to_string();
        self.blocking(move |conn| {
            conn.execute("DELETE FROM session WHERE id = ?1", [id])?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl ExpiredDeletion for SqliteStore {
    async fn delete_expired(&self) -> session_store::Result<()> {
        self.prune_expired().await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_db;
    use time::Duration;

    fn record(expires_in: Duration) -> Record {
        let mut data = std::collections::HashMap::new();
        data.insert("user_id".to_string(), serde_json::json!(7));
        Record {
            id: Id::default(),
            data,
            expiry_date: OffsetDateTime::now_utc() + expires_in,
        }
    }

    fn session_rows(db: &Database) -> i64 {
        db.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM session", [], |r| r.get(0))?))
            .unwrap()
    }

    #[tokio::test]
    async fn create_then_load() {
        let (_dir, db) = temp_db();
        let store = SqliteStore::new(db);

        let mut rec = record(Duration::hours(1));
        store.create(&mut rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, rec.id);
        assert_eq!(loaded.data.get("user_id"), Some(&serde_json::json!(7)));
    }

    #[tokio::test]
    async fn create_regenerates_colliding_id() {
        let (_dir, db) = temp_db();
        let store = SqliteStore::new(db.clone());

        let mut first = record(Duration::hours(1));
        store.create(&mut first).await.unwrap();

        let mut second = record(Duration::hours(1));
        second.id = first.id;
        store.create(&mut second).await.unwrap();

        assert_ne!(second.id, first.id);
        assert_eq!(session_rows(&db), 2);
    }

    #[tokio::test]
    async fn save_overwrites_data() {
        let (_dir, db) = temp_db();
        let store = SqliteStore::new(db.clone());

        let mut rec = record(Duration::hours(1));
        store.create(&mut rec).await.unwrap();

        rec.data.insert("user_id".to_string(), serde_json::json!(9));
        store.save(&rec).await.unwrap();

        let loaded = store.load(&rec.id).await.unwrap().unwrap();
        assert_eq!(loaded.data.get("user_id"), Some(&serde_json::json!(9)));
        assert_eq!(session_rows(&db), 1);
    }

    #[tokio::test]
    async fn expired_records_are_hidden_and_pruned() {
        let (_dir, db) = temp_db();
        let store = SqliteStore::new(db.clone());

        let mut live = record(Duration::hours(1));
        let mut stale = record(Duration::seconds(-5));
        store.create(&mut live).await.unwrap();
        store.create(&mut stale).await.unwrap();

        assert!(store.load(&stale.id).await.unwrap().is_none());

        assert_eq!(store.prune_expired().await.unwrap(), 1);
        assert_eq!(session_rows(&db), 1);

        store.delete_expired().await.unwrap();
        assert!(store.load(&live.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn delete_removes_record() {
        let (_dir, db) = temp_db();
        let store = SqliteStore::new(db.clone());

        let mut rec = record(Duration::hours(1));
        store.create(&mut rec).await.unwrap();
        store.delete(&rec.id).await.unwrap();

        assert!(store.load(&rec.id).await.unwrap().is_none());
        assert_eq!(session_rows(&db), 0);
    }
}
