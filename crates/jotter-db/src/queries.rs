use crate::Database;
use crate::models::{NewUser, PostRow, UserRow};
use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row, ffi, params};

impl Database {
    // -- Users --

    /// Insert a user. A username that already exists is reported as
    /// [`NewUser::UsernameTaken`] rather than as an error.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<NewUser> {
        self.with_conn(|conn| insert_user(conn, username, password_hash))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Posts --

    /// Every post, newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, None))
    }

    /// Posts written by one author, newest first.
    pub fn list_posts_by_author(&self, author_id: i64) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| query_posts(conn, Some(author_id)))
    }

    pub fn get_post(&self, id: i64) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    pub fn create_post(&self, author_id: i64, title: &str, body: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post (author_id, title, body) VALUES (?1, ?2, ?3)",
                params![author_id, title, body],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Replace title and body. Author and creation time are left alone.
    /// Returns false when no post has this id.
    pub fn update_post(&self, id: i64, title: &str, body: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE post SET title = ?1, body = ?2 WHERE id = ?3",
                params![title, body, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Returns false when no post has this id.
    pub fn delete_post(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM post WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }
}

fn insert_user(conn: &Connection, username: &str, password_hash: &str) -> Result<NewUser> {
    let inserted = conn.execute(
        "INSERT INTO user (username, password) VALUES (?1, ?2)",
        (username, password_hash),
    );

    match inserted {
        Ok(_) => Ok(NewUser::Created(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            Ok(NewUser::UsernameTaken)
        }
        Err(e) => Err(e.into()),
    }
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password FROM user WHERE username = ?1",
            [username],
            user_from_row,
        )
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password FROM user WHERE id = ?1",
            [id],
            user_from_row,
        )
        .optional()?;

    Ok(row)
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author_username: row.get(2)?,
        title: row.get(3)?,
        body: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
        created: row.get(5)?,
    })
}

fn query_posts(conn: &Connection, author_id: Option<i64>) -> Result<Vec<PostRow>> {
    // Posts created within the same second fall back to insertion order
    let mut stmt = conn.prepare(
        "SELECT p.id, p.author_id, u.username, p.title, p.body, p.created
         FROM post p
         JOIN user u ON p.author_id = u.id
         WHERE ?1 IS NULL OR p.author_id = ?1
         ORDER BY p.created DESC, p.id DESC",
    )?;

    let rows = stmt
        .query_map([author_id], post_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_post(conn: &Connection, id: i64) -> Result<Option<PostRow>> {
    let row = conn
        .query_row(
            "SELECT p.id, p.author_id, u.username, p.title, p.body, p.created
             FROM post p
             JOIN user u ON p.author_id = u.id
             WHERE p.id = ?1",
            [id],
            post_from_row,
        )
        .optional()?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::temp_db;

    fn user(db: &Database, name: &str) -> i64 {
        match db.create_user(name, "hash").unwrap() {
            NewUser::Created(id) => id,
            NewUser::UsernameTaken => panic!("{name} already exists"),
        }
    }

    #[test]
    fn duplicate_username_is_reported() {
        let (_dir, db) = temp_db();
        user(&db, "alice");

        assert_eq!(db.create_user("alice", "other").unwrap(), NewUser::UsernameTaken);

        let count: i64 = db
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM user", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn user_lookups() {
        let (_dir, db) = temp_db();
        let id = user(&db, "alice");

        let by_name = db.get_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name.id, id);
        assert_eq!(by_name.password, "hash");

        assert_eq!(db.get_user_by_id(id).unwrap().unwrap().username, "alice");
        assert!(db.get_user_by_username("bob").unwrap().is_none());
        assert!(db.get_user_by_id(id + 1).unwrap().is_none());
    }

    #[test]
    fn listing_is_newest_first_and_filtered_by_author() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let first = db.create_post(alice, "first", "a").unwrap();
        let second = db.create_post(bob, "second", "b").unwrap();
        let third = db.create_post(alice, "third", "c").unwrap();

        let all: Vec<i64> = db.list_posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(all, [third, second, first]);

        let mine = db.list_posts_by_author(alice).unwrap();
        assert_eq!(mine.iter().map(|p| p.id).collect::<Vec<_>>(), [third, first]);
        assert!(mine.iter().all(|p| p.author_username == "alice"));
    }

    #[test]
    fn explicit_timestamps_order_before_ids() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");

        let newer = db.create_post(alice, "newer", "").unwrap();
        let older = db.create_post(alice, "older", "").unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "UPDATE post SET created = '2001-01-01 00:00:00' WHERE id = ?1",
                [older],
            )?;
            Ok(())
        })
        .unwrap();

        let ids: Vec<i64> = db.list_posts().unwrap().iter().map(|p| p.id).collect();
        assert_eq!(ids, [newer, older]);
    }

    #[test]
    fn update_keeps_author_and_created() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        let id = db.create_post(alice, "draft", "text").unwrap();
        let before = db.get_post(id).unwrap().unwrap();

        assert!(db.update_post(id, "final", "better text").unwrap());

        let after = db.get_post(id).unwrap().unwrap();
        assert_eq!(after.title, "final");
        assert_eq!(after.body, "better text");
        assert_eq!(after.author_id, before.author_id);
        assert_eq!(after.created, before.created);

        assert!(!db.update_post(id + 100, "x", "y").unwrap());
    }

    #[test]
    fn delete_removes_post() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        let id = db.create_post(alice, "gone soon", "").unwrap();

        assert!(db.delete_post(id).unwrap());
        assert!(db.get_post(id).unwrap().is_none());
        assert!(db.list_posts().unwrap().is_empty());
        assert!(!db.delete_post(id).unwrap());
    }

    #[test]
    fn post_requires_existing_author() {
        let (_dir, db) = temp_db();
        assert!(db.create_post(42, "orphan", "").is_err());
    }

    #[test]
    fn null_body_reads_as_empty() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        let id = db
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO post (author_id, title, body) VALUES (?1, 'no body', NULL)",
                    [alice],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();

        assert_eq!(db.get_post(id).unwrap().unwrap().body, "");
    }
}
