use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (users and posts)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE user (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL
            );

            CREATE TABLE post (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                author_id   INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
                created     TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                title       TEXT NOT NULL,
                body        TEXT
            );

            CREATE INDEX idx_post_author
                ON post(author_id, created);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (sessions)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE session (
                id          TEXT PRIMARY KEY NOT NULL,
                data        BLOB NOT NULL,
                expiry_date INTEGER NOT NULL
            );

            CREATE INDEX idx_session_expiry
                ON session(expiry_date);

            INSERT INTO schema_version (version) VALUES (2);

            COMMIT;
            ",
        )?;
    }

    Ok(())
}

pub fn reset(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS session;
        DROP TABLE IF EXISTS post;
        DROP TABLE IF EXISTS user;
        DROP TABLE IF EXISTS schema_version;
        ",
    )?;

    info!("Dropped all tables");
    run(conn)
}
