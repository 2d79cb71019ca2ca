use anyhow::{Context, Result};
use rusqlite::Connection;

pub fn apply(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS view_state (
            namespace TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS journal_entries (
            id INTEGER PRIMARY KEY,
            entry_date TEXT NOT NULL,
            img_url TEXT NOT NULL DEFAULT '',
            rating REAL NOT NULL DEFAULT 0,
            categories TEXT NOT NULL DEFAULT '[]',
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS journal_entries_by_date
            ON journal_entries(entry_date);
        "#,
    )
    .context("applying schema migrations")?;
    Ok(())
}
