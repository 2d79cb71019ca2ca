use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use time::OffsetDateTime;

use crate::calendar::DayRecord;
use crate::config::{ConfigPaths, StorageOptions};
use crate::entries::JournalEntry;
use crate::persistence::StateProvider;

mod schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub replaced: usize,
}

#[derive(Clone)]
pub struct StorageHandle {
    db_path: Arc<PathBuf>,
    options: Arc<StorageOptions>,
}

impl StorageHandle {
    pub fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&*self.db_path)
            .with_context(|| format!("opening database {}", self.db_path.display()))?;
        prepare_connection(&conn, &self.options)?;
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.connect()?;
        f(&conn)
    }

    pub fn database_path(&self) -> &Path {
        &self.db_path
    }

    pub fn read_view_state(&self, namespace: &str) -> Result<Option<String>> {
        self.with_connection(|conn| {
            conn.query_row(
                "SELECT payload FROM view_state WHERE namespace = ?1",
                params![namespace],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading view state '{namespace}'"))
        })
    }

    pub fn write_view_state(&self, namespace: &str, payload: &str) -> Result<()> {
        let now = OffsetDateTime::now_utc().unix_timestamp();
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO view_state (namespace, payload, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(namespace) DO UPDATE SET
                    payload = excluded.payload,
                    updated_at = excluded.updated_at",
                params![namespace, payload, now],
            )
            .with_context(|| format!("writing view state '{namespace}'"))?;
            Ok(())
        })
    }

    pub fn delete_view_state(&self, namespace: &str) -> Result<bool> {
        self.with_connection(|conn| {
            let removed = conn
                .execute(
                    "DELETE FROM view_state WHERE namespace = ?1",
                    params![namespace],
                )
                .with_context(|| format!("deleting view state '{namespace}'"))?;
            Ok(removed > 0)
        })
    }

    /// Entries in insertion order; the detail view navigates this order.
    pub fn fetch_entries(&self) -> Result<Vec<JournalEntry>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT entry_date, img_url, rating, categories, description
                     FROM journal_entries
                     ORDER BY id",
                )
                .context("preparing entry query")?;
            let rows = stmt
                .query_map([], |row| {
                    let categories: String = row.get(3)?;
                    Ok(JournalEntry {
                        date: row.get(0)?,
                        img_url: row.get(1)?,
                        rating: row.get::<_, f64>(2)? as f32,
                        categories: parse_categories(&categories),
                        description: row.get(4)?,
                    })
                })
                .context("querying journal entries")?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_entries(&self) -> Result<usize> {
        self.with_connection(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM journal_entries", [], |row| row.get(0))
                .context("counting journal entries")?;
            Ok(count as usize)
        })
    }

    pub fn import_entries(&self, entries: &[JournalEntry], replace: bool) -> Result<ImportOutcome> {
        let mut conn = self.connect()?;
        let tx = conn.transaction().context("starting import transaction")?;
        let replaced = if replace {
            tx.execute("DELETE FROM journal_entries", [])
                .context("clearing existing entries")?
        } else {
            0
        };
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO journal_entries
                        (entry_date, img_url, rating, categories, description)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )
                .context("preparing entry insert")?;
            for entry in entries {
                let categories =
                    serde_json::to_string(&entry.categories).context("encoding categories")?;
                stmt.execute(params![
                    entry.date.trim(),
                    entry.img_url,
                    f64::from(entry.rating),
                    categories,
                    entry.description,
                ])
                .with_context(|| format!("inserting entry dated {}", entry.date))?;
            }
        }
        tx.commit().context("committing import")?;
        Ok(ImportOutcome {
            inserted: entries.len(),
            replaced,
        })
    }
}

impl StateProvider for StorageHandle {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.read_view_state(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.write_view_state(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<bool> {
        self.delete_view_state(key)
    }
}

pub fn init(paths: &ConfigPaths, storage: &StorageOptions) -> Result<StorageHandle> {
    let db_path = if storage.database_path.as_os_str().is_empty() {
        &paths.database_path
    } else {
        &storage.database_path
    };
    let existed = db_path.exists();
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("opening database {}", db_path.display()))?;
    prepare_connection(&conn, storage)?;
    schema::apply(&conn)?;
    if !existed && storage.seed_samples {
        seed_sample_entries(&conn, DayRecord::today())?;
    }
    Ok(StorageHandle {
        db_path: Arc::new(db_path.clone()),
        options: Arc::new(storage.clone()),
    })
}

fn prepare_connection(conn: &Connection, storage: &StorageOptions) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("setting journal_mode=WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")
        .context("setting synchronous=NORMAL")?;
    conn.pragma_update(
        None,
        "wal_autocheckpoint",
        storage.wal_autocheckpoint.to_string(),
    )
    .context("setting wal_autocheckpoint")?;
    Ok(())
}

fn seed_sample_entries(conn: &Connection, today: DayRecord) -> Result<()> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM journal_entries LIMIT 1", [], |row| row.get(0))
        .optional()
        .context("checking for existing entries")?;
    if existing.is_some() {
        return Ok(());
    }

    tracing::info!("seeding first-run journal entries");
    let three_days_ago = today.prev().prev().prev();
    let samples = [
        (
            today,
            4.5,
            r#"["welcome"]"#,
            "Welcome to daybook. Scroll with j/k or the mouse wheel; \
             press Enter on a day with entries to open them.",
        ),
        (
            today,
            4.0,
            r#"["tips"]"#,
            "Import your own journal with `daybook import entries.json`. Dates use DD/MM/YYYY.",
        ),
        (
            three_days_ago,
            3.5,
            r#"["walk", "outdoors"]"#,
            "Scroll far enough in either direction and more days load automatically.",
        ),
    ];
    for (day, rating, categories, description) in samples {
        conn.execute(
            "INSERT INTO journal_entries (entry_date, img_url, rating, categories, description)
             VALUES (?1, '', ?2, ?3, ?4)",
            params![day.to_string(), rating, categories, description],
        )
        .context("inserting sample entry")?;
    }
    Ok(())
}

fn parse_categories(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|err| {
        tracing::warn!(%err, "unreadable categories column, treating as empty");
        Vec::new()
    })
}
