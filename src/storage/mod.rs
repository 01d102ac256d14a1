//! Storage layer for cardflow data.
//!
//! Records live in a single SQLite database (`cardflow.db`) inside the data
//! directory, addressed by path:
//!
//! - `projects/{projectId}` - project settings
//! - `developers/{dev_*}`, `stakeholders/{stk_*}` - directory entries
//! - `lists/{listKind}/{key}` - vocabulary entries (`{text, order}`)
//! - `cards/{projectId}/{collection}/{key}` - card records
//!
//! Counters used to mint card ids live in their own table.

pub mod backend;

pub use backend::{DocumentStore, normalize_path, split_path};

use crate::lookup::ListKind;
use crate::models::{CardType, Document};
use crate::{Error, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "CF_DATA_DIR";

const DB_FILE: &str = "cardflow.db";

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: Connection,
    location: String,
}

impl SqliteStore {
    /// Open an existing store in `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        let db_path = data_dir.join(DB_FILE);
        if !db_path.exists() {
            return Err(Error::NotInitialized);
        }
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            location: db_path.display().to_string(),
        })
    }

    /// Create (or reopen) the store in `data_dir`.
    pub fn init(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            location: db_path.display().to_string(),
        })
    }

    /// Check if a store exists in `data_dir`.
    pub fn exists(data_dir: &Path) -> bool {
        data_dir.join(DB_FILE).exists()
    }

    /// Private in-memory store, used by tests and dry runs.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn,
            location: ":memory:".to_string(),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                path TEXT NOT NULL UNIQUE,
                parent TEXT NOT NULL,
                key TEXT NOT NULL,
                body TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_documents_parent ON documents(parent, seq);

            CREATE TABLE IF NOT EXISTS counters (
                key TEXT PRIMARY KEY,
                value INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn write(&self, path: &str, doc: &Document) -> Result<()> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(Error::InvalidInput("Empty document path".to_string()));
        }
        let (parent, key) = split_path(&path);
        let body = serde_json::to_string(doc)?;
        // Upsert keeps `seq`, so collection order stays insertion order.
        self.conn.execute(
            r#"
            INSERT INTO documents (path, parent, key, body, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(path) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
            params![path, parent, key, body, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(path = %path, "document written");
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, path: &str) -> Result<Option<Document>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE path = ?1",
                [normalize_path(path)],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| parse_document(&b)).transpose()
    }

    fn list(&self, collection: &str) -> Result<Vec<(String, Document)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key, body FROM documents WHERE parent = ?1 ORDER BY seq")?;
        let rows = stmt
            .query_map([normalize_path(collection)], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(key, body)| Ok((key, parse_document(&body)?)))
            .collect()
    }

    fn set(&mut self, path: &str, doc: &Document) -> Result<()> {
        self.write(path, doc)
    }

    fn merge(&mut self, path: &str, patch: &Document) -> Result<()> {
        let tx = self.conn.transaction()?;
        let normalized = normalize_path(path);
        let existing: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE path = ?1",
                [&normalized],
                |row| row.get(0),
            )
            .optional()?;
        let mut doc = match existing {
            Some(body) => parse_document(&body)?,
            None => Document::new(),
        };
        for (k, v) in patch {
            doc.insert(k.clone(), v.clone());
        }
        let (parent, key) = split_path(&normalized);
        tx.execute(
            r#"
            INSERT INTO documents (path, parent, key, body, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(path) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
            "#,
            params![
                normalized,
                parent,
                key,
                serde_json::to_string(&doc)?,
                Utc::now().to_rfc3339()
            ],
        )?;
        tx.commit()?;
        tracing::debug!(path = %normalized, keys = patch.len(), "document merged");
        Ok(())
    }

    fn increment(&mut self, key: &str) -> Result<u64> {
        let value: i64 = self.conn.query_row(
            r#"
            INSERT INTO counters (key, value) VALUES (?1, 1)
            ON CONFLICT(key) DO UPDATE SET value = value + 1
            RETURNING value
            "#,
            [key],
            |row| row.get(0),
        )?;
        Ok(value as u64)
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

fn parse_document(body: &str) -> Result<Document> {
    match serde_json::from_str::<Value>(body)? {
        Value::Object(map) => Ok(map),
        other => Err(Error::Other(format!(
            "Stored document is not an object: {}",
            other
        ))),
    }
}

/// Get the data directory.
///
/// `CF_DATA_DIR` wins; otherwise `~/.local/share/cardflow` (or the platform
/// equivalent).
pub fn get_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let data_dir = dirs::data_dir()
        .ok_or_else(|| Error::Other("Could not determine data directory".to_string()))?;
    Ok(data_dir.join("cardflow"))
}

/// Generate a new opaque storage key.
pub fn new_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

pub fn project_path(project_id: &str) -> String {
    format!("projects/{}", project_id)
}

pub fn developer_path(id: &str) -> String {
    format!("developers/{}", id)
}

pub fn stakeholder_path(id: &str) -> String {
    format!("stakeholders/{}", id)
}

pub fn cards_path(project_id: &str, card_type: CardType) -> String {
    format!("cards/{}/{}", project_id, card_type.collection())
}

pub fn card_path(project_id: &str, card_type: CardType, key: &str) -> String {
    format!("{}/{}", cards_path(project_id, card_type), key)
}

/// Find a card by card id or storage key.
pub fn find_card<S: DocumentStore + ?Sized>(
    store: &S,
    project_id: &str,
    card_type: CardType,
    id_or_key: &str,
) -> Result<(String, Document)> {
    if let Some(doc) = store.get(&card_path(project_id, card_type, id_or_key))? {
        return Ok((id_or_key.to_string(), doc));
    }
    store
        .list(&cards_path(project_id, card_type))?
        .into_iter()
        .find(|(_, doc)| doc.get("cardId").and_then(Value::as_str) == Some(id_or_key))
        .ok_or_else(|| {
            Error::NotFound(format!(
                "{} {} in project {}",
                card_type, id_or_key, project_id
            ))
        })
}

/// Seed every vocabulary list that is currently empty with its defaults.
///
/// Returns the kinds that were seeded.
pub fn seed_default_lists<S: DocumentStore + ?Sized>(store: &mut S) -> Result<Vec<ListKind>> {
    let mut seeded = Vec::new();
    for kind in ListKind::all() {
        if !store.list(&kind.path())?.is_empty() {
            continue;
        }
        for (order, text) in kind.defaults().iter().enumerate() {
            let entry = json!({ "text": text, "order": order });
            if let Value::Object(doc) = entry {
                store.set(&format!("{}/{}", kind.path(), new_key()), &doc)?;
            }
        }
        seeded.push(*kind);
    }
    Ok(seeded)
}
