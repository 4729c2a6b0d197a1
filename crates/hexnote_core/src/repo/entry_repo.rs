//! Entry repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD and revision history over the `entries` collection.
//! - Own annotation merge semantics for updates.
//!
//! # Invariants
//! - `update_entry` appends exactly one revision and strictly increases
//!   `last_update`.
//! - Annotation mutators (`add_annotation`, `remove_annotation`, `add_tag`)
//!   leave `last_update` and revisions untouched.
//! - Listing is ordered by `last_update DESC, id DESC`.

use crate::db::DbError;
use crate::model::entry::{
    AnnotationDelta, AnnotationKey, AnnotationValue, Annotations, Entry, EntryId, Timestamp,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use serde_json::Value;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

const ENTRY_SELECT_SQL: &str = "SELECT
    id,
    content,
    html,
    last_update,
    title,
    is_public,
    published_to
FROM entries";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for entry and tag persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(EntryId),
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "entry not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted entry data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "entry repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the entry store.
pub trait EntryRepository {
    /// Inserts a new entry with a fresh id and an empty revision history.
    fn create_entry(
        &mut self,
        content: &Value,
        html: &str,
        annotations: &Annotations,
    ) -> RepoResult<Entry>;
    /// Replaces content/html, applies `delta` key by key and appends a revision.
    fn update_entry(
        &mut self,
        id: EntryId,
        content: &Value,
        html: &str,
        delta: &AnnotationDelta,
    ) -> RepoResult<Entry>;
    /// Removes the entry. Returns `false` when the id was absent.
    fn delete_entry(&mut self, id: EntryId) -> RepoResult<bool>;
    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>>;
    fn add_annotation(&mut self, id: EntryId, value: AnnotationValue) -> RepoResult<()>;
    fn remove_annotation(&mut self, id: EntryId, key: AnnotationKey) -> RepoResult<()>;
    /// Set-adds one tag. Returns `true` when the tag was not present yet.
    fn add_tag(&mut self, id: EntryId, tag: &str) -> RepoResult<bool>;
    /// All entries, most recently updated first.
    fn list_entries(&self) -> RepoResult<Vec<Entry>>;
}

/// SQLite-backed entry store.
pub struct SqliteEntryRepository<'conn> {
    pub(super) conn: &'conn mut Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Constructs a repository from a bootstrapped connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn create_entry(
        &mut self,
        content: &Value,
        html: &str,
        annotations: &Annotations,
    ) -> RepoResult<Entry> {
        let content_text = serialize_content(content)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO entries (
                content,
                html,
                last_update,
                title,
                is_public,
                published_to
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                content_text,
                html,
                now_epoch_ms(),
                annotations.title.as_str(),
                bool_to_int(annotations.public),
                annotations.published_to.as_deref(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        replace_tags(&tx, id, &annotations.tags)?;

        let entry = load_entry(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("created entry {id} missing in read-back"))
        })?;
        tx.commit()?;
        Ok(entry)
    }

    fn update_entry(
        &mut self,
        id: EntryId,
        content: &Value,
        html: &str,
        delta: &AnnotationDelta,
    ) -> RepoResult<Entry> {
        let content_text = serialize_content(content)?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(current) = load_entry(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };

        let mut annotations = current.annotations;
        for change in delta {
            annotations.apply(change);
        }
        let revised_at = next_timestamp(current.last_update);

        tx.execute(
            "UPDATE entries
             SET
                content = ?2,
                html = ?3,
                last_update = ?4
             WHERE id = ?1;",
            params![id, content_text, html, revised_at],
        )?;
        write_annotations(&tx, id, &annotations)?;
        tx.execute(
            "INSERT INTO entry_revisions (entry_id, revised_at) VALUES (?1, ?2);",
            params![id, revised_at],
        )?;

        let entry = load_entry(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        tx.commit()?;
        Ok(entry)
    }

    fn delete_entry(&mut self, id: EntryId) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM entries WHERE id = ?1;", [id])?;
        Ok(changed > 0)
    }

    fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
        load_entry(self.conn, id)
    }

    fn add_annotation(&mut self, id: EntryId, value: AnnotationValue) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(current) = load_entry(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };

        let mut annotations = current.annotations;
        annotations.set(value);
        write_annotations(&tx, id, &annotations)?;
        tx.commit()?;
        Ok(())
    }

    fn remove_annotation(&mut self, id: EntryId, key: AnnotationKey) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let Some(current) = load_entry(&tx, id)? else {
            return Err(RepoError::NotFound(id));
        };

        let mut annotations = current.annotations;
        annotations.clear(key);
        write_annotations(&tx, id, &annotations)?;
        tx.commit()?;
        Ok(())
    }

    fn add_tag(&mut self, id: EntryId, tag: &str) -> RepoResult<bool> {
        let Some(tag) = normalize_tag(tag) else {
            return Err(RepoError::InvalidData("blank tag value".to_string()));
        };
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        if !entry_exists(&tx, id)? {
            return Err(RepoError::NotFound(id));
        }

        let inserted = tx.execute(
            "INSERT OR IGNORE INTO entry_tags (entry_id, tag) VALUES (?1, ?2);",
            params![id, tag],
        )?;
        tx.commit()?;
        Ok(inserted == 1)
    }

    fn list_entries(&self) -> RepoResult<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ENTRY_SELECT_SQL} ORDER BY last_update DESC, id DESC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            entries.push(parse_entry_row(self.conn, row)?);
        }
        Ok(entries)
    }
}

/// Normalizes one tag value: surrounding whitespace is dropped, case is kept.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Normalizes and deduplicates tag values, dropping blanks.
pub fn normalize_tags<'a>(tags: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
    tags.into_iter().filter_map(normalize_tag).collect()
}

/// Current wall clock in epoch milliseconds.
pub(crate) fn now_epoch_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

fn next_timestamp(previous: Timestamp) -> Timestamp {
    now_epoch_ms().max(previous.saturating_add(1))
}

fn load_entry(conn: &Connection, id: EntryId) -> RepoResult<Option<Entry>> {
    let mut stmt = conn.prepare(&format!("{ENTRY_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_entry_row(conn, row)?));
    }
    Ok(None)
}

fn parse_entry_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Entry> {
    let id: EntryId = row.get("id")?;
    let content_text: String = row.get("content")?;
    let content = serde_json::from_str(&content_text).map_err(|err| {
        RepoError::InvalidData(format!("entry {id} has malformed content: {err}"))
    })?;

    let public = match row.get::<_, i64>("is_public")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_public value `{other}` in entries.is_public"
            )));
        }
    };

    Ok(Entry {
        id,
        content,
        rendered_html: row.get("html")?,
        last_update: row.get("last_update")?,
        revisions: load_revisions(conn, id)?,
        annotations: Annotations {
            tags: load_tags(conn, id)?,
            title: row.get("title")?,
            public,
            published_to: row.get("published_to")?,
        },
    })
}

fn load_tags(conn: &Connection, id: EntryId) -> RepoResult<BTreeSet<String>> {
    let mut stmt = conn.prepare("SELECT tag FROM entry_tags WHERE entry_id = ?1;")?;
    let mut rows = stmt.query([id])?;
    let mut tags = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tags.insert(row.get::<_, String>(0)?);
    }
    Ok(tags)
}

fn load_revisions(conn: &Connection, id: EntryId) -> RepoResult<Vec<Timestamp>> {
    let mut stmt = conn.prepare(
        "SELECT revised_at
         FROM entry_revisions
         WHERE entry_id = ?1
         ORDER BY id ASC;",
    )?;
    let mut rows = stmt.query([id])?;
    let mut revisions = Vec::new();
    while let Some(row) = rows.next()? {
        revisions.push(row.get(0)?);
    }
    Ok(revisions)
}

fn write_annotations(conn: &Connection, id: EntryId, annotations: &Annotations) -> RepoResult<()> {
    conn.execute(
        "UPDATE entries
         SET
            title = ?2,
            is_public = ?3,
            published_to = ?4
         WHERE id = ?1;",
        params![
            id,
            annotations.title.as_str(),
            bool_to_int(annotations.public),
            annotations.published_to.as_deref(),
        ],
    )?;
    replace_tags(conn, id, &annotations.tags)
}

fn replace_tags(conn: &Connection, id: EntryId, tags: &BTreeSet<String>) -> RepoResult<()> {
    conn.execute("DELETE FROM entry_tags WHERE entry_id = ?1;", [id])?;
    for tag in normalize_tags(tags.iter().map(String::as_str)) {
        conn.execute(
            "INSERT OR IGNORE INTO entry_tags (entry_id, tag) VALUES (?1, ?2);",
            params![id, tag],
        )?;
    }
    Ok(())
}

fn entry_exists(conn: &Connection, id: EntryId) -> RepoResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM entries WHERE id = ?1;", [id], |row| {
            row.get::<_, i64>(0)
        })
        .optional()?;
    Ok(found.is_some())
}

fn serialize_content(content: &Value) -> RepoResult<String> {
    serde_json::to_string(content)
        .map_err(|err| RepoError::InvalidData(format!("content is not serializable: {err}")))
}

pub(super) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    for table in ["entries", "entry_revisions", "entry_tags", "tags"] {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
