//! Tag registry contracts and SQLite implementation.
//!
//! # Invariants
//! - One registry record per distinct tag string (case-sensitive).
//! - Records are never mutated once created.

use crate::model::entry::TagRecord;
use crate::repo::entry_repo::{
    normalize_tag, now_epoch_ms, RepoError, RepoResult, SqliteEntryRepository,
};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

/// Result of inserting a tag into the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRegistration {
    pub record: TagRecord,
    /// `false` when the tag was already registered.
    pub created: bool,
}

/// Repository interface for the global tag registry.
pub trait TagRepository {
    /// Inserts `tag` with the current timestamp unless it already exists.
    fn insert_tag_if_absent(&mut self, tag: &str) -> RepoResult<TagRegistration>;
    fn get_tag(&self, tag: &str) -> RepoResult<Option<TagRecord>>;
    /// All registered tags ordered by tag.
    fn list_tags(&self) -> RepoResult<Vec<TagRecord>>;
}

impl TagRepository for SqliteEntryRepository<'_> {
    fn insert_tag_if_absent(&mut self, tag: &str) -> RepoResult<TagRegistration> {
        let Some(tag) = normalize_tag(tag) else {
            return Err(RepoError::InvalidData("blank tag value".to_string()));
        };
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let created = tx.execute(
            "INSERT OR IGNORE INTO tags (tag, created_at) VALUES (?1, ?2);",
            params![tag, now_epoch_ms()],
        )? == 1;
        let record = tx.query_row(
            "SELECT tag, created_at FROM tags WHERE tag = ?1;",
            [tag.as_str()],
            |row| {
                Ok(TagRecord {
                    tag: row.get(0)?,
                    created_at: row.get(1)?,
                })
            },
        )?;
        tx.commit()?;
        Ok(TagRegistration { record, created })
    }

    fn get_tag(&self, tag: &str) -> RepoResult<Option<TagRecord>> {
        let record = self
            .conn
            .query_row(
                "SELECT tag, created_at FROM tags WHERE tag = ?1;",
                [tag],
                |row| {
                    Ok(TagRecord {
                        tag: row.get(0)?,
                        created_at: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    fn list_tags(&self) -> RepoResult<Vec<TagRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag, created_at FROM tags ORDER BY tag ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            tags.push(TagRecord {
                tag: row.get("tag")?,
                created_at: row.get("created_at")?,
            });
        }
        Ok(tags)
    }
}
