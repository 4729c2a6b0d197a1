//! Tag registry use-cases and autotag propagation.
//!
//! # Responsibility
//! - Register tags in the global registry.
//! - Retroactively union a registered tag into every entry whose rendered
//!   HTML or tags contain it (autotag rescan).
//!
//! # Invariants
//! - Registration is idempotent: no duplicate registry records and no
//!   duplicate entry tags.
//! - The rescan runs on every registration, new tag or not, and tags entries
//!   that merely contain the word, not only those hashtag-marked by the user.
//! - One failing entry is logged and skipped; the rescan continues.
//!
//! # Scaling
//! Each registration scans all entries once: O(number of entries). This is
//! sized for a personal archive.

use crate::model::entry::{EntryId, TagRecord};
use crate::repo::entry_repo::{normalize_tag, EntryRepository, RepoError, RepoResult};
use crate::repo::tag_repo::{TagRegistration, TagRepository};
use crate::search::substring::{find_entries, SearchQuery};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

#[derive(Debug)]
pub enum TagServiceError {
    /// Blank tags would match every entry and are refused.
    InvalidTag(String),
    Repo(RepoError),
}

impl Display for TagServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTag(value) => write!(f, "invalid tag: `{value}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TagServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::InvalidTag(_) => None,
        }
    }
}

impl From<RepoError> for TagServiceError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of one registration and its rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutotagReport {
    pub registration: TagRegistration,
    /// Entries matched by the search, tagged before or not.
    pub matched: usize,
    /// Entries that did not carry the tag before this rescan.
    pub newly_tagged: Vec<EntryId>,
    /// Entries that failed to update and were skipped.
    pub skipped: Vec<EntryId>,
}

/// Registers `tag` and runs the autotag rescan over `repo`.
pub fn register_tag_with<R>(repo: &mut R, tag: &str) -> Result<AutotagReport, TagServiceError>
where
    R: EntryRepository + TagRepository + ?Sized,
{
    let Some(tag) = normalize_tag(tag) else {
        return Err(TagServiceError::InvalidTag(tag.to_string()));
    };
    let started_at = Instant::now();
    let registration = repo.insert_tag_if_absent(&tag)?;
    let hits = find_entries(&*repo, &SearchQuery::new(tag.as_str()))?;

    let mut newly_tagged = Vec::new();
    let mut skipped = Vec::new();
    for entry in &hits {
        match repo.add_tag(entry.id, &tag) {
            Ok(true) => newly_tagged.push(entry.id),
            Ok(false) => {}
            Err(err) => {
                warn!(
                    "event=autotag_entry module=tag_service status=skip entry_id={} error={}",
                    entry.id, err
                );
                skipped.push(entry.id);
            }
        }
    }

    info!(
        "event=tag_register module=tag_service status=ok created={} matched={} newly_tagged={} skipped={} duration_ms={}",
        registration.created,
        hits.len(),
        newly_tagged.len(),
        skipped.len(),
        started_at.elapsed().as_millis()
    );

    Ok(AutotagReport {
        registration,
        matched: hits.len(),
        newly_tagged,
        skipped,
    })
}

/// Tag registry facade over repository implementations.
pub struct TagService<R: EntryRepository + TagRepository> {
    repo: R,
}

impl<R: EntryRepository + TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a tag and propagates it to matching entries.
    pub fn register_tag(&mut self, tag: &str) -> Result<AutotagReport, TagServiceError> {
        register_tag_with(&mut self.repo, tag)
    }

    pub fn get_tag(&self, tag: &str) -> RepoResult<Option<TagRecord>> {
        self.repo.get_tag(tag)
    }

    pub fn list_tags(&self) -> RepoResult<Vec<TagRecord>> {
        self.repo.list_tags()
    }
}

#[cfg(test)]
mod tests {
    use super::{register_tag_with, TagServiceError};
    use crate::model::entry::{
        AnnotationDelta, AnnotationKey, AnnotationValue, Annotations, Entry, EntryId, TagRecord,
    };
    use crate::repo::entry_repo::{EntryRepository, RepoError, RepoResult};
    use crate::repo::tag_repo::{TagRegistration, TagRepository};
    use serde_json::{json, Value};
    use std::cell::Cell;

    /// In-memory store that can be told to fail tag writes for one entry.
    #[derive(Default)]
    struct FakeStore {
        entries: Vec<Entry>,
        tags: Vec<TagRecord>,
        failing_id: Option<EntryId>,
        list_calls: Cell<usize>,
        add_tag_calls: usize,
    }

    impl FakeStore {
        fn with_html(htmls: &[&str]) -> Self {
            let entries = htmls
                .iter()
                .enumerate()
                .map(|(idx, html)| Entry {
                    id: idx as EntryId + 1,
                    content: json!({}),
                    rendered_html: html.to_string(),
                    last_update: 100 - idx as i64,
                    revisions: Vec::new(),
                    annotations: Annotations::default(),
                })
                .collect();
            Self {
                entries,
                ..Self::default()
            }
        }

        fn entry_mut(&mut self, id: EntryId) -> RepoResult<&mut Entry> {
            self.entries
                .iter_mut()
                .find(|entry| entry.id == id)
                .ok_or(RepoError::NotFound(id))
        }
    }

    impl EntryRepository for FakeStore {
        fn create_entry(&mut self, _: &Value, _: &str, _: &Annotations) -> RepoResult<Entry> {
            unreachable!("not used by the rescan")
        }

        fn update_entry(
            &mut self,
            _: EntryId,
            _: &Value,
            _: &str,
            _: &AnnotationDelta,
        ) -> RepoResult<Entry> {
            unreachable!("not used by the rescan")
        }

        fn delete_entry(&mut self, _: EntryId) -> RepoResult<bool> {
            unreachable!("not used by the rescan")
        }

        fn get_entry(&self, id: EntryId) -> RepoResult<Option<Entry>> {
            Ok(self.entries.iter().find(|entry| entry.id == id).cloned())
        }

        fn add_annotation(&mut self, id: EntryId, value: AnnotationValue) -> RepoResult<()> {
            self.entry_mut(id)?.annotations.set(value);
            Ok(())
        }

        fn remove_annotation(&mut self, id: EntryId, key: AnnotationKey) -> RepoResult<()> {
            self.entry_mut(id)?.annotations.clear(key);
            Ok(())
        }

        fn add_tag(&mut self, id: EntryId, tag: &str) -> RepoResult<bool> {
            self.add_tag_calls += 1;
            if self.failing_id == Some(id) {
                return Err(RepoError::InvalidData("malformed annotations".to_string()));
            }
            Ok(self.entry_mut(id)?.annotations.tags.insert(tag.to_string()))
        }

        fn list_entries(&self) -> RepoResult<Vec<Entry>> {
            self.list_calls.set(self.list_calls.get() + 1);
            Ok(self.entries.clone())
        }
    }

    impl TagRepository for FakeStore {
        fn insert_tag_if_absent(&mut self, tag: &str) -> RepoResult<TagRegistration> {
            if let Some(record) = self.tags.iter().find(|record| record.tag == tag) {
                return Ok(TagRegistration {
                    record: record.clone(),
                    created: false,
                });
            }
            let record = TagRecord {
                tag: tag.to_string(),
                created_at: 1,
            };
            self.tags.push(record.clone());
            Ok(TagRegistration {
                record,
                created: true,
            })
        }

        fn get_tag(&self, tag: &str) -> RepoResult<Option<TagRecord>> {
            Ok(self.tags.iter().find(|record| record.tag == tag).cloned())
        }

        fn list_tags(&self) -> RepoResult<Vec<TagRecord>> {
            Ok(self.tags.clone())
        }
    }

    #[test]
    fn failing_entry_is_skipped_and_rescan_continues() {
        let mut store = FakeStore::with_html(&["rust one", "rust two", "rust three"]);
        store.failing_id = Some(2);

        let report = register_tag_with(&mut store, "rust").unwrap();
        assert_eq!(report.matched, 3);
        assert_eq!(report.skipped, vec![2]);
        assert_eq!(report.newly_tagged, vec![1, 3]);
        assert!(store.entries[2].annotations.tags.contains("rust"));
    }

    #[test]
    fn rescan_cost_is_one_scan_per_registration() {
        let mut store = FakeStore::with_html(&["a tag", "no", "tag b", "none", "tag"]);
        register_tag_with(&mut store, "tag").unwrap();
        register_tag_with(&mut store, "tag").unwrap();

        // Scaling bound: every registration lists all entries exactly once
        // and writes only to the matches.
        assert_eq!(store.list_calls.get(), 2);
        assert_eq!(store.add_tag_calls, 6);
    }

    #[test]
    fn blank_tag_is_rejected() {
        let mut store = FakeStore::with_html(&["anything"]);
        let err = register_tag_with(&mut store, "  ").unwrap_err();
        assert!(matches!(err, TagServiceError::InvalidTag(_)));
        assert!(store.tags.is_empty());
    }
}
