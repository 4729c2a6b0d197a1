//! Entry use-case service.
//!
//! # Responsibility
//! - Merge composer save requests into the store (create or update).
//! - Drive publish/unpublish around a save and register saved tags.
//! - Shape search replies with a plain-text preview.
//!
//! # Invariants
//! - A previously published entry is unpublished before it is updated.
//! - Publisher failures never undo the store changes of the same save; they
//!   are reported in `SaveOutcome`.
//! - Search order equals `list_all()` order.

use crate::composer::aggregator::AnnotationSnapshot;
use crate::model::entry::{
    AnnotationChange, AnnotationKey, AnnotationValue, Annotations, Entry, EntryId, Timestamp,
};
use crate::publish::{PublishError, Publisher};
use crate::repo::entry_repo::{normalize_tags, EntryRepository, RepoError, RepoResult};
use crate::repo::tag_repo::TagRepository;
use crate::search::substring::{find_entries, SearchQuery};
use crate::service::tag_service::{register_tag_with, AutotagReport, TagServiceError};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

const PREVIEW_LIMIT_CHARS: usize = 200;
const PREVIEW_ELLIPSIS: &str = " ...";

static HTML_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Service error for entry use-cases.
#[derive(Debug)]
pub enum EntryServiceError {
    EntryNotFound(EntryId),
    Repo(RepoError),
    /// Registering a saved tag failed.
    Tag(TagServiceError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for EntryServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntryNotFound(id) => write!(f, "entry not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Tag(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent entry state: {details}"),
        }
    }
}

impl Error for EntryServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::Tag(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for EntryServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::EntryNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<TagServiceError> for EntryServiceError {
    fn from(value: TagServiceError) -> Self {
        Self::Tag(value)
    }
}

/// Save request sent by the composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Entry being edited; `None` for a new document.
    pub id: Option<EntryId>,
    /// Opaque rich document model.
    pub content: Value,
    pub html: String,
    pub annotations: AnnotationSnapshot,
    /// Whether the entry should be published after the save.
    pub public: bool,
}

/// Result of a save, including publisher failures that did not abort it.
#[derive(Debug)]
pub struct SaveOutcome {
    pub entry: Entry,
    pub created: bool,
    pub autotag: Vec<AutotagReport>,
    pub unpublish_error: Option<PublishError>,
    pub publish_error: Option<PublishError>,
}

impl SaveOutcome {
    pub fn publish_failed(&self) -> bool {
        self.publish_error.is_some() || self.unpublish_error.is_some()
    }
}

/// Entry projection returned to search callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySnapshot {
    pub id: EntryId,
    pub html: String,
    pub last_update: Timestamp,
    pub annotations: Annotations,
    /// Plain-text preview of `html`.
    pub preview: String,
}

impl From<&Entry> for EntrySnapshot {
    fn from(entry: &Entry) -> Self {
        Self {
            id: entry.id,
            html: entry.rendered_html.clone(),
            last_update: entry.last_update,
            annotations: entry.annotations.clone(),
            preview: derive_html_preview(&entry.rendered_html),
        }
    }
}

/// Entry service facade over repository and publisher implementations.
pub struct EntryService<R, P>
where
    R: EntryRepository + TagRepository,
    P: Publisher,
{
    repo: R,
    publisher: P,
}

impl<R, P> EntryService<R, P>
where
    R: EntryRepository + TagRepository,
    P: Publisher,
{
    pub fn new(repo: R, publisher: P) -> Self {
        Self { repo, publisher }
    }

    /// Creates or updates the entry described by `request`.
    ///
    /// A request id that no longer exists is saved as a new entry.
    pub fn save(&mut self, request: SaveRequest) -> Result<SaveOutcome, EntryServiceError> {
        let tags = normalize_tags(request.annotations.tags.iter().map(String::as_str));
        let existing = match request.id {
            Some(id) => {
                let found = self.repo.get_entry(id)?;
                if found.is_none() {
                    warn!(
                        "event=entry_save module=entry_service status=skip entry_id={} reason=missing_entry action=create",
                        id
                    );
                }
                found
            }
            None => None,
        };

        let mut unpublish_error = None;
        let (entry, created) = match existing {
            Some(previous) => {
                if previous.annotations.is_published() {
                    if let Err(err) = self.publisher.unpublish(&previous) {
                        warn!(
                            "event=entry_unpublish module=entry_service status=error entry_id={} error={}",
                            previous.id, err
                        );
                        unpublish_error = Some(err);
                    }
                    self.repo
                        .remove_annotation(previous.id, AnnotationKey::Public)?;
                    self.repo
                        .remove_annotation(previous.id, AnnotationKey::PublishedTo)?;
                }

                let delta = vec![
                    AnnotationChange::Set(AnnotationValue::Tags(tags)),
                    AnnotationChange::Set(AnnotationValue::Title(
                        request.annotations.title.clone(),
                    )),
                    AnnotationChange::Set(AnnotationValue::Public(request.annotations.public)),
                ];
                let updated =
                    self.repo
                        .update_entry(previous.id, &request.content, &request.html, &delta)?;
                (updated, false)
            }
            None => {
                let annotations = Annotations {
                    tags,
                    title: request.annotations.title.clone(),
                    public: request.annotations.public,
                    published_to: None,
                };
                let inserted =
                    self.repo
                        .create_entry(&request.content, &request.html, &annotations)?;
                (inserted, true)
            }
        };

        let saved_tags = entry.annotations.tags.iter().cloned().collect::<Vec<_>>();
        let mut autotag = Vec::with_capacity(saved_tags.len());
        for tag in &saved_tags {
            autotag.push(register_tag_with(&mut self.repo, tag)?);
        }

        let mut publish_error = None;
        if request.public {
            let current = self.read_back(entry.id)?;
            match self.publisher.publish(&current) {
                Ok(location) => self
                    .repo
                    .add_annotation(entry.id, AnnotationValue::PublishedTo(location))?,
                Err(err) => {
                    warn!(
                        "event=entry_publish module=entry_service status=error entry_id={} error={}",
                        entry.id, err
                    );
                    publish_error = Some(err);
                }
            }
        }

        let entry = self.read_back(entry.id)?;
        info!(
            "event=entry_save module=entry_service status=ok entry_id={} created={} tags={} revisions={} publish_failed={}",
            entry.id,
            created,
            entry.annotations.tags.len(),
            entry.revisions.len(),
            publish_error.is_some() || unpublish_error.is_some()
        );

        Ok(SaveOutcome {
            entry,
            created,
            autotag,
            unpublish_error,
            publish_error,
        })
    }

    /// Gets one entry, failing with `EntryNotFound` when absent.
    pub fn get_by_id(&self, id: EntryId) -> Result<Entry, EntryServiceError> {
        self.repo
            .get_entry(id)?
            .ok_or(EntryServiceError::EntryNotFound(id))
    }

    /// All entries, most recently updated first.
    pub fn list_all(&self) -> RepoResult<Vec<Entry>> {
        self.repo.list_entries()
    }

    /// Substring search; an empty query returns `list_all()`.
    pub fn find(&self, query: &SearchQuery) -> RepoResult<Vec<Entry>> {
        find_entries(&self.repo, query)
    }

    /// Answers a search request with entry snapshots.
    pub fn search(&self, search_string: Option<&str>) -> RepoResult<Vec<EntrySnapshot>> {
        let query = match search_string {
            Some(text) => SearchQuery::new(text),
            None => SearchQuery::all(),
        };
        let hits = self.find(&query)?;
        Ok(hits.iter().map(EntrySnapshot::from).collect())
    }

    /// Deletes an entry; absent ids are a no-op. Returns whether a row went away.
    pub fn delete(&mut self, id: EntryId) -> RepoResult<bool> {
        let deleted = self.repo.delete_entry(id)?;
        info!(
            "event=entry_delete module=entry_service status=ok entry_id={} deleted={}",
            id, deleted
        );
        Ok(deleted)
    }

    fn read_back(&self, id: EntryId) -> Result<Entry, EntryServiceError> {
        self.repo
            .get_entry(id)?
            .ok_or(EntryServiceError::InconsistentState(
                "saved entry not found in read-back",
            ))
    }
}

/// Derives a plain-text preview from rendered HTML.
///
/// Rules:
/// - markup tags are replaced by spaces and whitespace is collapsed;
/// - previews longer than 200 characters are cut and end with ` ...`.
pub fn derive_html_preview(html: &str) -> String {
    let without_tags = HTML_TAG_RE.replace_all(html, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_tags, " ");
    let text = normalized.trim();
    if text.chars().count() <= PREVIEW_LIMIT_CHARS {
        return text.to_string();
    }
    let keep = PREVIEW_LIMIT_CHARS - PREVIEW_ELLIPSIS.len();
    let mut preview = text.chars().take(keep).collect::<String>();
    preview.push_str(PREVIEW_ELLIPSIS);
    preview
}
