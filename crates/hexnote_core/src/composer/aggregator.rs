//! Per-document annotation working set.

use crate::model::entry::Annotations;
use crate::repo::entry_repo::normalize_tag;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Annotation payload handed to the store on save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSnapshot {
    pub tags: Vec<String>,
    pub title: String,
    pub public: bool,
}

/// Accumulates tags, title and the public flag of the open document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotationAggregator {
    tags: BTreeSet<String>,
    title: String,
    public: bool,
}

impl AnnotationAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the working set from a stored entry's annotations.
    pub fn from_annotations(annotations: &Annotations) -> Self {
        Self {
            tags: annotations.tags.clone(),
            title: annotations.title.clone(),
            public: annotations.public,
        }
    }

    /// Adds a tag. Returns `false` for blanks and duplicates.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        match normalize_tag(tag) {
            Some(tag) => self.tags.insert(tag),
            None => false,
        }
    }

    /// Drops a tag the user dismissed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        self.tags.remove(tag)
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn set_public(&mut self, public: bool) {
        self.public = public;
    }

    /// Flips the public flag and returns the new value.
    pub fn toggle_public(&mut self) -> bool {
        self.public = !self.public;
        self.public
    }

    /// Recomputes the title from the document's plain text.
    pub fn observe_text(&mut self, plain_text: &str) {
        self.title = plain_text
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();
    }

    pub fn snapshot(&self) -> AnnotationSnapshot {
        AnnotationSnapshot {
            tags: self.tags.iter().cloned().collect(),
            title: self.title.clone(),
            public: self.public,
        }
    }
}
