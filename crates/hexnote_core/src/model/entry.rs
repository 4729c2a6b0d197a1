//! Entry and tag registry records.
//!
//! # Invariants
//! - `id` is immutable after creation.
//! - `tags` holds no duplicates; ordering carries no meaning.
//! - `revisions` only ever grows.
//! - `last_update` strictly increases on every content update.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Store-assigned entry identifier.
pub type EntryId = i64;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// Structured metadata attached to an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Annotations {
    pub tags: BTreeSet<String>,
    /// First whitespace-delimited token of the document text.
    pub title: String,
    pub public: bool,
    /// Opaque location token returned by the publisher.
    pub published_to: Option<String>,
}

impl Annotations {
    /// Applies one annotation change in place.
    ///
    /// `Clear` on a field without an "absent" state resets it to its default.
    pub fn apply(&mut self, change: &AnnotationChange) {
        match change {
            AnnotationChange::Set(value) => self.set(value.clone()),
            AnnotationChange::Clear(key) => self.clear(*key),
        }
    }

    /// Overwrites the field addressed by `value`.
    pub fn set(&mut self, value: AnnotationValue) {
        match value {
            AnnotationValue::Tags(tags) => self.tags = tags,
            AnnotationValue::Title(title) => self.title = title,
            AnnotationValue::Public(public) => self.public = public,
            AnnotationValue::PublishedTo(location) => self.published_to = Some(location),
        }
    }

    /// Removes the field addressed by `key`. Clearing an absent field is a no-op.
    pub fn clear(&mut self, key: AnnotationKey) {
        match key {
            AnnotationKey::Tags => self.tags.clear(),
            AnnotationKey::Title => self.title.clear(),
            AnnotationKey::Public => self.public = false,
            AnnotationKey::PublishedTo => self.published_to = None,
        }
    }

    /// Whether the entry currently has a live published copy.
    pub fn is_published(&self) -> bool {
        self.public && self.published_to.is_some()
    }

    /// Space-joined tags, as used by substring search.
    pub fn joined_tags(&self) -> String {
        self.tags.iter().map(String::as_str).collect::<Vec<_>>().join(" ")
    }
}

/// Addresses one annotation field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationKey {
    Tags,
    Title,
    Public,
    PublishedTo,
}

/// A value for one annotation field; the variant names the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationValue {
    Tags(BTreeSet<String>),
    Title(String),
    Public(bool),
    PublishedTo(String),
}

impl AnnotationValue {
    pub fn key(&self) -> AnnotationKey {
        match self {
            Self::Tags(_) => AnnotationKey::Tags,
            Self::Title(_) => AnnotationKey::Title,
            Self::Public(_) => AnnotationKey::Public,
            Self::PublishedTo(_) => AnnotationKey::PublishedTo,
        }
    }
}

/// One step of an annotation update: overwrite a field or clear it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnnotationChange {
    Set(AnnotationValue),
    Clear(AnnotationKey),
}

/// Ordered list of changes applied key by key by `update_entry`.
pub type AnnotationDelta = Vec<AnnotationChange>;

/// Persisted journal entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub id: EntryId,
    /// Opaque rich document model produced by the editor.
    pub content: Value,
    /// Rendered HTML of `content`.
    #[serde(rename = "html")]
    pub rendered_html: String,
    pub last_update: Timestamp,
    /// Timestamps of every content update, oldest first.
    pub revisions: Vec<Timestamp>,
    pub annotations: Annotations,
}

/// Global tag registry record. Created once per distinct tag string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub tag: String,
    pub created_at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::{AnnotationChange, AnnotationKey, AnnotationValue, Annotations};

    #[test]
    fn clearing_absent_published_to_is_a_noop() {
        let mut annotations = Annotations {
            title: "monday".to_string(),
            ..Annotations::default()
        };
        let before = annotations.clone();
        annotations.apply(&AnnotationChange::Clear(AnnotationKey::PublishedTo));
        assert_eq!(annotations, before);
    }

    #[test]
    fn set_overwrites_only_the_addressed_field() {
        let mut annotations = Annotations::default();
        annotations.apply(&AnnotationChange::Set(AnnotationValue::Public(true)));
        annotations.apply(&AnnotationChange::Set(AnnotationValue::PublishedTo(
            "2018_5_1_hello.html".to_string(),
        )));
        assert!(annotations.is_published());
        assert!(annotations.tags.is_empty());
        assert_eq!(annotations.title, "");
    }

    #[test]
    fn annotations_serialize_with_external_field_names() {
        let annotations = Annotations {
            published_to: Some("post.html".to_string()),
            ..Annotations::default()
        };
        let json = serde_json::to_value(&annotations).unwrap();
        assert_eq!(json["publishedTo"], "post.html");
        assert_eq!(json["public"], false);
    }
}
