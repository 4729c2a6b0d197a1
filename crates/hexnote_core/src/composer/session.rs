//! Composer session: the single open document's transient state.
//!
//! # Invariants
//! - A session is owned by one coordinator and replaced wholesale when a
//!   new or stored document is loaded; unsaved state is discarded.
//! - No-op edit steps leave the session untouched.

use crate::composer::aggregator::{AnnotationAggregator, AnnotationSnapshot};
use crate::composer::delta::{interpret_delta_value, interpret_ops, EditOp, EditStep};
use crate::composer::tracker::{TagTracker, TextSpan, TrackerEffect};
use crate::model::entry::{Entry, EntryId};
use crate::service::entry_service::SaveRequest;
use log::debug;
use serde_json::Value;

/// Instruction for the editor collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    /// Remove a closed `#tag` span; its value now lives in the annotations.
    DeleteText(TextSpan),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposerSession {
    entry_id: Option<EntryId>,
    tracker: TagTracker,
    aggregator: AnnotationAggregator,
    changed: bool,
}

impl ComposerSession {
    /// Session for a new, never-saved document.
    pub fn blank() -> Self {
        Self::default()
    }

    /// Session editing a stored entry, seeded with its tags and public flag.
    pub fn for_entry(entry: &Entry) -> Self {
        Self {
            entry_id: Some(entry.id),
            tracker: TagTracker::new(),
            aggregator: AnnotationAggregator::from_annotations(&entry.annotations),
            changed: false,
        }
    }

    pub fn entry_id(&self) -> Option<EntryId> {
        self.entry_id
    }

    pub fn tracker(&self) -> &TagTracker {
        &self.tracker
    }

    pub fn aggregator(&self) -> &AnnotationAggregator {
        &self.aggregator
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Applies a batch of typed editor sub-operations.
    pub fn apply_ops(&mut self, ops: &[EditOp]) -> Option<EditorCommand> {
        self.apply_step(&interpret_ops(ops))
    }

    /// Applies a raw editor change payload.
    pub fn apply_delta_value(&mut self, delta: &Value) -> Option<EditorCommand> {
        self.apply_step(&interpret_delta_value(delta))
    }

    pub fn apply_step(&mut self, step: &EditStep) -> Option<EditorCommand> {
        if step.is_noop() {
            return None;
        }
        self.changed = true;

        match self.tracker.advance(step)? {
            TrackerEffect::TagCompleted { tag, span } => {
                let added = self.aggregator.add_tag(&tag);
                debug!(
                    "event=tag_extracted module=composer status=ok new={} span_index={} span_len={}",
                    added, span.index, span.length
                );
                Some(EditorCommand::DeleteText(span))
            }
            TrackerEffect::TagAbandoned => {
                debug!("event=tag_abandoned module=composer status=ok");
                None
            }
        }
    }

    /// Flips the public flag; returns the new value.
    pub fn toggle_public(&mut self) -> bool {
        self.changed = true;
        self.aggregator.toggle_public()
    }

    /// Removes a tag from the working set.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.aggregator.remove_tag(tag);
        if removed {
            self.changed = true;
        }
        removed
    }

    /// Annotation snapshot for the given document text.
    pub fn snapshot(&mut self, plain_text: &str) -> AnnotationSnapshot {
        self.aggregator.observe_text(plain_text);
        self.aggregator.snapshot()
    }

    /// Builds a save request, or `None` when nothing changed since the last
    /// load or save.
    ///
    /// An unterminated `#tag` still being typed is not included.
    pub fn save_request(
        &mut self,
        content: Value,
        html: impl Into<String>,
        plain_text: &str,
    ) -> Option<SaveRequest> {
        if !self.changed {
            return None;
        }
        let annotations = self.snapshot(plain_text);
        Some(SaveRequest {
            id: self.entry_id,
            content,
            html: html.into(),
            public: annotations.public,
            annotations,
        })
    }

    /// Records that the session's document is now stored under `id`.
    pub fn mark_saved(&mut self, id: EntryId) {
        self.entry_id = Some(id);
        self.changed = false;
    }
}
