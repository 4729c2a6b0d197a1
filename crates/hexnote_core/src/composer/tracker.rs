//! Hashtag tracking state machine.
//!
//! # Responsibility
//! - Classify each edit step into a tag event.
//! - Track the in-progress `#tag` incrementally, without rescanning the
//!   document.
//!
//! # Invariants
//! - While `InsideTag`, `buffer` equals the characters between
//!   `tag_start + 1` and the live cursor.
//! - A completed tag is reported together with the literal span to retract
//!   from the document.
//! - A tag never followed by a boundary character is never completed.

use crate::composer::delta::EditStep;
use log::trace;

/// Tracker state. There is no terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackerState {
    #[default]
    OutsideTag,
    InsideTag,
}

impl TrackerState {
    fn as_str(self) -> &'static str {
        match self {
            Self::OutsideTag => "outside_tag",
            Self::InsideTag => "inside_tag",
        }
    }
}

/// Event derived from one edit step, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEvent {
    /// The step inserted exactly `#`.
    HashDetected,
    /// The step inserted exactly one space, newline or tab.
    WordBoundary,
    Deletion,
    /// Any other non-empty insertion.
    Insertion,
}

impl TagEvent {
    /// Classifies a step. Returns `None` for no-op steps.
    pub fn classify(step: &EditStep) -> Option<Self> {
        match step.inserted_text.as_str() {
            "#" => Some(Self::HashDetected),
            " " | "\n" | "\t" => Some(Self::WordBoundary),
            _ if step.deleted_count > 0 => Some(Self::Deletion),
            "" => None,
            _ => Some(Self::Insertion),
        }
    }
}

/// Character range in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSpan {
    pub index: usize,
    pub length: usize,
}

/// Externally visible outcome of one transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerEffect {
    /// A tag was closed by a boundary; `span` covers `#`, the tag text and
    /// the boundary character.
    TagCompleted { tag: String, span: TextSpan },
    /// The `#` was deleted before the tag was closed.
    TagAbandoned,
}

/// Two-state hashtag tracker for one composer session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagTracker {
    state: TrackerState,
    tag_start: usize,
    buffer: String,
}

impl TagTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Text typed after the `#` so far.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Document offset of the `#` opening the current tag.
    pub fn tag_start(&self) -> usize {
        self.tag_start
    }

    /// Feeds one edit step through the state machine.
    pub fn advance(&mut self, step: &EditStep) -> Option<TrackerEffect> {
        let event = TagEvent::classify(step)?;
        let effect = match (self.state, event) {
            (TrackerState::OutsideTag, TagEvent::HashDetected) => {
                self.tag_start = step.retain_position;
                self.buffer.clear();
                self.state = TrackerState::InsideTag;
                None
            }
            (TrackerState::OutsideTag, _) => None,
            (TrackerState::InsideTag, TagEvent::WordBoundary) => self.close_tag(step),
            (TrackerState::InsideTag, TagEvent::Deletion) => self.apply_deletion(step),
            (TrackerState::InsideTag, TagEvent::HashDetected | TagEvent::Insertion) => {
                self.buffer.push_str(&step.inserted_text);
                None
            }
        };

        trace!(
            "event=tag_transition module=composer status=ok state={} buffer_len={}",
            self.state.as_str(),
            self.buffer.chars().count()
        );
        effect
    }

    fn close_tag(&mut self, step: &EditStep) -> Option<TrackerEffect> {
        self.state = TrackerState::OutsideTag;
        let tag = std::mem::take(&mut self.buffer);
        // Unlike a named tag, a bare `#` plus boundary is left in the text
        // and adds no empty tag.
        if tag.is_empty() {
            return None;
        }
        let length = step.retain_position.saturating_sub(self.tag_start) + 1;
        Some(TrackerEffect::TagCompleted {
            tag,
            span: TextSpan {
                index: self.tag_start,
                length,
            },
        })
    }

    fn apply_deletion(&mut self, step: &EditStep) -> Option<TrackerEffect> {
        let buffered = self.buffer.chars().count();
        // Deleting more than the buffer also abandons, even when the cursor
        // sits past the `#`: `#a` then delete(2)@1 must leave the tag.
        if step.retain_position <= self.tag_start || step.deleted_count > buffered {
            self.buffer.clear();
            self.state = TrackerState::OutsideTag;
            return Some(TrackerEffect::TagAbandoned);
        }

        let keep = buffered - step.deleted_count;
        self.buffer = self.buffer.chars().take(keep).collect();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::{TagEvent, TagTracker, TextSpan, TrackerEffect, TrackerState};
    use crate::composer::delta::EditStep;

    fn insert(text: &str, at: usize) -> EditStep {
        EditStep {
            inserted_text: text.to_string(),
            retain_position: at,
            deleted_count: 0,
        }
    }

    fn delete(count: usize, at: usize) -> EditStep {
        EditStep {
            inserted_text: String::new(),
            retain_position: at,
            deleted_count: count,
        }
    }

    #[test]
    fn classify_follows_priority_order() {
        let mut replace_with_hash = insert("#", 3);
        replace_with_hash.deleted_count = 2;
        assert_eq!(
            TagEvent::classify(&replace_with_hash),
            Some(TagEvent::HashDetected)
        );
        assert_eq!(
            TagEvent::classify(&insert("\t", 0)),
            Some(TagEvent::WordBoundary)
        );
        assert_eq!(TagEvent::classify(&delete(1, 0)), Some(TagEvent::Deletion));
        assert_eq!(
            TagEvent::classify(&insert("ab", 0)),
            Some(TagEvent::Insertion)
        );
        assert_eq!(TagEvent::classify(&EditStep::default()), None);
    }

    #[test]
    fn boundary_completes_tag_and_retracts_span() {
        let mut tracker = TagTracker::new();
        let steps = [
            insert("#", 0),
            insert("a", 1),
            insert("b", 2),
            insert("c", 3),
        ];
        for step in &steps {
            assert_eq!(tracker.advance(step), None);
        }
        assert_eq!(tracker.buffer(), "abc");

        let effect = tracker.advance(&insert(" ", 4));
        assert_eq!(
            effect,
            Some(TrackerEffect::TagCompleted {
                tag: "abc".to_string(),
                span: TextSpan {
                    index: 0,
                    length: 5
                },
            })
        );
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
        assert_eq!(tracker.buffer(), "");
    }

    #[test]
    fn tag_after_existing_text_keeps_its_offset() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 6));
        tracker.advance(&insert("x", 7));
        let effect = tracker.advance(&insert("\n", 8));
        assert_eq!(
            effect,
            Some(TrackerEffect::TagCompleted {
                tag: "x".to_string(),
                span: TextSpan {
                    index: 6,
                    length: 3
                },
            })
        );
    }

    #[test]
    fn backspace_inside_tag_trims_buffer() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        tracker.advance(&insert("a", 1));
        tracker.advance(&insert("b", 2));
        assert_eq!(tracker.advance(&delete(1, 2)), None);
        assert_eq!(tracker.buffer(), "a");
        assert_eq!(tracker.state(), TrackerState::InsideTag);
    }

    #[test]
    fn deleting_the_hash_abandons_the_tag() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        tracker.advance(&insert("a", 1));
        assert_eq!(
            tracker.advance(&delete(2, 1)),
            Some(TrackerEffect::TagAbandoned)
        );
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
        assert_eq!(tracker.buffer(), "");
    }

    #[test]
    fn deletion_at_tag_start_abandons_the_tag() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 5));
        tracker.advance(&insert("a", 6));
        assert_eq!(
            tracker.advance(&delete(1, 5)),
            Some(TrackerEffect::TagAbandoned)
        );
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
    }

    #[test]
    fn hash_with_immediate_boundary_emits_nothing() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        assert_eq!(tracker.advance(&insert(" ", 1)), None);
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
        assert_eq!(tracker.buffer(), "");
    }

    #[test]
    fn oversized_deletion_after_hash_abandons_the_tag() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        tracker.advance(&insert("a", 1));
        assert_eq!(
            tracker.advance(&delete(6, 1)),
            Some(TrackerEffect::TagAbandoned)
        );
        assert_eq!(tracker.advance(&insert("x", 1)), None);
        assert_eq!(tracker.advance(&insert(" ", 2)), None);
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
    }

    #[test]
    fn outside_tag_ignores_everything_but_hash() {
        let mut tracker = TagTracker::new();
        assert_eq!(tracker.advance(&insert("hello", 0)), None);
        assert_eq!(tracker.advance(&insert(" ", 5)), None);
        assert_eq!(tracker.advance(&delete(3, 2)), None);
        assert_eq!(tracker.state(), TrackerState::OutsideTag);
    }

    #[test]
    fn second_hash_inside_tag_is_part_of_the_tag() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        tracker.advance(&insert("c", 1));
        tracker.advance(&insert("#", 2));
        assert_eq!(tracker.buffer(), "c#");
        assert_eq!(tracker.tag_start(), 0);
    }

    #[test]
    fn unterminated_tag_is_never_completed() {
        let mut tracker = TagTracker::new();
        tracker.advance(&insert("#", 0));
        tracker.advance(&insert("draft", 1));
        assert_eq!(tracker.state(), TrackerState::InsideTag);
        assert_eq!(tracker.buffer(), "draft");
    }
}
