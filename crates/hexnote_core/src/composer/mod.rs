//! In-editor annotation tracking.
//!
//! # Responsibility
//! - Normalize raw editor change batches into edit steps.
//! - Detect, extract and retract inline `#hashtag` spans as the user types.
//! - Aggregate tags, title and publish flag for the open document.
//!
//! # Invariants
//! - Exactly one `ComposerSession` is live; loading a document replaces it.
//! - Nothing in this module touches storage.

pub mod aggregator;
pub mod delta;
pub mod session;
pub mod tracker;
