//! Core of the hexnote journal.
//!
//! Two halves live here: the composer, which turns the editor's stream of
//! change batches into inline `#tag` annotations, and the entry store, which
//! persists entries, keeps the global tag registry, propagates newly
//! registered tags and answers substring searches.

pub mod composer;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod logging;
pub mod model;
pub mod publish;
pub mod repo;
pub mod search;
pub mod service;

pub use composer::aggregator::{AnnotationAggregator, AnnotationSnapshot};
pub use composer::delta::{interpret_delta_value, interpret_ops, EditOp, EditStep};
pub use composer::session::{ComposerSession, EditorCommand};
pub use composer::tracker::{TagEvent, TagTracker, TextSpan, TrackerEffect, TrackerState};
pub use config::{load_or_init_config, ConfigError, CoreConfig};
pub use dispatch::{run_dispatch_loop, Coordinator, Reply, Request};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::entry::{
    AnnotationChange, AnnotationDelta, AnnotationKey, AnnotationValue, Annotations, Entry, EntryId,
    TagRecord, Timestamp,
};
pub use publish::{DisabledPublisher, PublishError, Publisher};
pub use repo::entry_repo::{EntryRepository, RepoError, RepoResult, SqliteEntryRepository};
pub use repo::tag_repo::{TagRegistration, TagRepository};
pub use search::substring::{entry_matches, find_entries, SearchQuery};
pub use service::entry_service::{
    derive_html_preview, EntryService, EntryServiceError, EntrySnapshot, SaveOutcome, SaveRequest,
};
pub use service::tag_service::{register_tag_with, AutotagReport, TagService, TagServiceError};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
