//! Linear-scan substring search.
//!
//! # Invariants
//! - An entry matches when `html + " " + space-joined tags` contains the
//!   query as a case-sensitive substring.
//! - An empty or absent query matches every entry.
//! - Results keep the store order: `last_update DESC, id DESC`.
//!
//! There is no secondary index; every query scans all entries. Adding one
//! must not change which entries match.

use crate::model::entry::Entry;
use crate::repo::entry_repo::{EntryRepository, RepoResult};
use log::debug;
use std::time::Instant;

/// Search request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Query text. `None` behaves like the empty string.
    pub text: Option<String>,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// Query matching every entry.
    pub fn all() -> Self {
        Self { text: None }
    }

    fn needle(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

/// Returns whether `entry` matches `needle` under substring semantics.
pub fn entry_matches(entry: &Entry, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    let fulltext = format!(
        "{} {}",
        entry.rendered_html,
        entry.annotations.joined_tags()
    );
    fulltext.contains(needle)
}

/// Finds all entries matching `query`, most recently updated first.
pub fn find_entries<R: EntryRepository + ?Sized>(
    repo: &R,
    query: &SearchQuery,
) -> RepoResult<Vec<Entry>> {
    let started_at = Instant::now();
    let needle = query.needle();
    let scanned = repo.list_entries()?;
    let total = scanned.len();
    let hits = scanned
        .into_iter()
        .filter(|entry| entry_matches(entry, needle))
        .collect::<Vec<_>>();

    debug!(
        "event=entry_search module=search status=ok query_len={} scanned={} hits={} duration_ms={}",
        needle.chars().count(),
        total,
        hits.len(),
        started_at.elapsed().as_millis()
    );
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::entry_matches;
    use crate::model::entry::{Annotations, Entry};
    use serde_json::json;

    fn entry(html: &str, tags: &[&str]) -> Entry {
        Entry {
            id: 1,
            content: json!({ "ops": [] }),
            rendered_html: html.to_string(),
            last_update: 0,
            revisions: Vec::new(),
            annotations: Annotations {
                tags: tags.iter().map(|tag| tag.to_string()).collect(),
                ..Annotations::default()
            },
        }
    }

    #[test]
    fn matches_html_or_tags_case_sensitively() {
        let target = entry("<p>I love golang</p>", &["work"]);
        assert!(entry_matches(&target, "golang"));
        assert!(entry_matches(&target, "work"));
        assert!(!entry_matches(&target, "Golang"));
        assert!(!entry_matches(&target, "travel"));
    }

    #[test]
    fn empty_needle_matches_everything() {
        assert!(entry_matches(&entry("", &[]), ""));
    }

    #[test]
    fn html_and_tags_are_joined_by_a_space() {
        let target = entry("<p>end</p>", &["alpha", "beta"]);
        assert!(entry_matches(&target, "</p> alpha beta"));
    }
}
