//! Typed request dispatch for the editor, finder and store.
//!
//! # Responsibility
//! - Own the database connection, the publisher and the single composer
//!   session.
//! - Process one request to completion before the next one is accepted.
//!
//! # Invariants
//! - Exactly one `ComposerSession` exists; `Compose`, `EditById` and the
//!   deletion of the open entry replace it wholesale.
//! - Handler failures become `Reply::Failed`; the loop keeps running.

use crate::composer::session::{ComposerSession, EditorCommand};
use crate::model::entry::{Entry, EntryId};
use crate::publish::Publisher;
use crate::repo::entry_repo::SqliteEntryRepository;
use crate::service::entry_service::{
    EntryService, EntryServiceError, EntrySnapshot, SaveOutcome, SaveRequest,
};
use log::{debug, error};
use rusqlite::Connection;
use serde_json::Value;

/// Messages accepted by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Open a blank document.
    Compose,
    /// Raw editor change payload for the open document.
    Edit { delta: Value },
    TogglePublic,
    /// Drop a tag from the open document's working set.
    RemoveTag { tag: String },
    /// Save the open document from the editor's current state.
    SaveSession {
        content: Value,
        html: String,
        plain_text: String,
    },
    /// Save a fully formed request.
    Save(SaveRequest),
    Search { search_string: Option<String> },
    EditById { id: EntryId },
    Delete { id: EntryId },
}

/// Replies produced by the coordinator, one per request.
#[derive(Debug)]
pub enum Reply {
    SessionReset,
    Editor(Option<EditorCommand>),
    PublicToggled(bool),
    TagRemoved(bool),
    /// `SaveSession` with nothing changed since the last load or save.
    Unchanged,
    Saved(SaveOutcome),
    SearchResults(Vec<EntrySnapshot>),
    /// The entry now loaded in the session, `None` when the id was unknown.
    Loaded(Option<Entry>),
    Deleted { id: EntryId, existed: bool },
    Failed(String),
}

/// Single-writer coordinator over the journal core.
pub struct Coordinator<P: Publisher> {
    conn: Connection,
    publisher: P,
    session: ComposerSession,
}

impl<P: Publisher> Coordinator<P> {
    pub fn new(conn: Connection, publisher: P) -> Self {
        Self {
            conn,
            publisher,
            session: ComposerSession::blank(),
        }
    }

    pub fn session(&self) -> &ComposerSession {
        &self.session
    }

    /// Handles one request.
    pub fn dispatch(&mut self, request: Request) -> Reply {
        match self.handle(request) {
            Ok(reply) => reply,
            Err(err) => {
                error!(
                    "event=dispatch module=dispatch status=error error={}",
                    err
                );
                Reply::Failed(err.to_string())
            }
        }
    }

    fn handle(&mut self, request: Request) -> Result<Reply, EntryServiceError> {
        match request {
            Request::Compose => {
                self.session = ComposerSession::blank();
                debug!("event=session_replace module=dispatch status=ok kind=blank");
                Ok(Reply::SessionReset)
            }
            Request::Edit { delta } => Ok(Reply::Editor(self.session.apply_delta_value(&delta))),
            Request::TogglePublic => Ok(Reply::PublicToggled(self.session.toggle_public())),
            Request::RemoveTag { tag } => Ok(Reply::TagRemoved(self.session.remove_tag(&tag))),
            Request::SaveSession {
                content,
                html,
                plain_text,
            } => {
                let Some(request) = self.session.save_request(content, html, &plain_text) else {
                    return Ok(Reply::Unchanged);
                };
                let outcome = self.save(request)?;
                self.session.mark_saved(outcome.entry.id);
                Ok(Reply::Saved(outcome))
            }
            // Saves built outside the session never rebind it.
            Request::Save(request) => Ok(Reply::Saved(self.save(request)?)),
            Request::Search { search_string } => {
                let snapshots = with_entry_service(&mut self.conn, &self.publisher, |service| {
                    Ok(service.search(search_string.as_deref())?)
                })?;
                Ok(Reply::SearchResults(snapshots))
            }
            Request::EditById { id } => {
                let loaded = with_entry_service(&mut self.conn, &self.publisher, |service| {
                    match service.get_by_id(id) {
                        Ok(entry) => Ok(Some(entry)),
                        Err(EntryServiceError::EntryNotFound(_)) => Ok(None),
                        Err(err) => Err(err),
                    }
                })?;
                self.session = match &loaded {
                    Some(entry) => ComposerSession::for_entry(entry),
                    None => ComposerSession::blank(),
                };
                debug!(
                    "event=session_replace module=dispatch status=ok kind=entry found={}",
                    loaded.is_some()
                );
                Ok(Reply::Loaded(loaded))
            }
            Request::Delete { id } => {
                let existed = with_entry_service(&mut self.conn, &self.publisher, |service| {
                    Ok(service.delete(id)?)
                })?;
                if self.session.entry_id() == Some(id) {
                    self.session = ComposerSession::blank();
                }
                Ok(Reply::Deleted { id, existed })
            }
        }
    }

    fn save(&mut self, request: SaveRequest) -> Result<SaveOutcome, EntryServiceError> {
        with_entry_service(&mut self.conn, &self.publisher, |service| {
            service.save(request)
        })
    }
}

/// Feeds every request through `coordinator`, handing each reply to
/// `on_reply` before the next request is taken.
///
/// Accepts any request source, including an `mpsc::Receiver`.
pub fn run_dispatch_loop<P: Publisher>(
    coordinator: &mut Coordinator<P>,
    requests: impl IntoIterator<Item = Request>,
    mut on_reply: impl FnMut(Reply),
) {
    for request in requests {
        on_reply(coordinator.dispatch(request));
    }
}

fn with_entry_service<P: Publisher, T>(
    conn: &mut Connection,
    publisher: &P,
    run: impl FnOnce(&mut EntryService<SqliteEntryRepository<'_>, &P>) -> Result<T, EntryServiceError>,
) -> Result<T, EntryServiceError> {
    let repo = SqliteEntryRepository::try_new(conn)?;
    let mut service = EntryService::new(repo, publisher);
    run(&mut service)
}
