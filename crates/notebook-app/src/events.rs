//! Application events exchanged between the UI layer and the controller.
//!
//! # Event Types
//!
//! Intents, produced by the UI layer:
//! - `Ready`, `Connected`, `NotebookSelected`, `CreateNote`, `UpdateNote`,
//!   `RemoveNote`, `SearchNote`
//!
//! State changes, produced by the controller:
//! - `NotebooksChanged`, `NotebookSelected`, `NotesChanged`, `NoteSelected`,
//!   `ActionFailed`
//!
//! `NotebookSelected` is both: the controller emits it after connecting and
//! reacts to it by loading that notebook's notes.

use std::fmt;
use std::sync::Arc;

use notebook_core::{Event, EventBus, Note, Notebook};
use notebook_store::StorageBackend;

/// The bus type shared by the UI layer and the controller.
pub type AppBus = EventBus<AppEvent>;

/// Names handlers subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventName {
    Ready,
    Connected,
    NotebooksChanged,
    NotebookSelected,
    NotesChanged,
    NoteSelected,
    CreateNote,
    UpdateNote,
    RemoveNote,
    SearchNote,
    ActionFailed,
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An event with its payload.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The UI is up and needs a connection.
    Ready,
    /// A backend finished authorizing and becomes the active one.
    Connected(Arc<dyn StorageBackend>),
    /// The notebook list was (re)loaded.
    NotebooksChanged(Vec<Notebook>),
    /// A notebook became current.
    NotebookSelected(Notebook),
    /// The note list to display, most recent first.
    NotesChanged(Vec<Note>),
    /// A note should be shown in the editor.
    NoteSelected(Note),
    /// Create an empty note in the current notebook.
    CreateNote,
    /// Persist new content for a note.
    UpdateNote { note: Note, content: String },
    /// Delete a note.
    RemoveNote(Note),
    /// Show only notes containing the query; empty shows all.
    SearchNote(String),
    /// A bus-triggered reaction failed.
    ActionFailed { event: EventName, message: String },
}

impl Event for AppEvent {
    type Name = EventName;

    fn name(&self) -> EventName {
        match self {
            Self::Ready => EventName::Ready,
            Self::Connected(_) => EventName::Connected,
            Self::NotebooksChanged(_) => EventName::NotebooksChanged,
            Self::NotebookSelected(_) => EventName::NotebookSelected,
            Self::NotesChanged(_) => EventName::NotesChanged,
            Self::NoteSelected(_) => EventName::NoteSelected,
            Self::CreateNote => EventName::CreateNote,
            Self::UpdateNote { .. } => EventName::UpdateNote,
            Self::RemoveNote(_) => EventName::RemoveNote,
            Self::SearchNote(_) => EventName::SearchNote,
            Self::ActionFailed { .. } => EventName::ActionFailed,
        }
    }
}
