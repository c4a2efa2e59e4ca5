//! Core data types for the notebook client.
//!
//! A notebook maps onto one repository on the remote host and a note maps
//! onto one file inside it. Identifiers are opaque strings minted by the
//! storage backend (a project id, a file path, ...), so nothing in this
//! module assumes their shape.
//!
//! All types derive `Debug`, `Clone`, `Serialize`, and `Deserialize` for
//! inspection, copying, and JSON output.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of characters shown in a note title.
pub const TITLE_MAX_CHARS: usize = 50;

/// Title shown for a note without content.
pub const EMPTY_NOTE_TITLE: &str = "Empty note";

// ============================================================================
// ID Types
// ============================================================================

/// Opaque identifier of a notebook, as assigned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotebookId(pub String);

impl NotebookId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotebookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NotebookId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NotebookId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque identifier of a note (a file path for repository backends).
///
/// A backend may mint a new id when a note is updated, so callers must not
/// treat it as stable across `update_note`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub String);

impl NoteId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Domain Types
// ============================================================================

/// A container of notes, backed by one repository.
///
/// Notebooks are produced by backend enumeration and replaced wholesale on
/// refresh; they are never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notebook {
    /// Backend identifier of the repository.
    pub id: NotebookId,

    /// Human-readable repository name.
    pub name: String,
}

impl Notebook {
    /// Creates a notebook from its id and name.
    pub fn new(id: impl Into<NotebookId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A single text document, backed by one file in a notebook's repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Backend-specific key (path of the file).
    pub id: NoteId,

    /// Full text of the note.
    pub content: String,

    /// Last modification time as reported by the backend.
    pub date: DateTime<Utc>,
}

impl Note {
    /// Creates a note.
    pub fn new(id: impl Into<NoteId>, content: impl Into<String>, date: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            date,
        }
    }

    /// Returns the display title of this note.
    pub fn title(&self) -> String {
        note_title(self)
    }
}

// ============================================================================
// Canonical list helpers
// ============================================================================

/// Sorts notes most recent first.
///
/// Notes with equal dates keep no particular order.
pub fn sort_notes(notes: &mut [Note]) {
    notes.sort_unstable_by(|a, b| b.date.cmp(&a.date));
}

/// Returns the notes whose content contains `query`, ignoring case.
///
/// An empty query returns every note. Input order is preserved, so a sorted
/// list stays sorted.
pub fn filter_notes(notes: &[Note], query: &str) -> Vec<Note> {
    if query.is_empty() {
        return notes.to_vec();
    }

    let needle = query.to_lowercase();
    notes
        .iter()
        .filter(|note| note.content.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

/// First line of the note, cut to [`TITLE_MAX_CHARS`] characters.
pub fn note_title(note: &Note) -> String {
    if note.content.is_empty() {
        return EMPTY_NOTE_TITLE.to_string();
    }

    note.content
        .lines()
        .next()
        .unwrap_or_default()
        .chars()
        .take(TITLE_MAX_CHARS)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
