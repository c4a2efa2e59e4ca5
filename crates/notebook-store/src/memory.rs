//! In-process storage backend.
//!
//! Keeps notebooks and notes in memory for demos and tests. Nothing is
//! persisted.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use notebook_core::{Note, NoteId, Notebook, NotebookId};
use tokio::sync::RwLock;

use crate::backend::{BackendDescriptor, BackendOptions, StorageBackend};
use crate::error::{StoreError, StoreResult};

/// Registry key of this backend.
pub const KIND: &str = "memory";

/// Option listing notebook names to create, comma-separated.
pub const OPTION_NOTEBOOKS: &str = "notebooks";

/// Option naming the user reported by `username`.
pub const OPTION_USERNAME: &str = "username";

const DEFAULT_USERNAME: &str = "local";

/// Descriptor registered under [`KIND`].
pub static DESCRIPTOR: BackendDescriptor = BackendDescriptor {
    kind: KIND,
    display_name: "In-memory",
    required_options: &[],
    saved_name,
    connect,
};

fn saved_name(_options: &BackendOptions) -> String {
    "In-memory".to_string()
}

/// Build a [`MemoryBackend`] from its options.
pub fn connect(options: &BackendOptions) -> StoreResult<Arc<dyn StorageBackend>> {
    let username = options
        .get(OPTION_USERNAME)
        .map(String::as_str)
        .unwrap_or(DEFAULT_USERNAME);
    let names = options
        .get(OPTION_NOTEBOOKS)
        .map(|names| {
            names
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    Ok(Arc::new(MemoryBackend::with_notebooks(username, names)))
}

#[derive(Debug, Default)]
struct MemoryState {
    notebooks: Vec<Notebook>,
    notes: HashMap<NotebookId, Vec<Note>>,
}

/// Storage backend holding everything in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    username: String,
    rename_on_update: bool,
    counter: AtomicU64,
    state: RwLock<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME)
    }
}

impl MemoryBackend {
    /// An empty backend reporting `username`.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            rename_on_update: false,
            counter: AtomicU64::new(0),
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// A backend with one empty notebook per name, ids `"1"`, `"2"`, ...
    pub fn with_notebooks<'a>(
        username: impl Into<String>,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let mut state = MemoryState::default();
        for (index, name) in names.into_iter().enumerate() {
            let notebook = Notebook::new((index + 1).to_string(), name);
            state.notes.insert(notebook.id.clone(), Vec::new());
            state.notebooks.push(notebook);
        }

        Self {
            state: RwLock::new(state),
            ..Self::new(username)
        }
    }

    /// Mint a new note id on every update, like hosts that rename on save.
    pub fn renaming_on_update(mut self) -> Self {
        self.rename_on_update = true;
        self
    }

    /// Store `note` in `notebook` as is.
    pub async fn insert_note(&self, notebook: &NotebookId, note: Note) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .notes
            .get_mut(notebook)
            .ok_or_else(|| StoreError::NotebookNotFound(notebook.clone()))?
            .push(note);
        Ok(())
    }

    fn next_id(&self) -> NoteId {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed);
        NoteId(format!(
            "note-{}-{sequence}.md",
            Utc::now().format("%Y-%m-%d-%H-%M-%S")
        ))
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    fn descriptor(&self) -> &'static BackendDescriptor {
        &DESCRIPTOR
    }

    async fn authorize(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn username(&self) -> StoreResult<String> {
        Ok(self.username.clone())
    }

    async fn notebooks(&self) -> StoreResult<Vec<Notebook>> {
        Ok(self.state.read().await.notebooks.clone())
    }

    async fn notes(&self, notebook: &Notebook) -> StoreResult<Vec<Note>> {
        let state = self.state.read().await;
        Ok(state.notes.get(&notebook.id).cloned().unwrap_or_default())
    }

    async fn create_note(&self, notebook: &Notebook) -> StoreResult<Note> {
        let note = Note::new(self.next_id(), "", Utc::now());
        self.insert_note(&notebook.id, note.clone()).await?;
        Ok(note)
    }

    async fn update_note(
        &self,
        notebook: &Notebook,
        note: &Note,
        content: &str,
    ) -> StoreResult<Note> {
        let id = if self.rename_on_update {
            self.next_id()
        } else {
            note.id.clone()
        };

        let mut state = self.state.write().await;
        let notes = state
            .notes
            .get_mut(&notebook.id)
            .ok_or_else(|| StoreError::NotebookNotFound(notebook.id.clone()))?;
        let stored = notes
            .iter_mut()
            .find(|stored| stored.id == note.id)
            .ok_or_else(|| StoreError::NoteNotFound(note.id.clone()))?;

        *stored = Note::new(id, content, Utc::now());
        Ok(stored.clone())
    }

    async fn remove_note(&self, notebook: &Notebook, note: &Note) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let notes = state
            .notes
            .get_mut(&notebook.id)
            .ok_or_else(|| StoreError::NotebookNotFound(notebook.id.clone()))?;

        let before = notes.len();
        notes.retain(|stored| stored.id != note.id);
        if notes.len() == before {
            return Err(StoreError::NoteNotFound(note.id.clone()));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
