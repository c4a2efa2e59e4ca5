//! Application state controller.
//!
//! The controller owns the active backend, the current notebook and the
//! canonical note list. It reacts to intent events from the UI layer, calls
//! the backend and republishes the resulting state on the bus. State is only
//! replaced once a backend call has succeeded; nothing is applied
//! speculatively.
//!
//! # Ordering
//!
//! Reactions are asynchronous. Two mutations issued back to back both read
//! the current notebook when they start but apply their result to the note
//! list in completion order, which may differ from issue order. Each
//! `NotebookSelected` starts a new epoch and a notebook load whose epoch is
//! no longer current is dropped. A mutation result is applied as long as its
//! backend and notebook are still the current ones, so re-selecting the same
//! notebook does not lose it.

use std::fmt;
use std::sync::{Arc, Weak};

use notebook_core::{Event, Note, Notebook, Subscription, filter_notes, sort_notes};
use notebook_store::{BackendDescriptor, BackendOptions, BackendRegistry, StorageBackend};
use tokio::runtime::Handle;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::events::{AppBus, AppEvent, EventName};

/// Intents whose reactions call the backend and therefore run as tasks.
const ASYNC_REACTIONS: [EventName; 6] = [
    EventName::Connected,
    EventName::NotebookSelected,
    EventName::CreateNote,
    EventName::UpdateNote,
    EventName::RemoveNote,
    EventName::SearchNote,
];

/// Rendering hooks the controller calls directly.
pub trait Ui: Send + Sync {
    /// Show the list of backends the user can connect with.
    fn show_connection_chooser(&self, backends: &[&'static BackendDescriptor]);
}

#[derive(Debug, Default)]
struct State {
    backend: Option<Arc<dyn StorageBackend>>,
    notebook: Option<Notebook>,
    notes: Vec<Note>,
    epoch: u64,
}

struct Inner {
    bus: Arc<AppBus>,
    ui: Arc<dyn Ui>,
    registry: BackendRegistry,
    state: RwLock<State>,
}

/// The single owner of application state.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    /// Create a controller publishing on `bus`.
    pub fn new(bus: Arc<AppBus>, ui: Arc<dyn Ui>, registry: BackendRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                ui,
                registry,
                state: RwLock::new(State::default()),
            }),
        }
    }

    /// The bus this controller publishes on.
    pub fn bus(&self) -> &Arc<AppBus> {
        &self.inner.bus
    }

    /// Backends available for connection.
    pub fn registry(&self) -> &BackendRegistry {
        &self.inner.registry
    }

    /// Subscribe the reaction table to the bus.
    ///
    /// Call once, from within a tokio runtime. Reactions that reach the
    /// backend are spawned on that runtime; their failures are published as
    /// [`AppEvent::ActionFailed`].
    pub fn bind(&self) -> AppResult<Vec<Subscription>> {
        let runtime = Handle::try_current().map_err(|_| AppError::NoRuntime)?;
        let bus = &self.inner.bus;
        let mut subscriptions = Vec::with_capacity(ASYNC_REACTIONS.len() + 1);

        let weak = Arc::downgrade(&self.inner);
        subscriptions.push(bus.subscribe(EventName::Ready, move |_| {
            if let Some(controller) = upgrade(&weak) {
                controller.ready();
            }
            Ok(())
        }));

        for name in ASYNC_REACTIONS {
            let weak = Arc::downgrade(&self.inner);
            let runtime = runtime.clone();
            subscriptions.push(bus.subscribe(name, move |event| {
                if let Some(controller) = upgrade(&weak) {
                    let event = event.clone();
                    runtime.spawn(async move { controller.react(event).await });
                }
                Ok(())
            }));
        }

        tracing::debug!(handlers = subscriptions.len(), "Controller bound to event bus");
        Ok(subscriptions)
    }

    /// Run the reaction for `event` to completion.
    ///
    /// State-change events have no reaction and return immediately.
    pub async fn handle(&self, event: &AppEvent) -> AppResult<()> {
        match event {
            AppEvent::Ready => self.ready(),
            AppEvent::Connected(backend) => {
                self.connected(Arc::clone(backend)).await?;
            }
            AppEvent::NotebookSelected(notebook) => {
                self.select_notebook(notebook.clone()).await?;
            }
            AppEvent::CreateNote => {
                self.create_note().await?;
            }
            AppEvent::UpdateNote { note, content } => {
                self.update_note(note, content).await?;
            }
            AppEvent::RemoveNote(note) => self.remove_note(note).await?,
            AppEvent::SearchNote(query) => {
                self.search(query).await?;
            }
            AppEvent::NotebooksChanged(_)
            | AppEvent::NotesChanged(_)
            | AppEvent::NoteSelected(_)
            | AppEvent::ActionFailed { .. } => {}
        }
        Ok(())
    }

    /// Construct the backend `kind` from `options` and authorize it.
    ///
    /// The caller announces it with [`AppEvent::Connected`].
    pub async fn authorize_backend(
        &self,
        kind: &str,
        options: &BackendOptions,
    ) -> AppResult<Arc<dyn StorageBackend>> {
        let backend = self.inner.registry.connect(kind, options)?;
        backend.authorize().await?;
        tracing::info!(kind, "Backend authorized");
        Ok(backend)
    }

    // ========================================================================
    // Reactions
    // ========================================================================

    /// Ask the UI layer to render the connection chooser.
    pub fn ready(&self) {
        self.inner
            .ui
            .show_connection_chooser(self.inner.registry.descriptors());
    }

    /// Make `backend` active and load its notebooks.
    ///
    /// Emits `NotebooksChanged`, then `NotebookSelected` with the first
    /// notebook if there is one.
    pub async fn connected(&self, backend: Arc<dyn StorageBackend>) -> AppResult<Vec<Notebook>> {
        {
            let mut state = self.inner.state.write().await;
            state.backend = Some(Arc::clone(&backend));
            state.notebook = None;
            state.notes.clear();
            state.epoch += 1;
        }
        tracing::info!(kind = backend.descriptor().kind, "Storage backend connected");

        let notebooks = backend.notebooks().await?;

        let still_active = self
            .inner
            .state
            .read()
            .await
            .backend
            .as_ref()
            .is_some_and(|active| Arc::ptr_eq(active, &backend));
        if !still_active {
            tracing::debug!("Discarding notebooks of a replaced backend");
            return Ok(notebooks);
        }

        self.publish(AppEvent::NotebooksChanged(notebooks.clone()))?;
        if let Some(first) = notebooks.first() {
            self.publish(AppEvent::NotebookSelected(first.clone()))?;
        }
        Ok(notebooks)
    }

    /// Make `notebook` current and load its notes, most recent first.
    ///
    /// Emits `NotesChanged`, then `NoteSelected` with the most recent note
    /// if the notebook has any.
    pub async fn select_notebook(&self, notebook: Notebook) -> AppResult<Vec<Note>> {
        let (backend, epoch) = {
            let mut state = self.inner.state.write().await;
            let backend = state.backend.clone().ok_or(AppError::NotConnected)?;
            state.notebook = Some(notebook.clone());
            state.epoch += 1;
            (backend, state.epoch)
        };

        let mut notes = backend.notes(&notebook).await?;
        sort_notes(&mut notes);

        {
            let mut state = self.inner.state.write().await;
            if state.epoch != epoch {
                tracing::debug!(
                    notebook_id = %notebook.id,
                    "Discarding notes of a notebook no longer selected"
                );
                return Ok(notes);
            }
            state.notes = notes.clone();
        }

        tracing::debug!(notebook_id = %notebook.id, notes = notes.len(), "Notebook loaded");
        self.publish(AppEvent::NotesChanged(notes.clone()))?;
        if let Some(latest) = notes.first() {
            self.publish(AppEvent::NoteSelected(latest.clone()))?;
        }
        Ok(notes)
    }

    /// Create an empty note in the current notebook and add it to the list.
    pub async fn create_note(&self) -> AppResult<Note> {
        let (backend, notebook) = self.context().await?;
        let note = backend.create_note(&notebook).await?;

        let created = note.clone();
        self.apply(&backend, &notebook, move |notes| {
            notes.retain(|n| n.id != created.id);
            notes.push(created);
        })
        .await?;
        Ok(note)
    }

    /// Persist `content` for `note` and swap the stored entry for the result.
    ///
    /// The old entry is removed by its id and the returned note inserted,
    /// so a backend that mints a new id on update is handled.
    pub async fn update_note(&self, note: &Note, content: &str) -> AppResult<Note> {
        let (backend, notebook) = self.context().await?;
        let updated = backend.update_note(&notebook, note, content).await?;

        let old_id = note.id.clone();
        let replacement = updated.clone();
        self.apply(&backend, &notebook, move |notes| {
            notes.retain(|n| n.id != old_id && n.id != replacement.id);
            notes.push(replacement);
        })
        .await?;
        Ok(updated)
    }

    /// Delete `note` and drop it from the list.
    pub async fn remove_note(&self, note: &Note) -> AppResult<()> {
        let (backend, notebook) = self.context().await?;
        backend.remove_note(&notebook, note).await?;

        let id = note.id.clone();
        self.apply(&backend, &notebook, move |notes| notes.retain(|n| n.id != id))
            .await?;
        Ok(())
    }

    /// Publish the notes matching `query`; an empty query publishes all.
    ///
    /// The canonical list is left untouched.
    pub async fn search(&self, query: &str) -> AppResult<Vec<Note>> {
        let found = {
            let state = self.inner.state.read().await;
            filter_notes(&state.notes, query)
        };
        self.publish(AppEvent::NotesChanged(found.clone()))?;
        Ok(found)
    }

    // ========================================================================
    // Read-only views
    // ========================================================================

    /// Snapshot of the canonical note list.
    pub async fn notes(&self) -> Vec<Note> {
        self.inner.state.read().await.notes.clone()
    }

    /// The current notebook.
    pub async fn current_notebook(&self) -> Option<Notebook> {
        self.inner.state.read().await.notebook.clone()
    }

    /// The active backend.
    pub async fn backend(&self) -> Option<Arc<dyn StorageBackend>> {
        self.inner.state.read().await.backend.clone()
    }

    // ========================================================================
    // Internals
    // ========================================================================

    async fn react(&self, event: AppEvent) {
        let name = event.name();
        if let Err(error) = self.handle(&event).await {
            tracing::warn!(event = %name, error = %error, "Reaction failed");
            let failure = AppEvent::ActionFailed {
                event: name,
                message: error.to_string(),
            };
            if let Err(error) = self.inner.bus.publish(&failure) {
                tracing::error!(event = %name, error = %error, "Could not report failed reaction");
            }
        }
    }

    async fn context(&self) -> AppResult<(Arc<dyn StorageBackend>, Notebook)> {
        let state = self.inner.state.read().await;
        let backend = state.backend.clone().ok_or(AppError::NotConnected)?;
        let notebook = state.notebook.clone().ok_or(AppError::NoNotebookSelected)?;
        Ok((backend, notebook))
    }

    /// Mutate, re-sort and publish the note list.
    ///
    /// Skipped when `backend` or `notebook` is no longer the current one.
    async fn apply<F>(
        &self,
        backend: &Arc<dyn StorageBackend>,
        notebook: &Notebook,
        mutate: F,
    ) -> AppResult<()>
    where
        F: FnOnce(&mut Vec<Note>),
    {
        let notes = {
            let mut state = self.inner.state.write().await;
            let same_backend = state
                .backend
                .as_ref()
                .is_some_and(|active| Arc::ptr_eq(active, backend));
            let same_notebook = state
                .notebook
                .as_ref()
                .is_some_and(|current| current.id == notebook.id);
            if !(same_backend && same_notebook) {
                tracing::debug!(
                    notebook_id = %notebook.id,
                    "Discarding result for a notebook no longer selected"
                );
                return Ok(());
            }
            mutate(&mut state.notes);
            sort_notes(&mut state.notes);
            state.notes.clone()
        };

        self.publish(AppEvent::NotesChanged(notes))?;
        Ok(())
    }

    fn publish(&self, event: AppEvent) -> AppResult<usize> {
        Ok(self.inner.bus.publish(&event)?)
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<Controller> {
    weak.upgrade().map(|inner| Controller { inner })
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use notebook_core::NotebookId;
    use notebook_store::{MemoryBackend, StoreResult};
    use tokio::sync::{Notify, mpsc};

    #[derive(Default)]
    struct RecordingUi {
        shown: Mutex<Vec<&'static str>>,
    }

    impl Ui for RecordingUi {
        fn show_connection_chooser(&self, backends: &[&'static BackendDescriptor]) {
            self.shown
                .lock()
                .unwrap()
                .extend(backends.iter().map(|b| b.kind));
        }
    }

    /// Every state-change event, in publish order.
    type Recorded = Arc<Mutex<Vec<AppEvent>>>;

    const OUTPUTS: [EventName; 5] = [
        EventName::NotebooksChanged,
        EventName::NotebookSelected,
        EventName::NotesChanged,
        EventName::NoteSelected,
        EventName::ActionFailed,
    ];

    fn record(bus: &AppBus) -> Recorded {
        let recorded: Recorded = Arc::default();
        for name in OUTPUTS {
            let recorded = Arc::clone(&recorded);
            bus.subscribe(name, move |event| {
                recorded.lock().unwrap().push(event.clone());
                Ok(())
            });
        }
        recorded
    }

    fn names(recorded: &Recorded) -> Vec<EventName> {
        recorded.lock().unwrap().iter().map(|e| e.name()).collect()
    }

    fn last_notes(recorded: &Recorded) -> Vec<Note> {
        recorded
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|event| match event {
                AppEvent::NotesChanged(notes) => Some(notes.clone()),
                _ => None,
            })
            .expect("no NotesChanged published")
    }

    /// Forwards state-change events to a channel for awaiting bound reactions.
    fn stream(bus: &AppBus) -> mpsc::UnboundedReceiver<AppEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        for name in OUTPUTS {
            let tx = tx.clone();
            bus.subscribe(name, move |event| {
                let _ = tx.send(event.clone());
                Ok(())
            });
        }
        rx
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<AppEvent>, name: EventName) -> AppEvent {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = rx.recv().await.expect("bus closed");
                if event.name() == name {
                    return event;
                }
            }
        })
        .await
        .expect("timed out waiting for event")
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()
    }

    async fn seeded_backend() -> Arc<MemoryBackend> {
        let backend = MemoryBackend::with_notebooks("alice", ["journal", "empty"]);
        let journal = NotebookId::from("1");
        backend
            .insert_note(&journal, Note::new("a.md", "Hello", at(1)))
            .await
            .unwrap();
        backend
            .insert_note(&journal, Note::new("b.md", "world", at(3)))
            .await
            .unwrap();
        backend
            .insert_note(&journal, Note::new("c.md", "HELLO there", at(2)))
            .await
            .unwrap();
        Arc::new(backend)
    }

    fn controller() -> (Controller, Arc<RecordingUi>) {
        let ui = Arc::new(RecordingUi::default());
        let controller = Controller::new(
            Arc::new(AppBus::new()),
            ui.clone(),
            BackendRegistry::with_defaults(),
        );
        (controller, ui)
    }

    /// Controller connected to the seeded backend with "journal" selected.
    async fn journal_controller() -> (Controller, Recorded) {
        let (controller, _) = controller();
        let backend: Arc<dyn StorageBackend> = seeded_backend().await;
        controller.connected(backend).await.unwrap();
        controller
            .select_notebook(Notebook::new("1", "journal"))
            .await
            .unwrap();
        let recorded = record(controller.bus());
        (controller, recorded)
    }

    fn ids(notes: &[Note]) -> Vec<&str> {
        notes.iter().map(|n| n.id.as_str()).collect()
    }

    #[tokio::test]
    async fn ready_shows_connection_chooser() {
        let (controller, ui) = controller();
        controller.handle(&AppEvent::Ready).await.unwrap();
        assert_eq!(*ui.shown.lock().unwrap(), vec!["gitlab", "memory"]);
    }

    #[tokio::test]
    async fn connected_lists_notebooks_then_selects_first() {
        let (controller, _) = controller();
        let recorded = record(controller.bus());

        controller
            .handle(&AppEvent::Connected(seeded_backend().await))
            .await
            .unwrap();

        assert_eq!(
            names(&recorded),
            vec![EventName::NotebooksChanged, EventName::NotebookSelected]
        );
        match &recorded.lock().unwrap()[1] {
            AppEvent::NotebookSelected(notebook) => assert_eq!(notebook.name, "journal"),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(controller.backend().await.is_some());
    }

    #[tokio::test]
    async fn connected_without_notebooks_selects_nothing() {
        let (controller, _) = controller();
        let recorded = record(controller.bus());

        controller
            .handle(&AppEvent::Connected(Arc::new(MemoryBackend::new("bob"))))
            .await
            .unwrap();

        assert_eq!(names(&recorded), vec![EventName::NotebooksChanged]);
    }

    #[tokio::test]
    async fn selecting_notebook_publishes_sorted_notes_and_latest() {
        let (controller, _) = controller();
        controller.connected(seeded_backend().await).await.unwrap();
        let recorded = record(controller.bus());

        controller
            .handle(&AppEvent::NotebookSelected(Notebook::new("1", "journal")))
            .await
            .unwrap();

        assert_eq!(
            names(&recorded),
            vec![EventName::NotesChanged, EventName::NoteSelected]
        );
        assert_eq!(ids(&last_notes(&recorded)), vec!["b.md", "c.md", "a.md"]);
        match &recorded.lock().unwrap()[1] {
            AppEvent::NoteSelected(note) => assert_eq!(note.id.as_str(), "b.md"),
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(controller.current_notebook().await.unwrap().name, "journal");
    }

    #[tokio::test]
    async fn selecting_empty_notebook_selects_no_note() {
        let (controller, _) = controller();
        controller.connected(seeded_backend().await).await.unwrap();
        let recorded = record(controller.bus());

        controller
            .handle(&AppEvent::NotebookSelected(Notebook::new("2", "empty")))
            .await
            .unwrap();

        assert_eq!(names(&recorded), vec![EventName::NotesChanged]);
        assert!(last_notes(&recorded).is_empty());
    }

    #[tokio::test]
    async fn selecting_without_backend_fails() {
        let (controller, _) = controller();
        let err = controller
            .handle(&AppEvent::NotebookSelected(Notebook::new("1", "journal")))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotConnected));
    }

    #[tokio::test]
    async fn mutation_without_notebook_fails() {
        let (controller, _) = controller();
        controller
            .connected(Arc::new(MemoryBackend::new("bob")))
            .await
            .unwrap();

        let err = controller.handle(&AppEvent::CreateNote).await.unwrap_err();
        assert!(matches!(err, AppError::NoNotebookSelected));
    }

    #[tokio::test]
    async fn gitlab_without_token_requires_authorization() {
        let (controller, _) = controller();
        let mut options = BackendOptions::new();
        options.insert("baseUrl".into(), "https://git.example.com".into());

        let err = controller
            .authorize_backend("gitlab", &options)
            .await
            .unwrap_err();

        assert_eq!(err.code(), "AUTHORIZATION_REQUIRED");
        match err {
            AppError::Store(notebook_store::StoreError::AuthorizationRequired { authorize_url }) => {
                assert!(authorize_url.starts_with("https://git.example.com/oauth/authorize?"));
                assert!(authorize_url.contains("response_type=code"));
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(controller.backend().await.is_none());
    }

    #[tokio::test]
    async fn create_adds_unique_note_first() {
        let (controller, recorded) = journal_controller().await;
        let before = controller.notes().await;

        let created = controller.create_note().await.unwrap();

        assert!(before.iter().all(|n| n.id != created.id));
        let notes = last_notes(&recorded);
        assert_eq!(notes.len(), before.len() + 1);
        assert_eq!(notes[0].id, created.id);
        assert_eq!(controller.notes().await, notes);
    }

    #[tokio::test]
    async fn update_replaces_entry_with_returned_note() {
        let (controller, recorded) = journal_controller().await;
        let target = controller.notes().await.pop().unwrap();

        controller
            .handle(&AppEvent::UpdateNote {
                note: target.clone(),
                content: "Hello again".into(),
            })
            .await
            .unwrap();

        let notes = last_notes(&recorded);
        assert_eq!(notes.len(), 3);
        assert_eq!(notes[0].id, target.id);
        assert_eq!(notes[0].content, "Hello again");
    }

    #[tokio::test]
    async fn update_handles_backend_minting_new_id() {
        let (controller, _) = controller();
        let backend = Arc::new(MemoryBackend::with_notebooks("alice", ["journal"]).renaming_on_update());
        controller.connected(backend).await.unwrap();
        controller
            .select_notebook(Notebook::new("1", "journal"))
            .await
            .unwrap();
        let original = controller.create_note().await.unwrap();

        let updated = controller.update_note(&original, "renamed").await.unwrap();

        assert_ne!(updated.id, original.id);
        assert_eq!(controller.notes().await, vec![updated]);
    }

    #[tokio::test]
    async fn remove_drops_note_from_list() {
        let (controller, recorded) = journal_controller().await;
        let target = controller.notes().await[1].clone();

        controller
            .handle(&AppEvent::RemoveNote(target.clone()))
            .await
            .unwrap();

        assert!(last_notes(&recorded).iter().all(|n| n.id != target.id));
        assert_eq!(controller.notes().await.len(), 2);
    }

    #[tokio::test]
    async fn failed_remove_leaves_list_untouched() {
        let (controller, recorded) = journal_controller().await;
        let ghost = Note::new("ghost.md", "", at(0));

        let err = controller.remove_note(&ghost).await.unwrap_err();

        assert!(matches!(err, AppError::Store(ref e) if e.is_not_found()));
        assert!(names(&recorded).is_empty());
        assert_eq!(controller.notes().await.len(), 3);
    }

    #[tokio::test]
    async fn search_filters_case_insensitively() {
        let (controller, recorded) = journal_controller().await;

        controller
            .handle(&AppEvent::SearchNote("hello".into()))
            .await
            .unwrap();
        assert_eq!(ids(&last_notes(&recorded)), vec!["c.md", "a.md"]);

        controller
            .handle(&AppEvent::SearchNote(String::new()))
            .await
            .unwrap();
        assert_eq!(ids(&last_notes(&recorded)), vec!["b.md", "c.md", "a.md"]);
        assert_eq!(controller.notes().await.len(), 3);
    }

    #[tokio::test]
    async fn subscriber_failure_surfaces_from_reaction() {
        let (controller, recorded) = journal_controller().await;
        controller
            .bus()
            .subscribe(EventName::NotesChanged, |_| Err("render failed".into()));

        let err = controller.create_note().await.unwrap_err();

        assert!(matches!(err, AppError::Dispatch(_)));
        // The list was committed before publishing.
        assert_eq!(controller.notes().await.len(), 4);
        assert_eq!(names(&recorded), vec![EventName::NotesChanged]);
    }

    #[tokio::test]
    async fn bound_controller_reacts_to_published_intents() {
        let (controller, _) = controller();
        controller.bind().unwrap();
        let mut events = stream(controller.bus());
        let bus = Arc::clone(controller.bus());

        bus.publish(&AppEvent::Connected(seeded_backend().await))
            .unwrap();

        let AppEvent::NotesChanged(notes) = next_event(&mut events, EventName::NotesChanged).await
        else {
            unreachable!()
        };
        assert_eq!(ids(&notes), vec!["b.md", "c.md", "a.md"]);
        next_event(&mut events, EventName::NoteSelected).await;

        bus.publish(&AppEvent::CreateNote).unwrap();
        let AppEvent::NotesChanged(notes) = next_event(&mut events, EventName::NotesChanged).await
        else {
            unreachable!()
        };
        assert_eq!(notes.len(), 4);
    }

    #[tokio::test]
    async fn bound_failures_are_published() {
        let (controller, _) = controller();
        controller.bind().unwrap();
        let mut events = stream(controller.bus());

        controller.bus().publish(&AppEvent::CreateNote).unwrap();

        match next_event(&mut events, EventName::ActionFailed).await {
            AppEvent::ActionFailed { event, message } => {
                assert_eq!(event, EventName::CreateNote);
                assert_eq!(message, AppError::NotConnected.to_string());
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn bind_requires_runtime() {
        let (controller, _) = controller();
        assert!(matches!(controller.bind(), Err(AppError::NoRuntime)));
    }

    // ------------------------------------------------------------------------
    // Interleaving
    // ------------------------------------------------------------------------

    /// Which call of a [`GatedBackend`] waits for `release`.
    #[derive(Debug, Clone, Copy)]
    enum Hold {
        /// `notes` of this notebook, before reading.
        Notes(&'static str),
        /// `update_note` of this note, before writing.
        Update(&'static str),
        /// `create_note`, after the note was stored.
        Create,
    }

    /// Memory backend with one call held open until released.
    #[derive(Debug)]
    struct GatedBackend {
        inner: MemoryBackend,
        hold: Hold,
        entered: Notify,
        release: Notify,
    }

    impl GatedBackend {
        async fn hold_until_released(&self) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }

    #[async_trait]
    impl StorageBackend for GatedBackend {
        fn descriptor(&self) -> &'static BackendDescriptor {
            self.inner.descriptor()
        }

        async fn authorize(&self) -> StoreResult<()> {
            self.inner.authorize().await
        }

        async fn username(&self) -> StoreResult<String> {
            self.inner.username().await
        }

        async fn notebooks(&self) -> StoreResult<Vec<Notebook>> {
            self.inner.notebooks().await
        }

        async fn notes(&self, notebook: &Notebook) -> StoreResult<Vec<Note>> {
            if matches!(self.hold, Hold::Notes(id) if id == notebook.id.as_str()) {
                self.hold_until_released().await;
            }
            self.inner.notes(notebook).await
        }

        async fn create_note(&self, notebook: &Notebook) -> StoreResult<Note> {
            let note = self.inner.create_note(notebook).await?;
            if matches!(self.hold, Hold::Create) {
                self.hold_until_released().await;
            }
            Ok(note)
        }

        async fn update_note(
            &self,
            notebook: &Notebook,
            note: &Note,
            content: &str,
        ) -> StoreResult<Note> {
            if matches!(self.hold, Hold::Update(id) if id == note.id.as_str()) {
                self.hold_until_released().await;
            }
            self.inner.update_note(notebook, note, content).await
        }

        async fn remove_note(&self, notebook: &Notebook, note: &Note) -> StoreResult<()> {
            self.inner.remove_note(notebook, note).await
        }
    }

    async fn gated(hold: Hold) -> Arc<GatedBackend> {
        let inner = MemoryBackend::with_notebooks("alice", ["journal", "work"]);
        inner
            .insert_note(&NotebookId::from("1"), Note::new("a.md", "journal a", at(1)))
            .await
            .unwrap();
        inner
            .insert_note(&NotebookId::from("1"), Note::new("b.md", "journal b", at(2)))
            .await
            .unwrap();
        inner
            .insert_note(&NotebookId::from("2"), Note::new("w.md", "work", at(5)))
            .await
            .unwrap();
        Arc::new(GatedBackend {
            inner,
            hold,
            entered: Notify::new(),
            release: Notify::new(),
        })
    }

    #[tokio::test]
    async fn stale_notebook_results_are_discarded() {
        let (controller, _) = controller();
        let backend = gated(Hold::Notes("1")).await;
        controller.connected(backend.clone()).await.unwrap();
        let recorded = record(controller.bus());

        let slow = tokio::spawn({
            let controller = controller.clone();
            async move {
                controller
                    .select_notebook(Notebook::new("1", "journal"))
                    .await
            }
        });
        backend.entered.notified().await;

        controller
            .select_notebook(Notebook::new("2", "work"))
            .await
            .unwrap();
        backend.release.notify_one();
        let late = slow.await.unwrap().unwrap();

        assert_eq!(late.len(), 2);
        assert_eq!(controller.current_notebook().await.unwrap().name, "work");
        assert_eq!(ids(&controller.notes().await), vec!["w.md"]);
        assert_eq!(
            names(&recorded),
            vec![EventName::NotesChanged, EventName::NoteSelected]
        );
    }

    #[tokio::test]
    async fn reselecting_current_notebook_keeps_pending_create() {
        let (controller, _) = controller();
        let backend = gated(Hold::Create).await;
        controller.connected(backend.clone()).await.unwrap();
        let journal = Notebook::new("1", "journal");
        controller.select_notebook(journal.clone()).await.unwrap();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.create_note().await }
        });
        backend.entered.notified().await;

        // The refresh already sees the stored note.
        let refreshed = controller.select_notebook(journal.clone()).await.unwrap();
        assert_eq!(refreshed.len(), 3);

        backend.release.notify_one();
        let created = pending.await.unwrap().unwrap();

        let notes = controller.notes().await;
        assert_eq!(notes.len(), 3);
        assert_eq!(notes.iter().filter(|n| n.id == created.id).count(), 1);
        assert_eq!(backend.inner.notes(&journal).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn create_for_previous_notebook_is_not_applied() {
        let (controller, _) = controller();
        let backend = gated(Hold::Create).await;
        controller.connected(backend.clone()).await.unwrap();
        controller
            .select_notebook(Notebook::new("1", "journal"))
            .await
            .unwrap();

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.create_note().await }
        });
        backend.entered.notified().await;

        controller
            .select_notebook(Notebook::new("2", "work"))
            .await
            .unwrap();
        backend.release.notify_one();
        pending.await.unwrap().unwrap();

        assert_eq!(ids(&controller.notes().await), vec!["w.md"]);
    }

    #[tokio::test]
    async fn concurrent_updates_apply_in_completion_order() {
        let (controller, _) = controller();
        let backend = gated(Hold::Update("a.md")).await;
        controller.connected(backend.clone()).await.unwrap();
        controller
            .select_notebook(Notebook::new("1", "journal"))
            .await
            .unwrap();
        let recorded = record(controller.bus());
        let notes = controller.notes().await;
        let (b, a) = (notes[0].clone(), notes[1].clone());

        // Issued first, completes last.
        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.update_note(&a, "first issued").await }
        });
        backend.entered.notified().await;

        controller.update_note(&b, "second issued").await.unwrap();
        backend.release.notify_one();
        first.await.unwrap().unwrap();

        let published: Vec<Vec<String>> = recorded
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                AppEvent::NotesChanged(notes) => {
                    Some(notes.iter().map(|n| n.content.clone()).collect())
                }
                _ => None,
            })
            .collect();
        assert_eq!(published.len(), 2);
        assert!(published[0].contains(&"second issued".to_string()));
        assert!(!published[0].contains(&"first issued".to_string()));
        assert!(published[1].contains(&"first issued".to_string()));
        assert_eq!(controller.notes().await.len(), 2);
    }
}
