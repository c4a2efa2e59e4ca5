//! notebook-core: Core types and primitives for the notebook client
//!
//! This crate provides:
//! - Domain types (Notebook, Note and their identifiers)
//! - Canonical note list helpers (sorting, searching, titles)
//! - The synchronous event bus connecting the UI layer to the controller

pub mod bus;
pub mod types;

// Re-export commonly used types at crate root for convenience
pub use bus::{DispatchError, Event, EventBus, HandlerError, HandlerResult, Subscription};
pub use types::{Note, NoteId, Notebook, NotebookId, filter_notes, note_title, sort_notes};
