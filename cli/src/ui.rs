//! Terminal rendering of controller output.

use colored::Colorize;
use notebook_app::notebook_store::BackendDescriptor;
use notebook_app::{AppBus, AppEvent, EventName, Ui};
use serde::Serialize;

use crate::commands::{HumanReadable, output};

/// Renders the connection chooser as a backend listing.
pub struct TerminalUi {
    human: bool,
}

impl TerminalUi {
    pub fn new(human: bool) -> Self {
        Self { human }
    }
}

impl Ui for TerminalUi {
    fn show_connection_chooser(&self, backends: &[&'static BackendDescriptor]) {
        let listing = BackendList::from(backends);
        if let Err(e) = output(&listing, self.human) {
            tracing::error!(error = %e, "Could not print backend list");
        }
    }
}

/// Trace every state change the controller publishes.
pub fn watch(bus: &AppBus) {
    for name in [
        EventName::NotebooksChanged,
        EventName::NotebookSelected,
        EventName::NotesChanged,
        EventName::NoteSelected,
        EventName::ActionFailed,
    ] {
        bus.subscribe(name, |event| {
            match event {
                AppEvent::NotebooksChanged(notebooks) => {
                    tracing::debug!(count = notebooks.len(), "Notebooks changed");
                }
                AppEvent::NotebookSelected(notebook) => {
                    tracing::debug!(notebook_id = %notebook.id, "Notebook selected");
                }
                AppEvent::NotesChanged(notes) => {
                    tracing::debug!(count = notes.len(), "Notes changed");
                }
                AppEvent::NoteSelected(note) => {
                    tracing::debug!(note_id = %note.id, "Note selected");
                }
                AppEvent::ActionFailed { event, message } => {
                    tracing::warn!(event = %event, message = %message, "Action failed");
                }
                _ => {}
            }
            Ok(())
        });
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendList {
    pub backends: Vec<BackendSummary>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendSummary {
    pub kind: &'static str,
    pub display_name: &'static str,
    pub required_options: Vec<OptionSummary>,
}

#[derive(Debug, Serialize)]
pub struct OptionSummary {
    pub name: &'static str,
    pub title: &'static str,
    pub optional: bool,
}

impl From<&[&'static BackendDescriptor]> for BackendList {
    fn from(descriptors: &[&'static BackendDescriptor]) -> Self {
        let backends = descriptors
            .iter()
            .map(|d| BackendSummary {
                kind: d.kind,
                display_name: d.display_name,
                required_options: d
                    .required_options
                    .iter()
                    .map(|o| OptionSummary {
                        name: o.name,
                        title: o.title,
                        optional: o.optional,
                    })
                    .collect(),
            })
            .collect();
        Self { backends }
    }
}

impl HumanReadable for BackendList {
    fn print_human(&self) {
        println!("{}", "Available Backends".green().bold());
        println!("{}", "=".repeat(60));
        println!();

        for backend in &self.backends {
            println!("  {} {}", backend.display_name.bold(), format!("({})", backend.kind).dimmed());
            if backend.required_options.is_empty() {
                println!("    {}", "(no options required)".dimmed());
            }
            for option in &backend.required_options {
                let marker = if option.optional { " (optional)".dimmed() } else { "".normal() };
                println!("    {} {}{}", format!("{}:", option.name).cyan(), option.title, marker);
            }
        }
    }
}
