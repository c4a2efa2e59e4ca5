//! Command implementations for the notebook CLI.
//!
//! Each command module provides:
//! - Args struct for clap argument parsing
//! - execute() function that performs the command
//! - Human-readable and JSON output formatting

pub mod backends;
pub mod create;
pub mod notebooks;
pub mod notes;
pub mod profile;
pub mod remove;
pub mod update;
pub mod whoami;

use std::sync::Arc;

use anyhow::{Context as _, Result, anyhow};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use notebook_app::notebook_core::{Note, Notebook, note_title};
use notebook_app::notebook_store::{BackendOptions, BackendRegistry, gitlab};
use notebook_app::{AppBus, ClientConfig, Controller, ProfileStore};
use serde::Serialize;

use crate::ui::{self, TerminalUi};

/// How to reach a storage backend.
#[derive(Args, Debug, Clone)]
pub struct ConnectionArgs {
    /// Storage backend kind
    #[arg(long, env = "NOTEBOOK_BACKEND", default_value = gitlab::KIND, global = true)]
    pub backend: String,

    /// Base URL of the remote host
    #[arg(long, env = "NOTEBOOK_URL", global = true)]
    pub url: Option<String>,

    /// Access token for the remote host
    #[arg(long, env = "NOTEBOOK_TOKEN", hide_env_values = true, global = true)]
    pub token: Option<String>,

    /// Use a saved connection profile instead of the flags above
    #[arg(long, env = "NOTEBOOK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Extra backend option as KEY=VALUE (repeatable)
    #[arg(long = "option", short = 'o', value_parser = parse_option, global = true)]
    pub options: Vec<(String, String)>,
}

fn parse_option(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("empty option name in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Shared state handed to every command.
pub struct Context {
    pub human: bool,
    pub registry: BackendRegistry,
    pub profiles: ProfileStore,
    pub connection: ConnectionArgs,
}

impl Context {
    pub fn new(human: bool, connection: ConnectionArgs, config: &ClientConfig) -> Self {
        Self {
            human,
            registry: BackendRegistry::with_defaults(),
            profiles: ProfileStore::new(config.profiles_path.clone()),
            connection,
        }
    }

    /// Backend kind and options from the flags alone.
    pub fn flag_options(&self) -> (String, BackendOptions) {
        let args = &self.connection;
        let mut options = BackendOptions::new();
        if let Some(url) = &args.url {
            options.insert(gitlab::OPTION_BASE_URL.to_string(), url.clone());
        }
        if let Some(token) = &args.token {
            options.insert(gitlab::OPTION_TOKEN.to_string(), token.clone());
        }
        options.extend(args.options.iter().cloned());
        (args.backend.clone(), options)
    }

    /// Backend kind and options, from the selected profile or the flags.
    ///
    /// `-o` options are applied on top of a profile.
    pub fn resolve(&self) -> Result<(String, BackendOptions)> {
        match &self.connection.profile {
            Some(name) => {
                let profile = self.profiles.find(name)?;
                let mut options = profile.options;
                options.extend(self.connection.options.iter().cloned());
                Ok((profile.backend_kind, options))
            }
            None => Ok(self.flag_options()),
        }
    }

    /// A controller driven by this terminal.
    pub fn controller(&self) -> Controller {
        let bus = Arc::new(AppBus::new());
        ui::watch(&bus);
        Controller::new(
            bus,
            Arc::new(TerminalUi::new(self.human)),
            self.registry.clone(),
        )
    }

    /// Authorize the configured backend and load its notebooks.
    pub async fn connect(&self) -> Result<Session> {
        let (kind, options) = self.resolve()?;
        let controller = self.controller();
        let backend = controller.authorize_backend(&kind, &options).await?;
        let notebooks = controller.connected(backend).await?;
        Ok(Session {
            controller,
            notebooks,
        })
    }
}

/// A connected controller and the notebooks it found.
pub struct Session {
    pub controller: Controller,
    pub notebooks: Vec<Notebook>,
}

impl Session {
    /// Select the notebook whose id or name is `selector`, or the first one.
    pub async fn open_notebook(&self, selector: Option<&str>) -> Result<Notebook> {
        let notebook = match selector {
            Some(wanted) => self
                .notebooks
                .iter()
                .find(|n| n.id.as_str() == wanted)
                .or_else(|| self.notebooks.iter().find(|n| n.name == wanted))
                .ok_or_else(|| anyhow!("Notebook not found: {wanted}"))?,
            None => self
                .notebooks
                .first()
                .ok_or_else(|| anyhow!("The backend has no notebooks"))?,
        };

        self.controller
            .select_notebook(notebook.clone())
            .await
            .with_context(|| format!("Loading notebook '{}'", notebook.name))?;
        Ok(notebook.clone())
    }

    /// The note called `id` in the current notebook.
    pub async fn find_note(&self, id: &str) -> Result<Note> {
        self.controller
            .notes()
            .await
            .into_iter()
            .find(|n| n.id.as_str() == id)
            .ok_or_else(|| anyhow!("Note not found: {id}"))
    }
}

/// Print output in JSON or human-readable format.
pub fn output<T: Serialize + HumanReadable>(value: &T, human: bool) -> Result<()> {
    if human {
        value.print_human();
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

/// Trait for types that can be printed in human-readable format.
pub trait HumanReadable {
    fn print_human(&self);
}

/// A note as printed by commands.
#[derive(Debug, Serialize)]
pub struct NoteView {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    pub content: String,
}

impl From<&Note> for NoteView {
    fn from(note: &Note) -> Self {
        Self {
            id: note.id.to_string(),
            title: note_title(note),
            date: note.date,
            content: note.content.clone(),
        }
    }
}

impl HumanReadable for NoteView {
    fn print_human(&self) {
        println!("  {} {}", "ID:".cyan(), self.id);
        println!("  {} {}", "Title:".cyan(), self.title);
        println!("  {} {}", "Date:".cyan(), format_timestamp(&self.date));
        if !self.content.is_empty() {
            println!();
            println!("{}", self.content);
        }
    }
}

/// Format a timestamp for human display.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Truncate a string for display, adding ellipsis if needed.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
