//! NOTES command - List the notes of a notebook, most recent first.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use notebook_app::notebook_core::Notebook;
use serde::Serialize;

use super::{Context, HumanReadable, NoteView, format_timestamp, output, truncate};

/// Arguments for the notes command.
#[derive(Args)]
pub struct NotesArgs {
    /// Notebook id or name (default: the first notebook)
    #[arg(long, short = 'n')]
    pub notebook: Option<String>,

    /// Only show notes containing this text (case-insensitive)
    #[arg(long, short = 's')]
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoteList {
    pub notebook: Notebook,
    pub notes: Vec<NoteView>,
}

impl HumanReadable for NoteList {
    fn print_human(&self) {
        println!(
            "{} {}",
            "Notes in".green().bold(),
            self.notebook.name.green().bold()
        );
        println!("{}", "=".repeat(80));
        println!();

        if self.notes.is_empty() {
            println!("  {}", "(No notes)".dimmed());
            return;
        }

        for note in &self.notes {
            println!("  {}", truncate(&note.title, 60).bold());
            println!(
                "    {} {}  {}",
                "ID:".cyan(),
                note.id,
                format_timestamp(&note.date).dimmed()
            );
        }
        println!();
        println!("{} note(s)", self.notes.len());
    }
}

/// Execute the notes command.
pub async fn execute(ctx: &Context, args: NotesArgs) -> Result<()> {
    let session = ctx.connect().await?;
    let notebook = session.open_notebook(args.notebook.as_deref()).await?;

    let notes = match args.search {
        Some(query) => session.controller.search(&query).await?,
        None => session.controller.notes().await,
    };

    let list = NoteList {
        notebook,
        notes: notes.iter().map(NoteView::from).collect(),
    };
    output(&list, ctx.human)
}
