//! UPDATE command - Replace the content of a note.

use std::io::Read;

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{Context, HumanReadable, NoteView, output};

/// Arguments for the update command.
#[derive(Args)]
pub struct UpdateArgs {
    /// Note id (its path in the repository)
    pub id: String,

    /// New content: literal text, @FILE to read a file, or - for stdin
    #[arg(long, short = 'c')]
    pub content: String,

    /// Notebook id or name (default: the first notebook)
    #[arg(long, short = 'n')]
    pub notebook: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub previous_id: String,
    pub note: NoteView,
}

impl HumanReadable for UpdateResponse {
    fn print_human(&self) {
        println!("{}", "Note updated successfully!".green().bold());
        println!();
        if self.previous_id != self.note.id {
            println!("  {} {}", "Previous ID:".cyan(), self.previous_id);
        }
        self.note.print_human();
    }
}

/// Resolve the `--content` argument to the text it designates.
pub fn read_content(raw: &str) -> Result<String> {
    if raw == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Reading content from stdin")?;
        Ok(content)
    } else if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("Reading content from {path}"))
    } else {
        Ok(raw.to_string())
    }
}

/// Execute the update command.
pub async fn execute(ctx: &Context, args: UpdateArgs) -> Result<()> {
    let content = read_content(&args.content)?;

    let session = ctx.connect().await?;
    session.open_notebook(args.notebook.as_deref()).await?;
    let note = session.find_note(&args.id).await?;

    let updated = session.controller.update_note(&note, &content).await?;

    let response = UpdateResponse {
        previous_id: note.id.to_string(),
        note: NoteView::from(&updated),
    };
    output(&response, ctx.human)
}
