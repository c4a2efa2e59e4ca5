//! CREATE command - Create an empty note in a notebook.

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use super::{Context, NoteView, output};

/// Arguments for the create command.
#[derive(Args)]
pub struct CreateArgs {
    /// Notebook id or name (default: the first notebook)
    #[arg(long, short = 'n')]
    pub notebook: Option<String>,
}

/// Execute the create command.
pub async fn execute(ctx: &Context, args: CreateArgs) -> Result<()> {
    let session = ctx.connect().await?;
    let notebook = session.open_notebook(args.notebook.as_deref()).await?;

    let note = session.controller.create_note().await?;
    tracing::info!(notebook_id = %notebook.id, note_id = %note.id, "Note created");

    if ctx.human {
        println!("{}", "Note created successfully!".green().bold());
        println!();
    }
    output(&NoteView::from(&note), ctx.human)
}
