//! REMOVE command - Delete a note.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{Context, HumanReadable, output};

/// Arguments for the remove command.
#[derive(Args)]
pub struct RemoveArgs {
    /// Note id (its path in the repository)
    pub id: String,

    /// Notebook id or name (default: the first notebook)
    #[arg(long, short = 'n')]
    pub notebook: Option<String>,

    /// Skip confirmation prompt (for non-interactive use)
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    pub id: String,
    pub message: String,
}

impl HumanReadable for RemoveResponse {
    fn print_human(&self) {
        println!("{}", "Note removed successfully!".green().bold());
        println!();
        println!("  {} {}", "ID:".cyan(), self.id);
    }
}

/// Execute the remove command.
pub async fn execute(ctx: &Context, args: RemoveArgs) -> Result<()> {
    // Confirmation prompt for interactive use
    if ctx.human && !args.yes {
        eprint!(
            "{} Are you sure you want to remove note {}? [y/N] ",
            "Warning:".yellow().bold(),
            args.id
        );

        use std::io::Write;
        std::io::stderr().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            eprintln!("Aborted.");
            return Ok(());
        }
    }

    let session = ctx.connect().await?;
    session.open_notebook(args.notebook.as_deref()).await?;
    let note = session.find_note(&args.id).await?;

    session.controller.remove_note(&note).await?;

    let response = RemoveResponse {
        id: note.id.to_string(),
        message: "Note removed".to_string(),
    };
    output(&response, ctx.human)
}
