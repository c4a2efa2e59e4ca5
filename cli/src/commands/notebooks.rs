//! NOTEBOOKS command - List the notebooks of the connected account.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use notebook_app::notebook_core::Notebook;
use serde::Serialize;

use super::{Context, HumanReadable, output};

/// Arguments for the notebooks command.
#[derive(Args)]
pub struct NotebooksArgs {
    // No additional arguments needed
}

#[derive(Debug, Serialize)]
pub struct NotebookList {
    pub notebooks: Vec<Notebook>,
}

impl HumanReadable for NotebookList {
    fn print_human(&self) {
        println!("{}", "Notebooks".green().bold());
        println!("{}", "=".repeat(60));
        println!();

        if self.notebooks.is_empty() {
            println!("  {}", "(No notebooks)".dimmed());
            return;
        }

        for notebook in &self.notebooks {
            println!("  {} {}", notebook.name.bold(), format!("[{}]", notebook.id).dimmed());
        }
        println!();
        println!("{} notebook(s)", self.notebooks.len());
    }
}

/// Execute the notebooks command.
pub async fn execute(ctx: &Context, _args: NotebooksArgs) -> Result<()> {
    let session = ctx.connect().await?;
    output(
        &NotebookList {
            notebooks: session.notebooks,
        },
        ctx.human,
    )
}
