//! WHOAMI command - Show the account the backend is authorized as.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{Context, HumanReadable, output};

/// Arguments for the whoami command.
#[derive(Args)]
pub struct WhoamiArgs {
    // No additional arguments needed
}

#[derive(Debug, Serialize)]
pub struct WhoamiResponse {
    pub backend: String,
    pub username: String,
}

impl HumanReadable for WhoamiResponse {
    fn print_human(&self) {
        println!("{} {}", "Signed in as".green(), self.username.bold());
        println!("  {} {}", "Backend:".cyan(), self.backend);
    }
}

/// Execute the whoami command.
pub async fn execute(ctx: &Context, _args: WhoamiArgs) -> Result<()> {
    let session = ctx.connect().await?;
    let backend = session
        .controller
        .backend()
        .await
        .ok_or_else(|| anyhow!("No backend connected"))?;

    let response = WhoamiResponse {
        backend: backend.descriptor().display_name.to_string(),
        username: backend.username().await?,
    };

    output(&response, ctx.human)
}
