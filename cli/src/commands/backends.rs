//! BACKENDS command - List the storage backends this client can connect to.

use anyhow::Result;
use clap::Args;
use notebook_app::AppEvent;

use super::Context;

/// Arguments for the backends command.
#[derive(Args)]
pub struct BackendsArgs {
    // No additional arguments needed
}

/// Execute the backends command.
pub async fn execute(ctx: &Context, _args: BackendsArgs) -> Result<()> {
    ctx.controller().handle(&AppEvent::Ready).await?;
    Ok(())
}
