//! Command-line client for notebooks stored in a git hosting service.
//!
//! This CLI tool provides commands for all notebook operations:
//! - backends: List the storage backends available
//! - profile: Save, list and remove connection profiles
//! - whoami: Show the authorized account
//! - notebooks: List notebooks (repositories)
//! - notes: List or search the notes of a notebook
//! - create: Create an empty note
//! - update: Replace the content of a note
//! - remove: Delete a note
//!
//! Configuration via environment:
//! - NOTEBOOK_BACKEND: Storage backend kind (default: gitlab)
//! - NOTEBOOK_URL: Base URL of the remote host
//! - NOTEBOOK_TOKEN: Personal access token
//! - NOTEBOOK_PROFILE: Saved connection profile to use
//! - NOTEBOOK_PROFILES: Profiles file (default: ~/.notebook-profiles.json)
//! - LOG_LEVEL: Logging level, overridden by RUST_LOG (default: warn)

mod commands;
mod ui;

use clap::{Parser, Subcommand};
use notebook_app::ClientConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use commands::{
    ConnectionArgs, Context, backends::BackendsArgs, create::CreateArgs,
    notebooks::NotebooksArgs, notes::NotesArgs, profile::ProfileArgs, remove::RemoveArgs,
    update::UpdateArgs, whoami::WhoamiArgs,
};

/// Git-backed notebook CLI
///
/// Keep notes as markdown files in repositories of a git hosting service.
/// Prints JSON by default; use --human for formatted output.
#[derive(Parser)]
#[command(name = "notebook")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output human-readable formatted text instead of JSON
    #[arg(long, global = true)]
    human: bool,

    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the storage backends available
    Backends(BackendsArgs),

    /// Manage saved connection profiles
    Profile(ProfileArgs),

    /// Show the account the backend is authorized as
    Whoami(WhoamiArgs),

    /// List notebooks
    Notebooks(NotebooksArgs),

    /// List or search the notes of a notebook
    Notes(NotesArgs),

    /// Create an empty note
    Create(CreateArgs),

    /// Replace the content of a note
    Update(UpdateArgs),

    /// Remove a note
    Remove(RemoveArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&config.log_level);
    tracing::debug!(profiles = %config.profiles_path.display(), "Configuration loaded");

    let ctx = Context::new(cli.human, cli.connection, &config);

    let result = match cli.command {
        Commands::Backends(args) => commands::backends::execute(&ctx, args).await,
        Commands::Profile(args) => commands::profile::execute(&ctx, args).await,
        Commands::Whoami(args) => commands::whoami::execute(&ctx, args).await,
        Commands::Notebooks(args) => commands::notebooks::execute(&ctx, args).await,
        Commands::Notes(args) => commands::notes::execute(&ctx, args).await,
        Commands::Create(args) => commands::create::execute(&ctx, args).await,
        Commands::Update(args) => commands::update::execute(&ctx, args).await,
        Commands::Remove(args) => commands::remove::execute(&ctx, args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Initialize the tracing subscriber on stderr, keeping stdout for output.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
