//! PROFILE command - Manage saved connection profiles.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::{Args, Subcommand};
use colored::Colorize;
use notebook_app::SavedConnectionProfile;
use notebook_app::notebook_store::gitlab;
use serde::Serialize;

use super::{Context, HumanReadable, output};

const MASK: &str = "********";

/// Arguments for the profile command.
#[derive(Args)]
pub struct ProfileArgs {
    #[command(subcommand)]
    pub command: ProfileCommand,
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Save the current connection flags as a profile
    Save {
        /// Profile name (default: the backend's label for the connection)
        #[arg(long)]
        name: Option<String>,
    },

    /// List saved profiles
    List,

    /// Remove a saved profile
    Remove {
        /// Profile name
        name: String,
    },
}

/// A profile as printed, with secrets masked.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub name: String,
    pub backend_kind: String,
    pub options: BTreeMap<String, String>,
}

impl From<&SavedConnectionProfile> for ProfileView {
    fn from(profile: &SavedConnectionProfile) -> Self {
        let options = profile
            .options
            .iter()
            .map(|(key, value)| {
                let shown = if key == gitlab::OPTION_TOKEN {
                    MASK.to_string()
                } else {
                    value.clone()
                };
                (key.clone(), shown)
            })
            .collect();
        Self {
            name: profile.name.clone(),
            backend_kind: profile.backend_kind.clone(),
            options,
        }
    }
}

impl HumanReadable for ProfileView {
    fn print_human(&self) {
        println!("  {} {}", self.name.bold(), format!("({})", self.backend_kind).dimmed());
        for (key, value) in &self.options {
            println!("    {} {}", format!("{key}:").cyan(), value);
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileList {
    pub profiles: Vec<ProfileView>,
}

impl HumanReadable for ProfileList {
    fn print_human(&self) {
        println!("{}", "Saved Profiles".green().bold());
        println!("{}", "=".repeat(60));
        println!();

        if self.profiles.is_empty() {
            println!("  {}", "(No saved profiles)".dimmed());
            return;
        }
        for profile in &self.profiles {
            profile.print_human();
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileRemoved {
    pub name: String,
    pub message: String,
}

impl HumanReadable for ProfileRemoved {
    fn print_human(&self) {
        println!("{} {}", "Removed profile".green().bold(), self.name.bold());
    }
}

/// Execute the profile command.
pub async fn execute(ctx: &Context, args: ProfileArgs) -> Result<()> {
    match args.command {
        ProfileCommand::Save { name } => {
            let (kind, options) = ctx.flag_options();
            let descriptor = ctx
                .registry
                .get(&kind)
                .ok_or_else(|| anyhow::anyhow!("Unknown backend: {kind}"))?;
            if let Some(missing) = descriptor.missing_options(&options).first() {
                anyhow::bail!("Option '{missing}' is required to save a {} profile", descriptor.display_name);
            }

            let mut profile = SavedConnectionProfile::labelled(&ctx.registry, &kind, options);
            if let Some(name) = name {
                profile.name = name;
            }
            ctx.profiles.upsert(profile.clone())?;
            tracing::info!(profile = %profile.name, path = %ctx.profiles.path().display(), "Profile saved");

            if ctx.human {
                println!("{}", "Profile saved successfully!".green().bold());
                println!();
            }
            output(&ProfileView::from(&profile), ctx.human)
        }
        ProfileCommand::List => {
            let profiles = ctx.profiles.load()?;
            let list = ProfileList {
                profiles: profiles.iter().map(ProfileView::from).collect(),
            };
            output(&list, ctx.human)
        }
        ProfileCommand::Remove { name } => {
            let removed = ctx.profiles.remove(&name)?;
            output(
                &ProfileRemoved {
                    name: removed.name,
                    message: "Profile removed".to_string(),
                },
                ctx.human,
            )
        }
    }
}
