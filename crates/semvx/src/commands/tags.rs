//! Tags command: list release tags, highest version first.

use anyhow::Context;
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::git;
use semvx_core::version::NormalizedVersion;

/// Arguments for the `tags` subcommand.
#[derive(Args, Debug, Default)]
pub struct TagsArgs {
    /// Show at most N tags
    #[arg(short = 'n', long, value_name = "N")]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct TagEntry {
    name: String,
    version: NormalizedVersion,
    prerelease: bool,
}

/// List tags that parse as semver under the configured prefix.
#[instrument(name = "cmd_tags", skip_all, fields(json_output))]
pub fn cmd_tags(
    args: TagsArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing tags command");

    let backend = super::open_git(cwd, config);
    let tags: Vec<TagEntry> = git::version_tags(backend.as_ref(), &config.sync.tag_prefix)
        .context("failed to list tags")?
        .into_iter()
        .take(args.limit.unwrap_or(usize::MAX))
        .map(|(name, version)| TagEntry {
            prerelease: version.is_prerelease(),
            name,
            version,
        })
        .collect();

    if global_json {
        println!("{}", serde_json::to_string_pretty(&tags)?);
        return Ok(());
    }

    if tags.is_empty() {
        println!(
            "  {} {}",
            "○".yellow(),
            format!("No tags matching {}X.Y.Z", config.sync.tag_prefix).yellow()
        );
    }
    for tag in &tags {
        if tag.prerelease {
            println!("{} {}", tag.name.cyan(), "(prerelease)".dimmed());
        } else {
            println!("{}", tag.name.cyan());
        }
    }
    Ok(())
}
