//! Status command: the full version picture of a repository.

use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::resolve::Drift;
use semvx_core::state::{self, VersionState};

/// Arguments for the `status` subcommand.
#[derive(Args, Debug, Default)]
pub struct StatusArgs {
    /// List each commit since the last tag with its classified impact
    #[arg(long)]
    pub commits: bool,
}

/// Inspect the repository and print its version state.
#[instrument(name = "cmd_status", skip_all, fields(json_output))]
pub fn cmd_status(
    args: StatusArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing status command");

    let git = super::open_git(cwd, config);
    let state = state::inspect(cwd, config, git.as_ref(), None)?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        print_state(&state, args.commits);
    }
    Ok(())
}

fn print_state(state: &VersionState, show_commits: bool) {
    println!("{}", "Sources".bold().underline());
    if state.sources.is_empty() {
        println!("  {}", "none".yellow());
    }
    for source in &state.sources {
        println!(
            "  {} {} {}",
            source.path.as_str().cyan(),
            source.version.to_string().green(),
            format!("({})", source.kind).dimmed()
        );
    }

    println!();
    println!("{}", "Git".bold().underline());
    match state.git_tag_name {
        Some(ref tag) => println!("{}: {}", "Latest tag".dimmed(), tag.cyan()),
        None => println!("{}: {}", "Latest tag".dimmed(), "none".yellow()),
    }
    println!(
        "{}: {} ({})",
        "Commits since tag".dimmed(),
        state.commit_count(),
        state.impact
    );
    if show_commits {
        for commit in &state.commits {
            println!(
                "  {} {} {}",
                commit.hash.dimmed(),
                format!("[{}]", commit.impact).cyan(),
                commit.message
            );
        }
    }
    match state.calculated {
        Some(ref v) => println!("{}: {}", "Calculated".dimmed(), v),
        None => println!("{}: {}", "Calculated".dimmed(), "none".yellow()),
    }

    println!();
    println!("{}", "Resolution".bold().underline());
    match state.target_version {
        Some(ref v) => println!("{}: {}", "Target".dimmed(), v.to_string().green().bold()),
        None => println!("{}: {}", "Target".dimmed(), "none".yellow()),
    }
    let authority = match state.authority_source {
        Some(ref path) => format!("{} ({path})", state.authority),
        None => state.authority.to_string(),
    };
    println!("{}: {}", "Authority".dimmed(), authority);
    let drift = state.drift.to_string();
    if state.drift == Drift::Aligned {
        println!("{}: {} {}", "Drift".dimmed(), "✓".green(), drift.green());
    } else {
        println!("{}: {}", "Drift".dimmed(), drift.yellow());
    }

    super::print_problems(&state.problems);
}
