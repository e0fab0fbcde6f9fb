//! Validate command: fail unless every source and the tag agree.

use anyhow::bail;
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::state;
use semvx_core::sync;

/// Arguments for the `validate` subcommand.
#[derive(Args, Debug, Default)]
pub struct ValidateArgs {
    // Uses global --json flag for structured output
}

/// Check alignment; the exit status is the answer.
#[instrument(name = "cmd_validate", skip_all, fields(json_output))]
pub fn cmd_validate(
    _args: ValidateArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing validate command");

    let git = super::open_git(cwd, config);
    let state = state::inspect(cwd, config, git.as_ref(), None)?;
    let steps = sync::plan(&state);
    let aligned = state.is_aligned();

    if global_json {
        let report = serde_json::json!({
            "aligned": aligned,
            "drift": state.drift,
            "target_version": state.target_version,
            "pending": steps,
            "problems": state.problems,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if aligned {
        println!(
            "  {} all sources and the release tag agree on {}",
            "✓".green(),
            state
                .target_version
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default()
                .green()
                .bold()
        );
    } else {
        println!("  {} {}", "✗".red(), format!("drift: {}", state.drift).red().bold());
        for step in &steps {
            println!(
                "  {} {} {} → {}",
                "→".dimmed(),
                step.target.cyan(),
                step.before.as_deref().unwrap_or("none").dimmed(),
                step.after.green()
            );
        }
        super::print_problems(&state.problems);
    }

    if !aligned {
        bail!("versions are not aligned ({})", state.drift);
    }
    Ok(())
}
