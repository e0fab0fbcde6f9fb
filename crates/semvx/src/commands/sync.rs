//! Sync command: thin CLI layer over `semvx_core::sync`.

use anyhow::{Context, bail};
use clap::Args;
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::state;
use semvx_core::sync::{self, ApplyOptions, PlanResult, StepKind};
use semvx_core::version::explicit::validate_explicit;

/// Arguments for the `sync` subcommand.
#[derive(Args, Debug, Default)]
pub struct SyncArgs {
    /// Show the plan without changing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Proceed even off a release branch or with a dirty tree
    #[arg(long)]
    pub force: bool,

    /// Sync to this version instead of the resolved one (e.g., "2.0.0")
    #[arg(long, value_name = "VERSION")]
    pub set: Option<String>,

    /// Fold the updated files into the last commit before tagging
    #[arg(long)]
    pub amend: bool,
}

/// Plan and apply a sync.
#[instrument(name = "cmd_sync", skip_all, fields(json_output))]
pub fn cmd_sync(
    args: SyncArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, dry_run = args.dry_run, "executing sync command");

    let manual = args
        .set
        .as_deref()
        .map(validate_explicit)
        .transpose()
        .context("invalid --set version")?;

    let git = super::open_git(cwd, config);
    let state = state::inspect(cwd, config, git.as_ref(), manual.as_ref())?;
    let steps = sync::plan(&state);
    let opts = ApplyOptions::from_config(&config.sync)
        .dry_run(args.dry_run)
        .force(args.force)
        .amend(args.amend);

    let result = sync::apply(state, steps, &opts, git.as_ref());

    if global_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    if !result.ok {
        bail!("sync failed: {}", result.message);
    }
    Ok(())
}

fn print_result(result: &PlanResult) {
    if let Some(ref target) = result.state.target_version {
        println!(
            "{}: {} ({})",
            "Target".bold(),
            target.to_string().green().bold(),
            result.state.authority
        );
    }

    for step in &result.steps {
        let verb = match step.kind {
            StepKind::WriteFile => "write",
            StepKind::CreateTag => "tag",
            StepKind::Noop => "noop",
        };
        let mark = if result.executed.contains(step) {
            "✓".green().to_string()
        } else if result.dry_run {
            "→".dimmed().to_string()
        } else {
            "✗".red().to_string()
        };
        println!(
            "  {mark} {verb:<5} {} {} → {}",
            step.target.cyan(),
            step.before.as_deref().unwrap_or("none").dimmed(),
            step.after.green()
        );
    }

    if result.forced_override {
        println!("  {} {}", "!".yellow(), "guards overridden with --force".yellow());
    }
    for path in &result.rolled_back {
        println!("  {} restored {}", "↺".yellow(), path.as_str().cyan());
    }

    println!();
    if result.ok {
        println!("{}", result.message.green());
    } else {
        println!("{}", result.message.red().bold());
        if result.failure == Some(sync::FailureKind::Guard) {
            println!("{}", "Re-run with --force to override.".dimmed());
        }
    }
    super::print_problems(&result.state.problems);
}
