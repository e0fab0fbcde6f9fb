//! Build commands: write a build info file, or just print the build number.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

use semvx_core::build::{self, BuildInfo, DEFAULT_BUILD_FILE};
use semvx_core::config::Config;
use semvx_core::state;

/// Arguments for the `build` subcommand.
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Output file, relative to the project root
    #[arg(value_name = "FILE")]
    pub file: Option<Utf8PathBuf>,
}

/// Arguments for the `build-count` subcommand.
#[derive(Args, Debug, Default)]
pub struct BuildCountArgs {}

#[derive(Serialize)]
struct BuildReport<'a> {
    path: &'a Utf8Path,
    #[serde(flatten)]
    info: &'a BuildInfo,
}

#[derive(Serialize)]
struct BuildCount {
    build_count: u64,
    commit: String,
    tag: Option<String>,
    commits_since_tag: Option<u64>,
}

/// Write `VERSION`, `BUILD_COUNT` and the commit hashes to a build file.
#[instrument(name = "cmd_build", skip_all, fields(json_output))]
pub fn cmd_build(
    args: BuildArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, file = ?args.file, "executing build command");

    let git = super::open_git(cwd, config);
    let state = state::inspect(cwd, config, git.as_ref(), None)?;
    let info = build::collect(&state, git.as_ref()).context("failed to gather build info")?;

    let path = cwd.join(args.file.as_deref().unwrap_or(Utf8Path::new(DEFAULT_BUILD_FILE)));
    info.write_to(&path)?;

    if global_json {
        let report = BuildReport { path: &path, info: &info };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{} {}", "✓".green(), format!("Wrote {path}").green());
    println!("  {:<8} {}", "Version".dimmed(), info.version.cyan());
    println!("  {:<8} {}", "Build".dimmed(), info.build_count);
    println!("  {:<8} {}", "Commit".dimmed(), info.commit_hash_short);
    Ok(())
}

/// Print the build number (commits reachable from `HEAD`).
#[instrument(name = "cmd_build_count", skip_all, fields(json_output))]
pub fn cmd_build_count(
    _args: BuildCountArgs,
    global_json: bool,
    config: &Config,
    cwd: &Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing build-count command");

    let git = super::open_git(cwd, config);
    let build_count = git.count_commits(None).context("failed to count commits")?;
    let commit = git.head_hash(true).context("failed to read HEAD")?;
    let tag = semvx_core::git::latest_version_tag(git.as_ref(), &config.sync.tag_prefix)
        .context("failed to list tags")?
        .map(|(name, _)| name);
    let commits_since_tag = tag
        .as_deref()
        .map(|t| git.count_commits(Some(t)))
        .transpose()
        .context("failed to count commits since tag")?;

    if global_json {
        let out = BuildCount {
            build_count,
            commit,
            tag,
            commits_since_tag,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("  {:<8} {}", "Build".dimmed(), build_count.cyan());
    println!("  {:<8} {}", "Commit".dimmed(), commit);
    if let (Some(tag), Some(count)) = (tag, commits_since_tag) {
        println!("  {:<8} {count} commit(s) since {tag}", "Release".dimmed());
    }
    Ok(())
}
