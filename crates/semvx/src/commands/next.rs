//! Next command: print the version everything should be at.

use anyhow::bail;
use clap::Args;
use serde::Serialize;
use tracing::{debug, instrument};

use semvx_core::config::Config;
use semvx_core::resolve::Authority;
use semvx_core::state;
use semvx_core::version::NormalizedVersion;

/// Arguments for the `next` subcommand.
#[derive(Args, Debug, Default)]
pub struct NextArgs {
    /// Print the commit-derived version instead of the resolved target
    #[arg(long)]
    pub calculated: bool,
}

#[derive(Serialize)]
struct NextVersion<'a> {
    version: &'a NormalizedVersion,
    authority: Authority,
}

/// Print the target (or calculated) version on its own line.
#[instrument(name = "cmd_next", skip_all, fields(json_output))]
pub fn cmd_next(
    args: NextArgs,
    global_json: bool,
    config: &Config,
    cwd: &camino::Utf8Path,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, calculated = args.calculated, "executing next command");

    let git = super::open_git(cwd, config);
    let state = state::inspect(cwd, config, git.as_ref(), None)?;

    let picked = if args.calculated {
        state.calculated.as_ref().map(|v| (v, Authority::Calculated))
    } else {
        state.target_version.as_ref().map(|v| (v, state.authority))
    };
    let Some((version, authority)) = picked else {
        bail!("no version could be determined (no sources, tags or releasable commits)");
    };

    if global_json {
        let out = NextVersion { version, authority };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{version}");
    }
    Ok(())
}
