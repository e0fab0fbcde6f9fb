//! Library interface for the `semvx` CLI.
//!
//! This crate exposes the CLI's argument parser and command structure as a library,
//! primarily for documentation generation and testing. The actual entry point is
//! in `main.rs`.
//!
//! # Structure
//!
//! - [`Cli`] - The root argument parser (clap derive)
//! - [`Commands`] - Available subcommands
//! - [`commands`] - Command implementations

pub mod commands;

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

/// Color output preference.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect terminal capabilities automatically.
    #[default]
    Auto,
    /// Always emit colors.
    Always,
    /// Never emit colors.
    Never,
}

impl ColorChoice {
    /// Configure global color output. Call once at startup.
    pub fn apply(self) {
        match self {
            Self::Auto => {}
            Self::Always => owo_colors::set_override(true),
            Self::Never => owo_colors::set_override(false),
        }
    }
}

const ENV_HELP: &str = "\
ENVIRONMENT VARIABLES:
    RUST_LOG                Log filter (e.g., debug, semvx_core=trace)
    SEMVX_LOG_PATH          Explicit log file path
    SEMVX_LOG_DIR           Log directory
    SEMVX_<KEY>             Config override (e.g., SEMVX_SYNC__TAG_PREFIX=release-)
";

/// Command-line interface definition for semvx.
#[derive(Parser)]
#[command(name = "semvx")]
#[command(
    about = "Keep manifests, version headers and release tags in agreement",
    long_about = None
)]
#[command(version)]
#[command(after_long_help = ENV_HELP)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file (overrides discovery)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Run as if started in DIR
    #[arg(short = 'C', long, global = true)]
    pub chdir: Option<PathBuf>,

    /// Only print errors (suppresses warnings/info)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// More detail (repeatable; e.g. -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Colorize output
    #[arg(long, global = true, value_enum, default_value_t)]
    pub color: ColorChoice,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,
}

/// Available subcommands for the CLI.
#[derive(Subcommand)]
pub enum Commands {
    /// List version-bearing files
    Detect(commands::detect::DetectArgs),

    /// Show sources, tag, calculated version, authority and drift
    Status(commands::status::StatusArgs),

    /// Print the version everything should be at
    Next(commands::next::NextArgs),

    /// Bring every file and the release tag to the target version
    Sync(commands::sync::SyncArgs),

    /// Exit non-zero unless everything is aligned
    Validate(commands::validate::ValidateArgs),

    /// List release tags, highest first
    Tags(commands::tags::TagsArgs),

    /// Write version, build number and commit hash to a build file
    Build(commands::build::BuildArgs),

    /// Print the build number (total commits) and current commit
    #[command(visible_alias = "bc")]
    BuildCount(commands::build::BuildCountArgs),
}

/// Returns the clap command for documentation generation
pub fn command() -> clap::Command {
    Cli::command()
}
