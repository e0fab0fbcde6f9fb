//! Core library for semvx.
//!
//! This crate detects every version-bearing file in a repository, works out
//! which version is authoritative, and brings files and release tags into
//! agreement. The `semvx` CLI is a thin layer over it.
//!
//! # Modules
//!
//! - [`build`] - Build number, commit hash and the build info file
//! - [`config`] - Configuration loading and management
//! - [`detect`] - Version source discovery (manifests and bash headers)
//! - [`error`] - Error types and result aliases
//! - [`formats`] - Per-format version read/write handlers
//! - [`git`] - Git gateway, guards and the test backend
//! - [`resolve`] - Highest-wins authority resolution and drift
//! - [`state`] - One-pass repository inspection
//! - [`sync`] - Two-phase plan/apply with rollback
//! - [`version`] - Normalized versions, commit classification, bumps
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use semvx_core::git::SubprocessGit;
//! use semvx_core::{ConfigLoader, state};
//!
//! let root = Utf8Path::new(".");
//! let config = ConfigLoader::new()
//!     .with_project_search(root)
//!     .load()
//!     .expect("Failed to load configuration");
//! let git = SubprocessGit::new(root, config.sync.git_timeout()).expect("git not found");
//! let state = state::inspect(root, &config, &git, None).expect("invalid override");
//!
//! println!("target: {:?} ({:?})", state.target_version, state.authority);
//! ```
#![deny(unsafe_code)]

pub mod build;

pub mod config;

pub mod detect;

pub mod error;

pub mod formats;

pub mod git;

pub mod resolve;

pub mod state;

pub mod sync;

pub mod version;

pub use config::{Config, ConfigLoader, LogLevel};

pub use error::{ConfigError, ConfigResult};

pub use semver;
