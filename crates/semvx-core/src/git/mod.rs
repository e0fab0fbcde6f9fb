//! Git gateway.
//!
//! Everything the engine needs from version control goes through the
//! [`GitBackend`] trait: tag listing and creation, the commit log since the
//! last release, commit counts and the `HEAD` hash, branch name,
//! working-tree cleanliness, and folding written files into the last commit.
//!
//! - [`SubprocessGit`] shells out to the `git` binary with a bounded timeout,
//!   inheriting the user's hooks, signing and credentials.
//! - [`MockGit`] is an in-memory backend for tests.
//!
//! Mutating calls are gated by [`GuardState`], evaluated immediately before
//! the first mutation.

pub mod mock;
pub mod subprocess;

pub use mock::MockGit;
pub use subprocess::SubprocessGit;

use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::version::NormalizedVersion;

/// Errors from git operations.
#[derive(Error, Debug)]
pub enum GitError {
    /// Failed to execute the `git` command.
    #[error("failed to run git: {0}")]
    Exec(#[from] std::io::Error),

    /// The `git` binary could not be located.
    #[error("git executable not found: {0}")]
    NotFound(#[from] which::Error),

    /// `git` returned a non-zero exit code.
    #[error("git {command} failed: {stderr}")]
    Command {
        /// The git subcommand that failed (e.g., "tag").
        command: String,
        /// Captured stderr.
        stderr: String,
    },

    /// `git` did not finish within the configured bound and was killed.
    #[error("git {command} timed out after {timeout:?}")]
    Timeout {
        /// The git subcommand that timed out.
        command: String,
        /// The bound that was exceeded.
        timeout: Duration,
    },

    /// `git` succeeded but printed something we could not interpret.
    #[error("unexpected output from git {command}: {output:?}")]
    Unexpected {
        /// The git subcommand.
        command: String,
        /// The output as printed.
        output: String,
    },

    /// Not inside a git repository.
    #[error("not a git repository (or any parent up to mount point)")]
    NotARepo,
}

/// Result alias for git operations.
pub type GitResult<T> = Result<T, GitError>;

/// Version-control operations used by the engine.
///
/// Read methods never change repository state. The last three methods
/// mutate and must only run after guards pass (or are forced).
pub trait GitBackend {
    /// All tag names in the repository.
    fn list_tags(&self) -> GitResult<Vec<String>>;

    /// `(short_hash, subject)` for commits after `since` (or all commits if
    /// `None`), newest first. An unborn `HEAD` yields no commits.
    fn log_since(&self, since: Option<&str>) -> GitResult<Vec<(String, String)>>;

    /// Number of commits reachable from `HEAD`, or only those after `since`.
    /// An unborn `HEAD` counts zero.
    fn count_commits(&self, since: Option<&str>) -> GitResult<u64>;

    /// Hash of the `HEAD` commit, abbreviated when `short`.
    fn head_hash(&self, short: bool) -> GitResult<String>;

    /// The checked-out branch, or `None` for a detached `HEAD`.
    fn current_branch(&self) -> GitResult<Option<String>>;

    /// Whether the working tree has no staged or unstaged changes.
    fn is_clean(&self) -> GitResult<bool>;

    /// Create an annotated tag at `HEAD`.
    fn create_annotated_tag(&self, name: &str, message: &str) -> GitResult<()>;

    /// Stage `paths` and fold them into the last commit, keeping its message.
    fn amend_last_commit(&self, paths: &[Utf8PathBuf]) -> GitResult<()>;

    /// Remove `paths` from the index, leaving the working tree alone.
    fn unstage(&self, paths: &[Utf8PathBuf]) -> GitResult<()>;
}

/// Every tag that parses as semver once `prefix` is removed, highest first.
///
/// Tags that are not semver-looking (`nightly`, `v1.2`) are ignored. Tags
/// naming the same version keep their listing order.
#[instrument(skip(backend))]
pub fn version_tags(
    backend: &dyn GitBackend,
    prefix: &str,
) -> GitResult<Vec<(String, NormalizedVersion)>> {
    let mut tags: Vec<(String, NormalizedVersion)> = backend
        .list_tags()?
        .into_iter()
        .filter_map(|tag| {
            let version = NormalizedVersion::parse(tag.strip_prefix(prefix)?).ok()?;
            Some((tag, version))
        })
        .collect();
    tags.sort_by(|a, b| b.1.cmp(&a.1));
    debug!(count = tags.len(), "version tags");
    Ok(tags)
}

/// The highest tag that parses as semver once `prefix` is removed.
pub fn latest_version_tag(
    backend: &dyn GitBackend,
    prefix: &str,
) -> GitResult<Option<(String, NormalizedVersion)>> {
    Ok(version_tags(backend, prefix)?.into_iter().next())
}

// ──────────────────────────────────────────────
// Guards
// ──────────────────────────────────────────────

/// Preconditions for mutating the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Guards {
    /// The checked-out branch (`None` when detached).
    pub branch: Option<String>,
    /// Whether `branch` is one of the protected release branches.
    pub on_protected_branch: bool,
    /// Whether the working tree is clean.
    pub clean_tree: bool,
}

impl Guards {
    /// Read branch and tree state from `backend`.
    pub fn evaluate(backend: &dyn GitBackend, protected: &[String]) -> GitResult<Self> {
        let branch = backend.current_branch()?;
        let on_protected_branch = branch
            .as_ref()
            .is_some_and(|b| protected.iter().any(|p| p == b));
        let clean_tree = backend.is_clean()?;
        Ok(Self {
            branch,
            on_protected_branch,
            clean_tree,
        })
    }

    /// Whether every guard holds.
    pub const fn passed(&self) -> bool {
        self.on_protected_branch && self.clean_tree
    }

    /// Human-readable reasons the guards failed.
    pub fn blockers(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.on_protected_branch {
            reasons.push(match self.branch {
                Some(ref b) => format!("branch `{b}` is not a release branch"),
                None => "HEAD is detached".to_string(),
            });
        }
        if !self.clean_tree {
            reasons.push("working tree has uncommitted changes".to_string());
        }
        reasons
    }
}

/// Guard evaluation: `Unchecked` becomes `CheckedOk` or `CheckedBlocked`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "guards", rename_all = "snake_case")]
pub enum GuardState {
    /// Not evaluated yet.
    #[default]
    Unchecked,
    /// All guards hold.
    CheckedOk(Guards),
    /// At least one guard failed.
    CheckedBlocked(Guards),
}

impl GuardState {
    /// Evaluate guards now. Already-checked states are re-evaluated, since
    /// repository state may have changed.
    #[instrument(skip(self, backend))]
    pub fn check(self, backend: &dyn GitBackend, protected: &[String]) -> GitResult<Self> {
        let guards = Guards::evaluate(backend, protected)?;
        debug!(?guards, "guards evaluated");
        Ok(if guards.passed() {
            Self::CheckedOk(guards)
        } else {
            Self::CheckedBlocked(guards)
        })
    }

    /// Whether this state is `CheckedBlocked`.
    pub const fn is_blocked(&self) -> bool {
        matches!(self, Self::CheckedBlocked(_))
    }

    /// The evaluated guards, if checked.
    pub const fn guards(&self) -> Option<&Guards> {
        match self {
            Self::Unchecked => None,
            Self::CheckedOk(g) | Self::CheckedBlocked(g) => Some(g),
        }
    }
}
