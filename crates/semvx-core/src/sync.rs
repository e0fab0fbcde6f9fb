//! Two-phase synchronization: plan, then apply.
//!
//! [`plan`] turns a [`VersionState`] into an ordered list of steps: one file
//! write per source that disagrees with the target, then at most one tag.
//! It is pure. [`apply`] executes a plan under these rules:
//!
//! - A dry run performs no mutation at all.
//! - Guards (release branch, clean tree) are evaluated immediately before
//!   the first mutation. A blocked guard aborts unless forced, and a forced
//!   run records the override.
//! - Every planned file is snapshotted before anything is written. If any
//!   write fails, every file touched so far is restored and no tag is
//!   created.
//! - Optional amend folds the written files into the last commit before the
//!   tag is created. A failed amend restores the files and unstages them.
//! - The tag is created last, annotated with `Release <version>`.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use semvx_core::config::Config;
//! use semvx_core::git::SubprocessGit;
//! use semvx_core::{state, sync};
//!
//! let config = Config::default();
//! let root = Utf8Path::new(".");
//! let git = SubprocessGit::new(root, config.sync.git_timeout()).unwrap();
//! let state = state::inspect(root, &config, &git, None).unwrap();
//! let steps = sync::plan(&state);
//! let opts = sync::ApplyOptions::from_config(&config.sync).dry_run(true);
//! let result = sync::apply(state, steps, &opts, &git);
//! println!("{}", result.message);
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::config::SyncConfig;
use crate::formats::{self, FormatKind, ParseError};
use crate::git::{GitBackend, GitError, GuardState, Guards};
use crate::state::VersionState;

/// Errors that abort [`apply`].
#[derive(Error, Debug)]
pub enum SyncError {
    /// Guards failed and the run was not forced.
    #[error("refusing to sync: {}", .reasons.join("; "))]
    Guard {
        /// Why each failed guard blocked.
        reasons: Vec<String>,
    },

    /// A git call failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The tag to be created already exists.
    #[error("tag {name} already exists")]
    TagExists {
        /// The existing tag.
        name: String,
    },

    /// A version file could not be read or written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A version file could not be parsed or rewritten.
    #[error(transparent)]
    Parse(ParseError),
}

impl From<ParseError> for SyncError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Io { path, source } => Self::Write { path, source },
            other => Self::Parse(other),
        }
    }
}

/// Result alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failure category reported in a [`PlanResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Guards blocked the run.
    Guard,
    /// A git call failed.
    GitOperation,
    /// A file write failed.
    WriteFailure,
    /// A file could not be parsed or rewritten.
    ParseError,
}

impl From<&SyncError> for FailureKind {
    fn from(err: &SyncError) -> Self {
        match err {
            SyncError::Guard { .. } => Self::Guard,
            SyncError::Git(_) | SyncError::TagExists { .. } => Self::GitOperation,
            SyncError::Write { .. } => Self::WriteFailure,
            SyncError::Parse(_) => Self::ParseError,
        }
    }
}

// ──────────────────────────────────────────────
// Plan
// ──────────────────────────────────────────────

/// What a step does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Rewrite the version inside a file.
    WriteFile,
    /// Create an annotated release tag.
    CreateTag,
    /// Does nothing.
    Noop,
}

/// One unit of work in a sync plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPlanStep {
    /// What the step does.
    pub kind: StepKind,
    /// File path (relative to the root) or tag name.
    pub target: String,
    /// File format, for write steps.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<FormatKind>,
    /// Current version (or current latest tag name).
    pub before: Option<String>,
    /// Version after the step.
    pub after: String,
}

impl SyncPlanStep {
    fn write(kind: FormatKind, path: &Utf8Path, before: &str, after: &str) -> Self {
        Self {
            kind: StepKind::WriteFile,
            target: path.to_string(),
            format: Some(kind),
            before: Some(before.to_string()),
            after: after.to_string(),
        }
    }
}

/// Compute the steps that bring every source and the tag to the target.
///
/// Returns an empty plan when there is no target or everything already
/// agrees. Build metadata never makes a source disagree.
#[instrument(skip_all)]
pub fn plan(state: &VersionState) -> Vec<SyncPlanStep> {
    let Some(target) = state.target_version.as_ref() else {
        debug!("no target version, nothing to plan");
        return Vec::new();
    };
    let after = target.to_string();

    let mut steps: Vec<SyncPlanStep> = state
        .sources
        .iter()
        .filter(|s| &s.version != target)
        .map(|s| SyncPlanStep::write(s.kind, &s.path, &s.raw, &after))
        .collect();

    if state.git_tag.as_ref() != Some(target) {
        let release = target.without_build();
        steps.push(SyncPlanStep {
            kind: StepKind::CreateTag,
            target: release.tag_name(&state.tag_prefix),
            format: None,
            before: state.git_tag_name.clone(),
            after: release.to_string(),
        });
    }

    debug!(steps = steps.len(), %target, "planned sync");
    steps
}

// ──────────────────────────────────────────────
// Apply
// ──────────────────────────────────────────────

/// Knobs for [`apply`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyOptions {
    /// Report the plan without mutating anything.
    pub dry_run: bool,
    /// Proceed even when guards block.
    pub force: bool,
    /// Fold written files into the last commit before tagging.
    pub amend: bool,
    /// Branches on which mutation is allowed.
    pub protected_branches: Vec<String>,
}

impl ApplyOptions {
    /// Options seeded from configuration. Dry run and force start off.
    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            amend: config.amend,
            protected_branches: config.protected_branches.clone(),
            ..Self::default()
        }
    }

    /// Set dry-run mode.
    #[must_use]
    pub const fn dry_run(mut self, yes: bool) -> Self {
        self.dry_run = yes;
        self
    }

    /// Set force mode.
    #[must_use]
    pub const fn force(mut self, yes: bool) -> Self {
        self.force = yes;
        self
    }

    /// Enable amend (never disables a configured amend).
    #[must_use]
    pub const fn amend(mut self, yes: bool) -> Self {
        self.amend |= yes;
        self
    }
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanResult {
    /// Whether the operation succeeded.
    pub ok: bool,
    /// One-line summary.
    pub message: String,
    /// Whether this was a dry run.
    pub dry_run: bool,
    /// Whether blocked guards were overridden.
    pub forced_override: bool,
    /// Guard evaluation, when guards were checked.
    pub guards: Option<Guards>,
    /// Failure category when `ok` is false.
    pub failure: Option<FailureKind>,
    /// The full plan.
    pub steps: Vec<SyncPlanStep>,
    /// Steps whose effects remain.
    pub executed: Vec<SyncPlanStep>,
    /// Steps not performed (or undone).
    pub not_executed: Vec<SyncPlanStep>,
    /// Files restored after a failure.
    pub rolled_back: Vec<Utf8PathBuf>,
    /// The state the plan was computed from.
    pub state: VersionState,
}

/// Execute `steps` against the repository described by `state`.
///
/// Never panics and never returns early with an error: every outcome,
/// including failure, is described by the returned [`PlanResult`].
#[instrument(skip_all, fields(steps = steps.len(), dry_run = opts.dry_run, force = opts.force))]
pub fn apply(
    state: VersionState,
    steps: Vec<SyncPlanStep>,
    opts: &ApplyOptions,
    git: &dyn GitBackend,
) -> PlanResult {
    let mut result = PlanResult {
        ok: true,
        message: String::new(),
        dry_run: opts.dry_run,
        forced_override: false,
        guards: None,
        failure: None,
        steps,
        executed: Vec::new(),
        not_executed: Vec::new(),
        rolled_back: Vec::new(),
        state,
    };

    if opts.dry_run {
        result.message = format!(
            "dry run: {} step(s) planned, nothing changed",
            result.steps.len()
        );
        result.not_executed.clone_from(&result.steps);
        info!(steps = result.steps.len(), "dry run");
        return result;
    }

    if result.steps.iter().all(|s| s.kind == StepKind::Noop) {
        result.message = "already aligned, nothing to do".to_string();
        result.executed.clone_from(&result.steps);
        info!("nothing to sync");
        return result;
    }

    match execute(&mut result, opts, git) {
        Ok(()) => {
            let target = result
                .state
                .target_version
                .as_ref()
                .map_or_else(String::new, ToString::to_string);
            result.message = format!("synchronized to {target}");
            info!(%target, executed = result.executed.len(), "sync complete");
        }
        Err(err) => {
            error!(error = %err, "sync failed");
            result.ok = false;
            result.failure = Some(FailureKind::from(&err));
            result.message = err.to_string();
        }
    }

    result.not_executed = result
        .steps
        .iter()
        .filter(|s| !result.executed.contains(s))
        .cloned()
        .collect();
    result
}

fn execute(result: &mut PlanResult, opts: &ApplyOptions, git: &dyn GitBackend) -> SyncResult<()> {
    let guard = GuardState::Unchecked.check(git, &opts.protected_branches)?;
    result.guards = guard.guards().cloned();
    if guard.is_blocked() {
        let reasons = guard.guards().map(Guards::blockers).unwrap_or_default();
        if !opts.force {
            return Err(SyncError::Guard { reasons });
        }
        warn!(?reasons, "guards blocked, continuing because of --force");
        result.forced_override = true;
    }

    let steps = result.steps.clone();
    let root = result.state.root.clone();
    let (writes, rest): (Vec<_>, Vec<_>) = steps
        .into_iter()
        .partition(|s| s.kind == StepKind::WriteFile);

    let existing = git.list_tags()?;
    if let Some(step) = rest
        .iter()
        .find(|s| s.kind == StepKind::CreateTag && existing.contains(&s.target))
    {
        return Err(SyncError::TagExists {
            name: step.target.clone(),
        });
    }

    let arena = SnapshotArena::capture(writes.iter().map(|s| root.join(&s.target)))?;

    for (i, step) in writes.iter().enumerate() {
        let path = root.join(&step.target);
        let written = step
            .format
            .map_or(Ok(()), |kind| formats::write_file(kind, &path, &step.after));
        if let Err(err) = written {
            result.rolled_back = arena.restore(i + 1);
            result.executed.clear();
            return Err(err.into());
        }
        result.executed.push(step.clone());
    }

    let relative: Vec<Utf8PathBuf> = writes.iter().map(|s| Utf8PathBuf::from(&s.target)).collect();
    let amended = opts.amend && !relative.is_empty();
    if amended && let Err(err) = git.amend_last_commit(&relative) {
        result.rolled_back = arena.restore(arena.len());
        result.executed.clear();
        if let Err(unstage) = git.unstage(&relative) {
            warn!(error = %unstage, "could not unstage restored files");
        }
        return Err(err.into());
    }

    for step in rest {
        if step.kind == StepKind::CreateTag {
            let message = format!("Release {}", step.after);
            if let Err(err) = git.create_annotated_tag(&step.target, &message) {
                result.rolled_back = arena.restore(arena.len());
                result.executed.clear();
                if amended {
                    warn!("tag creation failed after amend; the amended commit keeps the new versions");
                }
                return Err(err.into());
            }
            info!(tag = %step.target, "created tag");
        }
        result.executed.push(step);
    }

    Ok(())
}

/// Original bytes of every file a plan may touch.
#[derive(Debug)]
struct SnapshotArena {
    entries: Vec<(Utf8PathBuf, Vec<u8>)>,
}

impl SnapshotArena {
    fn capture(paths: impl IntoIterator<Item = Utf8PathBuf>) -> SyncResult<Self> {
        let mut entries = Vec::new();
        for path in paths {
            let bytes = std::fs::read(&path).map_err(|source| SyncError::Write {
                path: path.clone(),
                source,
            })?;
            entries.push((path, bytes));
        }
        debug!(files = entries.len(), "captured snapshots");
        Ok(Self { entries })
    }

    const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Restore the first `count` snapshots, newest first.
    fn restore(&self, count: usize) -> Vec<Utf8PathBuf> {
        let mut restored = Vec::new();
        for (path, bytes) in self.entries.iter().take(count).rev() {
            match std::fs::write(path, bytes) {
                Ok(()) => restored.push(path.clone()),
                Err(err) => error!(%path, error = %err, "could not restore snapshot"),
            }
        }
        warn!(files = restored.len(), "rolled back file writes");
        restored
    }
}
