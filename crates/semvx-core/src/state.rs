//! Repository version state.
//!
//! [`inspect`] gathers everything the engine knows about a repository in
//! one pass: detected sources, the latest release tag, commits since that
//! tag with their aggregate impact, the calculated next version, and the
//! resolved target. It never mutates anything.
//!
//! Git problems (no repository, missing binary, a timed-out call) do not
//! fail inspection. They are recorded in [`VersionState::problems`] and the
//! git-derived fields stay empty, so file-only projects still resolve.

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::detect::{self, VersionSource};
use crate::git::{self, GitBackend};
use crate::resolve::{self, Authority, Drift};
use crate::version::classify::{self, CommitRecord};
use crate::version::explicit::validate_explicit;
use crate::version::{Impact, NormalizedVersion, VersionResult, next_version};

/// Snapshot of a repository's version information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionState {
    /// Repository root (absolute).
    pub root: Utf8PathBuf,
    /// Every detected version source.
    pub sources: Vec<VersionSource>,
    /// Version of the latest release tag.
    pub git_tag: Option<NormalizedVersion>,
    /// Name of the latest release tag.
    pub git_tag_name: Option<String>,
    /// Prefix used when naming new tags.
    pub tag_prefix: String,
    /// Commits since the latest tag, classified.
    pub commits: Vec<CommitRecord>,
    /// Aggregate impact of `commits`.
    pub impact: Impact,
    /// `git_tag` (or `0.0.0`) bumped by `impact`.
    pub calculated: Option<NormalizedVersion>,
    /// The version everything should be synchronized to.
    pub target_version: Option<NormalizedVersion>,
    /// Which candidate supplied the target.
    pub authority: Authority,
    /// Package file that supplied the target.
    pub authority_source: Option<Utf8PathBuf>,
    /// How the candidates disagree.
    pub drift: Drift,
    /// Non-fatal problems from detection and git.
    pub problems: Vec<String>,
}

impl VersionState {
    /// Number of commits since the latest tag.
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Whether a sync would have nothing to do.
    pub fn is_aligned(&self) -> bool {
        self.drift == Drift::Aligned
    }

    /// Name of the tag that would be created for the target.
    pub fn target_tag(&self) -> Option<String> {
        self.target_version
            .as_ref()
            .map(|v| v.without_build().tag_name(&self.tag_prefix))
    }
}

/// Inspect `root` and resolve its target version.
///
/// `manual` pins the target. When absent, `config.version.manual` is used if
/// set. An invalid override in either place is an error.
#[instrument(skip(config, git, manual), fields(%root))]
pub fn inspect(
    root: &Utf8Path,
    config: &Config,
    git: &dyn GitBackend,
    manual: Option<&NormalizedVersion>,
) -> VersionResult<VersionState> {
    let manual = match manual {
        Some(v) => Some(v.clone()),
        None => config
            .version
            .manual
            .as_deref()
            .map(validate_explicit)
            .transpose()?,
    };

    let detection = detect::detect(root, &config.detect);
    let mut problems = detection.problems;
    let prefix = config.sync.tag_prefix.as_str();

    let latest = git::latest_version_tag(git, prefix).unwrap_or_else(|e| {
        warn!(error = %e, "could not read tags");
        problems.push(format!("git tags unavailable: {e}"));
        None
    });
    let (git_tag_name, git_tag) = latest.unzip();

    let log = git.log_since(git_tag_name.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "could not read commit log");
        problems.push(format!("git log unavailable: {e}"));
        Vec::new()
    });
    let commits = classify::classify_commits(&log);
    let impact = classify::aggregate(&commits);

    let base = match (&git_tag, impact) {
        (Some(tag), _) => Some(tag.clone()),
        (None, Impact::None) => None,
        (None, _) => Some(NormalizedVersion::zero()),
    };
    let calculated = base.and_then(|base| {
        next_version(&base, impact)
            .map_err(|e| {
                warn!(error = %e, "could not calculate next version");
                problems.push(e.to_string());
            })
            .ok()
    });

    let resolution = resolve::resolve(
        &detection.sources,
        git_tag.as_ref(),
        calculated.as_ref(),
        manual.as_ref(),
    );

    info!(
        sources = detection.sources.len(),
        commits = commits.len(),
        %impact,
        target = ?resolution.target,
        authority = ?resolution.authority,
        "inspected repository"
    );

    Ok(VersionState {
        root: root.to_path_buf(),
        sources: detection.sources,
        git_tag,
        git_tag_name,
        tag_prefix: prefix.to_string(),
        commits,
        impact,
        calculated,
        target_version: resolution.target,
        authority: resolution.authority,
        authority_source: resolution.authority_source,
        drift: resolution.drift,
        problems,
    })
}
