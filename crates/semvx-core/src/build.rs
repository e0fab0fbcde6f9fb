//! Build information: the resolved version plus the commit it was built from.
//!
//! [`collect`] reads the total commit count (the build number) and the
//! `HEAD` hash, and pairs them with the target version from a
//! [`VersionState`]. [`BuildInfo::render`] produces a `KEY=value` file that
//! shell scripts can `source`:
//!
//! ```text
//! # Build Information
//! # Generated: 2026-01-02T03:04:05Z
//!
//! VERSION=1.4.0
//! BUILD_COUNT=312
//! COMMIT_HASH=9fceb02d0ae598e95dc970b74767f19372d61af8
//! COMMIT_HASH_SHORT=9fceb02
//! BUILD_TIMESTAMP=2026-01-02T03:04:05Z
//! ```

use camino::Utf8Path;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::git::{GitBackend, GitError};
use crate::state::VersionState;
use crate::version::NormalizedVersion;

/// Default build file name, relative to the repository root.
pub const DEFAULT_BUILD_FILE: &str = ".build_info";

/// Errors from gathering or writing build information.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Nothing resolved to a version.
    #[error("no version to build: no sources, tags or commits resolve to one")]
    NoVersion,

    /// A git call failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Writing the build file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: camino::Utf8PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Result alias for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Everything written to a build file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    /// Target version, without build metadata.
    pub version: NormalizedVersion,
    /// Commits reachable from `HEAD`.
    pub build_count: u64,
    /// Commits since the latest release tag, when there is one.
    pub commits_since_tag: Option<u64>,
    /// Name of the latest release tag.
    pub tag: Option<String>,
    /// Full `HEAD` hash.
    pub commit_hash: String,
    /// Abbreviated `HEAD` hash.
    pub commit_hash_short: String,
    /// When the information was gathered.
    pub timestamp: DateTime<Utc>,
}

impl BuildInfo {
    /// The `KEY=value` file contents.
    pub fn render(&self) -> String {
        let stamp = self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true);
        format!(
            "# Build Information\n\
             # Generated: {stamp}\n\
             \n\
             VERSION={}\n\
             BUILD_COUNT={}\n\
             COMMIT_HASH={}\n\
             COMMIT_HASH_SHORT={}\n\
             BUILD_TIMESTAMP={stamp}\n",
            self.version, self.build_count, self.commit_hash, self.commit_hash_short,
        )
    }

    /// Write [`render`](Self::render) to `path`, replacing any existing file.
    #[instrument(skip(self), fields(version = %self.version))]
    pub fn write_to(&self, path: &Utf8Path) -> BuildResult<()> {
        std::fs::write(path, self.render()).map_err(|source| BuildError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(%path, build = self.build_count, "wrote build file");
        Ok(())
    }
}

/// Gather build information for the target version of `state`.
///
/// A failure to count commits since the tag is logged and leaves
/// `commits_since_tag` empty; every other git failure is an error.
#[instrument(skip_all, fields(root = %state.root))]
pub fn collect(state: &VersionState, git: &dyn GitBackend) -> BuildResult<BuildInfo> {
    let version = state
        .target_version
        .as_ref()
        .ok_or(BuildError::NoVersion)?
        .without_build();

    let build_count = git.count_commits(None)?;
    let commits_since_tag = state.git_tag_name.as_deref().and_then(|tag| {
        git.count_commits(Some(tag))
            .map_err(|e| warn!(error = %e, %tag, "could not count commits since tag"))
            .ok()
    });
    let commit_hash = git.head_hash(false)?;
    let commit_hash_short = git.head_hash(true)?;
    debug!(build_count, ?commits_since_tag, %commit_hash_short, "collected build info");

    Ok(BuildInfo {
        version,
        build_count,
        commits_since_tag,
        tag: state.git_tag_name.clone(),
        commit_hash,
        commit_hash_short,
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::git::MockGit;
    use crate::state;
    use camino::Utf8PathBuf;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const HEAD: &str = "9fceb02d0ae598e95dc970b74767f19372d61af8";

    fn temp_root(files: &[(&str, &str)]) -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        for (name, content) in files {
            std::fs::write(root.join(name), content).unwrap();
        }
        (tmp, root)
    }

    fn fixed() -> BuildInfo {
        BuildInfo {
            version: NormalizedVersion::parse("1.4.0").unwrap(),
            build_count: 312,
            commits_since_tag: Some(3),
            tag: Some("v1.3.0".into()),
            commit_hash: HEAD.into(),
            commit_hash_short: "9fceb02".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
        }
    }

    #[test]
    fn render_is_sourceable() {
        assert_eq!(
            fixed().render(),
            "# Build Information\n\
             # Generated: 2026-01-02T03:04:05Z\n\
             \n\
             VERSION=1.4.0\n\
             BUILD_COUNT=312\n\
             COMMIT_HASH=9fceb02d0ae598e95dc970b74767f19372d61af8\n\
             COMMIT_HASH_SHORT=9fceb02\n\
             BUILD_TIMESTAMP=2026-01-02T03:04:05Z\n"
        );
    }

    #[test]
    fn collect_uses_the_target_version() {
        let (_tmp, root) = temp_root(&[(
            "Cargo.toml",
            "[package]\nname = \"a\"\nversion = \"1.3.0\"\n",
        )]);
        let git = MockGit::new()
            .with_history(9)
            .with_tag("v1.3.0")
            .with_commit("abc1234", "feat: more")
            .with_head(HEAD);
        let state = state::inspect(&root, &Config::default(), &git, None).unwrap();

        let info = collect(&state, &git).unwrap();
        assert_eq!(info.version.to_string(), "1.4.0");
        assert_eq!(info.build_count, 10);
        assert_eq!(info.commits_since_tag, Some(1));
        assert_eq!(info.tag.as_deref(), Some("v1.3.0"));
        assert_eq!(info.commit_hash, HEAD);
        assert_eq!(info.commit_hash_short, "9fceb02");
    }

    #[test]
    fn collect_drops_build_metadata() {
        let (_tmp, root) = temp_root(&[(
            "package.json",
            r#"{"version": "2.0.0+sha.5114f85"}"#,
        )]);
        let git = MockGit::new().with_history(1);
        let state = state::inspect(&root, &Config::default(), &git, None).unwrap();
        let info = collect(&state, &git).unwrap();
        assert_eq!(info.version.to_string(), "2.0.0");
        assert_eq!(info.commits_since_tag, None);
    }

    #[test]
    fn collect_without_a_version_fails() {
        let (_tmp, root) = temp_root(&[]);
        let git = MockGit::new().with_history(2);
        let state = state::inspect(&root, &Config::default(), &git, None).unwrap();
        assert!(matches!(collect(&state, &git), Err(BuildError::NoVersion)));
    }

    #[test]
    fn collect_surfaces_git_failures() {
        let (_tmp, root) = temp_root(&[("package.json", r#"{"version": "0.1.0"}"#)]);
        let git = MockGit::new().failing_reads();
        let state = state::inspect(&root, &Config::default(), &git, None).unwrap();
        assert!(matches!(collect(&state, &git), Err(BuildError::Git(_))));
    }

    #[test]
    fn write_to_replaces_the_file() {
        let (_tmp, root) = temp_root(&[(DEFAULT_BUILD_FILE, "stale\n")]);
        let path = root.join(DEFAULT_BUILD_FILE);
        fixed().write_to(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Build Information\n"));
        assert!(written.contains("VERSION=1.4.0\n"));
    }

    #[test]
    fn write_to_missing_directory_fails() {
        let (_tmp, root) = temp_root(&[]);
        let err = fixed().write_to(&root.join("nope/.build_info")).unwrap_err();
        assert!(matches!(err, BuildError::Write { .. }));
    }
}
