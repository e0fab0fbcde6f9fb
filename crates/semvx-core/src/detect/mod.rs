//! Project detection: discover every version-bearing source in a repository.
//!
//! Detection runs in two phases:
//!
//! 1. **Manifests.** Each directory is probed for the known manifest files.
//!    Subdirectories are visited in sorted order up to a configurable depth,
//!    skipping hidden and ignored directories, so nested per-language
//!    components of a monorepo are found too.
//! 2. **Bash headers.** Only when phase 1 found nothing, the root is checked
//!    for a script carrying a `# version:` header (see [`bash`]).
//!
//! Malformed files never abort detection. They are recorded in
//! [`Detection::problems`] and skipped.
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use semvx_core::config::DetectConfig;
//! use semvx_core::detect;
//!
//! let found = detect::detect(Utf8Path::new("."), &DetectConfig::default());
//! for source in &found.sources {
//!     println!("{} {} = {}", source.kind, source.path, source.version);
//! }
//! ```

mod bash;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::DetectConfig;
use crate::formats::{self, FormatKind};
use crate::version::NormalizedVersion;

/// A file that declares a version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSource {
    /// Format of the file.
    pub kind: FormatKind,
    /// Path relative to the repository root.
    pub path: Utf8PathBuf,
    /// The version string exactly as written in the file.
    pub raw: String,
    /// Normalized form of `raw`.
    pub version: NormalizedVersion,
}

/// Everything detection found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// Sources in discovery order.
    pub sources: Vec<VersionSource>,
    /// Non-fatal problems (malformed or unreadable files).
    pub problems: Vec<String>,
}

impl Detection {
    fn problem(&mut self, message: String) {
        warn!(%message, "detection problem");
        self.problems.push(message);
    }
}

/// Scan `root` for version sources.
#[instrument(skip(config), fields(%root))]
pub fn detect(root: &Utf8Path, config: &DetectConfig) -> Detection {
    let mut detection = Detection::default();
    scan_manifests(root, root, 0, config, &mut detection);

    if detection.sources.is_empty() {
        debug!("no manifests found, trying bash patterns");
        if let Some(script) = bash::find_script(root, &mut detection.problems) {
            probe(root, &script, FormatKind::Bash, &mut detection);
        }
    }

    info!(
        sources = detection.sources.len(),
        problems = detection.problems.len(),
        "detection complete"
    );
    detection
}

fn scan_manifests(
    root: &Utf8Path,
    dir: &Utf8Path,
    depth: usize,
    config: &DetectConfig,
    out: &mut Detection,
) {
    let mut has_pyproject = false;
    for kind in FormatKind::MANIFESTS {
        let Some(name) = kind.file_name() else {
            continue;
        };
        // setup.py is only a fallback for directories without a pyproject version
        if kind == FormatKind::SetupPy && has_pyproject {
            continue;
        }
        let path = dir.join(name);
        if path.is_file() && probe(root, &path, kind, out) && kind == FormatKind::Pyproject {
            has_pyproject = true;
        }
    }

    if depth >= config.max_depth {
        return;
    }

    let children = match list_dir(dir) {
        Ok(children) => children,
        Err(e) => {
            out.problem(format!("{}: {e}", relative(root, dir)));
            return;
        }
    };

    for (child, is_dir) in children {
        if !is_dir {
            continue;
        }
        let Some(name) = child.file_name() else {
            continue;
        };
        if name.starts_with('.') || config.ignore.iter().any(|ignored| ignored == name) {
            debug!(dir = %child, "skipping directory");
            continue;
        }
        scan_manifests(root, &child, depth + 1, config, out);
    }
}

/// Read one candidate file, recording it as a source or a problem.
///
/// Returns `true` if a source was recorded.
fn probe(root: &Utf8Path, path: &Utf8Path, kind: FormatKind, out: &mut Detection) -> bool {
    let rel = relative(root, path);
    match formats::read_file(kind, path) {
        Ok(Some(raw)) => match NormalizedVersion::parse(&raw) {
            Ok(version) => {
                debug!(%kind, path = %rel, %version, "found version source");
                out.sources.push(VersionSource {
                    kind,
                    path: rel,
                    raw,
                    version,
                });
                true
            }
            Err(e) => {
                out.problem(format!("{rel}: {e}"));
                false
            }
        },
        Ok(None) => {
            debug!(%kind, path = %rel, "no version field");
            false
        }
        Err(e) => {
            out.problem(format!("{rel}: {e}"));
            false
        }
    }
}

fn relative(root: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    path.strip_prefix(root)
        .map_or_else(|_| path.to_path_buf(), Utf8Path::to_path_buf)
}

/// Directory entries sorted by path, flagged with whether each is a real
/// directory (symlinks are not followed).
fn list_dir(dir: &Utf8Path) -> std::io::Result<Vec<(Utf8PathBuf, bool)>> {
    let mut entries = dir
        .read_dir_utf8()?
        .map(|entry| {
            let entry = entry?;
            let is_dir = entry.file_type()?.is_dir();
            Ok((entry.into_path(), is_dir))
        })
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}
