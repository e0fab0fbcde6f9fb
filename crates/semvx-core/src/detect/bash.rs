//! Bash-script version sources, used only when a repository has no manifest.
//!
//! Candidates are evaluated at the repository root in fixed priority:
//!
//! 1. `.semvrc` pointer: `BASH_VERSION_FILE=path/to/script.sh`
//! 2. build layout: `build.sh` next to a `parts/` directory
//! 3. prefixed directory: `<prefix>-<name>/<name>.sh`
//! 4. standalone script named after the root directory: `<dir>.sh`
//! 5. any root `*.sh` carrying a version header
//!
//! A generated script (one with a `# generated` sentinel near the top) is
//! never authoritative. The earliest fragment in its sibling `parts/`
//! directory stands in for it.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use super::list_dir;
use crate::formats::{FormatKind, is_generated};

const RC_FILE: &str = ".semvrc";
const RC_KEY: &str = "BASH_VERSION_FILE";
const BUILD_SCRIPT: &str = "build.sh";
const PARTS_DIR: &str = "parts";

/// Find the authoritative version-bearing script under `root`.
pub(super) fn find_script(root: &Utf8Path, problems: &mut Vec<String>) -> Option<Utf8PathBuf> {
    if let Some(path) = rc_pointer(root, problems) {
        debug!(%path, "bash source from rc pointer");
        return Some(path);
    }

    let patterns: [(&str, fn(&Utf8Path) -> Option<Utf8PathBuf>); 4] = [
        ("build layout", build_layout),
        ("prefixed directory", prefixed_directory),
        ("standalone script", standalone_script),
        ("generic header scan", generic_scan),
    ];
    patterns.into_iter().find_map(|(name, pattern)| {
        let found = pattern(root);
        if let Some(ref path) = found {
            debug!(pattern = name, %path, "bash source matched");
        }
        found
    })
}

/// Resolve the `.semvrc` pointer, if any.
fn rc_pointer(root: &Utf8Path, problems: &mut Vec<String>) -> Option<Utf8PathBuf> {
    let content = std::fs::read_to_string(root.join(RC_FILE)).ok()?;
    let value = content.lines().find_map(|line| {
        let line = line.trim();
        let line = line.strip_prefix("export ").unwrap_or(line);
        let (key, value) = line.split_once('=')?;
        (key.trim() == RC_KEY).then(|| value.trim().trim_matches(['"', '\'']).to_string())
    })?;

    let path = root.join(&value);
    if path.is_file() {
        Some(path)
    } else {
        problems.push(format!("{RC_FILE}: {RC_KEY} points to missing file {value}"));
        None
    }
}

fn build_layout(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let build = root.join(BUILD_SCRIPT);
    let parts = root.join(PARTS_DIR);
    if !build.is_file() || !parts.is_dir() {
        return None;
    }
    earliest_part(&parts).or_else(|| authoritative(&build))
}

fn prefixed_directory(root: &Utf8Path) -> Option<Utf8PathBuf> {
    list_dir(root)
        .ok()?
        .into_iter()
        .filter(|(_, is_dir)| *is_dir)
        .find_map(|(dir, _)| {
            let dir_name = dir.file_name()?;
            let (prefix, name) = dir_name.split_once('-')?;
            if prefix.is_empty() || name.is_empty() || prefix.starts_with('.') {
                return None;
            }
            let script = dir.join(format!("{name}.sh"));
            script.is_file().then_some(script).and_then(|s| authoritative(&s))
        })
}

fn standalone_script(root: &Utf8Path) -> Option<Utf8PathBuf> {
    let name = root.file_name()?;
    let script = root.join(format!("{name}.sh"));
    if script.is_file() {
        authoritative(&script)
    } else {
        None
    }
}

fn generic_scan(root: &Utf8Path) -> Option<Utf8PathBuf> {
    shell_scripts(root)
        .into_iter()
        .find_map(|script| authoritative(&script))
}

/// The script itself if it carries a header, or its parts fragment if it is
/// generated.
fn authoritative(script: &Utf8Path) -> Option<Utf8PathBuf> {
    let content = std::fs::read_to_string(script).ok()?;
    if is_generated(&content) {
        debug!(%script, "skipping generated script");
        return script
            .parent()
            .and_then(|dir| earliest_part(&dir.join(PARTS_DIR)));
    }
    has_version_header(&content).then(|| script.to_path_buf())
}

/// The first `*.sh` fragment (sorted by name) that carries a header.
fn earliest_part(parts: &Utf8Path) -> Option<Utf8PathBuf> {
    shell_scripts(parts).into_iter().find(|part| {
        std::fs::read_to_string(part)
            .is_ok_and(|content| !is_generated(&content) && has_version_header(&content))
    })
}

fn shell_scripts(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    list_dir(dir)
        .map(|entries| {
            entries
                .into_iter()
                .filter(|(path, is_dir)| !is_dir && path.extension() == Some("sh"))
                .map(|(path, _)| path)
                .collect()
        })
        .unwrap_or_default()
}

fn has_version_header(content: &str) -> bool {
    matches!(FormatKind::Bash.read(content), Ok(Some(_)))
}
