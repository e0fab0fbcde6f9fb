//! Per-format read/write of a version field.
//!
//! The set of formats is closed: each [`FormatKind`] maps to a [`Handler`]
//! holding plain function pointers. Handlers operate on file *content*;
//! [`read_file`] and [`write_file`] wrap them with filesystem access.
//!
//! Writes only ever touch the version value itself. Everything else in the
//! file (comments, key order, indentation, line endings) is left as found,
//! and every rewrite is verified by reading the result back.

mod bash;
mod cargo;
mod json;
mod python;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

pub use bash::is_generated;

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Format-specific read/write failures.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Reading or writing the file failed.
    #[error("{path}: {source}")]
    Io {
        /// File that failed.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML.
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// The file is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A version pattern failed to compile.
    #[error("invalid version pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// No writable version field was found.
    #[error("no {format} version field to update")]
    MissingVersion {
        /// Format being edited.
        format: FormatKind,
    },

    /// The rewritten content did not read back as the requested version.
    #[error("{format} rewrite did not produce version {expected}")]
    Verify {
        /// Format being edited.
        format: FormatKind,
        /// The version that should have been written.
        expected: String,
    },
}

/// Result alias for format operations.
pub type ParseResult<T> = Result<T, ParseError>;

// ──────────────────────────────────────────────
// Format kinds and dispatch
// ──────────────────────────────────────────────

/// Every version-bearing format the engine understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatKind {
    /// `Cargo.toml` (`[package]` or `[workspace.package]`).
    Cargo,
    /// `package.json`.
    PackageJson,
    /// `pyproject.toml` (`[project]` or `[tool.poetry]`).
    Pyproject,
    /// Legacy `setup.py` with a `version=` argument.
    SetupPy,
    /// Shell script with a `# version:` comment header.
    Bash,
}

/// Read/write function pair for one format.
#[derive(Clone, Copy)]
pub struct Handler {
    /// Extract the literal version string, if the content declares one.
    pub read: fn(&str) -> ParseResult<Option<String>>,
    /// Return `content` with its version replaced by the given value.
    pub write: fn(&str, &str) -> ParseResult<String>,
}

impl FormatKind {
    /// Manifest formats, in the order they're probed within a directory.
    pub const MANIFESTS: [Self; 4] = [Self::Cargo, Self::PackageJson, Self::Pyproject, Self::SetupPy];

    /// The dispatch table entry for this format.
    pub const fn handler(self) -> Handler {
        match self {
            Self::Cargo => Handler {
                read: cargo::read,
                write: cargo::write,
            },
            Self::PackageJson => Handler {
                read: json::read,
                write: json::write,
            },
            Self::Pyproject => Handler {
                read: python::read_pyproject,
                write: python::write_pyproject,
            },
            Self::SetupPy => Handler {
                read: python::read_setup_py,
                write: python::write_setup_py,
            },
            Self::Bash => Handler {
                read: bash::read,
                write: bash::write,
            },
        }
    }

    /// Fixed file name for manifest formats (`None` for bash scripts).
    pub const fn file_name(self) -> Option<&'static str> {
        match self {
            Self::Cargo => Some("Cargo.toml"),
            Self::PackageJson => Some("package.json"),
            Self::Pyproject => Some("pyproject.toml"),
            Self::SetupPy => Some("setup.py"),
            Self::Bash => None,
        }
    }

    /// Whether this is a language manifest rather than a script header.
    pub const fn is_manifest(self) -> bool {
        !matches!(self, Self::Bash)
    }

    /// Read the version from in-memory content.
    pub fn read(self, content: &str) -> ParseResult<Option<String>> {
        (self.handler().read)(content)
    }

    /// Rewrite in-memory content with `new_version`, verifying the result.
    ///
    /// A `v` prefix kept by the format's writer does not fail verification.
    pub fn rewrite(self, content: &str, new_version: &str) -> ParseResult<String> {
        let updated = (self.handler().write)(content, new_version)?;
        match self.read(&updated)? {
            Some(found) if strip_v(&found) == strip_v(new_version) => Ok(updated),
            _ => Err(ParseError::Verify {
                format: self,
                expected: new_version.to_string(),
            }),
        }
    }
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix(['v', 'V']).unwrap_or(version)
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Cargo => "cargo",
            Self::PackageJson => "package_json",
            Self::Pyproject => "pyproject",
            Self::SetupPy => "setup_py",
            Self::Bash => "bash",
        };
        f.write_str(s)
    }
}

// ──────────────────────────────────────────────
// File wrappers
// ──────────────────────────────────────────────

/// Read the version declared by the file at `path`.
#[instrument(skip_all, fields(%kind, %path))]
pub fn read_file(kind: FormatKind, path: &Utf8Path) -> ParseResult<Option<String>> {
    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let version = kind.read(&content)?;
    debug!(?version, "read version");
    Ok(version)
}

/// Replace the version declared by the file at `path`.
#[instrument(skip_all, fields(%kind, %path))]
pub fn write_file(kind: FormatKind, path: &Utf8Path, new_version: &str) -> ParseResult<()> {
    let io_err = |source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };
    let content = std::fs::read_to_string(path).map_err(io_err)?;
    let updated = kind.rewrite(&content, new_version)?;
    std::fs::write(path, updated).map_err(io_err)?;
    debug!("wrote version");
    Ok(())
}

// ──────────────────────────────────────────────
// Shared TOML table edit
// ──────────────────────────────────────────────

const TABLE_HEADER: &str = r"^\s*\[\s*([A-Za-z0-9_.\-\s]+?)\s*\]\s*(?:#.*)?$";
const VERSION_LINE: &str = r#"^(\s*version\s*=\s*)(["'])([^"']*)(["'])"#;

/// Split a line into its body and line terminator.
fn split_eol(line: &str) -> (&str, &str) {
    let body = line.trim_end_matches(['\r', '\n']);
    (body, &line[body.len()..])
}

/// Replace `version = "..."` inside the first of `tables` that holds one.
///
/// Table names are dotted (`tool.poetry`). Only the value between the quotes
/// changes, so the rest of the line (trailing comments included) survives.
pub(crate) fn rewrite_table_version(
    content: &str,
    tables: &[&str],
    new_version: &str,
) -> ParseResult<Option<String>> {
    let header = Regex::new(TABLE_HEADER)?;
    let version_line = Regex::new(VERSION_LINE)?;
    Ok(tables.iter().find_map(|table| {
        rewrite_in_table(content, table, new_version, &header, &version_line)
    }))
}

fn rewrite_in_table(
    content: &str,
    table: &str,
    new_version: &str,
    header: &Regex,
    version_line: &Regex,
) -> Option<String> {
    let mut in_table = false;
    let mut out = String::with_capacity(content.len() + new_version.len());
    let mut replaced = false;

    for line in content.split_inclusive('\n') {
        let (body, eol) = split_eol(line);
        if body.trim_start().starts_with('[') {
            // `[[array]]` headers never match a plain table name
            in_table = header.captures(body).is_some_and(|caps| {
                let name: String = caps[1].chars().filter(|c| !c.is_whitespace()).collect();
                name == table
            });
            out.push_str(line);
            continue;
        }

        if in_table
            && !replaced
            && let Some(caps) = version_line.captures(body)
        {
            let value = caps.get(3)?;
            out.push_str(&body[..value.start()]);
            out.push_str(new_version);
            out.push_str(&body[value.end()..]);
            out.push_str(eol);
            replaced = true;
            continue;
        }

        out.push_str(line);
    }

    replaced.then_some(out)
}

/// Walk a dotted path through nested TOML tables and return `version`.
pub(crate) fn toml_table_version(doc: &toml::Table, path: &[&str]) -> Option<String> {
    let mut table = doc;
    for key in path {
        table = table.get(*key)?.as_table()?;
    }
    table.get("version")?.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn table_edit_only_touches_the_named_table() {
        let content = "[dependencies]\nversion = \"0.1\"\n\n[package]\nname = \"x\"\nversion = \"1.0.0\" # keep me\n";
        let updated = rewrite_table_version(content, &["package"], "1.1.0")
            .unwrap()
            .unwrap();
        assert_eq!(
            updated,
            "[dependencies]\nversion = \"0.1\"\n\n[package]\nname = \"x\"\nversion = \"1.1.0\" # keep me\n"
        );
    }

    #[test]
    fn table_edit_handles_crlf() {
        let content = "[package]\r\nversion = '1.0.0'\r\n";
        let updated = rewrite_table_version(content, &["package"], "2.0.0")
            .unwrap()
            .unwrap();
        assert_eq!(updated, "[package]\r\nversion = '2.0.0'\r\n");
    }

    #[test]
    fn table_edit_falls_through_candidates() {
        let content = "[tool.poetry]\nversion = \"0.3.0\"\n";
        let updated = rewrite_table_version(content, &["project", "tool.poetry"], "0.4.0")
            .unwrap()
            .unwrap();
        assert!(updated.contains("version = \"0.4.0\""));
    }

    #[test]
    fn table_edit_without_field_is_none() {
        let result = rewrite_table_version("[package]\nname = \"x\"\n", &["package"], "1.0.0");
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn rewrite_verifies_the_result() {
        let content = "[package]\nname = \"x\"\nversion = \"1.0.0\"\n";
        let updated = FormatKind::Cargo.rewrite(content, "1.0.1").unwrap();
        assert_eq!(FormatKind::Cargo.read(&updated).unwrap().as_deref(), Some("1.0.1"));
    }

    #[test]
    fn file_round_trip_preserves_surroundings() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("package.json")).unwrap();
        std::fs::write(&path, "{\n    \"name\": \"demo\",\n    \"version\": \"0.1.0\",\n    \"private\": true\n}\n").unwrap();

        write_file(FormatKind::PackageJson, &path, "0.2.0").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n    \"name\": \"demo\",\n    \"version\": \"0.2.0\",\n    \"private\": true\n}\n"
        );
        assert_eq!(
            read_file(FormatKind::PackageJson, &path).unwrap().as_deref(),
            Some("0.2.0")
        );
    }

    #[test]
    fn package_json_write_touches_only_the_version() {
        let tmp = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(tmp.path().join("package.json")).unwrap();
        let original = r#"{"name": "demo","version":"1.0.0","files": ["dist", "lib"],"description": "caf\u00e9"}"#;
        std::fs::write(&path, original).unwrap();

        write_file(FormatKind::PackageJson, &path, "1.0.1").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            original.replace("\"1.0.0\"", "\"1.0.1\"")
        );
    }

    #[test]
    fn rewrite_accepts_a_kept_v_prefix() {
        let updated = FormatKind::Bash.rewrite("# version: v0.4.1\n", "0.5.0").unwrap();
        assert_eq!(updated, "# version: v0.5.0\n");
    }

    #[test]
    fn read_file_reports_missing_file() {
        let err = read_file(FormatKind::Cargo, Utf8Path::new("/definitely/not/here/Cargo.toml"))
            .unwrap_err();
        assert!(matches!(err, ParseError::Io { .. }));
    }
}
