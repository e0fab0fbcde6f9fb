//! `Cargo.toml`: `[package].version`, or `[workspace.package].version` for
//! virtual manifests and crates inheriting from the workspace.

use super::{FormatKind, ParseError, ParseResult, rewrite_table_version, toml_table_version};

const TABLES: &[&str] = &["package", "workspace.package"];

pub(super) fn read(content: &str) -> ParseResult<Option<String>> {
    let doc: toml::Table = toml::from_str(content)?;
    Ok(toml_table_version(&doc, &["package"])
        .or_else(|| toml_table_version(&doc, &["workspace", "package"])))
}

pub(super) fn write(content: &str, new_version: &str) -> ParseResult<String> {
    rewrite_table_version(content, TABLES, new_version)?.ok_or(ParseError::MissingVersion {
        format: FormatKind::Cargo,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRATE: &str = r#"# top comment
[package]
name = "demo"
version = "1.2.5"   # bumped by release tooling
edition = "2024"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
"#;

    #[test]
    fn reads_package_version() {
        assert_eq!(read(CRATE).unwrap().as_deref(), Some("1.2.5"));
    }

    #[test]
    fn reads_workspace_package_version() {
        let content = "[workspace]\nmembers = [\"crates/*\"]\n\n[workspace.package]\nversion = \"0.4.0\"\n";
        assert_eq!(read(content).unwrap().as_deref(), Some("0.4.0"));
    }

    #[test]
    fn inherited_version_alone_is_not_a_version() {
        let content = "[package]\nname = \"member\"\nversion.workspace = true\n";
        assert_eq!(read(content).unwrap(), None);
    }

    #[test]
    fn missing_package_table_is_not_a_version() {
        assert_eq!(read("[workspace]\nmembers = []\n").unwrap(), None);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(read("[package\nversion = "), Err(ParseError::Toml(_))));
    }

    #[test]
    fn write_keeps_comments_and_dependencies() {
        let updated = write(CRATE, "1.3.0").unwrap();
        assert_eq!(updated, CRATE.replace("\"1.2.5\"", "\"1.3.0\""));
        assert!(updated.contains("serde = { version = \"1.0\""));
    }

    #[test]
    fn write_targets_workspace_package_when_inherited() {
        let content = "[package]\nname = \"root\"\nversion.workspace = true\n\n[workspace.package]\nversion = \"0.4.0\"\n";
        let updated = write(content, "0.5.0").unwrap();
        assert!(updated.contains("version.workspace = true"));
        assert!(updated.contains("[workspace.package]\nversion = \"0.5.0\""));
    }

    #[test]
    fn write_without_version_fails() {
        let err = write("[package]\nname = \"x\"\n", "1.0.0").unwrap_err();
        assert!(matches!(err, ParseError::MissingVersion { .. }));
    }
}
