//! Python metadata: `pyproject.toml` (PEP 621 `[project]`, then
//! `[tool.poetry]`) and the legacy `setup.py` `version=` argument.

use regex::Regex;

use super::{FormatKind, ParseError, ParseResult, rewrite_table_version, toml_table_version};

const PYPROJECT_TABLES: &[&str] = &["project", "tool.poetry"];

const SETUP_VERSION: &str = r#"\bversion\s*=\s*(['"])([^'"\n]+)['"]"#;

pub(super) fn read_pyproject(content: &str) -> ParseResult<Option<String>> {
    let doc: toml::Table = toml::from_str(content)?;
    Ok(toml_table_version(&doc, &["project"])
        .or_else(|| toml_table_version(&doc, &["tool", "poetry"])))
}

pub(super) fn write_pyproject(content: &str, new_version: &str) -> ParseResult<String> {
    rewrite_table_version(content, PYPROJECT_TABLES, new_version)?.ok_or(
        ParseError::MissingVersion {
            format: FormatKind::Pyproject,
        },
    )
}

pub(super) fn read_setup_py(content: &str) -> ParseResult<Option<String>> {
    let re = Regex::new(SETUP_VERSION)?;
    Ok(re.captures(content).map(|caps| caps[2].to_string()))
}

pub(super) fn write_setup_py(content: &str, new_version: &str) -> ParseResult<String> {
    let re = Regex::new(SETUP_VERSION)?;
    let value = re
        .captures(content)
        .and_then(|caps| caps.get(2))
        .ok_or(ParseError::MissingVersion {
            format: FormatKind::SetupPy,
        })?;
    Ok(format!(
        "{}{new_version}{}",
        &content[..value.start()],
        &content[value.end()..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_pep621_version() {
        let content = "[project]\nname = \"demo\"\nversion = \"0.3.1\"\n";
        assert_eq!(read_pyproject(content).unwrap().as_deref(), Some("0.3.1"));
    }

    #[test]
    fn reads_poetry_version() {
        let content = "[tool.poetry]\nname = \"demo\"\nversion = \"2.1.0\"\n";
        assert_eq!(read_pyproject(content).unwrap().as_deref(), Some("2.1.0"));
    }

    #[test]
    fn dynamic_version_is_none() {
        let content = "[project]\nname = \"demo\"\ndynamic = [\"version\"]\n";
        assert_eq!(read_pyproject(content).unwrap(), None);
    }

    #[test]
    fn project_table_wins_over_poetry() {
        let content = "[project]\nversion = \"1.0.0\"\n\n[tool.poetry]\nversion = \"0.9.0\"\n";
        assert_eq!(read_pyproject(content).unwrap().as_deref(), Some("1.0.0"));
        let updated = write_pyproject(content, "1.1.0").unwrap();
        assert!(updated.contains("[project]\nversion = \"1.1.0\""));
        assert!(updated.contains("[tool.poetry]\nversion = \"0.9.0\""));
    }

    #[test]
    fn setup_py_keyword_argument() {
        let content = "from setuptools import setup\n\nsetup(\n    name='demo',\n    version='0.5.2',\n    python_requires='>=3.8',\n)\n";
        assert_eq!(read_setup_py(content).unwrap().as_deref(), Some("0.5.2"));
        let updated = write_setup_py(content, "0.6.0").unwrap();
        assert_eq!(updated, content.replace("0.5.2", "0.6.0"));
    }

    #[test]
    fn setup_py_ignores_prefixed_names() {
        let content = "setup(python_version=\"3.8\", version = \"1.0.0\")\n";
        assert_eq!(read_setup_py(content).unwrap().as_deref(), Some("1.0.0"));
    }

    #[test]
    fn setup_py_without_version() {
        assert_eq!(read_setup_py("setup(name='x')").unwrap(), None);
        assert!(write_setup_py("setup(name='x')", "1.0.0").is_err());
    }
}
