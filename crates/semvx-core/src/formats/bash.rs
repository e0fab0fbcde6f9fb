//! Shell scripts carrying a version in a comment header.
//!
//! Only whole-line comments of the form `# version: 1.2.3` or
//! `# semv-version: 1.2.3` count. Values built from variables or quotes are
//! not versions. A `v` written before the value is kept on rewrite.

use regex::Regex;

use super::{FormatKind, ParseError, ParseResult};

const VERSION_TAG: &str = r#"(?mi)^([ \t]*#[ \t]*(?:semv-version|version)[ \t]*:[ \t]*)([^\s"'$]+)[ \t\r]*$"#;

/// How many leading lines are searched for the generated sentinel.
const GENERATED_SCAN_LINES: usize = 10;

pub(super) fn read(content: &str) -> ParseResult<Option<String>> {
    let re = Regex::new(VERSION_TAG)?;
    Ok(re.captures(content).map(|caps| caps[2].to_string()))
}

pub(super) fn write(content: &str, new_version: &str) -> ParseResult<String> {
    let re = Regex::new(VERSION_TAG)?;
    let value = re
        .captures(content)
        .and_then(|caps| caps.get(2))
        .ok_or(ParseError::MissingVersion {
            format: FormatKind::Bash,
        })?;
    let prefix = match value.as_str().chars().next() {
        Some(c @ ('v' | 'V')) if !new_version.starts_with(['v', 'V']) => c.to_string(),
        _ => String::new(),
    };
    Ok(format!(
        "{}{prefix}{new_version}{}",
        &content[..value.start()],
        &content[value.end()..]
    ))
}

/// Whether a script declares itself generated (`# generated ...`) near the top.
pub fn is_generated(content: &str) -> bool {
    content.lines().take(GENERATED_SCAN_LINES).any(|line| {
        line.trim_start()
            .strip_prefix('#')
            .is_some_and(|rest| rest.trim_start().to_ascii_lowercase().starts_with("generated"))
    })
}
