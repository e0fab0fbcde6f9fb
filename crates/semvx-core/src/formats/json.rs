//! `package.json`: the top-level `"version"` key.
//!
//! The document is parsed only to validate it. The write itself replaces the
//! bytes of the version string in the original text, so every other byte
//! (spacing, inline arrays, escapes, number spelling) is kept.

use std::ops::Range;

use serde_json::Value;

use super::{FormatKind, ParseError, ParseResult};

pub(super) fn read(content: &str) -> ParseResult<Option<String>> {
    let value: Value = serde_json::from_str(content)?;
    Ok(value
        .get("version")
        .and_then(Value::as_str)
        .map(str::to_string))
}

pub(super) fn write(content: &str, new_version: &str) -> ParseResult<String> {
    let value: Value = serde_json::from_str(content)?;
    let missing = || ParseError::MissingVersion {
        format: FormatKind::PackageJson,
    };
    if !value.get("version").is_some_and(Value::is_string) {
        return Err(missing());
    }
    let span = top_level_version_span(content).ok_or_else(missing)?;

    let mut out = String::with_capacity(content.len() + new_version.len());
    out.push_str(&content[..span.start]);
    out.push_str(new_version);
    out.push_str(&content[span.end..]);
    Ok(out)
}

/// Byte range of the contents of the top-level `"version"` string value.
///
/// The last occurrence wins, matching how the parser treats duplicate keys.
fn top_level_version_span(content: &str) -> Option<Range<usize>> {
    let bytes = content.as_bytes();
    let mut depth = 0usize;
    let mut found = None;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let end = string_end(bytes, i)?;
                if depth == 1 && &content[i + 1..end] == "version" {
                    let colon = skip_whitespace(bytes, end + 1);
                    if bytes.get(colon) == Some(&b':') {
                        let open = skip_whitespace(bytes, colon + 1);
                        if bytes.get(open) == Some(&b'"') {
                            let close = string_end(bytes, open)?;
                            found = Some(open + 1..close);
                            i = close + 1;
                            continue;
                        }
                    }
                }
                i = end + 1;
            }
            b'{' | b'[' => {
                depth += 1;
                i += 1;
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                i += 1;
            }
            _ => i += 1,
        }
    }
    found
}

/// Index of the quote closing the string that opens at `start`.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}
