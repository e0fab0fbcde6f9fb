//! Commit message classification.
//!
//! Each commit is labeled by the colon-terminated token leading its subject
//! line (`feat: add x`, `fix(parser): y`, `breaking: z`). Labels are matched
//! case-insensitively against four disjoint sets. A conventional `(scope)`
//! is dropped before lookup and a trailing `!` marks a breaking change.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::version::Impact;

const MAJOR_LABELS: &[&str] = &["major", "breaking", "api", "arch", "ux"];
const MINOR_LABELS: &[&str] = &["feat", "feature", "add", "minor", "ref", "mrg"];
const PATCH_LABELS: &[&str] = &["fix", "patch", "bug", "hotfix", "up", "imp", "qol", "stb"];
const DEV_LABELS: &[&str] = &["dev"];

/// Labels that are recognized but never contribute impact.
const IGNORE_LABELS: &[&str] = &["doc", "admin", "lic", "clean", "x"];

/// Priority-ordered label table, highest impact first.
const LABEL_TABLE: &[(Impact, &[&str])] = &[
    (Impact::Major, MAJOR_LABELS),
    (Impact::Minor, MINOR_LABELS),
    (Impact::Patch, PATCH_LABELS),
    (Impact::Dev, DEV_LABELS),
];

/// A commit together with its classified impact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    /// Abbreviated commit hash.
    pub hash: String,
    /// Commit subject line.
    pub message: String,
    /// Classified impact.
    pub impact: Impact,
}

impl CommitRecord {
    /// Classify a single commit.
    pub fn new(hash: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        let impact = classify_message(&message);
        Self {
            hash: hash.into(),
            message,
            impact,
        }
    }
}

/// Extract the label from a subject line, lowercased.
///
/// Returns the label and whether it carried a breaking `!` marker, or `None`
/// when the subject has no leading label token.
fn leading_label(message: &str) -> Option<(String, bool)> {
    let subject = message.lines().next()?.trim();
    let (token, _) = subject.split_once(':')?;
    let (token, breaking) = token
        .strip_suffix('!')
        .map_or((token, false), |t| (t, true));
    let label = token.split_once('(').map_or(token, |(head, _)| head);

    if label.is_empty() || label.chars().any(char::is_whitespace) {
        return None;
    }
    Some((label.to_ascii_lowercase(), breaking))
}

/// Classify one commit message.
///
/// Unlabeled messages and messages carrying an ignore label classify as
/// [`Impact::None`].
pub fn classify_message(message: &str) -> Impact {
    let Some((label, breaking)) = leading_label(message) else {
        return Impact::None;
    };

    if IGNORE_LABELS.contains(&label.as_str()) {
        return Impact::None;
    }

    let impact = LABEL_TABLE
        .iter()
        .find(|(_, labels)| labels.contains(&label.as_str()))
        .map_or(Impact::None, |(impact, _)| *impact);

    if breaking && impact != Impact::None {
        Impact::Major
    } else {
        impact
    }
}

/// Classify a batch of `(hash, message)` commits.
#[instrument(skip_all, fields(count = commits.len()))]
pub fn classify_commits<H, M>(commits: &[(H, M)]) -> Vec<CommitRecord>
where
    H: AsRef<str>,
    M: AsRef<str>,
{
    commits
        .iter()
        .map(|(hash, message)| CommitRecord::new(hash.as_ref(), message.as_ref()))
        .collect()
}

/// The highest impact observed across `records`.
///
/// An empty range has impact [`Impact::None`].
pub fn aggregate(records: &[CommitRecord]) -> Impact {
    let impact = records
        .iter()
        .map(|r| r.impact)
        .max()
        .unwrap_or_default();
    debug!(%impact, commits = records.len(), "aggregated commit impact");
    impact
}
