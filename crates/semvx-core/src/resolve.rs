//! Version authority resolution: "highest wins".
//!
//! [`resolve`] is a pure function. Given every detected source, the latest
//! release tag, the version calculated from commits, and an optional manual
//! override, it selects one target version, names the category that
//! supplied it, and classifies how the candidates disagree.
//!
//! Precedence: a manual override always wins. Otherwise the target is the
//! maximum candidate under semver ordering, with ties going to package
//! sources, then the tag, then the calculated version.

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::detect::VersionSource;
use crate::version::NormalizedVersion;

/// Which candidate category produced the target version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Authority {
    /// A user-supplied override.
    Manual,
    /// A detected package source (manifest or script header).
    Package,
    /// The latest release tag.
    GitTag,
    /// The tag (or zero baseline) bumped by commit impact.
    Calculated,
    /// Nothing to resolve.
    None,
}

/// How the candidates disagree with the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Drift {
    /// A release tag exists and every candidate equals the target.
    Aligned,
    /// A package source holds the target; the tag is lower or missing.
    PackageAhead,
    /// The tag holds the target; every package source is lower.
    GitAhead,
    /// Only the calculated version reaches the target.
    CalculatedHigher,
    /// No candidate exists.
    NoSources,
    /// Any other combination.
    Unknown,
}

impl Authority {
    /// The snake_case name used in JSON output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Package => "package",
            Self::GitTag => "git_tag",
            Self::Calculated => "calculated",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Drift {
    /// The snake_case name used in JSON output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Aligned => "aligned",
            Self::PackageAhead => "package_ahead",
            Self::GitAhead => "git_ahead",
            Self::CalculatedHigher => "calculated_higher",
            Self::NoSources => "no_sources",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Drift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    /// The selected version, if any candidate exists.
    pub target: Option<NormalizedVersion>,
    /// Where the target came from.
    pub authority: Authority,
    /// The package file that supplied the target, for [`Authority::Package`].
    pub authority_source: Option<Utf8PathBuf>,
    /// Disagreement classification (informational only).
    pub drift: Drift,
}

/// Select the target version from all candidates.
#[instrument(skip_all, fields(sources = sources.len(), ?git_tag, ?calculated, ?manual))]
pub fn resolve(
    sources: &[VersionSource],
    git_tag: Option<&NormalizedVersion>,
    calculated: Option<&NormalizedVersion>,
    manual: Option<&NormalizedVersion>,
) -> Resolution {
    // first detected source wins among equals
    let top_source = sources.iter().fold(None::<&VersionSource>, |best, s| match best {
        Some(b) if b.version >= s.version => Some(b),
        _ => Some(s),
    });

    let (target, authority, authority_source) = if let Some(m) = manual {
        (Some(m.clone()), Authority::Manual, None)
    } else {
        // candidates in tie-break order; only a strictly greater version displaces
        let ordered = [
            top_source.map(|s| (&s.version, Authority::Package, Some(s.path.clone()))),
            git_tag.map(|t| (t, Authority::GitTag, None)),
            calculated.map(|c| (c, Authority::Calculated, None)),
        ];
        ordered
            .into_iter()
            .flatten()
            .fold(None::<(&NormalizedVersion, Authority, Option<Utf8PathBuf>)>, |best, c| match best {
                Some(b) if b.0 >= c.0 => Some(b),
                _ => Some(c),
            })
            .map_or((None, Authority::None, None), |(v, a, p)| (Some(v.clone()), a, p))
    };

    let drift = target
        .as_ref()
        .map_or(Drift::NoSources, |t| classify_drift(t, sources, git_tag, calculated));

    debug!(?target, ?authority, ?drift, "resolved version authority");
    Resolution {
        target,
        authority,
        authority_source,
        drift,
    }
}

fn classify_drift(
    target: &NormalizedVersion,
    sources: &[VersionSource],
    git_tag: Option<&NormalizedVersion>,
    calculated: Option<&NormalizedVersion>,
) -> Drift {
    if sources.is_empty() && git_tag.is_none() && calculated.is_none() {
        return Drift::NoSources;
    }

    let at_target = |v: &NormalizedVersion| v == target;
    let package_at = sources.iter().any(|s| at_target(&s.version));
    let all_packages_at = sources.iter().all(|s| at_target(&s.version));
    let tag_at = git_tag.is_some_and(at_target);
    let calculated_at = calculated.is_some_and(at_target);

    if tag_at && all_packages_at && calculated.is_none_or(at_target) {
        Drift::Aligned
    } else if package_at && !tag_at {
        Drift::PackageAhead
    } else if tag_at && !package_at {
        Drift::GitAhead
    } else if calculated_at && !package_at && !tag_at {
        Drift::CalculatedHigher
    } else {
        Drift::Unknown
    }
}
