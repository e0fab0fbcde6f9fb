//! Version parsing, ordering and bump computation.
//!
//! Every version that enters the engine (manifest field, bash header, git
//! tag, manual override) is normalized into a [`NormalizedVersion`] first.
//! Comparison works on the integer triple plus prerelease identifiers only;
//! build metadata never influences ordering.

pub mod classify;
pub mod explicit;

use std::cmp::Ordering;
use std::fmt;

use semver::Version;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors from version operations.
#[derive(Error, Debug)]
pub enum VersionError {
    /// Failed to parse a semver string.
    #[error("invalid semver `{input}`: {source}")]
    InvalidSemver {
        /// The rejected input.
        input: String,
        /// Underlying parser error.
        #[source]
        source: semver::Error,
    },

    /// A bump would push a component past `u64::MAX`.
    #[error("cannot apply a {impact} bump to {version}: component overflow")]
    Overflow {
        /// The version being bumped.
        version: String,
        /// The rejected impact.
        impact: Impact,
    },
}

/// Result alias for version operations.
pub type VersionResult<T> = Result<T, VersionError>;

/// A semantic version in canonical form.
///
/// Equality and ordering follow semver precedence: `(major, minor, patch)`
/// compared numerically, then a prerelease sorts below the same triple
/// without one. Build metadata is carried for display but ignored when
/// comparing.
#[derive(Debug, Clone)]
pub struct NormalizedVersion(Version);

impl NormalizedVersion {
    /// Build a release version from its numeric parts.
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(Version::new(major, minor, patch))
    }

    /// The implicit baseline used when a repository has no release yet.
    pub const fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    /// Parse a version string, stripping an optional `v`/`V` prefix and
    /// surrounding whitespace.
    pub fn parse(input: &str) -> VersionResult<Self> {
        let trimmed = input.trim();
        let bare = trimmed
            .strip_prefix(['v', 'V'])
            .unwrap_or(trimmed);
        Version::parse(bare)
            .map(Self)
            .map_err(|source| VersionError::InvalidSemver {
                input: input.to_string(),
                source,
            })
    }

    /// Borrow the underlying [`semver::Version`].
    pub const fn as_semver(&self) -> &Version {
        &self.0
    }

    /// Whether this version carries prerelease identifiers.
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// Render as a tag name with the given prefix (e.g. `v1.2.3`).
    pub fn tag_name(&self, prefix: &str) -> String {
        format!("{prefix}{self}")
    }

    /// The same version with build metadata stripped.
    pub fn without_build(&self) -> Self {
        let mut v = self.0.clone();
        v.build = semver::BuildMetadata::EMPTY;
        Self(v)
    }
}

impl From<Version> for NormalizedVersion {
    fn from(version: Version) -> Self {
        Self(version)
    }
}

impl fmt::Display for NormalizedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl PartialEq for NormalizedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for NormalizedVersion {}

impl PartialOrd for NormalizedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for NormalizedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (&self.0, &other.0);
        a.major
            .cmp(&b.major)
            .then(a.minor.cmp(&b.minor))
            .then(a.patch.cmp(&b.patch))
            // semver's Prerelease ordering places the empty prerelease last
            .then_with(|| a.pre.cmp(&b.pre))
    }
}

impl Serialize for NormalizedVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NormalizedVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Release impact of a commit (or of a whole commit range).
///
/// Variants are declared lowest first so the derived ordering matches
/// precedence: `major > minor > patch > dev > none`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// No release-worthy change.
    #[default]
    None,
    /// Development note; released as a patch.
    Dev,
    /// Patch release (x.y.Z).
    Patch,
    /// Minor release (x.Y.0).
    Minor,
    /// Major release (X.0.0).
    Major,
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Dev => "dev",
            Self::Patch => "patch",
            Self::Minor => "minor",
            Self::Major => "major",
        };
        f.write_str(s)
    }
}

/// Compute the next version by applying an impact to `base`.
///
/// `dev` bumps the patch component like `patch`. `none` returns `base`
/// unchanged. Any other bump drops prerelease and build metadata.
///
/// # Errors
///
/// Returns [`VersionError::Overflow`] when the bumped component is already
/// `u64::MAX`.
pub fn next_version(base: &NormalizedVersion, impact: Impact) -> VersionResult<NormalizedVersion> {
    let v = base.as_semver();
    let overflow = || VersionError::Overflow {
        version: base.to_string(),
        impact,
    };
    let next = match impact {
        Impact::None => return Ok(base.clone()),
        Impact::Dev | Impact::Patch => {
            NormalizedVersion::new(v.major, v.minor, v.patch.checked_add(1).ok_or_else(overflow)?)
        }
        Impact::Minor => {
            NormalizedVersion::new(v.major, v.minor.checked_add(1).ok_or_else(overflow)?, 0)
        }
        Impact::Major => NormalizedVersion::new(v.major.checked_add(1).ok_or_else(overflow)?, 0, 0),
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> NormalizedVersion {
        NormalizedVersion::parse(s).unwrap()
    }

    #[test]
    fn parse_with_v_prefix() {
        assert_eq!(v("v1.2.3"), NormalizedVersion::new(1, 2, 3));
        assert_eq!(v("V1.2.3"), NormalizedVersion::new(1, 2, 3));
    }

    #[test]
    fn display_is_canonical() {
        assert_eq!(v(" v1.2.3-rc.1+build.5 ").to_string(), "1.2.3-rc.1+build.5");
        assert_eq!(v("0.0.1").to_string(), "0.0.1");
    }

    #[test]
    fn parse_invalid() {
        assert!(NormalizedVersion::parse("not-a-version").is_err());
        assert!(NormalizedVersion::parse("1.2").is_err());
        assert!(NormalizedVersion::parse("").is_err());
    }

    #[test]
    fn numeric_components_compare_as_integers() {
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("2.0.0") > v("1.99.99"));
        assert!(v("0.0.10") > v("0.0.9"));
    }

    #[test]
    fn prerelease_sorts_below_release() {
        assert!(v("1.0.0-alpha") < v("1.0.0"));
        assert!(v("1.0.0-alpha") < v("1.0.0-beta"));
        assert!(v("1.0.0-rc.2") < v("1.0.0-rc.10"));
        assert!(v("1.0.0") < v("1.0.1-alpha"));
    }

    #[test]
    fn build_metadata_is_ignored() {
        assert_eq!(v("1.2.3+abc"), v("1.2.3+def"));
        assert_eq!(v("1.2.3+abc"), v("1.2.3"));
        assert_eq!(v("1.2.3+abc").without_build().to_string(), "1.2.3");
    }

    #[test]
    fn serializes_as_string() {
        let json = serde_json::to_string(&v("v3.1.4")).unwrap();
        assert_eq!(json, "\"3.1.4\"");
        let back: NormalizedVersion = serde_json::from_str("\"v3.1.4\"").unwrap();
        assert_eq!(back, NormalizedVersion::new(3, 1, 4));
    }

    #[test]
    fn impact_precedence() {
        assert!(Impact::Major > Impact::Minor);
        assert!(Impact::Minor > Impact::Patch);
        assert!(Impact::Patch > Impact::Dev);
        assert!(Impact::Dev > Impact::None);
    }

    #[test]
    fn bump_each_impact() {
        let base = v("1.2.3");
        assert_eq!(next_version(&base, Impact::Major).unwrap(), v("2.0.0"));
        assert_eq!(next_version(&base, Impact::Minor).unwrap(), v("1.3.0"));
        assert_eq!(next_version(&base, Impact::Patch).unwrap(), v("1.2.4"));
        assert_eq!(next_version(&base, Impact::Dev).unwrap(), v("1.2.4"));
        assert_eq!(next_version(&base, Impact::None).unwrap(), base);
    }

    #[test]
    fn bump_from_zero() {
        let zero = NormalizedVersion::zero();
        assert_eq!(next_version(&zero, Impact::Minor).unwrap(), v("0.1.0"));
        assert_eq!(next_version(&zero, Impact::Patch).unwrap(), v("0.0.1"));
    }

    #[test]
    fn bump_past_u64_max_is_an_error() {
        let max = u64::MAX;
        let at_max = NormalizedVersion::new(max, max, max);
        for impact in [Impact::Major, Impact::Minor, Impact::Patch, Impact::Dev] {
            let err = next_version(&at_max, impact).unwrap_err();
            assert!(matches!(err, VersionError::Overflow { .. }), "{impact}");
        }
        assert_eq!(next_version(&at_max, Impact::None).unwrap(), at_max);

        let patch_max = NormalizedVersion::new(1, 2, max);
        assert_eq!(next_version(&patch_max, Impact::Minor).unwrap(), v("1.3.0"));
    }

    #[test]
    fn bump_clears_prerelease() {
        let base = v("1.2.3-beta.1+sha");
        let next = next_version(&base, Impact::Patch).unwrap();
        assert_eq!(next.to_string(), "1.2.4");
        assert!(!next.is_prerelease());
    }

    #[test]
    fn tag_name_uses_prefix() {
        assert_eq!(v("1.2.5").tag_name("v"), "v1.2.5");
        assert_eq!(v("1.2.5").tag_name(""), "1.2.5");
    }
}
