//! Manual override: validate a user-supplied target version.

use tracing::{debug, instrument};

use crate::version::{NormalizedVersion, VersionResult};

/// Validate and normalize an explicit version string.
///
/// Accepts `"1.2.3"` or `"v1.2.3"`, with optional prerelease/build parts.
#[instrument]
pub fn validate_explicit(version_str: &str) -> VersionResult<NormalizedVersion> {
    let version = NormalizedVersion::parse(version_str)?;
    debug!(%version, "validated manual version");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_explicit() {
        assert_eq!(
            validate_explicit("1.2.3").unwrap(),
            NormalizedVersion::new(1, 2, 3)
        );
    }

    #[test]
    fn valid_with_prefix_and_prerelease() {
        let v = validate_explicit("v2.0.0-rc.1").unwrap();
        assert_eq!(v.to_string(), "2.0.0-rc.1");
    }

    #[test]
    fn invalid_explicit() {
        assert!(validate_explicit("not-semver").is_err());
        assert!(validate_explicit("2.0").is_err());
    }
}
