//! Release version extraction.
//!
//! Binaries print versions in several shapes (`dcrd version 1.7.0+release`,
//! `Bitcoin Core version v0.20.1`, `release-v1.6.2`). The first semantic
//! version found anywhere in the text wins.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static RELEASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(v|release-v)?(0|[1-9]\d*)\.(0|[1-9]\d*)\.(0|[1-9]\d*)(-((?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*)(?:\.(?:0|[1-9]\d*|\d*[a-zA-Z-][0-9a-zA-Z-]*))*))?(\+([0-9a-zA-Z-]+(?:\.[0-9a-zA-Z-]+)*))?",
    )
    .expect("release version pattern compiles")
});

/// Text without a recognisable semantic version.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("version string {0:?} does not follow semantic versioning requirements")]
pub struct VersionError(pub String);

/// A semantic version peeled out of free-form text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReleaseVersion(semver::Version);

impl ReleaseVersion {
    /// Find the first semantic version in `text`.
    ///
    /// # Errors
    ///
    /// Returns [`VersionError`] when no version is present.
    pub fn extract(text: &str) -> Result<Self, VersionError> {
        let caps = RELEASE_RE
            .captures(text)
            .ok_or_else(|| VersionError(text.to_string()))?;

        let number = |idx: usize| -> Result<u64, VersionError> {
            caps.get(idx)
                .and_then(|m| m.as_str().parse().ok())
                .ok_or_else(|| VersionError(text.to_string()))
        };

        let mut version = semver::Version::new(number(2)?, number(3)?, number(4)?);
        if let Some(pre) = caps.get(6) {
            version.pre = semver::Prerelease::new(pre.as_str())
                .map_err(|_| VersionError(text.to_string()))?;
        }
        if let Some(build) = caps.get(8) {
            version.build = semver::BuildMetadata::new(build.as_str())
                .map_err(|_| VersionError(text.to_string()))?;
        }
        Ok(Self(version))
    }

    /// The underlying semantic version.
    pub fn semver(&self) -> &semver::Version {
        &self.0
    }
}

/// Renders as `vMAJOR.MINOR.PATCH[-PRE]`; build metadata is not shown.
impl std::fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let v = &self.0;
        write!(f, "v{}.{}.{}", v.major, v.minor, v.patch)?;
        if !v.pre.is_empty() {
            write!(f, "-{}", v.pre)?;
        }
        Ok(())
    }
}
