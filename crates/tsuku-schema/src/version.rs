//! A resolved version string.
//!
//! Resolving `latest`/tag-patterns into a concrete version is the job of the
//! (out-of-scope) version-tag resolver; by the time a `Version` reaches
//! `PlanContext` it is already pinned. This type exists so call sites don't
//! pass bare `String`s around and so `{version}` expansion has one place to
//! read from.

use std::fmt;

/// A pinned version string, e.g. `14.1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct Version(String);

impl Version {
    /// Wrap an already-resolved version string.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// The version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as a [`semver::Version`], when the string happens to be valid
    /// semver (many release tags are, but not all: e.g. Go toolchains use
    /// `go1.22.0`). Callers that need strict ordering should handle the
    /// `None` case rather than assume semver.
    pub fn semver(&self) -> Option<semver_lite::SemVer> {
        semver_lite::SemVer::parse(&self.0)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// A tiny `major.minor.patch[-pre]` parser, kept local rather than pulling
/// in the `semver` crate's full `VersionReq` machinery this crate doesn't
/// need -- `tsuku-core`'s index/resolution layer uses the real `semver`
/// crate where comparison actually drives control flow.
pub mod semver_lite {
    /// A minimally parsed `major.minor.patch` triple with an optional
    /// prerelease suffix, used only for display-order sorting of plain
    /// version strings that aren't routed through full semver resolution.
    #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
    pub struct SemVer {
        /// Major version component.
        pub major: u64,
        /// Minor version component.
        pub minor: u64,
        /// Patch version component.
        pub patch: u64,
    }

    impl SemVer {
        /// Parse a `major.minor.patch` prefix, ignoring any `-pre`/`+build`
        /// suffix and any leading `v`. Returns `None` if the first
        /// component isn't numeric.
        pub fn parse(s: &str) -> Option<Self> {
            let s = s.strip_prefix('v').unwrap_or(s);
            let core = s.split(['-', '+']).next().unwrap_or(s);
            let mut parts = core.split('.');
            let major = parts.next()?.parse().ok()?;
            let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
            Some(Self {
                major,
                minor,
                patch,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn semver_lite_parses_prefixed_versions() {
        let v = Version::new("v14.1.0");
        let sv = v.semver().unwrap();
        assert_eq!((sv.major, sv.minor, sv.patch), (14, 1, 0));
    }

    #[test]
    fn semver_lite_handles_non_numeric_gracefully() {
        let v = Version::new("go1.22.0");
        assert!(v.semver().is_none());
    }
}
