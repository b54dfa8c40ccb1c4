//! Fuzzy matching of release-asset filenames against the current target.
//!
//! Generalizes the teacher's macOS-only `AssetPattern` (which only knew
//! about Darwin/macOS/osx spellings) to all three supported OSes, since
//! `github_archive` and `homebrew_bottle` now also run on Linux.

/// Recognized OS spellings found in release-asset filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OsVariant {
    /// `darwin`
    Darwin,
    /// `macos`
    MacOS,
    /// `osx`
    Osx,
    /// `linux`
    Linux,
    /// `windows` / `win`
    Windows,
}

/// Recognized architecture spellings found in release-asset filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ArchVariant {
    /// `arm64`
    Arm64,
    /// `aarch64`
    Aarch64,
    /// `x86_64`
    X86_64,
    /// `amd64` / `x64`
    Amd64,
}

/// Recognized archive/compression extensions found in release-asset filenames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExtVariant {
    /// `.tar.gz` / `.tgz`
    TarGz,
    /// `.tar.xz` / `.txz`
    TarXz,
    /// `.tar.bz2` / `.tbz`/`.tbz2`
    TarBz2,
    /// `.tar.zst` / `.tzst`
    TarZst,
    /// `.tar.lz` / `.tlz`
    TarLz,
    /// `.zip`
    Zip,
    /// No recognized archive extension; treated as a raw binary.
    Binary,
}

/// A parsed representation of an asset filename's platform indicators.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AssetPattern {
    /// The OS indicator found in the filename, if any.
    pub os: Option<OsVariant>,
    /// The architecture indicator found in the filename, if any.
    pub arch: Option<ArchVariant>,
    /// The archive/extension indicator found in the filename, if any.
    pub ext: Option<ExtVariant>,
}

impl AssetPattern {
    /// Parse the platform indicators out of a release-asset filename.
    pub fn from_filename(filename: &str) -> Self {
        let f = filename.to_lowercase();

        let os = if f.contains("macos") || f.contains("apple-darwin") {
            Some(OsVariant::MacOS)
        } else if f.contains("darwin") {
            Some(OsVariant::Darwin)
        } else if f.contains("osx") {
            Some(OsVariant::Osx)
        } else if f.contains("linux") {
            Some(OsVariant::Linux)
        } else if f.contains("windows") || f.contains("win64") || f.contains("win32") {
            Some(OsVariant::Windows)
        } else {
            None
        };

        let arch = if f.contains("arm64") {
            Some(ArchVariant::Arm64)
        } else if f.contains("aarch64") {
            Some(ArchVariant::Aarch64)
        } else if f.contains("x86_64") {
            Some(ArchVariant::X86_64)
        } else if f.contains("amd64") || f.contains("x64") {
            Some(ArchVariant::Amd64)
        } else {
            None
        };

        let ext = if f.ends_with(".tar.gz") || f.ends_with(".tgz") {
            Some(ExtVariant::TarGz)
        } else if f.ends_with(".tar.xz") || f.ends_with(".txz") {
            Some(ExtVariant::TarXz)
        } else if f.ends_with(".tar.bz2") || f.ends_with(".tbz2") || f.ends_with(".tbz") {
            Some(ExtVariant::TarBz2)
        } else if f.ends_with(".tar.zst") || f.ends_with(".tzst") {
            Some(ExtVariant::TarZst)
        } else if f.ends_with(".tar.lz") || f.ends_with(".tlz") {
            Some(ExtVariant::TarLz)
        } else if f.ends_with(".zip") {
            Some(ExtVariant::Zip)
        } else if !f.contains('.') {
            Some(ExtVariant::Binary)
        } else {
            None
        };

        Self { os, arch, ext }
    }

    /// Build a pattern describing the current platform, with no extension
    /// preference (used as the "expected" side of [`matches`](Self::matches)).
    pub fn for_target(os: crate::arch::Os, arch: crate::arch::Arch) -> Self {
        let os = Some(match os {
            crate::arch::Os::Macos => OsVariant::MacOS,
            crate::arch::Os::Linux => OsVariant::Linux,
            crate::arch::Os::Windows => OsVariant::Windows,
        });
        let arch = Some(match arch {
            crate::arch::Arch::Arm64 => ArchVariant::Arm64,
            crate::arch::Arch::X86_64 => ArchVariant::X86_64,
        });
        Self {
            os,
            arch,
            ext: None,
        }
    }

    /// Check if `self` (the expected pattern) is semantically satisfied by
    /// `other` (a candidate asset filename's pattern).
    pub fn matches(&self, other: &Self) -> bool {
        let os_match = match (self.os, other.os) {
            (Some(a), Some(b)) => os_equivalent(a, b),
            (None, _) => true,
            (Some(_), None) => false,
        };

        let arch_match = match (self.arch, other.arch) {
            (Some(a), Some(b)) => arch_equivalent(a, b),
            (None, _) => true,
            (Some(_), None) => true,
        };

        let ext_match = match (self.ext, other.ext) {
            (Some(a), Some(b)) => {
                a == b || matches!((a, b), (ExtVariant::Zip, ExtVariant::TarGz) | (ExtVariant::TarGz, ExtVariant::Zip))
            }
            (None, _) => true,
            (Some(_), None) => false,
        };

        os_match && arch_match && ext_match
    }
}

fn os_equivalent(a: OsVariant, b: OsVariant) -> bool {
    use OsVariant::{Darwin, Linux, MacOS, Osx, Windows};
    matches!(
        (a, b),
        (MacOS | Darwin | Osx, MacOS | Darwin | Osx) | (Linux, Linux) | (Windows, Windows)
    )
}

fn arch_equivalent(a: ArchVariant, b: ArchVariant) -> bool {
    use ArchVariant::{Aarch64, Amd64, Arm64, X86_64};
    matches!(
        (a, b),
        (Arm64 | Aarch64, Arm64 | Aarch64) | (X86_64 | Amd64, X86_64 | Amd64)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::{Arch, Os};

    #[test]
    fn parses_common_asset_names() {
        let p = AssetPattern::from_filename("ripgrep-14.1.0-x86_64-unknown-linux-musl.tar.gz");
        assert_eq!(p.os, Some(OsVariant::Linux));
        assert_eq!(p.arch, Some(ArchVariant::X86_64));
        assert_eq!(p.ext, Some(ExtVariant::TarGz));
    }

    #[test]
    fn equivalence_classes_match_across_vendors() {
        let expected = AssetPattern::for_target(Os::Macos, Arch::Arm64);
        let candidate = AssetPattern::from_filename("tool-darwin-aarch64.tar.gz");
        assert!(expected.matches(&candidate));

        let wrong_arch = AssetPattern::from_filename("tool-darwin-x86_64.tar.gz");
        assert!(!expected.matches(&wrong_arch));
    }

    #[test]
    fn missing_extension_in_candidate_fails_when_expected() {
        let mut expected = AssetPattern::for_target(Os::Linux, Arch::X86_64);
        expected.ext = Some(ExtVariant::TarGz);
        let candidate = AssetPattern::from_filename("tool-linux-x86_64");
        assert!(!expected.matches(&candidate));
    }
}
