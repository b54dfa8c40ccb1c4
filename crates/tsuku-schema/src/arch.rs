//! Target OS and architecture detection.
//!
//! tsuku installs are pinned to a resolved `(os, arch)` pair at plan time.
//! Composites construct download URLs from these, so the string form matters:
//! `as_str` returns the tsuku-internal canonical name, while `map_to` applies
//! the per-vendor naming documented alongside each composite (e.g.
//! `darwin` -> `macos`, `amd64` -> `x64`).

use std::fmt;
use std::str::FromStr;

/// Host operating system, as tsuku names it internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux, any libc.
    Linux,
    /// macOS / Darwin.
    Macos,
    /// Windows.
    Windows,
}

impl Os {
    /// The OS tsuku is currently running on.
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Canonical lowercase name (`linux`, `macos`, `windows`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }

    /// Apply a vendor-specific OS name mapping used in asset-pattern
    /// templates, e.g. `{os|darwin}` for a composite that expects `darwin`
    /// instead of tsuku's canonical `macos`.
    pub fn map_to(&self, vendor: &str) -> String {
        match (self, vendor) {
            (Self::Macos, "darwin") => "darwin".to_string(),
            (Self::Macos, "osx") => "osx".to_string(),
            (Self::Macos, "apple-darwin") => "apple-darwin".to_string(),
            (Self::Windows, "win") => "win".to_string(),
            (Self::Windows, "pc-windows") => "pc-windows".to_string(),
            (Self::Linux, "unknown-linux") => "unknown-linux".to_string(),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Os {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Self::Linux),
            "macos" | "darwin" | "osx" => Ok(Self::Macos),
            "windows" | "win" => Ok(Self::Windows),
            other => Err(format!("unknown OS: {other}")),
        }
    }
}

/// Host CPU architecture, as tsuku names it internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    /// 64-bit ARM (`arm64`/`aarch64`).
    Arm64,
    /// 64-bit x86 (`x86_64`/`amd64`).
    X86_64,
}

impl Arch {
    /// The architecture tsuku is currently running on.
    pub fn current() -> Self {
        if cfg!(target_arch = "aarch64") {
            Self::Arm64
        } else {
            Self::X86_64
        }
    }

    /// Canonical name tsuku uses internally (`arm64`, `x86_64`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arm64 => "arm64",
            Self::X86_64 => "x86_64",
        }
    }

    /// Rust target-triple spelling (`aarch64`, `x86_64`).
    pub fn rust_name(&self) -> &'static str {
        match self {
            Self::Arm64 => "aarch64",
            Self::X86_64 => "x86_64",
        }
    }

    /// Apply a vendor-specific name mapping, e.g. `amd64` instead of
    /// tsuku's canonical `x86_64`, or the condensed `x64` spelling.
    pub fn map_to(&self, vendor: &str) -> String {
        match (self, vendor) {
            (Self::X86_64, "amd64") => "amd64".to_string(),
            (Self::X86_64, "x64") => "x64".to_string(),
            (Self::Arm64, "aarch64") => "aarch64".to_string(),
            (Self::Arm64, "arm") => "arm".to_string(),
            _ => self.as_str().to_string(),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "arm64" | "aarch64" | "arm" => Ok(Self::Arm64),
            "x86_64" | "amd64" | "x64" => Ok(Self::X86_64),
            other => Err(format!("unknown architecture: {other}")),
        }
    }
}
