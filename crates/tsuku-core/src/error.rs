//! The error taxonomy shared by every stage of planning and execution.
//!
//! Mirrors the teacher's `InstallError` aggregation pattern: each module
//! (`download`, `archive`, `verify`, ...) owns a focused `thiserror` enum,
//! and this top-level `TsukuError` collects them with `#[from]` so call
//! sites in `action`/`ops`-equivalent code can just use `?`.

use thiserror::Error;

/// The aggregate error type returned by planning and execution.
#[derive(Error, Debug)]
pub enum TsukuError {
    /// A recipe or step parameter was missing or malformed. Surfaced by
    /// `Action::preflight`, before any side effect occurs.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A checksum, PGP signature, or fingerprint check failed.
    #[error("verification failed: {0}")]
    VerificationFailure(#[from] crate::verify::VerifyError),

    /// An archive tried to write outside its destination directory.
    #[error("archive security violation: {0}")]
    ArchiveSecurity(String),

    /// A network operation failed in a way that retries won't fix.
    #[error("network error: {0}")]
    NetworkError(#[from] crate::download::DownloadError),

    /// An external tool (patch, patchelf, cargo, ...) exited non-zero.
    #[error("subprocess '{command}' failed (exit {exit_code:?}): {output}")]
    SubprocessFailure {
        /// The command that was run, for diagnostics.
        command: String,
        /// Its exit code, if the process ran to completion.
        exit_code: Option<i32>,
        /// Captured combined stdout+stderr, secret-scrubbed by the caller.
        output: String,
    },

    /// The action doesn't support the current OS/arch (e.g. `app_bundle`
    /// outside macOS, `nix_realize` outside Linux).
    #[error("{action} is not supported on {os}/{arch}")]
    PlatformUnsupported {
        /// The action name.
        action: String,
        /// The unsupported OS.
        os: String,
        /// The unsupported architecture.
        arch: String,
    },

    /// A required system package is absent and the action's host policy
    /// doesn't install it itself (that remains the system-package-manager
    /// wrappers' job -- this variant just carries what they'd need).
    #[error("missing system package(s): {packages:?}")]
    DependencyMissing {
        /// Package names the host is missing.
        packages: Vec<String>,
        /// Packaging family tag (e.g. `"deb"`, `"rpm"`, `"brew"`).
        family: String,
        /// A suggested install command, for display only; never executed.
        install_command: String,
    },

    /// Decomposition revisited an already-visited `(action, params)`
    /// fingerprint.
    #[error("cycle detected while decomposing '{action}'")]
    Cycle {
        /// The action name at which the cycle was detected.
        action: String,
    },

    /// Extraction-specific failure, not already covered by `ArchiveSecurity`.
    #[error("archive error: {0}")]
    Archive(#[from] crate::archive::ExtractError),

    /// RPATH rewriting or wrapper generation failed.
    #[error("relocation error: {0}")]
    Relocate(#[from] crate::relocate::RelocateError),

    /// Execution or cancellation was aborted by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Catch-all for I/O failures that don't warrant their own variant.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TsukuError {
    /// Construct an [`TsukuError::InvalidParam`] with context, mirroring the
    /// teacher's `InstallError::context` helper.
    pub fn invalid_param(context: impl std::fmt::Display, detail: impl std::fmt::Display) -> Self {
        Self::InvalidParam(format!("{context}: {detail}"))
    }
}

/// The outcome of `Action::preflight`: errors abort plan execution before
/// any side effect; warnings are merely reported.
#[derive(Debug, Clone, Default)]
pub struct PreflightResult {
    /// Fatal problems; any non-empty `errors` aborts the plan.
    pub errors: Vec<String>,
    /// Non-fatal problems; reported but never abort the plan.
    pub warnings: Vec<String>,
}

impl PreflightResult {
    /// An empty, passing result.
    pub fn ok() -> Self {
        Self::default()
    }

    /// True if no errors were recorded (warnings don't affect this).
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record a fatal error.
    pub fn error(&mut self, msg: impl Into<String>) {
        self.errors.push(msg.into());
    }

    /// Record a non-fatal warning.
    pub fn warn(&mut self, msg: impl Into<String>) {
        self.warnings.push(msg.into());
    }

    /// Merge another result's errors and warnings into this one.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_merge_combines_both_lists() {
        let mut a = PreflightResult::ok();
        a.warn("a warning");
        let mut b = PreflightResult::ok();
        b.error("a problem");
        a.merge(b);
        assert!(!a.is_ok());
        assert_eq!(a.warnings.len(), 1);
        assert_eq!(a.errors.len(), 1);
    }
}
