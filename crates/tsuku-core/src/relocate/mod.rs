//! Binary relocation: ELF RPATH / Mach-O load-command rewriting, Homebrew
//! placeholder substitution, and runtime wrapper generation.
//!
//! Grounded on the teacher's `core::relinker` (`install_name_tool`
//! subprocess wrapper), generalized per spec.md §4.6 to also cover ELF via
//! `patchelf`, binary-format detection by magic bytes, and text/binary
//! placeholder replacement.

pub mod detect;
pub mod elf;
pub mod macho;
pub mod placeholder;
pub mod wrapper;

use thiserror::Error;

pub use detect::BinaryFormat;

/// Errors from any relocation primitive.
#[derive(Error, Debug)]
pub enum RelocateError {
    /// I/O failure reading or writing a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The platform RPATH tool (`patchelf`, `install_name_tool`, `otool`)
    /// wasn't found and no wrapper fallback was requested.
    #[error("no rpath tool available for {format:?} and create_wrapper=false")]
    NoToolAvailable {
        /// The binary format that needed a tool.
        format: BinaryFormat,
    },

    /// An external tool exited non-zero.
    #[error("'{command}' failed (exit {exit_code:?}): {output}")]
    SubprocessFailure {
        /// The command invoked.
        command: String,
        /// Its exit code, if it ran to completion.
        exit_code: Option<i32>,
        /// Captured combined stdout+stderr.
        output: String,
    },

    /// An rpath value didn't match the accepted prefix set, or contained a
    /// `:` (multiple paths), per spec.md §4.5.
    #[error("invalid rpath value '{0}'")]
    InvalidRpath(String),
}

/// Accepted rpath value prefixes, per spec.md §4.5.
const ALLOWED_RPATH_PREFIXES: &[&str] = &["@executable_path", "@loader_path", "@rpath", "$ORIGIN"];

/// Validate an rpath value: must start with one of the accepted tokens and
/// must not contain `:` (which would encode multiple paths).
pub fn validate_rpath(value: &str) -> Result<(), RelocateError> {
    if value.contains(':') {
        return Err(RelocateError::InvalidRpath(value.to_string()));
    }
    if ALLOWED_RPATH_PREFIXES.iter().any(|p| value.starts_with(p)) {
        Ok(())
    } else {
        Err(RelocateError::InvalidRpath(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_rpath_tokens() {
        assert!(validate_rpath("$ORIGIN/../lib").is_ok());
        assert!(validate_rpath("@loader_path/../lib").is_ok());
        assert!(validate_rpath("@executable_path/../lib").is_ok());
    }

    #[test]
    fn rejects_multi_path_and_unknown_prefix() {
        assert!(validate_rpath("$ORIGIN/../lib:/usr/lib").is_err());
        assert!(validate_rpath("/usr/lib").is_err());
    }
}
