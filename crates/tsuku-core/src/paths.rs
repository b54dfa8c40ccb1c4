//! `$TSUKU_HOME` and the well-known subdirectories under it.
//!
//! Mirrors the teacher's `apl_home()`/`store_path()`/`cache_path()` helpers:
//! a small set of free functions rather than a config struct, since every
//! caller just wants "the tools dir" and threading a config object through
//! the whole crate buys nothing here.

use std::path::PathBuf;

/// `$TSUKU_HOME`, defaulting to `$HOME/.tsuku` when unset.
///
/// # Panics
///
/// Panics if neither `$TSUKU_HOME` nor a home directory can be determined.
/// Every other helper in this module depends on this succeeding, the same
/// assumption the teacher's `apl_home()` makes.
pub fn tsuku_home() -> PathBuf {
    if let Some(dir) = std::env::var_os("TSUKU_HOME") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .expect("could not determine home directory; set $TSUKU_HOME")
        .join(".tsuku")
}

/// `$TSUKU_HOME/tools/<name>-<version>` for a compiled-tool install.
pub fn tool_dir(name: &str, version: &str) -> PathBuf {
    tsuku_home().join("tools").join(format!("{name}-{version}"))
}

/// `$TSUKU_HOME/libs/<name>-<version>` for a library install.
pub fn lib_dir(name: &str, version: &str) -> PathBuf {
    tsuku_home().join("libs").join(format!("{name}-{version}"))
}

/// `$TSUKU_HOME/apps/<name>-<version>.app` for a macOS bundle install.
pub fn app_dir(name: &str, version: &str) -> PathBuf {
    tsuku_home()
        .join("apps")
        .join(format!("{name}-{version}.app"))
}

/// `$TSUKU_HOME/cache/downloads`, the content-addressed download cache.
pub fn download_cache_dir() -> PathBuf {
    tsuku_home().join("cache").join("downloads")
}

/// `$TSUKU_HOME/cache/keys`, the PGP key cache.
pub fn key_cache_dir() -> PathBuf {
    tsuku_home().join("cache").join("keys")
}

/// `$TSUKU_HOME/.nix-internal`, the bootstrapped nix-portable user dir.
pub fn nix_internal_dir() -> PathBuf {
    tsuku_home().join(".nix-internal")
}

/// Whether verbose subprocess/tool output should be logged, per `$TSUKU_DEBUG`.
pub fn debug_enabled() -> bool {
    std::env::var_os("TSUKU_DEBUG").is_some_and(|v| v != "0")
}

#[cfg(test)]
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn tsuku_home_honors_env_override() {
        // SAFETY: test-only env mutation, no other thread in this test touches it.
        unsafe {
            std::env::set_var("TSUKU_HOME", "/tmp/tsuku-test-home");
        }
        assert_eq!(tsuku_home(), PathBuf::from("/tmp/tsuku-test-home"));
        unsafe {
            std::env::remove_var("TSUKU_HOME");
        }
    }

    #[test]
    fn tool_dir_layout() {
        unsafe {
            std::env::set_var("TSUKU_HOME", "/tmp/tsuku-test-home2");
        }
        assert_eq!(
            tool_dir("ripgrep", "14.1.0"),
            PathBuf::from("/tmp/tsuku-test-home2/tools/ripgrep-14.1.0")
        );
        unsafe {
            std::env::remove_var("TSUKU_HOME");
        }
    }
}
