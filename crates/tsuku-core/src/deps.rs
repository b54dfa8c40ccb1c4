//! Static per-action dependency table: which toolchains an action needs at
//! install time, and which it needs at runtime.
//!
//! Grounded on the teacher's `core::resolver` dependency bookkeeping
//! (name -> required tool mapping used to order installs), narrowed here to
//! a fixed lookup table per spec.md §4.7 rather than a general resolver,
//! since ecosystem build primitives have a small, known set of toolchains.

/// Install-time and runtime dependency names for one action.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionDeps {
    /// Tools that must be present under `$TSUKU_HOME/tools` before this
    /// action executes (feeds `setup_build_env`).
    pub install_time: &'static [&'static str],
    /// Tools the generated runtime wrapper must resolve (feeds the
    /// user-facing wrapper's `PATH`/`LD_LIBRARY_PATH` setup).
    pub runtime: &'static [&'static str],
}

/// Look up the declared dependencies for a primitive or composite action
/// name. Actions with no entry have no declared dependencies.
pub fn action_deps(action_name: &str) -> ActionDeps {
    match action_name {
        "cargo_build" => ActionDeps {
            install_time: &["rust"],
            runtime: &[],
        },
        "go_build" => ActionDeps {
            install_time: &["go"],
            runtime: &[],
        },
        "pip_install" | "pip_exec" => ActionDeps {
            install_time: &["python-standalone"],
            runtime: &["python-standalone"],
        },
        "npm_exec" => ActionDeps {
            install_time: &["nodejs"],
            runtime: &["nodejs"],
        },
        "gem_exec" | "install_gem_direct" => ActionDeps {
            install_time: &["ruby"],
            runtime: &["ruby"],
        },
        "cpan_install" => ActionDeps {
            install_time: &["perl"],
            runtime: &["perl"],
        },
        "configure_make" => ActionDeps {
            install_time: &["make", "zig", "pkg-config"],
            runtime: &[],
        },
        "cmake_build" => ActionDeps {
            install_time: &["cmake", "make"],
            runtime: &[],
        },
        "meson_build" => ActionDeps {
            install_time: &["meson", "ninja"],
            runtime: &[],
        },
        "nix_realize" => ActionDeps {
            install_time: &["nix-portable"],
            runtime: &[],
        },
        _ => ActionDeps::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_ecosystem_actions_declare_their_toolchain() {
        assert_eq!(action_deps("cargo_build").install_time, &["rust"]);
        assert_eq!(action_deps("configure_make").install_time, &["make", "zig", "pkg-config"]);
        assert_eq!(action_deps("cpan_install").runtime, &["perl"]);
    }

    #[test]
    fn unknown_action_has_no_declared_dependencies() {
        let deps = action_deps("download_file");
        assert!(deps.install_time.is_empty());
        assert!(deps.runtime.is_empty());
    }
}
