//! Shell wrapper generation, per spec.md §6.
//!
//! Every generated wrapper resolves its own directory via a `readlink`
//! chain so the install tree stays relocatable (invariant P7), then execs
//! the real binary with the right environment exported.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::Path;

use super::RelocateError;

/// The `SCRIPT_DIR` resolution preamble shared by every generated wrapper.
const SCRIPT_DIR_PREAMBLE: &str = r#"resolve_script_dir() {
  src="${BASH_SOURCE[0]}"
  while [ -L "$src" ]; do
    dir="$(cd -P "$(dirname "$src")" >/dev/null 2>&1 && pwd)"
    src="$(readlink "$src")"
    case "$src" in
      /*) ;;
      *) src="$dir/$src" ;;
    esac
  done
  cd -P "$(dirname "$src")" >/dev/null 2>&1 && pwd
}
SCRIPT_DIR="$(resolve_script_dir)"
"#;

/// Write an ecosystem wrapper at `install_dir/bin/<exe_name>` that exports
/// `env` (in insertion order), prepends `path_prepend` entries to `PATH`,
/// and execs `runtime` against `<exe_name>.<ecosystem_suffix>` sitting
/// alongside it.
pub fn write_ecosystem_wrapper(
    bin_dir: &Path,
    exe_name: &str,
    ecosystem_suffix: &str,
    runtime: &str,
    env: &BTreeMap<String, String>,
    path_prepend: &[String],
) -> Result<(), RelocateError> {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str(SCRIPT_DIR_PREAMBLE);

    for (key, value) in env {
        script.push_str(&format!("export {key}=\"{value}\"\n"));
    }
    if !path_prepend.is_empty() {
        let prefix = path_prepend.join(":");
        script.push_str(&format!("export PATH=\"{prefix}:$PATH\"\n"));
    }
    script.push_str(&format!(
        "exec {runtime} \"$SCRIPT_DIR/{exe_name}.{ecosystem_suffix}\" \"$@\"\n"
    ));

    write_executable(&bin_dir.join(exe_name), &script)
}

/// Write a wrapper at `install_dir/bin/<exe_name>` that execs a fixed
/// absolute `target` (e.g. a console script living inside a venv or
/// GEM_HOME tree that isn't renamed alongside the wrapper itself).
pub fn write_absolute_exec_wrapper(
    bin_dir: &Path,
    exe_name: &str,
    target: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(), RelocateError> {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str(SCRIPT_DIR_PREAMBLE);

    for (key, value) in env {
        script.push_str(&format!("export {key}=\"{value}\"\n"));
    }
    script.push_str(&format!("exec \"{}\" \"$@\"\n", target.display()));

    write_executable(&bin_dir.join(exe_name), &script)
}

/// Like [`write_absolute_exec_wrapper`], but runs `target` through an
/// explicit `runtime` interpreter (e.g. `node <script>`) rather than
/// execing it directly.
pub fn write_absolute_exec_wrapper_with_runtime(
    bin_dir: &Path,
    exe_name: &str,
    runtime: &str,
    target: &Path,
    env: &BTreeMap<String, String>,
) -> Result<(), RelocateError> {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str(SCRIPT_DIR_PREAMBLE);

    for (key, value) in env {
        script.push_str(&format!("export {key}=\"{value}\"\n"));
    }
    script.push_str(&format!("exec {runtime} \"{}\" \"$@\"\n", target.display()));

    write_executable(&bin_dir.join(exe_name), &script)
}

/// Write a wrapper that execs `runtime -m <module>`, for interpreted
/// tools invoked as a module rather than a renamed sibling binary (e.g.
/// `pip_exec`'s `python -m black`).
pub fn write_module_exec_wrapper(
    bin_dir: &Path,
    exe_name: &str,
    runtime: &str,
    module: &str,
    env: &BTreeMap<String, String>,
) -> Result<(), RelocateError> {
    let mut script = String::from("#!/bin/bash\n");
    script.push_str(SCRIPT_DIR_PREAMBLE);

    for (key, value) in env {
        script.push_str(&format!("export {key}=\"{value}\"\n"));
    }
    script.push_str(&format!("exec {runtime} -m {module} \"$@\"\n"));

    write_executable(&bin_dir.join(exe_name), &script)
}

/// Write a `nix_realize` wrapper that shells out through `nix-portable` to
/// the locked Nix store path, with `NP_LOCATION` pointed at the isolated
/// nix-portable data directory.
pub fn write_nix_wrapper(
    bin_dir: &Path,
    exe_name: &str,
    locked_ref: &str,
    np_location: &Path,
) -> Result<(), RelocateError> {
    let np_location = np_location.display();
    let script = format!(
        "#!/bin/bash\n{SCRIPT_DIR_PREAMBLE}export NP_LOCATION=\"{np_location}\"\nexec nix-portable nix shell \"{locked_ref}\" --no-update-lock-file -c {exe_name} \"$@\"\n"
    );
    write_executable(&bin_dir.join(exe_name), &script)
}

/// Write a load-library-path fallback wrapper for a plain compiled binary
/// when no RPATH tool is available: sets `LD_LIBRARY_PATH`/
/// `DYLD_LIBRARY_PATH` relative to the script directory and execs the
/// renamed original binary.
pub fn write_library_path_wrapper(bin_dir: &Path, exe_name: &str, lib_rel: &str) -> Result<(), RelocateError> {
    let script = format!(
        "#!/bin/bash\n{SCRIPT_DIR_PREAMBLE}export LD_LIBRARY_PATH=\"$SCRIPT_DIR/{lib_rel}:$LD_LIBRARY_PATH\"\nexport DYLD_LIBRARY_PATH=\"$SCRIPT_DIR/{lib_rel}:$DYLD_LIBRARY_PATH\"\nexec \"$SCRIPT_DIR/{exe_name}.bin\" \"$@\"\n"
    );
    write_executable(&bin_dir.join(exe_name), &script)
}

fn write_executable(path: &Path, script: &str) -> Result<(), RelocateError> {
    let tmp = path.with_extension("tsuku-wrapper-tmp");
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(script.as_bytes())?;
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o755))?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}
