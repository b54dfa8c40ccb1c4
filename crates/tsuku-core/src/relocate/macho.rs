//! Mach-O RPATH rewriting via `install_name_tool`/`otool`.
//!
//! Grounded on the teacher's `core::relinker` (`install_name_tool`
//! subprocess wrapper pattern), generalized with `otool -l` load-command
//! parsing and `codesign` re-signing for Apple Silicon.

use std::path::Path;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{validate_rpath, RelocateError};

/// Default rpath token for Mach-O binaries, per spec.md §4.5.
pub const DEFAULT_RPATH: &str = "@executable_path/../lib";

/// Whether `install_name_tool` and `otool` are both available on `PATH`.
pub fn tool_available() -> bool {
    which::which("install_name_tool").is_ok() && which::which("otool").is_ok()
}

/// Existing `LC_RPATH` entries on `binary_path`, read via `otool -l`.
///
/// Parses line-by-line: an `cmd LC_RPATH` line is followed a couple of
/// lines later by `path <value> (offset N)`; the `(offset …)` suffix is
/// stripped.
pub async fn existing_rpaths(binary_path: &Path, cancel: &CancellationToken) -> Result<Vec<String>, RelocateError> {
    let mut cmd = Command::new("otool");
    cmd.arg("-l").arg(binary_path);
    let output = crate::subprocess::output(cmd, cancel).await?;
    if !output.status.success() {
        return Err(RelocateError::SubprocessFailure {
            command: "otool -l".to_string(),
            exit_code: output.status.code(),
            output: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut rpaths = Vec::new();
    let mut in_rpath_command = false;
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed == "cmd LC_RPATH" {
            in_rpath_command = true;
            continue;
        }
        if in_rpath_command {
            if let Some(rest) = trimmed.strip_prefix("path ") {
                let value = rest.split(" (offset").next().unwrap_or(rest).trim();
                rpaths.push(value.to_string());
                in_rpath_command = false;
            }
        }
    }
    Ok(rpaths)
}

/// Replace any existing Homebrew-style rpath with `rpath`: deletes every
/// entry containing `HOMEBREW` (best-effort, ignoring failures since a
/// stale entry may already be gone), then adds `rpath`.
pub async fn set_rpath(binary_path: &Path, rpath: &str, cancel: &CancellationToken) -> Result<(), RelocateError> {
    validate_rpath(rpath)?;

    for existing in existing_rpaths(binary_path, cancel).await? {
        if existing.contains("HOMEBREW") {
            let _ = run_install_name_tool(binary_path, &["-delete_rpath", &existing], cancel).await;
        }
    }

    run_install_name_tool(binary_path, &["-add_rpath", rpath], cancel).await?;
    resign_best_effort(binary_path, cancel).await;
    Ok(())
}

/// Ad-hoc re-sign `path` after mutation, required on Apple Silicon for the
/// binary to keep executing. Failures are swallowed: `codesign` may be
/// absent on non-macOS hosts running these code paths in tests.
async fn resign_best_effort(path: &Path, cancel: &CancellationToken) {
    let mut cmd = Command::new("codesign");
    cmd.args(["-f", "-s", "-"]).arg(path);
    let _ = crate::subprocess::output(cmd, cancel).await;
}

async fn run_install_name_tool(path: &Path, args: &[&str], cancel: &CancellationToken) -> Result<(), RelocateError> {
    let mut cmd = Command::new("install_name_tool");
    cmd.args(args).arg(path);
    let output = crate::subprocess::output(cmd, cancel).await?;

    if !output.status.success() {
        return Err(RelocateError::SubprocessFailure {
            command: format!("install_name_tool {}", args.join(" ")),
            exit_code: output.status.code(),
            output: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rpath_lines_from_otool_output() {
        let text = "\
Load command 7
      cmd LC_RPATH
  cmdsize 32
     path @loader_path/../lib (offset 12)
Load command 8
      cmd LC_RPATH
     path /opt/homebrew/Cellar/foo/1.0/lib (offset 12)
";
        let mut rpaths = Vec::new();
        let mut in_rpath_command = false;
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed == "cmd LC_RPATH" {
                in_rpath_command = true;
                continue;
            }
            if in_rpath_command {
                if let Some(rest) = trimmed.strip_prefix("path ") {
                    let value = rest.split(" (offset").next().unwrap_or(rest).trim();
                    rpaths.push(value.to_string());
                    in_rpath_command = false;
                }
            }
        }
        assert_eq!(rpaths, vec!["@loader_path/../lib", "/opt/homebrew/Cellar/foo/1.0/lib"]);
    }

    #[tokio::test]
    async fn rejects_invalid_rpath_before_spawning_tool() {
        let cancel = CancellationToken::new();
        let err = set_rpath(Path::new("/nonexistent"), "/usr/lib", &cancel).await.unwrap_err();
        assert!(matches!(err, RelocateError::InvalidRpath(_)));
    }
}
