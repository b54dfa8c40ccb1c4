//! ELF RPATH rewriting via `patchelf`.

use std::path::Path;

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::{validate_rpath, RelocateError};

/// Default rpath token for ELF binaries, per spec.md §4.5.
pub const DEFAULT_RPATH: &str = "$ORIGIN/../lib";

/// Set `binary_path`'s RPATH to `rpath` via `patchelf --set-rpath`.
pub async fn set_rpath(binary_path: &Path, rpath: &str, cancel: &CancellationToken) -> Result<(), RelocateError> {
    validate_rpath(rpath)?;
    run_patchelf(binary_path, &["--set-rpath", rpath], cancel).await
}

/// Whether `patchelf` is available on `PATH`.
pub fn tool_available() -> bool {
    which::which("patchelf").is_ok()
}

async fn run_patchelf(binary_path: &Path, args: &[&str], cancel: &CancellationToken) -> Result<(), RelocateError> {
    let mut cmd = Command::new("patchelf");
    cmd.args(args).arg(binary_path);
    let output = crate::subprocess::output(cmd, cancel).await?;

    if !output.status.success() {
        return Err(RelocateError::SubprocessFailure {
            command: format!("patchelf {}", args.join(" ")),
            exit_code: output.status.code(),
            output: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_invalid_rpath_before_spawning_patchelf() {
        let cancel = CancellationToken::new();
        let err = set_rpath(Path::new("/nonexistent"), "/usr/lib", &cancel).await.unwrap_err();
        assert!(matches!(err, RelocateError::InvalidRpath(_)));
    }
}
