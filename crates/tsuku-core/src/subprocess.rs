//! Cancelable subprocess execution, shared by every external-tool
//! invocation in the tree (ecosystem build drivers, `patchelf`/
//! `install_name_tool`/`otool`, `patch`), mirroring how `download::client`
//! races its transfer loop against a `CancellationToken`.

use std::process::{ExitStatus, Output, Stdio};

use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Spawn `cmd` and capture its output, killing the child and returning an
/// `Interrupted` I/O error if `cancel` fires first.
pub async fn output(mut cmd: Command, cancel: &CancellationToken) -> std::io::Result<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            let _ = child.kill().await;
            Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "subprocess cancelled"))
        }
        result = child.wait_with_output() => result,
    }
}

/// Like [`output`], for a command whose stdout/stderr are already
/// redirected elsewhere (e.g. to a log file) and only the exit status
/// matters.
pub async fn status(mut cmd: Command, cancel: &CancellationToken) -> std::io::Result<ExitStatus> {
    let mut child = cmd.spawn()?;
    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            let _ = child.kill().await;
            Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "subprocess cancelled"))
        }
        result = child.wait() => result,
    }
}
