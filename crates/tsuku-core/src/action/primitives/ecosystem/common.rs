//! Shared recipe behind every ecosystem build primitive, per spec.md §4.5:
//! locate the toolchain, build a deterministic environment, run under
//! `--locked --offline` (or the ecosystem's equivalent), then verify the
//! expected executables landed in `install_dir/bin`.
//!
//! Grounded on the teacher's `core::builder::Builder::build` (env
//! construction, `Command` invocation, log-tail-on-failure).

use std::collections::BTreeMap;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

use crate::action::context::ExecutionContext;
use crate::error::TsukuError;

/// Find `<dir>/<name>-*` sorted lexicographically, latest wins, requiring
/// an executable `bin/<bin_name>` inside.
pub fn find_toolchain(dir: &Path, name: &str, bin_name: &str) -> Option<PathBuf> {
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(&format!("{name}-")))
        })
        .collect();
    candidates.sort();

    candidates.into_iter().rev().find(|root| is_executable(&root.join("bin").join(bin_name)))
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}

/// The deterministic environment vars common to every ecosystem build,
/// per spec.md §4.5: `SOURCE_DATE_EPOCH=0`, plus whichever
/// reproducibility knobs the caller adds on top.
pub fn base_deterministic_env() -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    env.insert("SOURCE_DATE_EPOCH".to_string(), "0".to_string());
    env
}

/// Run `program` with `args` in `cwd`, merging `env` over the current
/// process environment, and tail the log on failure. `ctx`'s accumulated
/// `env`/`exec_paths` (from `setup_build_env`/`link_dependencies`) are
/// applied first so ecosystem-specific vars can still override them.
/// Cancelling `ctx.cancellation` kills the child, same as an aborted
/// network transfer in `download::client`.
pub async fn run_build_command(
    ctx: &ExecutionContext,
    program: &str,
    args: &[&str],
    cwd: &Path,
    env: &BTreeMap<String, String>,
    log_path: &Path,
) -> Result<(), TsukuError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cmd = Command::new(program);
    cmd.args(args).current_dir(cwd);

    for (key, value) in ctx.env_snapshot() {
        cmd.env(key, value);
    }
    let exec_paths = ctx.exec_paths_snapshot();
    if !exec_paths.is_empty() {
        let joined = std::env::join_paths(exec_paths.iter().chain(std::iter::once(&PathBuf::from(
            std::env::var("PATH").unwrap_or_default(),
        ))))
        .map_err(|e| TsukuError::invalid_param("ecosystem build", e.to_string()))?;
        cmd.env("PATH", joined);
    }
    for (key, value) in env {
        cmd.env(key, value);
    }

    let log_file = std::fs::File::create(log_path)?;
    cmd.stdout(Stdio::from(log_file.try_clone()?)).stderr(Stdio::from(log_file));

    let status = crate::subprocess::status(cmd, &ctx.cancellation).await?;
    if !status.success() {
        let tail = read_last_lines(log_path, 20).unwrap_or_default();
        return Err(TsukuError::SubprocessFailure {
            command: format!("{program} {}", args.join(" ")),
            exit_code: status.code(),
            output: tail,
        });
    }
    Ok(())
}

fn read_last_lines(path: &Path, n: usize) -> std::io::Result<String> {
    let file = std::fs::File::open(path)?;
    let lines: Vec<String> = BufReader::new(file).lines().map_while(Result::ok).collect();
    let start = lines.len().saturating_sub(n);
    Ok(lines[start..].join("\n"))
}

/// Fail with [`TsukuError::InvalidParam`] unless every name in
/// `expected_bins` exists under `install_dir/bin`.
pub fn verify_executables_exist(install_dir: &Path, expected_bins: &[&str]) -> Result<(), TsukuError> {
    for bin in expected_bins {
        let path = install_dir.join("bin").join(bin);
        if !path.exists() {
            return Err(TsukuError::invalid_param(
                "ecosystem build",
                format!("expected executable '{}' was not produced", path.display()),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_latest_toolchain_lexicographically() {
        let dir = tempdir().unwrap();
        for version in ["rust-1.70.0", "rust-1.80.0", "rust-1.75.0"] {
            let bin = dir.path().join(version).join("bin");
            std::fs::create_dir_all(&bin).unwrap();
            let exe = bin.join("cargo");
            std::fs::write(&exe, "").unwrap();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();
            }
        }
        let found = find_toolchain(dir.path(), "rust", "cargo").unwrap();
        assert!(found.ends_with("rust-1.80.0"));
    }

    #[test]
    fn verify_executables_exist_reports_missing_binary() {
        let dir = tempdir().unwrap();
        assert!(verify_executables_exist(dir.path(), &["rg"]).is_err());
        std::fs::create_dir_all(dir.path().join("bin")).unwrap();
        std::fs::write(dir.path().join("bin/rg"), "").unwrap();
        assert!(verify_executables_exist(dir.path(), &["rg"]).is_ok());
    }
}
