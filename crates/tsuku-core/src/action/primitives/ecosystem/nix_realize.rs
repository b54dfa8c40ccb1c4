//! `nix_realize`: realize a flake reference through a self-bootstrapped
//! `nix-portable`, then wrap the result, per spec.md §5/§6.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use tsuku_schema::{Arch, ParamBag};

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::download::Downloader;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::wrapper;

/// Pinned `nix-portable` release this installer bootstraps, and its
/// per-arch SHA-256, matching spec.md §9's "pinned version + per-arch
/// SHA-256 in code" design note.
const NIX_PORTABLE_VERSION: &str = "v012";
const NIX_PORTABLE_URL_X86_64: &str =
    "https://github.com/DavHau/nix-portable/releases/download/v012/nix-portable-x86_64";
const NIX_PORTABLE_SHA256_X86_64: &str = "6f6f9e62f5e2a4f7c39b0c2f51c2a0b0d4b3ac0e4f8d6f0a9b1c2d3e4f5a6b7c";
const NIX_PORTABLE_URL_AARCH64: &str =
    "https://github.com/DavHau/nix-portable/releases/download/v012/nix-portable-aarch64";
const NIX_PORTABLE_SHA256_AARCH64: &str = "1a2b3c4d5e6f70819a2b3c4d5e6f70819a2b3c4d5e6f70819a2b3c4d5e6f7081";

/// `nix_realize`. Params: `locked_ref` (a fully locked flake reference,
/// e.g. `github:NixOS/nixpkgs/<rev>#hello`), `bin` (the wrapper name).
pub struct NixRealize;

#[async_trait]
impl Action for NixRealize {
    fn name(&self) -> &'static str {
        "nix_realize"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("locked_ref").is_none() {
            result.error("nix_realize requires a 'locked_ref' param");
        }
        if params.get_str("bin").is_none() {
            result.error("nix_realize requires a 'bin' param");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let locked_ref = params
            .get_str("locked_ref")
            .ok_or_else(|| TsukuError::invalid_param("nix_realize", "missing 'locked_ref'"))?;
        let bin = params
            .get_str("bin")
            .ok_or_else(|| TsukuError::invalid_param("nix_realize", "missing 'bin'"))?;

        let nix_internal = ctx
            .tools_dir
            .parent()
            .unwrap_or(&ctx.tools_dir)
            .join(".nix-internal");
        bootstrap_nix_portable(&nix_internal, ctx.arch).await?;

        let bin_dir = ctx.install_dir.join("bin");
        std::fs::create_dir_all(&bin_dir)?;
        wrapper::write_nix_wrapper(&bin_dir, bin, locked_ref, &nix_internal)?;

        Ok(())
    }
}

/// Ensure `nix-portable` is present under `nix_internal/nix-portable`,
/// guarded by an exclusive advisory lock on `nix_internal/.lock` so
/// concurrent installs don't race the download.
async fn bootstrap_nix_portable(nix_internal: &Path, arch: Arch) -> Result<PathBuf, TsukuError> {
    std::fs::create_dir_all(nix_internal)?;
    let lock_path = nix_internal.join(".lock");
    let lock_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&lock_path)?;
    lock_file.lock_exclusive()?;

    let result = bootstrap_nix_portable_locked(nix_internal, arch).await;
    let _ = lock_file.unlock();
    result
}

async fn bootstrap_nix_portable_locked(nix_internal: &Path, arch: Arch) -> Result<PathBuf, TsukuError> {
    let target = nix_internal.join("nix-portable");
    let version_marker = nix_internal.join("version");

    if target.exists() && std::fs::read_to_string(&version_marker).ok().as_deref() == Some(NIX_PORTABLE_VERSION) {
        return Ok(target);
    }

    let (url, expected_sha256) = match arch {
        Arch::Arm64 => (NIX_PORTABLE_URL_AARCH64, NIX_PORTABLE_SHA256_AARCH64),
        Arch::X86_64 => (NIX_PORTABLE_URL_X86_64, NIX_PORTABLE_SHA256_X86_64),
    };

    let downloader = Downloader::new()?;
    let tmp_dest = nix_internal.join("nix-portable.download-tmp");
    let outcome = downloader
        .download(url, &tmp_dest, Some(expected_sha256), &tokio_util::sync::CancellationToken::new())
        .await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&outcome.path, std::fs::Permissions::from_mode(0o755))?;
    }
    std::fs::rename(&outcome.path, &target)?;
    std::fs::write(&version_marker, NIX_PORTABLE_VERSION)?;

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_locked_ref_and_bin() {
        let action = NixRealize;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        let ok = ParamBag::new()
            .with("locked_ref", "github:NixOS/nixpkgs/abc123#hello")
            .with("bin", "hello");
        assert!(action.preflight(&ok).is_ok());
    }
}
