//! `download_file`: fetch a URL into `work_dir`, optionally verifying a
//! checksum.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::deps::ActionDeps;
use crate::error::{PreflightResult, TsukuError};
use crate::verify::hash::Algo;

/// `download_file`. Params: `url`, `dest` (basename of `url` if absent),
/// optional `checksum` + `checksum_algo`.
pub struct DownloadFile;

#[async_trait]
impl Action for DownloadFile {
    fn name(&self) -> &'static str {
        "download_file"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        match params.get_str("url") {
            Some(url) if url.starts_with("https://") => {}
            Some(url) => result.error(format!("url must be https://, got '{url}'")),
            None => result.error("download_file requires a 'url' param"),
        }
        if params.contains("checksum") && params.get_str("checksum_algo").is_none() {
            result.warn("checksum given without checksum_algo; defaulting to sha256");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let expansion = ctx.expansion();
        let url = expansion.expand(
            params
                .get_str("url")
                .ok_or_else(|| TsukuError::invalid_param("download_file", "missing 'url'"))?,
        );

        let dest_name = params.get_str("dest").map(str::to_string).unwrap_or_else(|| {
            url.rsplit('/').next().unwrap_or("download").to_string()
        });
        let dest_path = ctx.work_dir.join(&dest_name);

        let checksum = params.get_str("checksum").map(str::to_string);
        let algo = params
            .get_str("checksum_algo")
            .and_then(Algo::parse)
            .unwrap_or(Algo::Sha256);

        // `Downloader`/`DownloadCache` both verify against a computed
        // SHA-256 digest; a sha512 `checksum` would never match that and
        // must not be forwarded to either. It's instead checked afterward
        // with `verify_file`, the same way `cargo_build` gates its lock
        // checksum separately from the network fetch.
        let sha256_checksum = if algo == Algo::Sha256 { checksum.as_deref() } else { None };
        let verify_non_sha256 = |path: &std::path::Path| -> Result<(), TsukuError> {
            if algo != Algo::Sha256 {
                if let Some(expected) = &checksum {
                    crate::verify::hash::verify_file(path, expected, algo)?;
                }
            }
            Ok(())
        };

        let downloader = crate::action::context::default_downloader()?;

        let Ok(cache) = crate::download::DownloadCache::open(ctx.download_cache_dir.clone()) else {
            downloader
                .download(&url, &dest_path, sha256_checksum, &ctx.cancellation)
                .await?;
            verify_non_sha256(&dest_path)?;
            return Ok(());
        };

        if let Some(cached) = cache.check(&url, sha256_checksum)? {
            if let Some(parent) = dest_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&cached, &dest_path)?;
            verify_non_sha256(&dest_path)?;
            return Ok(());
        }

        downloader
            .download(&url, &dest_path, sha256_checksum, &ctx.cancellation)
            .await?;
        verify_non_sha256(&dest_path)?;
        let _ = cache.save(&url, &dest_path, sha256_checksum);
        Ok(())
    }

    fn dependencies(&self) -> ActionDeps {
        ActionDeps::default()
    }

    fn requires_network(&self) -> bool {
        true
    }

    fn is_deterministic(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preflight_requires_https_url() {
        let action = DownloadFile;
        let params = ParamBag::new().with("url", "http://example.com/x");
        assert!(!action.preflight(&params).is_ok());

        let params = ParamBag::new().with("url", "https://example.com/x");
        assert!(action.preflight(&params).is_ok());
    }

    #[test]
    fn preflight_requires_url_at_all() {
        let action = DownloadFile;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
    }

    #[tokio::test]
    async fn sha512_checksum_is_verified_after_the_fetch_not_forwarded_as_sha256() {
        // Pre-seed the download cache so the cache-hit path is taken and the
        // network is never touched; a sha512 `checksum` must still gate the
        // result via `verify_file`, not `Downloader`/`DownloadCache`'s
        // SHA-256-only comparison.
        let tmp = tempfile::tempdir().unwrap();
        let ctx = crate::action::context::test_support::execution_context(tmp.path());
        std::fs::create_dir_all(&ctx.work_dir).unwrap();

        let bytes = b"deterministic file contents";
        let src = tmp.path().join("src.bin");
        std::fs::write(&src, bytes).unwrap();
        let sha512 = crate::verify::hash::hash_file(&src, Algo::Sha512).unwrap();

        let cache = crate::download::DownloadCache::open(ctx.download_cache_dir.clone()).unwrap();
        cache.save("https://example.com/x.bin", &src, None).unwrap();

        let params = ParamBag::new()
            .with("url", "https://example.com/x.bin")
            .with("checksum", sha512)
            .with("checksum_algo", "sha512");

        DownloadFile.execute(&ctx, &params).await.unwrap();
        assert_eq!(std::fs::read(ctx.work_dir.join("x.bin")).unwrap(), bytes);
    }

    #[tokio::test]
    async fn a_tampered_sha512_checksum_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let ctx = crate::action::context::test_support::execution_context(tmp.path());
        std::fs::create_dir_all(&ctx.work_dir).unwrap();

        let src = tmp.path().join("src.bin");
        std::fs::write(&src, b"deterministic file contents").unwrap();

        let cache = crate::download::DownloadCache::open(ctx.download_cache_dir.clone()).unwrap();
        cache.save("https://example.com/x.bin", &src, None).unwrap();

        let params = ParamBag::new()
            .with("url", "https://example.com/x.bin")
            .with("checksum", "f".repeat(128))
            .with("checksum_algo", "sha512");

        let err = DownloadFile.execute(&ctx, &params).await.unwrap_err();
        assert!(matches!(err, TsukuError::VerificationFailure(_)));
    }
}
