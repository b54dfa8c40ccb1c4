//! `extract`: unpack an archive from `work_dir` into `work_dir`, per
//! spec.md §4.3.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::archive::{self, ArchiveFormat, ExtractOptions};
use crate::error::{PreflightResult, TsukuError};

/// `extract`. Params: `src` (path relative to `work_dir`), optional
/// `dest` (defaults to `work_dir`), `format` (`auto` by default),
/// `strip_dirs`, `files[]`.
pub struct Extract;

fn parse_format(s: &str) -> Option<ArchiveFormat> {
    match s {
        "tar" => Some(ArchiveFormat::Tar),
        "tar.gz" | "tgz" => Some(ArchiveFormat::TarGz),
        "tar.xz" | "txz" => Some(ArchiveFormat::TarXz),
        "tar.bz2" | "tbz" | "tbz2" => Some(ArchiveFormat::TarBz2),
        "tar.zst" | "tzst" => Some(ArchiveFormat::TarZst),
        "tar.lz" | "tlz" => Some(ArchiveFormat::TarLz),
        "zip" => Some(ArchiveFormat::Zip),
        "auto" => None,
        _ => None,
    }
}

#[async_trait]
impl Action for Extract {
    fn name(&self) -> &'static str {
        "extract"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str("src").is_none() {
            result.error("extract requires a 'src' param");
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let src_name = params
            .get_str("src")
            .ok_or_else(|| TsukuError::invalid_param("extract", "missing 'src'"))?;
        let src_path = ctx.work_dir.join(src_name);

        let dest_dir = match params.get_str("dest") {
            Some(d) => ctx.work_dir.join(d),
            None => ctx.work_dir.clone(),
        };

        let format = params.get_str("format").and_then(parse_format);
        let strip_dirs = params.get_int("strip_dirs").unwrap_or(0).max(0) as usize;
        let files = params
            .get_str_list("files")
            .map(|v| v.into_iter().map(str::to_string).collect());

        let options = ExtractOptions { strip_dirs, files };
        archive::extract(&src_path, &dest_dir, format, &options)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn preflight_requires_src() {
        let action = Extract;
        assert!(!action.preflight(&ParamBag::new()).is_ok());
        assert!(action.preflight(&ParamBag::new().with("src", "a.tar.gz")).is_ok());
    }

    #[tokio::test]
    async fn execute_extracts_a_raw_binary_into_work_dir() {
        let work = tempdir().unwrap();
        std::fs::write(work.path().join("mybin"), b"content").unwrap();

        let ctx = crate::action::context::test_support::execution_context(work.path());

        let action = Extract;
        let params = ParamBag::new().with("src", "mybin").with("dest", "out");
        action.execute(&ctx, &params).await.unwrap();
        assert!(work.path().join("out/mybin").exists());
    }
}
