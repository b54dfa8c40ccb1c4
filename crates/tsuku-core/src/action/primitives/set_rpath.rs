//! `set_rpath`: rewrite RPATH of listed binaries, per spec.md §4.5.

use async_trait::async_trait;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};
use crate::relocate::{detect, elf, macho, wrapper, BinaryFormat, RelocateError};

/// `set_rpath`. Params: `files[]` (paths relative to `install_dir`),
/// optional `rpath` override, `create_wrapper` (default `true`).
pub struct SetRpath;

#[async_trait]
impl Action for SetRpath {
    fn name(&self) -> &'static str {
        "set_rpath"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        if params.get_str_list("files").is_none() {
            result.error("set_rpath requires a 'files' list of strings");
        }
        if let Some(rpath) = params.get_str("rpath") {
            if crate::relocate::validate_rpath(rpath).is_err() {
                result.error(format!("invalid rpath value '{rpath}'"));
            }
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let files = params
            .get_str_list("files")
            .ok_or_else(|| TsukuError::invalid_param("set_rpath", "missing 'files'"))?;
        let create_wrapper = params.bool_or("create_wrapper", true);

        for file in files {
            let path = ctx.install_dir.join(file);
            let format = detect::detect(&path)?;
            let custom_rpath = params.get_str("rpath");

            let outcome = match format {
                BinaryFormat::Elf => {
                    let rpath = custom_rpath.unwrap_or(elf::DEFAULT_RPATH);
                    if elf::tool_available() {
                        elf::set_rpath(&path, rpath, &ctx.cancellation).await.map(Some)
                    } else {
                        Ok(None)
                    }
                }
                BinaryFormat::MachO | BinaryFormat::MachOFat => {
                    let rpath = custom_rpath.unwrap_or(macho::DEFAULT_RPATH);
                    if macho::tool_available() {
                        macho::set_rpath(&path, rpath, &ctx.cancellation).await.map(Some)
                    } else {
                        Ok(None)
                    }
                }
                BinaryFormat::Other => Ok(Some(())),
            };

            match outcome {
                Ok(Some(())) => {}
                Ok(None) if create_wrapper => fall_back_to_wrapper(&path, file)?,
                Ok(None) => return Err(RelocateError::NoToolAvailable { format }.into()),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn fall_back_to_wrapper(binary_path: &std::path::Path, relative_name: &str) -> Result<(), TsukuError> {
    let renamed = binary_path.with_file_name(format!("{relative_name}.bin"));
    std::fs::rename(binary_path, &renamed)?;
    let bin_dir = binary_path.parent().unwrap_or(binary_path);
    wrapper::write_library_path_wrapper(bin_dir, relative_name, "../lib")?;
    Ok(())
}
