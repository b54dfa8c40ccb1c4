//! `text_replace`: literal or regex string substitution in one file, per
//! spec.md §4.5.

use async_trait::async_trait;
use regex::Regex;
use tsuku_schema::ParamBag;

use crate::action::context::ExecutionContext;
use crate::action::registry::Action;
use crate::error::{PreflightResult, TsukuError};

/// `text_replace`. Params: `file` (relative to `work_dir`), `find`,
/// `replace`, optional `regex` (default `false`). Both `find` and
/// `replace` are expanded via `ctx.expansion()` before use, so
/// `{version}`/`{install_dir}`/... resolve the same way a composite's URL
/// would. With `regex: true`, `find` is compiled as a regular expression
/// and `replace` may reference capture groups (`$1`, `${name}`).
pub struct TextReplace;

#[async_trait]
impl Action for TextReplace {
    fn name(&self) -> &'static str {
        "text_replace"
    }

    fn preflight(&self, params: &ParamBag) -> PreflightResult {
        let mut result = PreflightResult::ok();
        for key in ["file", "find", "replace"] {
            if params.get_str(key).is_none() {
                result.error(format!("text_replace requires a '{key}' string param"));
            }
        }
        if params.bool_or("regex", false) {
            if let Some(find) = params.get_str("find") {
                if let Err(e) = Regex::new(find) {
                    result.error(format!("invalid 'find' regex: {e}"));
                }
            }
        }
        result
    }

    async fn execute(&self, ctx: &ExecutionContext, params: &ParamBag) -> Result<(), TsukuError> {
        let file = params
            .get_str("file")
            .ok_or_else(|| TsukuError::invalid_param("text_replace", "missing 'file'"))?;
        let find = params
            .get_str("find")
            .ok_or_else(|| TsukuError::invalid_param("text_replace", "missing 'find'"))?;
        let replace = params
            .get_str("replace")
            .ok_or_else(|| TsukuError::invalid_param("text_replace", "missing 'replace'"))?;
        let use_regex = params.bool_or("regex", false);

        let expansion = ctx.expansion();
        let find = expansion.expand(find);
        let replace = expansion.expand(replace);

        let path = ctx.work_dir.join(file);
        let contents = std::fs::read_to_string(&path)?;

        let replaced = if use_regex {
            let re = Regex::new(&find).map_err(|e| TsukuError::invalid_param("text_replace", e.to_string()))?;
            re.replace_all(&contents, replace.as_str()).into_owned()
        } else {
            contents.replace(&find, &replace)
        };

        std::fs::write(&path, replaced)?;
        Ok(())
    }
}
