//! Step-building helpers shared by the composite actions: a
//! download-then-extract-then-install shape recurs across `download`,
//! `download_archive`, `github_archive`, `github_file`, and
//! `homebrew_bottle`, per spec.md §4.5's "representative" decomposition.

use tsuku_schema::ParamBag;

use crate::action::step::Step;

/// Guess `extract`'s `format` string from a release-asset filename, the
/// same suffix rules as `Extract`'s own `parse_format`.
pub fn format_for_filename(name: &str) -> Option<&'static str> {
    let f = name.to_lowercase();
    if f.ends_with(".tar.gz") || f.ends_with(".tgz") {
        Some("tar.gz")
    } else if f.ends_with(".tar.xz") || f.ends_with(".txz") {
        Some("tar.xz")
    } else if f.ends_with(".tar.bz2") || f.ends_with(".tbz2") || f.ends_with(".tbz") {
        Some("tar.bz2")
    } else if f.ends_with(".tar.zst") || f.ends_with(".tzst") {
        Some("tar.zst")
    } else if f.ends_with(".tar.lz") || f.ends_with(".tlz") {
        Some("tar.lz")
    } else if f.ends_with(".zip") {
        Some("zip")
    } else if f.ends_with(".tar") {
        Some("tar")
    } else {
        None
    }
}

/// Build a `download_file` step, carrying a checksum/size if one was
/// captured at plan time.
pub fn download_step(url: &str, dest: &str) -> Step {
    Step::new("download_file", ParamBag::new().with("url", url).with("dest", dest))
}

/// Build an `extract` step for `src`, with an optional `strip_dirs` and an
/// explicit `format` (rather than `auto`, since the composite already knows
/// the asset's extension).
pub fn extract_step(src: &str, format: Option<&str>, strip_dirs: Option<i64>) -> Step {
    let mut params = ParamBag::new().with("src", src);
    if let Some(format) = format {
        params.set("format", format);
    }
    if let Some(strip_dirs) = strip_dirs {
        params.set("strip_dirs", strip_dirs);
    }
    Step::new("extract", params)
}

/// Build a `chmod 0755` step over `files`.
pub fn chmod_step(files: &[String]) -> Step {
    Step::new("chmod", ParamBag::new().with("files", files.to_vec()).with("mode", 0o755_i64))
}

/// Build an `install_binaries` step for `files`, passing through
/// `install_mode` if the composite's caller set one.
pub fn install_binaries_step(files: &[String], install_mode: Option<&str>) -> Step {
    let mut params = ParamBag::new().with("files", files.to_vec());
    if let Some(mode) = install_mode {
        params.set("install_mode", mode);
    }
    Step::new("install_binaries", params)
}
