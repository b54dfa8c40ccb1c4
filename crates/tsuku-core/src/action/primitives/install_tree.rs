//! Shared logic behind `install_binaries`/`install_libraries`, per
//! spec.md §4.5.
//!
//! Both primitives move files out of `work_dir` into their slice of
//! `install_dir`, in one of three modes: `binaries` (a flat file list,
//! optionally renamed), or `directory`/`directory_wrapped` (the whole
//! extracted tree, the latter additionally emitting entrypoint wrappers).

use std::path::{Path, PathBuf};

use tsuku_schema::{ParamBag, Value};

use crate::archive::validate_symlink_target;
use crate::error::TsukuError;

/// One entry in a `files` list: either a bare name (install path equals
/// source name) or an explicit `{src, dest}` rename pair.
pub struct FileEntry {
    /// Path relative to `work_dir`.
    pub src: String,
    /// Path relative to the install subdirectory (`bin`/`lib`).
    pub dest: String,
}

/// How the listed files are placed under `install_dir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// A flat file list, copied into `install_dir/<subdir>`.
    Binaries,
    /// The whole `work_dir` tree, copied under `install_dir/<name>`.
    Directory,
    /// Like `Directory`, plus wrapper scripts under `install_dir/bin`.
    DirectoryWrapped,
}

impl InstallMode {
    /// Parse the `install_mode` param, defaulting to `binaries`.
    pub fn parse(value: Option<&str>) -> Result<Self, TsukuError> {
        match value.unwrap_or("binaries") {
            "binaries" => Ok(Self::Binaries),
            "directory" => Ok(Self::Directory),
            "directory_wrapped" => Ok(Self::DirectoryWrapped),
            other => Err(TsukuError::invalid_param("install_mode", format!("unknown mode '{other}'"))),
        }
    }
}

/// Parse a `files` param accepting bare strings or `{src, dest}` maps.
pub fn parse_file_entries(params: &ParamBag, key: &str) -> Result<Vec<FileEntry>, TsukuError> {
    let Some(Value::List(items)) = params.get(key) else {
        return Err(TsukuError::invalid_param(key, "missing or not a list"));
    };

    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(FileEntry {
                src: name.clone(),
                dest: name.clone(),
            }),
            Value::Map(map) => {
                let src = map
                    .get("src")
                    .and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None })
                    .ok_or_else(|| TsukuError::invalid_param(key, "entry map missing 'src'"))?;
                let dest = map
                    .get("dest")
                    .and_then(|v| if let Value::String(s) = v { Some(s.clone()) } else { None })
                    .unwrap_or_else(|| src.clone());
                Ok(FileEntry { src, dest })
            }
            _ => Err(TsukuError::invalid_param(key, "entry must be a string or {src, dest} map")),
        })
        .collect()
}

/// Copy `entries` from `work_dir` into `install_dir/<subdir>`, preserving
/// the Unix executable bit.
pub fn install_flat_files(
    work_dir: &Path,
    install_dir: &Path,
    subdir: &str,
    entries: &[FileEntry],
) -> Result<(), TsukuError> {
    let dest_dir = install_dir.join(subdir);
    std::fs::create_dir_all(&dest_dir)?;

    for entry in entries {
        let src_path = work_dir.join(&entry.src);
        let dest_path = dest_dir.join(&entry.dest);
        if let Some(parent) = dest_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        copy_preserving_mode(&src_path, &dest_path)?;
    }
    Ok(())
}

/// Copy the entire `work_dir` tree under `install_dir/<name>`.
pub fn install_directory_tree(work_dir: &Path, install_dir: &Path, name: &str) -> Result<PathBuf, TsukuError> {
    let dest_root = install_dir.join(name);
    copy_dir_recursive(work_dir, &dest_root, &dest_root)?;
    Ok(dest_root)
}

/// `dest_root` is the top of the copy (fixed across the recursion) so
/// symlink targets can be re-validated the way `archive::security` does
/// during extraction: `work_dir` and `install_dir` are different trees, so
/// a symlink materialized by the extractor has to be read and recreated
/// here, not skipped.
fn copy_dir_recursive(src: &Path, dest: &Path, dest_root: &Path) -> Result<(), TsukuError> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let dest_path = dest.join(entry.file_name());
        if file_type.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path, dest_root)?;
        } else if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path())?;
            validate_symlink_target(dest_root, &dest_path, &target)?;
            crate::archive::create_symlink_atomic(&dest_path, &target)?;
        } else if file_type.is_file() {
            copy_preserving_mode(&entry.path(), &dest_path)?;
        }
    }
    Ok(())
}

fn copy_preserving_mode(src: &Path, dest: &Path) -> Result<(), TsukuError> {
    std::fs::copy(src, dest)?;
    #[cfg(unix)]
    {
        let mode = std::fs::metadata(src)?.permissions();
        std::fs::set_permissions(dest, mode)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn parses_bare_string_and_rename_map_entries() {
        let bag = ParamBag::new().with(
            "files",
            Value::List(vec![
                Value::String("rg".to_string()),
                Value::Map(BTreeMap::from([
                    ("src".to_string(), Value::String("rg-14.1.0".to_string())),
                    ("dest".to_string(), Value::String("rg".to_string())),
                ])),
            ]),
        );
        let entries = parse_file_entries(&bag, "files").unwrap();
        assert_eq!(entries[0].src, "rg");
        assert_eq!(entries[0].dest, "rg");
        assert_eq!(entries[1].src, "rg-14.1.0");
        assert_eq!(entries[1].dest, "rg");
    }

    #[test]
    fn install_mode_parse_defaults_to_binaries() {
        assert_eq!(InstallMode::parse(None).unwrap(), InstallMode::Binaries);
        assert_eq!(InstallMode::parse(Some("directory")).unwrap(), InstallMode::Directory);
        assert!(InstallMode::parse(Some("bogus")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn directory_tree_copy_recreates_relative_symlinks() {
        let work = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();

        std::fs::write(work.path().join("libfoo.so.1.2.3"), b"elf bytes").unwrap();
        std::os::unix::fs::symlink("libfoo.so.1.2.3", work.path().join("libfoo.so")).unwrap();

        let dest_root = install_directory_tree(work.path(), install.path(), "libfoo-1.2.3").unwrap();

        let link = dest_root.join("libfoo.so");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(std::fs::read_link(&link).unwrap(), Path::new("libfoo.so.1.2.3"));
        assert_eq!(std::fs::read(&link).unwrap(), b"elf bytes");
    }

    #[test]
    #[cfg(unix)]
    fn directory_tree_copy_rejects_a_symlink_escaping_the_install_dir() {
        let work = tempfile::tempdir().unwrap();
        let install = tempfile::tempdir().unwrap();

        std::os::unix::fs::symlink("../../../etc/passwd", work.path().join("evil")).unwrap();

        let err = install_directory_tree(work.path(), install.path(), "pkg").unwrap_err();
        assert!(matches!(err, TsukuError::Archive(_)));
    }
}
