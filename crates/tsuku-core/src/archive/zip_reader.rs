use std::fs::{self, File};
use std::io;
use std::path::Path;

use super::security::sanitize_entry_path;
use super::{passes_file_filter, strip_components, ExtractError, ExtractOptions, ExtractedFile};

/// Extract a zip archive into `dest_dir`.
///
/// `zip`'s own symlink support is version-gated and inconsistent across
/// platforms, so (matching the teacher, which never unpacks symlinked zip
/// entries) zip symlinks are skipped with a warning-free no-op rather than
/// materialized -- `tar`-based archives remain the path for symlink-bearing
/// installs.
pub(super) fn extract_zip(
    archive_path: &Path,
    dest_dir: &Path,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let file = File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| ExtractError::Archive(e.to_string()))?;
    let mut extracted = Vec::new();

    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ExtractError::Archive(e.to_string()))?;

        // `enclosed_name()` already rejects `..` components and absolute
        // paths, but we re-validate through the shared sanitizer so both
        // readers enforce the exact same policy.
        let Some(entry_path) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            return Err(ExtractError::PathTraversal(
                entry.name().to_string(),
            ));
        };

        let Some(relative_path) = strip_components(&entry_path, options.strip_dirs) else {
            continue;
        };

        if entry.is_dir() {
            let absolute = sanitize_entry_path(dest_dir, &relative_path)?;
            fs::create_dir_all(&absolute)?;
            continue;
        }

        #[cfg(unix)]
        if entry.unix_mode().is_some_and(|m| m & 0o170000 == 0o120000) {
            // S_IFLNK: a symlink entry. Skip rather than materialize.
            continue;
        }

        if !passes_file_filter(options, &relative_path) {
            continue;
        }

        let absolute_path = sanitize_entry_path(dest_dir, &relative_path)?;
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;

        #[cfg(unix)]
        let is_executable = if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
            mode & 0o111 != 0
        } else {
            false
        };
        #[cfg(not(unix))]
        let is_executable = false;

        extracted.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable,
        });
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;
    use zip::write::SimpleFileOptions;

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer = zip::ZipWriter::new(io::Cursor::new(&mut buf));
            let options = SimpleFileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            writer.finish().unwrap();
        }
        buf
    }

    #[test]
    fn extracts_plain_zip() {
        let bytes = build_zip(&[("bin/rg", b"binary")]);
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.zip");
        fs::write(&src, bytes).unwrap();

        let extracted = extract_zip(&src, &dir.path().join("out"), &ExtractOptions::default()).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].relative_path, Path::new("bin/rg"));
    }

    #[test]
    fn strip_dirs_and_file_filter_apply() {
        let bytes = build_zip(&[
            ("ripgrep-14.1.0/bin/rg", b"binary"),
            ("ripgrep-14.1.0/README.md", b"docs"),
        ]);
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.zip");
        fs::write(&src, bytes).unwrap();

        let opts = ExtractOptions {
            strip_dirs: 1,
            files: Some(vec!["bin/rg".to_string()]),
        };
        let extracted = extract_zip(&src, &dir.path().join("out"), &opts).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].relative_path, Path::new("bin/rg"));
    }
}
