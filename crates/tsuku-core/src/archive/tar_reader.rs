use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;

use super::security::{create_symlink_atomic, sanitize_entry_path, validate_symlink_target};
use super::{passes_file_filter, strip_components, ExtractError, ExtractOptions, ExtractedFile};

/// Extract a tar stream (already decompressed by the caller) into `dest_dir`.
pub(super) fn extract_tar<R: Read>(
    reader: R,
    dest_dir: &Path,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let mut archive = tar::Archive::new(reader);
    let mut extracted = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry.map_err(|e| ExtractError::Archive(e.to_string()))?;
        let entry_path = entry.path().map_err(|e| ExtractError::Archive(e.to_string()))?;

        let Some(relative_path) = strip_components(&entry_path, options.strip_dirs) else {
            continue;
        };

        if entry.header().entry_type().is_dir() {
            let absolute = sanitize_entry_path(dest_dir, &relative_path)?;
            fs::create_dir_all(&absolute)?;
            continue;
        }

        if !passes_file_filter(options, &relative_path) {
            continue;
        }

        let absolute_path = sanitize_entry_path(dest_dir, &relative_path)?;
        if let Some(parent) = absolute_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if entry.header().entry_type().is_symlink() {
            let target = entry
                .link_name()
                .map_err(|e| ExtractError::Archive(e.to_string()))?
                .ok_or_else(|| ExtractError::Archive("symlink entry missing target".to_string()))?
                .into_owned();
            validate_symlink_target(dest_dir, &absolute_path, &target)?;
            create_symlink_atomic(&absolute_path, &target)?;
            extracted.push(ExtractedFile {
                relative_path,
                absolute_path,
                is_executable: false,
            });
            continue;
        }

        if !entry.header().entry_type().is_file() {
            // Skip hardlinks, FIFOs, devices, etc. -- not meaningful for a
            // user-space tool install.
            continue;
        }

        let mut outfile = File::create(&absolute_path)?;
        io::copy(&mut entry, &mut outfile)?;

        let mode = entry.header().mode().unwrap_or(0o644);
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&absolute_path, fs::Permissions::from_mode(mode))?;
        }

        extracted.push(ExtractedFile {
            relative_path,
            absolute_path,
            is_executable: mode & 0o111 != 0,
        });
    }

    Ok(extracted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn build_tar(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data, mode) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_path(name).unwrap();
            header.set_size(data.len() as u64);
            header.set_mode(*mode);
            header.set_cksum();
            builder.append(&header, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn extracts_regular_files_with_strip_dirs() {
        let bytes = build_tar(&[("ripgrep-14.1.0/bin/rg", b"binary", 0o755)]);
        let dir = tempdir().unwrap();
        let opts = ExtractOptions {
            strip_dirs: 1,
            files: None,
        };
        let extracted = extract_tar(&bytes[..], dir.path(), &opts).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].relative_path, Path::new("bin/rg"));
        assert!(extracted[0].is_executable);
        assert!(dir.path().join("bin/rg").exists());
    }

    #[test]
    fn rejects_traversal_entry() {
        let bytes = build_tar(&[("../../etc/passwd", b"pwned", 0o644)]);
        let dir = tempdir().unwrap();
        let opts = ExtractOptions::default();
        let err = extract_tar(&bytes[..], dir.path(), &opts).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
    }

    #[test]
    fn file_filter_skips_unlisted_entries() {
        let bytes = build_tar(&[
            ("bin/rg", b"binary", 0o755),
            ("README.md", b"docs", 0o644),
        ]);
        let dir = tempdir().unwrap();
        let opts = ExtractOptions {
            strip_dirs: 0,
            files: Some(vec!["bin/rg".to_string()]),
        };
        let extracted = extract_tar(&bytes[..], dir.path(), &opts).unwrap();
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].relative_path, Path::new("bin/rg"));
    }

    #[test]
    fn skips_entries_with_too_few_components() {
        let bytes = build_tar(&[("toplevel-only-file", b"x", 0o644)]);
        let dir = tempdir().unwrap();
        let opts = ExtractOptions {
            strip_dirs: 1,
            files: None,
        };
        let extracted = extract_tar(&bytes[..], dir.path(), &opts).unwrap();
        assert!(extracted.is_empty());
    }
}
