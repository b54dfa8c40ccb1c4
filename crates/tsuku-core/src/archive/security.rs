//! Path-traversal and symlink-escape defenses shared by the tar and zip
//! extractors.
//!
//! Grounded on the teacher's `io::extract::extract_tar` Zip Slip check
//! (`absolute_path.starts_with(dest_dir)`), generalized per spec.md §4.3 to
//! also cover symlink targets and to create symlinks atomically.

use std::path::{Component, Path, PathBuf};

use super::ExtractError;

/// Resolve `relative_path` (as read from an archive entry, already stripped
/// of `strip_dirs` components) against `dest_dir`, rejecting anything that
/// would place the result outside `dest_dir`.
///
/// This does not consult the filesystem (the destination doesn't exist yet
/// for most entries); it works purely lexically, rejecting `..` components
/// and absolute paths up front, matching spec.md's "resolved to an absolute
/// path and must be a prefix (with trailing separator) of the destination
/// root" requirement without requiring every ancestor to already exist.
pub fn sanitize_entry_path(dest_dir: &Path, relative_path: &Path) -> Result<PathBuf, ExtractError> {
    if relative_path.is_absolute() {
        return Err(ExtractError::PathTraversal(relative_path.display().to_string()));
    }

    let mut normalized = PathBuf::new();
    for component in relative_path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal(relative_path.display().to_string()));
            }
        }
    }

    let absolute = dest_dir.join(&normalized);
    if !absolute.starts_with(dest_dir) {
        return Err(ExtractError::PathTraversal(relative_path.display().to_string()));
    }
    Ok(absolute)
}

/// Validate a symlink's target per spec.md §4.3: rejected when absolute,
/// when it contains a `..` component that would resolve outside `dest_dir`,
/// or when the lexical resolution of `link_path`'s parent plus `target`
/// escapes `dest_dir`.
pub fn validate_symlink_target(
    dest_dir: &Path,
    link_path: &Path,
    target: &Path,
) -> Result<(), ExtractError> {
    if target.is_absolute() {
        return Err(ExtractError::PathTraversal(format!(
            "symlink {} has absolute target {}",
            link_path.display(),
            target.display()
        )));
    }

    let link_parent = link_path.parent().unwrap_or(dest_dir);
    let mut resolved = link_parent.to_path_buf();
    for component in target.components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(dest_dir) {
                    return Err(ExtractError::PathTraversal(format!(
                        "symlink {} target {} escapes destination",
                        link_path.display(),
                        target.display()
                    )));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::PathTraversal(format!(
                    "symlink {} has absolute target {}",
                    link_path.display(),
                    target.display()
                )));
            }
        }
    }

    if !resolved.starts_with(dest_dir) {
        return Err(ExtractError::PathTraversal(format!(
            "symlink {} target {} escapes destination",
            link_path.display(),
            target.display()
        )));
    }
    Ok(())
}

/// Create a symlink at `link_path` pointing at `target`, via a temporary
/// path plus atomic rename, so a concurrent reader never observes a
/// half-created or TOCTOU-replaceable link.
#[cfg(unix)]
pub fn create_symlink_atomic(link_path: &Path, target: &Path) -> Result<(), ExtractError> {
    use std::os::unix::fs::symlink;

    let parent = link_path.parent().ok_or_else(|| {
        ExtractError::Archive(format!("symlink {} has no parent", link_path.display()))
    })?;
    std::fs::create_dir_all(parent)?;

    let tmp_name = format!(
        ".{}.tsuku-tmp-{}",
        link_path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("link"),
        std::process::id()
    );
    let tmp_path = parent.join(tmp_name);

    // Remove any stale tmp path from a previous crashed run before linking.
    let _ = std::fs::remove_file(&tmp_path);
    symlink(target, &tmp_path)?;
    std::fs::rename(&tmp_path, link_path)?;
    Ok(())
}

#[cfg(not(unix))]
pub fn create_symlink_atomic(_link_path: &Path, _target: &Path) -> Result<(), ExtractError> {
    Err(ExtractError::Archive(
        "symlink creation is only supported on Unix targets".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_absolute_entry_path() {
        let dest = Path::new("/tmp/dest");
        let err = sanitize_entry_path(dest, Path::new("/etc/passwd")).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        let dest = Path::new("/tmp/dest");
        let err = sanitize_entry_path(dest, Path::new("../../etc/passwd")).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
    }

    #[test]
    fn accepts_nested_normal_path() {
        let dest = Path::new("/tmp/dest");
        let resolved = sanitize_entry_path(dest, Path::new("bin/rg")).unwrap();
        assert_eq!(resolved, Path::new("/tmp/dest/bin/rg"));
    }

    #[test]
    fn rejects_symlink_escaping_via_parent_dirs() {
        let dest = Path::new("/tmp/dest");
        let link = Path::new("/tmp/dest/lib/libfoo.so");
        let err = validate_symlink_target(dest, link, Path::new("../../../etc/passwd")).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
    }

    #[test]
    fn accepts_symlink_staying_inside_destination() {
        let dest = Path::new("/tmp/dest");
        let link = Path::new("/tmp/dest/lib/libfoo.so.1");
        validate_symlink_target(dest, link, Path::new("libfoo.so")).unwrap();
    }

    #[test]
    fn rejects_absolute_symlink_target() {
        let dest = Path::new("/tmp/dest");
        let link = Path::new("/tmp/dest/lib/libfoo.so");
        let err = validate_symlink_target(dest, link, Path::new("/usr/lib/libfoo.so")).unwrap_err();
        assert!(matches!(err, ExtractError::PathTraversal(_)));
    }
}
