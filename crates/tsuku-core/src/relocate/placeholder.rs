//! Homebrew-style placeholder substitution, per spec.md §4.6.
//!
//! Text files get `@@HOMEBREW_PREFIX@@`/`@@HOMEBREW_CELLAR@@` replaced with
//! the real install path. Binaries never get in-place byte substitution
//! (it would change string lengths and corrupt offsets); instead their
//! RPATH is rewritten via the platform tool.

use std::path::Path;

use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

use super::detect::{looks_binary, BinaryFormat};
use super::{detect, elf, macho, RelocateError};

const PREFIX_TOKEN: &str = "@@HOMEBREW_PREFIX@@";
const CELLAR_TOKEN: &str = "@@HOMEBREW_CELLAR@@";

/// Walk `dir` recursively, substituting placeholder tokens in text files
/// and rewriting RPATH in binaries, so that everything under `dir`
/// references `install_path` instead of the original Homebrew prefix.
pub async fn relocate_tree(dir: &Path, install_path: &str, cancel: &CancellationToken) -> Result<(), RelocateError> {
    for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        relocate_file(entry.path(), install_path, cancel).await?;
    }
    Ok(())
}

async fn relocate_file(path: &Path, install_path: &str, cancel: &CancellationToken) -> Result<(), RelocateError> {
    if looks_binary(path)? {
        return relocate_binary(path, cancel).await;
    }
    relocate_text(path, install_path)
}

fn relocate_text(path: &Path, install_path: &str) -> Result<(), RelocateError> {
    let contents = std::fs::read_to_string(path);
    let Ok(contents) = contents else {
        // Non-UTF8 but NUL-free (e.g. Latin-1 docs); leave untouched.
        return Ok(());
    };
    if !contents.contains(PREFIX_TOKEN) && !contents.contains(CELLAR_TOKEN) {
        return Ok(());
    }

    let replaced = contents.replace(PREFIX_TOKEN, install_path).replace(CELLAR_TOKEN, install_path);
    std::fs::write(path, replaced)?;
    Ok(())
}

async fn relocate_binary(path: &Path, cancel: &CancellationToken) -> Result<(), RelocateError> {
    match detect::detect(path)? {
        BinaryFormat::Elf => {
            if elf::tool_available() {
                elf::set_rpath(path, elf::DEFAULT_RPATH, cancel).await?;
            }
            Ok(())
        }
        BinaryFormat::MachO | BinaryFormat::MachOFat => {
            if macho::tool_available() {
                macho::set_rpath(path, macho::DEFAULT_RPATH, cancel).await?;
            }
            Ok(())
        }
        BinaryFormat::Other => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn rewrites_prefix_token_in_text_file() {
        let dir = tempdir().unwrap();
        let pc = dir.path().join("yaml.pc");
        std::fs::write(&pc, "prefix=@@HOMEBREW_PREFIX@@/lib\n").unwrap();

        let cancel = CancellationToken::new();
        relocate_tree(dir.path(), "/opt/t/tools/libyaml-0.2.5", &cancel).await.unwrap();

        let out = std::fs::read_to_string(&pc).unwrap();
        assert_eq!(out, "prefix=/opt/t/tools/libyaml-0.2.5/lib\n");
    }

    #[tokio::test]
    async fn leaves_file_without_tokens_untouched() {
        let dir = tempdir().unwrap();
        let pc = dir.path().join("plain.txt");
        std::fs::write(&pc, "nothing to see here\n").unwrap();

        let cancel = CancellationToken::new();
        relocate_tree(dir.path(), "/opt/t/tools/libyaml-0.2.5", &cancel).await.unwrap();

        let out = std::fs::read_to_string(&pc).unwrap();
        assert_eq!(out, "nothing to see here\n");
    }
}
