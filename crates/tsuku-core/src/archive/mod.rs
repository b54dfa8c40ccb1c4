//! Archive extraction: tar (gz/xz/bz2/zst/lz) and zip readers with
//! path-traversal and symlink-escape defenses.
//!
//! Grounded on the teacher's `io::extract` module (format detection,
//! per-format readers, Zip Slip guard), generalized per spec.md §4.3 with
//! `strip_dirs`/`files[]` filtering and symlink-target validation the
//! teacher doesn't need (APL only ever unpacks its own CAS-produced tars).

mod security;
mod tar_reader;
mod zip_reader;

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

pub use security::{create_symlink_atomic, sanitize_entry_path, validate_symlink_target};

/// Errors raised while extracting an archive.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// I/O failure reading the archive or writing to the destination.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The archive's extension/magic bytes didn't match any supported format.
    #[error("unsupported archive format: {0}")]
    UnsupportedFormat(String),

    /// An archive entry or symlink target would escape the destination
    /// directory.
    #[error("path traversal: {0}")]
    PathTraversal(String),

    /// Malformed archive container (corrupt tar/zip structure).
    #[error("archive error: {0}")]
    Archive(String),
}

/// One file (or symlink) placed on disk by an extraction.
#[derive(Debug, Clone)]
pub struct ExtractedFile {
    /// Path relative to the extraction root, after `strip_dirs`.
    pub relative_path: PathBuf,
    /// Absolute path on disk.
    pub absolute_path: PathBuf,
    /// Whether the Unix mode bits carry an execute bit.
    pub is_executable: bool,
}

/// Recognized archive container/compression combinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Plain, uncompressed tar.
    Tar,
    /// `.tar.gz` / `.tgz`.
    TarGz,
    /// `.tar.xz` / `.txz`.
    TarXz,
    /// `.tar.bz2` / `.tbz` / `.tbz2`.
    TarBz2,
    /// `.tar.zst` / `.tzst`.
    TarZst,
    /// `.tar.lz` / `.tlz` (lzip).
    TarLz,
    /// `.zip`.
    Zip,
    /// Anything else: treated as a single raw binary to copy verbatim.
    RawBinary,
}

/// Options controlling how an archive is unpacked, per spec.md §4.3.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Drop this many leading path components from every entry; entries
    /// with fewer components than this are skipped entirely.
    pub strip_dirs: usize,
    /// When non-empty, only extract members whose post-strip relative path
    /// is present in this list.
    pub files: Option<Vec<String>>,
}

/// Detect an [`ArchiveFormat`] from a filename's suffix (case-insensitive).
pub fn detect_format(path: &Path) -> ArchiveFormat {
    let name = path.to_string_lossy().to_lowercase();

    if name.ends_with(".tar.zst") || name.ends_with(".tzst") {
        ArchiveFormat::TarZst
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        ArchiveFormat::TarGz
    } else if name.ends_with(".tar.xz") || name.ends_with(".txz") {
        ArchiveFormat::TarXz
    } else if name.ends_with(".tar.bz2") || name.ends_with(".tbz2") || name.ends_with(".tbz") {
        ArchiveFormat::TarBz2
    } else if name.ends_with(".tar.lz") || name.ends_with(".tlz") {
        ArchiveFormat::TarLz
    } else if name.ends_with(".tar") {
        ArchiveFormat::Tar
    } else if name.ends_with(".zip") {
        ArchiveFormat::Zip
    } else {
        ArchiveFormat::RawBinary
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tar => "tar",
            Self::TarGz => "tar.gz",
            Self::TarXz => "tar.xz",
            Self::TarBz2 => "tar.bz2",
            Self::TarZst => "tar.zst",
            Self::TarLz => "tar.lz",
            Self::Zip => "zip",
            Self::RawBinary => "raw",
        };
        f.write_str(s)
    }
}

/// Extract `archive_path` into `dest_dir`, auto-detecting format from the
/// filename unless `format` is given explicitly.
pub fn extract(
    archive_path: &Path,
    dest_dir: &Path,
    format: Option<ArchiveFormat>,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let format = format.unwrap_or_else(|| detect_format(archive_path));
    std::fs::create_dir_all(dest_dir)?;

    match format {
        ArchiveFormat::Tar => {
            let file = std::fs::File::open(archive_path)?;
            tar_reader::extract_tar(io::BufReader::new(file), dest_dir, options)
        }
        ArchiveFormat::TarGz => {
            let file = std::fs::File::open(archive_path)?;
            let decoder = flate2::read::GzDecoder::new(io::BufReader::new(file));
            tar_reader::extract_tar(decoder, dest_dir, options)
        }
        ArchiveFormat::TarXz => {
            let file = std::fs::File::open(archive_path)?;
            let decoder = xz2::read::XzDecoder::new(io::BufReader::new(file));
            tar_reader::extract_tar(decoder, dest_dir, options)
        }
        ArchiveFormat::TarBz2 => {
            let file = std::fs::File::open(archive_path)?;
            let decoder = bzip2::read::BzDecoder::new(io::BufReader::new(file));
            tar_reader::extract_tar(decoder, dest_dir, options)
        }
        ArchiveFormat::TarZst => {
            let file = std::fs::File::open(archive_path)?;
            let decoder = zstd::stream::Decoder::new(io::BufReader::new(file))?;
            tar_reader::extract_tar(decoder, dest_dir, options)
        }
        ArchiveFormat::TarLz => extract_tar_lz(archive_path, dest_dir, options),
        ArchiveFormat::Zip => zip_reader::extract_zip(archive_path, dest_dir, options),
        ArchiveFormat::RawBinary => {
            let filename = archive_path
                .file_name()
                .ok_or_else(|| ExtractError::Archive("archive path has no filename".to_string()))?;
            let relative_path = PathBuf::from(filename);
            let absolute_path = dest_dir.join(&relative_path);
            std::fs::copy(archive_path, &absolute_path)?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&absolute_path, std::fs::Permissions::from_mode(0o755))?;
            }

            Ok(vec![ExtractedFile {
                relative_path,
                absolute_path,
                is_executable: true,
            }])
        }
    }
}

/// lzip has no maintained pure-Rust decoder in this stack (its container
/// differs enough from xz's that xz2's raw-stream mode can't read it
/// either), so `tar.lz`/`tlz` is unpacked by piping `lzip -dc`/`plzip -dc`
/// into the same tar reader the other formats use, mirroring how
/// `relocate::elf`/`relocate::macho` shell out to `patchelf`/
/// `install_name_tool` for what pure Rust can't do.
fn lzip_tool() -> Option<&'static str> {
    if which::which("lzip").is_ok() {
        Some("lzip")
    } else if which::which("plzip").is_ok() {
        Some("plzip")
    } else {
        None
    }
}

fn extract_tar_lz(
    archive_path: &Path,
    dest_dir: &Path,
    options: &ExtractOptions,
) -> Result<Vec<ExtractedFile>, ExtractError> {
    let Some(tool) = lzip_tool() else {
        return Err(ExtractError::UnsupportedFormat(
            "tar.lz (lzip) requires 'lzip' or 'plzip' on PATH, neither was found".to_string(),
        ));
    };

    let mut child = Command::new(tool)
        .arg("-dc")
        .arg(archive_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;
    let stdout = child.stdout.take().expect("piped stdout");

    let result = tar_reader::extract_tar(io::BufReader::new(stdout), dest_dir, options);
    let output = child.wait_with_output()?;
    if !output.status.success() {
        return Err(ExtractError::Archive(format!(
            "{tool} -dc failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }
    result
}

/// Drop `n` leading components from `path`, returning `None` if `path` has
/// `n` or fewer components (per spec.md's "entries with ≤N components are
/// skipped" rule).
pub(crate) fn strip_components(path: &Path, n: usize) -> Option<PathBuf> {
    if n == 0 {
        return Some(path.to_path_buf());
    }
    let mut components = path.components();
    for _ in 0..n {
        components.next()?;
    }
    let remainder: PathBuf = components.collect();
    if remainder.as_os_str().is_empty() {
        None
    } else {
        Some(remainder)
    }
}

/// Whether `options.files`, if set, admits `relative_path`.
pub(crate) fn passes_file_filter(options: &ExtractOptions, relative_path: &Path) -> bool {
    match &options.files {
        None => true,
        Some(list) => {
            let rel = relative_path.to_string_lossy();
            list.iter().any(|f| f == rel.as_ref())
        }
    }
}
