use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::verify::hash::{hash_file, Algo};
use super::DownloadError;

/// On-disk metadata stored alongside a cached download, per spec.md §3's
/// `DownloadCacheEntry`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMeta {
    /// The URL this entry was fetched from.
    pub url: String,
    /// The checksum the caller expected, if any was supplied.
    pub expected_checksum: Option<String>,
    /// The SHA-256 actually computed over the cached bytes.
    pub actual_sha256: String,
    /// Size of the cached bytes.
    pub size: u64,
    /// RFC 3339 timestamp of when the entry was written.
    pub cached_at: String,
}

/// The content-addressed download cache under `$TSUKU_HOME/cache/downloads`.
///
/// Entries are keyed by `hex(sha256(url))`; `<key>.data` holds the bytes and
/// `<key>.meta` holds a [`CacheMeta`]. Per spec.md's Open Question (b), the
/// cache directory itself must not be a symlink, and must be mode `0700`
/// (stricter than the teacher's CAS, which has no such check since its
/// store lives in a process-managed location, never a user-supplied path).
pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    /// Open (and validate) the cache directory, creating it if absent.
    pub fn open(dir: PathBuf) -> Result<Self, DownloadError> {
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))?;
            }
        }
        Self::ensure_secure(&dir)?;
        Ok(Self { dir })
    }

    #[cfg(unix)]
    fn ensure_secure(dir: &Path) -> Result<(), DownloadError> {
        use std::os::unix::fs::{MetadataExt, PermissionsExt};

        let meta = std::fs::symlink_metadata(dir)?;
        if meta.file_type().is_symlink() {
            return Err(DownloadError::CacheInsecure {
                path: dir.display().to_string(),
                reason: "cache directory is a symlink".to_string(),
            });
        }
        let mode = meta.permissions().mode() & 0o777;
        if mode != 0o700 {
            return Err(DownloadError::CacheInsecure {
                path: dir.display().to_string(),
                reason: format!("expected mode 0700, found {mode:o}"),
            });
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn ensure_secure(_dir: &Path) -> Result<(), DownloadError> {
        Ok(())
    }

    fn key(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn data_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.data"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.meta"))
    }

    /// Check the cache for `url`. Returns `Some(path)` to the cached bytes
    /// on a hit. A hit requires the `.data` file to exist, its size to
    /// match the stored metadata, and (if `expected_checksum` is given) the
    /// stored `actual_sha256` to match it. Any mismatch deletes both files
    /// and reports a miss, per spec.md §4.4.
    pub fn check(
        &self,
        url: &str,
        expected_checksum: Option<&str>,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let key = Self::key(url);
        let data_path = self.data_path(key.as_str());
        let meta_path = self.meta_path(key.as_str());

        if !data_path.exists() || !meta_path.exists() {
            let _ = std::fs::remove_file(&data_path);
            let _ = std::fs::remove_file(&meta_path);
            return Ok(None);
        }

        let meta_bytes = std::fs::read(&meta_path)?;
        let meta: CacheMeta = match serde_json::from_slice(&meta_bytes) {
            Ok(m) => m,
            Err(_) => {
                let _ = std::fs::remove_file(&data_path);
                let _ = std::fs::remove_file(&meta_path);
                return Ok(None);
            }
        };

        let actual_size = std::fs::metadata(&data_path)?.len();
        if actual_size != meta.size {
            let _ = std::fs::remove_file(&data_path);
            let _ = std::fs::remove_file(&meta_path);
            return Ok(None);
        }

        if let Some(expected) = expected_checksum {
            if !expected.eq_ignore_ascii_case(&meta.actual_sha256) {
                let _ = std::fs::remove_file(&data_path);
                let _ = std::fs::remove_file(&meta_path);
                return Ok(None);
            }
            // Re-verify against the file on disk, not just the metadata, in
            // case it was tampered with independently of the sidecar.
            if hash_file(&data_path, Algo::Sha256)?.to_ascii_lowercase()
                != meta.actual_sha256.to_ascii_lowercase()
            {
                let _ = std::fs::remove_file(&data_path);
                let _ = std::fs::remove_file(&meta_path);
                return Ok(None);
            }
        }

        Ok(Some(data_path))
    }

    /// Save `source` (already-downloaded bytes) into the cache under `url`'s
    /// key. Writes `<key>.data.tmp` then renames to `<key>.data` before
    /// writing `<key>.meta`, so a concurrent reader never observes a
    /// partially-written data file.
    pub fn save(
        &self,
        url: &str,
        source: &Path,
        expected_checksum: Option<&str>,
    ) -> Result<PathBuf, DownloadError> {
        let key = Self::key(url);
        let data_path = self.data_path(key.as_str());
        let tmp_path = self.dir.join(format!("{key}.data.tmp"));
        let meta_path = self.meta_path(key.as_str());

        std::fs::copy(source, &tmp_path)?;
        std::fs::rename(&tmp_path, &data_path)?;

        let size = std::fs::metadata(&data_path)?.len();
        let actual_sha256 = hash_file(&data_path, Algo::Sha256)?;

        let meta = CacheMeta {
            url: url.to_string(),
            expected_checksum: expected_checksum.map(str::to_string),
            actual_sha256,
            size,
            cached_at: chrono::Utc::now().to_rfc3339(),
        };
        let meta_bytes = serde_json::to_vec_pretty(&meta)?;
        let meta_tmp = self.dir.join(format!("{key}.meta.tmp"));
        std::fs::write(&meta_tmp, meta_bytes)?;
        std::fs::rename(&meta_tmp, &meta_path)?;

        Ok(data_path)
    }
}

impl From<serde_json::Error> for DownloadError {
    fn from(e: serde_json::Error) -> Self {
        DownloadError::Io(std::io::Error::other(e))
    }
}
