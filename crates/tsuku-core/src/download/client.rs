use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::{is_retryable_status, DownloadError};

const USER_AGENT: &str = concat!("tsuku/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;
const BACKOFFS_SECS: [u64; 3] = [1, 2, 4];

/// Outcome of a completed download: where it landed, and what it hashed to.
#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    /// Path to the downloaded bytes on disk.
    pub path: PathBuf,
    /// SHA-256 of the downloaded bytes, hex-encoded.
    pub sha256: String,
    /// Size in bytes.
    pub size: u64,
}

/// An HTTPS-only downloader with bounded redirects, retry-with-backoff, and
/// decompression-bomb resistance.
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    /// Build a downloader with the transport hardening spec.md §4.4
    /// requires: redirects are followed only while they stay on `https://`
    /// and within [`MAX_REDIRECTS`] hops.
    pub fn new() -> Result<Self, DownloadError> {
        let policy = reqwest::redirect::Policy::custom(|attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                return attempt.error("exceeded maximum redirect depth");
            }
            if attempt.url().scheme() != "https" {
                return attempt.error("redirect downgraded away from https");
            }
            attempt.follow()
        });

        let client = reqwest::Client::builder()
            .redirect(policy)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Download `url` to `dest`, verifying against `expected_sha256` if
    /// given. Retries transient failures with the `1s, 2s, 4s` backoff
    /// schedule; honors `cancel` between attempts and during the backoff
    /// sleep.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, DownloadError> {
        if !url.starts_with("https://") {
            return Err(DownloadError::InsecureScheme(url.to_string()));
        }

        let mut last_status = 0u16;
        for (attempt, backoff) in std::iter::once(0)
            .chain(BACKOFFS_SECS.iter().copied())
            .enumerate()
        {
            if attempt > 0 {
                if cancel.is_cancelled() {
                    return Err(DownloadError::Cancelled);
                }
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(backoff)) => {}
                    _ = cancel.cancelled() => return Err(DownloadError::Cancelled),
                }
            }

            match self.try_once(url, dest, expected_sha256, cancel).await {
                Ok(outcome) => return Ok(outcome),
                Err(TryError::Retryable(status)) => {
                    last_status = status;
                    continue;
                }
                Err(TryError::Fatal(e)) => return Err(e),
            }
        }

        Err(DownloadError::RetriesExhausted {
            status: last_status,
        })
    }

    async fn try_once(
        &self,
        url: &str,
        dest: &Path,
        expected_sha256: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<DownloadOutcome, TryError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|e| TryError::Fatal(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let code = status.as_u16();
            return if is_retryable_status(code) {
                Err(TryError::Retryable(code))
            } else {
                Err(TryError::Fatal(DownloadError::StatusError { status: code }))
            };
        }

        if let Some(encoding) = response.headers().get(reqwest::header::CONTENT_ENCODING) {
            let value = encoding.to_str().unwrap_or("").to_ascii_lowercase();
            if value != "identity" && !value.is_empty() {
                return Err(TryError::Fatal(DownloadError::UnexpectedContentEncoding(
                    value,
                )));
            }
        }

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| TryError::Fatal(e.into()))?;
        }

        let tmp_path = dest.with_extension("tsuku-download-tmp");
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(|e| TryError::Fatal(e.into()))?;

        let mut hasher = Sha256::new();
        let mut size: u64 = 0;
        let mut stream = response.bytes_stream();

        use futures::StreamExt;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    drop(file);
                    let _ = tokio::fs::remove_file(&tmp_path).await;
                    return Err(TryError::Fatal(DownloadError::Cancelled));
                }
                chunk = stream.next() => {
                    match chunk {
                        None => break,
                        Some(Err(e)) => return Err(TryError::Fatal(e.into())),
                        Some(Ok(bytes)) => {
                            hasher.update(&bytes);
                            size += bytes.len() as u64;
                            file.write_all(&bytes)
                                .await
                                .map_err(|e| TryError::Fatal(e.into()))?;
                        }
                    }
                }
            }
        }
        file.flush().await.map_err(|e| TryError::Fatal(e.into()))?;
        drop(file);

        let actual_sha256 = hex::encode(hasher.finalize());
        if let Some(expected) = expected_sha256 {
            if !actual_sha256.eq_ignore_ascii_case(expected) {
                let _ = tokio::fs::remove_file(&tmp_path).await;
                return Err(TryError::Fatal(DownloadError::HashMismatch {
                    expected: expected.to_string(),
                    actual: actual_sha256,
                }));
            }
        }

        tokio::fs::rename(&tmp_path, dest)
            .await
            .map_err(|e| TryError::Fatal(e.into()))?;

        Ok(DownloadOutcome {
            path: dest.to_path_buf(),
            sha256: actual_sha256,
            size,
        })
    }
}

enum TryError {
    Retryable(u16),
    Fatal(DownloadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_set_matches_spec() {
        assert!(super::is_retryable_status(403));
        assert!(super::is_retryable_status(408));
        assert!(super::is_retryable_status(425));
        assert!(super::is_retryable_status(429));
        assert!(super::is_retryable_status(500));
        assert!(super::is_retryable_status(599));
        assert!(!super::is_retryable_status(404));
        assert!(!super::is_retryable_status(401));
    }

    #[tokio::test]
    async fn rejects_non_https_before_any_request() {
        let downloader = Downloader::new().unwrap();
        let cancel = CancellationToken::new();
        let dest = std::env::temp_dir().join("tsuku-test-insecure-dest");
        let err = downloader
            .download("http://example.com/x", &dest, None, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::InsecureScheme(_)));
    }
}
