//! Download cache and transport-hardening invariants, exercised through the
//! public `download` API: byte-identical round trips, HTTPS-only transport,
//! and checksum-gated cache hits that never touch the network.

use tempfile::tempdir;
use tokio_util::sync::CancellationToken;
use tsuku_core::download::{DownloadCache, DownloadError, Downloader};

#[test]
fn cache_round_trip_is_byte_identical() {
    let dir = tempdir().unwrap();
    let cache = DownloadCache::open(dir.path().join("cache")).unwrap();

    let src = dir.path().join("rg.tar.gz");
    let bytes = b"a ripgrep release archive, more or less";
    std::fs::write(&src, bytes).unwrap();

    cache.save("https://example.com/rg.tar.gz", &src, None).unwrap();
    let hit = cache.check("https://example.com/rg.tar.gz", None).unwrap().unwrap();
    assert_eq!(std::fs::read(&hit).unwrap(), bytes);
}

#[test]
fn cache_enforces_the_checksum_it_was_saved_under() {
    let dir = tempdir().unwrap();
    let cache = DownloadCache::open(dir.path().join("cache")).unwrap();

    let src = dir.path().join("rg.tar.gz");
    std::fs::write(&src, b"correct bytes").unwrap();
    let actual_sha256 = tsuku_core::verify::hash::hash_file(&src, tsuku_core::verify::hash::Algo::Sha256).unwrap();

    cache.save("https://example.com/rg.tar.gz", &src, Some(&actual_sha256)).unwrap();

    // A hit when the caller's expected checksum matches what was cached.
    assert!(cache
        .check("https://example.com/rg.tar.gz", Some(&actual_sha256))
        .unwrap()
        .is_some());

    // A miss (not a crash, not stale data) when it doesn't, and the stale
    // entry is cleaned up rather than left for a future caller to trust.
    let wrong = "0".repeat(64);
    assert!(cache.check("https://example.com/rg.tar.gz", Some(&wrong)).unwrap().is_none());
    assert!(cache.check("https://example.com/rg.tar.gz", Some(&actual_sha256)).unwrap().is_none());
}

#[test]
fn cache_hit_is_a_pure_filesystem_check_with_no_network_dependency() {
    // `DownloadCache::check` is synchronous and never constructs a
    // `Downloader`/`reqwest::Client` -- a cache hit genuinely cannot reach
    // the network, independent of whatever host the original URL named.
    let dir = tempdir().unwrap();
    let cache = DownloadCache::open(dir.path().join("cache")).unwrap();
    let src = dir.path().join("rg.tar.gz");
    std::fs::write(&src, b"bytes").unwrap();

    cache.save("https://unroutable.invalid/rg.tar.gz", &src, None).unwrap();
    let hit = cache.check("https://unroutable.invalid/rg.tar.gz", None).unwrap();
    assert!(hit.is_some());
}

#[tokio::test]
async fn downloader_refuses_plain_http_before_sending_anything() {
    let downloader = Downloader::new().unwrap();
    let cancel = CancellationToken::new();
    let dir = tempdir().unwrap();
    let dest = dir.path().join("out.bin");

    let err = downloader
        .download("http://example.com/rg.tar.gz", &dest, None, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, DownloadError::InsecureScheme(_)));
    assert!(!dest.exists());
}
