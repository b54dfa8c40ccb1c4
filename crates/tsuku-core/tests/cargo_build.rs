//! `cargo_build`'s lockfile checksum gate: a `Cargo.lock` that doesn't match
//! its pinned checksum is rejected before any toolchain is touched; one
//! that matches clears the gate and is written to the source tree.

use std::sync::Mutex;

use tempfile::tempdir;
use tsuku_core::action::context::ExecutionContext;
use tsuku_core::action::registry::{Action, Registry};
use tsuku_core::verify::hash::{hash_file, Algo};
use tsuku_core::TsukuError;
use tsuku_schema::ParamBag;

fn ctx_at(work_dir: &std::path::Path) -> ExecutionContext {
    ExecutionContext {
        cancellation: tokio_util::sync::CancellationToken::new(),
        install_dir: work_dir.join("install"),
        work_dir: work_dir.to_path_buf(),
        tools_dir: work_dir.join("tools"),
        libs_dir: work_dir.join("libs"),
        apps_dir: work_dir.join("apps"),
        download_cache_dir: work_dir.join("cache"),
        key_cache_dir: work_dir.join("keys"),
        os: tsuku_schema::Os::Linux,
        arch: tsuku_schema::Arch::X86_64,
        recipe: std::sync::Arc::new(tsuku_core::recipe::Recipe {
            name: "ripgrep".to_string(),
            version_source: tsuku_core::recipe::VersionSource::Fixed {
                version: "14.1.0".to_string(),
            },
            actions: vec![],
            verify: None,
            dependencies: Default::default(),
        }),
        resolved_dependencies: Default::default(),
        exec_paths: Mutex::new(Vec::new()),
        env: Mutex::new(Default::default()),
    }
}

#[tokio::test]
async fn a_tampered_lock_data_is_rejected_before_any_build_runs() {
    let work = tempdir().unwrap();
    std::fs::create_dir_all(work.path().join("src")).unwrap();
    let ctx = ctx_at(work.path());

    let real_lock = "# Cargo.lock\nversion = 3\n";
    let real_checksum = hash_file_of_str(real_lock);

    let mut tampered = real_lock.to_string();
    tampered.push_str("# tampered\n");

    let registry = Registry::with_defaults();
    let action = registry.get("cargo_build").unwrap();
    let params = ParamBag::new()
        .with("path", "src")
        .with("bins", vec!["rg".to_string()])
        .with("lock_data", tampered)
        .with("lock_checksum", real_checksum);

    let err = action.execute(&ctx, &params).await.unwrap_err();
    assert!(matches!(err, TsukuError::VerificationFailure(_)));
    // The gate rejected before ever writing the source tree's Cargo.lock.
    assert!(!work.path().join("src/Cargo.lock").exists());
}

#[tokio::test]
async fn matching_lock_data_clears_the_gate_and_is_written_to_the_source_tree() {
    let work = tempdir().unwrap();
    std::fs::create_dir_all(work.path().join("src")).unwrap();
    let ctx = ctx_at(work.path());

    let lock_data = "# Cargo.lock\nversion = 3\n";
    let checksum = hash_file_of_str(lock_data);

    let registry = Registry::with_defaults();
    let action = registry.get("cargo_build").unwrap();
    let params = ParamBag::new()
        .with("path", "src")
        .with("bins", vec!["rg".to_string()])
        .with("lock_data", lock_data)
        .with("lock_checksum", checksum);

    // No "rust" toolchain is installed under tools_dir in this test, so the
    // build itself cannot proceed -- but that failure must come from the
    // toolchain lookup, not the checksum gate, proving the gate let a
    // correctly-checksummed lock through.
    let err = action.execute(&ctx, &params).await.unwrap_err();
    assert!(matches!(err, TsukuError::InvalidParam(_)));
    assert_eq!(std::fs::read_to_string(work.path().join("src/Cargo.lock")).unwrap(), lock_data);
}

fn hash_file_of_str(contents: &str) -> String {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Cargo.lock");
    std::fs::write(&path, contents).unwrap();
    hash_file(&path, Algo::Sha256).unwrap()
}
