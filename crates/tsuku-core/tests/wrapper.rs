//! Wrapper relocatability (P7): a generated wrapper never bakes in the
//! absolute path of the directory it was written under, so moving the
//! whole install tree leaves it working unchanged.

use std::collections::BTreeMap;

use tempfile::tempdir;
use tsuku_core::relocate::wrapper::{write_ecosystem_wrapper, write_module_exec_wrapper};

#[test]
fn ecosystem_wrapper_contains_no_reference_to_its_own_install_path() {
    let root = tempdir().unwrap();
    let install_dir = root.path().join("tools/ripgrep-14.1.0");
    let bin_dir = install_dir.join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();

    let mut env = BTreeMap::new();
    env.insert("PERL5LIB".to_string(), "/opt/t/libs/perl-5.38/lib/perl5".to_string());
    write_ecosystem_wrapper(&bin_dir, "cpanm-tool", "cpan", "perl", &env, &[]).unwrap();

    let wrapper_path = bin_dir.join("cpanm-tool");
    let contents_before = std::fs::read_to_string(&wrapper_path).unwrap();
    assert!(
        !contents_before.contains(&install_dir.display().to_string()),
        "wrapper script must not bake in its own install directory's absolute path"
    );

    // Move the whole install tree -- a relocatable wrapper's script content
    // is location-independent, so the file should read back byte-identical
    // at its new home.
    let moved_install_dir = root.path().join("tools/ripgrep-14.1.0-moved");
    std::fs::rename(&install_dir, &moved_install_dir).unwrap();

    let moved_wrapper_path = moved_install_dir.join("bin/cpanm-tool");
    let contents_after = std::fs::read_to_string(&moved_wrapper_path).unwrap();
    assert_eq!(contents_before, contents_after);
    assert!(contents_after.contains("SCRIPT_DIR=\"$(resolve_script_dir)\""));
}

#[cfg(unix)]
#[test]
fn relocated_wrapper_actually_resolves_its_own_directory_at_runtime() {
    // Exercises the `resolve_script_dir` preamble for real: a plain `sh`
    // invocation of the relocated script must still find its sibling
    // runtime file, proving `$SCRIPT_DIR` tracks wherever the script
    // currently lives rather than wherever it was written.
    let root = tempdir().unwrap();
    let install_dir = root.path().join("tools/black-24.1.0");
    let bin_dir = install_dir.join("bin");
    std::fs::create_dir_all(&bin_dir).unwrap();

    write_module_exec_wrapper(&bin_dir, "black", "echo", "black_marker", &BTreeMap::new()).unwrap();

    let moved_install_dir = root.path().join("apps/black-24.1.0-relocated");
    std::fs::rename(&install_dir, &moved_install_dir).unwrap();

    let wrapper_path = moved_install_dir.join("bin/black");
    let output = std::process::Command::new("bash").arg(&wrapper_path).output().unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "-m black_marker");
}
