//! PlanContext (plan-time) and ExecutionContext (execute-time), per
//! spec.md §3.
//!
//! Grounded on the teacher's `Builder`/`Sysroot` pairing (one struct for
//! "where things mount and run", threaded through every build step) and on
//! `ExecutionContext` as the execute-time analogue.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tsuku_schema::{Arch, Os};

use crate::download::{DownloadCache, Downloader};
use crate::expand::ExpansionContext;
use crate::recipe::Recipe;

/// A capability for resolving a composite's `asset_pattern` against a
/// concrete list of release asset filenames.
pub trait AssetResolver: Send + Sync {
    /// Pick the asset filename that matches `pattern` for `os`/`arch` out of
    /// `candidates`, or `None` if nothing matches.
    fn resolve<'a>(&self, pattern: &str, os: Os, arch: Arch, candidates: &'a [String]) -> Option<&'a str>;
}

/// A capability for fetching a URL at plan time, returning its path plus
/// SHA-256 and size, so composites can annotate their emitted `download_file`
/// step with a checksum before anything executes.
#[async_trait::async_trait]
pub trait PreDownloader: Send + Sync {
    /// Fetch `url`, returning its SHA-256 hex digest and size in bytes.
    async fn pre_download(&self, url: &str) -> Result<(String, u64), crate::download::DownloadError>;
}

/// Context threaded through `Decompose` calls: everything a composite needs
/// to expand itself into primitive steps without performing side effects
/// beyond (optionally) a plan-time pre-download.
pub struct PlanContext {
    /// The resolved concrete version (e.g. `"14.1.0"`).
    pub version: String,
    /// The original, unresolved version tag/spec as written by the user or
    /// resolver (e.g. `"v14.1.0"`).
    pub version_tag: String,
    /// Target OS for this plan.
    pub os: Os,
    /// Target architecture for this plan.
    pub arch: Arch,
    /// The recipe this plan is being built from.
    pub recipe: Arc<Recipe>,
    /// Resolves asset-filename patterns against real candidate lists.
    pub asset_resolver: Option<Arc<dyn AssetResolver>>,
    /// Fetches a URL at plan time to pre-compute its checksum.
    pub pre_downloader: Option<Arc<dyn PreDownloader>>,
    /// Optional download cache consulted during plan-time pre-downloads.
    pub download_cache: Option<Arc<DownloadCache>>,
}

impl PlanContext {
    /// Build the variable-expansion context a composite's params should be
    /// expanded against before use.
    pub fn expansion(&self) -> ExpansionContext {
        ExpansionContext::new()
            .with_var("version", &self.version)
            .with_var("version_tag", &self.version_tag)
            .with_var("os", self.os.as_str())
            .with_var("arch", self.arch.as_str())
    }
}

/// Context threaded through `Action::execute` calls: directories, the
/// cancellation handle, resolved dependencies, and the accumulated
/// environment that `setup_build_env` mutates for later steps.
pub struct ExecutionContext {
    /// Cancellation handle honored by every blocking operation.
    pub cancellation: CancellationToken,
    /// Where the finished install lands: `tools|libs|apps/<name>-<version>`.
    pub install_dir: PathBuf,
    /// Scratch directory for this install; removed on completion.
    pub work_dir: PathBuf,
    /// `$TSUKU_HOME/tools`.
    pub tools_dir: PathBuf,
    /// `$TSUKU_HOME/libs`.
    pub libs_dir: PathBuf,
    /// `$TSUKU_HOME/apps`.
    pub apps_dir: PathBuf,
    /// `$TSUKU_HOME/cache/downloads`.
    pub download_cache_dir: PathBuf,
    /// `$TSUKU_HOME/cache/keys`.
    pub key_cache_dir: PathBuf,
    /// Target OS for this execution.
    pub os: Os,
    /// Target architecture for this execution.
    pub arch: Arch,
    /// The recipe being installed.
    pub recipe: Arc<Recipe>,
    /// Dependency name -> pinned version, as resolved before execution.
    pub resolved_dependencies: BTreeMap<String, String>,
    /// `PATH`-like search dirs accumulated by `setup_build_env`, prepended
    /// in insertion order. `Mutex`-wrapped so a step can extend it for
    /// later steps despite `execute` taking `&ExecutionContext`.
    pub exec_paths: Mutex<Vec<PathBuf>>,
    /// Environment variables accumulated by `setup_build_env` for
    /// subsequent steps (`PKG_CONFIG_PATH`, `CPPFLAGS`, `LDFLAGS`, ...).
    pub env: Mutex<BTreeMap<String, String>>,
}

impl ExecutionContext {
    /// Build the variable-expansion context a primitive's params should be
    /// expanded against before use.
    pub fn expansion(&self) -> ExpansionContext {
        let mut ctx = ExpansionContext::new()
            .with_var("os", self.os.as_str())
            .with_var("arch", self.arch.as_str())
            .with_var("install_dir", self.install_dir.display().to_string())
            .with_var("work_dir", self.work_dir.display().to_string())
            .with_var("libs_dir", self.libs_dir.display().to_string());
        for (name, version) in &self.resolved_dependencies {
            ctx = ctx.with_dep_version(name, version);
        }
        ctx
    }

    /// True if cancellation has been requested; call sites check this
    /// before starting a new blocking operation.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Merge `vars` into the accumulated environment for subsequent steps.
    pub fn extend_env(&self, vars: impl IntoIterator<Item = (String, String)>) {
        let mut env = self.env.lock().expect("env mutex poisoned");
        env.extend(vars);
    }

    /// Prepend `paths` to the accumulated `PATH`-like search list.
    pub fn extend_exec_paths(&self, paths: impl IntoIterator<Item = PathBuf>) {
        let mut exec_paths = self.exec_paths.lock().expect("exec_paths mutex poisoned");
        for path in paths {
            exec_paths.push(path);
        }
    }

    /// A snapshot of the accumulated environment.
    pub fn env_snapshot(&self) -> BTreeMap<String, String> {
        self.env.lock().expect("env mutex poisoned").clone()
    }

    /// A snapshot of the accumulated `PATH`-like search list.
    pub fn exec_paths_snapshot(&self) -> Vec<PathBuf> {
        self.exec_paths.lock().expect("exec_paths mutex poisoned").clone()
    }
}

/// Shared, process-wide downloader instance, reused across plan-time
/// pre-downloads and execute-time `download_file` steps.
pub fn default_downloader() -> Result<Downloader, crate::download::DownloadError> {
    Downloader::new()
}
