//! tsuku - a reproducible, user-space tool installer (plan/execute harness)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tsuku_core::action::context::{ExecutionContext, PlanContext};
use tsuku_core::action::registry::Registry;
use tsuku_core::recipe::{Recipe, VersionSource};
use tsuku_core::verify::hash::{hash_file, Algo};
use tsuku_core::paths;
use tsuku_schema::{Arch, Os};

#[derive(Parser)]
#[command(name = "tsuku", about = "Plan and install recipes against $TSUKU_HOME")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decompose a recipe into its flat primitive step sequence and print it as JSON.
    Plan {
        recipe: PathBuf,
        #[arg(long, value_parser = parse_os, default_value_t = Os::current())]
        os: Os,
        #[arg(long, value_parser = parse_arch, default_value_t = Arch::current())]
        arch: Arch,
    },
    /// Plan a recipe, then execute every step under $TSUKU_HOME.
    Install {
        recipe: PathBuf,
        #[arg(long, value_parser = parse_os, default_value_t = Os::current())]
        os: Os,
        #[arg(long, value_parser = parse_arch, default_value_t = Arch::current())]
        arch: Arch,
    },
    /// Print the SHA-256 of each given file.
    Hash { files: Vec<PathBuf> },
}

fn parse_os(s: &str) -> Result<Os, String> {
    Os::from_str(s)
}

fn parse_arch(s: &str) -> Result<Arch, String> {
    Arch::from_str(s)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Plan { recipe, os, arch } => cmd_plan(&recipe, os, arch).await,
        Commands::Install { recipe, os, arch } => cmd_install(&recipe, os, arch).await,
        Commands::Hash { files } => cmd_hash(&files),
    }
}

fn recipe_version(recipe: &Recipe) -> Result<(String, String)> {
    match &recipe.version_source {
        VersionSource::Fixed { version } => Ok((version.clone(), version.clone())),
        VersionSource::GitHubLatest { repo } => Err(anyhow!(
            "recipe '{}' uses version_source.kind = \"github_latest\" (repo '{repo}'); \
             tsuku-cli has no version resolver, pass a fixed version in the recipe",
            recipe.name
        )),
        VersionSource::GitTag { repo, pattern } => Err(anyhow!(
            "recipe '{}' uses version_source.kind = \"git_tag\" (repo '{repo}', pattern '{pattern}'); \
             tsuku-cli has no version resolver, pass a fixed version in the recipe",
            recipe.name
        )),
    }
}

async fn build_plan(recipe: &Recipe, os: Os, arch: Arch) -> Result<tsuku_core::action::step::Plan> {
    let (version, version_tag) = recipe_version(recipe)?;
    let registry = Registry::with_defaults();
    let plan_ctx = PlanContext {
        version,
        version_tag,
        os,
        arch,
        recipe: Arc::new(recipe.clone()),
        asset_resolver: None,
        pre_downloader: None,
        download_cache: None,
    };

    let mut plan = tsuku_core::action::step::Plan::new();
    for action in &recipe.actions {
        let sub_plan =
            tsuku_core::action::decompose::decompose(&registry, &plan_ctx, &action.action, &action.params, None)
                .await
                .with_context(|| format!("decomposing action '{}'", action.action))?;
        plan.extend(sub_plan);
    }
    Ok(plan)
}

async fn cmd_plan(recipe_path: &PathBuf, os: Os, arch: Arch) -> Result<()> {
    let recipe = Recipe::load(recipe_path).with_context(|| format!("loading {}", recipe_path.display()))?;
    let plan = build_plan(&recipe, os, arch).await?;
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}

async fn cmd_install(recipe_path: &PathBuf, os: Os, arch: Arch) -> Result<()> {
    let recipe = Recipe::load(recipe_path).with_context(|| format!("loading {}", recipe_path.display()))?;
    let (version, _) = recipe_version(&recipe)?;
    let plan = build_plan(&recipe, os, arch).await?;

    let registry = Registry::with_defaults();
    let install_dir = paths::tool_dir(&recipe.name, &version);
    let work_dir = paths::tsuku_home().join("work").join(format!("{}-{version}", recipe.name));
    std::fs::create_dir_all(&install_dir)?;
    std::fs::create_dir_all(&work_dir)?;

    let ctx = ExecutionContext {
        cancellation: CancellationToken::new(),
        install_dir,
        work_dir: work_dir.clone(),
        tools_dir: paths::tsuku_home().join("tools"),
        libs_dir: paths::tsuku_home().join("libs"),
        apps_dir: paths::tsuku_home().join("apps"),
        download_cache_dir: paths::download_cache_dir(),
        key_cache_dir: paths::key_cache_dir(),
        os,
        arch,
        recipe: Arc::new(recipe.clone()),
        resolved_dependencies: BTreeMap::new(),
        exec_paths: Mutex::new(Vec::new()),
        env: Mutex::new(BTreeMap::new()),
    };

    for step in &plan.steps {
        tracing::info!(action = step.action_name.as_str(), "executing step");
        let action = registry
            .get(&step.action_name)
            .ok_or_else(|| anyhow!("unknown primitive '{}'", step.action_name))?;

        let preflight = action.preflight(&step.params);
        for warning in &preflight.warnings {
            tracing::warn!(%warning, action = step.action_name.as_str(), "preflight warning");
        }
        if !preflight.is_ok() {
            let _ = std::fs::remove_dir_all(&work_dir);
            return Err(anyhow!(
                "preflight failed for '{}': {:?}",
                step.action_name,
                preflight.errors
            ));
        }

        if let Err(err) = action.execute(&ctx, &step.params).await {
            let _ = std::fs::remove_dir_all(&work_dir);
            return Err(anyhow::Error::from(err)).with_context(|| format!("executing step '{}'", step.action_name));
        }
    }

    let _ = std::fs::remove_dir_all(&work_dir);
    println!("installed {} {version} -> {}", recipe.name, ctx.install_dir.display());
    Ok(())
}

fn cmd_hash(files: &[PathBuf]) -> Result<()> {
    if files.is_empty() {
        return Err(anyhow!("hash requires at least one file"));
    }
    for file in files {
        let digest = hash_file(file, Algo::Sha256).with_context(|| format!("hashing {}", file.display()))?;
        println!("{digest}  {}", file.display());
    }
    Ok(())
}
