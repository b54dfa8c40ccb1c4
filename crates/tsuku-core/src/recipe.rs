//! Recipe parsing: the TOML document a user writes to describe how to
//! install one tool.
//!
//! Grounded on the teacher's `core::package` TOML model (serde structs with
//! `#[serde(default)]` leaf fields, a dedicated `PackageError`), generalized
//! from the teacher's fixed `Source`/`Binary`/`App` shape to the spec's
//! open-ended `action: params` step list (spec.md §3 `Recipe`).

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tsuku_schema::ParamBag;

/// Errors parsing a recipe document.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// I/O failure reading the recipe file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The document wasn't valid TOML, or didn't match the recipe shape.
    #[error("recipe parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// `install_mode` is `directory` or `directory_wrapped` but no
    /// `[verify]` section was given (spec.md §4.5 verification gate).
    #[error("recipe for '{name}' uses install_mode requiring a [verify] section, but none was given")]
    MissingVerify {
        /// The recipe's declared name.
        name: String,
    },
}

/// How a recipe resolves the version it installs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionSource {
    /// A hardcoded version string, no network lookup needed.
    Fixed {
        /// The version string to use verbatim.
        version: String,
    },
    /// The latest GitHub release of `repo` (`owner/name`).
    GitHubLatest {
        /// `owner/name` repository slug.
        repo: String,
    },
    /// The latest tag of `repo` matching `pattern`, a `{version}`-containing
    /// glob-like template (e.g. `v{version}`).
    GitTag {
        /// `owner/name` repository slug.
        repo: String,
        /// Tag-matching template containing a `{version}` placeholder.
        pattern: String,
    },
}

/// A single step in a recipe's action list: an action name plus its
/// parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeAction {
    /// The action's registered name (primitive or composite).
    pub action: String,
    /// Parameters passed to the action, as written in the recipe.
    #[serde(default)]
    pub params: ParamBag,
}

/// The command used to sanity-check an install once it's placed, required
/// when `install_mode` is `directory` or `directory_wrapped`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyCommand {
    /// Argv to run, relative to `install_dir/bin` or absolute.
    pub command: Vec<String>,
    /// Expected exit code; defaults to 0.
    #[serde(default)]
    pub expect_exit_code: Option<i32>,
}

/// A parsed recipe: the tool's name, how to resolve its version, and the
/// action steps that produce an install.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// The tool's name, used for `$TSUKU_HOME/tools/<name>-<version>`.
    pub name: String,
    /// How to resolve the concrete version to install.
    pub version_source: VersionSource,
    /// The ordered action list; composites in this list are expanded by
    /// the decomposition engine before execution.
    pub actions: Vec<RecipeAction>,
    /// Required when any action uses `install_mode ∈ {directory,
    /// directory_wrapped}`.
    #[serde(default)]
    pub verify: Option<VerifyCommand>,
    /// Declared install-time and runtime dependency names, by tool name.
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
}

impl Recipe {
    /// Parse a recipe from its TOML source text.
    pub fn parse(contents: &str) -> Result<Self, RecipeError> {
        let recipe: Recipe = toml::from_str(contents)?;
        recipe.validate()?;
        Ok(recipe)
    }

    /// Load and parse a recipe from a file path.
    pub fn load(path: &Path) -> Result<Self, RecipeError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    fn validate(&self) -> Result<(), RecipeError> {
        let needs_verify = self.actions.iter().any(|a| {
            a.params
                .get_str("install_mode")
                .is_some_and(|m| m == "directory" || m == "directory_wrapped")
        });
        if needs_verify && self.verify.is_none() {
            return Err(RecipeError::MissingVerify {
                name: self.name.clone(),
            });
        }
        Ok(())
    }
}
