//! `{ident}` / `{deps.NAME.version}` textual variable expansion.
//!
//! Grounded on the teacher's `core::resolver` dependency-name bookkeeping,
//! generalized per spec.md §4.1: a fixed set of scalar variables plus a
//! `deps.<name>.version` lookup, expanded as plain text substitution (not a
//! templating engine -- the source spec treats this as string replacement,
//! and nothing in this domain needs more).

use std::collections::BTreeMap;

/// The variables available for `{ident}` expansion, gathered from a
/// PlanContext/ExecutionContext.
#[derive(Debug, Clone, Default)]
pub struct ExpansionContext {
    /// Scalar variables: `version`, `version_tag`, `os`, `arch`,
    /// `install_dir`, `work_dir`, `libs_dir`, and any OS/arch vendor
    /// mappings a composite has pre-populated (e.g. `os_mapped`).
    pub vars: BTreeMap<String, String>,
    /// Resolved dependency versions, keyed by dependency name, for
    /// `{deps.<name>.version}`.
    pub deps: BTreeMap<String, String>,
}

impl ExpansionContext {
    /// Start an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a scalar variable, builder-style.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Record a dependency's resolved version, builder-style.
    pub fn with_dep_version(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.deps.insert(name.into(), version.into());
        self
    }

    fn resolve(&self, ident: &str) -> Option<String> {
        if let Some(rest) = ident.strip_prefix("deps.") {
            let (dep_name, field) = rest.split_once('.')?;
            if field != "version" {
                return None;
            }
            return self.deps.get(dep_name).cloned();
        }
        self.vars.get(ident).cloned()
    }

    /// Expand every `{ident}` token in `template`. An identifier with no
    /// resolvable value is left untouched in the output, per spec.md §4.1
    /// ("unknown placeholders are preserved literally for debuggability").
    pub fn expand(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            let Some(close_rel) = rest[open..].find('}') else {
                out.push_str(rest);
                return out;
            };
            let close = open + close_rel;
            let ident = &rest[open + 1..close];

            out.push_str(&rest[..open]);
            match self.resolve(ident) {
                Some(value) => out.push_str(&value),
                None => {
                    out.push('{');
                    out.push_str(ident);
                    out.push('}');
                }
            }
            rest = &rest[close + 1..];
        }
        out.push_str(rest);
        out
    }

    /// True if `template` contains a `{ident}` placeholder that this
    /// context cannot resolve -- used by preflight to warn, per spec.md
    /// §4.1, rather than fail outright.
    pub fn has_unresolved_placeholder(&self, template: &str) -> bool {
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close_rel) = rest[open..].find('}') else {
                return false;
            };
            let close = open + close_rel;
            let ident = &rest[open + 1..close];
            if self.resolve(ident).is_none() {
                return true;
            }
            rest = &rest[close + 1..];
        }
        false
    }
}
