// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Discovery of layer files and operations over the loaded set.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::environment::{Environment, env_file_line};
use crate::graph::LayerGraph;
use crate::layer::EnvLayer;
use crate::metadata::Metadata;
use crate::resolver::{self, ApplyReport, VariableResolver};
use crate::validation::{self, ValidationReport};
use crate::{Error, Result};

#[cfg(test)]
#[path = "./manager_test.rs"]
mod manager_test;

/// Longest description shown in a layer listing.
pub const MAX_LISTED_DESCRIPTION: usize = 60;

/// Options for layer discovery.
#[derive(Debug, Clone)]
pub struct ManagerOptions {
    /// Directories searched recursively, in order.
    pub search_paths: Vec<PathBuf>,

    /// Glob patterns matched below each search path.
    pub file_patterns: Vec<String>,

    /// Keep `${VAR}` references in dependency lists unevaluated.
    pub doc_mode: bool,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from("./layer")],
            file_patterns: vec!["*.yaml".to_string(), "*.yml".to_string()],
            doc_mode: false,
        }
    }
}

impl ManagerOptions {
    /// Split a colon-separated list of search paths.
    pub fn parse_search_paths(list: &str) -> Vec<PathBuf> {
        list.split(':')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect()
    }
}

/// Why a matched file was not loaded as a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The file parsed but declares no `X-Env-Layer-Name`.
    NotALayer,
    /// The metadata has syntax errors.
    LintErrors(Vec<String>),
}

/// Result of loading one matched file.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Box<Metadata>),
    Skipped(SkipReason),
    Malformed(Error),
}

/// Load one candidate layer file.
pub fn load_layer_file(path: &Path, doc_mode: bool, env: &dyn Environment) -> LoadOutcome {
    let meta = match Metadata::load(path, doc_mode, env) {
        Ok(meta) => meta,
        Err(err) => return LoadOutcome::Malformed(err),
    };
    if !meta.has_layer_info() {
        return LoadOutcome::Skipped(SkipReason::NotALayer);
    }
    let lint = meta.lint_metadata_syntax();
    if !lint.is_empty() {
        let messages = lint.iter().map(|(k, r)| r.describe(k)).collect();
        return LoadOutcome::Skipped(SkipReason::LintErrors(messages));
    }
    LoadOutcome::Loaded(Box::new(meta))
}

/// Outcome of a dependency check for one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    pub layer: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl DependencyReport {
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The `mmdebstrap` section of a layer's YAML body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub architectures: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,
    #[serde(flatten)]
    pub other: IndexMap<String, serde_yaml::Value>,
}

/// All layers found below a set of search paths.
#[derive(Debug)]
pub struct LayerManager {
    search_paths: Vec<PathBuf>,
    doc_mode: bool,
    layers: IndexMap<String, Metadata>,
    layer_files: IndexMap<String, PathBuf>,
    graph: LayerGraph,
    provider_index: IndexMap<String, String>,
    provider_conflicts: IndexMap<String, BTreeSet<String>>,
    write_log: IndexMap<String, String>,
}

impl LayerManager {
    /// Discover and load every layer below the configured search paths.
    ///
    /// Files that fail to parse, are not layers, or have metadata syntax
    /// errors are skipped. Two files declaring the same layer name is an
    /// error.
    pub fn new(options: ManagerOptions, env: &dyn Environment) -> Result<Self> {
        let mut search_paths = Vec::with_capacity(options.search_paths.len());
        for path in &options.search_paths {
            let resolved = match dunce::canonicalize(path) {
                Ok(path) => path,
                Err(_) => std::path::absolute(path)?,
            };
            if !resolved.exists() {
                tracing::warn!("Search path '{}' does not exist", resolved.display());
            }
            search_paths.push(resolved);
        }

        let mut manager = Self {
            search_paths,
            doc_mode: options.doc_mode,
            layers: IndexMap::new(),
            layer_files: IndexMap::new(),
            graph: LayerGraph::new(),
            provider_index: IndexMap::new(),
            provider_conflicts: IndexMap::new(),
            write_log: IndexMap::new(),
        };
        manager.load_layers(&options.file_patterns, env)?;
        manager.build_provider_index();
        Ok(manager)
    }

    fn load_layers(&mut self, patterns: &[String], env: &dyn Environment) -> Result<()> {
        let mut seen = HashSet::new();
        for search_path in self.search_paths.clone() {
            if !search_path.exists() {
                continue;
            }
            for file in find_files(&search_path, patterns)? {
                if !seen.insert(file.clone()) {
                    continue;
                }
                match load_layer_file(&file, self.doc_mode, env) {
                    LoadOutcome::Loaded(meta) => self.insert_layer(*meta, file, &search_path)?,
                    LoadOutcome::Skipped(SkipReason::NotALayer) => {
                        tracing::debug!(path = %file.display(), "not a layer");
                    }
                    LoadOutcome::Skipped(SkipReason::LintErrors(messages)) => {
                        tracing::warn!(
                            "Skipped layer from {} (syntax errors): {}",
                            relative_to(&file, &search_path).display(),
                            messages.join("; ")
                        );
                    }
                    LoadOutcome::Malformed(err) => {
                        tracing::debug!(path = %file.display(), %err, "skipping file");
                    }
                }
            }
        }
        Ok(())
    }

    fn insert_layer(&mut self, meta: Metadata, file: PathBuf, search_path: &Path) -> Result<()> {
        let Some(layer) = meta.layer_info() else {
            return Ok(());
        };
        let name = layer.name.clone();
        if let Some(first) = self.layer_files.get(&name) {
            return Err(Error::DuplicateLayer {
                name,
                first: first.clone(),
                second: file,
            });
        }
        tracing::debug!(
            layer = %name,
            path = %relative_to(&file, search_path).display(),
            "loaded layer"
        );
        self.graph.add_layer(layer);
        self.layer_files.insert(name.clone(), file);
        self.layers.insert(name, meta);
        Ok(())
    }

    fn build_provider_index(&mut self) {
        for (name, meta) in &self.layers {
            let Some(layer) = meta.layer_info() else {
                continue;
            };
            for token in &layer.provides {
                match self.provider_index.get(token) {
                    Some(existing) if existing != name => {
                        let conflict = self.provider_conflicts.entry(token.clone()).or_default();
                        conflict.insert(existing.clone());
                        conflict.insert(name.clone());
                    }
                    Some(_) => {}
                    None => {
                        self.provider_index.insert(token.clone(), name.clone());
                    }
                }
            }
        }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn layers(&self) -> &IndexMap<String, Metadata> {
        &self.layers
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn layer(&self, name: &str) -> Result<&Metadata> {
        self.layers
            .get(name)
            .ok_or_else(|| Error::LayerNotFound(name.to_string()))
    }

    pub fn layer_info(&self, name: &str) -> Option<&EnvLayer> {
        self.layers.get(name).and_then(Metadata::layer_info)
    }

    pub fn layer_file(&self, name: &str) -> Option<&Path> {
        self.layer_files.get(name).map(PathBuf::as_path)
    }

    pub fn graph(&self) -> &LayerGraph {
        &self.graph
    }

    /// First loaded provider of each capability.
    pub fn provider_index(&self) -> &IndexMap<String, String> {
        &self.provider_index
    }

    /// Capabilities provided by more than one loaded layer.
    pub fn provider_conflicts(&self) -> &IndexMap<String, BTreeSet<String>> {
        &self.provider_conflicts
    }

    pub fn dependencies(&self, name: &str) -> &[String] {
        self.graph.requires(name)
    }

    pub fn optional_dependencies(&self, name: &str) -> &[String] {
        self.graph.optional(name)
    }

    /// Loaded layers that require `name`, which may also be a layer path.
    pub fn reverse_dependencies(&self, name: &str) -> Vec<String> {
        match self.resolve_layer_name(name) {
            Some(target) => self.graph.reverse_dependencies(&target),
            None => Vec::new(),
        }
    }

    pub fn all_dependencies(&self, name: &str, include_optional: bool) -> Vec<String> {
        self.graph.transitive_dependencies(name, include_optional)
    }

    /// Dependency-ordered list of layers needed for the targets.
    pub fn get_build_order<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<String>> {
        let order = self.graph.build_order(targets)?;
        self.graph.check_providers(&order)?;
        Ok(order)
    }

    /// Check that everything a layer needs is loaded and consistent.
    pub fn check_dependencies(&self, name: &str) -> DependencyReport {
        let mut report = DependencyReport {
            layer: name.to_string(),
            ..Default::default()
        };
        if !self.layers.contains_key(name) {
            report
                .errors
                .push(format!("Layer '{name}' not found in search paths"));
            return report;
        }

        for dep in self.all_dependencies(name, false) {
            if !self.layers.contains_key(&dep) {
                report
                    .errors
                    .push(Error::MissingDependency(dep).to_string());
            }
        }
        for dep in self.optional_dependencies(name) {
            if !self.layers.contains_key(dep) {
                report
                    .warnings
                    .push(format!("Optional dependency not available: {dep}"));
            }
        }

        if let Some(chain) = self.graph.find_cycle(name) {
            report
                .errors
                .push(Error::CircularDependency { chain }.to_string());
        } else if let Err(err) = self.get_build_order(&[name]) {
            let message = err.to_string();
            if !report.errors.contains(&message) {
                report.errors.push(message);
            }
        }
        report
    }

    /// Find a loaded layer by name or by the path of its file.
    pub fn resolve_layer_name(&self, identifier: &str) -> Option<String> {
        if self.layers.contains_key(identifier) {
            return Some(identifier.to_string());
        }
        let wanted = canonical(Path::new(identifier));
        self.layer_files
            .iter()
            .find(|(_, file)| canonical(file) == wanted)
            .map(|(name, _)| name.clone())
    }

    /// Resolve each identifier, failing on the first unknown one.
    pub fn resolve_targets<S: AsRef<str>>(&self, identifiers: &[S]) -> Result<Vec<String>> {
        identifiers
            .iter()
            .map(|id| {
                let id = id.as_ref();
                self.resolve_layer_name(id)
                    .ok_or_else(|| Error::LayerNotFound(id.to_string()))
            })
            .collect()
    }

    pub fn validate_layer(&self, name: &str, env: &dyn Environment) -> Result<ValidationReport> {
        Ok(self.layer(name)?.validate_env_vars(env))
    }

    /// Describe every failing check of a layer.
    pub fn layer_failures(
        &self,
        name: &str,
        env: &dyn Environment,
        ignore_missing_required: bool,
    ) -> Result<Vec<String>> {
        let report = self.validate_layer(name, env)?;
        if !ignore_missing_required {
            return Ok(validation::failures(&report));
        }
        Ok(report
            .iter()
            .filter(|(_, r)| r.is_failure() && !r.is_missing_required())
            .map(|(k, r)| r.describe(k))
            .collect())
    }

    /// Resolve and write the variables of every layer in a build order.
    ///
    /// Each layer is validated first. Missing required variables are
    /// tolerated there since a later layer may set them. Any other
    /// failure aborts before the environment is touched.
    pub fn apply<S: AsRef<str>>(
        &mut self,
        order: &[S],
        env: &mut dyn Environment,
    ) -> Result<ApplyReport> {
        let mut layers = Vec::with_capacity(order.len());
        for name in order {
            let name = name.as_ref();
            let failures = self.layer_failures(name, &*env, true)?;
            if !failures.is_empty() {
                return Err(Error::ValidationFailed {
                    layer: name.to_string(),
                    failures,
                });
            }
            layers.push((name, self.layer(name)?.container()));
        }

        let defs = resolver::collect_definitions(layers);
        let resolved = VariableResolver::resolve(&defs, &*env);
        let report = resolver::apply(&resolved, env);
        self.write_log = report.write_log.clone();
        Ok(report)
    }

    /// Values written by the last [`LayerManager::apply`].
    pub fn write_log(&self) -> &IndexMap<String, String> {
        &self.write_log
    }

    /// Write the last applied values as `NAME="value"` lines.
    pub fn write_out<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content: String = self
            .write_log
            .iter()
            .map(|(name, value)| format!("{}\n", env_file_line(name, value)))
            .collect();
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build order entries, optionally as `name="path"`.
    pub fn build_order_lines<S: AsRef<str>>(&self, order: &[S], full_paths: bool) -> Vec<String> {
        order
            .iter()
            .map(|name| {
                let name = name.as_ref();
                match self.layer_file(name) {
                    Some(path) if full_paths => format!("{name}=\"{}\"", path.display()),
                    _ => name.to_string(),
                }
            })
            .collect()
    }

    pub fn write_build_order<S: AsRef<str>, P: AsRef<Path>>(
        &self,
        order: &[S],
        full_paths: bool,
        path: P,
    ) -> Result<()> {
        let mut content = self.build_order_lines(order, full_paths).join("\n");
        content.push('\n');
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loaded layers grouped by category, both sorted by name.
    pub fn layers_by_category(&self) -> BTreeMap<&str, Vec<&EnvLayer>> {
        let mut categories: BTreeMap<&str, Vec<&EnvLayer>> = BTreeMap::new();
        for layer in self.layers.values().filter_map(Metadata::layer_info) {
            categories
                .entry(layer.category.as_str())
                .or_default()
                .push(layer);
        }
        for layers in categories.values_mut() {
            layers.sort_by(|a, b| a.name.cmp(&b.name));
        }
        categories
    }

    /// Path of a layer's file relative to the search path holding it.
    pub fn relative_path(&self, name: &str) -> Option<PathBuf> {
        let file = self.layer_file(name)?;
        self.search_paths
            .iter()
            .find_map(|root| file.strip_prefix(root).ok())
            .map(Path::to_path_buf)
            .or_else(|| Some(file.to_path_buf()))
    }

    /// The `mmdebstrap` section of a layer's YAML body, if any.
    pub fn build_config(&self, name: &str) -> Result<Option<BuildConfig>> {
        let Some(path) = self.layer_file(name) else {
            return Err(Error::LayerNotFound(name.to_string()));
        };
        let content = std::fs::read_to_string(path).map_err(|error| Error::ReadFailed {
            path: path.to_path_buf(),
            error,
        })?;
        let has_body = content.lines().any(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        });
        if !has_body {
            return Ok(None);
        }
        let invalid = |error| Error::InvalidYaml {
            path: path.to_path_buf(),
            error,
        };
        let body: serde_yaml::Value = serde_yaml::from_str(&content).map_err(invalid)?;
        match body.get("mmdebstrap") {
            Some(section @ serde_yaml::Value::Mapping(_)) => {
                serde_yaml::from_value(section.clone()).map(Some).map_err(invalid)
            }
            _ => Ok(None),
        }
    }
}

/// Collapse whitespace and cut a description down to `max` characters.
pub fn short_description(description: &str, max: usize) -> String {
    let collapsed = description.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= max {
        return collapsed;
    }
    let cut: String = collapsed.chars().take(max.saturating_sub(3)).collect();
    format!("{cut}...")
}

/// Hidden files and directories are never discovered.
const DISCOVERY_MATCH: glob::MatchOptions = glob::MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: true,
};

fn find_files(search_path: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let root = glob::Pattern::escape(&search_path.to_string_lossy());
    let mut files = Vec::new();
    for pattern in patterns {
        let full = format!("{root}/**/{pattern}");
        let entries = glob::glob_with(&full, DISCOVERY_MATCH).map_err(|err| Error::InvalidFilePattern {
            pattern: pattern.clone(),
            message: err.msg.to_string(),
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(path),
                Ok(_) => {}
                Err(err) => tracing::warn!("Cannot read {}: {}", err.path().display(), err.error()),
            }
        }
    }
    Ok(files)
}

fn relative_to<'a>(file: &'a Path, root: &Path) -> &'a Path {
    file.strip_prefix(root).unwrap_or(file)
}

fn canonical(path: &Path) -> PathBuf {
    dunce::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
