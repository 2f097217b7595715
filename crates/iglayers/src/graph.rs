// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Layer dependency graph: build ordering, cycle detection and
//! provider checks.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::layer::EnvLayer;
use crate::{Error, Result};

#[cfg(test)]
#[path = "./graph_test.rs"]
mod graph_test;

#[derive(Debug, Clone, Default)]
struct Node {
    requires: Vec<String>,
    optional: Vec<String>,
    provides: Vec<String>,
    requires_provider: Vec<String>,
}

/// Edges between layers, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct LayerGraph {
    nodes: IndexMap<String, Node>,
}

impl LayerGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_layer(&mut self, layer: &EnvLayer) {
        self.nodes.insert(
            layer.name.clone(),
            Node {
                requires: layer.deps.clone(),
                optional: layer.optional_deps.clone(),
                provides: layer.provides.clone(),
                requires_provider: layer.requires_provider.clone(),
            },
        );
    }

    /// Add a node with only required and optional edges.
    pub fn add_node<S: Into<String>>(&mut self, name: S, requires: &[&str], optional: &[&str]) {
        let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        self.nodes.insert(
            name.into(),
            Node {
                requires: to_vec(requires),
                optional: to_vec(optional),
                ..Default::default()
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Required dependencies of a layer, empty when unknown.
    pub fn requires(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.requires.as_slice())
            .unwrap_or_default()
    }

    pub fn optional(&self, name: &str) -> &[String] {
        self.nodes
            .get(name)
            .map(|n| n.optional.as_slice())
            .unwrap_or_default()
    }

    /// Fail on the first required layer, direct or transitive, that is
    /// not in the graph.
    pub fn check_missing<S: AsRef<str>>(&self, targets: &[S]) -> Result<()> {
        for target in targets {
            let mut checked = HashSet::new();
            self.check_missing_from(target.as_ref(), &mut checked)?;
        }
        Ok(())
    }

    fn check_missing_from<'a>(&'a self, name: &'a str, checked: &mut HashSet<&'a str>) -> Result<()> {
        if !checked.insert(name) {
            return Ok(());
        }
        let Some(node) = self.nodes.get(name) else {
            return Err(Error::MissingDependency(name.to_string()));
        };
        for dep in &node.requires {
            self.check_missing_from(dep, checked)?;
        }
        Ok(())
    }

    /// Depth-first post-order over the targets.
    ///
    /// Required dependencies come first in declared order, then optional
    /// dependencies that are present, then the layer itself. Each layer
    /// appears once.
    pub fn build_order<S: AsRef<str>>(&self, targets: &[S]) -> Result<Vec<String>> {
        self.check_missing(targets)?;

        let mut order = Vec::new();
        let mut done = HashSet::new();
        let mut path = Vec::new();
        for target in targets {
            self.visit(target.as_ref(), &mut path, &mut done, &mut order)?;
        }
        Ok(order)
    }

    fn visit<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
        order: &mut Vec<String>,
    ) -> Result<()> {
        if done.contains(name) {
            return Ok(());
        }
        if let Some(start) = path.iter().position(|p| *p == name) {
            let mut chain: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
            chain.push(name.to_string());
            return Err(Error::CircularDependency { chain });
        }
        let Some(node) = self.nodes.get(name) else {
            return Err(Error::MissingDependency(name.to_string()));
        };

        path.push(name);
        for dep in &node.requires {
            self.visit(dep, path, done, order)?;
        }
        for dep in node.optional.iter().filter(|d| self.contains(d)) {
            self.visit(dep, path, done, order)?;
        }
        path.pop();

        done.insert(name);
        order.push(name.to_string());
        Ok(())
    }

    /// Path from `start` along required edges that revisits a layer
    /// already on it, ending with the repeated layer.
    pub fn find_cycle(&self, start: &str) -> Option<Vec<String>> {
        let mut path = Vec::new();
        let mut cleared = HashSet::new();
        self.find_cycle_from(start, &mut path, &mut cleared)
    }

    fn find_cycle_from<'a>(
        &'a self,
        name: &'a str,
        path: &mut Vec<&'a str>,
        cleared: &mut HashSet<&'a str>,
    ) -> Option<Vec<String>> {
        if path.contains(&name) {
            let mut chain: Vec<String> = path.iter().map(|s| s.to_string()).collect();
            chain.push(name.to_string());
            return Some(chain);
        }
        if cleared.contains(name) {
            return None;
        }
        let node = self.nodes.get(name)?;

        path.push(name);
        for dep in &node.requires {
            if let Some(cycle) = self.find_cycle_from(dep, path, cleared) {
                return Some(cycle);
            }
        }
        path.pop();
        cleared.insert(name);
        None
    }

    /// Every layer reachable from `name`, in discovery order.
    ///
    /// Missing required layers are listed; optional ones only when present.
    pub fn transitive_dependencies(&self, name: &str, include_optional: bool) -> Vec<String> {
        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_transitive(name, include_optional, &mut path, &mut out);
        out
    }

    fn collect_transitive<'a>(
        &'a self,
        name: &'a str,
        include_optional: bool,
        path: &mut Vec<&'a str>,
        out: &mut Vec<String>,
    ) {
        if path.contains(&name) {
            return;
        }
        let Some(node) = self.nodes.get(name) else {
            return;
        };
        path.push(name);
        let optional = node
            .optional
            .iter()
            .filter(|d| include_optional && self.contains(d));
        for dep in node.requires.iter().chain(optional) {
            if !out.contains(dep) {
                out.push(dep.clone());
            }
            self.collect_transitive(dep, include_optional, path, out);
        }
        path.pop();
    }

    /// Layers that require `name` directly, sorted.
    pub fn reverse_dependencies(&self, name: &str) -> Vec<String> {
        let mut rdeps: Vec<String> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.requires.iter().any(|d| d == name))
            .map(|(n, _)| n.clone())
            .collect();
        rdeps.sort();
        rdeps
    }

    /// Check the capability tokens within one build order.
    ///
    /// No two layers may provide the same token, and every required
    /// token must be provided by some layer in the order.
    pub fn check_providers<S: AsRef<str>>(&self, order: &[S]) -> Result<()> {
        let mut providers: IndexMap<&str, &str> = IndexMap::new();
        for name in order {
            let name = name.as_ref();
            let Some(node) = self.nodes.get(name) else {
                continue;
            };
            for token in &node.provides {
                if let Some(first) = providers.get(token.as_str()) {
                    return Err(Error::ProviderConflict {
                        provider: token.clone(),
                        first: first.to_string(),
                        second: name.to_string(),
                    });
                }
                providers.insert(token.as_str(), name);
            }
        }

        for name in order {
            let name = name.as_ref();
            let Some(node) = self.nodes.get(name) else {
                continue;
            };
            if let Some(token) = node
                .requires_provider
                .iter()
                .find(|t| !providers.contains_key(t.as_str()))
            {
                return Err(Error::UnsatisfiedProvider {
                    layer: name.to_string(),
                    provider: token.clone(),
                });
            }
        }
        Ok(())
    }
}
