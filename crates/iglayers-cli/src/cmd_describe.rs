// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Show the metadata, dependency tree and variables of one layer.

use std::collections::HashSet;

use clap::Args;
use colored::Colorize;
use iglayers::LayerManager;
use miette::Result;

use crate::output::{list_or_none, print_variables};

/// Show detailed information for a layer
#[derive(Debug, Args)]
pub struct CmdDescribe {
    /// Layer name or path to a layer file
    layer: String,

    /// Layer discovery flags
    #[clap(flatten)]
    layers: crate::LayerFlags,
}

impl CmdDescribe {
    pub fn run(&mut self) -> Result<i32> {
        let manager = self.layers.load(false)?;
        let Some(name) = manager.resolve_layer_name(&self.layer) else {
            eprintln!("{} Layer '{}' not found", "Error:".red(), self.layer);
            return Ok(1);
        };
        let meta = manager.layer(&name)?;
        let Some(info) = meta.layer_info() else {
            eprintln!("{} '{name}' has no layer information", "Error:".red());
            return Ok(1);
        };

        println!("{} {}", "Layer:".bold(), info.name.cyan());
        println!("  Version: {}", info.version);
        println!("  Category: {}", info.category);
        println!("  Description: {}", info.description);
        if !info.provides.is_empty() {
            println!("  Provides: {}", info.provides.join(", "));
        }
        if !info.requires_provider.is_empty() {
            println!("  Requires Provider: {}", info.requires_provider.join(", "));
        }
        if let Some(rel) = manager.relative_path(&name) {
            println!("  Path: {}", rel.display());
        }

        if !info.deps.is_empty() {
            println!("  Depends:");
            let mut shown = HashSet::new();
            print_dependency_tree(&manager, &name, 2, &mut shown);
        }
        if !info.optional_deps.is_empty() {
            println!("  Optional: {}", info.optional_deps.join(", "));
        }
        if !info.conflicts.is_empty() {
            println!("  Conflicts: {}", list_or_none(&info.conflicts));
        }

        match manager.build_config(&name) {
            Ok(Some(config)) => {
                if !config.architectures.is_empty() {
                    println!("  Architectures: {}", config.architectures.join(", "));
                }
                if !config.packages.is_empty() {
                    println!("  Packages: {}", config.packages.join(", "));
                }
            }
            Ok(None) => {}
            Err(err) => tracing::warn!("{err}"),
        }

        println!();
        print_variables(meta, 2);
        Ok(0)
    }
}

fn print_dependency_tree(
    manager: &LayerManager,
    name: &str,
    depth: usize,
    shown: &mut HashSet<String>,
) {
    let pad = "  ".repeat(depth);
    for dep in manager.dependencies(name) {
        let location = manager
            .relative_path(dep)
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not found".to_string());
        if !shown.insert(dep.clone()) {
            println!("{pad}- {dep}: {location} {}", "(already shown)".dimmed());
            continue;
        }
        println!("{pad}- {}: {location}", dep.bold());
        print_dependency_tree(manager, dep, depth + 1, shown);
    }
}
